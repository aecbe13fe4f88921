//! Concrete implementations of the domain ports: local storage, HTTP
//! transport, HTML extraction and area sources.

pub mod areas;
pub mod extractor;
pub mod http;
pub mod storage;

use crate::config::HarvestConfig;
use crate::core::pipeline::Collaborators;
use crate::core::retry::RetryPolicy;
use crate::utils::error::Result;

/// HTTP-backed collaborators for a live run.
pub fn http_collaborators(config: &HarvestConfig) -> Result<Collaborators> {
    let client = http::build_client(config)?;
    let transport = http::HttpTransport::new(client.clone(), config);
    let extractor = extractor::HtmlListingExtractor::new(
        &config.search.listing_base_url,
        &config.enrichment.content_selector,
    )?;

    let area_source: Box<dyn crate::domain::ports::AreaSource> = match &config.areas.source_url {
        Some(url) => Box::new(areas::PopulationTableSource::new(
            client,
            url.clone(),
            RetryPolicy::fixed(config.retry.max_attempts, config.search_wait()),
        )),
        None => Box::new(areas::StaticAreaSource::new(config.areas.names.clone())),
    };

    Ok(Collaborators {
        area_source,
        transport: Box::new(transport.clone()),
        fetcher: Box::new(transport),
        extractor: Box::new(extractor),
    })
}
