use crate::config::HarvestConfig;
use crate::domain::model::{Area, PageResponse};
use crate::domain::ports::{DetailFetcher, SearchTransport};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub fn build_client(config: &HarvestConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.http.user_agent.as_str())
        .timeout(Duration::from_secs(config.http.timeout_seconds))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()?;
    Ok(client)
}

/// Sends one GET and captures status and body. Non-success statuses are
/// returned, not raised, so callers decide whether to retry.
pub async fn get_page(request: reqwest::RequestBuilder) -> Result<PageResponse> {
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(PageResponse { status, body })
}

/// Search endpoint and listing detail pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    search_term: String,
    radius: u32,
}

impl HttpTransport {
    pub fn new(client: Client, config: &HarvestConfig) -> Self {
        Self {
            client,
            endpoint: config.search.endpoint.clone(),
            search_term: config.search.term.clone(),
            radius: config.search.radius,
        }
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn fetch_page(&self, area: &Area, page_number: u32) -> Result<PageResponse> {
        tracing::debug!(
            "Requesting page {} for {} from {}",
            page_number,
            area,
            self.endpoint
        );
        let request = self.client.get(&self.endpoint).query(&[
            ("filterDistance", self.radius.to_string()),
            ("keywords", self.search_term.clone()),
            ("location", area.name().to_string()),
            ("pageNum", page_number.to_string()),
        ]);
        get_page(request).await
    }
}

#[async_trait]
impl DetailFetcher for HttpTransport {
    async fn fetch_detail(&self, listing_url: &str) -> Result<PageResponse> {
        tracing::debug!("Requesting detail page {}", listing_url);
        get_page(self.client.get(listing_url)).await
    }
}
