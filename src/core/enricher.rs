use crate::core::checkpoint::CheckpointStore;
use crate::core::retry::RetryPolicy;
use crate::domain::model::{Area, EnrichedRecord, KeywordFlag, ListingRecord, Stage};
use crate::domain::ports::{DetailFetcher, FieldExtractor, Storage};
use crate::utils::error::{HarvestError, Result};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AreaEnrichment {
    Enriched { records: usize },
    AlreadyComplete,
    NoRawData,
}

/// Tags each collected listing with keyword flags read from its detail page.
pub struct KeywordEnricher<'a, S: Storage> {
    store: &'a CheckpointStore<S>,
    fetcher: &'a dyn DetailFetcher,
    extractor: &'a dyn FieldExtractor,
    policy: &'a RetryPolicy,
    keywords: Vec<(String, Regex)>,
}

impl<'a, S: Storage> KeywordEnricher<'a, S> {
    pub fn new(
        store: &'a CheckpointStore<S>,
        fetcher: &'a dyn DetailFetcher,
        extractor: &'a dyn FieldExtractor,
        policy: &'a RetryPolicy,
        keywords: &[String],
    ) -> Result<Self> {
        let keywords = keywords
            .iter()
            .map(|k| {
                Regex::new(k)
                    .map(|re| (k.clone(), re))
                    .map_err(|e| HarvestError::InvalidConfigValueError {
                        field: "enrichment.keywords".to_string(),
                        value: k.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            store,
            fetcher,
            extractor,
            policy,
            keywords,
        })
    }

    pub fn keyword_names(&self) -> Vec<String> {
        self.keywords.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn flags_for(&self, text: &str) -> Vec<KeywordFlag> {
        self.keywords
            .iter()
            .map(|(keyword, pattern)| KeywordFlag {
                keyword: keyword.clone(),
                present: pattern.is_match(text),
            })
            .collect()
    }

    /// One detail fetch resolves every keyword for the record, or the record fails.
    pub async fn enrich_record(
        &self,
        area: &Area,
        position: usize,
        total: usize,
        listing: &ListingRecord,
    ) -> Result<EnrichedRecord> {
        let business_name = listing.business_name.as_deref().unwrap_or("<unnamed>");

        let Some(url) = listing.listing_url.as_deref() else {
            tracing::warn!(
                "area: {}, row_index: {}/{}, business_name: {}, message: \"No listing URL, keywords marked absent\"",
                area,
                position,
                total,
                business_name
            );
            return Ok(EnrichedRecord {
                listing: listing.clone(),
                flags: self.flags_for(""),
            });
        };

        let context = format!("area: {}, row_index: {}/{}", area, position, total);
        let response = match self
            .policy
            .execute(&context, || self.fetcher.fetch_detail(url))
            .await
        {
            Ok(response) => response,
            Err(HarvestError::PageGone { status, .. }) => {
                tracing::warn!(
                    "response: {}, area: {}, row_index: {}/{}, business_name: {}, message: \"Listing page gone, keywords marked absent\"",
                    status,
                    area,
                    position,
                    total,
                    business_name
                );
                return Ok(EnrichedRecord {
                    listing: listing.clone(),
                    flags: self.flags_for(""),
                });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "response: {}, area: {}, row_index: {}/{}, business_name: {}",
            response.status,
            area,
            position,
            total,
            business_name
        );

        let text = self.extractor.content_text(&response.body);
        Ok(EnrichedRecord {
            listing: listing.clone(),
            flags: self.flags_for(&text),
        })
    }

    /// Enriches a whole area and persists it. Any record that cannot be fetched
    /// aborts the area without writing, so it is redone from scratch next run.
    pub async fn enrich_area(&self, area: &Area) -> Result<AreaEnrichment> {
        if self.store.is_complete(area, Stage::Enriched).await? {
            tracing::info!(
                "Keywords file already present for {}, moving to next area",
                area
            );
            return Ok(AreaEnrichment::AlreadyComplete);
        }
        if !self.store.is_complete(area, Stage::Raw).await? {
            tracing::debug!("No raw listings for {}, nothing to enrich", area);
            return Ok(AreaEnrichment::NoRawData);
        }

        let listings = self.store.read_raw(area).await?;
        let total = listings.len();
        let mut enriched = Vec::with_capacity(total);
        for (index, listing) in listings.iter().enumerate() {
            enriched.push(self.enrich_record(area, index + 1, total, listing).await?);
        }

        tracing::info!("Saving keywords file for {}", area);
        self.store
            .write_enriched(area, &enriched, &self.keyword_names())
            .await?;
        Ok(AreaEnrichment::Enriched { records: total })
    }
}
