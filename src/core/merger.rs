use crate::config::TelephoneFormat;
use crate::core::checkpoint::CheckpointStore;
use crate::core::dataset;
use crate::domain::model::{EnrichedRecord, Stage};
use crate::domain::ports::Storage;
use crate::utils::error::{HarvestError, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    pub areas: usize,
    pub input_records: usize,
    pub output_records: usize,
    pub path: String,
}

/// Keeps the first record for each `(listing_url, telephone)` pair.
pub fn deduplicate(records: Vec<EnrichedRecord>) -> Vec<EnrichedRecord> {
    let mut seen: HashSet<(Option<String>, Option<String>)> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            seen.insert((
                record.listing.listing_url.clone(),
                record.listing.telephone.clone(),
            ))
        })
        .collect()
}

/// Union of keyword columns in first-seen order.
pub fn keyword_columns(records: &[EnrichedRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for flag in records.iter().flat_map(|r| r.flags.iter()) {
        if seen.insert(flag.keyword.as_str()) {
            columns.push(flag.keyword.clone());
        }
    }
    columns
}

pub struct Merger<'a, S: Storage> {
    store: &'a CheckpointStore<S>,
    master_file: &'a str,
    telephone_format: TelephoneFormat,
}

impl<'a, S: Storage> Merger<'a, S> {
    pub fn new(
        store: &'a CheckpointStore<S>,
        master_file: &'a str,
        telephone_format: TelephoneFormat,
    ) -> Self {
        Self {
            store,
            master_file,
            telephone_format,
        }
    }

    pub async fn merge(&self) -> Result<MergeSummary> {
        let areas = self.store.completed_areas(Stage::Enriched).await?;
        if areas.is_empty() {
            return Err(HarvestError::EmptyMergeInput {
                root: self.store.data_dir().to_string(),
            });
        }

        let mut combined = Vec::new();
        for area in &areas {
            let records = self.store.read_enriched(area).await?;
            tracing::debug!("Merging {} records from {}", records.len(), area);
            combined.extend(records);
        }

        let input_records = combined.len();
        let columns = keyword_columns(&combined);
        let master = deduplicate(combined);

        let bytes = dataset::encode_enriched(&master, &columns, self.telephone_format)?;
        self.store
            .storage()
            .write_file(self.master_file, &bytes)
            .await?;

        tracing::info!(
            "Merged {} areas: {} records in, {} after de-duplication",
            areas.len(),
            input_records,
            master.len()
        );

        Ok(MergeSummary {
            areas: areas.len(),
            input_records,
            output_records: master.len(),
            path: self.master_file.to_string(),
        })
    }
}
