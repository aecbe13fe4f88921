use crate::adapters::areas::select_areas;
use crate::config::HarvestConfig;
use crate::core::checkpoint::{CheckpointStore, StageStatus};
use crate::core::collector::PaginatedCollector;
use crate::core::enricher::{AreaEnrichment, KeywordEnricher};
use crate::core::merger::Merger;
use crate::core::retry::RetryPolicy;
use crate::domain::model::{Area, Stage, StageReport};
use crate::domain::ports::{
    AreaSource, DetailFetcher, FieldExtractor, Pipeline, SearchTransport, Storage,
};
use crate::utils::error::Result;

/// The external collaborators a pipeline talks to.
pub struct Collaborators {
    pub area_source: Box<dyn AreaSource>,
    pub transport: Box<dyn SearchTransport>,
    pub fetcher: Box<dyn DetailFetcher>,
    pub extractor: Box<dyn FieldExtractor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaCheckpoint {
    pub area: Area,
    pub raw: StageStatus,
    pub enriched: StageStatus,
}

/// collect (extract) -> enrich (transform) -> merge (load).
pub struct HarvestPipeline<S: Storage> {
    config: HarvestConfig,
    store: CheckpointStore<S>,
    collaborators: Collaborators,
    search_policy: RetryPolicy,
    detail_policy: RetryPolicy,
}

impl<S: Storage> HarvestPipeline<S> {
    pub fn new(storage: S, config: HarvestConfig, collaborators: Collaborators) -> Self {
        let store = CheckpointStore::new(storage, config.output.data_dir.clone(), config.search_word());
        let search_policy = RetryPolicy::fixed(config.retry.max_attempts, config.search_wait());
        let detail_policy = RetryPolicy::exponential(
            config.retry.detail_max_attempts,
            config.search_wait(),
            config.detail_max_wait(),
        );
        Self {
            config,
            store,
            collaborators,
            search_policy,
            detail_policy,
        }
    }

    pub fn with_policies(mut self, search: RetryPolicy, detail: RetryPolicy) -> Self {
        self.search_policy = search;
        self.detail_policy = detail;
        self
    }

    pub fn store(&self) -> &CheckpointStore<S> {
        &self.store
    }

    pub async fn checkpoints(&self, areas: &[Area]) -> Result<Vec<AreaCheckpoint>> {
        let mut overview = Vec::with_capacity(areas.len());
        for area in areas {
            overview.push(AreaCheckpoint {
                area: area.clone(),
                raw: self.store.status(area, Stage::Raw).await?,
                enriched: self.store.status(area, Stage::Enriched).await?,
            });
        }
        Ok(overview)
    }

    async fn collect_area(&self, area: &Area, report: &mut StageReport) -> Result<()> {
        if self.store.is_complete(area, Stage::Raw).await? {
            tracing::info!("Raw listings already present for {}, skipping search", area);
            report.skipped.push(area.clone());
            return Ok(());
        }

        let collector = PaginatedCollector::new(
            self.collaborators.transport.as_ref(),
            self.collaborators.extractor.as_ref(),
            &self.search_policy,
        );
        let records = collector.collect(area).await;
        if records.is_empty() {
            tracing::warn!("No listings collected for {}, nothing saved", area);
            report.failed.push(area.clone());
            return Ok(());
        }

        self.store.write_raw(area, &records).await?;
        report.records += records.len();
        report.completed.push(area.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for HarvestPipeline<S> {
    async fn resolve_areas(&self) -> Result<Vec<Area>> {
        let ranked = self.collaborators.area_source.list_areas().await?;
        let areas = select_areas(ranked, &self.config.selection());
        tracing::info!(
            "Selected {} areas: {}",
            areas.len(),
            areas
                .iter()
                .map(Area::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(areas)
    }

    async fn extract(&self, areas: Vec<Area>) -> Result<StageReport> {
        tracing::info!(
            "Searching {} areas for '{}'",
            areas.len(),
            self.config.search.term
        );
        let mut report = StageReport {
            areas: areas.clone(),
            ..Default::default()
        };
        for area in &areas {
            if let Err(e) = self.collect_area(area, &mut report).await {
                tracing::error!(
                    "Collection for {} abandoned: {} ({})",
                    area,
                    e,
                    e.recovery_suggestion()
                );
                report.failed.push(area.clone());
            }
        }
        Ok(report)
    }

    async fn transform(&self, collected: StageReport) -> Result<StageReport> {
        let enricher = KeywordEnricher::new(
            &self.store,
            self.collaborators.fetcher.as_ref(),
            self.collaborators.extractor.as_ref(),
            &self.detail_policy,
            &self.config.enrichment.keywords,
        )?;

        let mut areas = collected.areas;
        for on_disk in self.store.completed_areas(Stage::Raw).await? {
            if !areas.iter().any(|a| a.dir_name() == on_disk.dir_name()) {
                tracing::debug!("Including {} from an earlier collection", on_disk);
                areas.push(on_disk);
            }
        }

        let mut report = StageReport {
            areas: areas.clone(),
            ..Default::default()
        };
        for area in &areas {
            match enricher.enrich_area(area).await {
                Ok(AreaEnrichment::Enriched { records }) => {
                    report.records += records;
                    report.completed.push(area.clone());
                }
                Ok(AreaEnrichment::AlreadyComplete) | Ok(AreaEnrichment::NoRawData) => {
                    report.skipped.push(area.clone())
                }
                Err(e) => {
                    tracing::error!(
                        "Enrichment of {} abandoned: {} ({})",
                        area,
                        e,
                        e.recovery_suggestion()
                    );
                    report.failed.push(area.clone());
                }
            }
        }
        Ok(report)
    }

    async fn load(&self, _enriched: StageReport) -> Result<String> {
        let master_path = self.config.output.master_file.as_str();
        let merger = Merger::new(&self.store, master_path, self.config.output.telephone_format);
        let summary = merger.merge().await?;
        Ok(format!(
            "{}/{}",
            self.config.output.root.trim_end_matches('/'),
            summary.path
        ))
    }
}
