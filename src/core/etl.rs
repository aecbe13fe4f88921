use crate::core::Pipeline;
use crate::domain::model::StageReport;
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum StageSelection {
    /// Paginated search per area, writes raw checkpoints
    Collect,
    /// Keyword enrichment of raw checkpoints
    Enrich,
    /// Deduplicated merge of all enriched checkpoints
    Merge,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub collected: Option<StageReport>,
    pub enriched: Option<StageReport>,
    pub output_path: Option<String>,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_stages(StageSelection::All).await
    }

    pub async fn run_stages(&self, selection: StageSelection) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        // Enrichment and merge work from what is already on disk.
        let collected = if matches!(selection, StageSelection::Collect | StageSelection::All) {
            let areas = self.pipeline.resolve_areas().await?;
            tracing::info!("Collecting listings...");
            let report = self.pipeline.extract(areas).await?;
            log_report("Collect", &report);
            summary.collected = Some(report.clone());
            report
        } else {
            StageReport::default()
        };

        let enriched = if matches!(selection, StageSelection::Enrich | StageSelection::All) {
            tracing::info!("Enriching listings with keywords...");
            let report = self.pipeline.transform(collected).await?;
            log_report("Enrich", &report);
            summary.enriched = Some(report.clone());
            report
        } else {
            collected
        };

        if matches!(selection, StageSelection::Merge | StageSelection::All) {
            tracing::info!("Merging area datasets...");
            let output_path = self.pipeline.load(enriched).await?;
            tracing::info!("Output saved to: {}", output_path);
            summary.output_path = Some(output_path);
        }

        Ok(summary)
    }
}

fn log_report(stage: &str, report: &StageReport) {
    tracing::info!(
        "{} finished: {} areas done, {} skipped, {} failed, {} records",
        stage,
        report.completed.len(),
        report.skipped.len(),
        report.failed.len(),
        report.records
    );
    for area in &report.failed {
        tracing::warn!("{} incomplete for {}", stage, area);
    }
}
