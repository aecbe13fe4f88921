use clap::Parser;
use listing_harvest::config::cli::CliArgs;
use listing_harvest::core::etl::RunSummary;
use listing_harvest::domain::ports::Pipeline;
use listing_harvest::utils::error::ErrorSeverity;
use listing_harvest::utils::{logger, validation::Validate};
use listing_harvest::{adapters, EtlEngine, HarvestConfig, HarvestPipeline, LocalStorage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting listing-harvest");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match HarvestConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!(
        "✅ Searching '{}' within {} miles, keywords: {}",
        config.search.term,
        config.search.radius,
        config.enrichment.keywords.join(", ")
    );

    let collaborators = adapters::http_collaborators(&config)?;
    let storage = LocalStorage::new(config.output.root.clone());
    let pipeline = HarvestPipeline::new(storage, config, collaborators);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no listings will be fetched");
        let areas = pipeline.resolve_areas().await?;
        for checkpoint in pipeline.checkpoints(&areas).await? {
            println!(
                "{:<30} raw: {:?}, enriched: {:?}",
                checkpoint.area.name(),
                checkpoint.raw,
                checkpoint.enriched
            );
        }
        return Ok(());
    }

    let engine = EtlEngine::new(pipeline);

    match engine.run_stages(args.stage).await {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            tracing::error!(
                "❌ Harvest failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if let Some(report) = &summary.collected {
        println!(
            "📥 Collected {} listings ({} areas done, {} skipped, {} without results)",
            report.records,
            report.completed.len(),
            report.skipped.len(),
            report.failed.len()
        );
    }
    if let Some(report) = &summary.enriched {
        println!(
            "🔎 Enriched {} listings ({} areas done, {} skipped, {} abandoned)",
            report.records,
            report.completed.len(),
            report.skipped.len(),
            report.failed.len()
        );
    }
    if let Some(path) = &summary.output_path {
        println!("📁 Output saved to: {}", path);
    }
    println!("✅ Harvest completed");
}
