use clap::Parser;
use pdl_export::utils::error::ExportError;
use pdl_export::utils::{logger, validation::Validate};
use pdl_export::{CliConfig, ExportEngine, ExportPipeline, LocalStorage};

fn fail(e: &ExportError) -> ! {
    tracing::error!(
        "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code());
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting pdl-export");
    tracing::debug!("CLI config: {:?}", config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.severity().exit_code());
    }

    let job = match config.resolve() {
        Ok(job) => job,
        Err(e) => fail(&e),
    };
    tracing::info!("📥 Source: {}", job.source);

    let storage = LocalStorage::new(".");
    let pipeline = match ExportPipeline::new(storage, job) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };
    let engine = ExportEngine::new(pipeline);

    if config.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        match engine.describe().await {
            Ok(summary) => println!("{}", summary),
            Err(e) => fail(&e),
        }
        return;
    }

    match engine.run().await {
        Ok(output_path) => {
            println!("✅ Export completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => fail(&e),
    }
}
