use clap::Parser;
use pdl_export::utils::error::ExportError;
use pdl_export::utils::{logger, validation::Validate};
use pdl_export::{ExportEngine, ExportJob, ExportPipeline, JobsConfig, LocalStorage};

#[derive(Parser)]
#[command(name = "pdl-jobs")]
#[command(about = "Regenerate every protocol module listed in a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "pdl-export.toml")]
    config: String,

    /// Run only the job with this name
    #[arg(long)]
    only: Option<String>,

    /// Parse every source without writing modules
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn report(context: &str, e: &ExportError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}: {}", context, e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code());
}

async fn run_job(job: ExportJob, dry_run: bool) -> pdl_export::Result<()> {
    let name = job.name.clone();
    tracing::info!("▶️  Job '{}' from {}", name, job.source);

    let pipeline = ExportPipeline::new(LocalStorage::new("."), job)?;
    let engine = ExportEngine::new(pipeline);

    if dry_run {
        let summary = engine.describe().await?;
        println!("{}: {}", name, summary);
    } else {
        let output_path = engine.run().await?;
        println!("✅ {} -> {}", name, output_path);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // Load TOML configuration
    let config = match JobsConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        report("Configuration validation", &e);
    }

    let jobs = match &args.only {
        Some(name) => config.job(name).map(|job| vec![job]),
        None => config.jobs(),
    }
    .unwrap_or_else(|e| report("Job resolution", &e));
    tracing::info!("✅ {} job(s) to run", jobs.len());

    for job in jobs {
        let name = job.name.clone();
        if let Err(e) = run_job(job, args.dry_run).await {
            report(&format!("Job '{}'", name), &e);
        }
    }

    Ok(())
}
