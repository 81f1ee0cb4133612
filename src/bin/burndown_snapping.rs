use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use workerly::app::BurndownTracker;
use workerly::utils::{logger, validation::Validate};
use workerly::{DocumentStore, LocalStorage, WorkerlyConfig, WorkerlyError};

#[derive(Parser)]
#[command(name = "burndown-snapping")]
#[command(about = "Persist today's remaining work snapshot for every tracked work item")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "WORKERLY_CONFIG", default_value = "workerly.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match WorkerlyConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    logger::init_service_logger(&config.logging.level, config.logging.json);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let Some(options) = config.tracker.clone() else {
        let e = WorkerlyError::MissingConfigError {
            field: "tracker".to_string(),
        };
        tracing::error!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    };

    let store = Arc::new(DocumentStore::new(LocalStorage::new(&config.storage.data_dir)));
    let tracker = BurndownTracker::new(
        options,
        config.azure_devops.clone(),
        store,
        &config.storage.containers,
    );

    match tracker.run().await {
        Ok(summary) if summary.has_failures() => {
            tracing::error!("❌ {} tracked item(s) failed", summary.failed);
            std::process::exit(1);
        }
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::error!(
                "❌ Burndown snapping failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    }
}
