//! # Image Derivatives - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Caricamento della configurazione (file JSON + override da CLI)
//! - Avvio della pipeline e stampa del report finale
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (repository, config, workers, etc.)
//! 2. Configura il logging (`RUST_LOG`, altrimenti INFO o DEBUG con --verbose)
//! 3. Carica il file di configurazione e applica gli override
//! 4. Esegue la pipeline: relocation, generazione, publish
//! 5. Exit code non-zero se non ci sono sorgenti o nessuna è riuscita
//!
//! ## Esempio di utilizzo:
//! ```bash
//! image-derivatives /path/to/repo --workers 4 --base-url https://raw.githubusercontent.com/acme/assets/main
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use image_derivatives::{AssetPipeline, CollisionPolicy, Config};

#[derive(Parser)]
#[command(name = "image-derivatives")]
#[command(about = "Generate web-sized image derivatives and publish them with git")]
struct Args {
    /// Repository root (must be a git working copy)
    repo_root: PathBuf,

    /// JSON configuration file (defaults are used if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of sources processed in parallel
    #[arg(short, long)]
    workers: Option<usize>,

    /// Generate only, skip stage/commit/push
    #[arg(long)]
    no_publish: bool,

    /// What to do when a legacy image already exists in the source folder
    #[arg(long, value_enum)]
    on_collision: Option<CollisionPolicy>,

    /// Public base URL of the repository, used to print the derivative URLs
    #[arg(long)]
    base_url: Option<String>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    async fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .await
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.no_publish {
            config.publish = false;
        }
        if let Some(policy) = self.on_collision {
            config.on_collision = policy;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if self.json {
            config.json_output = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.load_config().await?;
    let json_output = config.json_output;

    let pipeline = AssetPipeline::open(&args.repo_root, config)?;
    info!("📁 Repository: {}", pipeline.workspace().repo_root().display());

    let report = pipeline.run().await?;

    if json_output {
        report.emit_json();
    } else {
        println!("{}", report);
    }

    if report.publish.push_failed {
        warn!("Derivatives are committed locally, run `git push` to publish them");
    }

    if report.is_failure() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
