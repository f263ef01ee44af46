//! # Batch Runner Module
//!
//! Orchestratore della generazione su un'intera directory di sorgenti.
//!
//! ## Responsabilità:
//! - Relocation best-effort dalla cartella legacy prima della discovery
//! - Discovery delle sorgenti (solo PNG immediati, ordinati per nome)
//! - Distribuzione del lavoro su un pool limitato di worker
//! - Aggregazione dei risultati in un `RunSummary` restituito al chiamante
//!
//! ## Gestione concorrenza:
//! - `workers = 1`: strettamente sequenziale (default)
//! - `workers > 1`: semaforo + `spawn_blocking`, il codec è CPU-bound
//! - L'aggregazione avviene sempre in ordine di sorgente, indipendentemente
//!   dall'ordine di completamento
//!
//! ## Error handling:
//! - Il fallimento di una sorgente non blocca le altre
//! - Solo le precondizioni di directory (`SetupError`) interrompono la run

use crate::{
    codec::ImageCodec,
    config::CollisionPolicy,
    error::{GenerateError, SetupError},
    file_manager::{FileManager, RelocationReport},
    pipeline::{
        derivative_generator::{Artifact, DerivativeGenerator, GenerationOutcome, SourceImage},
        path_resolver::PathResolver,
    },
    progress::ProgressTracker,
};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Aggregate of one batch run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total_sources: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Every artifact written during the run, in source then generation order.
    /// Includes the partial output of failed sources.
    pub artifacts: Vec<Artifact>,
    pub outcomes: Vec<GenerationOutcome>,
}

impl RunSummary {
    /// No source images were discovered
    pub fn is_empty(&self) -> bool {
        self.total_sources == 0
    }

    pub fn record(&mut self, outcome: GenerationOutcome) {
        self.total_sources += 1;
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.artifacts.extend(outcome.artifacts.iter().cloned());
        self.outcomes.push(outcome);
    }

    /// Changed output paths, the publish manifest
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|a| a.path.clone()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &GenerationOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn total_bytes_written(&self) -> u64 {
        self.artifacts.iter().map(|a| a.size_bytes).sum()
    }
}

/// Applies the derivative generator to every source of a directory
pub struct BatchRunner<C> {
    generator: Arc<DerivativeGenerator<C>>,
    workers: usize,
    show_progress: bool,
}

impl<C: ImageCodec + 'static> BatchRunner<C> {
    pub fn new(generator: DerivativeGenerator<C>, workers: usize) -> Self {
        Self {
            generator: Arc::new(generator),
            workers: workers.max(1),
            show_progress: false,
        }
    }

    /// Draw an `indicatif` progress bar while generating
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn generator(&self) -> &DerivativeGenerator<C> {
        &self.generator
    }

    /// Sposta le immagini della cartella legacy nella cartella sorgenti
    pub async fn relocate_legacy(
        &self,
        legacy_dir: &Path,
        source_dir: &Path,
        policy: CollisionPolicy,
    ) -> RelocationReport {
        let report = FileManager::relocate_legacy(legacy_dir, source_dir, policy).await;
        if !report.failed.is_empty() {
            warn!("{} legacy images could not be moved", report.failed.len());
        }
        report
    }

    /// Esegue la generazione su tutte le sorgenti della directory
    pub async fn run(&self, source_dir: &Path) -> Result<RunSummary, SetupError> {
        if !source_dir.is_dir() {
            return Err(SetupError::SourceDirMissing(source_dir.to_path_buf()));
        }

        let output_root = self.generator.output_root();
        PathResolver::ensure_profile_dirs(output_root, self.generator.catalog())
            .await
            .map_err(|e| SetupError::OutputNotWritable {
                path: output_root.to_path_buf(),
                source: e,
            })?;

        info!("🚀 Processing images in {}", source_dir.display());
        let files = FileManager::discover_sources(source_dir)?;

        if files.is_empty() {
            info!("❌ No PNG images found in {}", source_dir.display());
            return Ok(RunSummary::default());
        }

        info!("📊 Found {} images ({} workers)", files.len(), self.workers);

        let tracker = ProgressTracker::new(files.len(), self.show_progress);
        let outcomes = self.process_all(files, &tracker).await;
        tracker.finish();

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            summary.record(outcome);
        }

        info!("✅ Processed successfully: {}/{}", summary.succeeded, summary.total_sources);
        Ok(summary)
    }

    /// Pool limitato: al massimo `workers` sorgenti in elaborazione
    async fn process_all(&self, files: Vec<PathBuf>, tracker: &ProgressTracker) -> Vec<GenerationOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.workers));

        let jobs = files.into_iter().map(|path| {
            let generator = Arc::clone(&self.generator);
            let semaphore = Arc::clone(&semaphore);
            let tracker = tracker.clone();

            async move {
                // Permits are released when the job finishes
                let _permit = semaphore.acquire_owned().await;
                debug!("Worker picked up {}", path.display());

                let task_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || match SourceImage::from_path(&task_path) {
                    Ok(source) => generator.generate(&source),
                    Err(e) => GenerationOutcome::rejected(&task_path, e),
                })
                .await
                .unwrap_or_else(|e| GenerationOutcome::rejected(&path, GenerateError::Task(e.to_string())));

                tracker.record(&outcome);
                outcome
            }
        });

        join_all(jobs).await
    }
}
