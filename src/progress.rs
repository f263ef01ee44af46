//! # Progress Tracking Module
//!
//! Questo modulo gestisce il progress tracking durante la generazione.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Contatori thread-safe di sorgenti riuscite/fallite
//! - Messaggio di stato per ogni sorgente completata
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce la progress bar (nascosta in modalità JSON)
//! - `ProgressTracker`: Clonabile tra i worker, aggiorna bar e contatori
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:12] [========================>---------------] 6/10 (60%) [OK] AN-006.png: 6 files
//! ```

use crate::pipeline::derivative_generator::GenerationOutcome;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Manages the progress bar over source images
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A manager that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Tracker condiviso tra i worker della batch
#[derive(Clone)]
pub struct ProgressTracker {
    pub total: usize,
    succeeded: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    progress_manager: ProgressManager,
}

impl ProgressTracker {
    pub fn new(total: usize, visible: bool) -> Self {
        let progress_manager = if visible {
            ProgressManager::new(total as u64)
        } else {
            ProgressManager::hidden()
        };

        Self {
            total,
            succeeded: Arc::new(AtomicUsize::new(0)),
            failed: Arc::new(AtomicUsize::new(0)),
            progress_manager,
        }
    }

    /// Registra il completamento di una sorgente
    pub fn record(&self, outcome: &GenerationOutcome) {
        let message = if outcome.succeeded() {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
            format!("[OK] {}: {} files", outcome.file_name(), outcome.artifacts.len())
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            format!("[ERROR] {}", outcome.file_name())
        };
        self.progress_manager.update(&message);
    }

    /// Finalizza la progress bar
    pub fn finish(&self) {
        let summary = format!(
            "Succeeded: {} | Failed: {} | Total: {}",
            self.succeeded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.total
        );
        self.progress_manager.finish(&summary);
    }
}
