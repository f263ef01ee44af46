//! # Publish Coordinator
//!
//! Consegna il manifest dei file cambiati al `VersionControlPublisher`.
//!
//! ## Regole:
//! - Nessun publish se nessuna sorgente è riuscita (niente commit vuoti)
//! - Stage dei derivati + file di esclusione, poi commit, poi push
//! - Il push parte anche senza nuovi cambiamenti, così una run successiva
//!   pubblica un commit rimasto locale dopo un push fallito
//! - Nessun retry: il primo step fallito determina l'outcome
//! - Il fallimento del push è distinto da stage/commit, così il chiamante
//!   può ritentare solo il push senza rigenerare nulla

use crate::error::PublishFailure;
use crate::pipeline::batch_runner::RunSummary;
use crate::publish::VersionControlPublisher;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Why publishing did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No source succeeded
    NothingGenerated,
    /// Regenerated files are identical to the committed ones
    NothingToCommit,
    /// Publishing turned off in the configuration
    Disabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NothingGenerated => f.write_str("no image was generated"),
            SkipReason::NothingToCommit => f.write_str("no changes to commit"),
            SkipReason::Disabled => f.write_str("publishing disabled"),
        }
    }
}

#[derive(Debug)]
pub enum PublishOutcome {
    Published { artifacts: usize, message: String },
    Skipped(SkipReason),
    Failed(PublishFailure),
}

/// Commit message for a run
pub fn commit_message(artifact_count: usize) -> String {
    format!("Optimize images - {} files processed", artifact_count)
}

pub struct PublishCoordinator<P> {
    publisher: P,
    /// Always staged alongside the derivatives
    exclusion_file: PathBuf,
}

impl<P: VersionControlPublisher> PublishCoordinator<P> {
    pub fn new(publisher: P, exclusion_file: impl Into<PathBuf>) -> Self {
        Self {
            publisher,
            exclusion_file: exclusion_file.into(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Pubblica i derivati di una run
    pub async fn publish(&self, summary: &RunSummary) -> PublishOutcome {
        if summary.succeeded == 0 {
            info!("⏭️  Nothing to publish");
            return PublishOutcome::Skipped(SkipReason::NothingGenerated);
        }

        info!("🔄 Publishing {} files...", summary.artifacts.len());

        let mut paths = summary.artifact_paths();
        paths.push(self.exclusion_file.clone());

        if let Err(e) = self.publisher.stage(&paths).await {
            let failure = PublishFailure::Stage(e);
            error!("❌ {}", failure);
            return PublishOutcome::Failed(failure);
        }

        let changed = match self.publisher.has_staged_changes(&paths).await {
            Ok(changed) => changed,
            Err(e) => {
                let failure = PublishFailure::Stage(e);
                error!("❌ {}", failure);
                return PublishOutcome::Failed(failure);
            }
        };

        let message = commit_message(summary.artifacts.len());
        if changed {
            if let Err(e) = self.publisher.commit(&message, &paths).await {
                let failure = PublishFailure::Commit(e);
                error!("❌ {}", failure);
                return PublishOutcome::Failed(failure);
            }
        } else {
            info!("✅ Derivatives already committed, pushing any pending commit");
        }

        // Also runs when nothing changed: a commit left by an earlier failed push goes out now
        if let Err(e) = self.publisher.push().await {
            let failure = PublishFailure::Push(e);
            warn!("⚠️  Committed locally but {}", failure);
            return PublishOutcome::Failed(failure);
        }

        if !changed {
            return PublishOutcome::Skipped(SkipReason::NothingToCommit);
        }

        info!("✅ Changes pushed");
        PublishOutcome::Published {
            artifacts: summary.artifacts.len(),
            message,
        }
    }
}
