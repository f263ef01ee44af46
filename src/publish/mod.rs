//! # Publish Module
//!
//! Pubblicazione dei derivati generati su un repository remoto.
//!
//! - `coordinator`: decide se pubblicare e traduce gli errori in `PublishOutcome`
//! - `git`: implementazione di `VersionControlPublisher` basata sull'eseguibile `git`
//!
//! La generazione è già definitiva quando si arriva qui: un fallimento del
//! publish non invalida i file prodotti.

pub mod coordinator;
pub mod git;

pub use coordinator::{PublishCoordinator, PublishOutcome, SkipReason};
pub use git::GitPublisher;

use crate::error::VcsError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Staging, commit and push, each reported on its own
#[async_trait]
pub trait VersionControlPublisher: Send + Sync {
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError>;

    /// Whether the index differs from HEAD for `paths` after staging
    async fn has_staged_changes(&self, _paths: &[PathBuf]) -> Result<bool, VcsError> {
        Ok(true)
    }

    /// Commit only `paths`, leaving anything else in the index untouched
    async fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<(), VcsError>;

    async fn push(&self) -> Result<(), VcsError>;
}
