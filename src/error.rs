//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Separa gli errori per ambito: per-file, per-sorgente, per-publish, setup
//! - Fornisce messaggi di errore descrittivi con il path coinvolto
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `CodecError`: Errori del codec immagini (decode/encode)
//! - `GenerateError`: Fallimento di una sorgente (decode, encode, write)
//! - `RelocationError`: Fallimento nello spostamento di un singolo file legacy
//! - `VcsError`: Errore di un comando git (spawn, exit code, timeout)
//! - `PublishFailure`: Step del publish fallito (stage, commit, push)
//! - `SetupError`: Precondizioni a livello di directory, bloccano l'intera run
//!
//! ## Propagazione:
//! - Gli errori per-sorgente e per-file vengono convertiti in outcome e non
//!   risalgono oltre `DerivativeGenerator` o la relocation
//! - Solo `SetupError` interrompe la run prima che inizi il lavoro

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised by an [`ImageCodec`](crate::codec::ImageCodec) implementation
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single source image stopped producing artifacts
#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("failed to encode {profile}/{encoding}: {source}")]
    Encode {
        profile: String,
        encoding: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid source file name: {0}")]
    InvalidName(PathBuf),

    #[error("worker task failed: {0}")]
    Task(String),
}

/// A legacy file that could not be moved into the source directory
#[derive(thiserror::Error, Debug)]
pub enum RelocationError {
    #[error("destination already exists: {0}")]
    Collision(PathBuf),

    #[error("failed to move {from} -> {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single version-control command
#[derive(thiserror::Error, Debug)]
pub enum VcsError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// The publish step that failed. Generation results are already final when
/// any of these is reported.
#[derive(thiserror::Error, Debug)]
pub enum PublishFailure {
    #[error("staging failed: {0}")]
    Stage(#[source] VcsError),

    #[error("commit failed: {0}")]
    Commit(#[source] VcsError),

    #[error("push failed: {0}")]
    Push(#[source] VcsError),
}

impl PublishFailure {
    /// True when the commit exists locally and only the push has to be retried
    pub fn is_push_failure(&self) -> bool {
        matches!(self, PublishFailure::Push(_))
    }
}

/// Directory-level preconditions. Only these abort a run before work starts.
#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("Repository directory does not exist: {0}")]
    RepositoryMissing(PathBuf),

    #[error("Not a git working copy (no .git found): {0}")]
    NotAWorkingCopy(PathBuf),

    #[error("Source directory does not exist: {0}")]
    SourceDirMissing(PathBuf),

    #[error("Output directory is not writable {path}: {source}")]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Another run holds the lock file {0} (remove it if no run is active)")]
    Locked(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
