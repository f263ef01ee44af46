//! # Repository Workspace Module
//!
//! Gestisce il layout del repository su cui gira la pipeline.
//!
//! ## Responsabilità:
//! - Valida la root del repository (esiste, è una working copy git)
//! - Crea le cartelle gestite (sorgenti + una cartella per profilo)
//! - Rigenera il file `.gitignore` ad ogni run
//! - Lock file per impedire due run concorrenti sullo stesso output
//!
//! ## Regole di esclusione:
//! - Esclude i formati raw (`*.png`, `*.jpg`, `*.jpeg`), la cartella
//!   degli originali e la cartella legacy
//! - Re-include solo `.webp` e `.jpg` sotto la cartella dei derivati

use crate::{
    config::Config,
    error::SetupError,
    pipeline::path_resolver::PathResolver,
    profile::ProfileCatalog,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const EXCLUSION_FILE: &str = ".gitignore";
pub const LOCK_FILE: &str = ".image-derivatives.lock";

/// Resolved, validated repository layout
#[derive(Debug, Clone)]
pub struct Workspace {
    repo_root: PathBuf,
    source_dir: PathBuf,
    output_root: PathBuf,
    legacy_dir: PathBuf,
    exclusion_rules: String,
}

impl Workspace {
    /// Validate the repository root and resolve the configured layout
    pub fn open(repo_root: &Path, config: &Config) -> Result<Self, SetupError> {
        if !repo_root.is_dir() {
            return Err(SetupError::RepositoryMissing(repo_root.to_path_buf()));
        }
        // `.git` is a file in linked worktrees
        if !repo_root.join(".git").exists() {
            return Err(SetupError::NotAWorkingCopy(repo_root.to_path_buf()));
        }

        let repo_root = repo_root.canonicalize()?;

        Ok(Self {
            source_dir: config.source_dir(&repo_root),
            output_root: config.output_root(&repo_root),
            legacy_dir: config.legacy_dir(&repo_root),
            exclusion_rules: exclusion_rules(config),
            repo_root,
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn legacy_dir(&self) -> &Path {
        &self.legacy_dir
    }

    pub fn exclusion_file(&self) -> PathBuf {
        self.repo_root.join(EXCLUSION_FILE)
    }

    /// Crea le cartelle gestite e rigenera le regole di esclusione
    pub async fn prepare(&self, catalog: &ProfileCatalog) -> Result<(), SetupError> {
        info!("🔧 Preparing repository layout...");

        tokio::fs::create_dir_all(&self.source_dir).await?;
        PathResolver::ensure_profile_dirs(&self.output_root, catalog)
            .await
            .map_err(|e| SetupError::OutputNotWritable {
                path: self.output_root.clone(),
                source: e,
            })?;

        tokio::fs::write(self.exclusion_file(), &self.exclusion_rules).await?;
        debug!("Wrote {}", self.exclusion_file().display());

        info!("✅ Layout ready");
        Ok(())
    }

    /// Take the run lock; released when the returned guard is dropped.
    ///
    /// A lock left by a process that is no longer running (crash, Ctrl-C,
    /// `panic = "abort"`) is removed and taken over.
    pub fn lock(&self) -> Result<RunLock, SetupError> {
        let path = self.repo_root.join(LOCK_FILE);
        match RunLock::create(&path) {
            Err(SetupError::Locked(_)) if lock_is_stale(&path) => {
                warn!("🔓 Removing stale lock file {} (owner no longer running)", path.display());
                std::fs::remove_file(&path)?;
                RunLock::create(&path)
            }
            other => other,
        }
    }
}

/// Guard for the run lock file
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    fn create(path: &Path) -> Result<Self, SetupError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(SetupError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!("Acquired run lock {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

/// True only when the lock names a PID that is not running.
/// Unreadable or foreign content keeps the lock.
fn lock_is_stale(path: &Path) -> bool {
    let Ok(content) = std::fs::read_to_string(path) else {
        return false;
    };
    match content.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => !process_alive(pid),
        _ => false,
    }
}

#[cfg(unix)]
fn process_alive(pid: i32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 only checks existence; EPERM still means the process exists
    !matches!(kill(Pid::from_raw(pid), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_alive(_pid: i32) -> bool {
    true
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

/// Contenuto del `.gitignore` per il layout configurato
pub fn exclusion_rules(config: &Config) -> String {
    let originals = &config.originals_dir;
    let optimized = &config.optimized_dir;
    let legacy = &config.collection;
    let lock = LOCK_FILE;

    format!(
        "# Original images (heavy, never tracked)
/{originals}/
/{legacy}/
*.png
*.jpg
*.jpeg

# Track only the optimized derivatives
!/{optimized}/
!/{optimized}/**/*.webp
!/{optimized}/**/*.jpg

# Logs and temporary files
{lock}
*.log
.DS_Store
Thumbs.db
"
    )
}
