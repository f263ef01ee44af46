//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file sorgente.
//!
//! ## Responsabilità:
//! - Discovery dei file sorgente (solo file immediati, niente ricorsione)
//! - Relocation best-effort dalla cartella legacy non gestita
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati accettati:
//! - **Sorgenti**: PNG (case-insensitive). Gli altri file vengono ignorati
//!   in silenzio, non sono errori.
//!
//! ## Relocation:
//! - Sposta i PNG da `<repo>/<collection>` a `<repo>/<originals>/<collection>`
//! - Un fallimento su un file viene loggato e registrato, mai fatale
//! - Le collisioni seguono la `CollisionPolicy` configurata
//! - Se la cartella legacy resta vuota viene rimossa
//!
//! ## Esempio:
//! ```ignore
//! let sources = FileManager::discover_sources(&source_dir)?;
//! let report = FileManager::relocate_legacy(&legacy, &source_dir, CollisionPolicy::Skip).await;
//! ```

use crate::config::CollisionPolicy;
use crate::error::RelocationError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Extensions accepted as source images
pub const SOURCE_EXTENSIONS: &[&str] = &["png"];

/// Result of moving legacy inputs into the managed source directory
#[derive(Debug, Default)]
pub struct RelocationReport {
    pub moved: Vec<PathBuf>,
    /// Left in the legacy folder because the destination already existed
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, RelocationError)>,
    pub legacy_dir_removed: bool,
}

impl RelocationReport {
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Check if a path has an accepted source extension
    pub fn is_source_image(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            SOURCE_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Immediate source files of a directory, sorted by file name
    pub fn discover_sources(source_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            if entry.file_type().is_file() && Self::is_source_image(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// Move legacy source images into the managed source directory.
    ///
    /// Never fails as a whole: every per-file problem ends up in the report.
    pub async fn relocate_legacy(
        legacy_dir: &Path,
        source_dir: &Path,
        policy: CollisionPolicy,
    ) -> RelocationReport {
        let mut report = RelocationReport::default();

        if !legacy_dir.is_dir() {
            debug!("No legacy folder at {}", legacy_dir.display());
            return report;
        }

        let candidates = match Self::discover_sources(legacy_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list legacy folder {}: {}", legacy_dir.display(), e);
                return report;
            }
        };

        if !candidates.is_empty() {
            info!("📦 Moving {} legacy images into {}", candidates.len(), source_dir.display());
        }

        for from in candidates {
            let Some(file_name) = from.file_name() else {
                continue;
            };
            let to = source_dir.join(file_name);
            let name = file_name.to_string_lossy();

            match Self::move_one(&from, &to, policy).await {
                Ok(true) => {
                    info!("   ✅ Moved: {}", name);
                    report.moved.push(to);
                }
                Ok(false) => {
                    warn!("   ⏭️  Skipped (already in source folder): {}", name);
                    report.skipped.push(from);
                }
                Err(e) => {
                    error!("   ❌ Error moving {}: {}", name, e);
                    report.failed.push((from, e));
                }
            }
        }

        report.legacy_dir_removed = Self::remove_if_empty(legacy_dir).await;
        if report.legacy_dir_removed {
            info!("📁 Removed empty legacy folder {}", legacy_dir.display());
        }

        report
    }

    /// Returns `Ok(false)` when the file was left in place by the collision policy
    async fn move_one(from: &Path, to: &Path, policy: CollisionPolicy) -> Result<bool, RelocationError> {
        if fs::try_exists(to).await.unwrap_or(false) {
            match policy {
                CollisionPolicy::Skip => return Ok(false),
                CollisionPolicy::Error => return Err(RelocationError::Collision(to.to_path_buf())),
                CollisionPolicy::Overwrite => {
                    // rename() does not replace an existing file on every platform
                    fs::remove_file(to).await.map_err(|e| RelocationError::Move {
                        from: from.to_path_buf(),
                        to: to.to_path_buf(),
                        source: e,
                    })?;
                }
            }
        }

        if fs::rename(from, to).await.is_ok() {
            return Ok(true);
        }

        // Cross-device moves: copy then delete
        let moved = async {
            fs::copy(from, to).await?;
            fs::remove_file(from).await
        };
        moved.await.map_err(|e| RelocationError::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        })?;

        Ok(true)
    }

    async fn remove_if_empty(dir: &Path) -> bool {
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return false;
        };
        if !matches!(entries.next_entry().await, Ok(None)) {
            return false;
        }
        fs::remove_dir(dir).await.is_ok()
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.0} {}", size, UNITS[unit_index])
        }
    }

    pub fn size_in_mb(size: u64) -> f64 {
        size as f64 / (1024.0 * 1024.0)
    }
}
