//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con layout del repository, profili e publish
//! - Fornisce validazione dei parametri prima che inizi qualsiasi lavoro
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default compatibili con gli URL già pubblicati
//!
//! ## Layout (relativo alla root del repository):
//! - `originals_dir/collection`: sorgenti gestite (default `originales/Anillos`)
//! - `optimized_dir/collection`: derivati pubblicati (default `optimizadas/Anillos`)
//! - `collection`: cartella legacy non gestita (default `Anillos`)
//!
//! ## Parametri di configurazione:
//! - `profiles`: Catalogo dei profili di output (default: thumb/medium/large)
//! - `workers`: Numero di sorgenti elaborate in parallelo (default: 1, sequenziale)
//! - `publish`: Esegue stage/commit/push alla fine (default: true)
//! - `git_timeout_secs`: Timeout per ogni comando git (default: 120)
//! - `on_collision`: Policy per la relocation legacy (default: skip)
//! - `base_url`: URL base pubblico per il report degli URL (opzionale)
//! - `json_output`: Report finale in JSON (default: false)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     workers: 4,
//!     base_url: Some("https://raw.githubusercontent.com/acme/assets/main".into()),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::profile::{default_profiles, OutputProfile, ProfileCatalog};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// What relocation does when the destination already holds a file of the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Leave the legacy file where it is
    #[default]
    Skip,
    /// Replace the managed copy with the legacy one
    Overwrite,
    /// Record a relocation error for the file
    Error,
}

/// Configuration for derivative generation and publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder holding raw sources, excluded from version control
    pub originals_dir: String,
    /// Folder holding the published derivatives
    pub optimized_dir: String,
    /// Collection name, also the legacy input folder
    pub collection: String,
    /// Output profiles in generation order
    pub profiles: Vec<OutputProfile>,
    /// Number of sources processed concurrently
    pub workers: usize,
    /// Stage, commit and push derivatives after generation
    pub publish: bool,
    /// Timeout applied to every git command
    pub git_timeout_secs: u64,
    /// Relocation collision policy
    pub on_collision: CollisionPolicy,
    /// Public base URL of the repository contents
    pub base_url: Option<String>,
    /// Output the final report as JSON
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            originals_dir: "originales".to_string(),
            optimized_dir: "optimizadas".to_string(),
            collection: "Anillos".to_string(),
            profiles: default_profiles(),
            workers: 1,
            publish: true,
            git_timeout_secs: 120,
            on_collision: CollisionPolicy::Skip,
            base_url: None,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("originals_dir", &self.originals_dir),
            ("optimized_dir", &self.optimized_dir),
            ("collection", &self.collection),
        ] {
            if !is_safe_relative(value) {
                return Err(anyhow::anyhow!(
                    "{} must be a non-empty relative path without '..': {:?}",
                    field,
                    value
                ));
            }
        }

        if self.originals_dir == self.optimized_dir {
            return Err(anyhow::anyhow!("originals_dir and optimized_dir must differ"));
        }

        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.git_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Git timeout must be greater than 0 seconds"));
        }

        self.catalog()?;
        Ok(())
    }

    /// Build the validated profile catalog
    pub fn catalog(&self) -> Result<ProfileCatalog> {
        ProfileCatalog::new(self.profiles.clone()).map_err(|e| anyhow::anyhow!(e))
    }

    pub fn source_dir(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.originals_dir).join(&self.collection)
    }

    pub fn output_root(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.optimized_dir).join(&self.collection)
    }

    pub fn legacy_dir(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.collection)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn is_safe_relative(value: &str) -> bool {
    let path = Path::new(value);
    !value.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}
