//! # Run Report Module
//!
//! Report finale di una run, in forma testuale o JSON.
//!
//! ## Contenuto:
//! - Una riga per sorgente (riuscita / fallita con motivo)
//! - Problemi della relocation legacy (file saltati o non spostati)
//! - Riga di stato del publish, sempre distinta dall'esito della generazione
//! - Pattern degli URL pubblici per profilo (WebP + fallback JPEG)
//! - Tempo totale
//!
//! ## Output JSON:
//! Con `--json` il report viene serializzato su stdout in una sola riga,
//! per l'uso da script o da altri processi.

use crate::{
    file_manager::{FileManager, RelocationReport},
    pipeline::{batch_runner::RunSummary, path_resolver::PathResolver},
    profile::{Encoding, ProfileCatalog},
    publish::PublishOutcome,
};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Per-source line of the report
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub file: String,
    pub succeeded: bool,
    pub dimensions: Option<(u32, u32)>,
    pub artifacts: usize,
    pub error: Option<String>,
}

/// Legacy relocation issues worth showing to the user
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelocationSummary {
    pub moved: usize,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub legacy_dir_removed: bool,
}

impl From<&RelocationReport> for RelocationSummary {
    fn from(report: &RelocationReport) -> Self {
        Self {
            moved: report.moved.len(),
            skipped: report.skipped.clone(),
            failed: report
                .failed
                .iter()
                .map(|(path, e)| (path.clone(), e.to_string()))
                .collect(),
            legacy_dir_removed: report.legacy_dir_removed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    Published,
    Skipped,
    Failed,
}

/// Publish status line
#[derive(Debug, Clone, Serialize)]
pub struct PublishStatus {
    pub state: PublishState,
    pub detail: String,
    /// Committed locally, only the push needs to be retried
    pub push_failed: bool,
}

impl From<&PublishOutcome> for PublishStatus {
    fn from(outcome: &PublishOutcome) -> Self {
        match outcome {
            PublishOutcome::Published { message, .. } => Self {
                state: PublishState::Published,
                detail: message.clone(),
                push_failed: false,
            },
            PublishOutcome::Skipped(reason) => Self {
                state: PublishState::Skipped,
                detail: reason.to_string(),
                push_failed: false,
            },
            PublishOutcome::Failed(failure) => Self {
                state: PublishState::Failed,
                detail: failure.to_string(),
                push_failed: failure.is_push_failure(),
            },
        }
    }
}

/// Public URL pattern of one profile, `[code]` stands for the source stem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUrl {
    pub profile: String,
    pub webp: String,
    pub jpg: String,
}

/// Everything a run produced, ready to be printed
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub repo_root: PathBuf,
    pub total_sources: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub artifacts: usize,
    pub bytes_written: u64,
    pub sources: Vec<SourceReport>,
    pub relocation: RelocationSummary,
    pub publish: PublishStatus,
    pub urls: Vec<ProfileUrl>,
    pub duration_seconds: f64,
}

impl RunReport {
    pub fn new(
        repo_root: &Path,
        relocation: &RelocationReport,
        summary: &RunSummary,
        publish: &PublishOutcome,
        urls: Vec<ProfileUrl>,
        elapsed: Duration,
    ) -> Self {
        let sources = summary
            .outcomes
            .iter()
            .map(|o| SourceReport {
                file: o.file_name(),
                succeeded: o.succeeded(),
                dimensions: o.dimensions,
                artifacts: o.artifacts.len(),
                error: o.failure.as_ref().map(|e| e.to_string()),
            })
            .collect();

        Self {
            repo_root: repo_root.to_path_buf(),
            total_sources: summary.total_sources,
            succeeded: summary.succeeded,
            failed: summary.failed,
            artifacts: summary.artifacts.len(),
            bytes_written: summary.total_bytes_written(),
            sources,
            relocation: RelocationSummary::from(relocation),
            publish: PublishStatus::from(publish),
            urls,
            duration_seconds: elapsed.as_secs_f64(),
        }
    }

    /// No sources found, or none of them succeeded
    pub fn is_failure(&self) -> bool {
        self.total_sources == 0 || self.succeeded == 0
    }

    /// Emette il report JSON su stdout
    pub fn emit_json(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }
}

/// Report testuale per il terminale
impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "📊 IMAGE DERIVATIVES REPORT")?;
        writeln!(f, "{}", rule)?;

        if self.total_sources == 0 {
            writeln!(f, "❌ No source images found, nothing to do")?;
        } else {
            writeln!(f, "Sources:    {}", self.total_sources)?;
            writeln!(f, "Succeeded:  {}", self.succeeded)?;
            writeln!(f, "Failed:     {}", self.failed)?;
            writeln!(
                f,
                "Artifacts:  {} ({})",
                self.artifacts,
                FileManager::format_size(self.bytes_written)
            )?;
            writeln!(f)?;

            for source in &self.sources {
                match &source.error {
                    None => writeln!(f, "  ✅ {}: {} files", source.file, source.artifacts)?,
                    Some(error) => writeln!(f, "  ❌ {}: {}", source.file, error)?,
                }
            }
        }

        if !self.relocation.skipped.is_empty() || !self.relocation.failed.is_empty() {
            writeln!(f)?;
            writeln!(f, "Legacy relocation:")?;
            for path in &self.relocation.skipped {
                writeln!(f, "  ⏭️  left in place: {}", path.display())?;
            }
            for (path, error) in &self.relocation.failed {
                writeln!(f, "  ❌ {}: {}", path.display(), error)?;
            }
        }

        if !self.urls.is_empty() && self.succeeded > 0 {
            writeln!(f)?;
            writeln!(f, "🌐 Public URLs:")?;
            for url in &self.urls {
                writeln!(f, "  {}: {}", url.profile, url.webp)?;
            }
            if let Some(fallback) = self.urls.iter().find(|u| u.profile == "medium").or(self.urls.first()) {
                writeln!(f, "  fallback: {}", fallback.jpg)?;
            }
        }

        writeln!(f)?;
        match self.publish.state {
            PublishState::Published => writeln!(f, "🚀 Published: {}", self.publish.detail)?,
            PublishState::Skipped => writeln!(f, "⏭️  Publish skipped: {}", self.publish.detail)?,
            PublishState::Failed if self.publish.push_failed => writeln!(
                f,
                "⚠️  Publish failed: {} (generation is final, retry the push)",
                self.publish.detail
            )?,
            PublishState::Failed => writeln!(f, "❌ Publish failed: {}", self.publish.detail)?,
        }
        write!(f, "⏱️  Completed in {:.2}s", self.duration_seconds)
    }
}

/// URL pattern per profilo, partendo dall'URL base del repository
pub fn profile_urls(base_url: &str, repo_root: &Path, output_root: &Path, catalog: &ProfileCatalog) -> Vec<ProfileUrl> {
    let base = base_url.trim_end_matches('/');
    let relative = url_path(&PathResolver::relative_to(repo_root, output_root));

    catalog
        .iter()
        .map(|profile| {
            let url = |encoding: Encoding| {
                format!("{}/{}/{}/[code].{}", base, relative, profile.name, encoding.extension())
            };
            ProfileUrl {
                profile: profile.name.clone(),
                webp: url(Encoding::WebP),
                jpg: url(Encoding::Jpeg),
            }
        })
        .collect()
}

/// Path joined with `/` regardless of platform
fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
