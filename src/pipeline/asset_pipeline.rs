//! # Asset Pipeline Orchestrator
//!
//! Orchestratore principale: collega workspace, batch runner e publish.
//!
//! ## Flusso:
//! 1. Validazione config e layout del repository
//! 2. Lock + preparazione cartelle + `.gitignore`
//! 3. Relocation legacy, discovery, generazione
//! 4. Publish (se abilitato) e costruzione del `RunReport`

use crate::{
    codec::{ImageCodec, NativeCodec},
    config::Config,
    error::SetupError,
    pipeline::{batch_runner::BatchRunner, derivative_generator::DerivativeGenerator},
    publish::{GitPublisher, PublishCoordinator, PublishOutcome, SkipReason, VersionControlPublisher},
    report::{profile_urls, RunReport},
    workspace::Workspace,
};
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub struct AssetPipeline<C = NativeCodec, P = GitPublisher> {
    config: Config,
    workspace: Workspace,
    codec: C,
    publisher: P,
    show_progress: bool,
}

impl AssetPipeline<NativeCodec, GitPublisher> {
    /// Pipeline over a real repository with the `image` codec and git
    pub fn open(repo_root: &Path, config: Config) -> Result<Self, SetupError> {
        config.validate().map_err(|e| SetupError::Config(e.to_string()))?;
        let workspace = Workspace::open(repo_root, &config)?;
        let publisher = GitPublisher::new(workspace.repo_root(), config.git_timeout());
        Ok(Self::with_parts(config, workspace, NativeCodec::new(), publisher))
    }
}

impl<C: ImageCodec + 'static, P: VersionControlPublisher> AssetPipeline<C, P> {
    pub fn with_parts(config: Config, workspace: Workspace, codec: C, publisher: P) -> Self {
        let show_progress = !config.json_output;
        Self {
            config,
            workspace,
            codec,
            publisher,
            show_progress,
        }
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Esegue una run completa
    pub async fn run(self) -> Result<RunReport, SetupError> {
        let started = Instant::now();
        let catalog = self.config.catalog().map_err(|e| SetupError::Config(e.to_string()))?;

        let _lock = self.workspace.lock()?;
        self.workspace.prepare(&catalog).await?;

        let generator = DerivativeGenerator::new(self.codec, self.workspace.output_root(), catalog);
        let runner = BatchRunner::new(generator, self.config.workers).with_progress(self.show_progress);

        let relocation = runner
            .relocate_legacy(
                self.workspace.legacy_dir(),
                self.workspace.source_dir(),
                self.config.on_collision,
            )
            .await;

        let summary = runner.run(self.workspace.source_dir()).await?;

        let publish = if self.config.publish {
            PublishCoordinator::new(self.publisher, self.workspace.exclusion_file())
                .publish(&summary)
                .await
        } else {
            info!("⏭️  Publishing disabled");
            PublishOutcome::Skipped(SkipReason::Disabled)
        };

        let urls = match &self.config.base_url {
            Some(base) => profile_urls(
                base,
                self.workspace.repo_root(),
                self.workspace.output_root(),
                runner.generator().catalog(),
            ),
            None => Vec::new(),
        };

        let report = RunReport::new(
            self.workspace.repo_root(),
            &relocation,
            &summary,
            &publish,
            urls,
            started.elapsed(),
        );

        info!("🎉 Run completed in {:.2}s", report.duration_seconds);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VcsError;
    use crate::report::PublishState;
    use crate::workspace::LOCK_FILE;
    use async_trait::async_trait;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        staged: Arc<Mutex<Vec<PathBuf>>>,
        commits: Arc<Mutex<Vec<String>>>,
        pushes: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl VersionControlPublisher for RecordingPublisher {
        async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
            self.staged.lock().unwrap().extend_from_slice(paths);
            Ok(())
        }

        async fn commit(&self, message: &str, _paths: &[PathBuf]) -> Result<(), VcsError> {
            self.commits.lock().unwrap().push(message.to_string());
            Ok(())
        }

        async fn push(&self) -> Result<(), VcsError> {
            *self.pushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn repository() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        temp_dir
    }

    fn pipeline(repo: &Path, config: Config, publisher: RecordingPublisher) -> AssetPipeline<NativeCodec, RecordingPublisher> {
        let workspace = Workspace::open(repo, &config).unwrap();
        AssetPipeline::with_parts(config, workspace, NativeCodec::new(), publisher).with_progress(false)
    }

    #[tokio::test]
    async fn test_full_run_publishes_derivatives() {
        let repo = repository();
        let legacy = repo.path().join("Anillos");
        std::fs::create_dir_all(&legacy).unwrap();
        RgbImage::from_pixel(1600, 1200, Rgb([200, 180, 20]))
            .save(legacy.join("AN-001.png"))
            .unwrap();
        std::fs::write(legacy.join("AN-002.png"), b"corrupt").unwrap();
        RgbImage::from_pixel(200, 100, Rgb([5, 5, 5]))
            .save(legacy.join("AN-003.png"))
            .unwrap();

        let config = Config {
            base_url: Some("https://example.com/assets".to_string()),
            ..Default::default()
        };
        let publisher = RecordingPublisher::default();
        let report = pipeline(repo.path(), config, publisher.clone()).run().await.unwrap();

        assert_eq!((report.total_sources, report.succeeded, report.failed), (3, 2, 1));
        assert_eq!(report.artifacts, 12);
        assert_eq!(report.relocation.moved, 3);
        assert!(report.relocation.legacy_dir_removed);
        assert_eq!(report.publish.state, PublishState::Published);
        assert_eq!(report.urls.len(), 3);
        assert!(!report.is_failure());

        let staged = publisher.staged.lock().unwrap().clone();
        assert_eq!(staged.len(), 13);
        assert!(staged.iter().any(|p| p.ends_with(".gitignore")));
        assert_eq!(
            publisher.commits.lock().unwrap().as_slice(),
            ["Optimize images - 12 files processed".to_string()]
        );
        assert_eq!(*publisher.pushes.lock().unwrap(), 1);

        let root = repo.path().canonicalize().unwrap();
        assert!(root.join("optimizadas/Anillos/thumb/AN-003.webp").is_file());
        assert!(root.join(".gitignore").is_file());
        assert!(!root.join(LOCK_FILE).exists());
    }

    #[tokio::test]
    async fn test_empty_repository_skips_publish() {
        let repo = repository();
        let publisher = RecordingPublisher::default();

        let report = pipeline(repo.path(), Config::default(), publisher.clone())
            .run()
            .await
            .unwrap();

        assert!(report.is_failure());
        assert_eq!(report.publish.state, PublishState::Skipped);
        assert!(publisher.staged.lock().unwrap().is_empty());
        assert!(repo.path().join("originales/Anillos").is_dir());
    }

    #[tokio::test]
    async fn test_publish_disabled() {
        let repo = repository();
        let sources = repo.path().join("originales/Anillos");
        std::fs::create_dir_all(&sources).unwrap();
        RgbImage::from_pixel(50, 50, Rgb([1, 1, 1]))
            .save(sources.join("AN-010.png"))
            .unwrap();

        let config = Config {
            publish: false,
            ..Default::default()
        };
        let publisher = RecordingPublisher::default();
        let report = pipeline(repo.path(), config, publisher.clone()).run().await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.publish.state, PublishState::Skipped);
        assert_eq!(report.publish.detail, "publishing disabled");
        assert!(publisher.commits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_held_lock_aborts_run() {
        let repo = repository();
        let pipeline = pipeline(repo.path(), Config::default(), RecordingPublisher::default());
        let _held = pipeline.workspace().lock().unwrap();

        let result = pipeline.run().await;
        assert!(matches!(result, Err(SetupError::Locked(_))));
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?}: {}", args, String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn run_with_git(root: &Path) -> RunReport {
        let config = Config::default();
        let workspace = Workspace::open(root, &config).unwrap();
        let publisher = GitPublisher::new(workspace.repo_root(), config.git_timeout());
        AssetPipeline::with_parts(config, workspace, NativeCodec::new(), publisher)
            .with_progress(false)
            .run()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rerun_pushes_commit_left_by_failed_push() {
        if !git_available() {
            return;
        }

        let remote = TempDir::new().unwrap();
        git(remote.path(), &["init", "--quiet", "--bare"]);

        let repo = TempDir::new().unwrap();
        let root = repo.path();
        git(root, &["init", "--quiet"]);
        git(root, &["config", "user.name", "Image Bot"]);
        git(root, &["config", "user.email", "bot@example.com"]);
        git(root, &["config", "commit.gpgsign", "false"]);
        std::fs::write(root.join("README"), "assets\n").unwrap();
        git(root, &["add", "README"]);
        git(root, &["commit", "--quiet", "-m", "init"]);
        let remote_url = remote.path().to_string_lossy().into_owned();
        git(root, &["remote", "add", "origin", &remote_url]);
        git(root, &["push", "--quiet", "-u", "origin", "HEAD"]);
        let branch = git(root, &["rev-parse", "--abbrev-ref", "HEAD"]);

        let sources = root.join("originales/Anillos");
        std::fs::create_dir_all(&sources).unwrap();
        RgbImage::from_pixel(64, 64, Rgb([9, 9, 9]))
            .save(sources.join("AN-100.png"))
            .unwrap();

        git(root, &["remote", "set-url", "origin", "/nonexistent/remote.git"]);
        let first = run_with_git(root).await;
        assert_eq!(first.publish.state, PublishState::Failed);
        assert!(first.publish.push_failed);

        git(root, &["remote", "set-url", "origin", &remote_url]);
        let second = run_with_git(root).await;
        assert_eq!(second.publish.state, PublishState::Skipped);
        assert!(!second.publish.push_failed);

        let local_head = git(root, &["rev-parse", "HEAD"]);
        let remote_head = git(remote.path(), &["rev-parse", &branch]);
        assert_eq!(local_head, remote_head);
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let repo = repository();
        let config = Config {
            workers: 0,
            ..Default::default()
        };

        let result = AssetPipeline::open(repo.path(), config);
        assert!(matches!(result, Err(SetupError::Config(_))));
    }
}
