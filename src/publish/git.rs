//! # Git Publisher
//!
//! Esegue `git add` / `git commit` / `git push` nella root del repository
//! con `tokio::process::Command`. Ogni comando ha un timeout: allo scadere
//! il processo viene terminato e lo step riportato come fallito.
//!
//! `diff` e `commit` sono limitati ai path del manifest (il commit li legge
//! da stdin con `--pathspec-from-file`): quello che l'utente aveva già in
//! stage non finisce nel commit dei derivati.

use crate::error::VcsError;
use crate::pipeline::path_resolver::PathResolver;
use crate::publish::VersionControlPublisher;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Paths per `git add` invocation, keeps the command line short
const STAGE_CHUNK: usize = 200;

/// `VersionControlPublisher` driving the git executable
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_root: PathBuf,
    timeout: Duration,
}

impl GitPublisher {
    pub fn new(repo_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            repo_root: repo_root.into(),
            timeout,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Run a program in the repository root under the timeout.
    /// The output is returned regardless of the exit status.
    async fn execute(&self, program: &str, args: Vec<OsString>, input: Option<Vec<u8>>) -> Result<Output, VcsError> {
        let command = describe(program, &args);
        debug!("Running {}", command);

        let mut cmd = Command::new(program);
        cmd.args(&args)
            .current_dir(&self.repo_root)
            // Never block on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let finished = async {
            let mut child = cmd.spawn()?;
            if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
                stdin.write_all(&bytes).await?;
                // Closing stdin ends the pathspec list
                drop(stdin);
            }
            child.wait_with_output().await
        };

        match tokio::time::timeout(self.timeout, finished).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(VcsError::Spawn { command, source }),
            Err(_) => Err(VcsError::Timeout {
                command,
                timeout: self.timeout,
            }),
        }
    }

    async fn git(&self, args: Vec<OsString>, input: Option<Vec<u8>>) -> Result<Output, VcsError> {
        self.execute("git", args, input).await
    }

    /// Run git, treating a non-zero exit as an error
    async fn run(&self, args: Vec<OsString>, input: Option<Vec<u8>>) -> Result<(), VcsError> {
        let command = describe("git", &args);
        let output = self.git(args, input).await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(command_failed(command, &output))
        }
    }

    fn relative_args<'a>(&'a self, paths: &'a [PathBuf]) -> impl Iterator<Item = OsString> + 'a {
        paths
            .iter()
            .map(|p| PathResolver::relative_to(&self.repo_root, p).into_os_string())
    }

    /// NUL-separated, repository-relative pathspecs for `--pathspec-file-nul`
    fn pathspec_input(&self, paths: &[PathBuf]) -> Vec<u8> {
        let mut input = Vec::new();
        for path in paths {
            let relative = PathResolver::relative_to(&self.repo_root, path);
            input.extend_from_slice(relative.to_string_lossy().as_bytes());
            input.push(0);
        }
        input
    }
}

fn describe(program: &str, args: &[OsString]) -> String {
    let shown: Vec<_> = args.iter().take(3).map(|a| a.to_string_lossy().into_owned()).collect();
    let suffix = if args.len() > 3 { " ..." } else { "" };
    format!("{} {}{}", program, shown.join(" "), suffix)
}

fn command_failed(command: String, output: &Output) -> VcsError {
    VcsError::CommandFailed {
        command,
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn pathspec_args(head: &[&str]) -> Vec<OsString> {
    head.iter()
        .map(|arg| OsString::from(*arg))
        .chain([
            OsString::from("--pathspec-from-file=-"),
            OsString::from("--pathspec-file-nul"),
        ])
        .collect()
}

#[async_trait]
impl VersionControlPublisher for GitPublisher {
    async fn stage(&self, paths: &[PathBuf]) -> Result<(), VcsError> {
        for chunk in paths.chunks(STAGE_CHUNK) {
            let mut args: Vec<OsString> = vec!["add".into(), "--".into()];
            args.extend(self.relative_args(chunk));
            self.run(args, None).await?;
        }
        Ok(())
    }

    async fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, VcsError> {
        for chunk in paths.chunks(STAGE_CHUNK) {
            let mut args: Vec<OsString> = vec!["diff".into(), "--cached".into(), "--quiet".into(), "--".into()];
            args.extend(self.relative_args(chunk));
            let command = describe("git", &args);
            let output = self.git(args, None).await?;

            // --quiet: 0 = no differences, 1 = differences
            match output.status.code() {
                Some(0) => {}
                Some(1) => return Ok(true),
                _ => return Err(command_failed(command, &output)),
            }
        }
        Ok(false)
    }

    async fn commit(&self, message: &str, paths: &[PathBuf]) -> Result<(), VcsError> {
        let mut args = pathspec_args(&["commit"]);
        args.extend([OsString::from("-m"), OsString::from(message)]);
        self.run(args, Some(self.pathspec_input(paths))).await
    }

    async fn push(&self) -> Result<(), VcsError> {
        self.run(vec!["push".into()], None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn git_in(dir: &Path, args: &[&str]) -> Output {
        Command::new("git").args(args).current_dir(dir).output().await.unwrap()
    }

    async fn init_repo() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        assert!(git_in(temp_dir.path(), &["init", "--quiet"]).await.status.success());
        git_in(temp_dir.path(), &["config", "user.name", "Image Bot"]).await;
        git_in(temp_dir.path(), &["config", "user.email", "bot@example.com"]).await;
        git_in(temp_dir.path(), &["config", "commit.gpgsign", "false"]).await;
        temp_dir
    }

    fn write_file(root: &Path, relative: &str, content: &[u8]) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_describe_truncates_long_commands() {
        let args: Vec<OsString> = vec!["add".into(), "--".into(), "a".into(), "b".into()];
        assert_eq!(describe("git", &args), "git add -- a ...");
        assert_eq!(describe("git", &[OsString::from("push")]), "git push");
    }

    #[tokio::test]
    async fn test_missing_repo_dir_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let publisher = GitPublisher::new(temp_dir.path().join("gone"), Duration::from_secs(5));

        let result = publisher.push().await;
        assert!(matches!(result, Err(VcsError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_command_times_out() {
        let temp_dir = TempDir::new().unwrap();
        let publisher = GitPublisher::new(temp_dir.path(), Duration::from_millis(200));

        let started = std::time::Instant::now();
        let result = publisher.execute("sleep", vec!["30".into()], None).await;

        match result {
            Err(VcsError::Timeout { command, timeout }) => {
                assert_eq!(command, "sleep 30");
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_stage_and_detect_changes() {
        if !git_available().await {
            return;
        }

        let repo = init_repo().await;
        let publisher = GitPublisher::new(repo.path(), Duration::from_secs(30));
        let file = write_file(repo.path(), "thumb/AN-001.webp", b"webp bytes");
        let manifest = vec![file];

        publisher.stage(&manifest).await.unwrap();
        assert!(publisher.has_staged_changes(&manifest).await.unwrap());

        publisher.commit("Optimize images - 1 files processed", &manifest).await.unwrap();
        publisher.stage(&manifest).await.unwrap();
        assert!(!publisher.has_staged_changes(&manifest).await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_leaves_unrelated_staged_changes() {
        if !git_available().await {
            return;
        }

        let repo = init_repo().await;
        let publisher = GitPublisher::new(repo.path(), Duration::from_secs(30));

        write_file(repo.path(), "notes.txt", b"work in progress");
        assert!(git_in(repo.path(), &["add", "notes.txt"]).await.status.success());

        let manifest = vec![write_file(repo.path(), "medium/AN-002.jpg", b"jpeg bytes")];
        publisher.stage(&manifest).await.unwrap();
        assert!(publisher.has_staged_changes(&manifest).await.unwrap());
        publisher.commit("Optimize images - 1 files processed", &manifest).await.unwrap();

        let committed = git_in(repo.path(), &["show", "--name-only", "--format=", "HEAD"]).await;
        let committed = String::from_utf8_lossy(&committed.stdout);
        assert_eq!(committed.trim(), "medium/AN-002.jpg");

        let still_staged = git_in(repo.path(), &["diff", "--cached", "--name-only"]).await;
        assert_eq!(String::from_utf8_lossy(&still_staged.stdout).trim(), "notes.txt");
    }

    #[tokio::test]
    async fn test_stage_unknown_path_fails() {
        if !git_available().await {
            return;
        }

        let repo = init_repo().await;
        let publisher = GitPublisher::new(repo.path(), Duration::from_secs(30));
        let result = publisher.stage(&[repo.path().join("missing.jpg")]).await;
        assert!(matches!(result, Err(VcsError::CommandFailed { .. })));
    }
}
