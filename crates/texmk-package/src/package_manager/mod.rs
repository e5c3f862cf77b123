//! Package manager abstraction for TeX distributions.
//!
//! ## Overview
//!
//! The compilation driver needs three things from a TeX distribution: find
//! which package provides a missing file, install it, and bring the
//! distribution up to date. [`PackageManager`] exposes those through a single
//! facade over the [`PackageBackend`] trait:
//!
//! ```text
//! ┌─────────────────┐
//! │ PackageManager  │  ← facade, cheap to clone
//! └────────┬────────┘
//!          │ Arc<dyn PackageBackend>
//!          ▼
//! ┌──────────────────┐
//! │ PackageBackend   │
//! └────────┬─────────┘
//!    ┌─────┴──────┬─────────────┐
//! TlmgrBackend MiktexBackend NoOpBackend
//! ```
//!
//! Backends never spawn processes themselves; they go through a
//! [`CommandExecutor`] so tests can script the output of `tlmgr` and `mpm`.
//!
//! ## Examples
//!
//! ```no_run
//! use texmk_package::package_manager::PackageManager;
//! use texmk_log::SearchTerm;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let pm = PackageManager::new();
//! if pm.is_available() {
//!     let candidates = pm.search(&SearchTerm::File("tikz.sty".into())).await?;
//!     for package in candidates {
//!         pm.install(&package).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ```
//! use texmk_package::package_manager::PackageManager;
//!
//! assert_eq!(
//!     PackageManager::get_ctan_link("tikz.sty").as_deref(),
//!     Some("https://ctan.org/pkg/pgf")
//! );
//! ```

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use texmk_log::SearchTerm;
use tokio::process::Command;

/// Database of CTAN packages and file mappings.
pub mod ctan_db;

/// The state of a package installation operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    /// The package was successfully installed.
    Complete,
    /// The package manager reported a failure (see [`InstallStatus::message`]).
    Failed,
    /// Nothing could be attempted, e.g. no package manager is available.
    Unknown,
}

/// The result of a package installation attempt.
#[derive(Debug, Clone)]
pub struct InstallStatus {
    /// The package that was installed (or attempted).
    pub name: String,
    pub state: InstallState,
    /// Diagnostic output, usually the package manager's stderr on failure.
    pub message: Option<String>,
}

impl InstallStatus {
    fn complete(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: InstallState::Complete,
            message: None,
        }
    }

    fn failed(name: &str, message: String) -> Self {
        Self {
            name: name.to_string(),
            state: InstallState::Failed,
            message: Some(message),
        }
    }
}

/// What an update refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTarget {
    /// The package manager itself and its package index.
    Manager,
    /// Every installed package.
    Installed,
}

/// Trait for executing system commands.
/// This allows us to script `tlmgr` and `mpm` output in tests.
#[async_trait]
pub trait CommandExecutor: Send + Sync + std::fmt::Debug {
    /// Runs `program` with `args` to completion and returns its output.
    async fn execute(&self, program: &Path, args: &[&str]) -> Result<std::process::Output>;
}

/// Default implementation of [`CommandExecutor`] using `tokio::process::Command`.
#[derive(Debug)]
pub struct RealCommandExecutor;

#[async_trait]
impl CommandExecutor for RealCommandExecutor {
    async fn execute(&self, program: &Path, args: &[&str]) -> Result<std::process::Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| anyhow!("Failed to execute {}: {}", program.display(), e))
    }
}

/// A scripted executor for tests.
///
/// Replies with the queued outputs in order, then with the fallback output,
/// and records every argument list it was called with.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockCommandExecutor {
    pub replies: std::sync::Mutex<std::collections::VecDeque<(i32, String, String)>>,
    pub fallback: (i32, String, String),
    pub calls: Arc<std::sync::Mutex<Vec<Vec<String>>>>,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn replying(status_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            fallback: (status_code, stdout.to_string(), stderr.to_string()),
            ..Default::default()
        }
    }

    pub fn then(self, status_code: i32, stdout: &str, stderr: &str) -> Self {
        self.replies.lock().unwrap().push_back((
            status_code,
            stdout.to_string(),
            stderr.to_string(),
        ));
        self
    }
}

#[cfg(test)]
#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn execute(&self, _program: &Path, args: &[&str]) -> Result<std::process::Output> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());
        let (status_code, stdout, stderr) = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        #[cfg(unix)]
        let status = {
            use std::os::unix::process::ExitStatusExt;
            std::process::ExitStatus::from_raw(status_code << 8)
        };
        #[cfg(windows)]
        let status = {
            use std::os::windows::process::ExitStatusExt;
            std::process::ExitStatus::from_raw(status_code as u32)
        };

        Ok(std::process::Output {
            status,
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        })
    }
}

/// Trait defining the interface for TeX package manager backends.
///
/// Implementations must be `Send + Sync`; the resolver holds them behind an
/// `Arc` and calls them from async code.
#[async_trait]
pub trait PackageBackend: std::fmt::Debug + Send + Sync {
    /// Installs the named package.
    ///
    /// # Errors
    ///
    /// Returns an error only if the package manager could not be run at all.
    /// A package manager that ran and refused reports
    /// [`InstallState::Failed`] instead.
    async fn install(&self, package: &str) -> Result<InstallStatus>;

    /// Lists the packages that provide a file matching `term`.
    ///
    /// An empty list means "nothing provides this", which is different from
    /// an error running the search.
    async fn search(&self, term: &SearchTerm) -> Result<Vec<String>>;

    /// Refreshes the manager itself or the installed packages.
    async fn update(&self, target: UpdateTarget) -> Result<()>;

    /// Points the manager at a different package repository.
    async fn set_repository(&self, _repository: &str) -> Result<()> {
        Err(anyhow!("{} does not support switching repositories", self.name()))
    }

    /// Whether this backend manages a full TeX Live distribution, whose
    /// search covers every file and font on CTAN.
    fn is_texlive(&self) -> bool {
        false
    }

    /// Returns a human-readable name for this backend (e.g., "tlmgr", "miktex").
    fn name(&self) -> &'static str;
}

/// Backend implementation for the TeX Live Manager (`tlmgr`).
#[derive(Debug)]
pub struct TlmgrBackend {
    path: PathBuf,
    executor: Box<dyn CommandExecutor>,
}

impl TlmgrBackend {
    /// Creates a new `TlmgrBackend` for the given executable path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            executor: Box::new(RealCommandExecutor),
        }
    }

    /// Creates a new `TlmgrBackend` with a custom executor (for testing).
    pub fn with_executor(path: PathBuf, executor: Box<dyn CommandExecutor>) -> Self {
        Self { path, executor }
    }

    async fn run(&self, args: &[&str]) -> Result<()> {
        let output = self.executor.execute(&self.path, args).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!(
                "tlmgr {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }
}

/// Extracts package names from `tlmgr search --file` output.
///
/// The output lists each package as an unindented `name:` header followed by
/// indented file paths. A package is kept when at least one of its files
/// matches `pattern`. Architecture suffixes (`latex-bin.x86_64-linux`) are
/// dropped.
pub(crate) fn parse_tlmgr_search(stdout: &str, pattern: &str) -> Vec<String> {
    let matcher = Regex::new(pattern).ok();
    let mut packages: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            let Some(package) = &current else { continue };
            let path = line.trim();
            let hit = matcher.as_ref().map_or(true, |m| m.is_match(path));
            if hit && !packages.contains(package) {
                packages.push(package.clone());
            }
        } else if line.starts_with("tlmgr") {
            current = None;
        } else if let Some(header) = line.strip_suffix(':') {
            let name = header.split('.').next().unwrap_or(header).trim();
            current = (!name.is_empty()).then(|| name.to_string());
        } else {
            current = None;
        }
    }

    packages
}

#[async_trait]
impl PackageBackend for TlmgrBackend {
    async fn install(&self, package: &str) -> Result<InstallStatus> {
        let output = self.executor.execute(&self.path, &["install", package]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(InstallStatus::failed(package, stderr.to_string()));
        }

        Ok(InstallStatus::complete(package))
    }

    async fn search(&self, term: &SearchTerm) -> Result<Vec<String>> {
        let pattern = term.file_pattern();
        let output = self
            .executor
            .execute(&self.path, &["search", "--file", "--global", &pattern])
            .await?;

        if !output.status.success() {
            return Err(anyhow!(
                "tlmgr search failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tlmgr_search(&stdout, &pattern))
    }

    async fn update(&self, target: UpdateTarget) -> Result<()> {
        match target {
            UpdateTarget::Manager => self.run(&["update", "--self"]).await,
            UpdateTarget::Installed => self.run(&["update", "--all"]).await,
        }
    }

    async fn set_repository(&self, repository: &str) -> Result<()> {
        self.run(&["option", "repository", repository]).await
    }

    fn is_texlive(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "tlmgr"
    }
}

/// Backend implementation for the MiKTeX Package Manager (`mpm`).
#[derive(Debug)]
pub struct MiktexBackend {
    path: PathBuf,
    executor: Box<dyn CommandExecutor>,
}

impl MiktexBackend {
    /// Creates a new `MiktexBackend` for the given executable path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            executor: Box::new(RealCommandExecutor),
        }
    }

    /// Creates a new `MiktexBackend` with a custom executor (for testing).
    pub fn with_executor(path: PathBuf, executor: Box<dyn CommandExecutor>) -> Self {
        Self { path, executor }
    }
}

#[async_trait]
impl PackageBackend for MiktexBackend {
    async fn install(&self, package: &str) -> Result<InstallStatus> {
        // mpm --install <package>
        let output = self.executor.execute(&self.path, &["--install", package]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Ok(InstallStatus::failed(package, stderr.to_string()));
        }

        Ok(InstallStatus::complete(package))
    }

    async fn search(&self, term: &SearchTerm) -> Result<Vec<String>> {
        // mpm has no file search; fall back to the compiled-in table.
        Ok(match term {
            SearchTerm::File(file) => ctan_db::CTAN_DB
                .lookup(file)
                .map(|pkg| vec![pkg.to_string()])
                .unwrap_or_default(),
            SearchTerm::Font(_) => Vec::new(),
        })
    }

    async fn update(&self, target: UpdateTarget) -> Result<()> {
        let flag = match target {
            UpdateTarget::Manager => "--update-db",
            UpdateTarget::Installed => "--update",
        };
        let output = self.executor.execute(&self.path, &[flag]).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!(
                "mpm {} failed: {}",
                flag,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
        }
    }

    fn name(&self) -> &'static str {
        "miktex"
    }
}

/// A backend used when no package manager is detected.
#[derive(Debug)]
pub struct NoOpBackend;

#[async_trait]
impl PackageBackend for NoOpBackend {
    async fn install(&self, package: &str) -> Result<InstallStatus> {
        Ok(InstallStatus {
            name: package.to_string(),
            state: InstallState::Unknown,
            message: Some("No package manager found".into()),
        })
    }
    async fn search(&self, _term: &SearchTerm) -> Result<Vec<String>> {
        Ok(vec![])
    }
    async fn update(&self, _target: UpdateTarget) -> Result<()> {
        Ok(())
    }
    fn name(&self) -> &'static str {
        "none"
    }
}

/// High-level facade for TeX package management operations.
///
/// Auto-detects `tlmgr` (TeX Live) or `mpm` (MiKTeX) and is cheap to clone.
#[derive(Clone, Debug)]
pub struct PackageManager {
    backend: Arc<dyn PackageBackend>,
}

impl Default for PackageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageManager {
    /// Creates a new `PackageManager` by detecting available system tools.
    ///
    /// It checks for `tlmgr` and `mpm` in the system PATH.
    pub fn new() -> Self {
        if let Ok(path) = which::which("tlmgr") {
            info!("Detected tlmgr at {:?}", path);
            return Self {
                backend: Arc::new(TlmgrBackend::new(path)),
            };
        }
        if let Ok(path) = which::which("mpm") {
            info!("Detected miktex (mpm) at {:?}", path);
            return Self {
                backend: Arc::new(MiktexBackend::new(path)),
            };
        }

        warn!("No package manager detected");
        Self {
            backend: Arc::new(NoOpBackend),
        }
    }

    /// Creates a new `PackageManager` with a specific backend (useful for testing).
    pub fn with_backend(backend: Arc<dyn PackageBackend>) -> Self {
        Self { backend }
    }

    pub async fn install(&self, package: &str) -> Result<InstallStatus> {
        self.backend.install(package).await
    }

    pub async fn search(&self, term: &SearchTerm) -> Result<Vec<String>> {
        self.backend.search(term).await
    }

    pub async fn update(&self, target: UpdateTarget) -> Result<()> {
        self.backend.update(target).await
    }

    pub async fn set_repository(&self, repository: &str) -> Result<()> {
        self.backend.set_repository(repository).await
    }

    /// Checks if a valid package manager backend is available.
    pub fn is_available(&self) -> bool {
        self.backend.name() != "none"
    }

    /// Whether the full TeX Live distribution (and its `tlmgr`) is present.
    pub fn is_texlive(&self) -> bool {
        self.backend.is_texlive()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Returns a link to the package documentation on CTAN, if available.
    pub fn get_ctan_link(filename: &str) -> Option<String> {
        ctan_db::CTAN_DB
            .lookup(filename)
            .map(|pkg| format!("https://ctan.org/pkg/{}", pkg))
    }
}

#[cfg(test)]
mod tests;
