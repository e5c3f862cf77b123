use crate::package_manager::{InstallState, PackageManager, UpdateTarget};
use log::{info, warn};
use std::collections::BTreeSet;
use texmk_log::SearchTerm;

/// Repository tried once when an install from the configured one fails.
pub const CTAN_MIRROR: &str = "https://mirror.ctan.org/systems/texlive/tlnet";

/// The result of installing a batch of packages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInstallOutcome {
    /// True only when every requested package was installed.
    pub success: bool,
    /// Packages installed by this call, in order.
    pub installed: Vec<String>,
}

/// Finds and installs the packages behind missing-file signals.
///
/// One resolver lives for one top-level compilation. It remembers whether the
/// package index was already refreshed and which packages it installed, so
/// repeated discoveries never refresh twice or reinstall the same package.
#[derive(Debug)]
pub struct PackageResolver {
    manager: PackageManager,
    auto_install: bool,
    quiet: bool,
    refreshed: bool,
    repository_switched: bool,
    installed: BTreeSet<String>,
}

impl PackageResolver {
    /// Creates a resolver. Automatic installation is only permitted when it
    /// was requested and TeX Live's package manager is present. MiKTeX
    /// installs on demand by itself and its search misses most files.
    pub fn new(manager: PackageManager, auto_install: bool) -> Self {
        let permitted = auto_install && manager.is_texlive();
        if auto_install && !permitted {
            warn!(
                "Automatic package installation is unavailable: {} is not TeX Live",
                manager.backend_name()
            );
        }
        Self {
            manager,
            auto_install: permitted,
            quiet: false,
            refreshed: false,
            repository_switched: false,
            installed: BTreeSet::new(),
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Whether missing dependencies may be searched for and installed.
    pub fn auto_install(&self) -> bool {
        self.auto_install
    }

    pub fn manager(&self) -> &PackageManager {
        &self.manager
    }

    /// Whether `package` was installed by this resolver.
    pub fn has_installed(&self, package: &str) -> bool {
        self.installed.contains(package)
    }

    /// Searches every term and returns the distinct candidate packages.
    ///
    /// A term whose search fails contributes nothing; an empty result means
    /// no package is known to provide any of the terms.
    pub async fn search_packages(&self, terms: &[SearchTerm]) -> Vec<String> {
        let mut packages: Vec<String> = Vec::new();
        for term in terms {
            self.progress(&format!("finding package for {}", term));
            match self.manager.search(term).await {
                Ok(found) => {
                    for package in found {
                        if !packages.contains(&package) {
                            packages.push(package);
                        }
                    }
                }
                Err(e) => warn!("Package search for {} failed: {}", term, e),
            }
        }
        packages
    }

    /// Installs `packages` in order, stopping at the first failure.
    ///
    /// When an install fails the first time, the resolver switches to
    /// [`CTAN_MIRROR`] (if the backend supports it) and retries that package
    /// once.
    pub async fn install_packages(&mut self, packages: &[String]) -> PackageInstallOutcome {
        let count = packages.len();
        self.progress(&format!(
            "> {} {} to install",
            count,
            if count == 1 { "package" } else { "packages" }
        ));

        let mut installed = Vec::with_capacity(count);
        for (index, package) in packages.iter().enumerate() {
            self.progress(&format!("> installing {} ({} of {})", package, index + 1, count));

            let mut ok = self.install_one(package).await;
            if !ok && !self.repository_switched {
                self.repository_switched = true;
                match self.manager.set_repository(CTAN_MIRROR).await {
                    Ok(()) => {
                        self.progress(&format!("> retrying {} from {}", package, CTAN_MIRROR));
                        ok = self.install_one(package).await;
                    }
                    Err(e) => log::debug!("Not switching repository: {}", e),
                }
            }

            if !ok {
                return PackageInstallOutcome {
                    success: false,
                    installed,
                };
            }
            self.installed.insert(package.clone());
            installed.push(package.clone());
        }

        PackageInstallOutcome {
            success: true,
            installed,
        }
    }

    /// Updates the package manager itself and/or every installed package.
    /// Failures are logged and otherwise ignored.
    pub async fn update_packages(&self, self_update: bool, all: bool) {
        if self_update {
            if let Err(e) = self.manager.update(UpdateTarget::Manager).await {
                warn!("Updating {} failed: {}", self.manager.backend_name(), e);
            }
        }
        if all {
            if let Err(e) = self.manager.update(UpdateTarget::Installed).await {
                warn!("Updating installed packages failed: {}", e);
            }
        }
    }

    /// Refreshes the package index, then the installed packages, at most once
    /// per resolver. Returns whether a refresh happened.
    pub async fn refresh_once(&mut self) -> bool {
        if self.refreshed {
            return false;
        }
        self.refreshed = true;

        self.progress(&format!("updating {}", self.manager.backend_name()));
        self.update_packages(true, false).await;
        self.progress("updating existing packages");
        self.update_packages(false, true).await;
        true
    }

    async fn install_one(&self, package: &str) -> bool {
        match self.manager.install(package).await {
            Ok(status) if status.state == InstallState::Complete => true,
            Ok(status) => {
                warn!(
                    "Installing {} failed: {}",
                    package,
                    status.message.unwrap_or_default().trim()
                );
                false
            }
            Err(e) => {
                warn!("Installing {} failed: {}", package, e);
                false
            }
        }
    }

    fn progress(&self, message: &str) {
        if !self.quiet {
            info!("{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package_manager::{InstallStatus, MiktexBackend, NoOpBackend, PackageBackend};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct MockBackend {
        search_results: HashMap<String, Vec<String>>,
        failing_search: Vec<String>,
        /// Packages that fail until the repository is switched.
        fail_before_switch: Vec<String>,
        /// Packages that always fail.
        always_fail: Vec<String>,
        supports_repository: bool,
        not_texlive: bool,
        switched: Mutex<bool>,
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PackageBackend for MockBackend {
        async fn install(&self, package: &str) -> Result<InstallStatus> {
            self.log.lock().unwrap().push(format!("install {}", package));
            let switched = *self.switched.lock().unwrap();
            let fails = self.always_fail.iter().any(|p| p == package)
                || (!switched && self.fail_before_switch.iter().any(|p| p == package));
            Ok(InstallStatus {
                name: package.to_string(),
                state: if fails {
                    InstallState::Failed
                } else {
                    InstallState::Complete
                },
                message: fails.then(|| "refused".to_string()),
            })
        }

        async fn search(&self, term: &SearchTerm) -> Result<Vec<String>> {
            self.log.lock().unwrap().push(format!("search {}", term.name()));
            if self.failing_search.iter().any(|t| t == term.name()) {
                return Err(anyhow!("network down"));
            }
            Ok(self.search_results.get(term.name()).cloned().unwrap_or_default())
        }

        async fn update(&self, target: UpdateTarget) -> Result<()> {
            self.log.lock().unwrap().push(format!("update {:?}", target));
            Ok(())
        }

        async fn set_repository(&self, repository: &str) -> Result<()> {
            if !self.supports_repository {
                return Err(anyhow!("unsupported"));
            }
            self.log.lock().unwrap().push(format!("repository {}", repository));
            *self.switched.lock().unwrap() = true;
            Ok(())
        }

        fn is_texlive(&self) -> bool {
            !self.not_texlive
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn resolver(backend: Arc<MockBackend>) -> PackageResolver {
        PackageResolver::new(PackageManager::with_backend(backend), true).with_quiet(true)
    }

    #[test]
    fn test_auto_install_requires_texlive() {
        let none = PackageResolver::new(PackageManager::with_backend(Arc::new(NoOpBackend)), true);
        assert!(!none.auto_install());

        let miktex = PackageResolver::new(
            PackageManager::with_backend(Arc::new(MiktexBackend::new(PathBuf::from("mpm")))),
            true,
        );
        assert!(!miktex.auto_install());

        let partial = PackageResolver::new(
            PackageManager::with_backend(Arc::new(MockBackend {
                not_texlive: true,
                ..Default::default()
            })),
            true,
        );
        assert!(!partial.auto_install());

        let disabled =
            PackageResolver::new(PackageManager::with_backend(Arc::new(MockBackend::default())), false);
        assert!(!disabled.auto_install());

        assert!(resolver(Arc::new(MockBackend::default())).auto_install());
    }

    #[tokio::test]
    async fn test_search_unions_and_deduplicates() {
        let mut search_results = HashMap::new();
        search_results.insert("tikz.sty".to_string(), vec!["pgf".to_string()]);
        search_results.insert(
            "pgfplots.sty".to_string(),
            vec!["pgfplots".to_string(), "pgf".to_string()],
        );
        let backend = Arc::new(MockBackend {
            search_results,
            failing_search: vec!["broken.sty".into()],
            ..Default::default()
        });
        let resolver = resolver(backend);

        let found = resolver
            .search_packages(&[
                SearchTerm::File("tikz.sty".into()),
                SearchTerm::File("broken.sty".into()),
                SearchTerm::File("pgfplots.sty".into()),
            ])
            .await;

        assert_eq!(found, vec!["pgf".to_string(), "pgfplots".to_string()]);
    }

    #[tokio::test]
    async fn test_search_with_no_candidates() {
        let resolver = resolver(Arc::new(MockBackend::default()));
        let found = resolver
            .search_packages(&[SearchTerm::File("unknown.sty".into())])
            .await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_install_records_packages() {
        let mut resolver = resolver(Arc::new(MockBackend::default()));

        let outcome = resolver
            .install_packages(&["pgf".to_string(), "xcolor".to_string()])
            .await;

        assert_eq!(
            outcome,
            PackageInstallOutcome {
                success: true,
                installed: vec!["pgf".to_string(), "xcolor".to_string()],
            }
        );
        assert!(resolver.has_installed("pgf"));
        assert!(!resolver.has_installed("amsmath"));
    }

    #[tokio::test]
    async fn test_install_switches_repository_once() {
        let backend = Arc::new(MockBackend {
            fail_before_switch: vec!["pgf".into()],
            supports_repository: true,
            ..Default::default()
        });
        let mut resolver = resolver(backend.clone());

        let outcome = resolver.install_packages(&["pgf".to_string()]).await;

        assert!(outcome.success);
        let log = backend.log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "install pgf".to_string(),
                format!("repository {}", CTAN_MIRROR),
                "install pgf".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_install_failure_stops_the_batch() {
        let backend = Arc::new(MockBackend {
            always_fail: vec!["broken".into()],
            supports_repository: true,
            ..Default::default()
        });
        let mut resolver = resolver(backend.clone());

        let outcome = resolver
            .install_packages(&["pgf".to_string(), "broken".to_string(), "xcolor".to_string()])
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.installed, vec!["pgf".to_string()]);
        let log = backend.log.lock().unwrap();
        assert!(!log.iter().any(|entry| entry == "install xcolor"));
        // The repository is only switched once, the retry also failed.
        assert_eq!(log.iter().filter(|entry| entry.starts_with("repository")).count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_happens_once() {
        let backend = Arc::new(MockBackend::default());
        let mut resolver = resolver(backend.clone());

        assert!(resolver.refresh_once().await);
        assert!(!resolver.refresh_once().await);

        let log = backend.log.lock().unwrap();
        assert_eq!(
            *log,
            vec!["update Manager".to_string(), "update Installed".to_string()]
        );
    }
}
