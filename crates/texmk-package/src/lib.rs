//! # texmk Package
//!
//! Missing-dependency resolution for the texmk compilation driver.
//!
//! ## Modules
//!
//! - [`package_manager`] - Backends for TeX package managers (tlmgr, MiKTeX)
//!   behind a single [`PackageManager`](package_manager::PackageManager) facade
//! - [`resolver`] - The stateful [`PackageResolver`](resolver::PackageResolver)
//!   used by one compilation: permission gate, once-per-session index refresh,
//!   search and install
//!
//! ## Design
//!
//! - **Distribution agnostic**: every distribution is a
//!   [`PackageBackend`](package_manager::PackageBackend)
//! - **Testable**: subprocesses go through
//!   [`CommandExecutor`](package_manager::CommandExecutor), backends can be
//!   replaced wholesale with
//!   [`PackageManager::with_backend`](package_manager::PackageManager::with_backend)
//!
//! ```
//! use std::sync::Arc;
//! use texmk_package::package_manager::{NoOpBackend, PackageManager};
//! use texmk_package::resolver::PackageResolver;
//!
//! let manager = PackageManager::with_backend(Arc::new(NoOpBackend));
//! let resolver = PackageResolver::new(manager, true);
//!
//! // Nothing to install with, so nothing may be installed.
//! assert!(!resolver.auto_install());
//! ```

pub mod package_manager;
pub mod resolver;

pub use package_manager::PackageManager;
pub use resolver::{PackageInstallOutcome, PackageResolver};
