use std::env;
use texmk_log::SearchTerm;
use texmk_package::package_manager::{InstallState, PackageManager};
use texmk_package::PackageResolver;

#[tokio::test]
async fn test_package_manager_fallback_to_noop() {
    // This is the only test in this binary, so changing PATH cannot race
    // with another test.
    let original_path = env::var("PATH").unwrap_or_default();
    unsafe {
        env::set_var("PATH", "");
    }

    let pm = PackageManager::new();

    unsafe {
        env::set_var("PATH", original_path);
    }

    assert!(!pm.is_available());
    assert_eq!(pm.backend_name(), "none");

    let status = pm.install("some_package").await.unwrap();
    assert_eq!(status.state, InstallState::Unknown);
    assert_eq!(status.message, Some("No package manager found".into()));

    let found = pm
        .search(&SearchTerm::File("some_package.sty".into()))
        .await
        .unwrap();
    assert!(found.is_empty());

    // Without a backend the resolver must never try to install anything.
    let resolver = PackageResolver::new(pm, true);
    assert!(!resolver.auto_install());
}
