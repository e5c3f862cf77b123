use super::*;
use std::path::PathBuf;

const TLMGR_SEARCH_OUTPUT: &str = "\
tlmgr: package repository https://mirror.ctan.org/systems/texlive/tlnet (verified)
pgf:
\ttexmf-dist/tex/latex/pgf/frontendlayer/tikz.sty
pgf-blur:
\ttexmf-dist/tex/latex/pgf-blur/tikzlibraryshadows.blur.code.tex
latex-bin.x86_64-linux:
\tbin/x86_64-linux/tikz.sty
";

#[test]
fn test_parse_tlmgr_search_filters_by_pattern() {
    let packages = parse_tlmgr_search(TLMGR_SEARCH_OUTPUT, r"/tikz\.sty$");
    assert_eq!(packages, vec!["pgf".to_string(), "latex-bin".to_string()]);
}

#[test]
fn test_parse_tlmgr_search_empty() {
    let output = "tlmgr: package repository https://mirror.ctan.org (verified)\n";
    assert!(parse_tlmgr_search(output, r"/missing\.sty$").is_empty());
    assert!(parse_tlmgr_search("", r"/missing\.sty$").is_empty());
}

#[test]
fn test_ctan_links() {
    assert_eq!(
        PackageManager::get_ctan_link("geometry.sty"),
        Some("https://ctan.org/pkg/geometry".to_string())
    );
    assert_eq!(PackageManager::get_ctan_link("nonexistent.sty"), None);
}

#[test]
fn test_package_manager_capabilities() {
    let none = PackageManager::with_backend(Arc::new(NoOpBackend));
    assert!(!none.is_available());
    assert!(!none.is_texlive());

    let tlmgr = PackageManager::with_backend(Arc::new(TlmgrBackend::new(PathBuf::from("tlmgr"))));
    assert!(tlmgr.is_available());
    assert!(tlmgr.is_texlive());

    let miktex = PackageManager::with_backend(Arc::new(MiktexBackend::new(PathBuf::from("mpm"))));
    assert!(miktex.is_available());
    assert!(!miktex.is_texlive());
    assert_eq!(miktex.backend_name(), "miktex");
}

#[tokio::test]
async fn test_tlmgr_install_success() {
    let mock = MockCommandExecutor::replying(0, "install done", "");
    let calls = mock.calls.clone();
    let backend = TlmgrBackend::with_executor(PathBuf::from("/bin/tlmgr"), Box::new(mock));

    let status = backend.install("pgf").await.unwrap();

    assert_eq!(status.state, InstallState::Complete);
    assert_eq!(calls.lock().unwrap()[0], vec!["install", "pgf"]);
}

#[tokio::test]
async fn test_tlmgr_install_failure() {
    let mock = MockCommandExecutor::replying(1, "", "package not found");
    let backend = TlmgrBackend::with_executor(PathBuf::from("/bin/tlmgr"), Box::new(mock));

    let status = backend.install("invalid").await.unwrap();

    assert_eq!(status.state, InstallState::Failed);
    assert!(status.message.unwrap().contains("package not found"));
}

#[tokio::test]
async fn test_tlmgr_search_uses_file_pattern() {
    let mock = MockCommandExecutor::replying(0, TLMGR_SEARCH_OUTPUT, "");
    let calls = mock.calls.clone();
    let backend = TlmgrBackend::with_executor(PathBuf::from("/bin/tlmgr"), Box::new(mock));

    let results = backend
        .search(&SearchTerm::File("tikz.sty".into()))
        .await
        .unwrap();

    assert_eq!(results, vec!["pgf".to_string(), "latex-bin".to_string()]);
    assert_eq!(
        calls.lock().unwrap()[0],
        vec!["search", "--file", "--global", r"/tikz\.sty$"]
    );
}

#[tokio::test]
async fn test_tlmgr_search_failure() {
    let mock = MockCommandExecutor::replying(1, "", "cannot contact mirror");
    let backend = TlmgrBackend::with_executor(PathBuf::from("/bin/tlmgr"), Box::new(mock));

    let result = backend.search(&SearchTerm::File("x.sty".into())).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_tlmgr_update_and_repository_arguments() {
    let mock = MockCommandExecutor::replying(0, "", "");
    let calls = mock.calls.clone();
    let backend = TlmgrBackend::with_executor(PathBuf::from("/bin/tlmgr"), Box::new(mock));

    backend.update(UpdateTarget::Manager).await.unwrap();
    backend.update(UpdateTarget::Installed).await.unwrap();
    backend.set_repository("https://example.org/tlnet").await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0], vec!["update", "--self"]);
    assert_eq!(calls[1], vec!["update", "--all"]);
    assert_eq!(calls[2], vec!["option", "repository", "https://example.org/tlnet"]);
}

#[tokio::test]
async fn test_tlmgr_update_failure_is_error() {
    let mock = MockCommandExecutor::replying(0, "", "").then(1, "", "no network");
    let backend = TlmgrBackend::with_executor(PathBuf::from("/bin/tlmgr"), Box::new(mock));

    let err = backend.update(UpdateTarget::Manager).await.unwrap_err();
    assert!(err.to_string().contains("no network"));
    assert!(backend.update(UpdateTarget::Installed).await.is_ok());
}

#[tokio::test]
async fn test_miktex_install_and_update() {
    let mock = MockCommandExecutor::replying(0, "", "").then(1, "", "failed");
    let calls = mock.calls.clone();
    let backend = MiktexBackend::with_executor(PathBuf::from("/bin/mpm"), Box::new(mock));

    let status = backend.install("pgf").await.unwrap();
    assert_eq!(status.state, InstallState::Failed);

    backend.update(UpdateTarget::Manager).await.unwrap();
    assert_eq!(calls.lock().unwrap()[1], vec!["--update-db"]);
}

#[tokio::test]
async fn test_miktex_search_uses_ctan_table() {
    let backend = MiktexBackend::with_executor(
        PathBuf::from("/bin/mpm"),
        Box::new(MockCommandExecutor::default()),
    );

    let found = backend.search(&SearchTerm::File("tikz.sty".into())).await.unwrap();
    assert_eq!(found, vec!["pgf".to_string()]);

    let font = backend.search(&SearchTerm::Font("ecrm1000".into())).await.unwrap();
    assert!(font.is_empty());

    assert!(backend.set_repository("https://example.org").await.is_err());
}

#[tokio::test]
async fn test_noop_backend() {
    let pm = PackageManager::with_backend(Arc::new(NoOpBackend));

    let status = pm.install("amsmath").await.unwrap();
    assert_eq!(status.state, InstallState::Unknown);
    assert!(pm.search(&SearchTerm::File("amsmath.sty".into())).await.unwrap().is_empty());
    assert!(pm.update(UpdateTarget::Installed).await.is_ok());
}
