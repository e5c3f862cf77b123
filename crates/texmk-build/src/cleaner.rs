use std::io;
use std::path::{Path, PathBuf};
use texmk_log::MISSING_FONT_LOG;

/// Auxiliary files the engines and their helpers leave next to the output.
pub const AUX_EXTENSIONS: &[&str] = &[
    "log", "idx", "aux", "bcf", "blg", "bbl", "fls", "out", "lof", "lot", "toc", "nav", "snm",
    "vrb", "ilg", "ind", "xwm", "brf", "run.xml",
];

/// The auxiliary files of `stem` that exist in `dir`.
pub fn aux_files(dir: &Path, stem: &str) -> Vec<PathBuf> {
    AUX_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .chain(std::iter::once(dir.join(MISSING_FONT_LOG)))
        .filter(|path| path.is_file())
        .collect()
}

/// Deletes the auxiliary files of `stem` in `dir`, returning what was removed.
pub fn cleanup(dir: &Path, stem: &str) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in aux_files(dir, stem) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    if !removed.is_empty() {
        log::debug!("Removed {} auxiliary files from {}", removed.len(), dir.display());
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cleanup_removes_only_aux_files() {
        let dir = tempdir().unwrap();
        for name in ["paper.aux", "paper.log", "paper.run.xml", "missfont.log", "paper.pdf", "paper.tex", "other.aux"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let mut removed = cleanup(dir.path(), "paper").unwrap();
        removed.sort();

        let mut expected: Vec<PathBuf> = ["missfont.log", "paper.aux", "paper.log", "paper.run.xml"]
            .iter()
            .map(|name| dir.path().join(name))
            .collect();
        expected.sort();
        assert_eq!(removed, expected);

        assert!(dir.path().join("paper.pdf").exists());
        assert!(dir.path().join("paper.tex").exists());
        assert!(dir.path().join("other.aux").exists());
    }

    #[test]
    fn test_cleanup_of_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(cleanup(dir.path(), "paper").unwrap().is_empty());
    }
}
