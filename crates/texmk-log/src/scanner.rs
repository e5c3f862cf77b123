use crate::patterns::{
    ERROR_HINTS, HYPHENATION, INDEX_ERROR, PACKAGE_MATCHERS, RERUN, STYLE_FILE, font,
};
use crate::signal::{RecompilationSignal, SearchTerm};

/// Languages babel warns about that have no hyphenation package to install.
const LANGUAGES_WITHOUT_PATTERNS: &[&str] = &["chinese", "chinese-hans", "chinese-hant"];

/// Upper bound on the number of lines quoted from a single error block.
const MAX_ERROR_LINES: usize = 8;

/// Extracts compilation signals from the logs of one family of engines.
///
/// Every method is a pure function of its text arguments and must tolerate
/// truncated, empty or otherwise malformed input.
pub trait LogScanner: Send + Sync {
    /// Files and fonts the engine could not find, deduplicated in first-seen
    /// order. `missfont` is the content of the engine's `missfont.log`.
    fn missing_packages(&self, log: &str, missfont: Option<&str>) -> Vec<SearchTerm>;

    /// The hyphenation package for the first language reported without
    /// patterns.
    fn missing_hyphenation_file(&self, log: &str) -> Option<String>;

    /// Whether the engine asked for another pass to settle references.
    fn needs_rerun(&self, log: &str) -> bool;

    /// Best-effort error text for the user, falling back to `stderr`.
    fn latex_error(&self, log: &str, stderr: &str) -> String;

    /// Error reported by the index tool in its own log.
    fn index_error(&self, log: &str) -> Option<String>;

    /// Style file the bibliography tool failed to open.
    fn bibliography_style_file(&self, log: &str) -> Option<String>;

    /// Classifies the outcome of a pass.
    ///
    /// `log` is `None` when the engine left no log behind, which is always
    /// fatal. A failed pass with nothing recognisable in the log is fatal as
    /// well, never silently successful.
    fn inspect(
        &self,
        log: Option<&str>,
        stderr: &str,
        succeeded: bool,
        missfont: Option<&str>,
    ) -> RecompilationSignal {
        let Some(log) = log else {
            return RecompilationSignal::FatalError(None);
        };

        if succeeded {
            if let Some(file) = self.missing_hyphenation_file(log) {
                return RecompilationSignal::MissingHyphenationFile(file);
            }
            if self.needs_rerun(log) {
                return RecompilationSignal::NeedsRerun;
            }
            return RecompilationSignal::NoIssue;
        }

        let mut terms = self.missing_packages(log, missfont);
        for term in self.missing_packages(stderr, None) {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
        if terms.is_empty() {
            RecompilationSignal::FatalError(Some(self.latex_error(log, stderr)))
        } else {
            RecompilationSignal::MissingPackages(terms)
        }
    }
}

/// Scanner for the log dialect shared by pdfTeX, XeTeX and LuaTeX as shipped
/// with TeX Live and MiKTeX, together with makeindex/xindy and
/// bibtex/biber logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TexLiveLogScanner;

impl TexLiveLogScanner {
    pub fn new() -> Self {
        Self
    }
}

impl LogScanner for TexLiveLogScanner {
    fn missing_packages(&self, log: &str, missfont: Option<&str>) -> Vec<SearchTerm> {
        let mut found = Vec::new();
        for matcher in PACKAGE_MATCHERS.iter() {
            matcher.collect(log, &mut found);
        }

        // missfont.log holds one mktex* command line per font; the font is
        // the last argument.
        if let Some(missfont) = missfont {
            for line in missfont.lines() {
                if let Some(last) = line.split_whitespace().last() {
                    found.push(font(last));
                }
            }
        }

        let mut terms: Vec<SearchTerm> = Vec::with_capacity(found.len());
        for term in found {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
        terms
    }

    fn missing_hyphenation_file(&self, log: &str) -> Option<String> {
        let caps = HYPHENATION.captures(log)?;
        let language = caps.get(1)?.as_str().to_lowercase();
        if LANGUAGES_WITHOUT_PATTERNS.contains(&language.as_str()) {
            return None;
        }
        if language == "ngerman" {
            return Some("hyphen-german".to_string());
        }
        Some(format!("hyphen-{language}"))
    }

    fn needs_rerun(&self, log: &str) -> bool {
        RERUN.is_match(log)
    }

    fn latex_error(&self, log: &str, stderr: &str) -> String {
        let mut lines = log.lines().skip_while(|l| !l.starts_with("! "));
        let mut block: Vec<&str> = Vec::new();
        if let Some(first) = lines.next() {
            block.push(first.trim_end());
            for line in lines.take(MAX_ERROR_LINES - 1) {
                if line.trim().is_empty() || line.starts_with("Here is how much") {
                    break;
                }
                block.push(line.trim_end());
            }
        }

        if block.is_empty() {
            return stderr.trim().to_string();
        }

        let mut message = block.join("\n");
        if let Some((_, hint)) = ERROR_HINTS.iter().find(|(needle, _)| message.contains(needle)) {
            message.push_str("\n\n");
            message.push_str(hint);
        }
        message
    }

    fn index_error(&self, log: &str) -> Option<String> {
        INDEX_ERROR
            .captures(log)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    fn bibliography_style_file(&self, log: &str) -> Option<String> {
        STYLE_FILE
            .captures(log)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_and_file_not_found_are_both_reported() {
        let log = "\
! Font \\T1/cmr/m/n/10=ecrm1000 at 10pt not loadable: Metric (TFM) file not found.
! LaTeX Error: File `tikz.sty' not found.
";
        let mut names: Vec<_> = TexLiveLogScanner
            .missing_packages(log, None)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["ecrm1000", "tikz.sty"]);
    }

    #[test]
    fn test_duplicate_references_collapse() {
        let log = "\
! LaTeX Error: File `xcolor.sty' not found.
! LaTeX Error: File `xcolor.sty' not found.
";
        let terms = TexLiveLogScanner.missing_packages(log, None);
        assert_eq!(terms, vec![SearchTerm::File("xcolor.sty".into())]);
    }

    #[test]
    fn test_missfont_log_adds_fonts() {
        let missfont = "mktextfm ecrm1000\nmktexpk --mfmode / --bdpi 600 --mag 1+0/600 --dpi 600 ecbx1200\n";
        let terms = TexLiveLogScanner.missing_packages("", Some(missfont));
        assert_eq!(
            terms,
            vec![
                SearchTerm::Font("ecrm1000".into()),
                SearchTerm::Font("ecbx1200".into())
            ]
        );
    }

    #[test]
    fn test_font_names_are_normalised() {
        assert_eq!(font("[lmroman10-regular]"), SearchTerm::Font("lmroman10-regular".into()));
        assert_eq!(
            font("file:HaranoAjiMincho-Regular.otf:-kern;jfm=ujis"),
            SearchTerm::Font("HaranoAjiMincho-Regular".into())
        );
        assert_eq!(font("/usr/share/fonts/cmr10.tfm"), SearchTerm::Font("cmr10".into()));
    }

    #[test]
    fn test_special_matchers() {
        let log = "\
! Package widetext error: Install the cuted package from sttools
LaTeX Warning: File `figure-eps-converted-to.pdf' not found on input line 3.
! CTeX fontset `mac' is unavailable in current mode.
 Loading 'luaotfload-main' aborted!
";
        let names: Vec<_> = TexLiveLogScanner
            .missing_packages(log, None)
            .into_iter()
            .map(|t| t.name().to_string())
            .collect();
        assert!(names.contains(&"cuted.sty".to_string()));
        assert!(names.contains(&"epstopdf".to_string()));
        assert!(names.contains(&"ctex-fontset-mac.def".to_string()));
        assert!(names.contains(&"luaotfload-main.lua".to_string()));
    }

    #[test]
    fn test_hyphenation_first_language_wins() {
        let log = "\
Package babel Warning: No hyphenation patterns were preloaded for
(babel)                the language `Swedish' into the format.
Package babel Warning: No hyphenation patterns were preloaded for
(babel)                the language `Danish' into the format.
";
        assert_eq!(
            TexLiveLogScanner.missing_hyphenation_file(log),
            Some("hyphen-swedish".to_string())
        );
    }

    #[test]
    fn test_hyphenation_special_cases() {
        let ngerman = "Package babel Warning: No hyphenation patterns were preloaded for\n(babel)                the language `ngerman' into the format.\n";
        assert_eq!(
            TexLiveLogScanner.missing_hyphenation_file(ngerman),
            Some("hyphen-german".to_string())
        );

        let chinese = "Package babel Warning: No hyphenation patterns were preloaded for\n(babel)                the language `chinese' into the format.\n";
        assert_eq!(TexLiveLogScanner.missing_hyphenation_file(chinese), None);
    }

    #[test]
    fn test_needs_rerun() {
        let scanner = TexLiveLogScanner;
        assert!(scanner.needs_rerun(
            "LaTeX Warning: Label(s) may have changed. Rerun to get cross-references right."
        ));
        assert!(scanner.needs_rerun("Package biblatex Warning: Please (re)run Biber on the file:"));
        assert!(scanner.needs_rerun("Package longtable Warning: Table widths have changed. Rerun LaTeX."));
        assert!(!scanner.needs_rerun("Output written on paper.pdf (1 page, 1234 bytes)."));
    }

    #[test]
    fn test_latex_error_block_and_hint() {
        let log = "\
(./paper.tex
! Missing $ inserted.
<inserted text>
                $
l.12 a_b

Here is how much of TeX's memory you used:
";
        let message = TexLiveLogScanner.latex_error(log, "");
        assert!(message.starts_with("! Missing $ inserted."));
        assert!(message.contains("l.12 a_b"));
        assert!(!message.contains("Here is how much"));
        assert!(message.ends_with("You may need to escape special characters such as $, _ or ^."));
    }

    #[test]
    fn test_latex_error_falls_back_to_stderr() {
        let message = TexLiveLogScanner.latex_error("This is pdfTeX\n", "  fatal: out of memory \n");
        assert_eq!(message, "fatal: out of memory");
        assert_eq!(TexLiveLogScanner.latex_error("", ""), "");
    }

    #[test]
    fn test_index_error() {
        let ilg = "\
This is makeindex, version 2.16 [TeX Live 2023] (kpathsea + Thai support).
Scanning input file paper.idx...
!! Input index error (file = paper.idx, line = 2):
   -- Extra `@' at position 5 of first argument.
done (1 entries accepted, 1 rejected).
";
        let error = TexLiveLogScanner.index_error(ilg).unwrap();
        assert!(error.starts_with("Input index error"));
        assert!(error.contains("Extra `@'"));
        assert_eq!(TexLiveLogScanner.index_error("done (3 entries accepted, 0 rejected).\n"), None);
    }

    #[test]
    fn test_bibliography_style_file() {
        let blg = "This is BibTeX, Version 0.99d\nI couldn't open style file apalike2.bst\n---line 3 of file paper.aux\n";
        assert_eq!(
            TexLiveLogScanner.bibliography_style_file(blg),
            Some("apalike2.bst".to_string())
        );
        assert_eq!(TexLiveLogScanner.bibliography_style_file("Database file #1: refs.bib\n"), None);
    }

    #[test]
    fn test_inspect_without_log_is_fatal() {
        let signal = TexLiveLogScanner.inspect(None, "boom", false, None);
        assert_eq!(signal, RecompilationSignal::FatalError(None));
    }

    #[test]
    fn test_inspect_unrecognised_failure_is_fatal() {
        let signal = TexLiveLogScanner.inspect(Some("This is pdfTeX\n"), "", false, None);
        assert!(signal.is_fatal());
    }

    #[test]
    fn test_inspect_success_prefers_hyphenation_over_rerun() {
        let log = "\
Package babel Warning: No hyphenation patterns were preloaded for
(babel)                the language `Dutch' into the format.
LaTeX Warning: Label(s) may have changed. Rerun to get cross-references right.
";
        assert_eq!(
            TexLiveLogScanner.inspect(Some(log), "", true, None),
            RecompilationSignal::MissingHyphenationFile("hyphen-dutch".into())
        );
        assert_eq!(
            TexLiveLogScanner.inspect(Some("Rerun to get cross-references right."), "", true, None),
            RecompilationSignal::NeedsRerun
        );
        assert_eq!(
            TexLiveLogScanner.inspect(Some("Output written"), "", true, None),
            RecompilationSignal::NoIssue
        );
    }

    #[test]
    fn test_inspect_merges_stderr_terms() {
        let signal = TexLiveLogScanner.inspect(
            Some("! LaTeX Error: File `tikz.sty' not found.\n"),
            "sh: 1: rsvg-convert: command not found\n",
            false,
            None,
        );
        assert_eq!(
            signal,
            RecompilationSignal::MissingPackages(vec![
                SearchTerm::File("tikz.sty".into()),
                SearchTerm::File("rsvg-convert".into()),
            ])
        );
    }
}
