use serde::{Deserialize, Serialize};

/// Something a package manager can be asked to look for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum SearchTerm {
    /// A file the engine tried to open (`tikz.sty`, `plain.bst`, `ecrm1000.tfm`).
    File(String),
    /// A font family; matched against font files with any weight suffix.
    Font(String),
}

impl SearchTerm {
    /// The bare name as it appeared in the log.
    pub fn name(&self) -> &str {
        match self {
            SearchTerm::File(name) | SearchTerm::Font(name) => name,
        }
    }

    /// Regular expression that matches the installed path of this term.
    ///
    /// Files match on their exact basename. Fonts match the family name with
    /// flexible whitespace, an optional `-Bold`/`-Italic`/`-Regular` style
    /// suffix and any common font file extension.
    pub fn file_pattern(&self) -> String {
        match self {
            SearchTerm::File(name) => format!("/{}$", regex::escape(name)),
            SearchTerm::Font(name) => {
                let family = name
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s*");
                format!(r"/{family}(-(Bold|Italic|Regular).*)?[.](tfm|afm|mf|otf|ttf)$")
            }
        }
    }
}

impl std::fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchTerm::File(name) => write!(f, "{name}"),
            SearchTerm::Font(name) => write!(f, "font {name}"),
        }
    }
}

/// The outcome of inspecting the output of one engine pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", content = "data")]
pub enum RecompilationSignal {
    NoIssue,
    MissingPackages(Vec<SearchTerm>),
    MissingHyphenationFile(String),
    NeedsRerun,
    /// The pass failed for a reason no package install can fix. Carries the
    /// best error text found, or `None` when there was no log to read.
    FatalError(Option<String>),
}

impl RecompilationSignal {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecompilationSignal::FatalError(_))
    }
}
