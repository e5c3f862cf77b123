//! Regular expressions for the TeX Live log dialect.
//!
//! Each matcher pairs a pattern with a function that turns its first capture
//! group into a [`SearchTerm`]. Patterns never cross line boundaries unless
//! they say so with an explicit `\s`.

use crate::signal::SearchTerm;
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) struct TermMatcher {
    regex: Regex,
    term: fn(&str) -> SearchTerm,
}

impl TermMatcher {
    fn new(pattern: &str, term: fn(&str) -> SearchTerm) -> Self {
        Self {
            regex: Regex::new(pattern).expect("built-in pattern must compile"),
            term,
        }
    }

    /// Pushes every term this matcher finds in `text` into `out`.
    pub(crate) fn collect(&self, text: &str, out: &mut Vec<SearchTerm>) {
        for caps in self.regex.captures_iter(text) {
            let raw = caps.get(1).map_or("", |m| m.as_str());
            let term = (self.term)(raw);
            if !term.name().is_empty() {
                out.push(term);
            }
        }
    }
}

fn file(raw: &str) -> SearchTerm {
    SearchTerm::File(raw.trim().to_string())
}

/// Normalises font references such as `[lmroman10-regular]`,
/// `file:HaranoAjiMincho-Regular.otf:-kern;jfm=ujis` or `/path/to/cmr10.tfm`
/// down to the family name.
pub(crate) fn font(raw: &str) -> SearchTerm {
    let name = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let name = name.strip_prefix("file:").unwrap_or(name);
    let name = name.split(':').next().unwrap_or(name);
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let name = match name.rsplit_once('.') {
        Some((stem, ext)) if matches!(ext, "tfm" | "afm" | "mf" | "otf" | "ttf" | "pfb") => stem,
        _ => name,
    };
    SearchTerm::Font(name.to_string())
}

pub(crate) static PACKAGE_MATCHERS: Lazy<Vec<TermMatcher>> = Lazy::new(|| {
    vec![
        // Fonts
        TermMatcher::new(r"! Font [^=\n]+=([^ \n]+).+ not loadable", font),
        TermMatcher::new(r#"! .*The font "([^"\n]+)" cannot be found"#, font),
        TermMatcher::new(r"!.+ error:.+\(file ([^)\n]+)\): ", font),
        TermMatcher::new(r#"Unable to find TFM file "([^"\n]+)""#, font),
        TermMatcher::new(r#"\(fontspec\)[ \t]+The font "([^"\n]+)" cannot be"#, font),
        // Packages and support files
        TermMatcher::new(r"Package widetext error: Install the ([^ \n]+) package", |m| {
            SearchTerm::File(format!("{m}.sty"))
        }),
        TermMatcher::new(r" File `(.+eps-converted-to\.pdf)'", |_| {
            SearchTerm::File("epstopdf".into())
        }),
        TermMatcher::new(r"(xdvipdfmx:fatal: pdf_ref_obj)", |_| {
            SearchTerm::File("epstopdf".into())
        }),
        TermMatcher::new(r" (tikzlibrary[^ \n]+?\.code\.tex)", file),
        TermMatcher::new(r" Loading '([^'\n]+)' aborted!", |m| {
            SearchTerm::File(format!("{m}.lua"))
        }),
        TermMatcher::new(r"! LaTeX Error: File `([^'\n]+)' not found", file),
        TermMatcher::new(r" file ['`]?([^' \n]+)'? not found", file),
        TermMatcher::new(r"the language definition file ([^\s]+) ", file),
        TermMatcher::new(r" \(file ([^)\n]+)\): cannot open ", file),
        TermMatcher::new(r"file `([^'\n]+)' .*is missing", file),
        TermMatcher::new(r"! CTeX fontset `([^'\n]+)' is unavailable", |m| {
            SearchTerm::File(format!("ctex-fontset-{m}.def"))
        }),
        TermMatcher::new(r": ([^:\n]+): command not found", file),
        TermMatcher::new(r"! I can't find file `([^'\n]+)'", file),
    ]
});

pub(crate) static HYPHENATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"Package babel Warning:\s*No hyphenation patterns were preloaded for\s+\(babel\)\s+the language [`']([^'\s]+)'",
    )
    .expect("built-in pattern must compile")
});

pub(crate) static RERUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(Rerun to get|Please \(re\)run|[rR]erun LaTeX\.)")
        .expect("built-in pattern must compile")
});

pub(crate) static INDEX_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:!! |ERROR: )(.*(?:\n[ \t]+--.*)*)").expect("built-in pattern must compile")
});

pub(crate) static STYLE_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"open style file ([^ \n]+)").expect("built-in pattern must compile")
});

pub(crate) static BIBLIO_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\\(bibdata|citation|bibstyle)\{").expect("built-in pattern must compile")
});

/// Known engine errors and the advice printed after them.
pub(crate) const ERROR_HINTS: &[(&str, &str)] = &[
    (
        "not set up for use with LaTeX",
        "Try a Unicode-aware engine such as xelatex or lualatex.",
    ),
    (
        "Missing $ inserted",
        "You may need to escape special characters such as $, _ or ^.",
    ),
    (
        "LaTeX Error: File `",
        "A required package is not installed. Enable automatic installation or install it manually.",
    ),
];
