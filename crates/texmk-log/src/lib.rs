//! # texmk Log Scanner
//!
//! Turns the semi-structured text that TeX engines, index tools and
//! bibliography tools leave behind into typed [`RecompilationSignal`]s.
//!
//! ## Overview
//!
//! The compilation driver has no feedback channel from the external tools
//! other than exit codes and log text. This crate isolates every piece of log
//! interpretation behind the [`LogScanner`] trait so that the driver only ever
//! sees signals:
//!
//! - **Missing packages and fonts**: "file not found" and font-loading
//!   idioms, plus the engine's `missfont.log`
//! - **Missing hyphenation patterns**: babel's preload warning
//! - **Rerun requests**: "Rerun to get cross-references right" and friends
//! - **Index and bibliography errors**: `makeindex`/`xindy` and
//!   `bibtex`/`biber` log idioms
//!
//! One implementation exists per log dialect. [`TexLiveLogScanner`] covers
//! pdfTeX, XeTeX and LuaTeX as distributed by TeX Live and MiKTeX.
//!
//! ## Examples
//!
//! ```
//! use texmk_log::{LogScanner, RecompilationSignal, SearchTerm, TexLiveLogScanner};
//!
//! let log = "! LaTeX Error: File `tikz.sty' not found.\n";
//! let signal = TexLiveLogScanner.inspect(Some(log), "", false, None);
//! assert_eq!(
//!     signal,
//!     RecompilationSignal::MissingPackages(vec![SearchTerm::File("tikz.sty".into())])
//! );
//! ```

/// Helpers for bibtex's `.aux` control file.
pub mod auxfile;
mod patterns;
/// The [`LogScanner`] trait and its TeX Live implementation.
pub mod scanner;
/// Signal types produced by scanners.
pub mod signal;

pub use auxfile::{contains_biblio_data, strip_bibdata_extensions};
pub use scanner::{LogScanner, TexLiveLogScanner};
pub use signal::{RecompilationSignal, SearchTerm};

use std::path::Path;

/// Name of the log the `mktex*` scripts append unresolvable fonts to.
pub const MISSING_FONT_LOG: &str = "missfont.log";

/// Reads a log file, replacing invalid UTF-8.
///
/// Engines write logs in the document's input encoding, so a strict read
/// would reject perfectly usable logs. Returns `None` when the file cannot be
/// read.
pub fn read_log(path: &Path) -> Option<String> {
    std::fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}
