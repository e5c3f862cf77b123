use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Files documents commonly load, and the CTAN package that ships them.
///
/// Used as the search index for backends without a file search of their own
/// (MiKTeX's `mpm`) and for documentation links.
const FILE_PACKAGES: &[(&str, &str)] = &[
    // Math
    ("amsmath.sty", "amsmath"),
    ("amssymb.sty", "amsfonts"),
    ("amsthm.sty", "amsthm"),
    ("mathtools.sty", "mathtools"),
    ("unicode-math.sty", "unicode-math"),
    ("bm.sty", "tools"),
    // Graphics
    ("graphicx.sty", "graphics"),
    ("tikz.sty", "pgf"),
    ("pgfplots.sty", "pgfplots"),
    ("xcolor.sty", "xcolor"),
    ("epstopdf.sty", "epstopdf-pkg"),
    // Layout
    ("geometry.sty", "geometry"),
    ("fancyhdr.sty", "fancyhdr"),
    ("multicol.sty", "tools"),
    ("setspace.sty", "setspace"),
    ("cuted.sty", "sttools"),
    // Tables
    ("booktabs.sty", "booktabs"),
    ("longtable.sty", "tools"),
    ("array.sty", "tools"),
    ("multirow.sty", "multirow"),
    ("makecell.sty", "makecell"),
    // Bibliographies and indexes
    ("biblatex.sty", "biblatex"),
    ("natbib.sty", "natbib"),
    ("plainnat.bst", "natbib"),
    ("apalike.bst", "bibtex"),
    ("apacite.bst", "apacite"),
    ("imakeidx.sty", "imakeidx"),
    // References
    ("hyperref.sty", "hyperref"),
    ("bookmark.sty", "bookmark"),
    ("cleveref.sty", "cleveref"),
    ("url.sty", "url"),
    // Fonts
    ("fontspec.sty", "fontspec"),
    ("lmodern.sty", "lm"),
    ("fontawesome5.sty", "fontawesome5"),
    ("times.sty", "psnfss"),
    // Code and text
    ("listings.sty", "listings"),
    ("fancyvrb.sty", "fancyvrb"),
    ("framed.sty", "framed"),
    ("upquote.sty", "upquote"),
    ("soul.sty", "soul"),
    ("csquotes.sty", "csquotes"),
    ("xurl.sty", "xurl"),
    ("footnotehyper-sty.sty", "footnotehyper"),
    // Floats and captions
    ("caption.sty", "caption"),
    ("subcaption.sty", "caption"),
    ("float.sty", "float"),
    ("wrapfig.sty", "wrapfig"),
    // Utilities
    ("etoolbox.sty", "etoolbox"),
    ("xparse.sty", "l3packages"),
    ("iftex.sty", "iftex"),
    ("parskip.sty", "parskip"),
    ("selnolig.sty", "selnolig"),
    // Languages
    ("babel.sty", "babel"),
    ("polyglossia.sty", "polyglossia"),
    ("ctex.sty", "ctex"),
];

/// Static database mapping file names to their CTAN package names.
pub struct CtanDatabase {
    by_file: HashMap<&'static str, &'static str>,
}

impl CtanDatabase {
    fn from_table(table: &[(&'static str, &'static str)]) -> Self {
        Self {
            by_file: table.iter().copied().collect(),
        }
    }

    /// Look up the package that ships `file`. Case-sensitive, like TeX.
    pub fn lookup(&self, file: &str) -> Option<&'static str> {
        self.by_file.get(file).copied()
    }

    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

/// Global CTAN database instance
pub static CTAN_DB: Lazy<CtanDatabase> = Lazy::new(|| CtanDatabase::from_table(FILE_PACKAGES));
