//! Helpers for the `.aux` control file read by bibtex.

use crate::patterns::BIBLIO_DIRECTIVE;

/// Whether the aux file asks for any bibliography processing at all.
///
/// Any one of `\citation{`, `\bibdata{` or `\bibstyle{` at the start of a
/// line is enough.
pub fn contains_biblio_data(aux: &str) -> bool {
    BIBLIO_DIRECTIVE.is_match(aux)
}

/// Removes the `.bib` extension from every database named in a `\bibdata{}`
/// line. Older Windows bibtex builds look for `refs.bib.bib` otherwise.
///
/// Works on raw bytes: the aux file is in the document's input encoding and
/// every other line is passed through untouched.
pub fn strip_bibdata_extensions(aux: &[u8]) -> Vec<u8> {
    let mut fixed = Vec::with_capacity(aux.len());
    for line in aux.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b"\\bibdata{") {
            strip_line(line, &mut fixed);
        } else {
            fixed.extend_from_slice(line);
        }
    }
    fixed
}

fn strip_line(line: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < line.len() {
        let rest = &line[i..];
        if rest.starts_with(b".bib,") || rest.starts_with(b".bib}") {
            i += 4;
            continue;
        }
        out.push(line[i]);
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_directive_alone_is_enough() {
        assert!(contains_biblio_data("\\relax\n\\citation{knuth84}\n"));
        assert!(contains_biblio_data("\\relax\n\\bibdata{refs}\n"));
        assert!(contains_biblio_data("\\relax\n\\bibstyle{plain}\n"));
    }

    #[test]
    fn test_directives_in_combination() {
        let aux = "\\relax\n\\citation{knuth84}\n\\bibstyle{plain}\n\\bibdata{refs}\n";
        assert!(contains_biblio_data(aux));
    }

    #[test]
    fn test_no_directives() {
        let aux = "\\relax\n\\@writefile{toc}{\\contentsline {section}{Intro}{1}}\n\\gdef \\@abspage@last{1}\n";
        assert!(!contains_biblio_data(aux));
        assert!(!contains_biblio_data(""));
    }

    #[test]
    fn test_directive_must_start_a_line() {
        assert!(!contains_biblio_data("\\relax % \\citation{x}\n"));
    }

    #[test]
    fn test_strip_bibdata_extensions() {
        let aux = b"\\citation{a}\n\\bibstyle{plain}\n\\bibdata{refs.bib,more.bib}\n";
        assert_eq!(
            strip_bibdata_extensions(aux),
            b"\\citation{a}\n\\bibstyle{plain}\n\\bibdata{refs,more}\n".to_vec()
        );
        let untouched = b"\\citation{refs.bib}\n\\bibdata{refs}\n";
        assert_eq!(strip_bibdata_extensions(untouched), untouched.to_vec());
    }

    #[test]
    fn test_strip_keeps_latin1_bytes() {
        let aux = b"\\citation{M\xfcller84}\n\\bibdata{refs.bib}\n\\bibcite{G\xf6del}{1}";
        assert_eq!(
            strip_bibdata_extensions(aux),
            b"\\citation{M\xfcller84}\n\\bibdata{refs}\n\\bibcite{G\xf6del}{1}".to_vec()
        );
    }

    #[test]
    fn test_strip_only_touches_extensions_before_a_separator() {
        let aux = b"\\bibdata{refs.bibx,my.bib.d/x.bib}";
        assert_eq!(
            strip_bibdata_extensions(aux),
            b"\\bibdata{refs.bibx,my.bib.d/x}".to_vec()
        );
    }
}
