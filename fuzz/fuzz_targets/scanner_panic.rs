#![no_main]
use libfuzzer_sys::fuzz_target;
use texmk_log::{LogScanner, TexLiveLogScanner, contains_biblio_data, strip_bibdata_extensions};

fuzz_target!(|data: &[u8]| {
    // Logs come in whatever encoding the document used.
    let text = String::from_utf8_lossy(data);
    let scanner = TexLiveLogScanner::new();

    let _ = scanner.inspect(Some(&text), &text, false, Some(&text));
    let _ = scanner.inspect(Some(&text), "", true, None);
    let _ = scanner.index_error(&text);
    let _ = scanner.bibliography_style_file(&text);

    if contains_biblio_data(&text) {
        let _ = strip_bibdata_extensions(data);
    }
});
