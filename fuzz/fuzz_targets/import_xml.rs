#![no_main]
use libfuzzer_sys::fuzz_target;

use dbxml::export::{canonical_order, import_database, render_to_string};
use dbxml::ExportOptions;

fuzz_target!(|data: &[u8]| {
    let Ok(imported) = import_database(data) else {
        return;
    };
    // anything the importer accepts must either validate and render, or be
    // rejected by the canonicalizer; it must never panic
    let options = ExportOptions::default().with_address_width(imported.header.address_width);
    if let Ok(export) = canonical_order(&imported.model, &options) {
        let _ = render_to_string(export.records(), options.address_width);
    }
});
