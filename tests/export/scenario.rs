use dbxml::core::AddressWidth;
use dbxml::export::Section;
use dbxml::{ExportOptions, ExportState, Exporter, StaticEngine};

use crate::common::{sample_model, scenario_model, SCENARIO_XML_32};

#[tokio::test]
async fn single_function_scenario_matches_document() {
    let engine = StaticEngine::new(scenario_model());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("scenario.xml");
    let options = ExportOptions::default().with_address_width(AddressWidth::Bits32);

    let mut exporter = Exporter::new(&engine, options);
    let summary = exporter.export_database(&path).await.expect("export");
    assert_eq!(exporter.state(), ExportState::Done);

    let written = std::fs::read_to_string(&path).expect("read output");
    assert_eq!(written, SCENARIO_XML_32);
    assert_eq!(summary.path.as_deref(), Some(path.as_path()));
    assert_eq!(summary.bytes_written, SCENARIO_XML_32.len() as u64);
    assert_eq!(summary.counts.segments, 1);
    assert_eq!(summary.counts.functions, 1);
    assert_eq!(summary.counts.instructions, 2);
    assert_eq!(summary.counts.types, 0);
    assert_eq!(summary.counts.cross_references, 0);
}

#[tokio::test]
async fn sections_appear_in_fixed_order() {
    let engine = StaticEngine::new(sample_model());
    let mut out = Vec::new();
    Exporter::new(&engine, ExportOptions::default())
        .export_to_writer(&mut out)
        .await
        .expect("export");
    let xml = String::from_utf8(out).expect("utf-8");

    let positions: Vec<usize> = Section::ALL
        .iter()
        .map(|s| xml.find(&format!("<{}", s.tag())).expect("section present"))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
}

#[tokio::test]
async fn sample_model_orders_every_section() {
    let engine = StaticEngine::new(sample_model());
    let mut out = Vec::new();
    let summary = Exporter::new(&engine, ExportOptions::default())
        .export_to_writer(&mut out)
        .await
        .expect("export");
    let xml = String::from_utf8(out).expect("utf-8");

    let order = |needles: &[&str]| {
        let found: Vec<usize> = needles
            .iter()
            .map(|n| xml.find(n).unwrap_or_else(|| panic!("missing {n}")))
            .collect();
        assert!(found.windows(2).all(|w| w[0] < w[1]), "{needles:?}");
    };

    order(&["name=\".text\"", "name=\".data\""]);
    order(&["ordinal=\"1\" name=\"_start\"", "ordinal=\"2\" name=\"helper\""]);
    order(&[
        "<type name=\"char\"",
        "<type name=\"color\"",
        "<type name=\"int\"",
        "<type name=\"name_buf\"",
        "<type name=\"handler\"",
        "<type name=\"node_ptr\"",
        "<type name=\"handle\"",
        "<type name=\"pair\"",
        "<type name=\"node\"",
        "<type name=\"word\"",
    ]);
    order(&["mnemonic=\"push\"", "mnemonic=\"sub\"", "mnemonic=\"call\"", "mnemonic=\"ret\""]);
    order(&["<data-item address=\"0x0000000000002000\"", "<data-item address=\"0x0000000000002008\""]);
    order(&["name=\"_start\" visibility", "name=\"main\" visibility"]);
    order(&["kind=\"data-read\"", "kind=\"data-write\"", "kind=\"call\"", "kind=\"jump\""]);

    assert!(xml.contains("<function name=\"thunk\" entry=\"0x0000000000001200\" start=\"0x0000000000001200\" end=\"0x0000000000001208\"/>"));
    assert!(xml.contains("calling-convention=\"sysv\""));
    assert!(xml.contains("comment=\"return to crt\""));
    assert!(xml.contains("<operand kind=\"immediate\" text=\"-0x1\"/>"));
    assert!(xml.contains("value=\"000aff\""));
    assert!(xml.contains("name=\"größe\" visibility=\"local\" demangled=\"size\""));
    assert!(xml.contains("name-hexbytes=\""));
    assert!(xml.contains("<type name=\"handler\" kind=\"function-signature\" return=\"int\" variadic=\"true\">"));
    assert!(xml.contains("<enumerator name=\"UNKNOWN\" value=\"-1\"/>"));
    assert_eq!(summary.counts.types, 10);
    assert_eq!(summary.counts.instructions, 7);
}

#[tokio::test]
async fn skipped_section_is_absent_not_empty() {
    let engine = StaticEngine::new(sample_model());
    let options = ExportOptions::default()
        .without_section(Section::CrossReferences)
        .without_section(Section::Types);
    let mut out = Vec::new();
    let summary = Exporter::new(&engine, options)
        .export_to_writer(&mut out)
        .await
        .expect("export");
    let xml = String::from_utf8(out).expect("utf-8");
    assert!(!xml.contains("<cross-references"));
    assert!(!xml.contains("<types"));
    assert!(xml.contains("<symbols>"));
    assert_eq!(summary.counts.cross_references, 0);
    assert_eq!(summary.counts.types, 0);
}

#[tokio::test]
async fn demangling_fills_missing_names_only() {
    let engine = StaticEngine::new(sample_model());
    let options = ExportOptions {
        demangle_symbols: true,
        ..ExportOptions::default()
    };
    let mut out = Vec::new();
    Exporter::new(&engine, options)
        .export_to_writer(&mut out)
        .await
        .expect("export");
    let xml = String::from_utf8(out).expect("utf-8");
    assert!(xml.contains("name=\"_Z6helperv\" visibility=\"local\" demangled=\"helper()\""));
    assert!(xml.contains("name=\"main\" visibility=\"global\"/>"));
    assert!(xml.contains("demangled=\"size\""));
}
