use dbxml::export::{import_database, ImportError};
use dbxml::{ExportErrorKind, ExportOptions, ExportState, Exporter, StaticEngine};

use crate::common::{sample_model, FailingWriter};

async fn full_document() -> Vec<u8> {
    let engine = StaticEngine::new(sample_model());
    let mut out = Vec::new();
    Exporter::new(&engine, ExportOptions::default())
        .export_to_writer(&mut out)
        .await
        .expect("export");
    out
}

#[tokio::test]
async fn write_failure_leaves_detectably_truncated_output() {
    let full = full_document().await;
    for budget in [0, 1, 40, 200, full.len() / 2, full.len() - 25] {
        let engine = StaticEngine::new(sample_model());
        let mut partial = Vec::new();
        let mut exporter = Exporter::new(&engine, ExportOptions::default());
        let err = exporter
            .export_to_writer(FailingWriter {
                sink: &mut partial,
                budget,
            })
            .await
            .expect_err("write must fail");
        assert_eq!(err.kind(), ExportErrorKind::Io, "budget {budget}");
        assert_eq!(exporter.state(), ExportState::Failed(ExportErrorKind::Io));

        assert_eq!(&full[..partial.len()], &partial[..]);
        assert!(import_database(&partial[..]).is_err(), "budget {budget}");
    }
}

#[tokio::test]
async fn every_line_prefix_is_rejected_as_truncated() {
    let full = full_document().await;
    let close = full
        .windows(b"</analysis-database>".len())
        .rposition(|w| w == b"</analysis-database>")
        .expect("root close");
    let mut cut = 0;
    while cut < close {
        match import_database(&full[..cut]) {
            Err(ImportError::Truncated) => {}
            other => panic!("prefix of {cut} bytes: {other:?}"),
        }
        cut = match full[cut..].iter().position(|b| *b == b'\n') {
            Some(p) => cut + p + 1,
            None => break,
        };
    }
    assert!(import_database(&full[..]).is_ok());
}

#[tokio::test]
async fn arbitrary_byte_prefixes_never_import() {
    let full = full_document().await;
    let close = full
        .windows(b"</analysis-database>".len())
        .rposition(|w| w == b"</analysis-database>")
        .expect("root close");
    for cut in (0..close + b"</analysis-database".len()).step_by(13) {
        assert!(import_database(&full[..cut]).is_err(), "prefix of {cut} bytes");
    }
}
