use dbxml::core::{
    Address, AddressWidth, BasicBlock, CrossReference, DataItem, Function, Instruction, Perms,
    Segment, Symbol, TypeBody, TypeDef, Visibility, XrefKind,
};
use dbxml::export::export_database;
use dbxml::{
    DatabaseModel, ExportError, ExportErrorKind, ExportOptions, ExportState, Exporter,
    StaticEngine,
};

use crate::common::{code_segment, range, sample_model};

async fn failure(model: DatabaseModel, options: ExportOptions) -> (ExportError, ExportState, bool) {
    let engine = StaticEngine::new(model);
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out.xml");
    let mut exporter = Exporter::new(&engine, options);
    let err = exporter.export_database(&path).await.expect_err("must fail");
    (err, exporter.state(), path.exists())
}

fn typedef(name: &str, target: &str) -> TypeDef {
    TypeDef::new(
        name,
        None,
        TypeBody::Typedef {
            target: target.to_string(),
        },
    )
}

#[tokio::test]
async fn type_cycle_is_unresolved_type() {
    let model = DatabaseModel::builder()
        .type_def(typedef("a", "b"))
        .type_def(typedef("b", "c"))
        .type_def(typedef("c", "a"))
        .type_def(TypeDef::primitive("int", 4))
        .build();
    let (err, state, file) = failure(model, ExportOptions::default()).await;
    assert_eq!(err.kind(), ExportErrorKind::UnresolvedType);
    assert_eq!(state, ExportState::Failed(ExportErrorKind::UnresolvedType));
    assert!(!file);
    assert!(err.to_string().contains("a, b, c"), "{err}");
}

#[tokio::test]
async fn self_reference_through_pointer_is_legal() {
    let model = DatabaseModel::builder()
        .type_def(TypeDef::new(
            "list",
            Some(8),
            TypeBody::Struct {
                members: vec![dbxml::core::Member {
                    name: "next".to_string(),
                    type_name: "list_ptr".to_string(),
                    offset: 0,
                }],
            },
        ))
        .type_def(TypeDef::pointer("list_ptr", 8, "list"))
        .build();
    let engine = StaticEngine::new(model);
    let mut out = Vec::new();
    let summary = Exporter::new(&engine, ExportOptions::default())
        .export_to_writer(&mut out)
        .await
        .expect("pointer cycles are forward references");
    assert_eq!(summary.counts.types, 2);
}

#[tokio::test]
async fn data_item_with_unknown_type_reports_its_address() {
    let model = DatabaseModel::builder()
        .data_item(DataItem::new(Address(0x2000), 4).with_type("ghost"))
        .build();
    let (err, _, _) = failure(model, ExportOptions::default()).await;
    match err {
        ExportError::UnresolvedType { name, address, .. } => {
            assert_eq!(name, "ghost");
            assert_eq!(address, Some(Address(0x2000)));
        }
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test]
async fn dangling_xref_is_unresolved_reference() {
    let model = DatabaseModel::builder()
        .segment(code_segment(".text", 0x1000, 0x2000))
        .cross_reference(CrossReference::new(Address(0x5000), Address(0x1000), XrefKind::Call))
        .build();
    let (err, state, file) = failure(model, ExportOptions::default()).await;
    assert_eq!(state, ExportState::Failed(ExportErrorKind::UnresolvedReference));
    assert!(!file);
    match err {
        ExportError::UnresolvedReference { address, .. } => assert_eq!(address, Address(0x5000)),
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test]
async fn function_outside_segments_is_unresolved_reference() {
    let model = DatabaseModel::builder()
        .segment(code_segment(".text", 0x1000, 0x2000))
        .function(Function::new("orphan", Address(0x3000), range(0x3000, 0x3010)))
        .build();
    let (err, _, _) = failure(model, ExportOptions::default()).await;
    assert_eq!(err.kind(), ExportErrorKind::UnresolvedReference);
}

#[tokio::test]
async fn overlapping_segments_are_rejected() {
    let model = DatabaseModel::builder()
        .segment(code_segment(".text", 0x1000, 0x2000))
        .segment(Segment::new(".rodata", range(0x1800, 0x2800), Perms::READ, None))
        .build();
    let (err, state, _) = failure(model, ExportOptions::default()).await;
    assert_eq!(state, ExportState::Failed(ExportErrorKind::InvariantViolation));
    match err {
        ExportError::InvariantViolation { address, .. } => assert_eq!(address, Address(0x1800)),
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test]
async fn gap_between_instructions_is_rejected() {
    let block = BasicBlock::new(
        Address(0x1000),
        vec![
            Instruction::new(Address(0x1000), 1, "nop"),
            Instruction::new(Address(0x1002), 1, "ret"),
        ],
    );
    let model = DatabaseModel::builder()
        .segment(code_segment(".text", 0x1000, 0x2000))
        .function(Function::new("gappy", Address(0x1000), range(0x1000, 0x1003)).with_block(block))
        .build();
    let (err, _, _) = failure(model, ExportOptions::default()).await;
    match err {
        ExportError::InvariantViolation { address, .. } => assert_eq!(address, Address(0x1002)),
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test]
async fn value_length_must_match_size() {
    let model = DatabaseModel::builder()
        .data_item(DataItem::new(Address(0x10), 4).with_value(vec![1, 2]))
        .build();
    let (err, _, _) = failure(model, ExportOptions::default()).await;
    assert_eq!(err.kind(), ExportErrorKind::InvariantViolation);
}

#[tokio::test]
async fn wide_address_fails_32_bit_export_without_output() {
    let model = sample_model();
    let wide = {
        let mut builder = DatabaseModel::builder();
        for seg in model.segments() {
            builder = builder.segment(seg.clone());
        }
        builder
            .symbol(Symbol::new(Address(0x1_0000_0000), "high", Visibility::Global))
            .build()
    };
    let options = ExportOptions::default().with_address_width(AddressWidth::Bits32);
    let (err, state, file) = failure(wide, options).await;
    assert_eq!(err.kind(), ExportErrorKind::InvariantViolation);
    assert_eq!(state, ExportState::Failed(ExportErrorKind::InvariantViolation));
    assert!(!file);
}

#[tokio::test]
async fn missing_output_directory_is_io_error() {
    let engine = StaticEngine::new(sample_model());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing").join("out.xml");
    let err = export_database(&engine, &path, ExportOptions::default())
        .await
        .expect_err("parent directory does not exist");
    assert_eq!(err.kind(), ExportErrorKind::Io);
}

#[tokio::test]
async fn retry_uses_a_fresh_exporter() {
    let broken = DatabaseModel::builder()
        .type_def(typedef("loop", "loop"))
        .build();
    let engine = StaticEngine::new(broken);
    let mut exporter = Exporter::new(&engine, ExportOptions::default());
    assert!(exporter.export_to_writer(Vec::new()).await.is_err());
    let again = exporter.export_to_writer(Vec::new()).await.expect_err("single use");
    assert_eq!(again.kind(), ExportErrorKind::AlreadyRun);
    assert_eq!(exporter.state(), ExportState::Failed(ExportErrorKind::UnresolvedType));

    let fixed = StaticEngine::new(sample_model());
    let mut fresh = Exporter::new(&fixed, ExportOptions::default());
    assert_eq!(fresh.state(), ExportState::Idle);
    fresh.export_to_writer(Vec::new()).await.expect("fresh exporter");
    assert_eq!(fresh.state(), ExportState::Done);
}
