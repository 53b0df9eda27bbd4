use dbxml::core::AddressWidth;
use dbxml::export::{canonical_order, render_to_string};
use dbxml::{DatabaseModel, ExportOptions, Exporter, StaticEngine};

use crate::common::sample_model;

fn reversed(model: &DatabaseModel) -> DatabaseModel {
    let mut builder = DatabaseModel::builder();
    for seg in model.segments().iter().rev() {
        builder = builder.segment(seg.clone());
    }
    for entry in model.entry_points().iter().rev() {
        builder = builder.entry_point(entry.clone());
    }
    for ty in model.types().iter().rev() {
        builder = builder.type_def(ty.clone());
    }
    for function in model.functions().iter().rev() {
        let mut function = function.clone();
        function.blocks.reverse();
        for block in &mut function.blocks {
            block.instructions.reverse();
        }
        builder = builder.function(function);
    }
    for item in model.data_items().iter().rev() {
        builder = builder.data_item(item.clone());
    }
    for symbol in model.symbols().iter().rev() {
        builder = builder.symbol(symbol.clone());
    }
    for xref in model.cross_references().iter().rev() {
        builder = builder.cross_reference(*xref);
    }
    builder.build()
}

async fn export_bytes(model: DatabaseModel, options: ExportOptions) -> Vec<u8> {
    let engine = StaticEngine::new(model);
    let mut out = Vec::new();
    Exporter::new(&engine, options)
        .export_to_writer(&mut out)
        .await
        .expect("export");
    out
}

#[tokio::test]
async fn repeated_exports_are_byte_identical() {
    let first = export_bytes(sample_model(), ExportOptions::default()).await;
    let second = export_bytes(sample_model(), ExportOptions::default()).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn input_order_does_not_affect_output() {
    let model = sample_model();
    let shuffled = reversed(&model);
    assert_ne!(model, shuffled);
    for width in [AddressWidth::Bits32, AddressWidth::Bits64] {
        let options = ExportOptions::default().with_address_width(width);
        let a = export_bytes(model.clone(), options.clone()).await;
        let b = export_bytes(shuffled.clone(), options).await;
        assert_eq!(a, b, "width {width}");
    }
}

#[test]
fn canonical_order_is_stable_across_calls() {
    let model = sample_model();
    let options = ExportOptions::default();
    let a = canonical_order(&model, &options).expect("order a");
    let b = canonical_order(&model, &options).expect("order b");
    assert_eq!(a.records(), b.records());
    assert_eq!(
        render_to_string(a.records(), options.address_width).expect("render a"),
        render_to_string(b.records(), options.address_width).expect("render b"),
    );
}
