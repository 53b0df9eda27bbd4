//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use dbxml::analysis::QuiescenceCallback;
use dbxml::core::{
    Address, AddressRange, BasicBlock, CrossReference, DataItem, EntryPoint, Enumerator,
    Function, Instruction, Member, Operand, OperandKind, Param, Perms, Segment, Symbol, TypeBody,
    TypeDef, Visibility, XrefKind,
};
use dbxml::{AnalysisEngine, DatabaseModel};

pub fn range(start: u64, end: u64) -> AddressRange {
    AddressRange::new(Address(start), Address(end)).expect("valid range")
}

pub fn code_segment(name: &str, start: u64, end: u64) -> Segment {
    Segment::new(name, range(start, end), Perms::READ | Perms::EXECUTE, None)
}

/// One segment, one two-instruction function, nothing else.
pub fn scenario_model() -> DatabaseModel {
    let block = BasicBlock::new(
        Address(0x1000),
        vec![
            Instruction::new(Address(0x1000), 1, "nop"),
            Instruction::new(Address(0x1001), 1, "ret"),
        ],
    );
    DatabaseModel::builder()
        .segment(code_segment(".text", 0x1000, 0x2000))
        .function(Function::new("main", Address(0x1000), range(0x1000, 0x1002)).with_block(block))
        .build()
}

pub const SCENARIO_XML_32: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<analysis-database schema-version="1.0" address-width="32">
  <segments>
    <segment name=".text" start="0x00001000" end="0x00002000" perms="r-x"/>
  </segments>
  <entry-points/>
  <types/>
  <functions>
    <function name="main" entry="0x00001000" start="0x00001000" end="0x00001002">
      <block start="0x00001000">
        <instruction address="0x00001000" length="0x1" mnemonic="nop"/>
        <instruction address="0x00001001" length="0x1" mnemonic="ret"/>
      </block>
    </function>
  </functions>
  <data/>
  <symbols/>
  <cross-references/>
</analysis-database>
"#;

fn member(name: &str, type_name: &str, offset: u64) -> Member {
    Member {
        name: name.to_string(),
        type_name: type_name.to_string(),
        offset,
    }
}

/// A model touching every entity and type kind, deliberately inserted
/// out of canonical order.
pub fn sample_model() -> DatabaseModel {
    let main_blocks = [
        BasicBlock::new(
            Address(0x1010),
            vec![
                Instruction::new(Address(0x1010), 5, "call")
                    .with_operand(Operand::new(OperandKind::Address, "0x1100")),
                Instruction::new(Address(0x1015), 1, "ret").with_comment("return to crt"),
            ],
        ),
        BasicBlock::new(
            Address(0x1000),
            vec![
                Instruction::new(Address(0x1004), 3, "sub")
                    .with_operand(Operand::register("rsp"))
                    .with_operand(Operand::immediate(16)),
                Instruction::new(Address(0x1000), 1, "push").with_operand(Operand::register("rbp")),
                Instruction::new(Address(0x1001), 3, "mov")
                    .with_operand(Operand::register("rbp"))
                    .with_operand(Operand::register("rsp")),
                Instruction::new(Address(0x1007), 9, "mov")
                    .with_operand(Operand::new(OperandKind::Memory, "[rip + 0x1000]"))
                    .with_operand(Operand::immediate(-1)),
            ],
        ),
    ];
    let mut main = Function::new("main", Address(0x1000), range(0x1000, 0x1016))
        .with_calling_convention("sysv");
    for block in main_blocks {
        main = main.with_block(block);
    }
    let helper = Function::new("helper", Address(0x1100), range(0x1100, 0x1101)).with_block(
        BasicBlock::new(Address(0x1100), vec![Instruction::new(Address(0x1100), 1, "ret")]),
    );
    let thunk = Function::new("thunk", Address(0x1200), range(0x1200, 0x1208));

    DatabaseModel::builder()
        .segment(Segment::new(
            ".data",
            range(0x2000, 0x2100),
            Perms::READ | Perms::WRITE,
            Some(8),
        ))
        .segment(code_segment(".text", 0x1000, 0x2000))
        .entry_point(EntryPoint::new(Address(0x1100), 2, "helper"))
        .entry_point(EntryPoint::new(Address(0x1000), 1, "_start"))
        .type_def(TypeDef::new(
            "node",
            Some(16),
            TypeBody::Struct {
                members: vec![member("value", "pair", 0), member("next", "node_ptr", 8)],
            },
        ))
        .type_def(TypeDef::pointer("node_ptr", 8, "node"))
        .type_def(TypeDef::new(
            "pair",
            Some(8),
            TypeBody::Struct {
                members: vec![member("a", "int", 0), member("b", "int", 4)],
            },
        ))
        .type_def(TypeDef::primitive("int", 4))
        .type_def(TypeDef::primitive("char", 1))
        .type_def(TypeDef::new(
            "color",
            Some(4),
            TypeBody::Enum {
                enumerators: vec![
                    Enumerator {
                        name: "RED".to_string(),
                        value: 0,
                    },
                    Enumerator {
                        name: "UNKNOWN".to_string(),
                        value: -1,
                    },
                ],
            },
        ))
        .type_def(TypeDef::new(
            "name_buf",
            Some(32),
            TypeBody::Array {
                element: "char".to_string(),
                count: 32,
            },
        ))
        .type_def(TypeDef::new(
            "handler",
            None,
            TypeBody::FunctionSignature {
                return_type: Some("int".to_string()),
                params: vec![Param {
                    name: "fmt".to_string(),
                    type_name: "name_buf".to_string(),
                }],
                variadic: true,
            },
        ))
        .type_def(TypeDef::new(
            "word",
            Some(8),
            TypeBody::Union {
                members: vec![member("i", "int", 0), member("p", "node_ptr", 0)],
            },
        ))
        .type_def(TypeDef::new(
            "handle",
            None,
            TypeBody::Typedef {
                target: "node_ptr".to_string(),
            },
        ))
        .function(thunk)
        .function(helper)
        .function(main)
        .data_item(DataItem::new(Address(0x2010), 4).with_type("int").with_value(vec![1, 0, 0, 0]))
        .data_item(DataItem::new(Address(0x2000), 8).with_type("pair"))
        .data_item(DataItem::new(Address(0x2008), 3).with_value(vec![0x00, 0x0a, 0xff]))
        .symbol(Symbol::new(Address(0x1100), "_Z6helperv", Visibility::Local))
        .symbol(Symbol::new(Address(0x1000), "main", Visibility::Global))
        .symbol(Symbol::new(Address(0x1000), "_start", Visibility::Global))
        .symbol(Symbol::new(Address(0x2008), "msg\n<\"quoted\">", Visibility::Weak))
        .symbol(Symbol::new(Address(0x2010), "größe", Visibility::Local).with_demangled("size"))
        .cross_reference(CrossReference::new(Address(0x1007), Address(0x2008), XrefKind::DataRead))
        .cross_reference(CrossReference::new(Address(0x1010), Address(0x1100), XrefKind::Call))
        .cross_reference(CrossReference::new(Address(0x1010), Address(0x1100), XrefKind::Jump))
        .cross_reference(CrossReference::new(Address(0x1007), Address(0x2000), XrefKind::DataWrite))
        .build()
}

/// Engine that answers `is_queue_empty` from a script, then stays quiet.
///
/// Every empty answer also fires the registered callbacks, so a later
/// busy answer looks like a spurious quiescence notification.
pub struct ScriptedEngine {
    model: DatabaseModel,
    script: Mutex<VecDeque<bool>>,
    callbacks: Mutex<Vec<QuiescenceCallback>>,
    polls: AtomicU64,
}

impl ScriptedEngine {
    pub fn new(model: DatabaseModel, script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            model,
            script: Mutex::new(script.into_iter().collect()),
            callbacks: Mutex::new(Vec::new()),
            polls: AtomicU64::new(0),
        }
    }

    /// Engine that never drains its queue.
    pub fn busy_forever(model: DatabaseModel) -> Self {
        Self::new(model, std::iter::repeat(false).take(1_000_000))
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn is_queue_empty(&self) -> bool {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let empty = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(true);
        if empty {
            for callback in self.callbacks.lock().expect("callback lock").iter() {
                callback();
            }
        }
        empty
    }

    fn notify_on_quiescence(&self, callback: QuiescenceCallback) {
        self.callbacks.lock().expect("callback lock").push(callback);
    }

    fn list_segments(&self) -> Vec<Segment> {
        self.model.segments().to_vec()
    }

    fn list_functions(&self) -> Vec<Function> {
        self.model.functions().to_vec()
    }

    fn list_data_items(&self) -> Vec<DataItem> {
        self.model.data_items().to_vec()
    }

    fn list_types(&self) -> Vec<TypeDef> {
        self.model.types().to_vec()
    }

    fn list_symbols(&self) -> Vec<Symbol> {
        self.model.symbols().to_vec()
    }

    fn list_cross_references(&self) -> Vec<CrossReference> {
        self.model.cross_references().to_vec()
    }

    fn list_entry_points(&self) -> Vec<EntryPoint> {
        self.model.entry_points().to_vec()
    }
}

/// Writer that accepts `budget` bytes and then fails every write.
pub struct FailingWriter<'a> {
    pub sink: &'a mut Vec<u8>,
    pub budget: usize,
}

impl Write for FailingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Err(io::Error::other("disk full"));
        }
        let n = buf.len().min(self.budget);
        self.sink.extend_from_slice(&buf[..n]);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
