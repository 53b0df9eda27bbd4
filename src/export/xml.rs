//! XML serialization of a canonical record sequence.
//!
//! Document shape:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <analysis-database schema-version="1.0" address-width="64">
//!   <segments>
//!     <segment name=".text" start="0x..." end="0x..." perms="r-x"/>
//!   </segments>
//!   <entry-points>...</entry-points>
//!   <types>...</types>
//!   <functions>
//!     <function name="main" entry="0x..." start="0x..." end="0x...">
//!       <block start="0x...">
//!         <instruction address="0x..." length="0x1" mnemonic="ret"/>
//!       </block>
//!     </function>
//!   </functions>
//!   <data>...</data>
//!   <symbols>...</symbols>
//!   <cross-references>...</cross-references>
//! </analysis-database>
//! ```
//!
//! Every value lives in an attribute. Strings that cannot survive XML
//! attribute normalization (control characters, U+FFFE, U+FFFF) are written
//! as `<attr>-hexbytes` holding the hex of their UTF-8 bytes instead.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::io::Write;

use crate::core::address::format_size;
use crate::core::{
    Address, AddressWidth, BasicBlock, CrossReference, DataItem, EntryPoint, Function,
    Instruction, Segment, Symbol, TypeBody, TypeDef,
};
use crate::error::{ExportError, Result};
use crate::export::canonical::ExportRecord;

/// Version written to the root `schema-version` attribute.
pub const SCHEMA_VERSION: &str = "1.0";
/// Root element name.
pub const ROOT_TAG: &str = "analysis-database";
/// Suffix of the attribute carrying a hex-encoded string.
pub const HEXBYTES_SUFFIX: &str = "-hexbytes";

/// Whether `text` has to be hex-encoded to survive a round trip.
pub fn needs_hexbytes(text: &str) -> bool {
    text.chars()
        .any(|c| (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}')
}

/// Streaming writer of the interchange document.
pub struct XmlEmitter<W: Write> {
    xml: Writer<W>,
    width: AddressWidth,
}

impl<W: Write> XmlEmitter<W> {
    pub fn new(inner: W, width: AddressWidth) -> Self {
        Self {
            xml: Writer::new_with_indent(inner, b' ', 2),
            width,
        }
    }

    /// Write the full document for `records`.
    ///
    /// On error the output stops where the failure happened and the root
    /// element is left unclosed.
    pub fn emit(&mut self, records: &[ExportRecord<'_>]) -> Result<()> {
        self.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new(ROOT_TAG);
        root.push_attribute(("schema-version", SCHEMA_VERSION));
        root.push_attribute(("address-width", self.width.to_string().as_str()));
        self.xml.write_event(Event::Start(root))?;

        let mut i = 0;
        while i < records.len() {
            let closes_next = matches!(
                (&records[i], records.get(i + 1)),
                (ExportRecord::SectionStart(_), Some(ExportRecord::SectionEnd(_)))
                    | (ExportRecord::FunctionStart(_), Some(ExportRecord::FunctionEnd))
                    | (ExportRecord::BlockStart(_), Some(ExportRecord::BlockEnd))
            );
            self.record(&records[i], closes_next)?;
            i += if closes_next { 2 } else { 1 };
        }

        self.xml.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;
        self.xml.get_mut().write_all(b"\n")?;
        self.xml.get_mut().flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.xml.into_inner()
    }

    fn record(&mut self, record: &ExportRecord<'_>, empty: bool) -> Result<()> {
        match record {
            ExportRecord::SectionStart(section) => {
                self.open(BytesStart::new(section.tag()), empty)
            }
            ExportRecord::SectionEnd(section) => self.close(section.tag()),
            ExportRecord::Segment(seg) => self.segment(seg),
            ExportRecord::EntryPoint(entry) => self.entry_point(entry),
            ExportRecord::Type(ty) => self.type_def(ty),
            ExportRecord::FunctionStart(function) => self.function(function, empty),
            ExportRecord::FunctionEnd => self.close("function"),
            ExportRecord::BlockStart(block) => self.block(block, empty),
            ExportRecord::BlockEnd => self.close("block"),
            ExportRecord::Instruction(ins) => self.instruction(ins),
            ExportRecord::DataItem(item) => self.data_item(item),
            ExportRecord::Symbol(symbol) => self.symbol(symbol),
            ExportRecord::CrossReference(xref) => self.xref(xref),
        }
    }

    fn open(&mut self, element: BytesStart<'_>, empty: bool) -> Result<()> {
        if empty {
            self.xml.write_event(Event::Empty(element))?;
        } else {
            self.xml.write_event(Event::Start(element))?;
        }
        Ok(())
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.xml.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn leaf(&mut self, element: BytesStart<'_>) -> Result<()> {
        self.xml.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn addr_attr(&self, element: &mut BytesStart<'_>, key: &str, address: Address) -> Result<()> {
        let text = self.width.format(address).ok_or_else(|| {
            ExportError::invariant(
                address,
                format!("address does not fit a {}-bit export", self.width),
            )
        })?;
        element.push_attribute((key, text.as_str()));
        Ok(())
    }

    fn end_attr(&self, element: &mut BytesStart<'_>, key: &str, end: Address) -> Result<()> {
        let text = self.width.format_end(end).ok_or_else(|| {
            ExportError::invariant(
                end,
                format!("end bound does not fit a {}-bit export", self.width),
            )
        })?;
        element.push_attribute((key, text.as_str()));
        Ok(())
    }

    fn segment(&mut self, seg: &Segment) -> Result<()> {
        let mut el = BytesStart::new("segment");
        text_attr(&mut el, "name", &seg.name);
        self.addr_attr(&mut el, "start", seg.range.start)?;
        self.end_attr(&mut el, "end", seg.range.end)?;
        el.push_attribute(("perms", seg.perms.to_string().as_str()));
        if let Some(align) = seg.alignment {
            el.push_attribute(("align", format_size(align).as_str()));
        }
        self.leaf(el)
    }

    fn entry_point(&mut self, entry: &EntryPoint) -> Result<()> {
        let mut el = BytesStart::new("entry-point");
        self.addr_attr(&mut el, "address", entry.address)?;
        el.push_attribute(("ordinal", entry.ordinal.to_string().as_str()));
        text_attr(&mut el, "name", &entry.name);
        self.leaf(el)
    }

    fn type_def(&mut self, ty: &TypeDef) -> Result<()> {
        let mut el = BytesStart::new("type");
        text_attr(&mut el, "name", &ty.name);
        el.push_attribute(("kind", ty.kind().as_str()));
        if let Some(size) = ty.size {
            el.push_attribute(("size", format_size(size).as_str()));
        }

        let mut children: Vec<BytesStart<'static>> = Vec::new();
        match &ty.body {
            TypeBody::Primitive => {}
            TypeBody::Struct { members } | TypeBody::Union { members } => {
                for member in members {
                    let mut child = BytesStart::new("member");
                    text_attr(&mut child, "name", &member.name);
                    text_attr(&mut child, "type", &member.type_name);
                    child.push_attribute(("offset", format_size(member.offset).as_str()));
                    children.push(child);
                }
            }
            TypeBody::Enum { enumerators } => {
                for enumerator in enumerators {
                    let mut child = BytesStart::new("enumerator");
                    text_attr(&mut child, "name", &enumerator.name);
                    child.push_attribute(("value", enumerator.value.to_string().as_str()));
                    children.push(child);
                }
            }
            TypeBody::Pointer { target } | TypeBody::Typedef { target } => {
                text_attr(&mut el, "target", target);
            }
            TypeBody::Array { element, count } => {
                text_attr(&mut el, "element", element);
                el.push_attribute(("count", format_size(*count).as_str()));
            }
            TypeBody::FunctionSignature {
                return_type,
                params,
                variadic,
            } => {
                if let Some(ret) = return_type {
                    text_attr(&mut el, "return", ret);
                }
                el.push_attribute(("variadic", if *variadic { "true" } else { "false" }));
                for param in params {
                    let mut child = BytesStart::new("param");
                    text_attr(&mut child, "name", &param.name);
                    text_attr(&mut child, "type", &param.type_name);
                    children.push(child);
                }
            }
        }

        if children.is_empty() {
            return self.leaf(el);
        }
        self.xml.write_event(Event::Start(el))?;
        for child in children {
            self.leaf(child)?;
        }
        self.close("type")
    }

    fn function(&mut self, function: &Function, empty: bool) -> Result<()> {
        let mut el = BytesStart::new("function");
        text_attr(&mut el, "name", &function.name);
        self.addr_attr(&mut el, "entry", function.entry)?;
        self.addr_attr(&mut el, "start", function.range.start)?;
        self.end_attr(&mut el, "end", function.range.end)?;
        if let Some(cc) = &function.calling_convention {
            text_attr(&mut el, "calling-convention", cc);
        }
        self.open(el, empty)
    }

    fn block(&mut self, block: &BasicBlock, empty: bool) -> Result<()> {
        let mut el = BytesStart::new("block");
        self.addr_attr(&mut el, "start", block.start)?;
        self.open(el, empty)
    }

    fn instruction(&mut self, ins: &Instruction) -> Result<()> {
        let mut el = BytesStart::new("instruction");
        self.addr_attr(&mut el, "address", ins.address)?;
        el.push_attribute(("length", format_size(u64::from(ins.length)).as_str()));
        text_attr(&mut el, "mnemonic", &ins.mnemonic);
        if let Some(comment) = &ins.comment {
            text_attr(&mut el, "comment", comment);
        }
        if ins.operands.is_empty() {
            return self.leaf(el);
        }
        self.xml.write_event(Event::Start(el))?;
        for operand in &ins.operands {
            let mut child = BytesStart::new("operand");
            child.push_attribute(("kind", operand.kind.as_str()));
            text_attr(&mut child, "text", &operand.text);
            self.leaf(child)?;
        }
        self.close("instruction")
    }

    fn data_item(&mut self, item: &DataItem) -> Result<()> {
        let mut el = BytesStart::new("data-item");
        self.addr_attr(&mut el, "address", item.address)?;
        el.push_attribute(("size", format_size(item.size).as_str()));
        if let Some(type_name) = &item.type_name {
            text_attr(&mut el, "type", type_name);
        }
        if let Some(value) = &item.value {
            el.push_attribute(("value", hex::encode(value).as_str()));
        }
        self.leaf(el)
    }

    fn symbol(&mut self, symbol: &Symbol) -> Result<()> {
        let mut el = BytesStart::new("symbol");
        self.addr_attr(&mut el, "address", symbol.address)?;
        text_attr(&mut el, "name", &symbol.name);
        el.push_attribute(("visibility", symbol.visibility.as_str()));
        if let Some(demangled) = &symbol.demangled {
            text_attr(&mut el, "demangled", demangled);
        }
        self.leaf(el)
    }

    fn xref(&mut self, xref: &CrossReference) -> Result<()> {
        let mut el = BytesStart::new("xref");
        self.addr_attr(&mut el, "from", xref.from)?;
        self.addr_attr(&mut el, "to", xref.to)?;
        el.push_attribute(("kind", xref.kind.as_str()));
        self.leaf(el)
    }
}

fn text_attr(element: &mut BytesStart<'_>, key: &str, value: &str) {
    if needs_hexbytes(value) {
        let key = format!("{}{}", key, HEXBYTES_SUFFIX);
        element.push_attribute((key.as_str(), hex::encode(value.as_bytes()).as_str()));
    } else {
        element.push_attribute((key, value));
    }
}

/// Render `records` to an in-memory document.
pub fn render_to_string(records: &[ExportRecord<'_>], width: AddressWidth) -> Result<String> {
    let mut emitter = XmlEmitter::new(Vec::new(), width);
    emitter.emit(records)?;
    String::from_utf8(emitter.into_inner())
        .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
