//! Reader for the interchange document.
//!
//! Rebuilds a `DatabaseModel` from XML written by [`XmlEmitter`]. The
//! reader is lenient where the format allows it: unknown attributes are
//! ignored and unknown elements are skipped with their whole subtree.
//! It is strict about completeness: a document whose root element never
//! closes is rejected as truncated.
//!
//! [`XmlEmitter`]: crate::export::xml::XmlEmitter

use quick_xml::encoding::Decoder;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use thiserror::Error;
use tracing::{debug, trace};

use crate::analysis::snapshot::{DatabaseModel, ModelBuilder};
use crate::core::address::parse_hex;
use crate::core::{
    Address, AddressRange, AddressWidth, BasicBlock, CrossReference, DataItem, EntryPoint,
    Enumerator, Function, Instruction, Member, Operand, OperandKind, Param, Perms, Segment,
    Symbol, TypeBody, TypeDef, TypeKind, Visibility, XrefKind,
};
use crate::export::config::{Section, SectionSet};
use crate::export::xml::{HEXBYTES_SUFFIX, ROOT_TAG};

/// Errors raised while reading an interchange document.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    /// The root element is not closed
    #[error("Document truncated: missing closing </analysis-database>")]
    Truncated,

    #[error("Unsupported schema version '{0}'")]
    UnsupportedSchema(String),

    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: String,
    },

    #[error("<{element}> has invalid {attribute}=\"{value}\"")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
    },

    /// A known element appeared outside its parent
    #[error("<{0}> is not allowed here")]
    Misplaced(String),
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// Root attributes of an imported document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub schema_version: String,
    pub address_width: AddressWidth,
}

/// A fully read interchange document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedDatabase {
    pub header: DocumentHeader,
    pub model: DatabaseModel,
    /// Sections present in the document
    pub sections: SectionSet,
}

/// Attributes of one element, decoded and unescaped.
struct Attrs {
    element: String,
    values: Vec<(String, String)>,
}

impl Attrs {
    fn read(start: &BytesStart<'_>, decoder: Decoder) -> ImportResult<Self> {
        let element = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut values = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.decode_and_unescape_value(decoder)?.into_owned();
            values.push((key, value));
        }
        Ok(Self { element, values })
    }

    fn raw(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn missing(&self, key: &str) -> ImportError {
        ImportError::MissingAttribute {
            element: self.element.clone(),
            attribute: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, value: &str) -> ImportError {
        ImportError::InvalidValue {
            element: self.element.clone(),
            attribute: key.to_string(),
            value: value.to_string(),
        }
    }

    /// A string attribute, accepting its `-hexbytes` form.
    fn text(&self, key: &str) -> ImportResult<Option<String>> {
        if let Some(v) = self.raw(key) {
            return Ok(Some(v.to_string()));
        }
        let hex_key = format!("{}{}", key, HEXBYTES_SUFFIX);
        match self.raw(&hex_key) {
            Some(encoded) => {
                let bytes = hex::decode(encoded).map_err(|_| self.invalid(&hex_key, encoded))?;
                String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|_| self.invalid(&hex_key, encoded))
            }
            None => Ok(None),
        }
    }

    fn required_text(&self, key: &str) -> ImportResult<String> {
        self.text(key)?.ok_or_else(|| self.missing(key))
    }

    fn required(&self, key: &str) -> ImportResult<&str> {
        self.raw(key).ok_or_else(|| self.missing(key))
    }

    fn hex_opt(&self, key: &str) -> ImportResult<Option<u64>> {
        match self.raw(key) {
            Some(v) => parse_hex(v).map(Some).map_err(|_| self.invalid(key, v)),
            None => Ok(None),
        }
    }

    fn hex(&self, key: &str) -> ImportResult<u64> {
        self.hex_opt(key)?.ok_or_else(|| self.missing(key))
    }

    fn address(&self, key: &str) -> ImportResult<Address> {
        self.hex(key).map(Address)
    }

    fn parsed<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> ImportResult<T> {
        let v = self.required(key)?;
        parse(v).ok_or_else(|| self.invalid(key, v))
    }

    fn range(&self, start: &str, end: &str) -> ImportResult<AddressRange> {
        let s = self.address(start)?;
        let e = self.address(end)?;
        AddressRange::new(s, e).map_err(|_| self.invalid(end, &e.to_string()))
    }
}

/// Where the reader currently is in the document.
#[derive(Default)]
struct Cursor {
    root_open: bool,
    root_closed: bool,
    header: Option<DocumentHeader>,
    section: Option<Section>,
    ty: Option<TypeDef>,
    function: Option<Function>,
    block: Option<BasicBlock>,
    instruction: Option<Instruction>,
    /// Depth inside an unknown element being skipped
    skipping: usize,
}

struct Importer {
    cursor: Cursor,
    builder: ModelBuilder,
    sections: SectionSet,
}

impl Importer {
    fn new() -> Self {
        Self {
            cursor: Cursor::default(),
            builder: DatabaseModel::builder(),
            sections: SectionSet::empty(),
        }
    }

    fn in_section(&self, section: Section) -> bool {
        self.cursor.section == Some(section)
    }

    fn open(&mut self, attrs: Attrs) -> ImportResult<()> {
        let name = attrs.element.as_str();
        let c = &self.cursor;

        if !c.root_open {
            if name != ROOT_TAG || c.root_closed {
                return Err(ImportError::Misplaced(name.to_string()));
            }
            return self.open_root(&attrs);
        }

        let in_type = c.ty.is_some();
        let in_function = c.function.is_some();
        let in_block = c.block.is_some();
        let in_instruction = c.instruction.is_some();

        if let Some(section) = Section::from_tag(name) {
            if c.section.is_some() {
                return Err(ImportError::Misplaced(name.to_string()));
            }
            self.cursor.section = Some(section);
            self.sections |= section.flag();
            return Ok(());
        }

        match name {
            "segment" if self.in_section(Section::Segments) => {
                let seg = Segment::new(
                    attrs.required_text("name")?,
                    attrs.range("start", "end")?,
                    attrs.parsed("perms", Perms::parse)?,
                    attrs.hex_opt("align")?,
                );
                self.builder.push_segment(seg);
            }
            "entry-point" if self.in_section(Section::EntryPoints) => {
                let ordinal = attrs.parsed("ordinal", |v| v.parse::<u32>().ok())?;
                self.builder.push_entry_point(EntryPoint::new(
                    attrs.address("address")?,
                    ordinal,
                    attrs.required_text("name")?,
                ));
            }
            "type" if self.in_section(Section::Types) && !in_type => {
                self.cursor.ty = Some(read_type(&attrs)?);
            }
            "member" | "enumerator" | "param" if in_type => self.type_child(&attrs)?,
            "function" if self.in_section(Section::Functions) && !in_function => {
                let mut function = Function::new(
                    attrs.required_text("name")?,
                    attrs.address("entry")?,
                    attrs.range("start", "end")?,
                );
                function.calling_convention = attrs.text("calling-convention")?;
                self.cursor.function = Some(function);
            }
            "block" if in_function && !in_block => {
                self.cursor.block = Some(BasicBlock::new(attrs.address("start")?, Vec::new()));
            }
            "instruction" if in_block && !in_instruction => {
                let length = attrs.hex("length")?;
                let length = u32::try_from(length)
                    .map_err(|_| attrs.invalid("length", &length.to_string()))?;
                let mut ins = Instruction::new(
                    attrs.address("address")?,
                    length,
                    attrs.required_text("mnemonic")?,
                );
                ins.comment = attrs.text("comment")?;
                self.cursor.instruction = Some(ins);
            }
            "operand" if in_instruction => {
                let operand = Operand::new(
                    attrs.parsed("kind", OperandKind::parse)?,
                    attrs.required_text("text")?,
                );
                if let Some(ins) = self.cursor.instruction.as_mut() {
                    ins.operands.push(operand);
                }
            }
            "data-item" if self.in_section(Section::Data) => {
                let mut item = DataItem::new(attrs.address("address")?, attrs.hex("size")?);
                item.type_name = attrs.text("type")?;
                if let Some(v) = attrs.raw("value") {
                    item.value = Some(hex::decode(v).map_err(|_| attrs.invalid("value", v))?);
                }
                self.builder.push_data_item(item);
            }
            "symbol" if self.in_section(Section::Symbols) => {
                let mut symbol = Symbol::new(
                    attrs.address("address")?,
                    attrs.required_text("name")?,
                    attrs.parsed("visibility", Visibility::parse)?,
                );
                symbol.demangled = attrs.text("demangled")?;
                self.builder.push_symbol(symbol);
            }
            "xref" if self.in_section(Section::CrossReferences) => {
                self.builder.push_cross_reference(CrossReference::new(
                    attrs.address("from")?,
                    attrs.address("to")?,
                    attrs.parsed("kind", XrefKind::parse)?,
                ));
            }
            "segment" | "entry-point" | "type" | "member" | "enumerator" | "param"
            | "function" | "block" | "instruction" | "operand" | "data-item" | "symbol"
            | "xref" | ROOT_TAG => return Err(ImportError::Misplaced(name.to_string())),
            other => {
                trace!(element = other, "Skipping unknown element");
                return Ok(());
            }
        }
        Ok(())
    }

    fn open_root(&mut self, attrs: &Attrs) -> ImportResult<()> {
        let version = attrs.required("schema-version")?;
        if version.split('.').next() != Some("1") {
            return Err(ImportError::UnsupportedSchema(version.to_string()));
        }
        let width = attrs.parsed("address-width", |v| {
            v.parse::<u8>().ok().and_then(|b| AddressWidth::try_from(b).ok())
        })?;
        self.cursor.header = Some(DocumentHeader {
            schema_version: version.to_string(),
            address_width: width,
        });
        self.cursor.root_open = true;
        Ok(())
    }

    fn type_child(&mut self, attrs: &Attrs) -> ImportResult<()> {
        let Some(ty) = self.cursor.ty.as_mut() else {
            return Err(ImportError::Misplaced(attrs.element.clone()));
        };
        match (attrs.element.as_str(), &mut ty.body) {
            ("member", TypeBody::Struct { members } | TypeBody::Union { members }) => {
                members.push(Member {
                    name: attrs.required_text("name")?,
                    type_name: attrs.required_text("type")?,
                    offset: attrs.hex("offset")?,
                });
            }
            ("enumerator", TypeBody::Enum { enumerators }) => {
                enumerators.push(Enumerator {
                    name: attrs.required_text("name")?,
                    value: attrs.parsed("value", |v| v.parse::<i64>().ok())?,
                });
            }
            ("param", TypeBody::FunctionSignature { params, .. }) => {
                params.push(Param {
                    name: attrs.required_text("name")?,
                    type_name: attrs.required_text("type")?,
                });
            }
            (other, _) => return Err(ImportError::Misplaced(other.to_string())),
        }
        Ok(())
    }

    /// Handle an end tag, or the implicit end of an empty element.
    fn close(&mut self, name: &str) -> ImportResult<()> {
        let c = &mut self.cursor;
        match name {
            ROOT_TAG if c.root_open && c.section.is_none() => {
                c.root_open = false;
                c.root_closed = true;
            }
            "type" if c.ty.is_some() => {
                if let Some(ty) = c.ty.take() {
                    self.builder.push_type(ty);
                }
            }
            "instruction" if c.instruction.is_some() => {
                if let (Some(ins), Some(block)) = (c.instruction.take(), c.block.as_mut()) {
                    block.instructions.push(ins);
                }
            }
            "block" if c.block.is_some() && c.instruction.is_none() => {
                if let (Some(block), Some(function)) = (c.block.take(), c.function.as_mut()) {
                    function.blocks.push(block);
                }
            }
            "function" if c.function.is_some() && c.block.is_none() => {
                if let Some(function) = c.function.take() {
                    self.builder.push_function(function);
                }
            }
            other => {
                if let Some(section) = Section::from_tag(other) {
                    if c.section == Some(section) && c.ty.is_none() && c.function.is_none() {
                        c.section = None;
                    } else {
                        return Err(ImportError::Misplaced(other.to_string()));
                    }
                }
            }
        }
        Ok(())
    }

    fn is_known(name: &str) -> bool {
        matches!(
            name,
            "segment"
                | "entry-point"
                | "type"
                | "member"
                | "enumerator"
                | "param"
                | "function"
                | "block"
                | "instruction"
                | "operand"
                | "data-item"
                | "symbol"
                | "xref"
        ) || name == ROOT_TAG
            || Section::from_tag(name).is_some()
    }

    fn finish(self) -> ImportResult<ImportedDatabase> {
        let header = match (self.cursor.root_closed, self.cursor.header) {
            (true, Some(header)) => header,
            _ => return Err(ImportError::Truncated),
        };
        Ok(ImportedDatabase {
            header,
            model: self.builder.build(),
            sections: self.sections,
        })
    }
}

fn read_type(attrs: &Attrs) -> ImportResult<TypeDef> {
    let kind = attrs.parsed("kind", TypeKind::parse)?;
    let body = match kind {
        TypeKind::Primitive => TypeBody::Primitive,
        TypeKind::Struct => TypeBody::Struct {
            members: Vec::new(),
        },
        TypeKind::Union => TypeBody::Union {
            members: Vec::new(),
        },
        TypeKind::Enum => TypeBody::Enum {
            enumerators: Vec::new(),
        },
        TypeKind::Pointer => TypeBody::Pointer {
            target: attrs.required_text("target")?,
        },
        TypeKind::Typedef => TypeBody::Typedef {
            target: attrs.required_text("target")?,
        },
        TypeKind::Array => TypeBody::Array {
            element: attrs.required_text("element")?,
            count: attrs.hex("count")?,
        },
        TypeKind::FunctionSignature => TypeBody::FunctionSignature {
            return_type: attrs.text("return")?,
            params: Vec::new(),
            variadic: attrs.parsed("variadic", |v| match v {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            })?,
        },
    };
    Ok(TypeDef::new(
        attrs.required_text("name")?,
        attrs.hex_opt("size")?,
        body,
    ))
}

/// Read an interchange document from `reader`.
pub fn import_database<R: BufRead>(reader: R) -> ImportResult<ImportedDatabase> {
    let mut reader = Reader::from_reader(reader);
    reader.config_mut().trim_text(true);
    let decoder = reader.decoder();

    let mut importer = Importer::new();
    let mut buf = Vec::new();
    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e @ quick_xml::Error::Syntax(_)) => {
                // Unclosed markup runs into end of input; anything else is malformed.
                let at_eof = reader.get_mut().fill_buf().is_ok_and(|rest| rest.is_empty());
                return Err(if at_eof { ImportError::Truncated } else { e.into() });
            }
            Err(e) => return Err(e.into()),
        };
        match event {
            Event::Start(e) => {
                if importer.cursor.skipping > 0 {
                    importer.cursor.skipping += 1;
                } else if !Importer::is_known(&String::from_utf8_lossy(e.name().as_ref())) {
                    importer.cursor.skipping = 1;
                } else {
                    importer.open(Attrs::read(&e, decoder)?)?;
                }
            }
            Event::Empty(e) => {
                if importer.cursor.skipping == 0 {
                    let attrs = Attrs::read(&e, decoder)?;
                    let name = attrs.element.clone();
                    if Importer::is_known(&name) {
                        importer.open(attrs)?;
                        importer.close(&name)?;
                    }
                }
            }
            Event::End(e) => {
                if importer.cursor.skipping > 0 {
                    importer.cursor.skipping -= 1;
                } else {
                    importer.close(&String::from_utf8_lossy(e.name().as_ref()))?;
                    if importer.cursor.root_closed {
                        break;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    let imported = importer.finish()?;
    debug!(
        sections = ?imported.sections,
        width = %imported.header.address_width,
        "Imported interchange document"
    );
    Ok(imported)
}

/// Read an interchange document held in memory.
pub fn import_from_str(xml: &str) -> ImportResult<ImportedDatabase> {
    import_database(xml.as_bytes())
}
