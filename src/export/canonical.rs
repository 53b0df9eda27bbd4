//! Canonical ordering of a DatabaseModel.
//!
//! `canonical_order` validates the snapshot and flattens it into a single
//! totally-ordered record sequence, so two runs over the same model
//! always serialize to the same bytes:
//!
//! 1. segments by start address (then end, name), non-overlapping;
//! 2. entry points by address, ordinal, name;
//! 3. types topologically by containment, ties broken by name;
//! 4. functions by entry address, blocks by start, instructions by
//!    address, contiguous inside a block;
//! 5. data items by address;
//! 6. symbols by address, then name;
//! 7. cross-references by (source, kind, target).
//!
//! Sections are independent once segments are known, so they are
//! ordered in parallel and errors are reported in document order.

use rayon::join;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info_span, trace};

use crate::analysis::snapshot::DatabaseModel;
use crate::core::data_type::TypeEdge;
use crate::core::{
    Address, AddressWidth, BasicBlock, CrossReference, DataItem, EntryPoint, Function,
    Instruction, Segment, Symbol, TypeDef,
};
use crate::demangle;
use crate::error::{ExportError, Result};
use crate::export::config::{ExportOptions, Section};

/// One step of the canonical traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportRecord<'m> {
    SectionStart(Section),
    SectionEnd(Section),
    Segment(&'m Segment),
    EntryPoint(&'m EntryPoint),
    Type(&'m TypeDef),
    FunctionStart(&'m Function),
    BlockStart(&'m BasicBlock),
    Instruction(&'m Instruction),
    BlockEnd,
    FunctionEnd,
    DataItem(&'m DataItem),
    Symbol(Cow<'m, Symbol>),
    CrossReference(&'m CrossReference),
}

/// Number of records written per section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCounts {
    pub segments: usize,
    pub entry_points: usize,
    pub types: usize,
    pub functions: usize,
    pub instructions: usize,
    pub data_items: usize,
    pub symbols: usize,
    pub cross_references: usize,
}

impl SectionCounts {
    pub fn total(&self) -> usize {
        self.segments
            + self.entry_points
            + self.types
            + self.functions
            + self.instructions
            + self.data_items
            + self.symbols
            + self.cross_references
    }
}

/// Validated, ordered record sequence borrowing from a model.
#[derive(Debug, Clone)]
pub struct CanonicalExport<'m> {
    records: Vec<ExportRecord<'m>>,
    counts: SectionCounts,
}

impl<'m> CanonicalExport<'m> {
    pub fn records(&self) -> &[ExportRecord<'m>] {
        &self.records
    }

    pub fn counts(&self) -> SectionCounts {
        self.counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

struct OrderedFunction<'m> {
    function: &'m Function,
    blocks: Vec<(&'m BasicBlock, Vec<&'m Instruction>)>,
}

/// Sorted, non-overlapping segments with address lookup.
struct SegmentIndex<'m> {
    segments: Vec<&'m Segment>,
}

impl<'m> SegmentIndex<'m> {
    fn find(&self, address: Address) -> Option<&'m Segment> {
        let idx = self
            .segments
            .partition_point(|seg| seg.range.start <= address);
        idx.checked_sub(1)
            .map(|i| self.segments[i])
            .filter(|seg| seg.contains(address))
    }

    fn require(&self, address: Address, what: &str) -> Result<&'m Segment> {
        self.find(address).ok_or_else(|| {
            ExportError::unresolved(address, format!("{} lies outside every segment", what))
        })
    }
}

fn check_end(width: AddressWidth, end: Address) -> Result<()> {
    if width.fits_end(end) {
        Ok(())
    } else {
        Err(ExportError::invariant(
            end,
            format!("end bound does not fit a {}-bit export", width),
        ))
    }
}

fn check_width(width: AddressWidth, address: Address) -> Result<()> {
    if width.fits(address) {
        Ok(())
    } else {
        Err(ExportError::invariant(
            address,
            format!("address does not fit a {}-bit export", width),
        ))
    }
}

/// Validate `model` and produce its canonical record sequence.
pub fn canonical_order<'m>(
    model: &'m DatabaseModel,
    options: &ExportOptions,
) -> Result<CanonicalExport<'m>> {
    let span = info_span!("canonicalize");
    let _guard = span.enter();
    let width = options.address_width;

    let index = order_segments(model.segments(), width)?;

    let ((entries, types), ((functions, data), (symbols, xrefs))) = join(
        || {
            join(
                || order_entry_points(model.entry_points(), &index, width),
                || order_types(model.types()),
            )
        },
        || {
            join(
                || {
                    join(
                        || order_functions(model.functions(), &index, width),
                        || order_data_items(model.data_items(), model.types(), width),
                    )
                },
                || {
                    join(
                        || order_symbols(model.symbols(), width, options.demangle_symbols),
                        || order_cross_references(model.cross_references(), &index, width),
                    )
                },
            )
        },
    );

    let entries = entries?;
    let types = types?;
    let functions = functions?;
    let data = data?;
    let symbols = symbols?;
    let xrefs = xrefs?;

    let mut records = Vec::new();
    let mut counts = SectionCounts::default();
    for section in Section::ALL {
        if !options.sections.includes(section) {
            trace!(%section, "Section excluded");
            continue;
        }
        records.push(ExportRecord::SectionStart(section));
        match section {
            Section::Segments => {
                counts.segments = index.segments.len();
                records.extend(index.segments.iter().copied().map(ExportRecord::Segment));
            }
            Section::EntryPoints => {
                counts.entry_points = entries.len();
                records.extend(entries.iter().copied().map(ExportRecord::EntryPoint));
            }
            Section::Types => {
                counts.types = types.len();
                records.extend(types.iter().copied().map(ExportRecord::Type));
            }
            Section::Functions => {
                counts.functions = functions.len();
                for ordered in &functions {
                    records.push(ExportRecord::FunctionStart(ordered.function));
                    for (block, instructions) in &ordered.blocks {
                        records.push(ExportRecord::BlockStart(*block));
                        counts.instructions += instructions.len();
                        records.extend(
                            instructions.iter().copied().map(ExportRecord::Instruction),
                        );
                        records.push(ExportRecord::BlockEnd);
                    }
                    records.push(ExportRecord::FunctionEnd);
                }
            }
            Section::Data => {
                counts.data_items = data.len();
                records.extend(data.iter().copied().map(ExportRecord::DataItem));
            }
            Section::Symbols => {
                counts.symbols = symbols.len();
                records.extend(symbols.iter().cloned().map(ExportRecord::Symbol));
            }
            Section::CrossReferences => {
                counts.cross_references = xrefs.len();
                records.extend(xrefs.iter().copied().map(ExportRecord::CrossReference));
            }
        }
        records.push(ExportRecord::SectionEnd(section));
    }

    debug!(records = records.len(), total = counts.total(), "Canonical order built");
    Ok(CanonicalExport { records, counts })
}

fn order_segments(segments: &[Segment], width: AddressWidth) -> Result<SegmentIndex<'_>> {
    let mut sorted: Vec<&Segment> = segments.iter().collect();
    sorted.sort_by(|a, b| {
        (a.range.start, a.range.end, &a.name).cmp(&(b.range.start, b.range.end, &b.name))
    });

    for seg in &sorted {
        check_width(width, seg.range.start)?;
        check_end(width, seg.range.end)?;
        if seg.range.end < seg.range.start {
            return Err(ExportError::invariant(
                seg.range.start,
                format!("segment '{}' ends before it starts", seg.name),
            ));
        }
    }
    for pair in sorted.windows(2) {
        if pair[0].range.end > pair[1].range.start {
            return Err(ExportError::invariant(
                pair[1].range.start,
                format!(
                    "segment '{}' overlaps segment '{}'",
                    pair[1].name, pair[0].name
                ),
            ));
        }
    }
    Ok(SegmentIndex { segments: sorted })
}

fn order_entry_points<'m>(
    entries: &'m [EntryPoint],
    index: &SegmentIndex<'_>,
    width: AddressWidth,
) -> Result<Vec<&'m EntryPoint>> {
    let mut sorted: Vec<&EntryPoint> = entries.iter().collect();
    sorted.sort();
    for entry in &sorted {
        check_width(width, entry.address)?;
        index.require(entry.address, &format!("entry point '{}'", entry.name))?;
    }
    Ok(sorted)
}

/// Topologically sort types by containment, ties broken by name.
fn order_types(types: &[TypeDef]) -> Result<Vec<&TypeDef>> {
    let mut by_name: BTreeMap<&str, &TypeDef> = BTreeMap::new();
    for ty in types {
        if by_name.insert(ty.name.as_str(), ty).is_some() {
            return Err(ExportError::unresolved_type(
                ty.name.clone(),
                None,
                "defined more than once",
            ));
        }
    }

    let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, ty) in &by_name {
        let mut contained: BTreeSet<&str> = BTreeSet::new();
        for (target, edge) in ty.references() {
            if !by_name.contains_key(target) {
                return Err(ExportError::unresolved_type(
                    target,
                    None,
                    format!("referenced by '{}' but not defined", name),
                ));
            }
            if edge == TypeEdge::Contains {
                contained.insert(target);
            }
        }
        for target in &contained {
            dependents.entry(target).or_default().push(*name);
        }
        pending.insert(*name, contained.len());
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut ordered = Vec::with_capacity(by_name.len());
    while let Some(name) = ready.pop_first() {
        ordered.push(by_name[name]);
        for dependent in dependents.get(name).into_iter().flatten() {
            if let Some(count) = pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*dependent);
                }
            }
        }
    }

    if ordered.len() < by_name.len() {
        let emitted: HashSet<&str> = ordered.iter().map(|t| t.name.as_str()).collect();
        let stuck: Vec<&str> = by_name
            .keys()
            .copied()
            .filter(|n| !emitted.contains(n))
            .collect();
        return Err(ExportError::unresolved_type(
            stuck[0],
            None,
            format!("containment cycle among: {}", stuck.join(", ")),
        ));
    }
    Ok(ordered)
}

fn order_functions<'m>(
    functions: &'m [Function],
    index: &SegmentIndex<'_>,
    width: AddressWidth,
) -> Result<Vec<OrderedFunction<'m>>> {
    let mut sorted: Vec<&Function> = functions.iter().collect();
    sorted.sort_by(|a, b| {
        (a.entry, &a.name, a.range).cmp(&(b.entry, &b.name, b.range))
    });

    let mut out = Vec::with_capacity(sorted.len());
    for function in sorted {
        check_width(width, function.entry)?;
        check_width(width, function.range.start)?;
        check_end(width, function.range.end)?;
        index.require(function.entry, &format!("entry of function '{}'", function.name))?;
        if !function.range.contains(function.entry) {
            return Err(ExportError::invariant(
                function.entry,
                format!(
                    "entry of function '{}' outside its range {}",
                    function.name, function.range
                ),
            ));
        }

        let mut blocks: Vec<&BasicBlock> = function.blocks.iter().collect();
        blocks.sort_by_key(|b| b.start);

        let mut ordered_blocks = Vec::with_capacity(blocks.len());
        let mut previous_end: Option<Address> = None;
        for block in blocks {
            let instructions = order_block(function, block, width)?;
            if let (Some(prev), Some(first)) = (previous_end, instructions.first()) {
                if first.address < prev {
                    return Err(ExportError::invariant(
                        first.address,
                        format!("block overlaps previous block in '{}'", function.name),
                    ));
                }
            }
            if let Some(last) = instructions.last() {
                previous_end = last.end_address();
            }
            ordered_blocks.push((block, instructions));
        }
        out.push(OrderedFunction {
            function,
            blocks: ordered_blocks,
        });
    }
    Ok(out)
}

fn order_block<'m>(
    function: &Function,
    block: &'m BasicBlock,
    width: AddressWidth,
) -> Result<Vec<&'m Instruction>> {
    check_width(width, block.start)?;
    let mut instructions: Vec<&Instruction> = block.instructions.iter().collect();
    instructions.sort_by_key(|i| i.address);

    if let Some(first) = instructions.first() {
        if first.address != block.start {
            return Err(ExportError::invariant(
                block.start,
                format!("block does not start at its first instruction {}", first.address),
            ));
        }
    }

    let mut expected: Option<Address> = None;
    for ins in &instructions {
        check_width(width, ins.address)?;
        if ins.length == 0 {
            return Err(ExportError::invariant(ins.address, "zero-length instruction"));
        }
        let end = ins
            .end_address()
            .ok_or_else(|| ExportError::invariant(ins.address, "instruction end overflows"))?;
        if ins.address < function.range.start || end > function.range.end {
            return Err(ExportError::invariant(
                ins.address,
                format!("instruction outside function '{}'", function.name),
            ));
        }
        if let Some(exp) = expected {
            if ins.address != exp {
                return Err(ExportError::invariant(
                    ins.address,
                    format!("instructions not contiguous, expected {}", exp),
                ));
            }
        }
        expected = Some(end);
    }
    Ok(instructions)
}

fn order_data_items<'m>(
    items: &'m [DataItem],
    types: &[TypeDef],
    width: AddressWidth,
) -> Result<Vec<&'m DataItem>> {
    let known: HashSet<&str> = types.iter().map(|t| t.name.as_str()).collect();
    let mut sorted: Vec<&DataItem> = items.iter().collect();
    sorted.sort();
    for item in &sorted {
        check_width(width, item.address)?;
        if let Some(type_name) = &item.type_name {
            if !known.contains(type_name.as_str()) {
                return Err(ExportError::unresolved_type(
                    type_name.clone(),
                    Some(item.address),
                    "data item type not defined",
                ));
            }
        }
        if let Some(value) = &item.value {
            if value.len() as u64 != item.size {
                return Err(ExportError::invariant(
                    item.address,
                    format!(
                        "value has {} bytes but item size is {}",
                        value.len(),
                        item.size
                    ),
                ));
            }
        }
    }
    Ok(sorted)
}

fn order_symbols(
    symbols: &[Symbol],
    width: AddressWidth,
    demangle_missing: bool,
) -> Result<Vec<Cow<'_, Symbol>>> {
    let mut out: Vec<Cow<'_, Symbol>> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        check_width(width, symbol.address)?;
        if !demangle_missing || symbol.demangled.is_some() {
            out.push(Cow::Borrowed(symbol));
            continue;
        }
        match demangle::demangle(&symbol.name) {
            Some(demangled) => {
                trace!(name = %symbol.name, %demangled, "Demangled symbol");
                out.push(Cow::Owned(symbol.clone().with_demangled(demangled)));
            }
            None => {
                debug!(name = %symbol.name, "Symbol name not recognized by any demangler");
                out.push(Cow::Borrowed(symbol));
            }
        }
    }
    out.sort();
    Ok(out)
}

fn order_cross_references<'m>(
    xrefs: &'m [CrossReference],
    index: &SegmentIndex<'_>,
    width: AddressWidth,
) -> Result<Vec<&'m CrossReference>> {
    let mut sorted: Vec<&CrossReference> = xrefs.iter().collect();
    sorted.sort_by_key(|x| x.sort_key());
    for xref in &sorted {
        check_width(width, xref.from)?;
        check_width(width, xref.to)?;
        index.require(xref.from, &format!("source of {} reference", xref.kind))?;
        index.require(xref.to, &format!("target of {} reference", xref.kind))?;
    }
    Ok(sorted)
}
