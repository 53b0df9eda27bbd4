//! Core data types for the analysis database.
//!
//! This module contains the closed entity vocabulary the exporter reads:
//! segments, functions with their blocks and instructions, data items,
//! types, symbols, cross-references and entry points, all keyed by the
//! `Address` type.

pub mod address;
pub mod address_range;
pub mod data_item;
pub mod data_type;
pub mod entry_point;
pub mod function;
pub mod instruction;
pub mod reference;
pub mod segment;
pub mod symbol;

pub use address::{Address, AddressWidth};
pub use address_range::AddressRange;
pub use data_item::DataItem;
pub use data_type::{Enumerator, Member, Param, TypeBody, TypeDef, TypeKind};
pub use entry_point::EntryPoint;
pub use function::{BasicBlock, Function};
pub use instruction::{Instruction, Operand, OperandKind};
pub use reference::{CrossReference, XrefKind};
pub use segment::{Perms, Segment};
pub use symbol::{Symbol, Visibility};
