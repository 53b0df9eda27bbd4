//! Data type definitions.
//!
//! Types reference each other by name. The body is a closed set of
//! variants so every consumer has to handle every kind explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind tag of a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// Primitive types like int32, float64, char, etc.
    Primitive,
    /// C-style struct with named members at offsets
    Struct,
    /// C-style union
    Union,
    /// Enumeration type
    Enum,
    /// Pointer to another type
    Pointer,
    /// Fixed-count array of an element type
    Array,
    /// Function signature
    FunctionSignature,
    /// Type alias
    Typedef,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Primitive => "primitive",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Pointer => "pointer",
            TypeKind::Array => "array",
            TypeKind::FunctionSignature => "function-signature",
            TypeKind::Typedef => "typedef",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "primitive" => TypeKind::Primitive,
            "struct" => TypeKind::Struct,
            "union" => TypeKind::Union,
            "enum" => TypeKind::Enum,
            "pointer" => TypeKind::Pointer,
            "array" => TypeKind::Array,
            "function-signature" => TypeKind::FunctionSignature,
            "typedef" => TypeKind::Typedef,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member of a struct or union.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    /// Name of the member's type
    pub type_name: String,
    /// Offset from the start of the aggregate in bytes
    pub offset: u64,
}

/// A named constant of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

/// A function-signature parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_name: String,
}

/// Kind-specific data of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeBody {
    Primitive,
    Struct { members: Vec<Member> },
    Union { members: Vec<Member> },
    Enum { enumerators: Vec<Enumerator> },
    Pointer { target: String },
    Array { element: String, count: u64 },
    FunctionSignature {
        return_type: Option<String>,
        params: Vec<Param>,
        variadic: bool,
    },
    Typedef { target: String },
}

/// How one type refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeEdge {
    /// The referring type embeds the referenced one; it must be emitted first
    Contains,
    /// The referring type only points at the referenced one
    Points,
}

/// A named data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    /// Size in bytes, when known
    pub size: Option<u64>,
    pub body: TypeBody,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, size: Option<u64>, body: TypeBody) -> Self {
        Self {
            name: name.into(),
            size,
            body,
        }
    }

    pub fn primitive(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, Some(size), TypeBody::Primitive)
    }

    pub fn pointer(name: impl Into<String>, size: u64, target: impl Into<String>) -> Self {
        Self::new(
            name,
            Some(size),
            TypeBody::Pointer {
                target: target.into(),
            },
        )
    }

    pub fn kind(&self) -> TypeKind {
        match &self.body {
            TypeBody::Primitive => TypeKind::Primitive,
            TypeBody::Struct { .. } => TypeKind::Struct,
            TypeBody::Union { .. } => TypeKind::Union,
            TypeBody::Enum { .. } => TypeKind::Enum,
            TypeBody::Pointer { .. } => TypeKind::Pointer,
            TypeBody::Array { .. } => TypeKind::Array,
            TypeBody::FunctionSignature { .. } => TypeKind::FunctionSignature,
            TypeBody::Typedef { .. } => TypeKind::Typedef,
        }
    }

    /// Every type name this type refers to, with the kind of reference.
    pub fn references(&self) -> Vec<(&str, TypeEdge)> {
        match &self.body {
            TypeBody::Primitive | TypeBody::Enum { .. } => Vec::new(),
            TypeBody::Struct { members } | TypeBody::Union { members } => members
                .iter()
                .map(|m| (m.type_name.as_str(), TypeEdge::Contains))
                .collect(),
            TypeBody::Pointer { target } => vec![(target.as_str(), TypeEdge::Points)],
            TypeBody::Array { element, .. } => vec![(element.as_str(), TypeEdge::Contains)],
            TypeBody::Typedef { target } => vec![(target.as_str(), TypeEdge::Contains)],
            TypeBody::FunctionSignature {
                return_type,
                params,
                ..
            } => return_type
                .iter()
                .map(|r| (r.as_str(), TypeEdge::Contains))
                .chain(
                    params
                        .iter()
                        .map(|p| (p.type_name.as_str(), TypeEdge::Contains)),
                )
                .collect(),
        }
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name)
    }
}
