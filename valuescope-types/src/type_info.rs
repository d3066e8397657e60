//! DWARF-shaped type information
//!
//! [`TypeInfo`] mirrors what a DWARF reader produces for a variable's type and
//! implements [`TypeDescriptor`] so the value core can size values and lay out
//! their children without knowing anything about DWARF.

use crate::descriptor::{ChildMember, TypeDescriptor};
use gimli::constants::{
    DW_ATE_address, DW_ATE_boolean, DW_ATE_float, DW_ATE_signed, DW_ATE_signed_char,
    DW_ATE_unsigned, DW_ATE_unsigned_char,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Type information as recovered from debugging data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeInfo {
    /// Base/primitive type (int, float, char, etc.)
    BaseType {
        name: String,
        size: u64,
        encoding: u16, // DwAte stored as u16 for serialization
    },

    PointerType {
        target_type: Box<TypeInfo>,
        size: u64,
    },

    ArrayType {
        element_type: Arc<TypeInfo>,
        element_count: Option<u64>,
        total_size: Option<u64>,
    },

    StructType {
        name: String,
        size: u64,
        members: Vec<StructMember>,
    },

    UnionType {
        name: String,
        size: u64,
        members: Vec<StructMember>,
    },

    EnumType {
        name: String,
        size: u64,
        base_type: Box<TypeInfo>,
        variants: Vec<EnumVariant>,
    },

    TypedefType {
        name: String,
        underlying_type: Box<TypeInfo>,
    },

    /// const, volatile, restrict
    QualifiedType {
        qualifier: TypeQualifier,
        underlying_type: Box<TypeInfo>,
    },

    FunctionType {
        return_type: Option<Box<TypeInfo>>,
        parameters: Vec<TypeInfo>,
    },

    /// Bitfield: a view over the storage unit of an underlying integer type
    BitfieldType {
        underlying_type: Box<TypeInfo>,
        bit_offset: u8,
        bit_size: u8,
    },

    UnknownType { name: String },

    /// Variable was optimized away by the compiler
    OptimizedOut { name: String },
}

/// Struct/union member information
///
/// Member and element types are shared: every value expanded from the same
/// parent type hands out the same handle for a given member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    pub member_type: Arc<TypeInfo>,
    pub offset: u64,
    pub bit_offset: Option<u8>,
    pub bit_size: Option<u8>,
}

impl StructMember {
    /// Plain (non-bitfield) member at a byte offset
    pub fn new(
        name: impl Into<String>,
        member_type: impl Into<Arc<TypeInfo>>,
        offset: u64,
    ) -> Self {
        Self {
            name: name.into(),
            member_type: member_type.into(),
            offset,
            bit_offset: None,
            bit_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeQualifier {
    Const,
    Volatile,
    Restrict,
}

impl TypeQualifier {
    fn as_str(&self) -> &'static str {
        match self {
            TypeQualifier::Const => "const",
            TypeQualifier::Volatile => "volatile",
            TypeQualifier::Restrict => "restrict",
        }
    }
}

impl TypeInfo {
    /// Size in bytes of this type
    pub fn size(&self) -> u64 {
        match self {
            TypeInfo::BaseType { size, .. }
            | TypeInfo::PointerType { size, .. }
            | TypeInfo::StructType { size, .. }
            | TypeInfo::UnionType { size, .. }
            | TypeInfo::EnumType { size, .. } => *size,
            TypeInfo::ArrayType {
                element_type,
                element_count,
                total_size,
            } => total_size.unwrap_or_else(|| {
                element_count.map_or(0, |count| count.saturating_mul(element_type.size()))
            }),
            TypeInfo::TypedefType {
                underlying_type, ..
            }
            | TypeInfo::QualifiedType {
                underlying_type, ..
            }
            | TypeInfo::BitfieldType {
                underlying_type, ..
            } => underlying_type.size(),
            TypeInfo::FunctionType { .. } => 8, // Function pointer size
            TypeInfo::UnknownType { .. } | TypeInfo::OptimizedOut { .. } => 0,
        }
    }

    /// Type name in C spelling
    pub fn type_name(&self) -> String {
        match self {
            TypeInfo::BaseType { name, .. } => name.clone(),
            TypeInfo::PointerType { target_type, .. } => {
                format!("{}*", target_type.type_name())
            }
            TypeInfo::ArrayType {
                element_type,
                element_count,
                ..
            } => match element_count {
                Some(count) => format!("{}[{}]", element_type.type_name(), count),
                None => format!("{}[]", element_type.type_name()),
            },
            TypeInfo::StructType { name, .. } => tagged("struct", name),
            TypeInfo::UnionType { name, .. } => tagged("union", name),
            TypeInfo::EnumType { name, .. } => tagged("enum", name),
            TypeInfo::TypedefType { name, .. } => name.clone(),
            TypeInfo::QualifiedType {
                qualifier,
                underlying_type,
            } => format!("{} {}", qualifier.as_str(), underlying_type.type_name()),
            TypeInfo::FunctionType {
                return_type,
                parameters,
            } => {
                let return_str = return_type
                    .as_ref()
                    .map(|t| t.type_name())
                    .unwrap_or_else(|| "void".to_string());
                let param_str = parameters
                    .iter()
                    .map(|p| p.type_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{return_str} ({param_str})")
            }
            TypeInfo::BitfieldType {
                underlying_type,
                bit_offset,
                bit_size,
            } => format!(
                "bitfield<{}:{}> {}",
                bit_offset,
                bit_size,
                underlying_type.type_name()
            ),
            TypeInfo::UnknownType { name } => name.clone(),
            TypeInfo::OptimizedOut { name } => format!("<optimized_out> {name}"),
        }
    }

    /// Skip typedefs, qualifiers and bitfield wrappers
    pub fn underlying_type(&self) -> &TypeInfo {
        match self {
            TypeInfo::TypedefType {
                underlying_type, ..
            }
            | TypeInfo::QualifiedType {
                underlying_type, ..
            }
            | TypeInfo::BitfieldType {
                underlying_type, ..
            } => underlying_type.underlying_type(),
            _ => self,
        }
    }

    fn base_encoding(&self) -> Option<u16> {
        match self.underlying_type() {
            TypeInfo::BaseType { encoding, .. } => Some(*encoding),
            _ => None,
        }
    }

    pub fn is_signed_int(&self) -> bool {
        self.base_encoding().is_some_and(|encoding| {
            encoding == DW_ATE_signed.0 as u16 || encoding == DW_ATE_signed_char.0 as u16
        })
    }

    pub fn is_unsigned_int(&self) -> bool {
        self.base_encoding().is_some_and(|encoding| {
            encoding == DW_ATE_unsigned.0 as u16
                || encoding == DW_ATE_unsigned_char.0 as u16
                || encoding == DW_ATE_boolean.0 as u16
                || encoding == DW_ATE_address.0 as u16
        })
    }

    pub fn is_float(&self) -> bool {
        self.base_encoding() == Some(DW_ATE_float.0 as u16)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.underlying_type(), TypeInfo::PointerType { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.underlying_type(), TypeInfo::ArrayType { .. })
    }

    /// Struct, union or array once typedefs and qualifiers are stripped
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.underlying_type(),
            TypeInfo::StructType { .. } | TypeInfo::UnionType { .. } | TypeInfo::ArrayType { .. }
        )
    }

    /// Members of an aggregate, in declaration order
    pub fn members(&self) -> &[StructMember] {
        match self.underlying_type() {
            TypeInfo::StructType { members, .. } | TypeInfo::UnionType { members, .. } => members,
            _ => &[],
        }
    }

    pub fn signed_int(size: u64) -> Self {
        TypeInfo::BaseType {
            name: format!("i{}", size.saturating_mul(8)),
            size,
            encoding: DW_ATE_signed.0 as u16,
        }
    }

    pub fn unsigned_int(size: u64) -> Self {
        TypeInfo::BaseType {
            name: format!("u{}", size.saturating_mul(8)),
            size,
            encoding: DW_ATE_unsigned.0 as u16,
        }
    }

    pub fn float(size: u64) -> Self {
        TypeInfo::BaseType {
            name: format!("f{}", size.saturating_mul(8)),
            size,
            encoding: DW_ATE_float.0 as u16,
        }
    }

    pub fn pointer_to(target: TypeInfo, size: u64) -> Self {
        TypeInfo::PointerType {
            target_type: Box::new(target),
            size,
        }
    }

    /// Fixed-length array; total size derived from the element size
    pub fn array_of(element: impl Into<Arc<TypeInfo>>, count: u64) -> Self {
        let element = element.into();
        let total = element.size().saturating_mul(count);
        TypeInfo::ArrayType {
            element_type: element,
            element_count: Some(count),
            total_size: Some(total),
        }
    }

    pub fn structure(name: impl Into<String>, size: u64, members: Vec<StructMember>) -> Self {
        TypeInfo::StructType {
            name: name.into(),
            size,
            members,
        }
    }
}

impl TypeDescriptor for TypeInfo {
    fn name(&self) -> String {
        self.type_name()
    }

    fn byte_size(&self) -> u64 {
        self.size()
    }

    fn is_aggregate(&self) -> bool {
        TypeInfo::is_aggregate(self)
    }

    fn child_count(&self) -> usize {
        match self.underlying_type() {
            TypeInfo::StructType { members, .. } | TypeInfo::UnionType { members, .. } => {
                members.len()
            }
            TypeInfo::ArrayType { element_count, .. } => {
                element_count.map_or(0, |count| count as usize)
            }
            _ => 0,
        }
    }

    fn child_at(&self, index: usize) -> Option<ChildMember> {
        match self.underlying_type() {
            TypeInfo::StructType { members, .. } | TypeInfo::UnionType { members, .. } => {
                members.get(index).map(|member| {
                    ChildMember::new(
                        member.name.clone(),
                        member.member_type.clone(),
                        member.offset,
                    )
                })
            }
            TypeInfo::ArrayType {
                element_type,
                element_count,
                ..
            } => {
                let count = element_count.unwrap_or(0);
                if index as u64 >= count {
                    return None;
                }
                let offset = (index as u64).checked_mul(element_type.size())?;
                Some(ChildMember::new(
                    format!("[{index}]"),
                    element_type.clone(),
                    offset,
                ))
            }
            _ => None,
        }
    }

    fn child_index_of(&self, name: &str) -> Option<usize> {
        match self.underlying_type() {
            TypeInfo::StructType { members, .. } | TypeInfo::UnionType { members, .. } => {
                members.iter().position(|member| member.name == name)
            }
            TypeInfo::ArrayType { .. } => {
                let index: usize = name.strip_prefix('[')?.strip_suffix(']')?.parse().ok()?;
                (index < self.child_count()).then_some(index)
            }
            _ => None,
        }
    }
}

fn tagged(keyword: &str, name: &str) -> String {
    if name.is_empty() {
        keyword.to_string()
    } else {
        format!("{keyword} {name}")
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeInfo::TypedefType {
                name,
                underlying_type,
            } if name.is_empty() => write!(f, "{underlying_type}"),
            TypeInfo::UnknownType { name } if name.is_empty() => write!(f, "unknown"),
            TypeInfo::OptimizedOut { name } if name.is_empty() => write!(f, "<optimized_out>"),
            _ => write!(f, "{}", self.type_name()),
        }
    }
}
