//! Type descriptors for the valuescope value core
//!
//! The value core never interprets type layouts itself. It consumes the
//! [`TypeDescriptor`] trait; this crate provides a DWARF-shaped implementation
//! ([`TypeInfo`]) and the session-owned interning handle ([`TypeSystem`]).

pub mod descriptor;
pub mod type_info;
pub mod type_system;

pub use descriptor::{ChildMember, TypeDescriptor, TypeHandle};
pub use type_info::{EnumVariant, StructMember, TypeInfo, TypeQualifier};
pub use type_system::TypeSystem;
