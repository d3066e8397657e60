use std::fmt;
use std::sync::Arc;

/// Shared, read-only handle to a type descriptor.
///
/// Many value objects of the same type hold clones of one handle; the
/// descriptor lives as long as the last value referencing it.
pub type TypeHandle = Arc<dyn TypeDescriptor>;

/// What the value core needs to know about a type.
///
/// Implementations must be immutable: every method returns the same answer for
/// the lifetime of the descriptor.
pub trait TypeDescriptor: Send + Sync + fmt::Debug {
    /// Display name, e.g. `int`, `struct point`, `char[16]`
    fn name(&self) -> String;

    /// Size of one value of this type in bytes
    fn byte_size(&self) -> u64;

    /// Struct, union or array: the value is a collection of children
    fn is_aggregate(&self) -> bool;

    /// Declared member count; zero for scalars
    fn child_count(&self) -> usize;

    /// Layout of the member at `index`, or `None` past the end
    fn child_at(&self, index: usize) -> Option<ChildMember>;

    /// Index of the member called `name`
    fn child_index_of(&self, name: &str) -> Option<usize> {
        (0..self.child_count())
            .find(|&i| self.child_at(i).is_some_and(|member| member.name == name))
    }
}

/// One member of an aggregate as seen by the value core
#[derive(Debug, Clone)]
pub struct ChildMember {
    pub name: String,
    pub type_desc: TypeHandle,
    /// Offset from the start of the parent value
    pub byte_offset: u64,
}

impl ChildMember {
    pub fn new(name: impl Into<String>, type_desc: TypeHandle, byte_offset: u64) -> Self {
        Self {
            name: name.into(),
            type_desc,
            byte_offset,
        }
    }
}
