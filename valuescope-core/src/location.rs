//! Where a value currently lives
//!
//! A location is always in exactly one of four states. The only transition the
//! core performs on its own is `FileAddress -> LoadAddress`, once the image the
//! address belongs to is known to be mapped in a live process. It never goes
//! the other way.

use std::fmt;

/// Tag of a [`ValueLocation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Scalar,
    FileAddress,
    LoadAddress,
    HostAddress,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LocationKind::Scalar => "scalar",
            LocationKind::FileAddress => "file address",
            LocationKind::LoadAddress => "load address",
            LocationKind::HostAddress => "host address",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueLocation {
    /// Immediate value held by the debugger; no memory backing
    Scalar(u64),
    /// Link-time address inside an on-disk image
    FileAddress(u64),
    /// Address in the running process
    LoadAddress(u64),
    /// Address in the debugger's own scratch memory
    HostAddress(u64),
}

impl ValueLocation {
    pub fn kind(&self) -> LocationKind {
        match self {
            ValueLocation::Scalar(_) => LocationKind::Scalar,
            ValueLocation::FileAddress(_) => LocationKind::FileAddress,
            ValueLocation::LoadAddress(_) => LocationKind::LoadAddress,
            ValueLocation::HostAddress(_) => LocationKind::HostAddress,
        }
    }

    /// Numeric payload: the scalar itself or the address
    pub fn value(&self) -> u64 {
        match *self {
            ValueLocation::Scalar(v)
            | ValueLocation::FileAddress(v)
            | ValueLocation::LoadAddress(v)
            | ValueLocation::HostAddress(v) => v,
        }
    }

    pub fn is_address(&self) -> bool {
        !matches!(self, ValueLocation::Scalar(_))
    }

    /// The `LoadAddress` this location becomes once its image is mapped at
    /// `load_address`. Only file addresses can be promoted.
    pub fn promoted(&self, load_address: u64) -> Option<ValueLocation> {
        match self {
            ValueLocation::FileAddress(_) => Some(ValueLocation::LoadAddress(load_address)),
            _ => None,
        }
    }

    /// Same address space, `offset` bytes further. `None` for scalars, which
    /// have no address to offset.
    pub fn offset_by(&self, offset: u64) -> Option<ValueLocation> {
        match *self {
            ValueLocation::Scalar(_) => None,
            ValueLocation::FileAddress(a) => {
                Some(ValueLocation::FileAddress(a.wrapping_add(offset)))
            }
            ValueLocation::LoadAddress(a) => {
                Some(ValueLocation::LoadAddress(a.wrapping_add(offset)))
            }
            ValueLocation::HostAddress(a) => {
                Some(ValueLocation::HostAddress(a.wrapping_add(offset)))
            }
        }
    }
}

impl fmt::Display for ValueLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueLocation::Scalar(v) => write!(f, "scalar {v:#x}"),
            other => write!(f, "{} {:#x}", other.kind(), other.value()),
        }
    }
}
