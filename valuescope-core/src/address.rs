use std::fmt;
use valuescope_process::ModuleAddress;

/// Symbolic address handed to a memory-backed value by its factory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Address {
    /// No fixed location, e.g. an optimized-out variable
    #[default]
    Invalid,
    /// Link-time address inside a named image
    Module(ModuleAddress),
    /// Bare offset with no image association
    Raw(u64),
}

impl Address {
    pub fn module(module_path: impl Into<std::path::PathBuf>, address: u64) -> Self {
        Address::Module(ModuleAddress::new(module_path, address))
    }

    pub fn file_address(&self) -> Option<&ModuleAddress> {
        match self {
            Address::Module(module_address) => Some(module_address),
            _ => None,
        }
    }

    pub fn offset(&self) -> u64 {
        match self {
            Address::Invalid => 0,
            Address::Module(module_address) => module_address.address,
            Address::Raw(offset) => *offset,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Address::Invalid)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Invalid => write!(f, "<invalid>"),
            Address::Module(module_address) => write!(f, "{module_address}"),
            Address::Raw(offset) => write!(f, "0x{offset:x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_accessors() {
        let module = Address::module("/bin/demo", 0x1000);
        assert!(module.is_valid());
        assert_eq!(module.offset(), 0x1000);
        assert_eq!(module.file_address().unwrap().address, 0x1000);
        assert_eq!(module.to_string(), "/bin/demo+0x1000");

        let raw = Address::Raw(0x42);
        assert!(raw.file_address().is_none());
        assert_eq!(raw.offset(), 0x42);

        assert!(!Address::Invalid.is_valid());
        assert_eq!(Address::default(), Address::Invalid);
    }
}
