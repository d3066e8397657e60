use object::{Object, ObjectKind};

/// Basic error types for platform-specific operations
#[derive(Debug, Clone)]
pub enum PlatformError {
    /// Address width other than 4 or 8 bytes
    UnsupportedAddressSize(u8),
    /// Object file kind that never describes a runnable image
    UnsupportedObjectKind(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::UnsupportedAddressSize(size) => {
                write!(f, "Unsupported address size: {size} bytes")
            }
            PlatformError::UnsupportedObjectKind(kind) => {
                write!(f, "Unsupported object kind: {kind}")
            }
        }
    }
}

impl std::error::Error for PlatformError {}

/// Byte order of data in the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the machine running the debugger
    pub fn host() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// Encode the low `size` bytes of `value` in this byte order.
    /// Sizes above 8 are zero-extended.
    pub fn encode(self, value: u64, size: usize) -> Vec<u8> {
        let le = value.to_le_bytes();
        let mut out: Vec<u8> = (0..size)
            .map(|i| if i < le.len() { le[i] } else { 0 })
            .collect();
        if self == ByteOrder::Big {
            out.reverse();
        }
        out
    }

    /// Decode up to 8 bytes in this byte order
    pub fn decode(self, bytes: &[u8]) -> Option<u64> {
        if bytes.is_empty() || bytes.len() > 8 {
            return None;
        }
        let mut value = 0u64;
        match self {
            ByteOrder::Little => {
                for (i, b) in bytes.iter().enumerate() {
                    value |= (*b as u64) << (i * 8);
                }
            }
            ByteOrder::Big => {
                for b in bytes {
                    value = (value << 8) | *b as u64;
                }
            }
        }
        Some(value)
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteOrder::Little => write!(f, "little-endian"),
            ByteOrder::Big => write!(f, "big-endian"),
        }
    }
}

/// Byte order and pointer width of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetArch {
    pub byte_order: ByteOrder,
    pub address_size: u8,
}

impl Default for TargetArch {
    fn default() -> Self {
        Self::host()
    }
}

impl TargetArch {
    pub fn new(byte_order: ByteOrder, address_size: u8) -> Result<Self, PlatformError> {
        match address_size {
            4 | 8 => Ok(Self {
                byte_order,
                address_size,
            }),
            other => Err(PlatformError::UnsupportedAddressSize(other)),
        }
    }

    /// Architecture of the debugger process itself
    pub fn host() -> Self {
        Self {
            byte_order: ByteOrder::host(),
            address_size: std::mem::size_of::<usize>() as u8,
        }
    }

    /// Derive byte order and address width from a parsed object file
    pub fn from_object(obj: &object::File<'_>) -> Result<Self, PlatformError> {
        if obj.kind() == ObjectKind::Unknown {
            return Err(PlatformError::UnsupportedObjectKind(format!(
                "{:?}",
                obj.kind()
            )));
        }
        let byte_order = if obj.is_little_endian() {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        let address_size = if obj.is_64() { 8 } else { 4 };
        Self::new(byte_order, address_size)
    }
}
