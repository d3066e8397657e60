//! Error types for process access

/// Error types for process access
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object file error: {0}")]
    Object(#[from] object::Error),
    #[error("Process not found: {pid}")]
    ProcessNotFound { pid: u32 },
    #[error("Short read at 0x{address:x}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        address: u64,
        wanted: usize,
        got: usize,
    },
    #[error("Address range 0x{address:x}+{size} is not mapped")]
    Unmapped { address: u64, size: usize },
    #[error("Region 0x{base:x}+{size} overlaps an existing region")]
    RegionOverlap { base: u64, size: usize },
    #[error("Unknown DWARF register {0}")]
    UnknownRegister(u16),
    #[error("Register snapshot too small: {got} bytes, need {need}")]
    TruncatedRegisters { got: usize, need: usize },
}

/// Result type used throughout the crate
pub type Result<T> = anyhow::Result<T>;
