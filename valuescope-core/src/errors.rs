//! Error types for the value core

/// Why a value could not be computed
///
/// Everything except [`ValueError::Internal`] is an expected runtime outcome:
/// it is stored on the value object and reported through its validity flag.
/// `Internal` means a core invariant was broken and is surfaced to the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("failed to read {size} bytes at 0x{address:x}: {reason}")]
    ReadFailed {
        address: u64,
        size: usize,
        reason: String,
    },
    #[error("no process to read load address 0x{address:x} from")]
    NoProcess { address: u64 },
    #[error("no host memory to read host address 0x{address:x} from")]
    NoHostMemory { address: u64 },
    #[error("register {register} unavailable: {reason}")]
    RegisterUnavailable { register: String, reason: String },
    #[error("read of {size} bytes exceeds the {limit} byte limit")]
    ReadTooLarge { size: u64, limit: u64 },
    #[error("parent value unavailable: {0}")]
    ParentUnavailable(String),
    #[error("malformed location: {0}")]
    MalformedLocation(String),
    #[error("internal consistency failure: {0}")]
    Internal(String),
}

impl ValueError {
    /// Broken invariant rather than an unreadable value
    pub fn is_internal(&self) -> bool {
        matches!(self, ValueError::Internal(_))
    }
}

/// Result type used throughout the value core
pub type Result<T> = std::result::Result<T, ValueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_internal_is_internal() {
        assert!(ValueError::Internal("x".into()).is_internal());
        assert!(!ValueError::NoProcess { address: 0x10 }.is_internal());
        assert!(!ValueError::MalformedLocation("x".into()).is_internal());
    }

    #[test]
    fn test_read_failed_carries_reason_verbatim() {
        let err = ValueError::ReadFailed {
            address: 0x1000,
            size: 4,
            reason: "Input/output error (os error 5)".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read 4 bytes at 0x1000: Input/output error (os error 5)"
        );
    }
}
