//! Execution context handed to every recompute
//!
//! The context is shared read-only for the duration of one recompute. Cache
//! invalidation is driven by its [`StopId`]: a value recomputes lazily when the
//! epoch it was last computed under differs from the context's.

use std::fmt;
use std::sync::Arc;
use valuescope_platform::TargetArch;
use valuescope_process::{ImageMap, MemoryAccess, RegisterContext};

/// Default upper bound on a single scalar read
pub const DEFAULT_MAX_READ_SIZE: u64 = 1024 * 1024;

/// Stop epoch; bumped every time the inferior stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StopId(u64);

impl StopId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stop#{}", self.0)
    }
}

/// Knobs for value materialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueOptions {
    /// Scalar reads above this many bytes fail instead of reading
    pub max_read_size: u64,
}

impl Default for ValueOptions {
    fn default() -> Self {
        Self {
            max_read_size: DEFAULT_MAX_READ_SIZE,
        }
    }
}

/// A live process: where its images are mapped and how to read its memory
#[derive(Clone)]
pub struct ProcessContext {
    pub images: Arc<ImageMap>,
    pub memory: Arc<dyn MemoryAccess>,
}

impl ProcessContext {
    pub fn new(images: Arc<ImageMap>, memory: Arc<dyn MemoryAccess>) -> Self {
        Self { images, memory }
    }
}

impl fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("images", &self.images.len())
            .field("memory", &self.memory.describe())
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct ExecutionContext {
    pub stop_id: StopId,
    /// Target byte order and address width, when known
    pub target: Option<TargetArch>,
    pub process: Option<ProcessContext>,
    /// Debugger scratch memory backing host addresses
    pub host: Option<Arc<dyn MemoryAccess>>,
    pub registers: Option<Arc<dyn RegisterContext>>,
    pub options: ValueOptions,
}

impl ExecutionContext {
    pub fn new(stop_id: StopId) -> Self {
        Self {
            stop_id,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: TargetArch) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_process(mut self, process: ProcessContext) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_host(mut self, host: Arc<dyn MemoryAccess>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_registers(mut self, registers: Arc<dyn RegisterContext>) -> Self {
        self.registers = Some(registers);
        self
    }

    pub fn with_options(mut self, options: ValueOptions) -> Self {
        self.options = options;
        self
    }

    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("stop_id", &self.stop_id)
            .field("target", &self.target)
            .field("process", &self.process)
            .field("host", &self.host.as_ref().map(|h| h.describe()))
            .field("registers", &self.registers.is_some())
            .field("options", &self.options)
            .finish()
    }
}
