//! valuescope: the value-representation core of a debugger
//!
//! This crate ties the pieces together: a [`ValueSession`] owning the type
//! system, stop epoch and process attachment, plus configuration and logging.

pub mod config;
pub mod logging;
pub mod session;

pub use config::{Config, LogLevel};
pub use session::ValueSession;

pub use valuescope_core::{
    Address, DataState, DeferReason, ExecutionContext, LocationKind, StopId, ValueData,
    ValueError, ValueKind, ValueLocation, ValueObject,
};
pub use valuescope_platform::{ByteOrder, TargetArch};
pub use valuescope_process::{
    ImageMap, LoadedImage, MemoryAccess, ModuleAddress, ProcessMemory, PtRegsContext,
    RegionMemory, RegisterContext, SegmentBias,
};
pub use valuescope_types::{StructMember, TypeDescriptor, TypeHandle, TypeInfo, TypeSystem};
