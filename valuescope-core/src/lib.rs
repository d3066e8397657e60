//! Value representation core
//!
//! Turns "a value that lives somewhere in a program image" into a typed,
//! byte-accurate snapshot and keeps it current across debugger stops.
//!
//! - [`ValueLocation`]: the four-state location machine
//! - [`resolver`]: file address to load address resolution
//! - [`materializer`]: bytes for a location, honoring target layout
//! - [`change`]: change detection between recomputes
//! - [`ValueObject`]: the cached value with lazy recompute and children

pub mod address;
pub mod change;
pub mod context;
pub mod errors;
pub mod location;
pub mod materializer;
pub mod resolver;
pub mod source;
pub mod value_object;

pub use address::Address;
pub use change::ValueSnapshot;
pub use context::{ExecutionContext, ProcessContext, StopId, ValueOptions, DEFAULT_MAX_READ_SIZE};
pub use errors::{Result, ValueError};
pub use location::{LocationKind, ValueLocation};
pub use materializer::{DeferReason, Materialized, ValueData};
pub use resolver::Resolution;
pub use source::{ParentBase, ValueKind, ValueSource};
pub use value_object::{DataState, ValueObject};
