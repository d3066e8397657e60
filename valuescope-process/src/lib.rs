//! Process-side collaborators of the value core
//!
//! Everything here talks to the world outside the value core: the loaded-image
//! map used to relocate file addresses, memory readers, and register snapshots.

pub mod errors;
pub mod image_map;
pub mod memory;
pub mod proc_mapping;
pub mod registers;

pub use errors::{ProcessError, Result};
pub use image_map::{ImageMap, LoadedImage, ModuleAddress, SegmentBias};
pub use memory::{MemoryAccess, ProcessMemory, RegionMemory};
pub use proc_mapping::{MemoryMapping, ProcMappingParser};
pub use registers::{PtRegsContext, RegisterContext};
