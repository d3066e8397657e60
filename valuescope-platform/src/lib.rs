/// Platform-specific utilities for the valuescope value core
///
/// This crate provides platform-specific abstractions for:
/// - Target byte order and address width used when materializing value bytes
/// - Register mappings between DWARF register numbers, names and pt_regs layout
pub mod register_mapping;
pub mod types;

// Re-export key types for convenience
pub use register_mapping::{
    dwarf_reg_to_name, dwarf_reg_to_name_x86_64, dwarf_reg_to_pt_regs_byte_offset,
    dwarf_reg_to_pt_regs_byte_offset_x86_64, pt_regs_indices, PT_REGS_SIZE_X86_64,
};
pub use types::{ByteOrder, PlatformError, TargetArch};
