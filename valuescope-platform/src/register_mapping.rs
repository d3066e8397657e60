/// Platform-specific register mappings used by register-backed values
///
/// This module handles the mapping between DWARF register numbers and platform-specific
/// register layouts (like pt_regs) for different architectures.
use tracing::warn;

/// pt_regs indices for x86_64 architecture
///
/// These indices address the pt_regs structure as a u64 array, matching the
/// kernel layout in arch/x86/include/asm/ptrace.h.
pub mod pt_regs_indices {
    pub const R15: usize = 0;
    pub const R14: usize = 1;
    pub const R13: usize = 2;
    pub const R12: usize = 3;
    pub const RBP: usize = 4; // Frame pointer
    pub const RBX: usize = 5;
    pub const R11: usize = 6;
    pub const R10: usize = 7;
    pub const R9: usize = 8;
    pub const R8: usize = 9;
    pub const RAX: usize = 10; // Return value
    pub const RCX: usize = 11; // 4th argument
    pub const RDX: usize = 12; // 3rd argument
    pub const RSI: usize = 13; // 2nd argument
    pub const RDI: usize = 14; // 1st argument

    // Special registers
    pub const ORIG_RAX: usize = 15; // Original syscall number
    pub const RIP: usize = 16; // Instruction pointer
    pub const CS: usize = 17; // Code segment
    pub const EFLAGS: usize = 18; // Flags register
    pub const RSP: usize = 19; // Stack pointer
    pub const SS: usize = 20; // Stack segment
}

/// Size in bytes of the x86_64 pt_regs structure
pub const PT_REGS_SIZE_X86_64: usize = (pt_regs_indices::SS + 1) * core::mem::size_of::<u64>();

/// Convert DWARF register number to pt_regs byte offset for x86_64
///
/// pt_regs structure layout on x86_64:
/// ```c
/// struct pt_regs {
///     unsigned long r15;    // offset 0
///     unsigned long r14;    // offset 8
///     unsigned long r13;    // offset 16
///     unsigned long r12;    // offset 24
///     unsigned long bp;     // offset 32  (RBP)
///     unsigned long bx;     // offset 40  (RBX)
///     unsigned long r11;    // offset 48
///     unsigned long r10;    // offset 56
///     unsigned long r9;     // offset 64
///     unsigned long r8;     // offset 72
///     unsigned long ax;     // offset 80  (RAX)
///     unsigned long cx;     // offset 88  (RCX)
///     unsigned long dx;     // offset 96  (RDX)
///     unsigned long si;     // offset 104 (RSI)
///     unsigned long di;     // offset 112 (RDI)
///     unsigned long orig_ax;// offset 120
///     unsigned long ip;     // offset 128 (RIP)
///     unsigned long cs;     // offset 136
///     unsigned long flags;  // offset 144
///     unsigned long sp;     // offset 152 (RSP)
///     unsigned long ss;     // offset 160
/// };
/// ```
pub fn dwarf_reg_to_pt_regs_byte_offset_x86_64(dwarf_reg: u16) -> Option<usize> {
    const U64_SIZE: usize = core::mem::size_of::<u64>();
    let index = match dwarf_reg {
        0 => pt_regs_indices::RAX,
        1 => pt_regs_indices::RDX,
        2 => pt_regs_indices::RCX,
        3 => pt_regs_indices::RBX,
        4 => pt_regs_indices::RSI,
        5 => pt_regs_indices::RDI,
        6 => pt_regs_indices::RBP,
        7 => pt_regs_indices::RSP,
        8 => pt_regs_indices::R8,
        9 => pt_regs_indices::R9,
        10 => pt_regs_indices::R10,
        11 => pt_regs_indices::R11,
        12 => pt_regs_indices::R12,
        13 => pt_regs_indices::R13,
        14 => pt_regs_indices::R14,
        15 => pt_regs_indices::R15,
        16 => pt_regs_indices::RIP,
        _ => {
            warn!("Unknown DWARF register {} for x86_64", dwarf_reg);
            return None;
        }
    };
    Some(index * U64_SIZE)
}

/// Convert DWARF register number to register name for x86_64
pub fn dwarf_reg_to_name_x86_64(dwarf_reg: u16) -> Option<&'static str> {
    match dwarf_reg {
        0 => Some("RAX"),
        1 => Some("RDX"),
        2 => Some("RCX"),
        3 => Some("RBX"),
        4 => Some("RSI"),
        5 => Some("RDI"),
        6 => Some("RBP"),
        7 => Some("RSP"),
        8 => Some("R8"),
        9 => Some("R9"),
        10 => Some("R10"),
        11 => Some("R11"),
        12 => Some("R12"),
        13 => Some("R13"),
        14 => Some("R14"),
        15 => Some("R15"),
        16 => Some("RIP"),
        _ => None,
    }
}

/// Convert DWARF register number to register name
///
/// Currently only supports x86_64.
pub fn dwarf_reg_to_name(dwarf_reg: u16) -> Option<&'static str> {
    dwarf_reg_to_name_x86_64(dwarf_reg)
}

/// Convert DWARF register number to pt_regs byte offset
///
/// Currently only supports x86_64.
pub fn dwarf_reg_to_pt_regs_byte_offset(dwarf_reg: u16) -> Option<usize> {
    dwarf_reg_to_pt_regs_byte_offset_x86_64(dwarf_reg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x86_64_dwarf_to_pt_regs_mapping() {
        // Test key registers
        assert_eq!(dwarf_reg_to_pt_regs_byte_offset_x86_64(0), Some(80)); // RAX
        assert_eq!(dwarf_reg_to_pt_regs_byte_offset_x86_64(6), Some(32)); // RBP
        assert_eq!(dwarf_reg_to_pt_regs_byte_offset_x86_64(7), Some(152)); // RSP
        assert_eq!(dwarf_reg_to_pt_regs_byte_offset_x86_64(16), Some(128)); // RIP

        // Test invalid register
        assert_eq!(dwarf_reg_to_pt_regs_byte_offset_x86_64(99), None);
    }

    #[test]
    fn test_x86_64_dwarf_to_name_mapping() {
        assert_eq!(dwarf_reg_to_name_x86_64(0), Some("RAX"));
        assert_eq!(dwarf_reg_to_name_x86_64(5), Some("RDI"));
        assert_eq!(dwarf_reg_to_name_x86_64(7), Some("RSP"));
        assert_eq!(dwarf_reg_to_name_x86_64(13), Some("R13"));
        assert_eq!(dwarf_reg_to_name_x86_64(16), Some("RIP"));
        assert_eq!(dwarf_reg_to_name_x86_64(99), None);
    }

    #[test]
    fn test_pt_regs_size_covers_all_mapped_registers() {
        for reg in 0..=16u16 {
            let offset = dwarf_reg_to_pt_regs_byte_offset(reg).unwrap();
            assert!(offset + 8 <= PT_REGS_SIZE_X86_64, "register {reg} out of range");
        }
        assert_eq!(PT_REGS_SIZE_X86_64, 168);
    }
}
