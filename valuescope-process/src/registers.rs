//! Register access for register-backed values

use crate::{ProcessError, Result};
use valuescope_platform::{dwarf_reg_to_pt_regs_byte_offset, ByteOrder, PT_REGS_SIZE_X86_64};

/// Source of register values for the current stop
pub trait RegisterContext: Send + Sync {
    /// Value of the register with DWARF number `dwarf_reg`
    fn read_register(&self, dwarf_reg: u16) -> Result<u64>;
}

/// Register snapshot laid out as an x86_64 `struct pt_regs`
#[derive(Debug, Clone)]
pub struct PtRegsContext {
    bytes: Vec<u8>,
}

impl Default for PtRegsContext {
    fn default() -> Self {
        Self {
            bytes: vec![0; PT_REGS_SIZE_X86_64],
        }
    }
}

impl PtRegsContext {
    /// Wrap a raw `pt_regs` dump
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PT_REGS_SIZE_X86_64 {
            return Err(ProcessError::TruncatedRegisters {
                got: bytes.len(),
                need: PT_REGS_SIZE_X86_64,
            }
            .into());
        }
        Ok(Self {
            bytes: bytes[..PT_REGS_SIZE_X86_64].to_vec(),
        })
    }

    /// Store `value` into the slot for `dwarf_reg`
    pub fn set(&mut self, dwarf_reg: u16, value: u64) -> Result<()> {
        let offset = dwarf_reg_to_pt_regs_byte_offset(dwarf_reg)
            .ok_or(ProcessError::UnknownRegister(dwarf_reg))?;
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn with_register(mut self, dwarf_reg: u16, value: u64) -> Result<Self> {
        self.set(dwarf_reg, value)?;
        Ok(self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl RegisterContext for PtRegsContext {
    fn read_register(&self, dwarf_reg: u16) -> Result<u64> {
        let offset = dwarf_reg_to_pt_regs_byte_offset(dwarf_reg)
            .ok_or(ProcessError::UnknownRegister(dwarf_reg))?;
        ByteOrder::Little
            .decode(&self.bytes[offset..offset + 8])
            .ok_or_else(|| ProcessError::UnknownRegister(dwarf_reg).into())
    }
}
