//! Byte materializer
//!
//! Turns a location into the bytes of a value. Scalars are encoded directly,
//! aggregates are never read (their value is their address), everything else
//! is read in full through the matching memory provider or not at all.

use crate::context::ExecutionContext;
use crate::errors::{Result, ValueError};
use crate::location::ValueLocation;
use std::fmt;
use tracing::{debug, trace};
use valuescope_platform::{ByteOrder, TargetArch};
use valuescope_process::MemoryAccess;
use valuescope_types::TypeDescriptor;

/// Cached raw bytes of a value, tagged with the layout they were produced under
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueData {
    bytes: Vec<u8>,
    byte_order: ByteOrder,
    address_size: u8,
}

impl ValueData {
    pub fn new(bytes: Vec<u8>, arch: TargetArch) -> Self {
        Self {
            bytes,
            byte_order: arch.byte_order,
            address_size: arch.address_size,
        }
    }

    pub fn empty(arch: TargetArch) -> Self {
        Self::new(Vec::new(), arch)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// Unsigned value of a 1, 2, 4 or 8 byte buffer
    pub fn as_unsigned(&self) -> Option<u64> {
        match self.bytes.len() {
            1 | 2 | 4 | 8 => self.byte_order.decode(&self.bytes),
            _ => None,
        }
    }

    /// Sign-extended value of a 1, 2, 4 or 8 byte buffer
    pub fn as_signed(&self) -> Option<i64> {
        let value = self.as_unsigned()?;
        let shift = 64 - self.bytes.len() as u32 * 8;
        Some(((value << shift) as i64) >> shift)
    }

    /// Unsigned value of `len` bytes starting at `offset`, at most 8 of them
    pub(crate) fn decode_range(&self, offset: usize, len: usize) -> Option<u64> {
        let end = offset.checked_add(len)?;
        let slice = self.bytes.get(offset..end)?;
        if slice.is_empty() {
            return Some(0);
        }
        let window = match self.byte_order {
            ByteOrder::Little => &slice[..slice.len().min(8)],
            ByteOrder::Big => &slice[slice.len().saturating_sub(8)..],
        };
        self.byte_order.decode(window)
    }
}

impl fmt::Display for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Why an address-backed scalar was not read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// No process is attached; a file address cannot be read yet
    NoProcess,
    /// A process is attached but the image is not mapped into it
    ImageNotLoaded,
}

/// What the materializer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    Bytes(ValueData),
    /// Aggregate: only the location is meaningful
    AddressOnly,
    Deferred(DeferReason),
}

/// Produce the bytes for a value of type `type_desc` living at `location`
pub fn extract(
    location: &ValueLocation,
    type_desc: &dyn TypeDescriptor,
    arch: TargetArch,
    ctx: &ExecutionContext,
) -> Result<Materialized> {
    let address = match *location {
        ValueLocation::Scalar(value) => {
            let size = match type_desc.byte_size() {
                0 => arch.address_size as u64,
                size => size,
            };
            check_size(size, ctx)?;
            trace!("Encoding scalar {:#x} as {} bytes", value, size);
            let bytes = arch.byte_order.encode(value, size as usize);
            return Ok(Materialized::Bytes(ValueData::new(bytes, arch)));
        }
        ValueLocation::FileAddress(address)
        | ValueLocation::LoadAddress(address)
        | ValueLocation::HostAddress(address) => address,
    };

    if type_desc.is_aggregate() {
        return Ok(Materialized::AddressOnly);
    }

    let size = type_desc.byte_size();
    let memory: &dyn MemoryAccess = match location {
        ValueLocation::FileAddress(_) => {
            let reason = if ctx.has_process() {
                DeferReason::ImageNotLoaded
            } else {
                DeferReason::NoProcess
            };
            trace!("Not reading file address 0x{:x}: {:?}", address, reason);
            return Ok(Materialized::Deferred(reason));
        }
        ValueLocation::LoadAddress(_) => match &ctx.process {
            Some(process) => process.memory.as_ref(),
            None => return Err(ValueError::NoProcess { address }),
        },
        ValueLocation::HostAddress(_) => match &ctx.host {
            Some(host) => host.as_ref(),
            None => return Err(ValueError::NoHostMemory { address }),
        },
        ValueLocation::Scalar(_) => {
            return Err(ValueError::Internal(
                "scalar location reached the memory read path".to_string(),
            ))
        }
    };

    check_size(size, ctx)?;
    let size = size as usize;
    let bytes = memory
        .read(address, size)
        .map_err(|e| ValueError::ReadFailed {
            address,
            size,
            reason: format!("{e:#}"),
        })?;
    if bytes.len() != size {
        debug!(
            "{} returned {} bytes for a {} byte read at 0x{:x}",
            memory.describe(),
            bytes.len(),
            size,
            address
        );
        return Err(ValueError::ReadFailed {
            address,
            size,
            reason: format!("short read: got {} bytes", bytes.len()),
        });
    }
    trace!("Read {} bytes at 0x{:x} from {}", size, address, memory.describe());
    Ok(Materialized::Bytes(ValueData::new(bytes, arch)))
}

fn check_size(size: u64, ctx: &ExecutionContext) -> Result<()> {
    let limit = ctx.options.max_read_size;
    if size > limit {
        return Err(ValueError::ReadTooLarge { size, limit });
    }
    Ok(())
}
