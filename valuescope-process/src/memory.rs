//! Memory access providers
//!
//! The value core reads target bytes only through [`MemoryAccess`]. Errors are
//! opaque to the core: whatever a provider reports is carried through as text.

use crate::{ProcessError, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::sync::RwLock;
use tracing::{debug, trace};

/// Byte-level read access to some address space
pub trait MemoryAccess: Send + Sync {
    /// Read exactly `size` bytes at `address`. Never returns a short buffer.
    fn read(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Short human-readable name used in logs
    fn describe(&self) -> String;
}

/// Reader for a live process' address space
#[derive(Debug, Clone)]
pub struct ProcessMemory {
    pid: u32,
    use_process_vm_readv: bool,
}

impl ProcessMemory {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            use_process_vm_readv: true,
        }
    }

    /// Toggle the `process_vm_readv(2)` fast path; `/proc/PID/mem` is always
    /// the fallback
    pub fn with_process_vm_readv(mut self, enabled: bool) -> Self {
        self.use_process_vm_readv = enabled;
        self
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn read_vm(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr() as *mut libc::c_void,
            iov_len: size,
        };
        let remote = libc::iovec {
            iov_base: address as usize as *mut libc::c_void,
            iov_len: size,
        };
        // SAFETY: `local` points at `buffer`, which is valid for `size` bytes
        // and outlives the call; the remote iovec is only interpreted by the kernel.
        let read = unsafe {
            libc::process_vm_readv(self.pid as libc::pid_t, &local, 1, &remote, 1, 0)
        };
        if read < 0 {
            return Err(io::Error::last_os_error().into());
        }
        let read = read as usize;
        if read != size {
            return Err(ProcessError::ShortRead {
                address,
                wanted: size,
                got: read,
            }
            .into());
        }
        Ok(buffer)
    }

    fn read_proc_mem(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let file = File::open(format!("/proc/{}/mem", self.pid))
            .map_err(|_e| ProcessError::ProcessNotFound { pid: self.pid })?;
        let mut buffer = vec![0u8; size];
        let mut filled = 0usize;
        while filled < size {
            match file.read_at(&mut buffer[filled..], address + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if filled == 0 => return Err(e.into()),
                Err(_) => break,
            }
        }
        if filled != size {
            return Err(ProcessError::ShortRead {
                address,
                wanted: size,
                got: filled,
            }
            .into());
        }
        Ok(buffer)
    }
}

impl MemoryAccess for ProcessMemory {
    fn read(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        if self.use_process_vm_readv {
            match self.read_vm(address, size) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => debug!(
                    "process_vm_readv failed for pid {} at 0x{:x}: {}, trying /proc/{}/mem",
                    self.pid, address, e, self.pid
                ),
            }
        }
        self.read_proc_mem(address, size)
    }

    fn describe(&self) -> String {
        format!("pid {}", self.pid)
    }
}

#[derive(Debug, Default)]
struct Regions {
    by_base: BTreeMap<u64, Vec<u8>>,
    next_alloc: u64,
}

impl Regions {
    fn containing(&self, address: u64, size: usize) -> Option<(u64, &Vec<u8>)> {
        let (base, bytes) = self.by_base.range(..=address).next_back()?;
        let start = (address - base) as usize;
        let end = start.checked_add(size)?;
        (end <= bytes.len()).then_some((*base, bytes))
    }

    fn overlaps(&self, base: u64, size: usize) -> bool {
        let end = base.saturating_add(size.max(1) as u64);
        self.by_base.iter().any(|(other, bytes)| {
            let other_end = other.saturating_add(bytes.len().max(1) as u64);
            base < other_end && *other < end
        })
    }
}

/// In-memory address space made of non-overlapping byte regions
///
/// Stands in for a target in tests and backs the session's host scratch
/// arena, where synthesized values live.
#[derive(Debug, Default)]
pub struct RegionMemory {
    name: String,
    regions: RwLock<Regions>,
}

impl RegionMemory {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_alloc_base(name, 0)
    }

    /// Arena whose first `allocate` lands at `base` (rounded up to 16)
    pub fn with_alloc_base(name: impl Into<String>, base: u64) -> Self {
        Self {
            name: name.into(),
            regions: RwLock::new(Regions {
                by_base: BTreeMap::new(),
                next_alloc: base,
            }),
        }
    }

    fn regions(&self) -> std::sync::RwLockReadGuard<'_, Regions> {
        match self.regions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn regions_mut(&self) -> std::sync::RwLockWriteGuard<'_, Regions> {
        match self.regions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Map `bytes` at `base`
    pub fn add_region(&self, base: u64, bytes: Vec<u8>) -> Result<()> {
        let mut regions = self.regions_mut();
        if regions.overlaps(base, bytes.len()) {
            return Err(ProcessError::RegionOverlap {
                base,
                size: bytes.len(),
            }
            .into());
        }
        trace!("{}: mapped 0x{:x}+{}", self.name, base, bytes.len());
        regions.by_base.insert(base, bytes);
        Ok(())
    }

    /// Unmap the region starting at `base`, returning its bytes
    pub fn remove_region(&self, base: u64) -> Option<Vec<u8>> {
        self.regions_mut().by_base.remove(&base)
    }

    /// Overwrite bytes inside an existing region
    pub fn write(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut regions = self.regions_mut();
        let base = match regions.containing(address, bytes.len()) {
            Some((base, _)) => base,
            None => {
                return Err(ProcessError::Unmapped {
                    address,
                    size: bytes.len(),
                }
                .into())
            }
        };
        if let Some(region) = regions.by_base.get_mut(&base) {
            let start = (address - base) as usize;
            region[start..start + bytes.len()].copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Copy `bytes` into a fresh 16-byte aligned region and return its address
    pub fn allocate(&self, bytes: &[u8]) -> u64 {
        let mut regions = self.regions_mut();
        let highest_end = regions
            .by_base
            .iter()
            .next_back()
            .map(|(base, data)| base.saturating_add(data.len().max(1) as u64))
            .unwrap_or(0);
        let address = align_up(regions.next_alloc.max(highest_end), 16);
        regions.by_base.insert(address, bytes.to_vec());
        regions.next_alloc = address.saturating_add(bytes.len().max(1) as u64);
        trace!("{}: allocated 0x{:x}+{}", self.name, address, bytes.len());
        address
    }

    pub fn region_count(&self) -> usize {
        self.regions().by_base.len()
    }
}

impl MemoryAccess for RegionMemory {
    fn read(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let regions = self.regions();
        match regions.containing(address, size) {
            Some((base, bytes)) => {
                let start = (address - base) as usize;
                Ok(bytes[start..start + size].to_vec())
            }
            None => Err(ProcessError::Unmapped { address, size }.into()),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align).saturating_mul(align)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_reads_must_be_contained() {
        let memory = RegionMemory::new("test");
        memory.add_region(0x1000, vec![1, 2, 3, 4]).unwrap();

        assert_eq!(memory.read(0x1001, 2).unwrap(), vec![2, 3]);
        assert_eq!(memory.read(0x1000, 4).unwrap(), vec![1, 2, 3, 4]);
        assert!(memory.read(0x1002, 4).is_err());
        assert!(memory.read(0x0fff, 1).is_err());

        let err = memory.read(0x2000, 4).unwrap_err();
        assert!(err.to_string().contains("0x2000"));
    }

    #[test]
    fn test_region_overlap_rejected() {
        let memory = RegionMemory::new("test");
        memory.add_region(0x1000, vec![0; 16]).unwrap();
        assert!(memory.add_region(0x1008, vec![0; 4]).is_err());
        assert!(memory.add_region(0x0ff8, vec![0; 9]).is_err());
        memory.add_region(0x1010, vec![0; 4]).unwrap();
        assert_eq!(memory.region_count(), 2);
    }

    #[test]
    fn test_write_and_remove() {
        let memory = RegionMemory::new("test");
        memory.add_region(0x1000, vec![0; 8]).unwrap();
        memory.write(0x1004, &[0xaa, 0xbb]).unwrap();
        assert_eq!(memory.read(0x1004, 2).unwrap(), vec![0xaa, 0xbb]);
        assert!(memory.write(0x1007, &[1, 2]).is_err());

        assert_eq!(memory.remove_region(0x1000).map(|b| b.len()), Some(8));
        assert!(memory.read(0x1000, 1).is_err());
    }

    #[test]
    fn test_allocate_is_aligned_and_disjoint() {
        let arena = RegionMemory::with_alloc_base("host", 0x1001);
        let a = arena.allocate(&[1, 2, 3]);
        let b = arena.allocate(&[4; 20]);
        let c = arena.allocate(&[]);
        let d = arena.allocate(&[9]);
        assert_eq!(a, 0x1010);
        assert_eq!(b, 0x1020);
        assert_eq!(c, 0x1040);
        assert_eq!(d, 0x1050);
        assert_eq!(arena.read(b, 20).unwrap(), vec![4; 20]);
        assert_eq!(arena.read(c, 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_process_memory_reads_own_address_space() {
        let value: u64 = 0x1122_3344_5566_7788;
        let address = &value as *const u64 as u64;

        for use_vm in [true, false] {
            let memory = ProcessMemory::new(std::process::id()).with_process_vm_readv(use_vm);
            let bytes = memory.read(address, 8).unwrap();
            assert_eq!(bytes, value.to_ne_bytes().to_vec());
        }
    }

    #[test]
    fn test_process_memory_unmapped_is_error() {
        let memory = ProcessMemory::new(std::process::id());
        assert!(memory.read(0, 8).is_err());
        assert!(memory.read(0x10, 0).unwrap().is_empty());
    }
}
