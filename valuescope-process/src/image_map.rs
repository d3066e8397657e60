//! Loaded-image map: where each on-disk image landed in a running process
//!
//! File addresses are expressed against an image's link-time layout. Once the
//! image is mapped, every loadable segment is shifted by a bias; the map
//! records those biases and answers `file address -> load address` queries.

use crate::proc_mapping::{MemoryMapping, ProcMappingParser};
use crate::Result;
use object::{Object, ObjectSegment};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PAGE_MASK: u64 = !0xfffu64;

/// Module address pair: an address inside a specific on-disk image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleAddress {
    /// Path to the module/binary file
    pub module_path: PathBuf,
    /// Link-time (file) virtual address within the module
    pub address: u64,
}

impl ModuleAddress {
    pub fn new(module_path: impl Into<PathBuf>, address: u64) -> Self {
        Self {
            module_path: module_path.into(),
            address,
        }
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+0x{:x}", self.module_path.display(), self.address)
    }
}

/// Runtime bias of one loadable segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBias {
    /// Link-time virtual address of the segment
    pub file_vaddr: u64,
    /// Size of the segment in memory
    pub size: u64,
    /// load address = file address + bias (wrapping)
    pub bias: u64,
}

impl SegmentBias {
    pub fn contains(&self, file_address: u64) -> bool {
        file_address >= self.file_vaddr && file_address - self.file_vaddr < self.size
    }
}

/// One image mapped into the process
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    /// Lowest mapped address of the image
    pub base: u64,
    /// Span from `base` to the end of the highest mapping
    pub size: u64,
    pub segments: Vec<SegmentBias>,
    /// Bias applied to every address when no segment table is known
    pub load_bias: Option<u64>,
}

impl LoadedImage {
    /// Image relocated as a whole: every file address shifts by `bias`
    pub fn with_load_bias(path: impl Into<PathBuf>, bias: u64) -> Self {
        Self {
            path: path.into(),
            base: bias,
            size: 0,
            segments: Vec::new(),
            load_bias: Some(bias),
        }
    }

    /// Image with an explicit per-segment bias table
    pub fn with_segments(path: impl Into<PathBuf>, segments: Vec<SegmentBias>) -> Self {
        let base = segments
            .iter()
            .map(|s| s.file_vaddr.wrapping_add(s.bias))
            .min()
            .unwrap_or(0);
        let end = segments
            .iter()
            .map(|s| s.file_vaddr.wrapping_add(s.bias).saturating_add(s.size))
            .max()
            .unwrap_or(base);
        Self {
            path: path.into(),
            base,
            size: end.saturating_sub(base),
            segments,
            load_bias: None,
        }
    }

    /// Relocate a file address, or `None` if no segment covers it
    pub fn relocate(&self, file_address: u64) -> Option<u64> {
        if let Some(segment) = self.segments.iter().find(|s| s.contains(file_address)) {
            return Some(file_address.wrapping_add(segment.bias));
        }
        self.load_bias
            .map(|bias| file_address.wrapping_add(bias))
    }

    /// Build the segment table for `path` from its process mappings
    fn from_mappings(path: &Path, mappings: &[MemoryMapping]) -> Result<Self> {
        let data = fs::read(path)?;
        let obj = object::File::parse(&data[..])?;

        let mut segments = Vec::new();
        for seg in obj.segments() {
            let (file_off, _file_size) = seg.file_range();
            let key = file_off & PAGE_MASK;
            let Some(mapping) = mappings
                .iter()
                .find(|m| (m.file_offset & PAGE_MASK) == key)
            else {
                continue;
            };
            // The mapping starts at the page containing the segment's file offset
            let runtime = mapping.start_addr.wrapping_add(file_off - key);
            segments.push(SegmentBias {
                file_vaddr: seg.address(),
                size: seg.size(),
                bias: runtime.wrapping_sub(seg.address()),
            });
        }

        let base = mappings.iter().map(|m| m.start_addr).min().unwrap_or(0);
        let end = mappings.iter().map(|m| m.end_addr).max().unwrap_or(base);
        debug!(
            "Image {} base=0x{:x} size=0x{:x} segments={}",
            path.display(),
            base,
            end - base,
            segments.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            base,
            size: end.saturating_sub(base),
            segments,
            load_bias: None,
        })
    }
}

/// All images known to be loaded in one process
#[derive(Debug, Clone, Default)]
pub struct ImageMap {
    images: Vec<LoadedImage>,
}

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, replacing any earlier entry for the same path
    pub fn add(&mut self, image: LoadedImage) {
        self.images.retain(|existing| existing.path != image.path);
        self.images.push(image);
    }

    pub fn with_image(mut self, image: LoadedImage) -> Self {
        self.add(image);
        self
    }

    pub fn find(&self, path: &Path) -> Option<&LoadedImage> {
        self.images.iter().find(|image| image.path == path)
    }

    pub fn images(&self) -> &[LoadedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Load address for a module address, `None` if the image is not mapped
    /// or no loadable segment covers the address
    pub fn resolve(&self, address: &ModuleAddress) -> Option<u64> {
        self.find(&address.module_path)?.relocate(address.address)
    }

    /// Build the map for a live process from `/proc/PID/maps` and the ELF
    /// program headers of every file-backed mapping
    pub fn from_pid(pid: u32) -> Result<Self> {
        info!("Building image map for PID {}", pid);
        let mappings = ProcMappingParser::parse_proc_maps(pid)?;
        let mut map = ImageMap::new();
        for (path, file_mappings) in ProcMappingParser::group_by_file(&mappings) {
            match LoadedImage::from_mappings(&path, &file_mappings) {
                Ok(image) => map.add(image),
                Err(e) => debug!("Skipping image {}: {}", path.display(), e),
            }
        }
        info!("Image map for PID {} has {} images", pid, map.len());
        Ok(map)
    }
}
