//! Process memory mapping parser
//!
//! Reads `/proc/PID/maps` so the image map can learn where each backing file
//! landed in the process address space.

use crate::{ProcessError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Memory mapping information from /proc/PID/maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMapping {
    pub start_addr: u64,
    pub end_addr: u64,
    pub permissions: String, // r-xp, rw-p etc.
    pub file_offset: u64,
    pub device: String, // major:minor device
    pub inode: u64,
    pub pathname: Option<String>,
}

impl MemoryMapping {
    pub fn size(&self) -> u64 {
        self.end_addr.saturating_sub(self.start_addr)
    }

    /// Mapping is backed by a file on disk (not anonymous, not `[heap]` etc.)
    pub fn is_file_backed(&self) -> bool {
        self.pathname
            .as_deref()
            .is_some_and(|path| path.starts_with('/'))
    }
}

/// Process memory mapping parser
pub struct ProcMappingParser;

impl ProcMappingParser {
    /// Parse /proc/PID/maps
    pub fn parse_proc_maps(pid: u32) -> Result<Vec<MemoryMapping>> {
        let maps_path = format!("/proc/{pid}/maps");
        tracing::debug!("Reading memory mappings from: {}", maps_path);

        let content =
            fs::read_to_string(&maps_path).map_err(|_e| ProcessError::ProcessNotFound { pid })?;
        let mappings = Self::parse_maps_content(&content);
        tracing::debug!("Found {} memory mappings for PID {}", mappings.len(), pid);
        Ok(mappings)
    }

    /// Parse the full text of a maps file, skipping malformed lines
    pub fn parse_maps_content(content: &str) -> Vec<MemoryMapping> {
        content
            .lines()
            .filter_map(|line| {
                let mapping = Self::parse_maps_line(line);
                if mapping.is_none() && !line.trim().is_empty() {
                    tracing::trace!("Skipping unparsable maps line: {}", line);
                }
                mapping
            })
            .collect()
    }

    /// Parse single line from /proc/PID/maps
    /// Format: address perms offset dev inode pathname
    /// Example: 7f8b8c000000-7f8b8c028000 r--p 00000000 08:01 2097153 /lib64/ld-linux-x86-64.so.2
    pub fn parse_maps_line(line: &str) -> Option<MemoryMapping> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            return None;
        }

        let (start, end) = parts[0].split_once('-')?;
        let start_addr = u64::from_str_radix(start, 16).ok()?;
        let end_addr = u64::from_str_radix(end, 16).ok()?;

        let permissions = parts[1].to_string();
        let file_offset = u64::from_str_radix(parts[2], 16).ok()?;
        let device = parts[3].to_string();
        let inode = parts[4].parse().ok()?;

        // Pathnames may contain spaces; unlinked files carry a " (deleted)" suffix
        let pathname = if parts.len() > 5 {
            let joined = parts[5..].join(" ");
            let trimmed = joined
                .strip_suffix(" (deleted)")
                .map(str::to_string)
                .unwrap_or(joined);
            Some(trimmed)
        } else {
            None
        };

        Some(MemoryMapping {
            start_addr,
            end_addr,
            permissions,
            file_offset,
            device,
            inode,
            pathname,
        })
    }

    /// Group file-backed mappings by their backing file
    pub fn group_by_file(mappings: &[MemoryMapping]) -> BTreeMap<PathBuf, Vec<MemoryMapping>> {
        let mut grouped: BTreeMap<PathBuf, Vec<MemoryMapping>> = BTreeMap::new();
        for mapping in mappings.iter().filter(|m| m.is_file_backed()) {
            if let Some(path) = &mapping.pathname {
                grouped
                    .entry(PathBuf::from(path))
                    .or_default()
                    .push(mapping.clone());
            }
        }
        grouped
    }
}
