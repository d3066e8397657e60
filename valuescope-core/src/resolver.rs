//! Address resolver: file address -> load address
//!
//! Pure function of the address and the process' image map. Nothing is cached
//! here; caching is the value object's job.

use crate::address::Address;
use crate::context::ProcessContext;
use crate::errors::{Result, ValueError};
use tracing::trace;

/// Outcome of a resolution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Loaded(u64),
    /// Expected outcome, not a failure: no process, or the image is not mapped
    NotAvailable,
}

pub fn resolve(address: &Address, process: Option<&ProcessContext>) -> Result<Resolution> {
    let module_address = match address {
        Address::Invalid => {
            return Err(ValueError::MalformedLocation(
                "cannot resolve an invalid address".to_string(),
            ))
        }
        Address::Raw(_) => return Ok(Resolution::NotAvailable),
        Address::Module(module_address) => module_address,
    };
    let Some(process) = process else {
        return Ok(Resolution::NotAvailable);
    };

    match process.images.resolve(module_address) {
        Some(load_address) => {
            trace!("Resolved {} to 0x{:x}", module_address, load_address);
            Ok(Resolution::Loaded(load_address))
        }
        None => {
            trace!("{} is not mapped", module_address);
            Ok(Resolution::NotAvailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use valuescope_process::{ImageMap, LoadedImage, RegionMemory};

    fn process_with(image: LoadedImage) -> ProcessContext {
        ProcessContext::new(
            Arc::new(ImageMap::new().with_image(image)),
            Arc::new(RegionMemory::new("target")),
        )
    }

    #[test]
    fn test_no_process_is_not_available() {
        let address = Address::module("/bin/demo", 0x1000);
        assert_eq!(resolve(&address, None), Ok(Resolution::NotAvailable));
    }

    #[test]
    fn test_module_address_relocates() {
        let process = process_with(LoadedImage::with_load_bias("/bin/demo", 0x5555_0000_0000));
        let address = Address::module("/bin/demo", 0x1000);
        assert_eq!(
            resolve(&address, Some(&process)),
            Ok(Resolution::Loaded(0x5555_0000_1000))
        );
    }

    #[test]
    fn test_unmapped_image_and_raw_are_not_available() {
        let process = process_with(LoadedImage::with_load_bias("/bin/demo", 0x5555_0000_0000));
        let other = Address::module("/lib/other.so", 0x1000);
        assert_eq!(resolve(&other, Some(&process)), Ok(Resolution::NotAvailable));
        assert_eq!(
            resolve(&Address::Raw(0x1000), Some(&process)),
            Ok(Resolution::NotAvailable)
        );
    }

    #[test]
    fn test_invalid_address_is_malformed() {
        assert!(matches!(
            resolve(&Address::Invalid, None),
            Err(ValueError::MalformedLocation(_))
        ));
    }

    #[test]
    fn test_resolution_is_pure() {
        let process = process_with(LoadedImage::with_load_bias("/bin/demo", 0x1000));
        let address = Address::module("/bin/demo", 0x10);
        let first = resolve(&address, Some(&process));
        let second = resolve(&address, Some(&process));
        assert_eq!(first, second);
    }
}
