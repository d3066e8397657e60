//! Change detection between consecutive recomputes
//!
//! The changed flag only feeds UI highlighting; it never influences the value.

use crate::location::ValueLocation;

/// State of a value right after a recompute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSnapshot {
    pub location: ValueLocation,
    pub bytes: Vec<u8>,
    pub valid: bool,
}

/// Aggregates: the location's tag or its numeric value moved
pub fn location_changed(previous: &ValueLocation, current: &ValueLocation) -> bool {
    previous.kind() != current.kind() || previous.value() != current.value()
}

/// Scalars: any byte differs, or validity flipped
pub fn data_changed(previous: &ValueSnapshot, current: &ValueSnapshot) -> bool {
    previous.valid != current.valid || previous.bytes != current.bytes
}

/// Whether `current` should be reported as changed. The very first recompute
/// has nothing to compare against and never reports a change.
pub fn changed(previous: Option<&ValueSnapshot>, current: &ValueSnapshot, aggregate: bool) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    if aggregate {
        location_changed(&previous.location, &current.location)
    } else {
        data_changed(previous, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(location: ValueLocation, bytes: &[u8], valid: bool) -> ValueSnapshot {
        ValueSnapshot {
            location,
            bytes: bytes.to_vec(),
            valid,
        }
    }

    #[test]
    fn test_first_recompute_is_unchanged() {
        let current = snapshot(ValueLocation::LoadAddress(0x10), &[1], true);
        assert!(!changed(None, &current, false));
        assert!(!changed(None, &current, true));
    }

    #[test]
    fn test_aggregate_compares_tag_and_address() {
        let file = snapshot(ValueLocation::FileAddress(0x1000), &[], true);
        let load_same_number = snapshot(ValueLocation::LoadAddress(0x1000), &[], true);
        let load = snapshot(ValueLocation::LoadAddress(0x5555_0000_1000), &[], true);

        assert!(changed(Some(&file), &load_same_number, true));
        assert!(changed(Some(&load_same_number), &load, true));
        assert!(!changed(Some(&load), &load, true));
    }

    #[test]
    fn test_aggregate_ignores_bytes() {
        let a = snapshot(ValueLocation::LoadAddress(0x10), &[1, 2], true);
        let b = snapshot(ValueLocation::LoadAddress(0x10), &[3, 4], true);
        assert!(!changed(Some(&a), &b, true));
    }

    #[test]
    fn test_scalar_compares_bytes_and_validity() {
        let a = snapshot(ValueLocation::LoadAddress(0x10), &[1, 0, 0, 0], true);
        let b = snapshot(ValueLocation::LoadAddress(0x10), &[2, 0, 0, 0], true);
        let a_invalid = snapshot(ValueLocation::LoadAddress(0x10), &[1, 0, 0, 0], false);

        assert!(changed(Some(&a), &b, false));
        assert!(!changed(Some(&a), &a, false));
        assert!(changed(Some(&a), &a_invalid, false));
        assert!(changed(Some(&a_invalid), &a, false));
        assert!(!changed(Some(&a_invalid), &a_invalid, false));
    }
}
