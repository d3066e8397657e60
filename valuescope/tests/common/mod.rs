#![allow(dead_code)]

//! Common test utilities shared across integration tests

use std::sync::{Arc, Once};
use valuescope::{
    ByteOrder, ImageMap, LoadedImage, RegionMemory, StructMember, TargetArch, TypeHandle,
    TypeInfo, ValueSession,
};

static INIT: Once = Once::new();

/// Image every fixture variable lives in
pub const DEMO_IMAGE: &str = "/usr/bin/demo";

/// Where the fixture image is loaded once a process is attached
pub const LOAD_BIAS: u64 = 0x5555_0000_0000;

/// Initialize logging for tests (call once per test)
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("off")
            .try_init()
            .ok();
    });
}

pub fn le64() -> TargetArch {
    TargetArch {
        byte_order: ByteOrder::Little,
        address_size: 8,
    }
}

pub fn demo_images() -> ImageMap {
    ImageMap::new().with_image(LoadedImage::with_load_bias(DEMO_IMAGE, LOAD_BIAS))
}

/// Target memory with `bytes` mapped at the load address of file address `file_address`
pub fn target_memory(regions: &[(u64, Vec<u8>)]) -> Arc<RegionMemory> {
    let memory = Arc::new(RegionMemory::new("target"));
    for (file_address, bytes) in regions {
        memory
            .add_region(LOAD_BIAS + file_address, bytes.clone())
            .expect("fixture regions must not overlap");
    }
    memory
}

/// `struct point { int x; int y; int z; }`
pub fn point_type(session: &ValueSession) -> TypeHandle {
    session.type_system().register(TypeInfo::structure(
        "point",
        12,
        vec![
            StructMember::new("x", TypeInfo::signed_int(4), 0),
            StructMember::new("y", TypeInfo::signed_int(4), 4),
            StructMember::new("z", TypeInfo::signed_int(4), 8),
        ],
    ))
}

pub fn int_type(session: &ValueSession) -> TypeHandle {
    session.type_system().register(TypeInfo::signed_int(4))
}

pub fn i32s(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
