//! Session-level behavior
//! - Stop epochs drive lazy recompute
//! - Register, expression-result and constant values
//! - Attaching to a live process (this test binary)

mod common;

use common::{demo_images, i32s, init, int_type, le64, point_type, target_memory};
use std::sync::Arc;
use valuescope::{
    Address, LocationKind, PtRegsContext, StopId, TypeInfo, ValueError, ValueKind, ValueLocation,
    ValueSession,
};

#[test]
fn test_stop_epoch_advances_on_every_event() {
    init();
    let mut session = ValueSession::new();
    assert_eq!(session.stop_id(), StopId::default());

    let attached = session.attach(demo_images(), target_memory(&[]), le64());
    let stopped = session.notify_stop();
    let detached = session.detach();
    assert!(StopId::default() < attached);
    assert!(attached < stopped);
    assert!(stopped < detached);
    assert!(!session.is_attached());
    assert_eq!(session.execution_context().stop_id, detached);
}

#[test]
fn test_type_handles_are_shared() {
    init();
    let session = ValueSession::new();
    let a = int_type(&session);
    let b = int_type(&session);
    assert!(Arc::ptr_eq(&a, &b));

    let value = session.create_variable("v", a.clone(), Address::Invalid);
    assert!(Arc::ptr_eq(value.type_handle(), &b));
    assert_eq!(session.type_system().len(), 1);
}

#[test]
fn test_register_values_follow_stops() {
    init();
    let mut session = ValueSession::new();
    session.attach(demo_images(), target_memory(&[]), le64());
    let ty = session.type_system().register(TypeInfo::unsigned_int(8));
    let mut rsp = session.create_register_value(7, ty);
    assert_eq!(rsp.name(), "RSP");
    assert_eq!(rsp.value_kind(), ValueKind::Register);

    session.set_registers(Arc::new(
        PtRegsContext::default().with_register(7, 0x7ffd_0000_1000).unwrap(),
    ));
    assert_eq!(rsp.update_if_needed(&session.execution_context()), Ok(true));
    assert_eq!(rsp.location(), ValueLocation::Scalar(0x7ffd_0000_1000));
    assert_eq!(rsp.value_as_unsigned(), Some(0x7ffd_0000_1000));

    // A new stop forgets the old registers until new ones are supplied
    session.notify_stop();
    assert_eq!(rsp.update_if_needed(&session.execution_context()), Ok(false));
    assert!(matches!(
        rsp.error(),
        Some(ValueError::RegisterUnavailable { .. })
    ));

    session.set_registers(Arc::new(
        PtRegsContext::default().with_register(7, 0x7ffd_0000_0ff0).unwrap(),
    ));
    rsp.invalidate();
    assert_eq!(rsp.update_if_needed(&session.execution_context()), Ok(true));
    assert!(rsp.value_did_change());
}

#[test]
fn test_expression_results_live_in_host_memory() {
    init();
    let session = ValueSession::new();
    let point = point_type(&session);
    let mut result = session
        .create_expression_result("$1", point, &i32s(&[4, 5, 6]))
        .unwrap();
    assert_eq!(result.value_kind(), ValueKind::ExpressionResult);

    let ctx = session.execution_context();
    assert_eq!(result.update_if_needed(&ctx), Ok(true));
    assert_eq!(result.location_kind(), LocationKind::HostAddress);
    // Host scratch addresses start at the configured base and are 16-byte aligned
    assert_eq!(result.location().value() % 16, 0);
    assert!(result.location().value() >= 0x1000);

    let y = result.child_member_with_name("y", &ctx).unwrap().unwrap();
    assert_eq!(y.location_kind(), LocationKind::HostAddress);
    assert_eq!(y.value_as_signed(), Some(5));

    let int = int_type(&session);
    assert!(session
        .create_expression_result("$2", int, &[1, 2])
        .is_err());
}

#[test]
fn test_constants_are_scalars() {
    init();
    let session = ValueSession::new();
    let ty = session.type_system().register(TypeInfo::signed_int(2));
    let mut value = session.create_constant("minus_one", ty, 0xffff);
    assert_eq!(value.update_if_needed(&session.execution_context()), Ok(true));
    assert_eq!(value.location(), ValueLocation::Scalar(0xffff));
    assert_eq!(value.value_as_signed(), Some(-1));
    assert_eq!(value.value_as_unsigned(), Some(0xffff));
    assert!(value.is_in_scope());
    assert_eq!(value.num_children(), 0);
}

#[test]
fn test_invalid_address_has_no_data() {
    init();
    let mut session = ValueSession::new();
    session.attach(demo_images(), target_memory(&[]), le64());
    let ty = int_type(&session);
    let mut value = session.create_variable("optimized_out", ty, Address::Invalid);

    assert_eq!(value.update_if_needed(&session.execution_context()), Ok(true));
    assert!(value.data().unwrap().is_empty());
    assert!(value.error().is_none());
}

static MAGIC: u32 = 0xC0FF_EE11;

#[test]
fn test_attach_to_own_process() {
    init();
    let mut session = ValueSession::new();
    session.attach_pid(std::process::id()).unwrap();
    assert_eq!(session.pid(), Some(std::process::id()));
    assert!(session.is_attached());

    let runtime = std::ptr::addr_of!(MAGIC) as u64;
    let ctx = session.execution_context();
    let images = &ctx.process.as_ref().unwrap().images;
    let located = images.images().iter().find_map(|image| {
        image.segments.iter().find_map(|segment| {
            let start = segment.file_vaddr.wrapping_add(segment.bias);
            (runtime >= start && runtime - start < segment.size)
                .then(|| (image.path.clone(), runtime.wrapping_sub(segment.bias)))
        })
    });
    let Some((path, file_address)) = located else {
        eprintln!("skipping: no loadable segment covers 0x{runtime:x}");
        return;
    };

    let ty = session.type_system().register(TypeInfo::unsigned_int(4));
    let mut value = session.create_variable("MAGIC", ty, Address::module(path, file_address));
    assert_eq!(value.location(), ValueLocation::LoadAddress(runtime));
    assert_eq!(value.update_if_needed(&ctx), Ok(true));
    assert_eq!(value.value_as_unsigned(), Some(0xC0FF_EE11));
}
