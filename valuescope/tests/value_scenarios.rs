//! End-to-end value behavior across attach, stop and detach events
//! - File addresses are promoted to load addresses once, never back
//! - Read failures leave the cached bytes untouched
//! - Aggregates are never read as a whole; children read their own leaves

mod common;

use common::{demo_images, i32s, init, int_type, le64, point_type, target_memory, LOAD_BIAS};
use valuescope::{
    Address, DataState, DeferReason, LocationKind, ValueError, ValueLocation, ValueSession,
};

#[test]
fn test_int_variable_before_and_after_attach() {
    init();
    let mut session = ValueSession::new();
    let ty = int_type(&session);
    let mut value = session.create_variable(
        "counter",
        ty,
        Address::module(common::DEMO_IMAGE, 0x1000),
    );

    let ctx = session.execution_context();
    assert_eq!(value.update_if_needed(&ctx), Ok(true));
    assert_eq!(value.location_kind(), LocationKind::FileAddress);
    assert!(value.data().unwrap().is_empty());
    assert_eq!(
        value.data_state(),
        Some(DataState::Unread(DeferReason::NoProcess))
    );

    let memory = target_memory(&[(0x1000, 0x0102_0304i32.to_le_bytes().to_vec())]);
    session.attach(demo_images(), memory, le64());
    let ctx = session.execution_context();
    assert_eq!(value.update_if_needed(&ctx), Ok(true));
    assert_eq!(value.location(), ValueLocation::LoadAddress(0x5555_0000_1000));
    assert_eq!(value.load_address(), Some(0x5555_0000_1000));
    assert_eq!(value.data().unwrap().bytes(), &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(value.value_as_signed(), Some(0x0102_0304));
    assert_eq!(value.type_name(), "i32");
    assert_eq!(value.byte_size(), 4);
}

#[test]
fn test_child_tracks_parent_promotion() {
    init();
    let mut session = ValueSession::new();
    let ty = point_type(&session);
    let address = Address::module(common::DEMO_IMAGE, 0x2000);
    let mut point = session.create_variable("origin", ty, address);

    let ctx = session.execution_context();
    let z = point.child_at_index(2, &ctx).unwrap().unwrap();
    assert_eq!(z.location(), ValueLocation::FileAddress(0x2008));

    session.attach(
        demo_images(),
        target_memory(&[(0x2000, i32s(&[1, 2, 3]))]),
        le64(),
    );
    let ctx = session.execution_context();
    let z = point.child_member_with_name("z", &ctx).unwrap().unwrap();
    assert_eq!(z.location(), ValueLocation::LoadAddress(LOAD_BIAS + 0x2008));
    assert_eq!(z.value_as_signed(), Some(3));
    assert_eq!(point.location(), ValueLocation::LoadAddress(LOAD_BIAS + 0x2000));
}

#[test]
fn test_children_resolve_at_member_offsets() {
    init();
    let mut session = ValueSession::new();
    session.attach(
        demo_images(),
        target_memory(&[(0x2000, i32s(&[-1, -2, -3]))]),
        le64(),
    );
    let ty = point_type(&session);
    let address = Address::module(common::DEMO_IMAGE, 0x2000);
    let mut point = session.create_variable("p", ty, address);
    let ctx = session.execution_context();

    point.update_if_needed(&ctx).unwrap();
    let base = point.load_address().unwrap();
    assert_eq!(point.num_children(), 3);
    for (index, offset) in [0u64, 4, 8].into_iter().enumerate() {
        let child = point.child_at_index(index, &ctx).unwrap().unwrap();
        assert_eq!(child.load_address(), Some(base + offset));
        assert_eq!(child.value_as_signed(), Some(-(index as i64) - 1));
    }
}

#[test]
fn test_location_never_regresses_to_file_address() {
    init();
    let mut session = ValueSession::new();
    let ty = int_type(&session);
    let mut value = session.create_variable("v", ty, Address::module(common::DEMO_IMAGE, 0x1000));
    let mut seen_load = false;

    for step in 0..12 {
        match step % 4 {
            0 => {
                session.attach(demo_images(), target_memory(&[(0x1000, i32s(&[step]))]), le64());
            }
            1 => {
                session.notify_stop();
            }
            2 => {
                session.detach();
            }
            _ => {}
        }
        value.update_if_needed(&session.execution_context()).unwrap();
        if value.location_kind() == LocationKind::LoadAddress {
            seen_load = true;
        }
        if seen_load {
            assert_eq!(value.location_kind(), LocationKind::LoadAddress, "step {step}");
        }
    }
    assert!(seen_load);
}

#[test]
fn test_failed_read_keeps_previous_bytes() {
    init();
    let mut session = ValueSession::new();
    let memory = target_memory(&[(0x1000, i32s(&[77]))]);
    session.attach(demo_images(), memory.clone(), le64());
    let ty = int_type(&session);
    let mut value = session.create_variable("v", ty, Address::module(common::DEMO_IMAGE, 0x1000));

    assert_eq!(value.update_if_needed(&session.execution_context()), Ok(true));
    let before = value.raw_data().clone();

    memory.remove_region(LOAD_BIAS + 0x1000);
    session.notify_stop();
    assert_eq!(value.update_if_needed(&session.execution_context()), Ok(false));
    assert_eq!(value.raw_data(), &before);
    assert!(value.data().is_none());
    assert!(value.value_as_signed().is_none());
    assert!(matches!(value.error(), Some(ValueError::ReadFailed { .. })));
    assert!(value.value_did_change());
}

#[test]
fn test_recompute_without_process_is_stable() {
    init();
    let session = ValueSession::new();
    let ty = point_type(&session);
    let mut value = session.create_variable("p", ty, Address::module(common::DEMO_IMAGE, 0x2000));
    let ctx = session.execution_context();

    let first = value.update_value(&ctx);
    let first_location = value.location();
    let first_bytes = value.raw_data().clone();
    for _ in 0..4 {
        assert_eq!(value.update_value(&ctx), first);
        assert_eq!(value.location(), first_location);
        assert_eq!(value.raw_data(), &first_bytes);
    }
    assert_eq!(value.data_state(), Some(DataState::AddressOnly));
}

#[test]
fn test_changed_flag_follows_memory_between_stops() {
    init();
    let mut session = ValueSession::new();
    let memory = target_memory(&[(0x1000, i32s(&[1]))]);
    session.attach(demo_images(), memory.clone(), le64());
    let ty = int_type(&session);
    let mut value = session.create_variable("v", ty, Address::module(common::DEMO_IMAGE, 0x1000));

    value.update_if_needed(&session.execution_context()).unwrap();
    assert!(!value.value_did_change());

    memory.write(LOAD_BIAS + 0x1000, &i32s(&[2])).unwrap();
    session.notify_stop();
    value.update_if_needed(&session.execution_context()).unwrap();
    assert!(value.value_did_change());
    assert_eq!(value.value_as_signed(), Some(2));

    session.notify_stop();
    value.update_if_needed(&session.execution_context()).unwrap();
    assert!(!value.value_did_change());
}

#[test]
fn test_image_not_loaded_is_not_an_error() {
    init();
    let mut session = ValueSession::new();
    session.attach(demo_images(), target_memory(&[]), le64());
    let ty = int_type(&session);
    let mut value = session.create_variable("v", ty, Address::module("/usr/lib/libother.so", 0x40));

    assert_eq!(value.update_if_needed(&session.execution_context()), Ok(true));
    assert_eq!(value.location(), ValueLocation::FileAddress(0x40));
    assert_eq!(
        value.data_state(),
        Some(DataState::Unread(DeferReason::ImageNotLoaded))
    );
}

#[test]
fn test_read_limit_from_config() {
    init();
    let mut config = valuescope::Config::default();
    config.values.max_read_size = 2;
    let mut session = ValueSession::new_with_config(config);
    session.attach(demo_images(), target_memory(&[(0x1000, i32s(&[5]))]), le64());
    let ty = int_type(&session);
    let mut value = session.create_variable("v", ty, Address::module(common::DEMO_IMAGE, 0x1000));

    assert_eq!(value.update_if_needed(&session.execution_context()), Ok(false));
    assert_eq!(
        value.error(),
        Some(&ValueError::ReadTooLarge { size: 4, limit: 2 })
    );
}
