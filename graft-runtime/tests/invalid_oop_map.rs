use graft_code::{
    CompiledCodeBuilder, DebugInfo, InfopointReason, RefMapLocation, ReferenceMap, Register,
    StackSlot,
};
use graft_runtime::{install_code, CodeKind, InstallError, Platform, Runtime};

fn runtime() -> Runtime {
    Runtime::new(Platform::x64())
}

fn install_with_map(runtime: &Runtime, map: ReferenceMap) -> Result<(), InstallError> {
    let method = runtime.methods.add_method("m");

    let mut builder = CompiledCodeBuilder::new("m");
    builder.set_frame_size(64);
    builder.set_deopt_rescue_slot(StackSlot::new(8));
    builder.emit_u32(0);
    builder.emit_safepoint(DebugInfo::with_reference_map(map));
    let unit = builder.finish();

    install_code(runtime, &unit, CodeKind::Method(method)).map(|_| ())
}

#[test]
fn parallel_arrays_must_have_equal_length() {
    let runtime = runtime();

    let map = ReferenceMap {
        oops: vec![Some(RefMapLocation::Register(Register(0)))],
        base: vec![
            Some(RefMapLocation::Register(Register(0))),
            Some(RefMapLocation::Register(Register(1))),
        ],
        size: vec![8, 8, 8],
    };

    assert_eq!(
        install_with_map(&runtime, map),
        Err(InstallError::InvalidReferenceMapLength {
            oops: 1,
            base: 2,
            size: 3
        })
    );
}

#[test]
fn null_oop_entry_rejected() {
    let runtime = runtime();

    let map = ReferenceMap {
        oops: vec![None],
        base: vec![Some(RefMapLocation::StackSlot(0))],
        size: vec![8],
    };

    assert_eq!(
        install_with_map(&runtime, map),
        Err(InstallError::NullReferenceMapEntry { index: 0 })
    );
}

#[test]
fn null_base_entry_rejected() {
    let runtime = runtime();

    let map = ReferenceMap {
        oops: vec![Some(RefMapLocation::StackSlot(0))],
        base: vec![None],
        size: vec![8],
    };

    assert_eq!(
        install_with_map(&runtime, map),
        Err(InstallError::NullReferenceMapEntry { index: 0 })
    );
}

#[test]
fn narrow_entries_rejected() {
    let runtime = runtime();

    for size in [1, 2, 4] {
        let mut map = ReferenceMap::new();
        map.push(RefMapLocation::Register(Register(2)), size);

        assert_eq!(
            install_with_map(&runtime, map),
            Err(InstallError::InvalidNarrowOop { index: 0, size })
        );
    }
}

#[test]
fn negative_stack_offset_rejected() {
    let runtime = runtime();

    let mut map = ReferenceMap::new();
    map.push(RefMapLocation::StackSlot(-8), 8);

    assert_eq!(
        install_with_map(&runtime, map),
        Err(InstallError::NegativeStackOffset {
            index: 0,
            offset: -8
        })
    );
}

#[test]
fn method_start_reference_map_is_validated() {
    let runtime = runtime();
    let method = runtime.methods.add_method("m");

    let map = ReferenceMap {
        oops: vec![None],
        base: vec![Some(RefMapLocation::StackSlot(0))],
        size: vec![8],
    };

    let mut builder = CompiledCodeBuilder::new("m");
    builder.emit_u32(0);
    builder.emit_infopoint(
        InfopointReason::MethodStart,
        Some(DebugInfo::with_reference_map(map)),
    );
    let unit = builder.finish();

    assert_eq!(
        install_code(&runtime, &unit, CodeKind::Method(method)),
        Err(InstallError::NullReferenceMapEntry { index: 0 })
    );
}

#[test]
fn float_register_cannot_hold_oop() {
    let runtime = runtime();
    let xmm = runtime.platform.first_float_register();

    let mut map = ReferenceMap::new();
    map.push(RefMapLocation::Register(xmm), 8);

    assert!(matches!(
        install_with_map(&runtime, map),
        Err(InstallError::KindMismatch { index: 0, .. })
    ));
}

#[test]
fn unknown_register_rejected() {
    let runtime = runtime();

    let mut map = ReferenceMap::new();
    map.push(RefMapLocation::Register(Register(999)), 8);

    assert_eq!(
        install_with_map(&runtime, map),
        Err(InstallError::UnknownRegister {
            register: Register(999)
        })
    );
}

#[test]
fn valid_map_becomes_bitsets() {
    let runtime = runtime();
    let method = runtime.methods.add_method("m");

    let mut map = ReferenceMap::new();
    map.push(RefMapLocation::Register(Register(0)), 8);
    map.push(RefMapLocation::Register(Register(5)), 8);
    map.push(RefMapLocation::StackSlot(16), 8);
    map.push(RefMapLocation::StackSlot(32), 8);

    let mut builder = CompiledCodeBuilder::new("m");
    builder.set_frame_size(64);
    builder.set_deopt_rescue_slot(StackSlot::new(8));
    builder.emit_u32(0);
    builder.emit_safepoint(DebugInfo::with_reference_map(map));
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");
    let oop_map = code.oop_map_for_offset(4).expect("map at safepoint");

    assert!(oop_map.registers.contains(0));
    assert!(oop_map.registers.contains(5));
    assert!(!oop_map.registers.contains(1));
    assert!(oop_map.stack.contains(2));
    assert!(oop_map.stack.contains(4));
    assert!(oop_map.derived_registers.count_ones(..) == 0);
}

#[test]
fn derived_pointers_are_tracked_separately() {
    let runtime = runtime();
    let method = runtime.methods.add_method("m");

    let mut map = ReferenceMap::new();
    map.oops.push(Some(RefMapLocation::Register(Register(3))));
    map.base.push(Some(RefMapLocation::Register(Register(4))));
    map.size.push(8);

    let mut builder = CompiledCodeBuilder::new("m");
    builder.set_frame_size(32);
    builder.set_deopt_rescue_slot(StackSlot::new(8));
    builder.emit_u32(0);
    builder.emit_safepoint(DebugInfo::with_reference_map(map));
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");
    let oop_map = code.oop_map_for_offset(4).expect("map");

    assert!(oop_map.registers.contains(3));
    assert!(oop_map.derived_registers.contains(3));
}
