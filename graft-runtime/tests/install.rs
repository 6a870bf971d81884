use graft_code::{
    CompiledCodeBuilder, Constant, DebugInfo, InfopointReason, JavaConstant, MarkKind,
    RefMapLocation, ReferenceMap, Register, StackSlot,
};
use graft_runtime::{install_code, CodeKind, Platform, Runtime};

fn runtime() -> Runtime {
    let _ = env_logger::builder().is_test(true).try_init();
    Runtime::new(Platform::x64())
}

fn safepoint_debug_info() -> DebugInfo {
    let mut map = ReferenceMap::new();
    map.push(RefMapLocation::Register(Register(0)), 8);
    DebugInfo::with_reference_map(map)
}

#[test]
fn install_empty_unit() {
    let runtime = runtime();
    let method = runtime.methods.add_method("Test.empty()");

    let mut builder = CompiledCodeBuilder::new("Test.empty()");
    builder.emit_u8(0xc3);
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");
    assert_eq!(code.instructions(), &[0xc3]);
    assert_eq!(runtime.code_objects.len(), 1);
}

#[test]
fn installed_code_is_retrievable_through_method() {
    let runtime = runtime();
    let method = runtime.methods.add_method("Test.add(II)I");

    let mut builder = CompiledCodeBuilder::new("Test.add(II)I");
    for byte in [0x48, 0x01, 0xf7, 0x48, 0x89, 0xf8, 0xc3] {
        builder.emit_u8(byte);
    }
    let unit = builder.finish();

    let installed = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");
    let found = runtime
        .methods
        .installed_code(method, &runtime.code_objects)
        .expect("code for method");

    assert_eq!(found.instructions(), installed.instructions());
    assert_eq!(found.instructions(), &unit.code[..]);
    assert_eq!(found.method_id(), method);
}

#[test]
fn same_unit_installs_independently_per_method() {
    let runtime = runtime();
    let first = runtime.methods.add_method("Test.a()");
    let second = runtime.methods.add_method("Test.b()");

    let mut builder = CompiledCodeBuilder::new("shared");
    builder.emit_u32(0x9090_9090);
    let unit = builder.finish();

    let code_a = install_code(&runtime, &unit, CodeKind::Method(first)).expect("install");
    let code_b = install_code(&runtime, &unit, CodeKind::Method(second)).expect("install");

    assert_eq!(runtime.code_objects.len(), 2);
    assert_ne!(code_a.instruction_start(), code_b.instruction_start());
    assert_eq!(
        runtime
            .methods
            .installed_code(first, &runtime.code_objects)
            .unwrap()
            .instruction_start(),
        code_a.instruction_start()
    );
    assert_eq!(
        runtime
            .methods
            .installed_code(second, &runtime.code_objects)
            .unwrap()
            .instruction_start(),
        code_b.instruction_start()
    );
}

#[test]
fn marks_and_comments_survive_install() {
    let runtime = runtime();
    let method = runtime.methods.add_method("Test.marked()");

    let mut builder = CompiledCodeBuilder::new("Test.marked()");
    builder.emit_mark(MarkKind::VerifiedEntry);
    builder.emit_comment("prologue");
    builder.emit_u32(0);
    builder.emit_mark(MarkKind::DeoptHandlerEntry);
    builder.emit_u8(0xc3);
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");

    assert_eq!(code.mark_for_offset(0), Some(MarkKind::VerifiedEntry));
    assert_eq!(code.offset_for_mark(MarkKind::DeoptHandlerEntry), Some(4));
    assert_eq!(code.comments_for_offset(0), vec!["prologue"]);
    assert!(code.comments_for_offset(2).is_empty());
}

#[test]
fn safepoint_with_rescue_slot_installs() {
    let runtime = runtime();
    let method = runtime.methods.add_method("Test.safepoint()");

    let mut builder = CompiledCodeBuilder::new("Test.safepoint()");
    builder.set_frame_size(32);
    builder.set_deopt_rescue_slot(StackSlot::new(16));
    builder.emit_u32(0x90909090);
    builder.emit_safepoint(safepoint_debug_info());
    builder.emit_u8(0xc3);
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");

    let oop_map = code.oop_map_for_offset(4).expect("oop map at safepoint");
    assert!(oop_map.registers.contains(0));
    assert!(code.oop_map_for_offset(0).is_none());

    let infopoint = code.infopoint_for_offset(4).expect("infopoint");
    assert_eq!(infopoint.reason, InfopointReason::Safepoint);
}

#[test]
fn data_section_constant_is_resolved() {
    let runtime = runtime();
    let method = runtime.methods.add_method("Test.constant()");

    let mut builder = CompiledCodeBuilder::new("Test.constant()");
    let reference = builder.add_data_constant(Constant::Java(JavaConstant::Long(0xabcdef)), 8);
    builder.emit_patch(reference);
    builder.emit_u8(0xc3);
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Method(method)).expect("install");
    let image = code.data_section();

    assert_eq!(image.bytes.len(), 8);
    assert_eq!(u64::from_le_bytes(image.bytes[..8].try_into().unwrap()), 0xabcdef);
}

#[test]
fn stub_install_has_no_method_entry() {
    let runtime = runtime();

    let mut builder = CompiledCodeBuilder::new("trap-stub");
    builder.emit_u8(0xcc);
    let unit = builder.finish();

    let code = install_code(&runtime, &unit, CodeKind::Stub).expect("install");
    assert_eq!(runtime.code_objects.len(), 1);
    assert_eq!(code.name(), "trap-stub");
}
