use fixedbitset::FixedBitSet;

use graft_code::{
    Constant, DebugInfo, Frame, JavaConstant, Value, ValueKind, VirtualObject, VirtualObjectId,
};

use crate::error::{InstallError, Result};
use crate::platform::Platform;

/// Index of virtual-object ids defined by one `DebugInfo`. Resolution
/// goes through this table instead of object links so that cyclic and
/// self references cannot loop.
pub(crate) struct VirtualTable {
    ids: Vec<VirtualObjectId>,
}

impl VirtualTable {
    pub(crate) fn contains(&self, id: VirtualObjectId) -> bool {
        self.ids.contains(&id)
    }

    fn index_of(&self, id: VirtualObjectId) -> Option<usize> {
        self.ids.iter().position(|&entry| entry == id)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

pub(crate) fn collect_virtual_table(debug_info: &DebugInfo) -> Result<VirtualTable> {
    let mut ids = Vec::with_capacity(debug_info.virtual_objects.len());

    for vo in &debug_info.virtual_objects {
        if vo.id < 0 {
            return Err(InstallError::InvalidVirtualObjectId { id: vo.id });
        }

        if ids.contains(&vo.id) {
            return Err(InstallError::DuplicateVirtualObject { id: vo.id });
        }

        ids.push(vo.id);
    }

    Ok(VirtualTable { ids })
}

/// Validates all frames and virtual objects of one `DebugInfo`.
pub(crate) fn validate_debug_info(platform: &Platform, debug_info: &DebugInfo) -> Result<()> {
    let table = collect_virtual_table(debug_info)?;

    for frame in &debug_info.frames {
        validate_frame(platform, frame, &table)?;
    }

    for vo in &debug_info.virtual_objects {
        validate_virtual_object(platform, vo, &table)?;
    }

    scan_reachability(debug_info, &table);

    Ok(())
}

fn validate_frame(platform: &Platform, frame: &Frame, table: &VirtualTable) -> Result<()> {
    let total = frame.slot_count();
    let kind_count = frame.kind_count();

    if frame.values.len() != total {
        return Err(InstallError::UnexpectedScopeLength {
            declared: total,
            found: frame.values.len(),
        });
    }

    if frame.slot_kinds.len() != kind_count {
        return Err(InstallError::UnexpectedScopeLength {
            declared: kind_count,
            found: frame.slot_kinds.len(),
        });
    }

    validate_slots(
        platform,
        &frame.values[..kind_count],
        &frame.slot_kinds,
        table,
    )?;
    validate_monitors(&frame.values[kind_count..], kind_count, table)?;

    Ok(())
}

fn validate_virtual_object(
    platform: &Platform,
    vo: &VirtualObject,
    table: &VirtualTable,
) -> Result<()> {
    if vo.values.len() != vo.kinds.len() {
        return Err(InstallError::VirtualObjectLengthMismatch { id: vo.id });
    }

    validate_slots(platform, &vo.values, &vo.kinds, table)
}

/// Walks one value/kind sequence: every pair present, wide values
/// followed by their Illegal filler, kinds consistent with storage.
fn validate_slots(
    platform: &Platform,
    values: &[Option<Value>],
    kinds: &[Option<ValueKind>],
    table: &VirtualTable,
) -> Result<()> {
    debug_assert_eq!(values.len(), kinds.len());

    let mut index = 0;

    while index < values.len() {
        let value = values[index].ok_or(InstallError::NullValue { index })?;
        let kind = kinds[index].ok_or(InstallError::NullSlotKind { index })?;

        validate_value(platform, index, value, kind, table)?;

        if kind.needs_two_slots() {
            let filler = index + 1;

            if filler >= values.len() {
                return Err(InstallError::MissingIllegalAfterWide { index });
            }

            let filler_value = values[filler].ok_or(InstallError::NullValue { index: filler })?;
            let filler_kind = kinds[filler].ok_or(InstallError::NullSlotKind { index: filler })?;

            if filler_kind != ValueKind::Illegal || !filler_value.is_illegal() {
                return Err(InstallError::MissingIllegalAfterWide { index });
            }

            index += 2;
        } else {
            index += 1;
        }
    }

    Ok(())
}

/// Monitor values are object references held while the lock is owned;
/// primitives and illegals can never be locked on.
fn validate_monitors(
    monitors: &[Option<Value>],
    base_index: usize,
    table: &VirtualTable,
) -> Result<()> {
    for (offset, &value) in monitors.iter().enumerate() {
        let index = base_index + offset;
        let value = value.ok_or(InstallError::NullMonitor { index })?;

        match value {
            Value::Illegal => return Err(InstallError::WrongMonitorType { index }),
            Value::Register { kind, .. } | Value::StackSlot { kind, .. } => {
                if !kind.is_object() {
                    return Err(InstallError::WrongMonitorType { index });
                }
            }
            Value::Constant(Constant::Java(constant)) => {
                if constant.kind() != ValueKind::Object {
                    return Err(InstallError::WrongMonitorType { index });
                }
            }
            Value::Constant(Constant::Vm(_)) => {
                return Err(InstallError::WrongMonitorType { index });
            }
            Value::VirtualRef(id) => {
                if !table.contains(id) {
                    return Err(InstallError::UndefinedVirtualObject { id });
                }
            }
        }
    }

    Ok(())
}

fn validate_value(
    platform: &Platform,
    index: usize,
    value: Value,
    declared: ValueKind,
    table: &VirtualTable,
) -> Result<()> {
    if declared == ValueKind::Illegal {
        // only the filler of a wide value may be declared illegal
        return match value {
            Value::Illegal => Ok(()),
            _ => Err(InstallError::KindMismatch {
                index,
                declared,
                found: value_kind(value),
            }),
        };
    }

    match value {
        Value::Illegal => Err(InstallError::UnexpectedIllegalValue { index }),

        Value::Register { register, kind } => {
            if platform.register_category(register).is_none() {
                return Err(InstallError::UnknownRegister { register });
            }

            if kind != declared || !platform.can_store_kind(register, declared) {
                return Err(InstallError::KindMismatch {
                    index,
                    declared,
                    found: kind,
                });
            }

            Ok(())
        }

        Value::StackSlot { kind, .. } => {
            if kind != declared {
                return Err(InstallError::KindMismatch {
                    index,
                    declared,
                    found: kind,
                });
            }

            Ok(())
        }

        Value::Constant(Constant::Java(constant)) => {
            validate_constant_value(index, constant, declared)
        }

        Value::Constant(Constant::Vm(_)) => Err(InstallError::UnsupportedVmConstant { index }),

        Value::VirtualRef(id) => {
            if declared != ValueKind::Object {
                return Err(InstallError::KindMismatch {
                    index,
                    declared,
                    found: ValueKind::Object,
                });
            }

            if !table.contains(id) {
                return Err(InstallError::UndefinedVirtualObject { id });
            }

            Ok(())
        }
    }
}

fn validate_constant_value(index: usize, constant: JavaConstant, declared: ValueKind) -> Result<()> {
    if constant.is_null() {
        if !declared.is_object() {
            return Err(InstallError::UnexpectedNullConstant { index, declared });
        }

        return Ok(());
    }

    let found = constant.kind();

    if found == ValueKind::Short || declared == ValueKind::Short {
        return Err(InstallError::UnsupportedConstantType {
            index,
            kind: ValueKind::Short,
        });
    }

    if declared.is_object() && !found.is_object() {
        return Err(InstallError::WrongConstantType {
            index,
            declared,
            found,
        });
    }

    if !declared.is_object() && found.is_object() {
        return Err(InstallError::UnexpectedObjectConstant { index, declared });
    }

    if found != declared {
        return Err(InstallError::WrongConstantType {
            index,
            declared,
            found,
        });
    }

    Ok(())
}

fn value_kind(value: Value) -> ValueKind {
    match value {
        Value::Register { kind, .. } | Value::StackSlot { kind, .. } => kind,
        Value::Constant(Constant::Java(constant)) => constant.kind(),
        Value::Constant(Constant::Vm(_)) => ValueKind::Object,
        Value::VirtualRef(_) => ValueKind::Object,
        Value::Illegal => ValueKind::Illegal,
    }
}

/// Worklist traversal over the virtual-object graph starting from the
/// frame values. The visited set guarantees termination on cycles;
/// forward references and unreferenced table entries are tolerated but
/// traced.
fn scan_reachability(debug_info: &DebugInfo, table: &VirtualTable) {
    let mut visited = FixedBitSet::with_capacity(table.len());
    let mut worklist: Vec<usize> = Vec::new();

    let frame_refs = debug_info
        .frames
        .iter()
        .flat_map(|frame| frame.values.iter())
        .filter_map(|value| match value {
            Some(Value::VirtualRef(id)) => table.index_of(*id),
            _ => None,
        });

    for index in frame_refs {
        if !visited.contains(index) {
            visited.insert(index);
            worklist.push(index);
        }
    }

    while let Some(index) = worklist.pop() {
        let vo = &debug_info.virtual_objects[index];

        for value in vo.values.iter().flatten() {
            if let Value::VirtualRef(id) = value {
                let target = table.index_of(*id).expect("validated above");

                if target > index {
                    log::trace!(
                        "virtual object {} referenced before its definition",
                        id
                    );
                }

                if !visited.contains(target) {
                    visited.insert(target);
                    worklist.push(target);
                }
            }
        }
    }

    for (index, vo) in debug_info.virtual_objects.iter().enumerate() {
        if !visited.contains(index) {
            log::trace!("virtual object {} defined but never referenced", vo.id);
        }
    }
}
