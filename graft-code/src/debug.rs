use crate::data::{ClassId, MethodId, Register, Value, ValueKind, VirtualObjectId};

/// Per-safepoint table of machine locations holding live object
/// references. The three arrays are parallel: `base` distinguishes
/// derived pointers from their base, `size` carries the stored width
/// in bytes for every entry.
#[derive(Clone, PartialEq, Debug)]
pub struct ReferenceMap {
    pub oops: Vec<Option<RefMapLocation>>,
    pub base: Vec<Option<RefMapLocation>>,
    pub size: Vec<i32>,
}

impl ReferenceMap {
    pub fn new() -> ReferenceMap {
        ReferenceMap {
            oops: Vec::new(),
            base: Vec::new(),
            size: Vec::new(),
        }
    }

    pub fn push(&mut self, location: RefMapLocation, size: i32) {
        self.oops.push(Some(location));
        self.base.push(Some(location));
        self.size.push(size);
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RefMapLocation {
    Register(Register),
    StackSlot(i32),
}

/// Interpreter frame state at one code position, innermost first in
/// `DebugInfo::frames`. `values` holds locals, then expression stack,
/// then monitors; `slot_kinds` covers the non-monitor portion.
#[derive(Clone, PartialEq, Debug)]
pub struct Frame {
    pub method: MethodId,
    pub bci: i32,
    pub values: Vec<Option<Value>>,
    pub slot_kinds: Vec<Option<ValueKind>>,
    pub num_locals: u32,
    pub num_stack: u32,
    pub num_locks: u32,
}

impl Frame {
    pub fn slot_count(&self) -> usize {
        (self.num_locals + self.num_stack + self.num_locks) as usize
    }

    pub fn kind_count(&self) -> usize {
        (self.num_locals + self.num_stack) as usize
    }
}

/// Heap object that does not exist yet at a safepoint and has to be
/// materialized when the frame is deoptimized. Referenced from frame
/// values (and other virtual objects) by id; cycles are legal.
#[derive(Clone, PartialEq, Debug)]
pub struct VirtualObject {
    pub id: VirtualObjectId,
    pub class: ClassId,
    pub values: Vec<Option<Value>>,
    pub kinds: Vec<Option<ValueKind>>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct DebugInfo {
    pub frames: Vec<Frame>,
    pub virtual_objects: Vec<VirtualObject>,
    pub reference_map: Option<ReferenceMap>,
}

impl DebugInfo {
    pub fn new() -> DebugInfo {
        DebugInfo {
            frames: Vec::new(),
            virtual_objects: Vec::new(),
            reference_map: None,
        }
    }

    pub fn with_reference_map(reference_map: ReferenceMap) -> DebugInfo {
        DebugInfo {
            frames: Vec::new(),
            virtual_objects: Vec::new(),
            reference_map: Some(reference_map),
        }
    }

    pub fn has_frames(&self) -> bool {
        !self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{JavaConstant, MethodId};

    #[test]
    fn test_frame_counts() {
        let frame = Frame {
            method: MethodId(0),
            bci: 7,
            values: vec![
                Some(Value::constant(JavaConstant::Int(1))),
                Some(Value::constant(JavaConstant::Int(2))),
                Some(Value::constant(JavaConstant::Null)),
            ],
            slot_kinds: vec![Some(ValueKind::Int), Some(ValueKind::Int)],
            num_locals: 2,
            num_stack: 0,
            num_locks: 1,
        };

        assert_eq!(frame.slot_count(), 3);
        assert_eq!(frame.kind_count(), 2);
    }

    #[test]
    fn test_reference_map_push() {
        let mut map = ReferenceMap::new();
        map.push(RefMapLocation::Register(Register(3)), 8);
        map.push(RefMapLocation::StackSlot(16), 8);

        assert_eq!(map.oops.len(), 2);
        assert_eq!(map.base.len(), 2);
        assert_eq!(map.size.len(), 2);
    }
}
