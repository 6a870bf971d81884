use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::data::Constant;
use crate::debug::DebugInfo;

/// Patch target: either an embedded constant or a slot in the
/// code unit's data section.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Reference {
    Constant(Constant),
    DataSection { offset: u32 },
}

/// Code or data location that needs the referenced value patched in
/// after the final addresses are known.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct DataPatch {
    pub offset: u32,
    pub reference: Option<Reference>,
}

impl DataPatch {
    pub fn new(offset: u32, reference: Reference) -> DataPatch {
        DataPatch {
            offset,
            reference: Some(reference),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum InfopointReason {
    Safepoint,
    Call,
    ImplicitException,
    MethodStart,
    MethodEnd,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Infopoint {
    pub offset: u32,
    pub reason: InfopointReason,
    pub debug_info: Option<DebugInfo>,
}

/// Position the runtime needs to find later (entry points, handlers,
/// poll sites). The id is validated against `MarkKind` at install time.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Mark {
    pub offset: u32,
    pub id: i64,
}

/// The tag set the runtime recognizes for marks.
#[derive(Copy, Clone, PartialEq, Eq, Debug, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MarkKind {
    VerifiedEntry,
    UnverifiedEntry,
    OsrEntry,
    ExceptionHandlerEntry,
    DeoptHandlerEntry,
    FrameComplete,
    InvokeStatic,
    InvokeSpecial,
    InvokeVirtual,
    InvokeInterface,
    PollNear,
    PollFar,
    PollReturnNear,
    PollReturnFar,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Site {
    Patch(DataPatch),
    Infopoint(Infopoint),
    Mark(Mark),
}

impl Site {
    pub fn offset(&self) -> u32 {
        match self {
            Site::Patch(patch) => patch.offset,
            Site::Infopoint(infopoint) => infopoint.offset,
            Site::Mark(mark) => mark.offset,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct CodeComment {
    pub offset: u32,
    pub text: String,
}

/// Read-only constant area emitted next to the instructions.
#[derive(Clone, PartialEq, Debug)]
pub struct DataSection {
    pub bytes: Vec<u8>,
    pub alignment: u32,
    pub patches: Vec<Option<DataPatch>>,
}

impl DataSection {
    pub fn new(alignment: u32) -> DataSection {
        DataSection {
            bytes: Vec::new(),
            alignment,
            patches: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
