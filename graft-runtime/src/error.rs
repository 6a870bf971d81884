use thiserror::Error;

use graft_code::{MethodId, Register, ValueKind, VirtualObjectId};

pub type Result<T> = std::result::Result<T, InstallError>;

/// Reasons the installer rejects a compiled-code unit. Every variant
/// carries enough context (offset, index, id) to point at the element
/// of the unit that failed. A rejected unit leaves the code cache
/// untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstallError {
    #[error("invalid data section alignment: {0}")]
    InvalidDataSectionAlignment(u32),

    #[error("null site at index {index}")]
    NullSite { index: usize },

    #[error("data patch at offset {offset} is missing a reference")]
    MissingReference { offset: u32 },

    #[error("unresolvable constant in patch at offset {offset}")]
    InvalidConstant { offset: u32 },

    #[error("narrow method constant in data section at offset {offset}")]
    InvalidNarrowMethodConstant { offset: u32 },

    #[error("narrow reference at offset {offset} not supported by this platform")]
    UnsupportedNarrowReference { offset: u32 },

    #[error("data section reference out of bounds: offset {offset}, section size {size}")]
    OutOfBoundsDataSectionReference { offset: u32, size: usize },

    #[error("invalid mark id {id} at offset {offset}")]
    InvalidMark { offset: u32, id: i64 },

    #[error("duplicate infopoint at offset {offset}")]
    DuplicateInfopoint { offset: u32 },

    #[error("duplicate mark at offset {offset}")]
    DuplicateMark { offset: u32 },

    #[error("missing debug info at infopoint offset {offset}")]
    MissingDebugInfo { offset: u32 },

    #[error("safepoint at offset {offset} without frames requires a deopt rescue slot")]
    MissingDeoptRescueSlot { offset: u32 },

    #[error("missing reference map at safepoint offset {offset}")]
    MissingReferenceMap { offset: u32 },

    #[error("unexpected scope length: declared {declared}, found {found}")]
    UnexpectedScopeLength { declared: usize, found: usize },

    #[error("null value at slot {index}")]
    NullValue { index: usize },

    #[error("null slot kind at slot {index}")]
    NullSlotKind { index: usize },

    #[error("unexpected illegal value at slot {index}")]
    UnexpectedIllegalValue { index: usize },

    #[error("kind mismatch at slot {index}: declared {declared}, value has {found}")]
    KindMismatch {
        index: usize,
        declared: ValueKind,
        found: ValueKind,
    },

    #[error("wrong constant type at slot {index}: declared {declared}, constant is {found}")]
    WrongConstantType {
        index: usize,
        declared: ValueKind,
        found: ValueKind,
    },

    #[error("unsupported constant type {kind} at slot {index}")]
    UnsupportedConstantType { index: usize, kind: ValueKind },

    #[error("null constant at slot {index} declared as {declared}")]
    UnexpectedNullConstant { index: usize, declared: ValueKind },

    #[error("object constant at slot {index} where {declared} was expected")]
    UnexpectedObjectConstant { index: usize, declared: ValueKind },

    #[error("missing illegal filler after wide value at slot {index}")]
    MissingIllegalAfterWide { index: usize },

    #[error("vm constant at slot {index} is not supported in debug info")]
    UnsupportedVmConstant { index: usize },

    #[error("null monitor value at slot {index}")]
    NullMonitor { index: usize },

    #[error("monitor value at slot {index} is not an object")]
    WrongMonitorType { index: usize },

    #[error("reference to undefined virtual object {id}")]
    UndefinedVirtualObject { id: VirtualObjectId },

    #[error("duplicate virtual object id {id}")]
    DuplicateVirtualObject { id: VirtualObjectId },

    #[error("invalid virtual object id {id}")]
    InvalidVirtualObjectId { id: VirtualObjectId },

    #[error("virtual object {id} has mismatched value/kind array lengths")]
    VirtualObjectLengthMismatch { id: VirtualObjectId },

    #[error("reference map arrays differ in length: oops {oops}, base {base}, size {size}")]
    InvalidReferenceMapLength {
        oops: usize,
        base: usize,
        size: usize,
    },

    #[error("null reference map entry at index {index}")]
    NullReferenceMapEntry { index: usize },

    #[error("narrow oop of {size} bytes at reference map index {index}")]
    InvalidNarrowOop { index: usize, size: i32 },

    #[error("negative stack offset {offset} at reference map index {index}")]
    NegativeStackOffset { index: usize, offset: i32 },

    #[error("unknown register {register:?} in compiled code")]
    UnknownRegister { register: Register },

    #[error("unknown method {method:?}")]
    UnknownMethod { method: MethodId },
}
