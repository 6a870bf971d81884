pub mod assumption;
pub mod builder;
pub mod data;
pub mod debug;
pub mod site;
pub mod unit;

pub use assumption::Assumption;
pub use builder::{CompiledCodeBuilder, DATA_SECTION_ALIGNMENT};
pub use data::{
    ClassId, Constant, JavaConstant, MethodId, ObjectId, Register, RegisterCategory, StackSlot,
    Value, ValueKind, VirtualObjectId, VmConstant,
};
pub use debug::{DebugInfo, Frame, RefMapLocation, ReferenceMap, VirtualObject};
pub use site::{
    CodeComment, DataPatch, DataSection, Infopoint, InfopointReason, Mark, MarkKind, Reference,
    Site,
};
pub use unit::CompiledCode;
