use crate::data::{ClassId, MethodId, ObjectId};

/// Compiler-recorded precondition the generated code depends on. When
/// one of these is invalidated at runtime the code has to be thrown
/// away and the method deoptimized.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Assumption {
    NoFinalizableSubclass(ClassId),
    ConcreteSubtype {
        context: ClassId,
        subtype: ClassId,
    },
    LeafType(ClassId),
    ConcreteMethod {
        method: MethodId,
        context: ClassId,
    },
    CallSiteTargetValue {
        call_site: ObjectId,
        target: ObjectId,
    },
}
