use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct MethodId(pub u32);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ClassId(pub u32);

/// Handle to a heap object pinned by the runtime while it appears
/// in compiled code or its side tables.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ObjectId(pub u32);

pub type VirtualObjectId = i32;

/// Primitive type tag attached to every value in a frame or data patch.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ValueKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Float,
    Long,
    Double,
    Object,
    Illegal,
}

impl ValueKind {
    pub fn size_in_bytes(self, ptr_width: u32) -> u32 {
        match self {
            ValueKind::Boolean | ValueKind::Byte => 1,
            ValueKind::Short | ValueKind::Char => 2,
            ValueKind::Int | ValueKind::Float => 4,
            ValueKind::Long | ValueKind::Double => 8,
            ValueKind::Object => ptr_width,
            ValueKind::Illegal => 0,
        }
    }

    /// Long and Double occupy two frame slots; the second slot
    /// carries an Illegal filler.
    pub fn needs_two_slots(self) -> bool {
        matches!(self, ValueKind::Long | ValueKind::Double)
    }

    pub fn is_object(self) -> bool {
        self == ValueKind::Object
    }

    pub fn is_primitive(self) -> bool {
        !matches!(self, ValueKind::Object | ValueKind::Illegal)
    }

    pub fn is_float(self) -> bool {
        matches!(self, ValueKind::Float | ValueKind::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Byte => "byte",
            ValueKind::Short => "short",
            ValueKind::Char => "char",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Object => "object",
            ValueKind::Illegal => "illegal",
        };
        f.write_str(name)
    }
}

/// Machine register, numbered by the platform description.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Register(pub u16);

impl Register {
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum RegisterCategory {
    Integer,
    Float,
}

/// Stack slot addressed relative to the frame pointer (or the stack
/// pointer for slots in the outgoing argument area).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct StackSlot {
    pub offset: i32,
    pub from_fp: bool,
}

impl StackSlot {
    pub fn new(offset: i32) -> StackSlot {
        StackSlot {
            offset,
            from_fp: false,
        }
    }

    pub fn from_fp(offset: i32) -> StackSlot {
        StackSlot {
            offset,
            from_fp: true,
        }
    }
}

/// Constant from the guest language's value domain.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum JavaConstant {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(ObjectId),
    Null,
}

impl JavaConstant {
    pub fn kind(self) -> ValueKind {
        match self {
            JavaConstant::Boolean(_) => ValueKind::Boolean,
            JavaConstant::Byte(_) => ValueKind::Byte,
            JavaConstant::Short(_) => ValueKind::Short,
            JavaConstant::Char(_) => ValueKind::Char,
            JavaConstant::Int(_) => ValueKind::Int,
            JavaConstant::Long(_) => ValueKind::Long,
            JavaConstant::Float(_) => ValueKind::Float,
            JavaConstant::Double(_) => ValueKind::Double,
            JavaConstant::Object(_) | JavaConstant::Null => ValueKind::Object,
        }
    }

    pub fn is_null(self) -> bool {
        matches!(self, JavaConstant::Null)
    }
}

/// Runtime-internal constant. `compressed` marks the narrow encoding
/// used when compressed pointers are enabled.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum VmConstant {
    Method { method: MethodId, compressed: bool },
    Class { class: ClassId, compressed: bool },
}

impl VmConstant {
    pub fn is_compressed(self) -> bool {
        match self {
            VmConstant::Method { compressed, .. } => compressed,
            VmConstant::Class { compressed, .. } => compressed,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Constant {
    Java(JavaConstant),
    Vm(VmConstant),
}

/// Location of a value as seen by the deoptimizer and the GC.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Value {
    Register { register: Register, kind: ValueKind },
    StackSlot { slot: StackSlot, kind: ValueKind },
    Constant(Constant),
    VirtualRef(VirtualObjectId),
    Illegal,
}

impl Value {
    pub fn register(register: Register, kind: ValueKind) -> Value {
        Value::Register { register, kind }
    }

    pub fn stack_slot(slot: StackSlot, kind: ValueKind) -> Value {
        Value::StackSlot { slot, kind }
    }

    pub fn constant(constant: JavaConstant) -> Value {
        Value::Constant(Constant::Java(constant))
    }

    pub fn is_illegal(&self) -> bool {
        matches!(self, Value::Illegal)
    }
}
