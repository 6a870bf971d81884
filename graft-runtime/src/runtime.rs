use parking_lot::Mutex;

use graft_code::{ClassId, Constant, JavaConstant, ObjectId, VmConstant};

use crate::arena::CodeArena;
use crate::code::CodeObjects;
use crate::methods::MethodTable;
use crate::platform::Platform;

const DEFAULT_CODE_LIMIT: usize = 128 * 1024 * 1024;

// Synthetic address bases for resolved constants. Real pointers come
// from the heap and metaspace; these only have to be stable and
// distinguishable per id.
const OBJECT_BASE: u64 = 0x7000_0000_0000;
const CLASS_BASE: u64 = 0x7100_0000_0000;
const METHOD_BASE: u64 = 0x7200_0000_0000;

/// Class registry; every class referenced by constants, assumptions or
/// virtual objects must be known here.
pub struct ClassTable {
    names: Mutex<Vec<String>>,
}

impl ClassTable {
    pub fn new() -> ClassTable {
        ClassTable {
            names: Mutex::new(Vec::new()),
        }
    }

    pub fn add_class(&self, name: impl Into<String>) -> ClassId {
        let mut names = self.names.lock();
        let id = ClassId(names.len() as u32);
        names.push(name.into());
        id
    }

    pub fn is_known(&self, class: ClassId) -> bool {
        (class.0 as usize) < self.names.lock().len()
    }

    pub fn name(&self, class: ClassId) -> Option<String> {
        self.names.lock().get(class.0 as usize).cloned()
    }
}

/// Handles for heap objects pinned while compiled code references
/// them.
pub struct ObjectTable {
    count: Mutex<u32>,
}

impl ObjectTable {
    pub fn new() -> ObjectTable {
        ObjectTable {
            count: Mutex::new(0),
        }
    }

    pub fn pin(&self) -> ObjectId {
        let mut count = self.count.lock();
        let id = ObjectId(*count);
        *count += 1;
        id
    }

    pub fn is_known(&self, object: ObjectId) -> bool {
        object.0 < *self.count.lock()
    }
}

/// Maps constants (including narrow encodings) to the canonical image
/// written into a data section slot.
pub trait ConstantResolver {
    /// Full pointer-width image, `None` when the constant does not
    /// resolve to a known backing value.
    fn resolve_word(&self, constant: &Constant) -> Option<u64>;

    /// Narrow (compressed) image of an object or class constant.
    fn resolve_narrow(&self, constant: &Constant) -> Option<u32>;
}

/// The runtime pieces the installer works against: platform
/// description, code arena, code cache, and the identity tables.
pub struct Runtime {
    pub platform: Platform,
    pub code_arena: CodeArena,
    pub code_objects: CodeObjects,
    pub methods: MethodTable,
    pub classes: ClassTable,
    pub objects: ObjectTable,
}

impl Runtime {
    pub fn new(platform: Platform) -> Runtime {
        Runtime {
            platform,
            code_arena: CodeArena::new(DEFAULT_CODE_LIMIT),
            code_objects: CodeObjects::new(),
            methods: MethodTable::new(),
            classes: ClassTable::new(),
            objects: ObjectTable::new(),
        }
    }
}

impl ConstantResolver for Runtime {
    fn resolve_word(&self, constant: &Constant) -> Option<u64> {
        match *constant {
            Constant::Java(JavaConstant::Null) => Some(0),
            Constant::Java(JavaConstant::Object(object)) => {
                if self.objects.is_known(object) {
                    Some(OBJECT_BASE + object.0 as u64 * 8)
                } else {
                    None
                }
            }
            Constant::Java(JavaConstant::Long(value)) => Some(value as u64),
            Constant::Java(JavaConstant::Double(value)) => Some(value.to_bits()),
            Constant::Java(JavaConstant::Int(value)) => Some(value as u32 as u64),
            Constant::Java(JavaConstant::Float(value)) => Some(value.to_bits() as u64),
            Constant::Java(JavaConstant::Boolean(value)) => Some(value as u64),
            Constant::Java(JavaConstant::Byte(value)) => Some(value as u8 as u64),
            Constant::Java(JavaConstant::Short(value)) => Some(value as u16 as u64),
            Constant::Java(JavaConstant::Char(value)) => Some(value as u64),
            Constant::Vm(VmConstant::Class { class, .. }) => {
                if self.classes.is_known(class) {
                    Some(CLASS_BASE + class.0 as u64 * 8)
                } else {
                    None
                }
            }
            Constant::Vm(VmConstant::Method { method, .. }) => {
                if self.methods.is_known(method) {
                    Some(METHOD_BASE + method.0 as u64 * 8)
                } else {
                    None
                }
            }
        }
    }

    fn resolve_narrow(&self, constant: &Constant) -> Option<u32> {
        self.resolve_word(constant)
            .map(|word| (word >> 3) as u32)
    }
}
