use std::fmt;
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use parking_lot::RwLock;

use graft_code::{DebugInfo, InfopointReason, MarkKind, MethodId, StackSlot};

use crate::arena::Address;

pub const CODE_ALIGNMENT: usize = 16;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CodeId(usize);

impl CodeId {
    pub fn idx(self) -> usize {
        self.0
    }
}

impl From<usize> for CodeId {
    fn from(data: usize) -> CodeId {
        CodeId(data)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum CodeKind {
    Method(MethodId),
    Osr(MethodId),
    Stub,
}

/// Installed unit: immutable machine code plus the side tables the
/// runtime consults at safepoints. Owned by the code cache via `Arc`.
#[derive(PartialEq)]
pub struct Code {
    name: String,
    kind: CodeKind,
    compilation_id: u64,

    object_start: Address,
    object_end: Address,
    instruction_start: Address,

    instructions: Box<[u8]>,
    data_section: DataImage,

    oop_maps: OopMapTable,
    comments: CommentTable,
    marks: MarkTable,
    infopoints: InfopointTable,

    methods: Vec<MethodId>,
    frame_size: u32,
    deopt_rescue_slot: Option<StackSlot>,
}

impl Code {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        kind: CodeKind,
        compilation_id: u64,
        object_start: Address,
        instruction_start: Address,
        object_end: Address,
        instructions: Box<[u8]>,
        data_section: DataImage,
        oop_maps: OopMapTable,
        comments: CommentTable,
        marks: MarkTable,
        infopoints: InfopointTable,
        methods: Vec<MethodId>,
        frame_size: u32,
        deopt_rescue_slot: Option<StackSlot>,
    ) -> Code {
        Code {
            name,
            kind,
            compilation_id,
            object_start,
            object_end,
            instruction_start,
            instructions,
            data_section,
            oop_maps,
            comments,
            marks,
            infopoints,
            methods,
            frame_size,
            deopt_rescue_slot,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CodeKind {
        self.kind.clone()
    }

    pub fn compilation_id(&self) -> u64 {
        self.compilation_id
    }

    pub fn method_id(&self) -> MethodId {
        match self.kind {
            CodeKind::Method(method) | CodeKind::Osr(method) => method,
            CodeKind::Stub => panic!("stub code has no method"),
        }
    }

    pub fn object_start(&self) -> Address {
        self.object_start
    }

    pub fn object_end(&self) -> Address {
        self.object_end
    }

    pub fn instruction_start(&self) -> Address {
        self.instruction_start
    }

    pub fn instruction_end(&self) -> Address {
        self.instruction_start.offset(self.instructions.len())
    }

    pub fn instructions(&self) -> &[u8] {
        &self.instructions
    }

    pub fn data_section(&self) -> &DataImage {
        &self.data_section
    }

    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }

    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    pub fn deopt_rescue_slot(&self) -> Option<StackSlot> {
        self.deopt_rescue_slot
    }

    pub fn oop_map_for_offset(&self, offset: u32) -> Option<&OopMap> {
        self.oop_maps.get(offset)
    }

    pub fn comments_for_offset(&self, offset: u32) -> Vec<&String> {
        self.comments.get(offset)
    }

    pub fn mark_for_offset(&self, offset: u32) -> Option<MarkKind> {
        self.marks.get(offset)
    }

    pub fn offset_for_mark(&self, kind: MarkKind) -> Option<u32> {
        self.marks.find(kind)
    }

    pub fn infopoint_for_offset(&self, offset: u32) -> Option<&InfopointEntry> {
        self.infopoints.get(offset)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Code {{ name: {}, start: {:?}, end: {:?}, kind: {:?} }}",
            self.name,
            self.object_start(),
            self.object_end(),
            self.kind,
        )
    }
}

/// Resolved data section as installed: all patches applied, padding in
/// place.
#[derive(PartialEq, Debug)]
pub struct DataImage {
    pub bytes: Box<[u8]>,
    pub alignment: u32,
}

/// Which machine locations hold object references at one safepoint.
/// Registers are indexed by their platform number, stack slots by
/// frame word.
#[derive(Clone, PartialEq, Debug)]
pub struct OopMap {
    pub registers: FixedBitSet,
    pub stack: FixedBitSet,
    pub derived_registers: FixedBitSet,
    pub derived_stack: FixedBitSet,
}

impl OopMap {
    pub fn new(register_count: usize, stack_words: usize) -> OopMap {
        OopMap {
            registers: FixedBitSet::with_capacity(register_count),
            stack: FixedBitSet::with_capacity(stack_words),
            derived_registers: FixedBitSet::with_capacity(register_count),
            derived_stack: FixedBitSet::with_capacity(stack_words),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.registers.count_ones(..) == 0 && self.stack.count_ones(..) == 0
    }
}

#[derive(PartialEq, Debug)]
pub struct OopMapTable {
    entries: Vec<(u32, OopMap)>,
}

impl OopMapTable {
    pub fn new() -> OopMapTable {
        OopMapTable {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, offset: u32, oop_map: OopMap) {
        if let Some(last) = self.entries.last() {
            debug_assert!(offset > last.0);
        }

        self.entries.push((offset, oop_map));
    }

    pub fn get(&self, offset: u32) -> Option<&OopMap> {
        let result = self
            .entries
            .binary_search_by_key(&offset, |&(offset, _)| offset);

        match result {
            Ok(idx) => Some(&self.entries[idx].1),
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(PartialEq)]
pub struct CommentTable {
    entries: Vec<(u32, String)>,
}

impl CommentTable {
    pub fn new() -> CommentTable {
        CommentTable {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, offset: u32) -> Vec<&String> {
        let result = self
            .entries
            .binary_search_by_key(&offset, |&(offset, _)| offset);

        match result {
            Ok(mut idx) => {
                // rewind to the first comment with this offset
                while idx > 0 && self.entries[idx - 1].0 == offset {
                    idx -= 1;
                }

                let mut comments = Vec::new();
                while idx < self.entries.len() && self.entries[idx].0 == offset {
                    comments.push(&self.entries[idx].1);
                    idx += 1;
                }
                comments
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn insert(&mut self, offset: u32, comment: String) {
        if let Some(last) = self.entries.last() {
            debug_assert!(offset >= last.0);
        }

        self.entries.push((offset, comment));
    }
}

#[derive(PartialEq, Debug)]
pub struct MarkTable {
    entries: Vec<(u32, MarkKind)>,
}

impl MarkTable {
    pub fn new() -> MarkTable {
        MarkTable {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, offset: u32, kind: MarkKind) {
        if let Some(last) = self.entries.last() {
            debug_assert!(offset >= last.0);
        }

        self.entries.push((offset, kind));
    }

    pub fn get(&self, offset: u32) -> Option<MarkKind> {
        let result = self
            .entries
            .binary_search_by_key(&offset, |&(offset, _)| offset);

        match result {
            Ok(idx) => Some(self.entries[idx].1),
            Err(_) => None,
        }
    }

    pub fn find(&self, kind: MarkKind) -> Option<u32> {
        self.entries
            .iter()
            .find(|&&(_, entry)| entry == kind)
            .map(|&(offset, _)| offset)
    }
}

#[derive(PartialEq, Debug)]
pub struct InfopointEntry {
    pub reason: InfopointReason,
    pub debug_info: Option<DebugInfo>,
}

#[derive(PartialEq, Debug)]
pub struct InfopointTable {
    entries: Vec<(u32, InfopointEntry)>,
}

impl InfopointTable {
    pub fn new() -> InfopointTable {
        InfopointTable {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, offset: u32, entry: InfopointEntry) {
        if let Some(last) = self.entries.last() {
            debug_assert!(offset >= last.0);
        }

        self.entries.push((offset, entry));
    }

    pub fn get(&self, offset: u32) -> Option<&InfopointEntry> {
        let result = self
            .entries
            .binary_search_by_key(&offset, |&(offset, _)| offset);

        match result {
            Ok(idx) => Some(&self.entries[idx].1),
            Err(_) => None,
        }
    }
}

/// Process-wide registry of installed code, the runtime's code cache.
pub struct CodeObjects {
    data: RwLock<Vec<Arc<Code>>>,
}

impl CodeObjects {
    pub fn new() -> CodeObjects {
        CodeObjects {
            data: RwLock::new(Vec::new()),
        }
    }

    pub fn get(&self, id: CodeId) -> Arc<Code> {
        let data = self.data.read();
        data[id.idx()].clone()
    }

    pub fn add(&self, object: Arc<Code>) -> CodeId {
        let mut data = self.data.write();
        let code_id: CodeId = data.len().into();
        data.push(object);
        code_id
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
