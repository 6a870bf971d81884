use byteorder::{LittleEndian, WriteBytesExt};

use crate::assumption::Assumption;
use crate::data::{Constant, MethodId, StackSlot};
use crate::debug::DebugInfo;
use crate::site::{
    CodeComment, DataPatch, DataSection, Infopoint, InfopointReason, Mark, MarkKind, Reference,
    Site,
};
use crate::unit::CompiledCode;

pub const DATA_SECTION_ALIGNMENT: u32 = 8;

/// Assembles a `CompiledCode` unit the way a backend emits it: code
/// bytes in order, sites keyed by the current position, constants
/// appended to the data section with a patch recorded at the use site.
pub struct CompiledCodeBuilder {
    name: String,
    id: u64,
    entry_bci: i32,
    code: Vec<u8>,
    frame_size: u32,
    sites: Vec<Option<Site>>,
    assumptions: Vec<Assumption>,
    comments: Vec<CodeComment>,
    methods: Vec<MethodId>,
    data_section: DataSection,
    is_immutable_pic: bool,
    speculations: Vec<u8>,
    failed_speculations_address: u64,
    deopt_rescue_slot: Option<StackSlot>,
}

impl CompiledCodeBuilder {
    pub fn new(name: impl Into<String>) -> CompiledCodeBuilder {
        CompiledCodeBuilder {
            name: name.into(),
            id: 0,
            entry_bci: -1,
            code: Vec::new(),
            frame_size: 0,
            sites: Vec::new(),
            assumptions: Vec::new(),
            comments: Vec::new(),
            methods: Vec::new(),
            data_section: DataSection::new(DATA_SECTION_ALIGNMENT),
            is_immutable_pic: false,
            speculations: Vec::new(),
            failed_speculations_address: 0,
            deopt_rescue_slot: None,
        }
    }

    pub fn pos(&self) -> u32 {
        self.code.len() as u32
    }

    pub fn emit_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn emit_u32(&mut self, value: u32) {
        self.code
            .write_u32::<LittleEndian>(value)
            .expect("write to vec");
    }

    pub fn emit_u64(&mut self, value: u64) {
        self.code
            .write_u64::<LittleEndian>(value)
            .expect("write to vec");
    }

    pub fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    pub fn set_entry_bci(&mut self, entry_bci: i32) {
        self.entry_bci = entry_bci;
    }

    pub fn set_frame_size(&mut self, frame_size: u32) {
        self.frame_size = frame_size;
    }

    pub fn set_immutable_pic(&mut self, value: bool) {
        self.is_immutable_pic = value;
    }

    pub fn set_deopt_rescue_slot(&mut self, slot: StackSlot) {
        self.deopt_rescue_slot = Some(slot);
    }

    pub fn set_data_section_alignment(&mut self, alignment: u32) {
        self.data_section.alignment = alignment;
    }

    pub fn set_speculations(&mut self, speculations: Vec<u8>, failed_address: u64) {
        self.speculations = speculations;
        self.failed_speculations_address = failed_address;
    }

    pub fn add_method(&mut self, method: MethodId) {
        self.methods.push(method);
    }

    pub fn add_assumption(&mut self, assumption: Assumption) {
        self.assumptions.push(assumption);
    }

    pub fn emit_comment(&mut self, text: impl Into<String>) {
        let offset = self.pos();
        self.comments.push(CodeComment {
            offset,
            text: text.into(),
        });
    }

    pub fn emit_mark(&mut self, kind: MarkKind) {
        let offset = self.pos();
        let id: u8 = kind.into();
        self.sites.push(Some(Site::Mark(Mark {
            offset,
            id: id as i64,
        })));
    }

    pub fn emit_infopoint(&mut self, reason: InfopointReason, debug_info: Option<DebugInfo>) {
        let offset = self.pos();
        self.sites.push(Some(Site::Infopoint(Infopoint {
            offset,
            reason,
            debug_info,
        })));
    }

    pub fn emit_safepoint(&mut self, debug_info: DebugInfo) {
        self.emit_infopoint(InfopointReason::Safepoint, Some(debug_info));
    }

    /// Records a patch at the current code position pointing at the
    /// given reference.
    pub fn emit_patch(&mut self, reference: Reference) {
        let offset = self.pos();
        self.sites
            .push(Some(Site::Patch(DataPatch::new(offset, reference))));
    }

    /// Appends an aligned slot of `size` bytes to the data section and
    /// returns a reference to it.
    pub fn add_data(&mut self, bytes: &[u8], alignment: u32) -> Reference {
        debug_assert!(alignment.is_power_of_two());

        while self.data_section.bytes.len() % alignment as usize != 0 {
            self.data_section.bytes.push(0);
        }

        let offset = self.data_section.bytes.len() as u32;
        self.data_section.bytes.extend_from_slice(bytes);
        Reference::DataSection { offset }
    }

    /// Reserves a pointer-sized data slot patched with `constant` at
    /// install time, returning the reference for use sites.
    pub fn add_data_constant(&mut self, constant: Constant, size: u32) -> Reference {
        let reference = self.add_data(&vec![0; size as usize], size.next_power_of_two());
        let offset = match reference {
            Reference::DataSection { offset } => offset,
            Reference::Constant(..) => unreachable!(),
        };
        self.data_section
            .patches
            .push(Some(DataPatch::new(offset, Reference::Constant(constant))));
        reference
    }

    /// Escape hatch for tests building intentionally broken units.
    pub fn push_raw_site(&mut self, site: Option<Site>) {
        self.sites.push(site);
    }

    pub fn push_raw_data_patch(&mut self, patch: Option<DataPatch>) {
        self.data_section.patches.push(patch);
    }

    pub fn finish(self) -> CompiledCode {
        CompiledCode {
            name: self.name,
            id: self.id,
            entry_bci: self.entry_bci,
            code: self.code,
            frame_size: self.frame_size,
            sites: self.sites,
            assumptions: self.assumptions,
            comments: self.comments,
            methods: self.methods,
            data_section: self.data_section,
            is_immutable_pic: self.is_immutable_pic,
            speculations: self.speculations,
            failed_speculations_address: self.failed_speculations_address,
            deopt_rescue_slot: self.deopt_rescue_slot,
        }
    }
}
