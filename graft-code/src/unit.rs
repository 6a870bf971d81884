use crate::assumption::Assumption;
use crate::data::{MethodId, StackSlot};
use crate::site::{CodeComment, DataSection, Site};

/// One unit of machine code plus all side tables, built by a compiler
/// backend and submitted to the installer as a whole. The installer
/// either accepts the complete unit or rejects it; there is no
/// partially installed state.
#[derive(Clone, PartialEq, Debug)]
pub struct CompiledCode {
    pub name: String,
    pub id: u64,
    pub entry_bci: i32,
    pub code: Vec<u8>,
    pub frame_size: u32,
    pub sites: Vec<Option<Site>>,
    pub assumptions: Vec<Assumption>,
    pub comments: Vec<CodeComment>,
    pub methods: Vec<MethodId>,
    pub data_section: DataSection,
    pub is_immutable_pic: bool,
    pub speculations: Vec<u8>,
    pub failed_speculations_address: u64,
    pub deopt_rescue_slot: Option<StackSlot>,
}

impl CompiledCode {
    pub fn code_size(&self) -> usize {
        self.code.len()
    }
}
