use std::sync::Arc;

use graft_code::{CompiledCode, Infopoint, InfopointReason, Mark, MarkKind, Site, StackSlot};

use crate::code::{
    Code, CodeKind, CommentTable, DataImage, InfopointEntry, InfopointTable, MarkTable,
    OopMapTable, CODE_ALIGNMENT,
};
use crate::error::{InstallError, Result};
use crate::install::data_section::{
    build_data_image, validate_alignment, validate_data_patches, validate_patch,
};
use crate::install::frames::validate_debug_info;
use crate::install::oop_map::{build_oop_map, validate_reference_map};
use crate::mem;
use crate::runtime::Runtime;

mod data_section;
mod frames;
mod oop_map;

/// Installs a validated `CompiledCode` unit into the runtime's code
/// cache.
pub fn install_code(runtime: &Runtime, code: &CompiledCode, kind: CodeKind) -> Result<Arc<Code>> {
    CodeInstaller::new(runtime).install(code, kind)
}

/// The installation-time validation boundary: a unit is checked as a
/// whole and either committed to the code cache or rejected without
/// side effects. Validation itself is pure; only the final commit
/// takes locks.
pub struct CodeInstaller<'a> {
    runtime: &'a Runtime,
}

impl<'a> CodeInstaller<'a> {
    pub fn new(runtime: &'a Runtime) -> CodeInstaller<'a> {
        CodeInstaller { runtime }
    }

    pub fn install(&self, code: &CompiledCode, kind: CodeKind) -> Result<Arc<Code>> {
        if let Err(error) = self.validate(code, &kind) {
            log::trace!("rejected compiled code {}: {}", code.name, error);
            return Err(error);
        }

        Ok(self.commit(code, kind))
    }

    fn validate(&self, code: &CompiledCode, kind: &CodeKind) -> Result<()> {
        let platform = &self.runtime.platform;

        validate_alignment(platform, &code.data_section)?;

        match *kind {
            CodeKind::Method(method) | CodeKind::Osr(method) => {
                if !self.runtime.methods.is_known(method) {
                    return Err(InstallError::UnknownMethod { method });
                }
            }
            CodeKind::Stub => {}
        }

        for &method in &code.methods {
            if !self.runtime.methods.is_known(method) {
                return Err(InstallError::UnknownMethod { method });
            }
        }

        validate_data_patches(self.runtime, platform, &code.data_section)?;

        for (index, site) in code.sites.iter().enumerate() {
            let site = site.as_ref().ok_or(InstallError::NullSite { index })?;

            match site {
                Site::Patch(patch) => {
                    validate_patch(self.runtime, platform, code.data_section.len(), patch)?;
                }
                Site::Mark(mark) => validate_mark(mark)?,
                Site::Infopoint(_) => {}
            }
        }

        // the installed side tables key strictly by offset
        validate_site_offsets(&code.sites)?;

        for site in code.sites.iter().flatten() {
            if let Site::Infopoint(infopoint) = site {
                self.validate_infopoint(infopoint, code.deopt_rescue_slot)?;
            }
        }

        Ok(())
    }

    fn validate_infopoint(
        &self,
        infopoint: &Infopoint,
        deopt_rescue_slot: Option<StackSlot>,
    ) -> Result<()> {
        let platform = &self.runtime.platform;
        let offset = infopoint.offset;

        match infopoint.reason {
            InfopointReason::MethodStart => {
                let debug_info = infopoint
                    .debug_info
                    .as_ref()
                    .ok_or(InstallError::MissingDebugInfo { offset })?;
                validate_debug_info(platform, debug_info)?;

                if let Some(map) = &debug_info.reference_map {
                    validate_reference_map(platform, map)?;
                }

                Ok(())
            }

            InfopointReason::Safepoint => {
                let debug_info = infopoint
                    .debug_info
                    .as_ref()
                    .ok_or(InstallError::MissingDebugInfo { offset })?;

                // without a frame to rebuild, deopt needs the rescue
                // slot to transfer control out of this code
                if !debug_info.has_frames() && deopt_rescue_slot.is_none() {
                    return Err(InstallError::MissingDeoptRescueSlot { offset });
                }

                validate_debug_info(platform, debug_info)?;

                let map = debug_info
                    .reference_map
                    .as_ref()
                    .ok_or(InstallError::MissingReferenceMap { offset })?;
                validate_reference_map(platform, map)
            }

            InfopointReason::Call
            | InfopointReason::ImplicitException
            | InfopointReason::MethodEnd => {
                if let Some(debug_info) = &infopoint.debug_info {
                    validate_debug_info(platform, debug_info)?;

                    if let Some(map) = &debug_info.reference_map {
                        validate_reference_map(platform, map)?;
                    }
                }

                Ok(())
            }
        }
    }

    fn commit(&self, code: &CompiledCode, kind: CodeKind) -> Arc<Code> {
        let platform = &self.runtime.platform;

        let data_size = mem::align_usize_up(code.data_section.len(), CODE_ALIGNMENT);
        let code_size = mem::align_usize_up(code.code.len(), CODE_ALIGNMENT);
        let object_size = (data_size + code_size).max(CODE_ALIGNMENT);

        let object_start = self.runtime.code_arena.alloc(object_size);
        let object_end = object_start.offset(object_size);
        let instruction_start = object_start.offset(data_size);

        let data_bytes = build_data_image(self.runtime, platform, &code.data_section, object_start);

        let mut sites: Vec<&Site> = code.sites.iter().flatten().collect();
        sites.sort_by_key(|site| site.offset());

        let mut oop_maps = OopMapTable::new();
        let mut marks = MarkTable::new();
        let mut infopoints = InfopointTable::new();

        for site in sites {
            match site {
                Site::Mark(mark) => {
                    let mark_kind = MarkKind::try_from(mark.id as u8).expect("validated");
                    marks.insert(mark.offset, mark_kind);
                }

                Site::Infopoint(infopoint) => {
                    if infopoint.reason == InfopointReason::Safepoint {
                        let debug_info = infopoint.debug_info.as_ref().expect("validated");
                        let map = debug_info.reference_map.as_ref().expect("validated");
                        oop_maps
                            .insert(infopoint.offset, build_oop_map(platform, map, code.frame_size));
                    }

                    infopoints.insert(
                        infopoint.offset,
                        InfopointEntry {
                            reason: infopoint.reason,
                            debug_info: infopoint.debug_info.clone(),
                        },
                    );
                }

                Site::Patch(_) => {}
            }
        }

        let mut comments = CommentTable::new();
        let mut sorted_comments = code.comments.clone();
        sorted_comments.sort_by_key(|comment| comment.offset);

        for comment in sorted_comments {
            comments.insert(comment.offset, comment.text);
        }

        let code_object = Arc::new(Code::new(
            code.name.clone(),
            kind.clone(),
            code.id,
            object_start,
            instruction_start,
            object_end,
            code.code.clone().into_boxed_slice(),
            DataImage {
                bytes: data_bytes.into_boxed_slice(),
                alignment: code.data_section.alignment,
            },
            oop_maps,
            comments,
            marks,
            infopoints,
            code.methods.clone(),
            code.frame_size,
            code.deopt_rescue_slot,
        ));

        let code_id = self.runtime.code_objects.add(code_object.clone());

        match kind {
            CodeKind::Method(method) | CodeKind::Osr(method) => {
                self.runtime.methods.set_installed_code(method, code_id);
            }
            CodeKind::Stub => {}
        }

        log::debug!(
            "installed {} ({} bytes code, {} bytes data) at {:?}",
            code_object.name(),
            code.code.len(),
            code.data_section.len(),
            instruction_start,
        );

        code_object
    }
}

fn validate_site_offsets(sites: &[Option<Site>]) -> Result<()> {
    let mut infopoints = Vec::new();
    let mut marks = Vec::new();

    for site in sites.iter().flatten() {
        match site {
            Site::Infopoint(infopoint) => infopoints.push(infopoint.offset),
            Site::Mark(mark) => marks.push(mark.offset),
            Site::Patch(_) => {}
        }
    }

    infopoints.sort_unstable();
    if let Some(pair) = infopoints.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(InstallError::DuplicateInfopoint { offset: pair[0] });
    }

    marks.sort_unstable();
    if let Some(pair) = marks.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(InstallError::DuplicateMark { offset: pair[0] });
    }

    Ok(())
}

fn validate_mark(mark: &Mark) -> Result<()> {
    let valid = u8::try_from(mark.id)
        .ok()
        .and_then(|raw| MarkKind::try_from(raw).ok())
        .is_some();

    if !valid {
        return Err(InstallError::InvalidMark {
            offset: mark.offset,
            id: mark.id,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_site_offsets() {
        let sites = vec![
            Some(Site::Infopoint(Infopoint {
                offset: 4,
                reason: InfopointReason::Call,
                debug_info: None,
            })),
            Some(Site::Infopoint(Infopoint {
                offset: 4,
                reason: InfopointReason::Safepoint,
                debug_info: None,
            })),
        ];

        assert_eq!(
            validate_site_offsets(&sites),
            Err(InstallError::DuplicateInfopoint { offset: 4 })
        );

        let sites = vec![
            Some(Site::Mark(Mark { offset: 0, id: 0 })),
            Some(Site::Mark(Mark { offset: 0, id: 1 })),
        ];

        assert_eq!(
            validate_site_offsets(&sites),
            Err(InstallError::DuplicateMark { offset: 0 })
        );
    }

    #[test]
    fn test_mark_validation() {
        assert!(validate_mark(&Mark { offset: 0, id: 0 }).is_ok());
        assert!(validate_mark(&Mark { offset: 0, id: -1 }).is_err());
        assert!(validate_mark(&Mark { offset: 0, id: 255 }).is_err());
        assert!(validate_mark(&Mark {
            offset: 0,
            id: i64::MAX
        })
        .is_err());
    }
}
