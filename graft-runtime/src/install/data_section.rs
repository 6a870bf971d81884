use byteorder::{ByteOrder, LittleEndian};

use graft_code::{Constant, DataPatch, DataSection, Reference, VmConstant};

use crate::arena::Address;
use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::runtime::ConstantResolver;

pub(crate) fn validate_alignment(platform: &Platform, section: &DataSection) -> Result<()> {
    let alignment = section.alignment;
    let max = platform.heap_word_size() * 2;

    if alignment == 0 || !alignment.is_power_of_two() || alignment > max {
        return Err(InstallError::InvalidDataSectionAlignment(alignment));
    }

    Ok(())
}

pub(crate) fn validate_data_patches(
    resolver: &dyn ConstantResolver,
    platform: &Platform,
    section: &DataSection,
) -> Result<()> {
    for (index, patch) in section.patches.iter().enumerate() {
        let patch = patch.as_ref().ok_or(InstallError::NullSite { index })?;

        // the patched slot itself must fit into the section
        let slot_end = patch.offset as usize + patch_size(platform, patch);
        if slot_end > section.len() {
            return Err(InstallError::OutOfBoundsDataSectionReference {
                offset: patch.offset,
                size: section.len(),
            });
        }

        validate_patch(resolver, platform, section.len(), patch)?;
    }

    Ok(())
}

pub(crate) fn validate_patch(
    resolver: &dyn ConstantResolver,
    platform: &Platform,
    data_len: usize,
    patch: &DataPatch,
) -> Result<()> {
    let reference = patch
        .reference
        .as_ref()
        .ok_or(InstallError::MissingReference {
            offset: patch.offset,
        })?;

    validate_reference(resolver, platform, data_len, patch.offset, reference)
}

pub(crate) fn validate_reference(
    resolver: &dyn ConstantResolver,
    platform: &Platform,
    data_len: usize,
    offset: u32,
    reference: &Reference,
) -> Result<()> {
    match *reference {
        Reference::DataSection { offset: target } => {
            if (target as usize) < data_len {
                Ok(())
            } else {
                Err(InstallError::OutOfBoundsDataSectionReference {
                    offset: target,
                    size: data_len,
                })
            }
        }

        Reference::Constant(ref constant) => {
            validate_constant_reference(resolver, platform, offset, constant)
        }
    }
}

fn validate_constant_reference(
    resolver: &dyn ConstantResolver,
    platform: &Platform,
    offset: u32,
    constant: &Constant,
) -> Result<()> {
    if let Constant::Vm(vm) = constant {
        if vm.is_compressed() {
            match vm {
                VmConstant::Method { .. } => {
                    // methods only exist in their full encoding
                    return Err(InstallError::InvalidNarrowMethodConstant { offset });
                }
                VmConstant::Class { .. } => {
                    if !platform.compressed_oops() {
                        return Err(InstallError::UnsupportedNarrowReference { offset });
                    }

                    return resolver
                        .resolve_narrow(constant)
                        .map(|_| ())
                        .ok_or(InstallError::InvalidConstant { offset });
                }
            }
        }
    }

    resolver
        .resolve_word(constant)
        .map(|_| ())
        .ok_or(InstallError::InvalidConstant { offset })
}

/// Applies every patch to a copy of the section bytes. Only called
/// after validation, so all lookups are infallible here.
pub(crate) fn build_data_image(
    resolver: &dyn ConstantResolver,
    platform: &Platform,
    section: &DataSection,
    data_start: Address,
) -> Vec<u8> {
    let mut bytes = section.bytes.clone();

    for patch in section.patches.iter().flatten() {
        let offset = patch.offset as usize;
        let reference = patch.reference.as_ref().expect("validated");

        match *reference {
            Reference::DataSection { offset: target } => {
                let address = data_start.offset(target as usize).to_usize() as u64;
                LittleEndian::write_u64(&mut bytes[offset..offset + 8], address);
            }

            Reference::Constant(ref constant) => {
                write_constant(resolver, platform, &mut bytes[offset..], constant);
            }
        }
    }

    bytes
}

fn write_constant(
    resolver: &dyn ConstantResolver,
    platform: &Platform,
    slot: &mut [u8],
    constant: &Constant,
) {
    if let Constant::Vm(vm) = constant {
        if vm.is_compressed() {
            let narrow = resolver.resolve_narrow(constant).expect("validated");
            LittleEndian::write_u32(&mut slot[..4], narrow);
            return;
        }
    }

    let word = resolver.resolve_word(constant).expect("validated");

    match constant_size(platform, constant) {
        1 => slot[0] = word as u8,
        2 => LittleEndian::write_u16(&mut slot[..2], word as u16),
        4 => LittleEndian::write_u32(&mut slot[..4], word as u32),
        _ => LittleEndian::write_u64(&mut slot[..8], word),
    }
}

fn patch_size(platform: &Platform, patch: &DataPatch) -> usize {
    match patch.reference {
        Some(Reference::Constant(ref constant)) => {
            if let Constant::Vm(vm) = constant {
                if vm.is_compressed() {
                    return 4;
                }
            }
            constant_size(platform, constant)
        }
        Some(Reference::DataSection { .. }) => platform.pointer_width() as usize,
        None => 0,
    }
}

fn constant_size(platform: &Platform, constant: &Constant) -> usize {
    match *constant {
        Constant::Java(java) => java.kind().size_in_bytes(platform.pointer_width()) as usize,
        Constant::Vm(_) => platform.pointer_width() as usize,
    }
}
