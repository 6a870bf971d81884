use graft_code::{RefMapLocation, ReferenceMap, RegisterCategory, ValueKind};

use crate::code::OopMap;
use crate::error::{InstallError, Result};
use crate::platform::Platform;

pub(crate) fn validate_reference_map(platform: &Platform, map: &ReferenceMap) -> Result<()> {
    if map.oops.len() != map.base.len() || map.oops.len() != map.size.len() {
        return Err(InstallError::InvalidReferenceMapLength {
            oops: map.oops.len(),
            base: map.base.len(),
            size: map.size.len(),
        });
    }

    for index in 0..map.oops.len() {
        let oop = map.oops[index].ok_or(InstallError::NullReferenceMapEntry { index })?;
        map.base[index].ok_or(InstallError::NullReferenceMapEntry { index })?;

        let size = map.size[index];

        if size < platform.pointer_width() as i32 {
            return Err(InstallError::InvalidNarrowOop { index, size });
        }

        match oop {
            RefMapLocation::Register(register) => match platform.register_category(register) {
                None => return Err(InstallError::UnknownRegister { register }),
                Some(RegisterCategory::Float) => {
                    // float registers never hold traced references
                    return Err(InstallError::KindMismatch {
                        index,
                        declared: ValueKind::Object,
                        found: ValueKind::Float,
                    });
                }
                Some(RegisterCategory::Integer) => {}
            },

            // slots above the frame base would have no word in the bitset
            RefMapLocation::StackSlot(offset) => {
                if offset < 0 {
                    return Err(InstallError::NegativeStackOffset { index, offset });
                }
            }
        }
    }

    Ok(())
}

/// Compresses a validated reference map into the bitset form stored
/// with the installed code.
pub(crate) fn build_oop_map(platform: &Platform, map: &ReferenceMap, frame_size: u32) -> OopMap {
    let ptr_width = platform.pointer_width() as usize;
    let stack_words = (frame_size as usize) / ptr_width + 1;
    let mut oop_map = OopMap::new(platform.register_count(), stack_words);

    for index in 0..map.oops.len() {
        let oop = map.oops[index].expect("validated");
        let base = map.base[index].expect("validated");
        let derived = oop != base;

        set_location(&mut oop_map, oop, derived, ptr_width);
    }

    oop_map
}

fn set_location(oop_map: &mut OopMap, location: RefMapLocation, derived: bool, ptr_width: usize) {
    match location {
        RefMapLocation::Register(register) => {
            oop_map.registers.insert(register.to_usize());

            if derived {
                oop_map.derived_registers.insert(register.to_usize());
            }
        }

        RefMapLocation::StackSlot(offset) => {
            debug_assert!(offset >= 0);
            let word = offset as usize / ptr_width;

            if word >= oop_map.stack.len() {
                oop_map.stack.grow(word + 1);
                oop_map.derived_stack.grow(word + 1);
            }

            oop_map.stack.insert(word);

            if derived {
                oop_map.derived_stack.insert(word);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_code::Register;

    #[test]
    fn test_parallel_array_lengths() {
        let platform = Platform::x64();
        let map = ReferenceMap {
            oops: vec![Some(RefMapLocation::Register(Register(0)))],
            base: vec![
                Some(RefMapLocation::Register(Register(0))),
                Some(RefMapLocation::Register(Register(1))),
            ],
            size: vec![8, 8, 8],
        };

        assert_eq!(
            validate_reference_map(&platform, &map),
            Err(InstallError::InvalidReferenceMapLength {
                oops: 1,
                base: 2,
                size: 3
            })
        );
    }

    #[test]
    fn test_narrow_entry_rejected() {
        let platform = Platform::x64();
        let mut map = ReferenceMap::new();
        map.push(RefMapLocation::Register(Register(0)), 2);

        assert_eq!(
            validate_reference_map(&platform, &map),
            Err(InstallError::InvalidNarrowOop { index: 0, size: 2 })
        );
    }

    #[test]
    fn test_null_entry_rejected() {
        let platform = Platform::x64();
        let map = ReferenceMap {
            oops: vec![None],
            base: vec![Some(RefMapLocation::StackSlot(0))],
            size: vec![8],
        };

        assert_eq!(
            validate_reference_map(&platform, &map),
            Err(InstallError::NullReferenceMapEntry { index: 0 })
        );
    }

    #[test]
    fn test_negative_stack_offset_rejected() {
        let platform = Platform::x64();
        let mut map = ReferenceMap::new();
        map.push(RefMapLocation::StackSlot(-8), 8);

        assert_eq!(
            validate_reference_map(&platform, &map),
            Err(InstallError::NegativeStackOffset {
                index: 0,
                offset: -8
            })
        );
    }

    #[test]
    fn test_float_register_rejected() {
        let platform = Platform::x64();
        let xmm = platform.first_float_register();
        let mut map = ReferenceMap::new();
        map.push(RefMapLocation::Register(xmm), 8);

        assert!(matches!(
            validate_reference_map(&platform, &map),
            Err(InstallError::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_build_bitsets() {
        let platform = Platform::x64();
        let mut map = ReferenceMap::new();
        map.push(RefMapLocation::Register(Register(3)), 8);
        map.push(RefMapLocation::StackSlot(16), 8);

        // derived pointer with a distinct base
        map.oops.push(Some(RefMapLocation::Register(Register(5))));
        map.base.push(Some(RefMapLocation::Register(Register(6))));
        map.size.push(8);

        assert!(validate_reference_map(&platform, &map).is_ok());

        let oop_map = build_oop_map(&platform, &map, 64);
        assert!(oop_map.registers.contains(3));
        assert!(oop_map.stack.contains(2));
        assert!(oop_map.registers.contains(5));
        assert!(oop_map.derived_registers.contains(5));
        assert!(!oop_map.derived_registers.contains(3));
    }
}
