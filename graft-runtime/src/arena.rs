use parking_lot::Mutex;

use crate::code::CODE_ALIGNMENT;
use crate::mem;

/// Address inside the runtime's code range.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    pub fn from(value: usize) -> Address {
        Address(value)
    }

    pub fn null() -> Address {
        Address(0)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self, offset: usize) -> Address {
        Address(self.0 + offset)
    }

    pub fn offset_from(self, base: Address) -> usize {
        debug_assert!(self >= base);
        self.0 - base.0
    }

    pub fn to_usize(self) -> usize {
        self.0
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Bump allocator handing out aligned address ranges for installed
/// code objects. Entries live until the whole arena is dropped; an
/// installed unit is invalidated by its owner, never collected behind
/// its back.
pub struct CodeArena {
    start: Address,
    end: Address,
    top: Mutex<Address>,
}

const ARENA_BASE: usize = 0x4000_0000;

impl CodeArena {
    pub fn new(limit: usize) -> CodeArena {
        let start = Address::from(ARENA_BASE);

        CodeArena {
            start,
            end: start.offset(limit),
            top: Mutex::new(start),
        }
    }

    pub fn alloc(&self, size: usize) -> Address {
        debug_assert!(size > 0);

        let mut top = self.top.lock();
        let aligned_size = mem::align_usize_up(size, CODE_ALIGNMENT);

        if top.offset(aligned_size) > self.end {
            panic!("OOM in code space");
        }

        let object_address = *top;
        *top = top.offset(aligned_size);
        object_address
    }

    pub fn allocated_size(&self) -> usize {
        self.top.lock().offset_from(self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_aligned() {
        let arena = CodeArena::new(4096);
        let first = arena.alloc(17);
        let second = arena.alloc(1);

        assert!(mem::is_aligned(first.to_usize(), CODE_ALIGNMENT));
        assert!(mem::is_aligned(second.to_usize(), CODE_ALIGNMENT));
        assert_eq!(second.offset_from(first), 32);
    }

    #[test]
    #[should_panic]
    fn test_alloc_exhausted() {
        let arena = CodeArena::new(64);
        arena.alloc(48);
        arena.alloc(48);
    }
}
