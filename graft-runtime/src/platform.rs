use graft_code::{Register, RegisterCategory, ValueKind};

/// Architecture description the installer checks value encodings
/// against: register categories and sizes, pointer width, and whether
/// compressed object pointers are in use.
pub struct Platform {
    name: &'static str,
    pointer_width: u32,
    compressed_oops: bool,
    registers: Vec<RegisterDescriptor>,
}

struct RegisterDescriptor {
    category: RegisterCategory,
    largest_size: u32,
}

const INTEGER_REGISTERS_X64: u16 = 16;
const FLOAT_REGISTERS_X64: u16 = 16;

const INTEGER_REGISTERS_ARM64: u16 = 31;
const FLOAT_REGISTERS_ARM64: u16 = 32;

impl Platform {
    pub fn x64() -> Platform {
        Platform::new("x64", 8, INTEGER_REGISTERS_X64, FLOAT_REGISTERS_X64)
    }

    pub fn arm64() -> Platform {
        Platform::new("arm64", 8, INTEGER_REGISTERS_ARM64, FLOAT_REGISTERS_ARM64)
    }

    pub fn host() -> Platform {
        if cfg!(target_arch = "aarch64") {
            Platform::arm64()
        } else {
            Platform::x64()
        }
    }

    fn new(name: &'static str, pointer_width: u32, int_regs: u16, float_regs: u16) -> Platform {
        let mut registers = Vec::with_capacity((int_regs + float_regs) as usize);

        for _ in 0..int_regs {
            registers.push(RegisterDescriptor {
                category: RegisterCategory::Integer,
                largest_size: pointer_width,
            });
        }

        for _ in 0..float_regs {
            registers.push(RegisterDescriptor {
                category: RegisterCategory::Float,
                largest_size: 16,
            });
        }

        Platform {
            name,
            pointer_width,
            compressed_oops: false,
            registers,
        }
    }

    pub fn with_compressed_oops(mut self, value: bool) -> Platform {
        self.compressed_oops = value;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pointer_width(&self) -> u32 {
        self.pointer_width
    }

    pub fn heap_word_size(&self) -> u32 {
        self.pointer_width
    }

    /// Whether narrow (compressed) object references are a valid
    /// encoding on this platform.
    pub fn compressed_oops(&self) -> bool {
        self.compressed_oops
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn register_category(&self, register: Register) -> Option<RegisterCategory> {
        self.registers
            .get(register.to_usize())
            .map(|descriptor| descriptor.category)
    }

    /// Checks that `register` can physically hold a value of `kind`.
    pub fn can_store_kind(&self, register: Register, kind: ValueKind) -> bool {
        let descriptor = match self.registers.get(register.to_usize()) {
            Some(descriptor) => descriptor,
            None => return false,
        };

        if kind == ValueKind::Illegal {
            return false;
        }

        let matches_category = match descriptor.category {
            RegisterCategory::Integer => !kind.is_float(),
            RegisterCategory::Float => kind.is_float(),
        };

        matches_category && kind.size_in_bytes(self.pointer_width) <= descriptor.largest_size
    }

    /// First float register number; integer registers are numbered
    /// below this.
    pub fn first_float_register(&self) -> Register {
        let index = self
            .registers
            .iter()
            .position(|descriptor| descriptor.category == RegisterCategory::Float)
            .expect("platform without float registers");
        Register(index as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_categories() {
        let platform = Platform::x64();
        assert_eq!(
            platform.register_category(Register(0)),
            Some(RegisterCategory::Integer)
        );
        assert_eq!(
            platform.register_category(Register(16)),
            Some(RegisterCategory::Float)
        );
        assert_eq!(platform.register_category(Register(40)), None);
    }

    #[test]
    fn test_can_store_kind() {
        let platform = Platform::x64();
        let gpr = Register(3);
        let xmm = platform.first_float_register();

        assert!(platform.can_store_kind(gpr, ValueKind::Int));
        assert!(platform.can_store_kind(gpr, ValueKind::Long));
        assert!(platform.can_store_kind(gpr, ValueKind::Object));
        assert!(!platform.can_store_kind(gpr, ValueKind::Double));
        assert!(!platform.can_store_kind(gpr, ValueKind::Illegal));

        assert!(platform.can_store_kind(xmm, ValueKind::Float));
        assert!(platform.can_store_kind(xmm, ValueKind::Double));
        assert!(!platform.can_store_kind(xmm, ValueKind::Int));
    }
}
