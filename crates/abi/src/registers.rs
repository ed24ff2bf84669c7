use crate::NUM_REGISTERS;
use crate::isa::Register;
use std::ops::{Index, IndexMut};

/// Register file: eight 32-bit words, all zero at power-on.
///
/// Indexed by [`Register`], whose constructor already limits the index to
/// three bits, so access never needs a bounds check at the call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    regs: [u32; NUM_REGISTERS],
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> &[u32; NUM_REGISTERS] {
        &self.regs
    }
}

impl Index<Register> for Registers {
    type Output = u32;

    #[inline(always)]
    fn index(&self, reg: Register) -> &u32 {
        &self.regs[reg.index()]
    }
}

impl IndexMut<Register> for Registers {
    #[inline(always)]
    fn index_mut(&mut self, reg: Register) -> &mut u32 {
        &mut self.regs[reg.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        assert_eq!(Registers::new().as_array(), &[0; NUM_REGISTERS]);
    }

    #[test]
    fn registers_are_independent() {
        let mut regs = Registers::new();
        regs[Register::R3] = 0xDEAD_BEEF;
        regs[Register::R7] = 1;
        assert_eq!(regs[Register::R3], 0xDEAD_BEEF);
        assert_eq!(regs[Register::R7], 1);
        assert_eq!(regs[Register::R0], 0);
    }
}
