use crate::error::VMError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OPCODE_SHIFT: u32 = 28;
pub const LV_REGISTER_SHIFT: u32 = 25;
pub const IMMEDIATE_MASK: u32 = (1 << 25) - 1;
const REGISTER_MASK: u32 = 0b111;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // --- Register Moves & Arithmetic ---
    CMov = 0,    // if r[C] != 0 then r[A] := r[B]
    SLoad = 1,   // r[A] := m[r[B]][r[C]]
    SStore = 2,  // m[r[A]][r[B]] := r[C]
    Add = 3,     // r[A] := r[B] + r[C] mod 2^32
    Mul = 4,     // r[A] := r[B] * r[C] mod 2^32
    Div = 5,     // r[A] := r[B] / r[C], unsigned
    Nand = 6,    // r[A] := !(r[B] & r[C])

    // --- Core Execution ---
    Halt = 7,

    // --- Segments ---
    Map = 8,     // r[B] := id of a new zeroed segment of r[C] words
    Unmap = 9,   // free segment r[C]

    // --- Host I/O ---
    Out = 10,    // write byte r[C]
    In = 11,     // r[C] := next input byte, or all ones at end of input

    // --- Control Flow ---
    LoadP = 12,  // m[0] := copy of m[r[B]], pc := r[C]
    Lv = 13,     // r[A] := 25-bit immediate
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::CMov => "cmov",
            Opcode::SLoad => "sload",
            Opcode::SStore => "sstore",
            Opcode::Add => "add",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Nand => "nand",
            Opcode::Halt => "halt",
            Opcode::Map => "map",
            Opcode::Unmap => "unmap",
            Opcode::Out => "out",
            Opcode::In => "in",
            Opcode::LoadP => "loadp",
            Opcode::Lv => "lv",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Opcode::CMov,
            1 => Opcode::SLoad,
            2 => Opcode::SStore,
            3 => Opcode::Add,
            4 => Opcode::Mul,
            5 => Opcode::Div,
            6 => Opcode::Nand,
            7 => Opcode::Halt,
            8 => Opcode::Map,
            9 => Opcode::Unmap,
            10 => Opcode::Out,
            11 => Opcode::In,
            12 => Opcode::LoadP,
            13 => Opcode::Lv,
            other => return Err(other),
        })
    }
}

/// One of the eight general-purpose registers. The index is always below 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register(u8);

impl Register {
    pub const R0: Register = Register(0);
    pub const R1: Register = Register(1);
    pub const R2: Register = Register(2);
    pub const R3: Register = Register(3);
    pub const R4: Register = Register(4);
    pub const R5: Register = Register(5);
    pub const R6: Register = Register(6);
    pub const R7: Register = Register(7);

    /// Takes the low three bits of `bits`.
    #[inline(always)]
    pub const fn from_bits(bits: u32) -> Self {
        Register((bits & REGISTER_MASK) as u8)
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    ThreeRegister {
        op: Opcode,
        a: Register,
        b: Register,
        c: Register,
    },
    LoadImmediate {
        a: Register,
        value: u32,
    },
}

impl Instruction {
    /// Splits a word into opcode and operand fields.
    ///
    /// Register fields of opcodes that ignore them are still extracted; the
    /// engine just never reads them.
    #[inline(always)]
    pub fn decode(word: u32) -> Result<Self, VMError> {
        let raw = (word >> OPCODE_SHIFT) as u8;
        let op = Opcode::try_from(raw).map_err(|opcode| VMError::UnknownOpcode { opcode, word })?;

        Ok(match op {
            Opcode::Lv => Instruction::LoadImmediate {
                a: Register::from_bits(word >> LV_REGISTER_SHIFT),
                value: word & IMMEDIATE_MASK,
            },
            op => Instruction::ThreeRegister {
                op,
                a: Register::from_bits(word >> 6),
                b: Register::from_bits(word >> 3),
                c: Register::from_bits(word),
            },
        })
    }

    pub fn encode(self) -> u32 {
        match self {
            Instruction::ThreeRegister { op, a, b, c } => three_register(op, a, b, c),
            Instruction::LoadImmediate { a, value } => load_immediate(a, value),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::ThreeRegister { op, .. } => *op,
            Instruction::LoadImmediate { .. } => Opcode::Lv,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::LoadImmediate { a, value } => write!(f, "lv {a}, {value}"),
            Instruction::ThreeRegister { op, a, b, c } => match op {
                Opcode::Halt => write!(f, "halt"),
                Opcode::Map | Opcode::LoadP => write!(f, "{} {b}, {c}", op.mnemonic()),
                Opcode::Unmap | Opcode::Out | Opcode::In => write!(f, "{} {c}", op.mnemonic()),
                _ => write!(f, "{} {a}, {b}, {c}", op.mnemonic()),
            },
        }
    }
}

// --- Encoding ---

pub fn three_register(op: Opcode, a: Register, b: Register, c: Register) -> u32 {
    ((op as u32) << OPCODE_SHIFT) | ((a.0 as u32) << 6) | ((b.0 as u32) << 3) | c.0 as u32
}

/// Encodes `lv`. Bits of `value` above the 25-bit field are dropped.
pub fn load_immediate(a: Register, value: u32) -> u32 {
    ((Opcode::Lv as u32) << OPCODE_SHIFT) | ((a.0 as u32) << LV_REGISTER_SHIFT) | (value & IMMEDIATE_MASK)
}

pub fn cmov(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::CMov, a, b, c)
}

pub fn sload(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::SLoad, a, b, c)
}

pub fn sstore(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::SStore, a, b, c)
}

pub fn add(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::Add, a, b, c)
}

pub fn mul(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::Mul, a, b, c)
}

pub fn div(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::Div, a, b, c)
}

pub fn nand(a: Register, b: Register, c: Register) -> u32 {
    three_register(Opcode::Nand, a, b, c)
}

pub fn halt() -> u32 {
    three_register(Opcode::Halt, Register::R0, Register::R0, Register::R0)
}

pub fn map(b: Register, c: Register) -> u32 {
    three_register(Opcode::Map, Register::R0, b, c)
}

pub fn unmap(c: Register) -> u32 {
    three_register(Opcode::Unmap, Register::R0, Register::R0, c)
}

pub fn out(c: Register) -> u32 {
    three_register(Opcode::Out, Register::R0, Register::R0, c)
}

pub fn input(c: Register) -> u32 {
    three_register(Opcode::In, Register::R0, Register::R0, c)
}

pub fn loadp(b: Register, c: Register) -> u32 {
    three_register(Opcode::LoadP, Register::R0, b, c)
}

pub fn lv(a: Register, value: u32) -> u32 {
    load_immediate(a, value)
}
