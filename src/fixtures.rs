//! Regression programs with known input and expected output.
//!
//! Each fixture is built with the instruction encoders, so the table doubles
//! as a check that encoder and decoder agree on the word layout.

use crate::image;
use abi::isa::{self, Register as R};
use abi::{Machine, VMError, VMStatus};
use serde::Serialize;
use std::fmt;

/// Instruction budget for a single fixture run.
pub const FUEL: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Halts normally after writing exactly these bytes.
    Halts(&'static [u8]),
    /// Faults after writing exactly these bytes.
    Faults(&'static [u8]),
}

impl Expect {
    pub fn output(&self) -> &'static [u8] {
        match *self {
            Expect::Halts(out) | Expect::Faults(out) => out,
        }
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Halts(out) => write!(f, "halt with \"{}\"", out.escape_ascii()),
            Expect::Faults(out) => write!(f, "fault after \"{}\"", out.escape_ascii()),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Halted { output: Vec<u8> },
    Faulted { output: Vec<u8>, error: VMError },
    OutOfFuel { output: Vec<u8> },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Halted { output } => write!(f, "halt with \"{}\"", output.escape_ascii()),
            Outcome::Faulted { output, error } => {
                write!(f, "fault ({error}) after \"{}\"", output.escape_ascii())
            }
            Outcome::OutOfFuel { output } => {
                write!(f, "no halt within {FUEL} instructions after \"{}\"", output.escape_ascii())
            }
        }
    }
}

pub struct Fixture {
    pub name: &'static str,
    pub input: &'static [u8],
    pub expect: Expect,
    build: fn() -> Vec<u32>,
}

/// How a fixture is laid out on disk next to its `.um` image.
#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub name: &'static str,
    pub image: String,
    pub input: Option<String>,
    pub expected_output: Option<String>,
    pub faults: bool,
    pub words: usize,
}

impl Fixture {
    pub fn program(&self) -> Vec<u32> {
        (self.build)()
    }

    pub fn image(&self) -> Vec<u8> {
        image::to_bytes(&self.program())
    }

    pub fn run(&self) -> Outcome {
        let mut vm = Machine::new(self.program(), self.input, Vec::new());
        let result = vm.run_for(FUEL);
        let output = vm.into_output();
        match result {
            Ok(VMStatus::Halted) => Outcome::Halted { output },
            Ok(VMStatus::Running) => Outcome::OutOfFuel { output },
            Err(error) => Outcome::Faulted { output, error },
        }
    }

    pub fn check(&self) -> Result<(), String> {
        match (self.expect, self.run()) {
            (Expect::Halts(want), Outcome::Halted { output }) if output == want => Ok(()),
            (Expect::Faults(want), Outcome::Faulted { output, .. }) if output == want => Ok(()),
            (expect, outcome) => Err(format!("expected {expect}, got {outcome}")),
        }
    }

    pub fn manifest(&self) -> ManifestEntry {
        ManifestEntry {
            name: self.name,
            image: format!("{}.um", self.name),
            input: (!self.input.is_empty()).then(|| format!("{}.0", self.name)),
            expected_output: (!self.expect.output().is_empty()).then(|| format!("{}.1", self.name)),
            faults: matches!(self.expect, Expect::Faults(_)),
            words: self.program().len(),
        }
    }
}

pub fn all() -> &'static [Fixture] {
    FIXTURES
}

pub fn find(name: &str) -> Option<&'static Fixture> {
    FIXTURES.iter().find(|fixture| fixture.name == name)
}

macro_rules! fixture {
    ($name:ident, $input:expr, $expect:expr) => {
        Fixture {
            name: stringify!($name),
            input: $input,
            expect: $expect,
            build: $name,
        }
    };
}

static FIXTURES: &[Fixture] = &[
    fixture!(halt, b"", Expect::Halts(b"")),
    fixture!(load_value, b"", Expect::Halts(b"")),
    fixture!(output, b"", Expect::Halts(b"A")),
    fixture!(add, b"", Expect::Halts(b"A")),
    fixture!(multiply, b"", Expect::Halts(b"B")),
    fixture!(add_wraps, b"", Expect::Halts(b"A")),
    fixture!(multiply_wraps, b"", Expect::Halts(b"BC")),
    fixture!(divide, b"", Expect::Halts(b"A3")),
    fixture!(nand, b"", Expect::Halts(b"C")),
    fixture!(cmov_moves, b"", Expect::Halts(b"A")),
    fixture!(cmov_holds, b"", Expect::Halts(b"A")),
    fixture!(segment_zero_load, b"", Expect::Halts(b"A")),
    fixture!(segment_zero_store, b"", Expect::Halts(b"A")),
    fixture!(map_segment, b"", Expect::Halts(b"Z")),
    fixture!(fresh_segment_zeroed, b"", Expect::Halts(b"0")),
    fixture!(unmap_and_remap, b"", Expect::Halts(b"0x0x0x")),
    fixture!(segments_do_not_alias, b"", Expect::Halts(b"123")),
    fixture!(load_program_jump, b"", Expect::Halts(b"A")),
    fixture!(load_program_copy, b"", Expect::Halts(b"B")),
    fixture!(input, b"A", Expect::Halts(b"K")),
    fixture!(end_of_input, b"", Expect::Halts(b"A")),
    fixture!(echo, b"hello", Expect::Halts(b"hello")),
    fixture!(divide_by_zero, b"", Expect::Faults(b"A")),
    fixture!(output_out_of_range, b"", Expect::Faults(b"")),
    fixture!(unmap_segment_zero, b"", Expect::Faults(b"")),
    fixture!(stale_segment, b"", Expect::Faults(b"")),
    fixture!(unknown_opcode, b"", Expect::Faults(b"")),
];

fn halt() -> Vec<u32> {
    vec![
        isa::halt(),
        isa::lv(R::R1, b'B' as u32),
        isa::out(R::R1),
        isa::lv(R::R1, b'a' as u32),
        isa::out(R::R1),
        isa::lv(R::R1, b'd' as u32),
        isa::out(R::R1),
    ]
}

fn load_value() -> Vec<u32> {
    vec![isa::lv(R::R0, 1), isa::halt()]
}

fn output() -> Vec<u32> {
    vec![isa::lv(R::R0, 65), isa::out(R::R0), isa::halt()]
}

fn add() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 33),
        isa::lv(R::R2, 32),
        isa::add(R::R0, R::R1, R::R2),
        isa::out(R::R0),
        isa::halt(),
    ]
}

fn multiply() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 33),
        isa::lv(R::R2, 2),
        isa::mul(R::R0, R::R1, R::R2),
        isa::out(R::R0),
        isa::halt(),
    ]
}

fn add_wraps() -> Vec<u32> {
    vec![
        isa::nand(R::R1, R::R0, R::R0), // 0xFFFF_FFFF
        isa::lv(R::R2, 66),
        isa::add(R::R3, R::R1, R::R2),
        isa::out(R::R3),
        isa::halt(),
    ]
}

fn multiply_wraps() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 1 << 16),
        isa::mul(R::R2, R::R1, R::R1), // 2^32 wraps to 0
        isa::lv(R::R3, 66),
        isa::add(R::R4, R::R2, R::R3),
        isa::out(R::R4),
        isa::nand(R::R5, R::R0, R::R0),
        isa::mul(R::R6, R::R5, R::R5), // (2^32 - 1)^2 wraps to 1
        isa::add(R::R6, R::R6, R::R3),
        isa::out(R::R6),
        isa::halt(),
    ]
}

fn divide() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 130),
        isa::lv(R::R2, 2),
        isa::div(R::R0, R::R1, R::R2),
        isa::out(R::R0),
        isa::lv(R::R1, 7),
        isa::div(R::R3, R::R1, R::R2), // truncates to 3
        isa::lv(R::R4, b'0' as u32),
        isa::add(R::R3, R::R3, R::R4),
        isa::out(R::R3),
        isa::halt(),
    ]
}

fn nand() -> Vec<u32> {
    vec![
        isa::lv(R::R0, (1 << 25) - 1),
        isa::lv(R::R1, (1 << 25) - 1),
        isa::lv(R::R2, 128),
        isa::lv(R::R4, 60),
        isa::mul(R::R0, R::R0, R::R2),
        isa::mul(R::R1, R::R1, R::R2),
        isa::add(R::R0, R::R0, R::R4),
        isa::add(R::R1, R::R1, R::R4),
        isa::nand(R::R3, R::R0, R::R1), // !0xFFFF_FFBC
        isa::out(R::R3),
        isa::halt(),
    ]
}

fn cmov_moves() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 1),
        isa::lv(R::R2, 65),
        isa::lv(R::R3, 3),
        isa::cmov(R::R3, R::R2, R::R1),
        isa::out(R::R3),
        isa::halt(),
    ]
}

fn cmov_holds() -> Vec<u32> {
    vec![
        isa::lv(R::R2, 2),
        isa::lv(R::R3, 65),
        isa::cmov(R::R3, R::R2, R::R1),
        isa::out(R::R3),
        isa::halt(),
    ]
}

fn segment_zero_load() -> Vec<u32> {
    vec![
        isa::lv(R::R2, 4),
        isa::sload(R::R1, R::R0, R::R2),
        isa::out(R::R1),
        isa::halt(),
        65, // data, never executed
    ]
}

fn segment_zero_store() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 65),
        isa::lv(R::R2, 6),
        isa::sstore(R::R0, R::R2, R::R1),
        isa::sload(R::R3, R::R0, R::R2),
        isa::out(R::R3),
        isa::halt(),
        0, // data slot
    ]
}

fn map_segment() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 5),
        isa::map(R::R2, R::R1),
        isa::lv(R::R3, 2),
        isa::lv(R::R4, b'Z' as u32),
        isa::sstore(R::R2, R::R3, R::R4),
        isa::sload(R::R5, R::R2, R::R3),
        isa::out(R::R5),
        isa::halt(),
    ]
}

fn fresh_segment_zeroed() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 8),
        isa::map(R::R2, R::R1),
        isa::lv(R::R3, 7),
        isa::sload(R::R5, R::R2, R::R3),
        isa::lv(R::R4, b'0' as u32),
        isa::add(R::R5, R::R5, R::R4),
        isa::out(R::R5),
        isa::halt(),
    ]
}

fn unmap_and_remap() -> Vec<u32> {
    let mut program = vec![
        isa::lv(R::R1, 4),
        isa::lv(R::R3, 3),
        isa::lv(R::R4, b'x' as u32),
        isa::lv(R::R6, b'0' as u32),
    ];
    for _ in 0..3 {
        program.extend([
            isa::map(R::R2, R::R1),
            isa::sload(R::R5, R::R2, R::R3),
            isa::add(R::R5, R::R5, R::R6),
            isa::out(R::R5),
            isa::sstore(R::R2, R::R3, R::R4),
            isa::sload(R::R5, R::R2, R::R3),
            isa::out(R::R5),
            isa::unmap(R::R2),
        ]);
    }
    program.push(isa::halt());
    program
}

fn segments_do_not_alias() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 1),
        isa::map(R::R2, R::R1),
        isa::map(R::R3, R::R1),
        isa::map(R::R4, R::R1),
        isa::lv(R::R5, b'1' as u32),
        isa::sstore(R::R2, R::R0, R::R5),
        isa::lv(R::R5, b'2' as u32),
        isa::sstore(R::R3, R::R0, R::R5),
        isa::lv(R::R5, b'3' as u32),
        isa::sstore(R::R4, R::R0, R::R5),
        isa::sload(R::R6, R::R2, R::R0),
        isa::out(R::R6),
        isa::sload(R::R6, R::R3, R::R0),
        isa::out(R::R6),
        isa::sload(R::R6, R::R4, R::R0),
        isa::out(R::R6),
        isa::halt(),
    ]
}

fn load_program_jump() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 4),
        isa::loadp(R::R0, R::R1),
        isa::lv(R::R2, 66), // skipped
        isa::out(R::R2),    // skipped
        isa::lv(R::R2, 65),
        isa::out(R::R2),
        isa::halt(),
    ]
}

fn load_program_copy() -> Vec<u32> {
    // Copies the three-word payload after the first halt into a new segment
    // and runs it from there.
    const PAYLOAD_AT: u32 = 16;
    let mut program = vec![isa::lv(R::R1, 3), isa::map(R::R2, R::R1)];
    for i in 0..3 {
        program.extend([
            isa::lv(R::R3, PAYLOAD_AT + i),
            isa::sload(R::R4, R::R0, R::R3),
            isa::lv(R::R5, i),
            isa::sstore(R::R2, R::R5, R::R4),
        ]);
    }
    program.extend([isa::loadp(R::R2, R::R0), isa::halt()]);
    debug_assert_eq!(program.len(), PAYLOAD_AT as usize);
    program.extend([isa::lv(R::R1, 66), isa::out(R::R1), isa::halt()]);
    program
}

fn input() -> Vec<u32> {
    vec![
        isa::input(R::R0),
        isa::lv(R::R1, 10),
        isa::add(R::R2, R::R1, R::R0),
        isa::out(R::R2),
        isa::halt(),
    ]
}

fn end_of_input() -> Vec<u32> {
    vec![
        isa::input(R::R0), // all ones
        isa::lv(R::R1, 66),
        isa::add(R::R2, R::R1, R::R0),
        isa::out(R::R2),
        isa::halt(),
    ]
}

fn echo() -> Vec<u32> {
    vec![
        isa::lv(R::R6, 0),
        isa::lv(R::R7, 9),
        isa::input(R::R1),
        isa::nand(R::R2, R::R1, R::R1), // zero only at end of input
        isa::lv(R::R3, 7),
        isa::cmov(R::R7, R::R3, R::R2),
        isa::loadp(R::R0, R::R7),
        isa::out(R::R1),
        isa::loadp(R::R0, R::R6),
        isa::halt(),
    ]
}

fn divide_by_zero() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 65),
        isa::out(R::R1),
        isa::div(R::R2, R::R1, R::R0),
        isa::out(R::R1),
        isa::halt(),
    ]
}

fn output_out_of_range() -> Vec<u32> {
    vec![isa::lv(R::R1, 256), isa::out(R::R1), isa::halt()]
}

fn unmap_segment_zero() -> Vec<u32> {
    vec![isa::unmap(R::R0), isa::halt()]
}

fn stale_segment() -> Vec<u32> {
    vec![
        isa::lv(R::R1, 2),
        isa::map(R::R2, R::R1),
        isa::unmap(R::R2),
        isa::sload(R::R3, R::R2, R::R0),
        isa::halt(),
    ]
}

fn unknown_opcode() -> Vec<u32> {
    vec![0xF000_0000, isa::halt()]
}
