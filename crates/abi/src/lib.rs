// Machine Application Binary Interface (ABI)
// Defines the instruction encoding, the memory model and the execution loop
// of the 32-bit segmented machine. Host I/O is plain `Read`/`Write`.

pub mod error;
pub mod isa;
pub mod memory;
pub mod ops;
pub mod registers;
pub mod vm;

pub use error::VMError;
pub use isa::{Instruction, Opcode, Register};
pub use memory::Memory;
pub use registers::Registers;
pub use vm::{Machine, VMStatus};

pub const NUM_REGISTERS: usize = 8;
pub const WORD_BYTES: usize = 4;
