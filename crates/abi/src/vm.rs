use crate::error::VMError;
use crate::isa::{Instruction, Opcode};
use crate::memory::Memory;
use crate::ops;
use crate::registers::Registers;
use log::{info, trace};
use std::io::{Read, Write};

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMStatus {
    Running,
    Halted,
}

/// The whole execution context: registers, memory, program counter and the
/// host streams the I/O instructions talk to.
pub struct Machine<R, W> {
    registers: Registers,
    memory: Memory,
    pc: u32,
    input: R,
    output: W,
    retired: u64,
    halted: bool,
}

impl<R: Read, W: Write> Machine<R, W> {
    /// Starts a machine with `program` as segment zero and the pc at 0.
    pub fn new(program: Vec<u32>, input: R, output: W) -> Self {
        Self::with_memory(Memory::from_words(program), input, output)
    }

    /// Starts a machine from a raw big-endian program image.
    pub fn from_image(image: &[u8], input: R, output: W) -> Result<Self, VMError> {
        let mut memory = Memory::new();
        memory.install_program(image)?;
        Ok(Self::with_memory(memory, input, output))
    }

    fn with_memory(memory: Memory, input: R, output: W) -> Self {
        Self {
            registers: Registers::new(),
            memory,
            pc: 0,
            input,
            output,
            retired: 0,
            halted: false,
        }
    }

    // The Heartbeat: Execute one instruction
    pub fn step(&mut self) -> Result<VMStatus, VMError> {
        if self.halted {
            return Ok(VMStatus::Halted);
        }

        // Fetch
        let word = self.memory.fetch(self.pc)?;
        let at = self.pc;
        self.pc = self.pc.wrapping_add(1);

        // Decode & Execute
        let instruction = Instruction::decode(word)?;
        self.retired += 1;
        trace!("{at:>8}: {instruction}");

        let regs = &mut self.registers;
        match instruction {
            Instruction::LoadImmediate { a, value } => regs[a] = value,
            Instruction::ThreeRegister { op, a, b, c } => match op {
                Opcode::CMov => regs[a] = ops::conditional_move(regs[a], regs[b], regs[c]),
                Opcode::SLoad => regs[a] = self.memory.read(regs[b], regs[c])?,
                Opcode::SStore => self.memory.write(regs[a], regs[b], regs[c])?,
                Opcode::Add => regs[a] = ops::add(regs[b], regs[c]),
                Opcode::Mul => regs[a] = ops::multiply(regs[b], regs[c]),
                Opcode::Div => regs[a] = ops::divide(regs[b], regs[c])?,
                Opcode::Nand => regs[a] = ops::nand(regs[b], regs[c]),
                Opcode::Halt => {
                    self.halted = true;
                    self.output.flush()?;
                    info!("halted after {} instructions", self.retired);
                    return Ok(VMStatus::Halted);
                }
                Opcode::Map => regs[b] = self.memory.allocate(regs[c])?,
                Opcode::Unmap => self.memory.deallocate(regs[c])?,
                Opcode::Out => ops::output(&mut self.output, regs[c])?,
                Opcode::In => {
                    // Prompts written so far must be visible before we block.
                    self.output.flush()?;
                    regs[c] = ops::input(&mut self.input)?;
                }
                Opcode::LoadP => {
                    let (id, offset) = (regs[b], regs[c]);
                    self.load_program(id, offset)?;
                }
                Opcode::Lv => unreachable!("lv decodes as LoadImmediate"),
            },
        }
        Ok(VMStatus::Running)
    }

    /// Runs until halt. Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, VMError> {
        while self.step()? == VMStatus::Running {}
        Ok(self.retired)
    }

    /// Runs at most `limit` more instructions.
    pub fn run_for(&mut self, limit: u64) -> Result<VMStatus, VMError> {
        for _ in 0..limit {
            if self.step()? == VMStatus::Halted {
                return Ok(VMStatus::Halted);
            }
        }
        Ok(self.status())
    }

    /// Copies segment `id` over segment zero (unless `id` is 0) and jumps to
    /// `offset` in the new program.
    pub fn load_program(&mut self, id: u32, offset: u32) -> Result<(), VMError> {
        self.memory.replace_program(id)?;
        self.pc = offset;
        Ok(())
    }

    pub fn status(&self) -> VMStatus {
        if self.halted { VMStatus::Halted } else { VMStatus::Running }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Instructions fetched and decoded so far, including a faulting one.
    pub fn retired(&self) -> u64 {
        self.retired
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
