//! Stateless instruction semantics. The engine reads the operand registers,
//! calls one of these and stores the result.

use crate::error::VMError;
use std::io::{ErrorKind, Read, Write};

/// Value left in the destination by `cmov`.
#[inline(always)]
pub fn conditional_move(current: u32, source: u32, condition: u32) -> u32 {
    if condition != 0 { source } else { current }
}

#[inline(always)]
pub fn add(b: u32, c: u32) -> u32 {
    b.wrapping_add(c)
}

#[inline(always)]
pub fn multiply(b: u32, c: u32) -> u32 {
    b.wrapping_mul(c)
}

#[inline(always)]
pub fn divide(b: u32, c: u32) -> Result<u32, VMError> {
    b.checked_div(c).ok_or(VMError::DivisionByZero)
}

#[inline(always)]
pub fn nand(b: u32, c: u32) -> u32 {
    !(b & c)
}

/// Writes `value` as a single byte. Anything above 255 is a fault.
pub fn output<W: Write>(out: &mut W, value: u32) -> Result<(), VMError> {
    let byte = u8::try_from(value).map_err(|_| VMError::OutputOutOfRange(value))?;
    out.write_all(&[byte])?;
    Ok(())
}

/// Reads one byte, or returns all ones once the stream is exhausted.
pub fn input<R: Read>(input: &mut R) -> Result<u32, VMError> {
    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Ok(0) => return Ok(u32::MAX),
            Ok(_) => return Ok(byte[0] as u32),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}
