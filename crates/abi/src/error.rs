use thiserror::Error;

/// Fatal machine faults. None of these are recoverable: the engine stops at
/// the instruction that raised them.
#[derive(Debug, Error)]
pub enum VMError {
    /// Top four bits of the fetched word name no instruction.
    #[error("unknown opcode {opcode} in word 0x{word:08x}")]
    UnknownOpcode { opcode: u8, word: u32 },
    /// Word offset at or past the end of a segment.
    #[error("offset {offset} out of bounds for segment {segment} (length {len})")]
    OffsetOutOfBounds { segment: u32, offset: u32, len: usize },
    /// Segment zero addressed through an operation that only takes mapped ids.
    #[error("segment 0 is reserved for the running program")]
    ReservedSegment,
    /// Identifier was never allocated or has been freed.
    #[error("segment {0} is not mapped")]
    UnmappedSegment(u32),
    #[error("division by zero")]
    DivisionByZero,
    /// Output instruction given a value that is not a byte.
    #[error("output value {0} does not fit in a byte")]
    OutputOutOfRange(u32),
    /// Program counter ran off the end of segment zero.
    #[error("program counter {pc} outside segment 0 (length {len})")]
    ProgramCounterOutOfBounds { pc: u32, len: usize },
    #[error("no segment identifiers left")]
    SegmentIdsExhausted,
    /// Program image is not a whole number of 32-bit words.
    #[error("program image of {len} bytes is not a multiple of 4")]
    MisalignedImage { len: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
