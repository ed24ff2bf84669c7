//! Segmented word memory.
//!
//! Segment zero holds the running program and lives outside the identifier
//! table, since every fetch reads it. Every other segment sits in a slot map:
//! slot `i` backs identifier `i + 1`, and freed identifiers go on a stack so
//! the most recently released one is handed out first.

use crate::WORD_BYTES;
use crate::error::VMError;
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Live(Vec<u32>),
    Free,
}

#[derive(Debug, Default)]
pub struct Memory {
    /// Segment zero.
    program: Vec<u32>,
    slots: Vec<Slot>,
    free_ids: Vec<u32>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds memory whose segment zero is exactly `words`.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self {
            program: words,
            ..Self::default()
        }
    }

    /// Replaces segment zero with the big-endian words in `bytes`.
    ///
    /// Bypasses the identifier table; intended for start-up only.
    pub fn install_program(&mut self, bytes: &[u8]) -> Result<(), VMError> {
        if bytes.len() % WORD_BYTES != 0 {
            return Err(VMError::MisalignedImage { len: bytes.len() });
        }
        self.program = bytes
            .chunks_exact(WORD_BYTES)
            .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        debug!("installed program of {} words", self.program.len());
        Ok(())
    }

    /// Segment zero's contents.
    pub fn program(&self) -> &[u32] {
        &self.program
    }

    /// Reads the instruction word at `pc` in segment zero.
    #[inline(always)]
    pub fn fetch(&self, pc: u32) -> Result<u32, VMError> {
        self.program
            .get(pc as usize)
            .copied()
            .ok_or(VMError::ProgramCounterOutOfBounds {
                pc,
                len: self.program.len(),
            })
    }

    /// Maps a zero-filled segment of `size` words and returns its identifier.
    pub fn allocate(&mut self, size: u32) -> Result<u32, VMError> {
        let words = vec![0; size as usize];
        let id = match self.free_ids.pop() {
            Some(id) => {
                self.slots[id as usize - 1] = Slot::Live(words);
                id
            }
            None => {
                let id = u32::try_from(self.slots.len() + 1).map_err(|_| VMError::SegmentIdsExhausted)?;
                self.slots.push(Slot::Live(words));
                id
            }
        };
        debug!("mapped segment {id} ({size} words)");
        Ok(id)
    }

    /// Unmaps segment `id` and makes the identifier available again.
    pub fn deallocate(&mut self, id: u32) -> Result<(), VMError> {
        if id == 0 {
            return Err(VMError::ReservedSegment);
        }
        match self.slots.get_mut(id as usize - 1) {
            Some(slot) if matches!(slot, Slot::Live(_)) => *slot = Slot::Free,
            _ => return Err(VMError::UnmappedSegment(id)),
        }
        self.free_ids.push(id);
        debug!("unmapped segment {id}");
        Ok(())
    }

    pub fn read(&self, id: u32, offset: u32) -> Result<u32, VMError> {
        let segment = self.segment(id)?;
        segment
            .get(offset as usize)
            .copied()
            .ok_or(VMError::OffsetOutOfBounds {
                segment: id,
                offset,
                len: segment.len(),
            })
    }

    pub fn write(&mut self, id: u32, offset: u32, word: u32) -> Result<(), VMError> {
        let segment = self.segment_mut(id)?;
        let len = segment.len();
        let cell = segment
            .get_mut(offset as usize)
            .ok_or(VMError::OffsetOutOfBounds {
                segment: id,
                offset,
                len,
            })?;
        *cell = word;
        Ok(())
    }

    /// Makes segment zero an independent copy of segment `id`.
    ///
    /// Replacing segment zero with itself is a no-op.
    pub fn replace_program(&mut self, id: u32) -> Result<(), VMError> {
        if id == 0 {
            return Ok(());
        }
        let source = self.mapped(id)?;
        self.program = source.clone();
        debug!("loaded program from segment {id} ({} words)", self.program.len());
        Ok(())
    }

    /// Length of segment `id` in words, if it is live.
    pub fn segment_len(&self, id: u32) -> Option<usize> {
        self.segment(id).ok().map(<[u32]>::len)
    }

    pub fn is_live(&self, id: u32) -> bool {
        id == 0 || self.mapped(id).is_ok()
    }

    /// Number of mapped segments, not counting segment zero.
    pub fn live_segments(&self) -> usize {
        self.slots.len() - self.free_ids.len()
    }

    fn segment(&self, id: u32) -> Result<&[u32], VMError> {
        if id == 0 {
            Ok(&self.program)
        } else {
            self.mapped(id).map(Vec::as_slice)
        }
    }

    fn segment_mut(&mut self, id: u32) -> Result<&mut [u32], VMError> {
        if id == 0 {
            return Ok(&mut self.program);
        }
        match self.slots.get_mut(id as usize - 1) {
            Some(Slot::Live(words)) => Ok(words),
            _ => Err(VMError::UnmappedSegment(id)),
        }
    }

    fn mapped(&self, id: u32) -> Result<&Vec<u32>, VMError> {
        if id == 0 {
            return Err(VMError::ReservedSegment);
        }
        match self.slots.get(id as usize - 1) {
            Some(Slot::Live(words)) => Ok(words),
            _ => Err(VMError::UnmappedSegment(id)),
        }
    }
}
