//! Program image files: a flat sequence of big-endian 32-bit words.

use abi::WORD_BYTES;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is {len} bytes, not a whole number of 32-bit words", path.display())]
    Misaligned { path: PathBuf, len: usize },
}

/// Reads an image file, checking that it holds whole words.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() % WORD_BYTES != 0 {
        return Err(ImageError::Misaligned {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Serializes `words` in image order.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

pub fn write(path: impl AsRef<Path>, words: &[u32]) -> Result<(), ImageError> {
    let path = path.as_ref();
    fs::write(path, to_bytes(words)).map_err(|source| ImageError::Io {
        path: path.to_path_buf(),
        source,
    })
}
