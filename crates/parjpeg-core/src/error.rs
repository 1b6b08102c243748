//! Error types for the encode pipeline.
//!
//! Every failure the orchestration layer can report falls into one of four
//! groups: invalid input, codec failure, protocol misuse of the streaming
//! encoder, and resource exhaustion. [`EncodeError::kind`] exposes that
//! grouping so boundary code can map it to a sentinel value.

use thiserror::Error;

use crate::codec::CodecError;

/// Errors that can occur while encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Pixel data is shorter than the declared geometry requires
    #[error("Invalid pixel data: expected at least {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Row stride is shorter than one row of pixels
    #[error("Invalid stride: {stride} bytes is shorter than a row of {row_bytes} bytes")]
    InvalidStride { stride: usize, row_bytes: usize },

    /// Tile edge length of zero
    #[error("Invalid tile size: {0}")]
    InvalidTileSize(u32),

    /// Pixel format id outside the known set
    #[error("Unsupported pixel format id: {0}")]
    UnsupportedFormat(i32),

    /// Row write would go past the declared image height
    #[error("Writing {requested} rows exceeds image height ({written} of {height} rows written)")]
    RowOverflow {
        requested: u32,
        written: u32,
        height: u32,
    },

    /// Finalize called before every row was written
    #[error("Encoder has {written} of {height} rows; all rows must be written before finalizing")]
    IncompleteImage { written: u32, height: u32 },

    /// Encoder was already finalized
    #[error("Encoder has already been finalized")]
    Finalized,

    /// A large buffer could not be allocated
    #[error("Out of memory allocating {0} bytes")]
    ResourceExhausted(usize),

    /// The JPEG codec reported a failure
    #[error("JPEG codec failure: {0}")]
    Codec(#[from] CodecError),
}

/// Coarse classification of an [`EncodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    CodecFailure,
    ProtocolMisuse,
    ResourceExhaustion,
}

impl EncodeError {
    /// Group this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::InvalidDimensions { .. }
            | EncodeError::InvalidPixelData { .. }
            | EncodeError::InvalidStride { .. }
            | EncodeError::InvalidTileSize(_)
            | EncodeError::UnsupportedFormat(_) => ErrorKind::InvalidInput,
            EncodeError::RowOverflow { .. }
            | EncodeError::IncompleteImage { .. }
            | EncodeError::Finalized => ErrorKind::ProtocolMisuse,
            EncodeError::ResourceExhausted(_) | EncodeError::Codec(CodecError::OutOfMemory(_)) => {
                ErrorKind::ResourceExhaustion
            }
            EncodeError::Codec(_) => ErrorKind::CodecFailure,
        }
    }
}

/// Allocate a zeroed byte buffer, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc(len: usize) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| EncodeError::ResourceExhausted(len))?;
    buffer.resize(len, 0);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EncodeError::InvalidDimensions {
            width: 0,
            height: 10,
        };
        assert_eq!(
            err.to_string(),
            "Invalid dimensions: width (0) and height (10) must be non-zero"
        );

        let err = EncodeError::RowOverflow {
            requested: 5,
            written: 8,
            height: 10,
        };
        assert_eq!(
            err.to_string(),
            "Writing 5 rows exceeds image height (8 of 10 rows written)"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            EncodeError::UnsupportedFormat(9).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(EncodeError::Finalized.kind(), ErrorKind::ProtocolMisuse);
        assert_eq!(
            EncodeError::ResourceExhausted(1).kind(),
            ErrorKind::ResourceExhaustion
        );
        assert_eq!(
            EncodeError::Codec(CodecError::EmptyOutput).kind(),
            ErrorKind::CodecFailure
        );
        assert_eq!(
            EncodeError::Codec(CodecError::OutOfMemory(10)).kind(),
            ErrorKind::ResourceExhaustion
        );
    }

    #[test]
    fn test_try_alloc_zeroed() {
        let buffer = try_alloc(16).unwrap();
        assert_eq!(buffer.len(), 16);
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_try_alloc_impossible_size() {
        let result = try_alloc(usize::MAX);
        assert!(matches!(result, Err(EncodeError::ResourceExhausted(_))));
    }
}
