//! Error types for cube container operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for container operations
#[derive(Error, Debug)]
pub enum CubeError {
    #[error("could not open {}: {source}", .path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A read, write, seek or truncate moved fewer bytes than requested or
    /// failed outright. Short I/O at the block level is fatal; there is no
    /// partial-read retry.
    #[error("short or failed I/O: {0}")]
    ShortIo(#[from] std::io::Error),

    #[error("sequence of magic bytes is invalid")]
    BadMagic,

    #[error("unsupported container version {0}")]
    BadVersion(u8),

    #[error("voxel type tag {0} is invalid")]
    BadVoxelType(u8),

    #[error("block type tag {0} is invalid")]
    BadBlockType(u8),

    #[error("unsupported geometry (side-length field {0:#04x})")]
    BadGeometry(u8),

    #[error("data offset {0} lies inside the header")]
    BadDataOffset(u64),

    #[error("container holds {found} voxels of {found_size} B, caller expects {requested} of {requested_size} B")]
    VoxelMismatch {
        found: crate::types::VoxelType,
        found_size: u8,
        requested: crate::types::VoxelType,
        requested_size: u8,
    },

    /// The cube side is not a power of two in `[BLOCK_LEN, FILE_LEN]`, or
    /// the caller buffer does not hold exactly `side³` voxels.
    #[error("invalid cube side length {0}")]
    BadCubeSize(u32),

    #[error("offset {0:?} is not an in-range multiple of the cube side")]
    BadAlignment([u32; 3]),

    #[error("block index {0} is out of file bounds")]
    BadBlockIndex(u64),

    #[error("LZ4 codec failure: {0}")]
    Codec(String),
}

impl CubeError {
    /// Stable negative code per error kind, for bindings that surface
    /// integer results instead of Rust errors. The mapping is part of the
    /// interface contract and must not be reordered.
    pub fn code(&self) -> i32 {
        match self {
            CubeError::OpenFailed { .. } => -1,
            CubeError::ShortIo(_) => -2,
            CubeError::BadMagic => -3,
            CubeError::BadVersion(_) => -4,
            CubeError::BadVoxelType(_) => -5,
            CubeError::BadBlockType(_) => -6,
            CubeError::BadGeometry(_) => -7,
            CubeError::BadDataOffset(_) => -8,
            CubeError::VoxelMismatch { .. } => -9,
            CubeError::BadCubeSize(_) => -10,
            CubeError::BadAlignment(_) => -11,
            CubeError::BadBlockIndex(_) => -12,
            CubeError::Codec(_) => -13,
        }
    }
}

/// Specialized Result type for container operations
pub type Result<T> = std::result::Result<T, CubeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_and_negative() {
        let errors = [
            CubeError::BadMagic,
            CubeError::BadVersion(0),
            CubeError::BadVoxelType(0),
            CubeError::BadBlockType(0),
            CubeError::BadGeometry(0),
            CubeError::BadDataOffset(0),
            CubeError::BadCubeSize(0),
            CubeError::BadAlignment([1, 0, 0]),
            CubeError::BadBlockIndex(0),
            CubeError::Codec(String::new()),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|&c| c < 0));
    }
}
