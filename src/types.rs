//! Core data types of the cube container format

use serde::{Deserialize, Serialize};
use std::fmt;

/// Voxel element types supported by the container format
///
/// The discriminants are the on-disk tag values; tag 0 is reserved as
/// invalid and everything past [`VoxelType::F64`] is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoxelType {
    /// Unsigned 8-bit integer
    U8 = 1,
    /// Unsigned 16-bit integer
    U16 = 2,
    /// Unsigned 32-bit integer
    U32 = 3,
    /// Unsigned 64-bit integer
    U64 = 4,
    /// 32-bit floating point
    F32 = 5,
    /// 64-bit floating point
    F64 = 6,
}

impl VoxelType {
    /// Get the voxel type from its on-disk tag value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(VoxelType::U8),
            2 => Some(VoxelType::U16),
            3 => Some(VoxelType::U32),
            4 => Some(VoxelType::U64),
            5 => Some(VoxelType::F32),
            6 => Some(VoxelType::F64),
            _ => None,
        }
    }

    /// Size in bytes of one voxel of this type
    pub fn size_in_bytes(&self) -> usize {
        match self {
            VoxelType::U8 => 1,
            VoxelType::U16 => 2,
            VoxelType::U32 | VoxelType::F32 => 4,
            VoxelType::U64 | VoxelType::F64 => 8,
        }
    }

}

impl fmt::Display for VoxelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Block encodings supported by the container format
///
/// LZ4 and LZ4-HC differ only on the encode side; their payloads decode
/// identically. Tag 0 is reserved as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockType {
    /// Native voxel bytes, no compression
    Raw = 1,
    /// LZ4-compressed payload
    Lz4 = 2,
    /// LZ4-HC-compressed payload
    Lz4Hc = 3,
}

impl BlockType {
    /// Get the block type from its on-disk tag value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(BlockType::Raw),
            2 => Some(BlockType::Lz4),
            3 => Some(BlockType::Lz4Hc),
            _ => None,
        }
    }

    /// Check if blocks of this type carry an LZ4 payload
    pub fn is_compressed(&self) -> bool {
        !matches!(self, BlockType::Raw)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Element types that can live in a cube buffer
///
/// Implemented for exactly the six types the format supports. The bound
/// set (`Copy` + `Default`) is what the reshape kernel and the scratch
/// buffers need; there is no runtime polymorphism below the public entry
/// points.
pub trait Voxel: Copy + Default + Send + Sync + 'static {
    /// On-disk voxel type tag of this element type
    const TYPE: VoxelType;
}

impl Voxel for u8 {
    const TYPE: VoxelType = VoxelType::U8;
}

impl Voxel for u16 {
    const TYPE: VoxelType = VoxelType::U16;
}

impl Voxel for u32 {
    const TYPE: VoxelType = VoxelType::U32;
}

impl Voxel for u64 {
    const TYPE: VoxelType = VoxelType::U64;
}

impl Voxel for f32 {
    const TYPE: VoxelType = VoxelType::F32;
}

impl Voxel for f64 {
    const TYPE: VoxelType = VoxelType::F64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_voxel_type_sizes() {
        assert_eq!(VoxelType::U8.size_in_bytes(), 1);
        assert_eq!(VoxelType::U16.size_in_bytes(), 2);
        assert_eq!(VoxelType::U32.size_in_bytes(), 4);
        assert_eq!(VoxelType::U64.size_in_bytes(), 8);
        assert_eq!(VoxelType::F32.size_in_bytes(), 4);
        assert_eq!(VoxelType::F64.size_in_bytes(), 8);
    }

    #[test]
    fn test_tag_round_trip() {
        for tag in 1u8..=6 {
            let voxel_type = VoxelType::from_u8(tag).unwrap();
            assert_eq!(voxel_type as u8, tag);
        }
        assert_eq!(VoxelType::from_u8(0), None);
        assert_eq!(VoxelType::from_u8(7), None);

        for tag in 1u8..=3 {
            let block_type = BlockType::from_u8(tag).unwrap();
            assert_eq!(block_type as u8, tag);
        }
        assert_eq!(BlockType::from_u8(0), None);
        assert_eq!(BlockType::from_u8(4), None);
    }

    #[test]
    fn test_trait_tags_match_sizes() {
        fn check<T: Voxel>() {
            assert_eq!(T::TYPE.size_in_bytes(), mem::size_of::<T>());
        }

        check::<u8>();
        check::<u16>();
        check::<u32>();
        check::<u64>();
        check::<f32>();
        check::<f64>();
    }

    #[test]
    fn test_compressed_block_types() {
        assert!(!BlockType::Raw.is_compressed());
        assert!(BlockType::Lz4.is_compressed());
        assert!(BlockType::Lz4Hc.is_compressed());
    }
}
