//! Container header codec
//!
//! Every container file starts with a fixed 16-byte packed header that
//! makes the file self-describing: magic bytes, format version, packed
//! geometry, block encoding, voxel type and size, and the absolute byte
//! offset of the data segment. Multi-byte fields use the byte order of
//! the writing host; the format carries no endianness marker.

use crate::error::{CubeError, Result};
use crate::types::{BlockType, Voxel, VoxelType};
use crate::utils::{hi_nibble, lo_nibble};
use crate::{BLOCK_LEN_LOG2, FILE_BLEN_LOG2, FORMAT_VERSION, MAGIC};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem;

/// Size of the packed on-disk header in bytes
pub const HEADER_SIZE: usize = 16;

/// Parsed and validated container header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Format version, currently always 1
    pub version: u8,
    /// Log2 of the block side length in voxels (low nibble on disk)
    pub block_len_log2: u8,
    /// Log2 of the file side length in blocks (high nibble on disk)
    pub file_len_log2: u8,
    /// Block encoding of the data segment
    pub block_type: BlockType,
    /// Element type of every voxel in the file
    pub voxel_type: VoxelType,
    /// Bytes per voxel, stored redundantly next to the type tag
    pub voxel_size: u8,
    /// Absolute byte offset where the data segment begins
    pub data_offset: u64,
}

impl Header {
    /// Header of a freshly created raw container for voxel type `T`
    pub fn new_raw<T: Voxel>() -> Header {
        Header {
            version: FORMAT_VERSION,
            block_len_log2: BLOCK_LEN_LOG2 as u8,
            file_len_log2: FILE_BLEN_LOG2 as u8,
            block_type: BlockType::Raw,
            voxel_type: T::TYPE,
            voxel_size: mem::size_of::<T>() as u8,
            data_offset: HEADER_SIZE as u64,
        }
    }

    /// Derive the header of the compressed rendition of this container
    ///
    /// The data segment moves past the jump table, which sits directly
    /// behind the header.
    pub fn compressed(&self, block_type: BlockType) -> Header {
        let mut header = self.clone();
        header.block_type = block_type;
        header.data_offset = HEADER_SIZE as u64 + self.jump_table_size();
        header
    }

    /// Parse and validate a packed header
    pub fn from_bytes(buf: [u8; HEADER_SIZE]) -> Result<Header> {
        if buf[..3] != MAGIC[..] {
            return Err(CubeError::BadMagic);
        }

        let version = buf[3];
        if version != FORMAT_VERSION {
            return Err(CubeError::BadVersion(version));
        }

        let voxel_type =
            VoxelType::from_u8(buf[6]).ok_or(CubeError::BadVoxelType(buf[6]))?;
        let block_type =
            BlockType::from_u8(buf[5]).ok_or(CubeError::BadBlockType(buf[5]))?;

        // Other geometries are representable in the packed field, but this
        // engine only supports 32-voxel blocks in 1024-voxel files.
        let lens_log2 = buf[4];
        if hi_nibble(lens_log2) != FILE_BLEN_LOG2 as u8
            || lo_nibble(lens_log2) != BLOCK_LEN_LOG2 as u8
        {
            return Err(CubeError::BadGeometry(lens_log2));
        }

        let data_offset = u64::from_ne_bytes(buf[8..16].try_into().unwrap());
        if data_offset < HEADER_SIZE as u64 {
            return Err(CubeError::BadDataOffset(data_offset));
        }

        Ok(Header {
            version,
            block_len_log2: lo_nibble(lens_log2),
            file_len_log2: hi_nibble(lens_log2),
            block_type,
            voxel_type,
            voxel_size: buf[7],
            data_offset,
        })
    }

    /// Serialize into the packed on-disk representation
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..3].copy_from_slice(MAGIC);
        buf[3] = self.version;
        buf[4] = (self.file_len_log2 << 4) | (self.block_len_log2 & 0x0f);
        buf[5] = self.block_type as u8;
        buf[6] = self.voxel_type as u8;
        buf[7] = self.voxel_size;
        buf[8..16].copy_from_slice(&self.data_offset.to_ne_bytes());
        buf
    }

    /// Read and validate the header at the current file position
    pub fn read_from(file: &mut fs::File) -> Result<Header> {
        let mut buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut buf)?;
        Self::from_bytes(buf)
    }

    /// Serialize the header at offset 0 and flush
    pub fn write_to(&self, file: &mut fs::File) -> Result<()> {
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.to_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Check that the container's voxel type and size match `T`
    pub fn ensure_voxel<T: Voxel>(&self) -> Result<()> {
        if self.voxel_type != T::TYPE || self.voxel_size as usize != mem::size_of::<T>() {
            return Err(CubeError::VoxelMismatch {
                found: self.voxel_type,
                found_size: self.voxel_size,
                requested: T::TYPE,
                requested_size: mem::size_of::<T>() as u8,
            });
        }
        Ok(())
    }

    /// Block side length in voxels
    pub fn block_len(&self) -> usize {
        1 << self.block_len_log2
    }

    /// Number of voxels in one block
    pub fn block_vol(&self) -> usize {
        1 << (3 * self.block_len_log2)
    }

    /// Size in bytes of one serialized raw block
    pub fn block_size(&self) -> usize {
        self.block_vol() * self.voxel_size as usize
    }

    /// Number of blocks in the file
    pub fn file_block_count(&self) -> usize {
        1 << (3 * self.file_len_log2)
    }

    /// File side length in voxels
    pub fn file_len_vx(&self) -> u32 {
        1 << (self.file_len_log2 as u32 + self.block_len_log2 as u32)
    }

    /// Number of voxels in the file
    pub fn file_vol_vx(&self) -> u64 {
        1 << (3 * (self.file_len_log2 as u64 + self.block_len_log2 as u64))
    }

    /// Size in bytes of the uncompressed voxel payload of the file
    pub fn file_size(&self) -> u64 {
        self.file_vol_vx() * self.voxel_size as u64
    }

    /// Size in bytes of the jump table of a compressed container
    pub fn jump_table_size(&self) -> u64 {
        self.file_block_count() as u64 * mem::size_of::<u64>() as u64
    }

    /// Expected total file length of a raw container
    pub fn expected_file_len(&self) -> u64 {
        self.data_offset + self.file_size()
    }

    /// One-line description of the container
    pub fn summary(&self) -> String {
        format!(
            "{}³ voxels ({}, {} B each), {} blocks of {}³, {:?} encoding",
            self.file_len_vx(),
            self.voxel_type,
            self.voxel_size,
            self.file_block_count(),
            self.block_len(),
            self.block_type,
        )
    }
}
