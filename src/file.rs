//! Container file backend
//!
//! [`CubeFile`] owns one open file handle together with its validated
//! header and performs the block-level pipelines: raw reads, LZ4 reads,
//! raw writes and whole-file compression. A handle lives for the span
//! of a single public operation and is closed on every exit path when
//! it drops.

use crate::block;
use crate::compression::{self, Compressor};
use crate::error::{CubeError, Result};
use crate::header::{Header, HEADER_SIZE};
use crate::types::{BlockType, Voxel};
use crate::utils;
use crate::BLOCK_LEN_LOG2;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::mem;
use std::path::Path;

#[derive(Debug)]
pub(crate) struct CubeFile {
    file: fs::File,
    header: Header,
}

impl CubeFile {
    /// Open an existing container read-only and validate its header
    pub fn open(path: &Path) -> Result<CubeFile> {
        let mut file = fs::File::open(path).map_err(|source| CubeError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let header = Header::read_from(&mut file)?;

        Ok(CubeFile { file, header })
    }

    /// Open a container read-write, creating a fresh raw container if the
    /// path does not yet hold a valid one
    ///
    /// An existing container must be raw and carry voxel type `T`; a fresh
    /// one is stamped with a raw header for `T` and truncated to the full
    /// capacity of the file as a sparse allocation.
    pub fn open_or_create<T: Voxel>(path: &Path) -> Result<CubeFile> {
        let mut opts = fs::OpenOptions::new();
        opts.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o664);
        }

        let mut file = opts.open(path).map_err(|source| CubeError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let header = match Header::read_from(&mut file) {
            Ok(header) => {
                if header.block_type != BlockType::Raw {
                    return Err(CubeError::BadBlockType(header.block_type as u8));
                }
                header.ensure_voxel::<T>()?;
                header
            }
            Err(_) => {
                let header = Header::new_raw::<T>();
                header.write_to(&mut file)?;
                file.set_len(header.expected_file_len())?;

                tracing::debug!("created raw container {}: {}", path.display(), header.summary());
                header
            }
        };

        Ok(CubeFile { file, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Read `(2^side_log2)³` voxels starting at block `start_blk` into a
    /// natural-order cube buffer
    pub fn read_cube<T: Voxel>(
        &mut self,
        start_blk: u32,
        side_log2: u32,
        out: &mut [T],
    ) -> Result<()> {
        if self.header.block_type.is_compressed() {
            self.read_lz4_blocks(start_blk, side_log2, out)
        } else {
            self.read_raw_blocks(start_blk, side_log2, out)
        }
    }

    fn read_raw_blocks<T: Voxel>(
        &mut self,
        start_blk: u32,
        side_log2: u32,
        out: &mut [T],
    ) -> Result<()> {
        let block_count = self.block_range(start_blk, side_log2)?;
        let block_size = self.header.block_size() as u64;

        self.file
            .seek(SeekFrom::Start(self.header.data_offset + start_blk as u64 * block_size))?;

        let mut morton_buf = vec![T::default(); self.header.block_vol()];
        let mut natural_buf = vec![T::default(); self.header.block_vol()];

        for blk_idx in 0..block_count as u32 {
            self.file.read_exact(utils::as_bytes_mut(&mut morton_buf))?;
            block::from_morton(&morton_buf, &mut natural_buf);

            let origin = block::block_origin(side_log2, blk_idx);
            block::copy_block(&natural_buf, BLOCK_LEN_LOG2, &mut out[origin..], side_log2);
        }

        Ok(())
    }

    fn read_lz4_blocks<T: Voxel>(
        &mut self,
        start_blk: u32,
        side_log2: u32,
        out: &mut [T],
    ) -> Result<()> {
        let block_count = self.block_range(start_blk, side_log2)?;
        let block_size = self.header.block_size();

        // Load the jump-table window bounding the requested blocks. The
        // first entry is the end offset of the preceding block; for block
        // 0 that slot is the header's own dataOffset field, which sits
        // directly in front of the table.
        let mut jump_table = vec![0u64; block_count + 1];
        let window_pos = (HEADER_SIZE - mem::size_of::<u64>()) as u64
            + start_blk as u64 * mem::size_of::<u64>() as u64;
        self.file.seek(SeekFrom::Start(window_pos))?;
        self.file.read_exact(utils::as_bytes_mut(&mut jump_table))?;

        self.file.seek(SeekFrom::Start(jump_table[0]))?;

        let mut enc_buf = vec![0u8; compression::compress_bound(block_size)?];
        let mut morton_buf = vec![T::default(); self.header.block_vol()];
        let mut natural_buf = vec![T::default(); self.header.block_vol()];

        for blk_idx in 0..block_count as u32 {
            let window = blk_idx as usize;
            let enc_len = jump_table[window + 1]
                .checked_sub(jump_table[window])
                .ok_or_else(|| CubeError::Codec("jump table is not monotonic".into()))?
                as usize;
            if enc_len > enc_buf.len() {
                return Err(CubeError::Codec(format!(
                    "encoded block of {} bytes exceeds the compression bound",
                    enc_len
                )));
            }

            self.file.read_exact(&mut enc_buf[..enc_len])?;

            let raw_len =
                compression::decompress(&enc_buf[..enc_len], utils::as_bytes_mut(&mut morton_buf))?;
            if raw_len != block_size {
                return Err(CubeError::Codec(format!(
                    "block decoded to {} bytes, expected {}",
                    raw_len, block_size
                )));
            }

            block::from_morton(&morton_buf, &mut natural_buf);

            let origin = block::block_origin(side_log2, blk_idx);
            block::copy_block(&natural_buf, BLOCK_LEN_LOG2, &mut out[origin..], side_log2);
        }

        Ok(())
    }

    /// Serialize a natural-order cube buffer into Morton-order blocks
    /// starting at block `start_blk`
    ///
    /// The write is not atomic: blocks written before a failure stay
    /// durable, the remainder is untouched.
    pub fn write_cube<T: Voxel>(
        &mut self,
        start_blk: u32,
        side_log2: u32,
        cube: &[T],
    ) -> Result<()> {
        let block_count = self.block_range(start_blk, side_log2)?;
        let block_size = self.header.block_size() as u64;

        self.file
            .seek(SeekFrom::Start(self.header.data_offset + start_blk as u64 * block_size))?;

        let mut natural_buf = vec![T::default(); self.header.block_vol()];
        let mut morton_buf = vec![T::default(); self.header.block_vol()];

        for blk_idx in 0..block_count as u32 {
            let origin = block::block_origin(side_log2, blk_idx);
            block::copy_block(&cube[origin..], side_log2, &mut natural_buf, BLOCK_LEN_LOG2);
            block::to_morton(&natural_buf, &mut morton_buf);

            self.file.write_all(utils::as_bytes(&morton_buf))?;
        }

        Ok(())
    }

    /// Rewrite the raw container at `src_path` as a compressed container
    /// at `dst_path`, building the jump table
    ///
    /// Returns the total number of encoded payload bytes. Output bytes are
    /// deterministic for a given input and codec.
    pub fn compress_into(src_path: &Path, dst_path: &Path, codec: &dyn Compressor) -> Result<u64> {
        let mut src = CubeFile::open(src_path)?;
        if src.header.block_type != BlockType::Raw {
            return Err(CubeError::BadBlockType(src.header.block_type as u8));
        }

        let mut opts = fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o664);
        }
        let mut dst = opts.open(dst_path).map_err(|source| CubeError::OpenFailed {
            path: dst_path.to_path_buf(),
            source,
        })?;

        let header = src.header.compressed(codec.block_type());
        let block_size = src.header.block_size();

        // Stream blocks behind the reserved header and jump-table region,
        // then come back and write both.
        src.file.seek(SeekFrom::Start(src.header.data_offset))?;
        dst.seek(SeekFrom::Start(header.data_offset))?;

        let mut raw_buf = vec![0u8; block_size];
        let mut enc_buf = vec![0u8; compression::compress_bound(block_size)?];
        let mut jump_table = vec![0u64; header.file_block_count()];
        let mut jump_entry = header.data_offset;

        for entry in jump_table.iter_mut() {
            src.file.read_exact(&mut raw_buf)?;
            let enc_len = codec.compress(&raw_buf, &mut enc_buf)?;
            dst.write_all(&enc_buf[..enc_len])?;

            jump_entry += enc_len as u64;
            *entry = jump_entry;
        }

        header.write_to(&mut dst)?;
        dst.write_all(utils::as_bytes(&jump_table))?;

        let encoded = jump_entry - header.data_offset;
        tracing::debug!(
            "compressed {} -> {}: {} encoded bytes, {:.1}% of raw",
            src_path.display(),
            dst_path.display(),
            encoded,
            100.0 * encoded as f64 / src.header.file_size() as f64,
        );

        Ok(encoded)
    }

    /// Number of blocks covered by a cube of side `2^side_log2`, after
    /// checking that the run starting at `start_blk` stays in bounds
    fn block_range(&self, start_blk: u32, side_log2: u32) -> Result<usize> {
        debug_assert!(side_log2 >= BLOCK_LEN_LOG2);

        let block_count = 1usize << (3 * (side_log2 - BLOCK_LEN_LOG2));
        let file_blocks = self.header.file_block_count();

        if (start_blk as usize) >= file_blocks || block_count > file_blocks - start_blk as usize {
            return Err(CubeError::BadBlockIndex(start_blk as u64));
        }

        Ok(block_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = CubeFile::open(&dir.path().join("missing.vc")).unwrap_err();
        assert!(matches!(err, CubeError::OpenFailed { .. }));
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn test_create_allocates_sparse_container() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fresh.vc");

        let cube_file = CubeFile::open_or_create::<u8>(&path).unwrap();
        assert_eq!(cube_file.header().block_type, BlockType::Raw);
        drop(cube_file);

        let len = fs::metadata(&path).unwrap().len();
        assert_eq!(len, HEADER_SIZE as u64 + (1u64 << 30));

        // reopening validates against the existing header
        CubeFile::open_or_create::<u8>(&path).unwrap();
        let err = CubeFile::open_or_create::<u16>(&path).unwrap_err();
        assert!(matches!(err, CubeError::VoxelMismatch { .. }));
    }

    #[test]
    fn test_block_range_bounds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bounds.vc");
        let cube_file = CubeFile::open_or_create::<u8>(&path).unwrap();

        assert_eq!(cube_file.block_range(0, 5).unwrap(), 1);
        assert_eq!(cube_file.block_range(0, 10).unwrap(), 32 * 32 * 32);
        assert_eq!(cube_file.block_range(32767, 5).unwrap(), 1);

        assert!(matches!(
            cube_file.block_range(32768, 5),
            Err(CubeError::BadBlockIndex(32768))
        ));
        assert!(matches!(
            cube_file.block_range(1, 10),
            Err(CubeError::BadBlockIndex(1))
        ));
    }
}
