//! Public entry points for container operations
//!
//! Every operation takes a path, opens its own file handle, finishes the
//! whole transfer synchronously and releases the handle before returning.
//! No file state is retained across calls.

use crate::compression::get_compressor;
use crate::error::{CubeError, Result};
use crate::file::CubeFile;
use crate::header::Header;
use crate::morton;
use crate::types::{BlockType, Voxel};
use crate::utils;
use crate::{BLOCK_LEN_LOG2, FILE_LEN, FILE_LEN_VX_LOG2};
use std::path::Path;

/// Read a cube of voxel data from a container file
///
/// # Arguments
/// * `path` - Path to the container file
/// * `offset` - X, Y and Z voxel offset of the cube; each entry must be a
///   multiple of `side`
/// * `side` - Side length of the cube; a power of two between the block
///   side and the file side
/// * `out` - Destination buffer of exactly `side³` voxels, filled in
///   natural order (X fastest, then Y, then Z)
///
/// Dispatches on the container's block type; raw and LZ4-compressed
/// containers are read through the same interface.
pub fn read<T: Voxel>(
    path: impl AsRef<Path>,
    offset: [u32; 3],
    side: u32,
    out: &mut [T],
) -> Result<()> {
    let path = path.as_ref();
    let (side_log2, start_blk) = validate_cube(offset, side, out.len())?;

    let mut file = CubeFile::open(path)?;
    file.header().ensure_voxel::<T>()?;

    tracing::trace!(
        "read {}³ at {:?} from {} ({})",
        side,
        offset,
        path.display(),
        file.header().block_type,
    );

    file.read_cube(start_blk, side_log2, out)
}

/// Write a cube of voxel data into a raw container file
///
/// Creates the container if `path` does not hold one yet; an existing
/// container must be raw and carry voxel type `T`. The cube in `in_data`
/// is in natural order and `side³` voxels long, with the same offset and
/// side constraints as [`read`].
pub fn write_raw<T: Voxel>(
    path: impl AsRef<Path>,
    offset: [u32; 3],
    side: u32,
    in_data: &[T],
) -> Result<()> {
    let path = path.as_ref();
    let (side_log2, start_blk) = validate_cube(offset, side, in_data.len())?;

    let mut file = CubeFile::open_or_create::<T>(path)?;

    tracing::trace!("write {}³ at {:?} to {}", side, offset, path.display());

    file.write_cube(start_blk, side_log2, in_data)
}

/// Rewrite the raw container at `src_path` as an LZ4-HC-compressed
/// container at `dst_path`
///
/// Returns the number of encoded payload bytes.
pub fn compress(src_path: impl AsRef<Path>, dst_path: impl AsRef<Path>) -> Result<u64> {
    compress_with(src_path, dst_path, BlockType::Lz4Hc)
}

/// Like [`compress`], but with an explicit target block encoding
pub fn compress_with(
    src_path: impl AsRef<Path>,
    dst_path: impl AsRef<Path>,
    block_type: BlockType,
) -> Result<u64> {
    let codec =
        get_compressor(block_type).ok_or(CubeError::BadBlockType(block_type as u8))?;

    CubeFile::compress_into(src_path.as_ref(), dst_path.as_ref(), codec.as_ref())
}

/// Read and validate the header of a container file
pub fn read_header(path: impl AsRef<Path>) -> Result<Header> {
    Ok(CubeFile::open(path.as_ref())?.header().clone())
}

/// Validate cube side, buffer length and offset alignment, and compute
/// the Morton index of the starting block
fn validate_cube(offset: [u32; 3], side: u32, buf_len: usize) -> Result<(u32, u32)> {
    let side_log2 = utils::log2_exact(side as u64).ok_or(CubeError::BadCubeSize(side))?;
    if !(BLOCK_LEN_LOG2..=FILE_LEN_VX_LOG2).contains(&side_log2) {
        return Err(CubeError::BadCubeSize(side));
    }
    if buf_len != 1usize << (3 * side_log2) {
        return Err(CubeError::BadCubeSize(side));
    }

    for &axis in &offset {
        if axis % side != 0 || axis > FILE_LEN as u32 - side {
            return Err(CubeError::BadAlignment(offset));
        }
    }

    let start_blk = morton::encode3(
        offset[0] >> BLOCK_LEN_LOG2,
        offset[1] >> BLOCK_LEN_LOG2,
        offset[2] >> BLOCK_LEN_LOG2,
    );

    Ok((side_log2, start_blk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_cube_sides() {
        let out = 0usize;
        assert!(matches!(
            validate_cube([0, 0, 0], 0, out),
            Err(CubeError::BadCubeSize(0))
        ));
        assert!(matches!(
            validate_cube([0, 0, 0], 48, out),
            Err(CubeError::BadCubeSize(48))
        ));
        assert!(matches!(
            validate_cube([0, 0, 0], 16, out),
            Err(CubeError::BadCubeSize(16))
        ));
        assert!(matches!(
            validate_cube([0, 0, 0], 2048, out),
            Err(CubeError::BadCubeSize(2048))
        ));
    }

    #[test]
    fn test_rejects_wrong_buffer_length() {
        assert!(matches!(
            validate_cube([0, 0, 0], 32, 32 * 32 * 32 - 1),
            Err(CubeError::BadCubeSize(32))
        ));
        assert!(validate_cube([0, 0, 0], 32, 32 * 32 * 32).is_ok());
    }

    #[test]
    fn test_rejects_misaligned_offsets() {
        let vol = 32 * 32 * 32;
        assert!(matches!(
            validate_cube([1, 0, 0], 32, vol),
            Err(CubeError::BadAlignment([1, 0, 0]))
        ));
        assert!(matches!(
            validate_cube([0, 48, 0], 32, vol),
            Err(CubeError::BadAlignment(_))
        ));
        // aligned to the cube side but past the file end
        assert!(matches!(
            validate_cube([1024, 0, 0], 32, vol),
            Err(CubeError::BadAlignment(_))
        ));

        let vol = 64 * 64 * 64;
        // multiple of the block side but not of the cube side
        assert!(matches!(
            validate_cube([32, 0, 0], 64, vol),
            Err(CubeError::BadAlignment(_))
        ));
    }

    #[test]
    fn test_start_block_follows_morton_index() {
        let vol = 32 * 32 * 32;
        for (off, expected) in [
            ([0, 0, 0], 0),
            ([32, 0, 0], 1),
            ([0, 32, 0], 2),
            ([0, 0, 32], 4),
            ([992, 992, 992], 32767),
        ] {
            let (side_log2, start_blk) = validate_cube(off, 32, vol).unwrap();
            assert_eq!(side_log2, 5);
            assert_eq!(start_blk, expected);

            let (bx, by, bz) = morton::decode3(start_blk);
            assert_eq!([bx * 32, by * 32, bz * 32], off);
        }
    }

    #[test]
    fn test_full_file_cube() {
        let vol = 1024 * 1024 * 1024;
        let (side_log2, start_blk) = validate_cube([0, 0, 0], 1024, vol).unwrap();
        assert_eq!(side_log2, 10);
        assert_eq!(start_blk, 0);

        // the only valid offset for a full-file cube is the origin
        assert!(validate_cube([1024, 0, 0], 1024, vol).is_err());
    }
}
