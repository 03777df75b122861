//! Block layout inside cube buffers
//!
//! A cube buffer is a dense array of `side³` voxels in natural order
//! (X fastest, then Y, then Z). A serialized block holds `BLOCK_VOL`
//! voxels in Morton order over the in-block coordinates. The kernels
//! here translate between the two along block boundaries.

use crate::morton;
use crate::types::Voxel;
use crate::{BLOCK_LEN, BLOCK_LEN_LOG2, BLOCK_VOL};

/// Voxel offset of block `blk_idx` inside a natural-order cube buffer
/// of side `2^side_log2`
///
/// Block coordinates come from the Morton decode of the index, so
/// iterating indices in order walks the cube along the Z-order curve.
#[inline]
pub fn block_origin(side_log2: u32, blk_idx: u32) -> usize {
    let (bx, by, bz) = morton::decode3(blk_idx);

    ((bx as usize) << BLOCK_LEN_LOG2)
        + ((by as usize) << (BLOCK_LEN_LOG2 + side_log2))
        + ((bz as usize) << (BLOCK_LEN_LOG2 + 2 * side_log2))
}

/// Copy one block-sized sub-cube between two natural-order cube buffers
///
/// Both slices are anchored at the origin of the sub-cube to copy; the
/// caller slices into the enclosing buffer first (see [`block_origin`]).
/// Rows of `BLOCK_LEN` voxels are contiguous on both sides, so the copy
/// moves one row at a time with the row and plane strides given by each
/// side length.
pub fn copy_block<T: Voxel>(src: &[T], src_side_log2: u32, dst: &mut [T], dst_side_log2: u32) {
    for z in 0..BLOCK_LEN {
        for y in 0..BLOCK_LEN {
            let src_row = (y << src_side_log2) + (z << (2 * src_side_log2));
            let dst_row = (y << dst_side_log2) + (z << (2 * dst_side_log2));

            dst[dst_row..dst_row + BLOCK_LEN].copy_from_slice(&src[src_row..src_row + BLOCK_LEN]);
        }
    }
}

/// Reorder a natural-order block buffer into Morton voxel order
pub fn to_morton<T: Voxel>(natural: &[T], morton_buf: &mut [T]) {
    debug_assert_eq!(natural.len(), BLOCK_VOL);
    debug_assert_eq!(morton_buf.len(), BLOCK_VOL);

    for z in 0..BLOCK_LEN as u32 {
        for y in 0..BLOCK_LEN as u32 {
            let row_base = morton::encode3(0, y, z);
            let row = ((y as usize) << BLOCK_LEN_LOG2) + ((z as usize) << (2 * BLOCK_LEN_LOG2));

            for x in 0..BLOCK_LEN as u32 {
                let code = row_base | morton::encode3(x, 0, 0);
                morton_buf[code as usize] = natural[row + x as usize];
            }
        }
    }
}

/// Reorder a Morton-order block buffer back into natural voxel order
pub fn from_morton<T: Voxel>(morton_buf: &[T], natural: &mut [T]) {
    debug_assert_eq!(morton_buf.len(), BLOCK_VOL);
    debug_assert_eq!(natural.len(), BLOCK_VOL);

    for z in 0..BLOCK_LEN as u32 {
        for y in 0..BLOCK_LEN as u32 {
            let row_base = morton::encode3(0, y, z);
            let row = ((y as usize) << BLOCK_LEN_LOG2) + ((z as usize) << (2 * BLOCK_LEN_LOG2));

            for x in 0..BLOCK_LEN as u32 {
                let code = row_base | morton::encode3(x, 0, 0);
                natural[row + x as usize] = morton_buf[code as usize];
            }
        }
    }
}
