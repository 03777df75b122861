//! voxcube - storage engine for dense voxel cubes
//!
//! Persists fixed-capacity 1024³ cubes of voxels in self-describing
//! single-file containers, tiled into 32³ blocks along a Morton
//! (Z-order) curve, with an optional per-block LZ4 compression layer
//! and constant-time random access to any power-of-two sub-cube.
//!
//! # Features
//!
//! - Six voxel types: u8, u16, u32, u64, f32, f64
//! - Natural-order caller buffers; all Morton reshaping happens inside
//! - Sparse raw containers that can be filled cube by cube
//! - Offline LZ4 / LZ4-HC compression with a jump table for O(1) seeks
//! - Strictly synchronous: one blocking operation per call, no retained
//!   file handles
//!
//! # Example
//!
//! ```rust,no_run
//! use voxcube::{read, write_raw, compress};
//!
//! # fn example() -> voxcube::Result<()> {
//! // Write one 32³ block at the origin of a fresh container
//! let cube = vec![7u8; 32 * 32 * 32];
//! write_raw("seg.vc", [0, 0, 0], 32, &cube)?;
//!
//! // Rewrite it compressed, then read the block back
//! compress("seg.vc", "seg.lz4.vc")?;
//! let mut out = vec![0u8; 32 * 32 * 32];
//! read("seg.lz4.vc", [0, 0, 0], 32, &mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod block;
pub mod compression;
pub mod error;
mod file;
pub mod header;
pub mod morton;
pub mod types;
pub mod utils;

// Re-exports
pub use access::{compress, compress_with, read, read_header, write_raw};
pub use compression::Compressor;
pub use error::{CubeError, Result};
pub use header::{Header, HEADER_SIZE};
pub use types::{BlockType, Voxel, VoxelType};

/// Version of the voxcube implementation
pub const VOXCUBE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Magic bytes at the start of every container file
pub const MAGIC: &[u8; 3] = b"WKW";

/// Container format version written and accepted by this crate
pub const FORMAT_VERSION: u8 = 1;

/// Log2 of the block side length in voxels
pub const BLOCK_LEN_LOG2: u32 = 5;

/// Block side length in voxels
pub const BLOCK_LEN: usize = 1 << BLOCK_LEN_LOG2;

/// Number of voxels in one block
pub const BLOCK_VOL: usize = 1 << (3 * BLOCK_LEN_LOG2);

/// Log2 of the file side length in blocks
pub const FILE_BLEN_LOG2: u32 = 5;

/// Log2 of the file side length in voxels
pub const FILE_LEN_VX_LOG2: u32 = FILE_BLEN_LOG2 + BLOCK_LEN_LOG2;

/// File side length in voxels
pub const FILE_LEN: usize = 1 << FILE_LEN_VX_LOG2;

/// Number of blocks in one file
pub const FILE_BLOCK_COUNT: usize = 1 << (3 * FILE_BLEN_LOG2);
