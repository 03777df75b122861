//! Per-block compression codecs
//!
//! Compressed containers store each block as a bare LZ4 payload with no
//! frame header; the jump table carries the lengths. LZ4 and LZ4-HC
//! produce different bytes on encode but share one decoder.

use crate::error::{CubeError, Result};
use crate::types::BlockType;
use lz4::block::{self, CompressionMode};

/// LZ4-HC compression level used when no level is given, matching the
/// library's own default
pub const LZ4HC_DEFAULT_LEVEL: i32 = 9;

/// Worst-case encoded size for a raw block of `raw_len` bytes
pub fn compress_bound(raw_len: usize) -> Result<usize> {
    block::compress_bound(raw_len).map_err(|e| CubeError::Codec(e.to_string()))
}

/// Decode one LZ4 payload into `raw`, which must be sized to the exact
/// decoded block length
///
/// The decoder is bounded by the destination slice and refuses to
/// overrun it. Returns the number of decoded bytes.
pub fn decompress(enc: &[u8], raw: &mut [u8]) -> Result<usize> {
    block::decompress_to_buffer(enc, Some(raw.len() as i32), raw)
        .map_err(|e| CubeError::Codec(e.to_string()))
}

/// Trait for block encoders
pub trait Compressor: Send + Sync {
    /// Encode `raw` into `enc`, returning the encoded length
    ///
    /// `enc` must hold at least [`compress_bound`] of `raw.len()` bytes.
    fn compress(&self, raw: &[u8], enc: &mut [u8]) -> Result<usize>;

    /// Block type tag stamped on containers produced with this encoder
    fn block_type(&self) -> BlockType;
}

/// Fast LZ4 encoder
#[derive(Debug, Default)]
pub struct Lz4Compressor;

impl Compressor for Lz4Compressor {
    fn compress(&self, raw: &[u8], enc: &mut [u8]) -> Result<usize> {
        block::compress_to_buffer(raw, Some(CompressionMode::DEFAULT), false, enc)
            .map_err(|e| CubeError::Codec(e.to_string()))
    }

    fn block_type(&self) -> BlockType {
        BlockType::Lz4
    }
}

/// LZ4-HC encoder at the default compression level
#[derive(Debug, Default)]
pub struct Lz4HcCompressor;

impl Compressor for Lz4HcCompressor {
    fn compress(&self, raw: &[u8], enc: &mut [u8]) -> Result<usize> {
        block::compress_to_buffer(
            raw,
            Some(CompressionMode::HIGHCOMPRESSION(LZ4HC_DEFAULT_LEVEL)),
            false,
            enc,
        )
        .map_err(|e| CubeError::Codec(e.to_string()))
    }

    fn block_type(&self) -> BlockType {
        BlockType::Lz4Hc
    }
}

/// Get the encoder for a compressed block type
///
/// Returns `None` for [`BlockType::Raw`], which has no codec.
pub fn get_compressor(block_type: BlockType) -> Option<Box<dyn Compressor>> {
    match block_type {
        BlockType::Raw => None,
        BlockType::Lz4 => Some(Box::new(Lz4Compressor)),
        BlockType::Lz4Hc => Some(Box::new(Lz4HcCompressor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Vec<u8> {
        (0..32 * 32 * 32).map(|i| (i % 17) as u8).collect()
    }

    #[test]
    fn test_lz4_round_trip() {
        let raw = sample_block();
        let mut enc = vec![0u8; compress_bound(raw.len()).unwrap()];
        let mut out = vec![0u8; raw.len()];

        let enc_len = Lz4Compressor.compress(&raw, &mut enc).unwrap();
        assert!(enc_len > 0 && enc_len < raw.len());

        let raw_len = decompress(&enc[..enc_len], &mut out).unwrap();
        assert_eq!(raw_len, raw.len());
        assert_eq!(out, raw);
    }

    #[test]
    fn test_lz4_hc_round_trip() {
        let raw = sample_block();
        let mut enc = vec![0u8; compress_bound(raw.len()).unwrap()];
        let mut out = vec![0u8; raw.len()];

        let enc_len = Lz4HcCompressor.compress(&raw, &mut enc).unwrap();
        let raw_len = decompress(&enc[..enc_len], &mut out).unwrap();
        assert_eq!(raw_len, raw.len());
        assert_eq!(out, raw);
    }

    #[test]
    fn test_hc_encode_is_deterministic() {
        let raw = sample_block();
        let mut enc_a = vec![0u8; compress_bound(raw.len()).unwrap()];
        let mut enc_b = vec![0u8; compress_bound(raw.len()).unwrap()];

        let len_a = Lz4HcCompressor.compress(&raw, &mut enc_a).unwrap();
        let len_b = Lz4HcCompressor.compress(&raw, &mut enc_b).unwrap();
        assert_eq!(enc_a[..len_a], enc_b[..len_b]);
    }

    #[test]
    fn test_decoder_refuses_overrun() {
        let raw = sample_block();
        let mut enc = vec![0u8; compress_bound(raw.len()).unwrap()];
        let enc_len = Lz4Compressor.compress(&raw, &mut enc).unwrap();

        // a destination smaller than the decoded block must fail, not spill
        let mut short = vec![0u8; raw.len() - 1];
        assert!(decompress(&enc[..enc_len], &mut short).is_err());
    }

    #[test]
    fn test_get_compressor() {
        assert!(get_compressor(BlockType::Raw).is_none());
        assert_eq!(
            get_compressor(BlockType::Lz4).unwrap().block_type(),
            BlockType::Lz4
        );
        assert_eq!(
            get_compressor(BlockType::Lz4Hc).unwrap().block_type(),
            BlockType::Lz4Hc
        );
    }
}
