//! ROOT compression blocks (ZL = zlib, L4 = LZ4, ZS = ZSTD, XZ = LZMA).
//!
//! ROOT stores a compressed payload as one or more blocks, each behind a
//! 9-byte header:
//! ```text
//! bytes 0-1:  algorithm tag ("ZL", "XZ", "L4", "ZS")
//! byte  2:    method
//! bytes 3-5:  compressed size   (3-byte little-endian)
//! bytes 6-8:  uncompressed size (3-byte little-endian)
//! ```
//! Reading handles all four algorithms; writing produces zlib blocks only.

use std::io::{Read, Write};

use crate::error::{Result, RootError};

/// Largest payload a single block can describe.
pub const MAX_BLOCK_LEN: usize = 0xFF_FFFF;

/// Payloads up to this size are always stored raw.
pub const MIN_COMPRESS_LEN: usize = 256;

const HEADER_LEN: usize = 9;

/// Compression applied to written objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Store payloads raw.
    None,
    /// zlib at the given level (1-9).
    Zlib(u32),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Zlib(1)
    }
}

impl Compression {
    /// The `fCompress` setting ROOT records for this choice
    /// (`100 * algorithm + level`, zlib being algorithm 1).
    pub fn root_setting(self) -> i32 {
        match self {
            Compression::None => 0,
            Compression::Zlib(level) => 100 + level.clamp(1, 9) as i32,
        }
    }
}

/// Parsed 9-byte block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockHeader {
    tag: [u8; 2],
    method: u8,
    compressed_len: usize,
    uncompressed_len: usize,
}

impl BlockHeader {
    fn parse(b: &[u8]) -> Self {
        BlockHeader {
            tag: [b[0], b[1]],
            method: b[2],
            compressed_len: read_le24(&b[3..6]),
            uncompressed_len: read_le24(&b[6..9]),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.tag);
        out.push(self.method);
        out.extend_from_slice(&write_le24(self.compressed_len));
        out.extend_from_slice(&write_le24(self.uncompressed_len));
    }
}

/// Decompress ROOT-compressed data into `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len && offset + HEADER_LEN <= src.len() {
        let header = BlockHeader::parse(&src[offset..offset + HEADER_LEN]);
        offset += HEADER_LEN;

        let end = offset + header.compressed_len;
        if end > src.len() {
            return Err(RootError::Decompression(format!(
                "compressed block claims {} bytes but only {} remain",
                header.compressed_len,
                src.len() - offset
            )));
        }
        let block = &src[offset..end];
        let expected = header.uncompressed_len;

        let decoded = match &header.tag {
            b"ZL" => decompress_zlib(block, expected)?,
            b"L4" => decompress_lz4(block, expected)?,
            b"ZS" => decompress_zstd(block, expected)?,
            b"XZ" => decompress_xz(block, expected)?,
            tag => {
                return Err(RootError::Decompression(format!(
                    "unsupported compression algorithm: {:?}",
                    String::from_utf8_lossy(tag)
                )));
            }
        };

        if decoded.len() != expected {
            return Err(RootError::Decompression(format!(
                "expected {} uncompressed bytes, got {}",
                expected,
                decoded.len()
            )));
        }

        out.extend_from_slice(&decoded);
        offset = end;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "total decompressed length {} != expected {}",
            out.len(),
            expected_len
        )));
    }

    Ok(out)
}

/// Compress `src` into zlib blocks at `level`.
pub fn compress_zlib(src: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(src.len() / 2 + HEADER_LEN);
    for chunk in src.chunks(MAX_BLOCK_LEN) {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level.clamp(1, 9)));
        encoder.write_all(chunk)?;
        let body = encoder.finish()?;
        if body.len() > MAX_BLOCK_LEN {
            return Err(RootError::Write(format!(
                "zlib block of {} bytes does not fit a ROOT block header",
                body.len()
            )));
        }
        BlockHeader {
            tag: *b"ZL",
            method: 8,
            compressed_len: body.len(),
            uncompressed_len: chunk.len(),
        }
        .write(&mut out);
        out.extend_from_slice(&body);
    }
    Ok(out)
}

/// Compress a key payload if the setting asks for it and it pays off.
///
/// Returns `None` when the payload should be stored raw.
pub fn maybe_compress(payload: &[u8], compression: Compression) -> Result<Option<Vec<u8>>> {
    let Compression::Zlib(level) = compression else {
        return Ok(None);
    };
    if payload.len() <= MIN_COMPRESS_LEN {
        return Ok(None);
    }
    let packed = compress_zlib(payload, level)?;
    if packed.len() >= payload.len() {
        log::debug!("compression gains nothing on {} bytes; storing raw", payload.len());
        return Ok(None);
    }
    Ok(Some(packed))
}

fn decompress_zlib(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(expected);
    decoder.read_to_end(&mut out).map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
    Ok(out)
}

fn decompress_lz4(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    // 8-byte xxhash64 checksum precedes the LZ4 payload; not verified.
    if data.len() < 8 {
        return Err(RootError::Decompression("LZ4 block too small for checksum header".into()));
    }
    lz4_flex::decompress(&data[8..], expected)
        .map_err(|e| RootError::Decompression(format!("lz4: {e}")))
}

fn decompress_zstd(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; expected];
    let written = ruzstd::decoding::FrameDecoder::new()
        .decode_all(data, &mut out)
        .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    out.truncate(written);
    Ok(out)
}

fn decompress_xz(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut input = std::io::BufReader::new(data);
    let mut out = Vec::with_capacity(expected);
    lzma_rs::xz_decompress(&mut input, &mut out)
        .map_err(|e| RootError::Decompression(format!("xz: {e}")))?;
    Ok(out)
}

fn read_le24(b: &[u8]) -> usize {
    b[0] as usize | ((b[1] as usize) << 8) | ((b[2] as usize) << 16)
}

fn write_le24(v: usize) -> [u8; 3] {
    [(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_root_block(tag: &[u8; 2], method: u8, compressed: &[u8], u_len: usize) -> Vec<u8> {
        let mut block = Vec::new();
        BlockHeader { tag: *tag, method, compressed_len: compressed.len(), uncompressed_len: u_len }
            .write(&mut block);
        block.extend_from_slice(compressed);
        block
    }

    #[test]
    fn le24() {
        assert_eq!(read_le24(&[0x10, 0x00, 0x00]), 16);
        assert_eq!(read_le24(&[0xff, 0xff, 0xff]), MAX_BLOCK_LEN);
        assert_eq!(read_le24(&write_le24(70_000)), 70_000);
    }

    #[test]
    fn zlib_blocks_decode() {
        let original: Vec<u8> = (0..5000u32).flat_map(|i| (i % 17).to_be_bytes()).collect();
        let packed = compress_zlib(&original, 1).unwrap();
        assert_eq!(&packed[..2], b"ZL");
        assert_eq!(packed[2], 8);
        assert!(packed.len() < original.len());
        assert_eq!(decompress(&packed, original.len()).unwrap(), original);
    }

    #[test]
    fn zstd_block_decodes() {
        let original = b"Hello ROOT ZSTD compression! Repeated data: BBBBBBBBBB";
        let compressed = ruzstd::encoding::compress_to_vec(
            &original[..],
            ruzstd::encoding::CompressionLevel::Fastest,
        );
        let block = make_root_block(b"ZS", 0x04, &compressed, original.len());
        assert_eq!(decompress(&block, original.len()).unwrap(), &original[..]);
    }

    #[test]
    fn xz_block_decodes() {
        let original = b"Hello ROOT XZ compression! Repeated data: CCCCCCCCCC";
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut std::io::BufReader::new(&original[..]), &mut compressed).unwrap();
        let block = make_root_block(b"XZ", 0x05, &compressed, original.len());
        assert_eq!(decompress(&block, original.len()).unwrap(), &original[..]);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let block = make_root_block(b"QQ", 0, &[1, 2, 3], 3);
        assert!(matches!(decompress(&block, 3), Err(RootError::Decompression(_))));
    }

    #[test]
    fn truncated_block_is_rejected() {
        let mut block = make_root_block(b"ZL", 8, &[0u8; 40], 100);
        block.truncate(20);
        assert!(decompress(&block, 100).is_err());
    }

    #[test]
    fn small_or_incompressible_payloads_stay_raw() {
        assert!(maybe_compress(&[7u8; 100], Compression::Zlib(1)).unwrap().is_none());
        assert!(maybe_compress(&[7u8; 1000], Compression::None).unwrap().is_none());
        assert!(maybe_compress(&[7u8; 1000], Compression::Zlib(1)).unwrap().is_some());

        // pseudo-random bytes do not shrink
        let mut x = 0x2545_f491_u32;
        let noise: Vec<u8> = (0..600)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect();
        assert!(maybe_compress(&noise, Compression::Zlib(1)).unwrap().is_none());
    }

    #[test]
    fn root_setting_codes() {
        assert_eq!(Compression::None.root_setting(), 0);
        assert_eq!(Compression::Zlib(1).root_setting(), 101);
        assert_eq!(Compression::Zlib(42).root_setting(), 109);
    }
}
