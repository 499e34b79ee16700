//! RBF firmware image handling
//!
//! An RBF file is an opaque FPGA bitstream; only its length and bytes matter
//! here. The image is split into 256-byte blocks for programming, with the
//! final block padded to a full 256 bytes with 0xFF (blank flash).

use std::path::Path;

use crate::errors::{FlashError, Result};

/// Payload bytes carried by one program-block packet
pub const BLOCK_SIZE: usize = 256;

/// Fill byte for the tail of the final block
pub const PAD_BYTE: u8 = 0xFF;

/// An in-memory firmware image, immutable for the duration of a
/// programming run
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    data: Vec<u8>,
    source: String,
}

impl FirmwareImage {
    /// Read an RBF file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            FlashError::Firmware(format!("failed to read {}: {}", path.display(), e))
        })?;
        if data.is_empty() {
            return Err(FlashError::Firmware(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(Self {
            data,
            source: path.display().to_string(),
        })
    }

    /// Wrap bytes already in memory (server uploads)
    pub fn from_bytes(data: Vec<u8>, source: impl Into<String>) -> Self {
        Self {
            data,
            source: source.into(),
        }
    }

    /// Image length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Where the image came from (path or upload name)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of 256-byte blocks: ceil(len / 256)
    pub fn blocks(&self) -> u32 {
        self.data.len().div_ceil(BLOCK_SIZE) as u32
    }

    /// Bytes the image occupies once padded to whole blocks
    pub fn padded_len(&self) -> usize {
        self.blocks() as usize * BLOCK_SIZE
    }

    /// The `index`-th 256-byte block, 0xFF-padded when the image tail is
    /// shorter than a full block. Returns None past the end.
    pub fn block(&self, index: u32) -> Option<[u8; BLOCK_SIZE]> {
        if index >= self.blocks() {
            return None;
        }
        let start = index as usize * BLOCK_SIZE;
        let end = (start + BLOCK_SIZE).min(self.data.len());
        let mut block = [PAD_BYTE; BLOCK_SIZE];
        block[..end - start].copy_from_slice(&self.data[start..end]);
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(len: usize) -> FirmwareImage {
        FirmwareImage::from_bytes(vec![0xAB; len], "test.rbf")
    }

    #[test]
    fn test_block_count() {
        assert_eq!(image(256).blocks(), 1);
        assert_eq!(image(257).blocks(), 2);
        assert_eq!(image(511).blocks(), 2);
        assert_eq!(image(512).blocks(), 2);
        assert_eq!(image(1).blocks(), 1);
        assert_eq!(
            FirmwareImage::from_bytes(Vec::new(), "empty.rbf").blocks(),
            0
        );
    }

    #[test]
    fn test_padded_len() {
        assert_eq!(image(257).padded_len(), 512);
        assert_eq!(image(256).padded_len(), 256);
    }

    #[test]
    fn test_final_block_padding() {
        let img = image(257);
        let last = img.block(1).unwrap();
        assert_eq!(last[0], 0xAB);
        assert!(last[1..].iter().all(|&b| b == PAD_BYTE));
    }

    #[test]
    fn test_block_out_of_range() {
        assert!(image(256).block(1).is_none());
    }

    #[test]
    fn test_open_missing_file() {
        let err = FirmwareImage::open("/nonexistent/missing.rbf").unwrap_err();
        assert!(matches!(err, FlashError::Firmware(_)));
    }

    #[test]
    fn test_open_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.rbf");
        std::fs::write(&path, b"").unwrap();
        let err = FirmwareImage::open(&path).unwrap_err();
        assert!(matches!(err, FlashError::Firmware(_)));
    }
}
