//! Binary format definitions for GIFL containers.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Magic bytes identifying a GIFL container.
pub const GIFL_MAGIC: &[u8; 4] = b"GIFL";

/// Size of the fixed header, also stored in the header itself.
pub const HEADER_SIZE: u32 = 16;

/// Size of the length prefix in front of every frame record.
pub const RECORD_PREFIX_SIZE: usize = 4;

/// Bytes per RGB565 pixel.
pub const BYTES_PER_PIXEL: usize = 2;

/// Fixed-size header at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Animation width in pixels.
    pub width: u16,
    /// Animation height in pixels.
    pub height: u16,
    /// Playback rate for the whole animation.
    pub fps: u8,
    /// Number of frame records following the header.
    pub frame_count: u16,
    /// Offset of the frame table. Always `HEADER_SIZE` for containers
    /// written by this crate; the player honours whatever is stored.
    pub data_offset: u32,
}

impl ContainerHeader {
    pub fn new(width: u16, height: u16, fps: u8, frame_count: u16) -> Self {
        Self {
            width,
            height,
            fps,
            frame_count,
            data_offset: HEADER_SIZE,
        }
    }

    /// Size of one decompressed RGB565 frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }

    /// Write header to output.
    ///
    /// Layout: magic(4) width(2) height(2) fps(1) reserved(1) frames(2)
    /// header_size(4), little-endian.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(GIFL_MAGIC)?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&[self.fps, 0])?;
        w.write_all(&self.frame_count.to_le_bytes())?;
        w.write_all(&self.data_offset.to_le_bytes())?;
        Ok(())
    }

    /// Read header from input.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE as usize];
        r.read_exact(&mut bytes).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                Error::Format(format!("header truncated, expected {} bytes", HEADER_SIZE))
            }
            _ => Error::Format(format!("failed to read header: {}", e)),
        })?;

        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if &magic != GIFL_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        Ok(Self {
            width: u16::from_le_bytes([bytes[4], bytes[5]]),
            height: u16::from_le_bytes([bytes[6], bytes[7]]),
            fps: bytes[8],
            frame_count: u16::from_le_bytes([bytes[10], bytes[11]]),
            data_offset: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        })
    }
}

/// Write one length-prefixed frame record.
pub fn write_record<W: Write>(w: &mut W, compressed: &[u8]) -> io::Result<()> {
    let len = u32::try_from(compressed.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds u32 length prefix", compressed.len()),
        )
    })?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(compressed)?;
    Ok(())
}

/// Compress an RGB565 raster as a raw LZ4 block without a size prefix.
pub fn compress_block(raster: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(raster)
}

/// Decompress a raw LZ4 block that must expand to exactly `expected` bytes.
pub fn decompress_block(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let raw = lz4_flex::block::decompress(data, expected)
        .map_err(|e| Error::Compression(e.to_string()))?;
    if raw.len() != expected {
        return Err(Error::Compression(format!(
            "expected {} bytes, got {}",
            expected,
            raw.len()
        )));
    }
    Ok(raw)
}
