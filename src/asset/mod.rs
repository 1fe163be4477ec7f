//! GIF to RGB565 + LZ4 conversion and the GIFL container format.
//!
//! Firmware plays these containers straight out of flash/PSRAM: it reads
//! the header, walks the length-prefixed records and LZ4-decompresses one
//! frame at a time into an RGB565 frame buffer.
//!
//! # File Format
//!
//! All integers are little-endian.
//!
//! ```text
//! Header (16 bytes):
//!   Magic: "GIFL" (4 bytes)
//!   Width: u16
//!   Height: u16
//!   Frame rate: u8 (rounded, whole animation)
//!   Reserved: u8 (0)
//!   Frame count: u16
//!   Header size: u32 (16, offset of the frame table)
//!
//! Frame table (frame_count records, in playback order):
//!   Compressed length: u32
//!   Raw LZ4 block (no size prefix) of width * height * 2 bytes of RGB565
//! ```

mod encoder;
mod format;
mod player;
pub(crate) mod source;

pub use encoder::{
    CONTAINER_EXTENSION, ContainerStats, ContainerWriter, EncodeReport, derive_frame_rate, encode,
    encode_frame, header_fps, output_path, write_container,
};
pub use format::{
    BYTES_PER_PIXEL, ContainerHeader, GIFL_MAGIC, HEADER_SIZE, compress_block, decompress_block,
};
pub use player::{FrameIndex, FrameIterator, GiflPlayer, Region, diff_region, playback_interval_ms};
pub use source::{
    DEFAULT_DELAY_MS, SourceAnimation, SourceFrame, effective_delay_ms, quantize_rgb565, rgb565,
};
