//! GIF decoding and RGB565 quantization.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder, ImageError};

use super::format::BYTES_PER_PIXEL;
use crate::error::{Error, Result};

/// Delay substituted when a frame declares none (or a non-positive one).
pub const DEFAULT_DELAY_MS: u32 = 100;

/// One decoded frame.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    /// Declared display delay in milliseconds, as stored in the GIF.
    pub delay_ms: u32,
    /// Row-major RGB888 raster, `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

/// All frames of a decoded GIF, in document order.
#[derive(Debug, Clone)]
pub struct SourceAnimation {
    pub width: u16,
    pub height: u16,
    pub frames: Vec<SourceFrame>,
}

impl SourceAnimation {
    /// Decode a GIF file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Decode a GIF from any seekable reader. `origin` is only used for error context.
    ///
    /// Frames are composited onto a transparent canvas and the alpha channel is
    /// dropped, so fully transparent pixels come out black. Pillow-based tools
    /// emit the palette colour at the transparent index instead; GIFs with
    /// transparent backgrounds can therefore encode differently from theirs.
    pub fn from_reader<R: BufRead + Seek>(reader: R, origin: &Path) -> Result<Self> {
        let decoder = GifDecoder::new(reader).map_err(|e| decode_error(origin, e))?;
        let (w, h) = decoder.dimensions();
        let width = u16::try_from(w)
            .map_err(|_| Error::Format(format!("width {} exceeds u16", w)))?;
        let height = u16::try_from(h)
            .map_err(|_| Error::Format(format!("height {} exceeds u16", h)))?;

        let mut frames = Vec::new();
        for frame in decoder.into_frames() {
            let frame = frame.map_err(|e| decode_error(origin, e))?;
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = if denom == 0 { 0 } else { numer / denom };

            // Frames arrive composited onto the full canvas; alpha is dropped.
            let rgba = frame.into_buffer();
            let rgb = rgba
                .as_raw()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();

            frames.push(SourceFrame { delay_ms, rgb });
        }

        Ok(Self {
            width,
            height,
            frames,
        })
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Declared delay of the first frame, if there is one.
    pub fn first_delay_ms(&self) -> Option<u32> {
        self.frames.first().map(|f| f.delay_ms)
    }

    /// True when frames declare different delays, which a single fps cannot represent.
    pub fn has_variable_delay(&self) -> bool {
        let mut delays = self.frames.iter().map(|f| effective_delay_ms(Some(f.delay_ms)));
        match delays.next() {
            Some(first) => delays.any(|d| d != first),
            None => false,
        }
    }
}

fn decode_error(path: &Path, err: ImageError) -> Error {
    match err {
        ImageError::IoError(source) => Error::io(path, source),
        source => Error::Decode {
            path: path.to_path_buf(),
            source,
        },
    }
}

/// Delay used for timing: absent or zero delays become `DEFAULT_DELAY_MS`.
#[inline]
pub fn effective_delay_ms(delay_ms: Option<u32>) -> u32 {
    match delay_ms {
        Some(d) if d > 0 => d,
        _ => DEFAULT_DELAY_MS,
    }
}

/// Pack an RGB888 pixel into RGB565 by truncating each channel.
#[inline]
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Quantize an RGB888 raster into little-endian RGB565 words.
pub fn quantize_rgb565(rgb: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgb.len() / 3 * BYTES_PER_PIXEL);
    for px in rgb.chunks_exact(3) {
        out.extend_from_slice(&rgb565(px[0], px[1], px[2]).to_le_bytes());
    }
    out
}
