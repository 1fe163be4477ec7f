//! Container reader matching the firmware's playback path.

use std::fs;
use std::path::Path;

use super::format::{BYTES_PER_PIXEL, ContainerHeader, RECORD_PREFIX_SIZE, decompress_block};
use crate::error::{Error, Result};

/// Location of one compressed record inside the container.
#[derive(Debug, Clone, Copy)]
pub struct FrameIndex {
    /// Byte offset of the compressed payload (after its length prefix).
    pub offset: usize,
    /// Compressed size in bytes.
    pub size: usize,
}

/// Reads frames back out of a GIFL container.
///
/// Usage:
/// ```ignore
/// let player = GiflPlayer::open("happy.lz4")?;
/// for frame in player.frames() {
///     let rgb565 = frame?;
///     // blit...
/// }
/// ```
pub struct GiflPlayer {
    data: Vec<u8>,
    header: ContainerHeader,
    frame_indices: Vec<FrameIndex>,
}

impl GiflPlayer {
    /// Load a container from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| Error::io(path, e))?;
        Self::from_bytes(data)
    }

    /// Parse a container held in memory.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let header = ContainerHeader::read_from(&mut data.as_slice())?;

        let mut frame_indices = Vec::with_capacity(header.frame_count as usize);
        let mut pos = header.data_offset as usize;
        for i in 0..header.frame_count {
            let prefix = data
                .get(pos..pos + RECORD_PREFIX_SIZE)
                .ok_or_else(|| Error::Format(format!("frame {} length prefix truncated", i)))?;
            let size = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
            let offset = pos + RECORD_PREFIX_SIZE;
            if offset + size > data.len() {
                return Err(Error::Format(format!(
                    "frame {} needs {} bytes, {} available",
                    i,
                    size,
                    data.len() - offset
                )));
            }
            frame_indices.push(FrameIndex { offset, size });
            pos = offset + size;
        }

        if pos != data.len() {
            return Err(Error::Format(format!(
                "{} trailing bytes after {} frames",
                data.len().saturating_sub(pos),
                header.frame_count
            )));
        }

        Ok(Self {
            data,
            header,
            frame_indices,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn frame_count(&self) -> usize {
        self.frame_indices.len()
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.header.width, self.header.height)
    }

    pub fn fps(&self) -> u8 {
        self.header.fps
    }

    /// Record locations in playback order.
    pub fn frame_indices(&self) -> &[FrameIndex] {
        &self.frame_indices
    }

    /// Decompress one frame into its RGB565 raster.
    pub fn read_frame(&self, frame_index: usize) -> Result<Vec<u8>> {
        let index = self.frame_indices.get(frame_index).ok_or_else(|| {
            Error::Format(format!(
                "frame index {} out of range ({} frames)",
                frame_index,
                self.frame_indices.len()
            ))
        })?;
        let compressed = &self.data[index.offset..index.offset + index.size];
        decompress_block(compressed, self.header.frame_size())
    }

    /// Iterate over all frames in playback order.
    pub fn frames(&self) -> FrameIterator<'_> {
        FrameIterator {
            player: self,
            current: 0,
        }
    }
}

/// Iterator over decoded frames.
pub struct FrameIterator<'a> {
    player: &'a GiflPlayer,
    current: usize,
}

impl<'a> Iterator for FrameIterator<'a> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.player.frame_count() {
            return None;
        }

        let result = self.player.read_frame(self.current);
        self.current += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.player.frame_count() - self.current;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for FrameIterator<'a> {}

/// Timer period the firmware uses for a given header fps.
///
/// Rounded to a multiple of 10 ms with a 10 ms floor; 0 fps plays at 1 Hz.
pub fn playback_interval_ms(fps: u8) -> u32 {
    if fps == 0 {
        return 1000;
    }
    let interval = (1000 / fps as i32 + 11) / 10 * 10 - 10;
    interval.max(10) as u32
}

/// Inclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

/// Bounding box of the pixels that changed between two RGB565 frames.
///
/// Returns `Ok(None)` when the frames are identical. Both buffers must hold
/// exactly `width * height` pixels; anything else is a `Format` error rather
/// than a guess about what changed.
pub fn diff_region(old: &[u8], new: &[u8], width: usize, height: usize) -> Result<Option<Region>> {
    let frame_size = width * height * BYTES_PER_PIXEL;
    if old.len() != frame_size || new.len() != frame_size {
        return Err(Error::Format(format!(
            "cannot diff {} and {} byte frames as {}x{} RGB565",
            old.len(),
            new.len(),
            width,
            height
        )));
    }

    let row_bytes = width * BYTES_PER_PIXEL;
    let mut region: Option<Region> = None;

    for y in 0..height {
        let start = y * row_bytes;
        let old_row = &old[start..start + row_bytes];
        let new_row = &new[start..start + row_bytes];

        let mut changed = old_row
            .chunks_exact(BYTES_PER_PIXEL)
            .zip(new_row.chunks_exact(BYTES_PER_PIXEL))
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(x, _)| x);

        let Some(first) = changed.next() else {
            continue;
        };
        let last = changed.last().unwrap_or(first);

        region = Some(match region {
            None => Region {
                x0: first,
                y0: y,
                x1: last,
                y1: y,
            },
            Some(r) => Region {
                x0: r.x0.min(first),
                y0: r.y0,
                x1: r.x1.max(last),
                y1: y,
            },
        });
    }

    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::encoder::{ContainerWriter, encode_frame};
    use crate::asset::format::{HEADER_SIZE, compress_block};
    use std::fs;
    use tempfile::tempdir;

    fn solid_rgb(w: usize, h: usize, rgb: [u8; 3]) -> Vec<u8> {
        rgb.repeat(w * h)
    }

    fn container(w: u16, h: u16, frames: &[Vec<u8>]) -> Vec<u8> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c.lz4");
        let mut writer = ContainerWriter::create(&path, w, h, 10).unwrap();
        for frame in frames {
            writer.write_frame(&encode_frame(frame)).unwrap();
        }
        writer.finish().unwrap();
        fs::read(&path).unwrap()
    }

    #[test]
    fn test_player_roundtrip() {
        let frames = vec![
            solid_rgb(8, 4, [255, 0, 0]),
            solid_rgb(8, 4, [0, 255, 0]),
            solid_rgb(8, 4, [0, 0, 255]),
        ];
        let player = GiflPlayer::from_bytes(container(8, 4, &frames)).unwrap();

        assert_eq!(player.frame_count(), 3);
        assert_eq!(player.dimensions(), (8, 4));
        assert_eq!(player.fps(), 10);
        assert_eq!(player.frame_indices()[0].offset, HEADER_SIZE as usize + 4);

        let decoded: Vec<_> = player.frames().map(|f| f.unwrap()).collect();
        assert_eq!(decoded.len(), 3);
        for raster in &decoded {
            assert_eq!(raster.len(), 8 * 4 * 2);
        }
        assert_eq!(&decoded[0][..2], &0xF800u16.to_le_bytes());
        assert_eq!(&decoded[1][..2], &0x07E0u16.to_le_bytes());
        assert_eq!(&decoded[2][..2], &0x001Fu16.to_le_bytes());
    }

    #[test]
    fn test_player_open_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("one.lz4");
        fs::write(&path, container(2, 2, &[solid_rgb(2, 2, [1, 2, 3])])).unwrap();

        let player = GiflPlayer::open(&path).unwrap();
        assert_eq!(player.frames().len(), 1);
        assert!(player.read_frame(1).is_err());
    }

    #[test]
    fn test_player_truncated() {
        let mut bytes = container(4, 4, &vec![solid_rgb(4, 4, [9, 9, 9]); 2]);
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(GiflPlayer::from_bytes(bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_player_count_mismatch() {
        let mut bytes = container(4, 4, &[solid_rgb(4, 4, [9, 9, 9])]);
        let extra = compress_block(&[0u8; 32]);
        bytes.extend_from_slice(&(extra.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&extra);
        assert!(matches!(GiflPlayer::from_bytes(bytes), Err(Error::Format(_))));
    }

    #[test]
    fn test_player_wrong_frame_size() {
        let mut bytes = Vec::new();
        ContainerHeader::new(4, 4, 10, 1).write_to(&mut bytes).unwrap();
        let short = compress_block(&[0u8; 16]);
        bytes.extend_from_slice(&(short.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&short);

        let player = GiflPlayer::from_bytes(bytes).unwrap();
        assert!(matches!(player.read_frame(0), Err(Error::Compression(_))));
    }

    #[test]
    fn test_playback_interval() {
        assert_eq!(playback_interval_ms(0), 1000);
        assert_eq!(playback_interval_ms(10), 100);
        assert_eq!(playback_interval_ms(24), 40);
        assert_eq!(playback_interval_ms(1), 1000);
        assert_eq!(playback_interval_ms(200), 10);
    }

    #[test]
    fn test_diff_region() {
        let old = vec![0u8; 4 * 3 * 2];
        assert_eq!(diff_region(&old, &old, 4, 3).unwrap(), None);

        let mut new = old.clone();
        // pixel (1, 0) and (2, 2)
        new[2] = 0xFF;
        new[(2 * 4 + 2) * 2 + 1] = 0x01;
        assert_eq!(
            diff_region(&old, &new, 4, 3).unwrap(),
            Some(Region {
                x0: 1,
                y0: 0,
                x1: 2,
                y1: 2
            })
        );
    }

    #[test]
    fn test_diff_region_short_frame() {
        let old = vec![0u8; 4 * 3 * 2];
        let mut new = old.clone();
        new[0] = 0xFF;
        new.truncate(4 * 2 * 2 + 3);

        assert!(matches!(diff_region(&old, &new, 4, 3), Err(Error::Format(_))));
        assert!(matches!(diff_region(&new, &old, 4, 3), Err(Error::Format(_))));
    }
}
