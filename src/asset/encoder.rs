//! GIF to GIFL conversion.

use std::fmt;
use std::fs;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::{Builder, NamedTempFile};

use super::format::{ContainerHeader, compress_block, write_record};
use super::source::{SourceAnimation, effective_delay_ms, quantize_rgb565};
use crate::error::{Error, Result};

/// Extension given to every container.
pub const CONTAINER_EXTENSION: &str = "lz4";

/// Frame rate for an animation.
///
/// An explicit override wins unmodified. Otherwise the first frame's delay
/// is used, with missing or zero delays treated as `DEFAULT_DELAY_MS`.
pub fn derive_frame_rate(first_delay_ms: Option<u32>, fps_override: Option<f64>) -> f64 {
    match fps_override {
        Some(fps) => fps,
        None => 1000.0 / effective_delay_ms(first_delay_ms) as f64,
    }
}

/// Collapse a fractional frame rate into the header's `u8` field.
///
/// Halves round to even. This is lossy: 12.5 fps is stored as 12.
pub fn header_fps(fps: f64) -> Result<u8> {
    let rounded = fps.round_ties_even();
    if !(0.0..=u8::MAX as f64).contains(&rounded) {
        return Err(Error::Format(format!(
            "frame rate {} does not fit the u8 fps field",
            fps
        )));
    }
    Ok(rounded as u8)
}

/// Where the container for `gif_path` is written.
pub fn output_path(gif_path: &Path, out_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = gif_path.file_stem().ok_or_else(|| {
        Error::Usage(format!("{} has no file name", gif_path.display()))
    })?;
    let dir = match out_dir {
        Some(dir) => dir,
        None => gif_path.parent().unwrap_or_else(|| Path::new("")),
    };
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(CONTAINER_EXTENSION);
    Ok(dir.join(name))
}

/// Quantize one RGB888 frame and compress it.
pub fn encode_frame(rgb: &[u8]) -> Vec<u8> {
    compress_block(&quantize_rgb565(rgb))
}

/// Writes a container to a temporary file and moves it into place on `finish`.
///
/// Dropping the writer without calling `finish` deletes the temporary file,
/// so a failed conversion never leaves a truncated container behind.
pub struct ContainerWriter {
    writer: BufWriter<NamedTempFile>,
    header: ContainerHeader,
    target: PathBuf,
    raw_bytes: u64,
    compressed_bytes: u64,
}

impl ContainerWriter {
    /// Start a container at `target`. The frame count is patched in on `finish`.
    pub fn create(target: &Path, width: u16, height: u16, fps: u8) -> Result<Self> {
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut builder = Builder::new();
        builder.prefix(".gifl").suffix(".tmp");
        // Created like a plain file: 0o666 minus the process umask.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let file = builder.tempfile_in(dir).map_err(|e| Error::io(dir, e))?;
        let mut writer = BufWriter::new(file);

        let header = ContainerHeader::new(width, height, fps, 0);
        header
            .write_to(&mut writer)
            .map_err(|e| Error::io(target, e))?;

        Ok(Self {
            writer,
            header,
            target: target.to_path_buf(),
            raw_bytes: 0,
            compressed_bytes: 0,
        })
    }

    /// Append one compressed frame record.
    pub fn write_frame(&mut self, compressed: &[u8]) -> Result<()> {
        if self.header.frame_count == u16::MAX {
            return Err(Error::Format(format!(
                "more than {} frames do not fit the frame count field",
                u16::MAX
            )));
        }
        if u32::try_from(compressed.len()).is_err() {
            return Err(Error::Compression(format!(
                "frame of {} bytes does not fit a u32 length prefix",
                compressed.len()
            )));
        }
        write_record(&mut self.writer, compressed).map_err(|e| Error::io(&self.target, e))?;
        self.header.frame_count += 1;
        self.raw_bytes += self.header.frame_size() as u64;
        self.compressed_bytes += compressed.len() as u64;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u16 {
        self.header.frame_count
    }

    /// Rewrite the header with the final frame count and move the file into place.
    pub fn finish(mut self) -> Result<ContainerStats> {
        let target = self.target.clone();
        let io_err = |e| Error::io(&target, e);

        self.writer.seek(SeekFrom::Start(0)).map_err(io_err)?;
        self.header.write_to(&mut self.writer).map_err(io_err)?;
        self.writer.flush().map_err(io_err)?;

        let file = self
            .writer
            .into_inner()
            .map_err(|e| Error::io(&target, e.into_error()))?;
        // Overwriting keeps the existing container's permissions.
        if let Ok(existing) = fs::metadata(&target) {
            file.as_file()
                .set_permissions(existing.permissions())
                .map_err(io_err)?;
        }
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(&target).map_err(|e| Error::io(&target, e.error))?;

        Ok(ContainerStats {
            frame_count: self.header.frame_count,
            raw_bytes: self.raw_bytes,
            compressed_bytes: self.compressed_bytes,
        })
    }
}

/// Size statistics for a finished container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerStats {
    pub frame_count: u16,
    /// Total uncompressed RGB565 bytes.
    pub raw_bytes: u64,
    /// Total compressed payload bytes, excluding header and length prefixes.
    pub compressed_bytes: u64,
}

/// Result of converting one GIF.
#[derive(Debug, Clone)]
pub struct EncodeReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u16,
    pub height: u16,
    /// Frame rate before rounding.
    pub fps: f64,
    pub stats: ContainerStats,
}

impl fmt::Display for EncodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[OK] {} -> {}  {}x{}  {} frames  {:.2} fps",
            self.source.display(),
            self.output.display(),
            self.width,
            self.height,
            self.stats.frame_count,
            self.fps
        )
    }
}

/// Write an already decoded animation to `output`.
pub fn write_container(
    animation: &SourceAnimation,
    fps_override: Option<f64>,
    source: &Path,
    output: &Path,
) -> Result<EncodeReport> {
    let fps = derive_frame_rate(animation.first_delay_ms(), fps_override);
    let fps_byte = header_fps(fps)?;

    if fps_override.is_none() && animation.has_variable_delay() {
        warn!(
            "{}: frames have different delays, playing all at {} fps",
            source.display(),
            fps_byte
        );
    }

    let mut writer = ContainerWriter::create(output, animation.width, animation.height, fps_byte)?;
    for (i, frame) in animation.frames.iter().enumerate() {
        let raster = quantize_rgb565(&frame.rgb);
        let compressed = compress_block(&raster);
        debug!(
            "{}: frame {} comp_len={} rgb565_len={}",
            source.display(),
            i,
            compressed.len(),
            raster.len()
        );
        writer.write_frame(&compressed)?;
    }
    let stats = writer.finish()?;

    Ok(EncodeReport {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width: animation.width,
        height: animation.height,
        fps,
        stats,
    })
}

/// Convert one GIF file into a container next to it (or in `out_dir`).
pub fn encode(
    gif_path: &Path,
    fps_override: Option<f64>,
    out_dir: Option<&Path>,
) -> Result<EncodeReport> {
    let output = output_path(gif_path, out_dir)?;
    let animation = SourceAnimation::open(gif_path)?;
    write_container(&animation, fps_override, gif_path, &output)
}
