//! Input discovery and batch conversion.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;

use crate::asset::{EncodeReport, GiflPlayer, diff_region, encode, playback_interval_ms};
use crate::error::{Error, Result};
use crate::schema::EncoderConfig;

/// Expand directories into the GIFs they contain.
///
/// Directory children are kept when their extension is `gif` in any case, in
/// listing order. Other paths are passed through without any checks.
pub fn discover_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !path.is_dir() {
            inputs.push(path.to_path_buf());
            continue;
        }

        let entries = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(path, e))?;
            let child = entry.path();
            if is_gif(&child) && !child.is_dir() {
                inputs.push(child);
            }
        }
    }

    if inputs.is_empty() {
        return Err(Error::Usage("No GIF files found".to_string()));
    }
    Ok(inputs)
}

fn is_gif(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"))
}

/// What a read-back of a container found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// Timer period the firmware will play the container at.
    pub interval_ms: u32,
    /// Frames that differ from the frame before them (the first always counts).
    pub changed_frames: usize,
}

/// Re-open a written container and decode every frame.
pub fn verify_container(report: &EncodeReport) -> Result<Verification> {
    let player = GiflPlayer::open(&report.output)?;
    let name = report.output.display();

    if player.dimensions() != (report.width, report.height) {
        return Err(Error::Format(format!(
            "{}: dimensions {:?} differ from source {}x{}",
            name,
            player.dimensions(),
            report.width,
            report.height
        )));
    }
    if player.frame_count() != report.stats.frame_count as usize {
        return Err(Error::Format(format!(
            "{}: {} frames read back, {} written",
            name,
            player.frame_count(),
            report.stats.frame_count
        )));
    }
    let stored: u64 = player.frame_indices().iter().map(|i| i.size as u64).sum();
    if stored != report.stats.compressed_bytes {
        return Err(Error::Format(format!(
            "{}: {} compressed bytes read back, {} written",
            name, stored, report.stats.compressed_bytes
        )));
    }

    let (width, height) = (report.width as usize, report.height as usize);
    let mut previous: Option<Vec<u8>> = None;
    let mut changed_frames = 0;
    for (i, frame) in player.frames().enumerate() {
        let frame = frame?;
        match &previous {
            None => changed_frames += 1,
            Some(old) => match diff_region(old, &frame, width, height)? {
                Some(region) => {
                    debug!("{}: frame {} redraws {:?}", name, i, region);
                    changed_frames += 1;
                }
                None => debug!("{}: frame {} unchanged", name, i),
            },
        }
        previous = Some(frame);
    }

    let interval_ms = playback_interval_ms(player.fps());
    info!(
        "{}: verified {} frames ({} changed), firmware interval {} ms",
        name,
        player.frame_count(),
        changed_frames,
        interval_ms
    );
    Ok(Verification {
        interval_ms,
        changed_frames,
    })
}

fn convert<F>(path: &Path, config: &EncoderConfig, on_file: &F) -> Result<EncodeReport>
where
    F: Fn(&EncodeReport) + Sync,
{
    let report = encode(path, config.fps, config.output_dir.as_deref())?;
    if config.verify {
        verify_container(&report)?;
    }
    on_file(&report);
    Ok(report)
}

/// Convert every GIF named by `paths`, calling `on_file` as each one completes.
///
/// Stops at the first failure. Reports come back in input order, also when
/// files are encoded in parallel.
pub fn run_batch<P, F>(paths: &[P], config: &EncoderConfig, on_file: F) -> Result<Vec<EncodeReport>>
where
    P: AsRef<Path>,
    F: Fn(&EncodeReport) + Sync,
{
    config.validate()?;
    let inputs = discover_inputs(paths)?;
    info!("Converting {} GIF file(s)", inputs.len());

    if config.parallel {
        inputs
            .par_iter()
            .map(|p| convert(p, config, &on_file))
            .collect()
    } else {
        inputs.iter().map(|p| convert(p, config, &on_file)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::source::tests::solid_gif;
    use tempfile::tempdir;

    #[test]
    fn test_discover_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.gif"), b"").unwrap();
        fs::write(dir.path().join("B.GIF"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("nested.gif")).unwrap();
        fs::write(dir.path().join("nested.gif").join("c.gif"), b"").unwrap();

        let mut found = discover_inputs(&[dir.path()]).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![dir.path().join("B.GIF"), dir.path().join("a.gif")]
        );
    }

    #[test]
    fn test_discover_files_verbatim() {
        let found = discover_inputs(&["missing.png", "x/y.gif"]).unwrap();
        assert_eq!(found, vec![PathBuf::from("missing.png"), PathBuf::from("x/y.gif")]);
    }

    #[test]
    fn test_discover_empty() {
        let dir = tempdir().unwrap();
        assert!(matches!(discover_inputs(&[dir.path()]), Err(Error::Usage(_))));

        let none: [&Path; 0] = [];
        assert!(matches!(discover_inputs(&none), Err(Error::Usage(_))));
    }

    #[test]
    fn test_empty_dir_writes_nothing() {
        let dir = tempdir().unwrap();
        let result = run_batch(&[dir.path()], &EncoderConfig::default(), |_| {});
        assert!(result.unwrap_err().is_usage());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn gif_dir(count: usize) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for i in 0..count {
            let shade = (i * 40) as u8;
            let gif = solid_gif(6, 5, &[([shade, 0, 0], 100), ([0, shade, 0], 100)]);
            fs::write(dir.path().join(format!("anim{}.gif", i)), gif).unwrap();
        }
        dir
    }

    #[test]
    fn test_batch_sequential() {
        let dir = gif_dir(3);
        let out = tempdir().unwrap();
        let config = EncoderConfig {
            output_dir: Some(out.path().to_path_buf()),
            verify: true,
            ..Default::default()
        };

        let printed = std::sync::Mutex::new(Vec::new());
        let reports = run_batch(&[dir.path()], &config, |r| {
            printed.lock().unwrap().push(r.to_string())
        })
        .unwrap();
        assert_eq!(reports.len(), 3);
        let printed = printed.into_inner().unwrap();
        assert_eq!(printed.len(), 3);
        assert!(printed.iter().all(|line| line.starts_with("[OK] ")));
        for report in &reports {
            assert!(report.output.starts_with(out.path()));
            assert_eq!(report.stats.frame_count, 2);
            let player = GiflPlayer::open(&report.output).unwrap();
            assert_eq!(player.fps(), 10);
        }
    }

    #[test]
    fn test_batch_parallel_matches_sequential() {
        let dir = gif_dir(4);
        let config = EncoderConfig {
            fps: Some(24.0),
            parallel: true,
            verify: true,
            ..Default::default()
        };

        let inputs = discover_inputs(&[dir.path()]).unwrap();
        let reports = run_batch(&[dir.path()], &config, |_| {}).unwrap();
        let sources: Vec<_> = reports.iter().map(|r| r.source.clone()).collect();
        assert_eq!(sources, inputs);

        for report in &reports {
            let bytes = fs::read(&report.output).unwrap();
            assert_eq!(bytes[8], 24);
        }
    }

    #[test]
    fn test_verify_reports_playback() {
        let dir = tempdir().unwrap();
        let gif = dir.path().join("blink.gif");
        let frames = [([255, 0, 0], 40), ([255, 0, 0], 40), ([0, 0, 255], 40)];
        fs::write(&gif, solid_gif(4, 4, &frames)).unwrap();

        let report = encode(&gif, None, None).unwrap();
        let verification = verify_container(&report).unwrap();
        assert_eq!(verification.interval_ms, 40);
        assert_eq!(verification.changed_frames, 2);
    }

    #[test]
    fn test_batch_stops_on_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.gif"), b"GIF89a garbage").unwrap();

        let result = run_batch(&[dir.path()], &EncoderConfig::default(), |_| {});
        assert!(matches!(result, Err(Error::Decode { .. }) | Err(Error::Io { .. })));
        assert!(!dir.path().join("broken.lz4").exists());
    }
}
