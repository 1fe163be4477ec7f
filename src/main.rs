//! GIFL CLI - Batch convert GIFs to RGB565 + LZ4 containers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use gifl::{EncoderConfig, Error, run_batch};

#[derive(Debug, Parser)]
#[command(name = "gifl", version, about = "Batch convert GIF to RGB565+LZ4")]
struct Args {
    /// GIF files or folders
    path: Vec<PathBuf>,

    /// Output folder (default: next to each GIF)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target fps (overrides GIF fps)
    #[arg(short, long)]
    fps: Option<f64>,

    /// JSON configuration file; flags given here take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Encode files in parallel
    #[arg(short = 'j', long)]
    parallel: bool,

    /// Read every container back after writing it
    #[arg(long)]
    verify: bool,

    /// Print the default configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn into_config(self) -> Result<(Vec<PathBuf>, EncoderConfig), Error> {
        let mut config = match &self.config {
            Some(path) => EncoderConfig::from_json_file(path)?,
            None => EncoderConfig::default(),
        };
        if self.fps.is_some() {
            config.fps = self.fps;
        }
        if self.output.is_some() {
            config.output_dir = self.output;
        }
        config.parallel |= self.parallel;
        config.verify |= self.verify;
        Ok((self.path, config))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.print_config {
        match serde_json::to_string_pretty(&EncoderConfig::default()) {
            Ok(json) => {
                println!("{}", json);
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let (paths, config) = match args.into_config() {
        Ok(v) => v,
        Err(e) => Args::command().error(ErrorKind::InvalidValue, e).exit(),
    };

    let start = Instant::now();
    match run_batch(&paths, &config, |report| println!("{}", report)) {
        Ok(reports) => {
            let frames: usize = reports.iter().map(|r| r.stats.frame_count as usize).sum();
            let raw: u64 = reports.iter().map(|r| r.stats.raw_bytes).sum();
            let compressed: u64 = reports.iter().map(|r| r.stats.compressed_bytes).sum();
            println!(
                "{} file(s), {} frames, {} -> {} bytes in {:.2}s",
                reports.len(),
                frames,
                raw,
                compressed,
                start.elapsed().as_secs_f32()
            );
            ExitCode::SUCCESS
        }
        Err(e) if e.is_usage() => Args::command().error(ErrorKind::InvalidValue, e).exit(),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
