//! GIFL - animated GIF assets for embedded displays.
//!
//! Converts animated GIFs into GIFL containers: every frame is truncated to
//! RGB565 and compressed on its own as a raw LZ4 block, so firmware can
//! decode any frame with a single fixed-size buffer.
//!
//! # Architecture
//!
//! - `asset`: GIF decoding, quantization, the container format and a reader
//! - `batch`: input discovery and batch conversion
//! - `schema`: configuration types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use gifl::asset::{GiflPlayer, encode};
//!
//! let report = encode(Path::new("assets/happy.gif"), None, None)?;
//! println!("{}", report);
//!
//! let player = GiflPlayer::open(&report.output)?;
//! let first = player.read_frame(0)?;
//! assert_eq!(first.len(), player.header().frame_size());
//! # Ok::<(), gifl::Error>(())
//! ```

pub mod asset;
pub mod batch;
pub mod error;
pub mod schema;

pub use asset::{ContainerHeader, EncodeReport, GiflPlayer, SourceAnimation, encode};
pub use batch::{discover_inputs, run_batch};
pub use error::{Error, Result};
pub use schema::{ConfigError, EncoderConfig};
