//! Schema module - Configuration types for GIFL encoding.

mod config;

pub use config::*;
