//! Configuration storage.

pub mod config;

pub use config::{Config, ResolvedConfig};
