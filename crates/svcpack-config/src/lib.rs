//! Configuration for svcpack.
//!
//! Precedence is CLI > file > defaults. The file is `.svcpack/config.toml`,
//! found by searching upward from the service root, or given with `--config`.

mod config;

pub use config::*;
