//! CLI command implementations (facade).
//!
//! This module re-exports the command surface used by `run.rs`.
//! Implementations live in `commands/*`.

mod common;
mod config;
mod json_emit;
mod package;
mod plan;

pub use config::execute_config_command;
pub use package::execute_package_command;
pub use plan::execute_plan_command;
