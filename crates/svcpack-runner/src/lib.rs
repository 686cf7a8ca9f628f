//! Process execution for dependency-manager invocations.
//!
//! All process execution goes through [`CommandSpec`] so arguments are passed
//! argv-style and every subprocess carries its own working directory. Nothing
//! in this crate changes the current directory of the calling process.

pub mod command_spec;
pub mod error;
pub mod process;

pub use command_spec::CommandSpec;
pub use error::RunnerError;
pub use process::{NativeRunner, ProcessOutput, ProcessRunner};
