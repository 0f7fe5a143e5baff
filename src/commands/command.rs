//! Command trait definition for CLI commands.
//!
//! The trait uses `enum_dispatch` for static dispatch across command variants.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all gataca CLI commands.
///
/// The `command_line` parameter contains the full command invocation, for the output
/// header and the logs.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
