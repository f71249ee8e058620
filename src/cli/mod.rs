//! CLI command implementations
//!
//! - `generate`: single-template commands (generate, check, triggers)
//! - `project`: project commands (regen, status)
//! - `config`: JSON schema output
//! - `util`: argument parsing helpers

pub mod config;
pub mod generate;
pub mod project;
pub mod util;

pub use config::cmd_schema;
pub use generate::{cmd_check, cmd_generate, cmd_triggers};
pub use project::{cmd_regen, cmd_status};
