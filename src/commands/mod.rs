//! Command module orchestrator following the module specification pattern.
//!
//! The registry/resolver implementation lives in the private `core` module;
//! the built-in command set lives in `builtin`.

mod builtin;
mod core;

pub use self::builtin::install_builtin_commands;
pub use self::core::{
    ACCESS_KEYWORD, CommandContext, CommandFn, CommandRegistry, CommandSpec, escape_markup,
    is_access_keyword, normalize_keyword,
};
