//! Error module orchestrator following the module specification pattern.

mod types;

pub use self::types::{ConsoleError, Result};
