//! Domain layer for Doc Guardian
//!
//! Architecture: Domain Model - Pure values describing conventions and their outcomes
//! - Violations and reports are produced by the engine and consumed by formatters
//! - Documentation units and commit messages are transient inputs to evaluation

pub mod commit;
pub mod unit;
pub mod violations;

pub use commit::{Cleanup, CommitMessage};
pub use unit::{DocumentationUnit, UnitKind};
pub use violations::*;
