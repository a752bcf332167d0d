//! Common types shared across the assembler and the execution engine.

/// Error taxonomy (assembly, runtime, profile misuse).
pub mod error;

pub use error::{AsmError, AsmErrorKind, AsmReport, ProfileError, RuntimeError};
