//! Program loading.

/// Builds runnable programs from source text or machine images.
pub mod loader;

pub use loader::{load_program, program_from_image, program_from_source, LoaderError};
