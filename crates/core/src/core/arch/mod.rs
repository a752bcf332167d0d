//! Architectural state: registers and status flags.

/// C/Z/N/V flags and flag arithmetic.
pub mod flags;
/// General-purpose register file with the hardwired zero register.
pub mod gpr;

pub use flags::Flags;
pub use gpr::RegisterFile;
