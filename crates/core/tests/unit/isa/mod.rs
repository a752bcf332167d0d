//! Instruction-set description tests.

/// Encode/decode round-trip properties.
pub mod roundtrip;
