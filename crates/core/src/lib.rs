//! MRISC toolchain library.
//!
//! This crate implements an assembler and a deterministic instruction-set
//! emulator for the MRISC educational instruction sets, with the following:
//! 1. **ISA:** Declarative instruction-set profiles (opcode tables, field
//!    widths, operand shapes) shared by the assembler and the engine.
//! 2. **Assembler:** A two-pass encoder (address/label resolution, then
//!    shape-driven encoding) with full error accumulation, plus the machine
//!    image text formats.
//! 3. **Engine:** Registers, C/Z/N/V flags, byte-addressable memory, and a
//!    fetch-decode-execute step loop under a step budget.
//! 4. **Simulation:** Program loading from source text or machine images,
//!    configuration, and run summaries.

/// Assembler front-end, two-pass encoder, and machine images.
pub mod asm;
/// Error taxonomy shared by the encoder and the engine.
pub mod common;
/// Engine configuration (memory size, step budget, trace, dump address).
pub mod config;
/// Execution engine (registers, flags, memory, step loop).
pub mod core;
/// Instruction-set profiles, opcode tables, and word decoding.
pub mod isa;
/// Program loading from source text or machine images.
pub mod sim;
/// Run summary collection and reporting.
pub mod stats;

/// Assemble source text into a machine image; see [`asm::assemble`].
pub use crate::asm::{assemble, ImageFormat, MachineImage};
/// Run-level configuration; use `EngineConfig::default()` for the reference defaults.
pub use crate::config::EngineConfig;
/// Main engine type; construct with `Cpu::new`.
pub use crate::core::Cpu;
/// Instruction-set description; use `Profile::bit32()` or `Profile::bit8()`.
pub use crate::isa::Profile;
/// Final-state report of one run.
pub use crate::stats::RunSummary;
