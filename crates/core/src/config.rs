//! Engine configuration.
//!
//! Construction-time parameters for a run: memory size, step budget, trace
//! switch, and the post-run dump address. The CLI populates this from flags;
//! defaults match the reference toolchain.

use serde::{Deserialize, Serialize};

/// Default data memory size: 1 MiB.
pub const DEFAULT_MEMORY_SIZE: usize = 1024 * 1024;

/// Default step budget before a run is declared non-terminating.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Default address whose word is printed after a run.
pub const DEFAULT_DUMP_ADDR: u32 = 0x2000;

/// Run-level configuration for the execution engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data memory size in bytes.
    pub memory_size: usize,
    /// Maximum number of steps before the run is declared non-terminating.
    pub max_steps: u64,
    /// Emit a trace line per executed instruction.
    pub trace: bool,
    /// Word address reported in the run summary.
    pub dump_addr: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_steps: DEFAULT_MAX_STEPS,
            trace: false,
            dump_addr: DEFAULT_DUMP_ADDR,
        }
    }
}
