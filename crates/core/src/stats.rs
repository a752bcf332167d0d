//! Run summaries.
//!
//! Collects the final architectural state of a run into a serializable
//! report: halt state, step count, program counter, flags, non-zero
//! registers, and the word at the configured dump address.

use serde::Serialize;
use std::fmt;

use crate::core::Cpu;

/// Final flag values of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FlagSummary {
    /// Carry flag.
    pub carry: bool,
    /// Zero flag.
    pub zero: bool,
    /// Negative flag.
    pub negative: bool,
    /// Overflow flag.
    pub overflow: bool,
}

/// Final state report of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Whether the program reached `HALT`.
    pub halted: bool,
    /// Instructions executed.
    pub steps: u64,
    /// Final program counter (instruction index).
    pub pc: usize,
    /// Final flags.
    pub flags: FlagSummary,
    /// Non-zero registers, in index order.
    pub registers: Vec<RegisterValue>,
    /// Dump address and the word read there, if the read succeeded.
    pub dumped: Option<DumpedWord>,
}

/// One non-zero register in the final state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegisterValue {
    /// Register name, e.g. `"R2"`.
    pub name: String,
    /// Final 32-bit value.
    pub value: u32,
}

/// A word read from memory after the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DumpedWord {
    /// The word address.
    pub addr: u32,
    /// The little-endian word value.
    pub value: u32,
}

impl RunSummary {
    /// Collects the summary from a finished (or aborted) engine.
    pub fn collect(cpu: &Cpu, dump_addr: u32) -> Self {
        let registers = cpu
            .regs
            .non_zero()
            .into_iter()
            .map(|(idx, value)| RegisterValue {
                name: format!("R{idx}"),
                value,
            })
            .collect();
        let dumped = cpu
            .memory
            .read_word(dump_addr)
            .ok()
            .map(|value| DumpedWord {
                addr: dump_addr,
                value,
            });
        Self {
            halted: cpu.halted(),
            steps: cpu.steps,
            pc: cpu.pc,
            flags: FlagSummary {
                carry: cpu.flags.carry,
                zero: cpu.flags.zero,
                negative: cpu.flags.negative,
                overflow: cpu.flags.overflow,
            },
            registers,
            dumped,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "halted={} steps={} pc={} flags(C={} Z={} N={} V={})",
            self.halted,
            self.steps,
            self.pc,
            u8::from(self.flags.carry),
            u8::from(self.flags.zero),
            u8::from(self.flags.negative),
            u8::from(self.flags.overflow),
        )?;
        for reg in &self.registers {
            write!(f, " {}={:#010X}", reg.name, reg.value)?;
        }
        if let Some(dumped) = &self.dumped {
            write!(
                f,
                "\nmem[{:#010X}] = {:#010X} ({})",
                dumped.addr, dumped.value, dumped.value as i32
            )?;
        }
        Ok(())
    }
}
