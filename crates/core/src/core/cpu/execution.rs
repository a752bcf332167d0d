//! Fetch-decode-execute step loop.
//!
//! `step()` is the engine's only transition function; `run()` repeats it
//! under a step budget. Operand tokens are interpreted here with the same
//! parsing rules the assembler encodes against, so the engine can execute
//! freshly assembled text or a decoded machine image identically.

use tracing::trace;

use crate::common::{AsmErrorKind, RuntimeError};
use crate::core::arch::flags::{add_with_flags, sub_with_flags};
use crate::isa::Instruction;
use crate::asm::parser::{parse_immediate, parse_indexed, parse_register};

use super::{Cpu, State};

/// Shift amounts are masked to the word's bit range.
const SHIFT_MASK: u32 = 31;

impl Cpu {
    /// Executes one instruction.
    ///
    /// A halted engine no-ops. Otherwise the program counter must index a
    /// decoded instruction; the instruction executes per its opcode; and the
    /// counter advances by one unless a taken branch overrode it.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::PcOutOfRange`] for a bad program counter, memory
    /// errors from load/store, or [`RuntimeError::BadInstruction`] when an
    /// operand token cannot be interpreted.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        if self.halted() {
            return Ok(());
        }
        let Some(inst) = self.program.instructions.get(self.pc).cloned() else {
            return Err(RuntimeError::PcOutOfRange(self.pc));
        };
        let mut next_pc = self.pc + 1;

        trace!(pc = self.pc, "{}", inst.raw);

        let Some(spec) = self.profile.lookup(&inst.op) else {
            return Err(bad(&inst, AsmErrorKind::UnknownMnemonic(inst.op.clone())));
        };
        let expected = spec.shape.operand_count();
        if inst.args.len() != expected {
            return Err(bad(
                &inst,
                AsmErrorKind::WrongOperandCount {
                    mnemonic: inst.op.clone(),
                    expected,
                    got: inst.args.len(),
                },
            ));
        }

        match inst.op.as_str() {
            "LOADI" => {
                let rd = self.reg(&inst, 0)?;
                let value = self.operand_value(&inst, 1)?;
                self.regs.write(rd, value);
            }
            "LOAD" => {
                let rd = self.reg(&inst, 0)?;
                let addr = self.operand_value(&inst, 1)?;
                let value = self.memory.read_word(addr)?;
                self.regs.write(rd, value);
            }
            "STORE" => {
                let rs = self.reg(&inst, 0)?;
                let addr = self.operand_value(&inst, 1)?;
                self.memory.write_word(addr, self.regs.read(rs))?;
            }
            "ADD" | "ADDI" => {
                let rd = self.reg(&inst, 0)?;
                let a = self.regs.read(self.reg(&inst, 1)?);
                let b = self.operand_value(&inst, 2)?;
                let (result, carry, overflow) = add_with_flags(a, b);
                self.regs.write(rd, result);
                self.flags.set_arithmetic(result, carry, overflow);
            }
            "SUB" | "SUBI" => {
                let rd = self.reg(&inst, 0)?;
                let a = self.regs.read(self.reg(&inst, 1)?);
                let b = self.operand_value(&inst, 2)?;
                let (result, carry, overflow) = sub_with_flags(a, b);
                self.regs.write(rd, result);
                self.flags.set_arithmetic(result, carry, overflow);
            }
            "AND" | "OR" | "XOR" => {
                let rd = self.reg(&inst, 0)?;
                let a = self.regs.read(self.reg(&inst, 1)?);
                let b = self.regs.read(self.reg(&inst, 2)?);
                let result = match inst.op.as_str() {
                    "AND" => a & b,
                    "OR" => a | b,
                    _ => a ^ b,
                };
                self.regs.write(rd, result);
                self.flags.set_logic(result);
            }
            "SHL" | "SHR" => {
                let rd = self.reg(&inst, 0)?;
                let a = self.regs.read(self.reg(&inst, 1)?);
                let sh = self.operand_value(&inst, 2)? & SHIFT_MASK;
                let result = if inst.op == "SHL" { a << sh } else { a >> sh };
                self.regs.write(rd, result);
                self.flags.set_logic(result);
            }
            "CMP" => {
                let a = self.regs.read(self.reg(&inst, 0)?);
                let b = self.regs.read(self.reg(&inst, 1)?);
                let (result, carry, overflow) = sub_with_flags(a, b);
                self.flags.set_arithmetic(result, carry, overflow);
            }
            "JMP" => next_pc = self.branch_target(&inst)?,
            "JZ" if self.flags.zero => next_pc = self.branch_target(&inst)?,
            "JNZ" if !self.flags.zero => next_pc = self.branch_target(&inst)?,
            "JC" if self.flags.carry => next_pc = self.branch_target(&inst)?,
            "JNC" if !self.flags.carry => next_pc = self.branch_target(&inst)?,
            "JLT" if self.flags.negative => next_pc = self.branch_target(&inst)?,
            "JGE" if !self.flags.negative => next_pc = self.branch_target(&inst)?,
            "JLE" if self.flags.zero || self.flags.negative => {
                next_pc = self.branch_target(&inst)?;
            }
            // A conditional jump whose condition is false falls through.
            "JZ" | "JNZ" | "JC" | "JNC" | "JLT" | "JGE" | "JLE" => {
                let _ = self.branch_target(&inst)?;
            }
            "HALT" => self.state = State::Halted,
            _ => {
                return Err(bad(&inst, AsmErrorKind::UnknownMnemonic(inst.op.clone())));
            }
        }

        self.pc = next_pc;
        self.steps += 1;
        Ok(())
    }

    /// Runs until `HALT` or until `max_steps` instructions have executed.
    ///
    /// # Errors
    ///
    /// Any error from `step()`, or [`RuntimeError::StepBudgetExhausted`]
    /// when the budget empties before the program halts.
    pub fn run(&mut self, max_steps: u64) -> Result<(), RuntimeError> {
        while !self.halted() && self.steps < max_steps {
            self.step()?;
        }
        if self.halted() {
            Ok(())
        } else {
            Err(RuntimeError::StepBudgetExhausted(max_steps))
        }
    }

    /// Parses operand `idx` as a register index.
    fn reg(&self, inst: &Instruction, idx: usize) -> Result<usize, RuntimeError> {
        parse_register(&self.profile, &inst.args[idx])
            .map(|r| r as usize)
            .map_err(|kind| bad(inst, kind))
    }

    /// Resolves operand `idx` as a 32-bit value: a register's contents, a
    /// resolved label, an indexed `[Rbase + offset]` address, or a literal.
    ///
    /// Immediates and addresses share this rule, exactly as in the encoder.
    fn operand_value(&self, inst: &Instruction, idx: usize) -> Result<u32, RuntimeError> {
        let token = inst.args[idx].as_str();
        if let Some((base, offset)) =
            parse_indexed(&self.profile, token).map_err(|kind| bad(inst, kind))?
        {
            return Ok(self.regs.read(base as usize).wrapping_add(offset as u32));
        }
        if let Ok(r) = parse_register(&self.profile, token) {
            return Ok(self.regs.read(r as usize));
        }
        if let Some(&index) = self.program.labels.get(token) {
            return Ok(index as u32);
        }
        parse_immediate(token)
            .map(|v| v as u32)
            .map_err(|_| bad(inst, AsmErrorKind::MalformedOperand(token.to_string())))
    }

    /// Resolves the branch target (operand 0) to an instruction index.
    fn branch_target(&self, inst: &Instruction) -> Result<usize, RuntimeError> {
        let token = inst.args[0].as_str();
        if let Some(&index) = self.program.labels.get(token) {
            return Ok(index);
        }
        let value = parse_immediate(token)
            .map_err(|_| bad(inst, AsmErrorKind::MalformedOperand(token.to_string())))?;
        usize::try_from(value)
            .map_err(|_| bad(inst, AsmErrorKind::MalformedOperand(token.to_string())))
    }
}

/// Wraps an operand failure with its instruction context.
fn bad(inst: &Instruction, kind: AsmErrorKind) -> RuntimeError {
    RuntimeError::BadInstruction {
        line: inst.line,
        raw: inst.raw.clone(),
        kind,
    }
}
