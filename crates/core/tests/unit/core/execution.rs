//! Step-loop and scenario tests.
//!
//! Programs here are the reference scenarios for the engine: the sum loop,
//! the memory round-trip, the zero-register invariant, alignment faults, and
//! budget exhaustion — plus the encoder/engine agreement check that runs the
//! same program from source text and from its decoded machine image.

use mrisc_core::asm::assemble;
use mrisc_core::common::{AsmErrorKind, RuntimeError};
use mrisc_core::core::{Cpu, State};
use mrisc_core::sim::loader::{program_from_image, program_from_source};
use mrisc_core::{EngineConfig, Profile, RunSummary};

/// Builds an engine for a source program under default configuration.
fn cpu_for(source: &str) -> Cpu {
    let profile = Profile::bit32();
    let program = program_from_source(source).expect("load");
    Cpu::new(&profile, program, &EngineConfig::default())
}

/// Runs a source program to halt and returns the engine.
fn run_to_halt(source: &str) -> Cpu {
    let mut cpu = cpu_for(source);
    cpu.run(10_000).expect("run");
    assert!(cpu.halted());
    cpu
}

// ──────────────────────────────────────────────────────────
// Reference scenarios
// ──────────────────────────────────────────────────────────

#[test]
fn sum_loop_stores_fifty_five() {
    let cpu = run_to_halt(
        "\
        LOADI R1, #10\n\
        LOADI R2, #0\n\
        LOOP: ADD R2, R2, R1\n\
        SUBI R1, R1, #1\n\
        JNZ LOOP\n\
        STORE R2, #0x2000\n\
        HALT\n",
    );
    assert_eq!(cpu.memory.read_word(0x2000).unwrap(), 55);
}

#[test]
fn memory_round_trip_preserves_the_word() {
    let cpu = run_to_halt(
        "\
        LOADI R4, #0x12345678\n\
        STORE R4, #0x2100\n\
        LOAD R5, #0x2100\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(5), 0x12345678);
}

#[test]
fn zero_register_ignores_writes() {
    let cpu = run_to_halt(
        "\
        LOADI R0, #12345\n\
        ADDI R0, R0, #1\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(0), 0);
}

#[test]
fn zero_register_reads_zero_after_every_step() {
    let mut cpu = cpu_for(
        "\
        LOADI R0, #7\n\
        LOADI R1, #1\n\
        ADD R0, R1, R1\n\
        HALT\n",
    );
    while !cpu.halted() {
        cpu.step().expect("step");
        assert_eq!(cpu.regs.read(0), 0);
    }
}

#[test]
fn unaligned_store_is_a_runtime_error() {
    let mut cpu = cpu_for(
        "\
        LOADI R4, #1\n\
        STORE R4, #0x2001\n\
        HALT\n",
    );
    let err = cpu.run(100).expect_err("unaligned");
    assert_eq!(err, RuntimeError::UnalignedAccess(0x2001));
}

#[test]
fn unaligned_load_is_a_runtime_error() {
    let mut cpu = cpu_for(
        "\
        LOAD R4, #0x2002\n\
        HALT\n",
    );
    let err = cpu.run(100).expect_err("unaligned");
    assert_eq!(err, RuntimeError::UnalignedAccess(0x2002));
}

#[test]
fn infinite_loop_exhausts_the_step_budget() {
    let mut cpu = cpu_for("loop: JMP loop\n");
    let err = cpu.run(1000).expect_err("budget");
    assert_eq!(err, RuntimeError::StepBudgetExhausted(1000));
    assert_eq!(cpu.steps, 1000, "the budget bounds the work done");
}

#[test]
fn identical_runs_produce_identical_state() {
    let source = "\
        LOADI R1, #6\n\
        LOADI R2, #7\n\
        LOOP: ADD R3, R3, R1\n\
        SUBI R2, R2, #1\n\
        JNZ LOOP\n\
        STORE R3, #0x2000\n\
        HALT\n";
    let a = run_to_halt(source);
    let b = run_to_halt(source);
    assert_eq!(a.regs, b.regs);
    assert_eq!(a.flags, b.flags);
    assert_eq!(a.steps, b.steps);
    assert_eq!(
        a.memory.read_word(0x2000).unwrap(),
        b.memory.read_word(0x2000).unwrap()
    );
    assert_eq!(
        RunSummary::collect(&a, 0x2000),
        RunSummary::collect(&b, 0x2000)
    );
}

// ──────────────────────────────────────────────────────────
// Step mechanics
// ──────────────────────────────────────────────────────────

#[test]
fn halted_engine_steps_are_no_ops() {
    let mut cpu = run_to_halt("LOADI R1, #1\nHALT\n");
    let steps = cpu.steps;
    cpu.step().expect("no-op");
    assert_eq!(cpu.steps, steps);
    assert_eq!(cpu.state, State::Halted);
}

#[test]
fn running_off_the_end_is_pc_out_of_range() {
    let mut cpu = cpu_for("LOADI R1, #1\n");
    cpu.step().expect("first step");
    let err = cpu.step().expect_err("no instruction at pc 1");
    assert_eq!(err, RuntimeError::PcOutOfRange(1));
}

#[test]
fn bad_operand_reports_the_instruction() {
    let mut cpu = cpu_for("ADD R1, R2\nHALT\n");
    let err = cpu.step().expect_err("operand count");
    assert!(matches!(
        err,
        RuntimeError::BadInstruction {
            line: 1,
            kind: AsmErrorKind::WrongOperandCount { .. },
            ..
        }
    ));
}

#[test]
fn unknown_mnemonic_fails_at_execution() {
    let mut cpu = cpu_for("FNORD R1\n");
    assert!(matches!(
        cpu.step().expect_err("unknown"),
        RuntimeError::BadInstruction {
            kind: AsmErrorKind::UnknownMnemonic(_),
            ..
        }
    ));
}

// ──────────────────────────────────────────────────────────
// Flags and control flow
// ──────────────────────────────────────────────────────────

#[test]
fn data_movement_leaves_flags_untouched() {
    let mut cpu = cpu_for(
        "\
        LOADI R1, #5\n\
        SUBI R1, R1, #5\n\
        LOADI R2, #7\n\
        STORE R2, #0x2000\n\
        LOAD R3, #0x2000\n\
        HALT\n",
    );
    cpu.run(100).expect("run");
    assert!(cpu.flags.zero, "SUBI set zero; loads and stores kept it");
    assert!(cpu.flags.carry, "no borrow from 5 - 5");
}

#[test]
fn conditional_jumps_follow_their_flags() {
    // JZ taken after CMP of equal values; JNZ falls through.
    let cpu = run_to_halt(
        "\
        LOADI R1, #3\n\
        LOADI R2, #3\n\
        CMP R1, R2\n\
        JZ equal\n\
        LOADI R3, #0\n\
        HALT\n\
        equal: LOADI R3, #1\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(3), 1);
}

#[test]
fn jlt_and_jge_follow_the_negative_flag() {
    let cpu = run_to_halt(
        "\
        LOADI R1, #2\n\
        LOADI R2, #5\n\
        CMP R1, R2\n\
        JLT less\n\
        LOADI R3, #0\n\
        HALT\n\
        less: LOADI R3, #1\n\
        CMP R2, R1\n\
        JGE done\n\
        LOADI R3, #0\n\
        done: HALT\n",
    );
    assert_eq!(cpu.regs.read(3), 1);
}

#[test]
fn jle_takes_zero_or_negative() {
    let cpu = run_to_halt(
        "\
        LOADI R1, #4\n\
        LOADI R2, #4\n\
        CMP R1, R2\n\
        JLE le\n\
        LOADI R3, #0\n\
        HALT\n\
        le: LOADI R3, #1\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(3), 1);
}

#[test]
fn carry_jumps_follow_the_carry_flag() {
    // 0 - 1 borrows: carry clear, JNC taken.
    let cpu = run_to_halt(
        "\
        LOADI R1, #0\n\
        SUBI R1, R1, #1\n\
        JNC borrowed\n\
        LOADI R3, #0\n\
        HALT\n\
        borrowed: LOADI R3, #1\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(3), 1);
}

#[test]
fn cmp_discards_its_result() {
    let cpu = run_to_halt(
        "\
        LOADI R1, #9\n\
        LOADI R2, #4\n\
        CMP R1, R2\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(1), 9);
    assert_eq!(cpu.regs.read(2), 4);
    assert!(!cpu.flags.zero);
    assert!(cpu.flags.carry);
}

#[test]
fn shifts_mask_the_amount_and_set_logic_flags() {
    let cpu = run_to_halt(
        "\
        LOADI R1, #1\n\
        SHL R2, R1, #31\n\
        SHR R3, R2, #31\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(2), 0x8000_0000);
    assert_eq!(cpu.regs.read(3), 1);
    assert!(!cpu.flags.carry, "logic ops force carry false");
}

#[test]
fn indexed_operands_resolve_against_the_base_register() {
    let cpu = run_to_halt(
        "\
        LOADI R1, #0x2000\n\
        LOADI R2, #99\n\
        STORE R2, [R1 + 8]\n\
        LOAD R3, [R1 + 8]\n\
        HALT\n",
    );
    assert_eq!(cpu.regs.read(3), 99);
    assert_eq!(cpu.memory.read_word(0x2008).unwrap(), 99);
}

// ──────────────────────────────────────────────────────────
// Encoder/engine agreement
// ──────────────────────────────────────────────────────────

/// The most dangerous divergence in this system is the assembler and the
/// engine disagreeing on semantics. Run the same program from source text
/// and from its decoded machine image and require identical final state.
#[test]
fn image_execution_matches_text_execution() {
    let source = "\
        LOADI R1, #10\n\
        LOADI R2, #0\n\
        LOOP: ADD R2, R2, R1\n\
        SUBI R1, R1, #1\n\
        JNZ LOOP\n\
        STORE R2, #0x2000\n\
        HALT\n";
    let profile = Profile::bit32();
    let config = EngineConfig::default();

    let mut from_text = Cpu::new(&profile, program_from_source(source).expect("load"), &config);
    from_text.run(10_000).expect("text run");

    let image = assemble(&profile, source).expect("assemble");
    let decoded = program_from_image(&profile, &image).expect("decode");
    let mut from_image = Cpu::new(&profile, decoded, &config);
    from_image.run(10_000).expect("image run");

    assert_eq!(from_text.regs, from_image.regs);
    assert_eq!(from_text.flags, from_image.flags);
    assert_eq!(from_text.steps, from_image.steps);
    assert_eq!(
        from_text.memory.read_word(0x2000).unwrap(),
        from_image.memory.read_word(0x2000).unwrap()
    );
}

#[test]
fn image_execution_handles_absolute_and_relative_jumps() {
    let source = "\
        LOADI R1, #1\n\
        JMP 0x10\n\
        LOADI R1, #2\n\
        HALT\n\
        LOADI R2, #5\n\
        JMP back\n\
        back: HALT\n";
    let profile = Profile::bit32();
    let image = assemble(&profile, source).expect("assemble");
    let decoded = program_from_image(&profile, &image).expect("decode");
    let mut cpu = Cpu::new(&profile, decoded, &EngineConfig::default());
    cpu.run(100).expect("run");
    assert_eq!(cpu.regs.read(1), 1, "absolute jump skipped the overwrite");
    assert_eq!(cpu.regs.read(2), 5);
}
