//! Encode/decode round-trip properties for the 32-bit profile.
//!
//! For every decodable instruction, `decode(encode(i))` must reconstruct the
//! record operand-for-operand; for branches, the reconstructed target index
//! must equal the source target exactly.

use mrisc_core::asm::encoder::{encode_instruction, LabelTable};
use mrisc_core::asm::assemble;
use mrisc_core::common::AsmErrorKind;
use mrisc_core::isa::decode::{decode_word, sign_extend};
use mrisc_core::isa::{Instruction, Profile};

fn inst(op: &str, args: &[&str]) -> Instruction {
    Instruction::new(
        op,
        args.iter().map(|s| (*s).to_string()).collect(),
        1,
        format!("{op} {}", args.join(", ")),
    )
}

/// Encodes a single instruction at address 0 and decodes it back.
fn round_trip(op: &str, args: &[&str]) -> Instruction {
    let profile = Profile::bit32();
    let spec = profile.lookup(op).expect("mnemonic");
    let labels = LabelTable::default();
    let source = inst(op, args);
    let bytes = encode_instruction(&profile, spec, &source, 0, &labels).expect("encode");
    assert_eq!(bytes.len(), 4);
    let word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    decode_word(&profile, word, 0).expect("decode")
}

#[test]
fn sign_extend_matches_field_widths() {
    assert_eq!(sign_extend(0xFFF, 12), -1);
    assert_eq!(sign_extend(0x7FF, 12), 2047);
    assert_eq!(sign_extend(0x800, 12), -2048);
    assert_eq!(sign_extend(0xFFFFF, 20), -1);
    assert_eq!(sign_extend(0x7FFFF, 20), 524287);
}

// ──────────────────────────────────────────────────────────
// Operand-for-operand round-trips
// ──────────────────────────────────────────────────────────

#[test]
fn register_register_register_round_trips() {
    for (op, args) in [
        ("ADD", ["R1", "R2", "R3"]),
        ("SUB", ["R15", "R0", "R7"]),
        ("AND", ["R4", "R4", "R4"]),
        ("OR", ["R9", "R10", "R11"]),
        ("XOR", ["R12", "R13", "R14"]),
    ] {
        let decoded = round_trip(op, &args);
        assert_eq!(decoded.op, op);
        assert_eq!(decoded.args, args, "{op}");
    }
}

#[test]
fn register_immediate_round_trips() {
    for (op, args) in [
        ("ADDI", ["R1", "R2", "#42"]),
        ("ADDI", ["R1", "R2", "#-1"]),
        ("SUBI", ["R3", "R3", "#2047"]),
        ("SUBI", ["R3", "R3", "#-2048"]),
        ("SHL", ["R1", "R2", "#3"]),
        ("SHR", ["R1", "R2", "#31"]),
    ] {
        let decoded = round_trip(op, &args);
        assert_eq!(decoded.op, op);
        assert_eq!(decoded.args, args, "{op} {args:?}");
    }
}

#[test]
fn wide_immediate_round_trips() {
    for args in [
        ["R5", "#1000"],
        ["R5", "#-1000"],
        ["R1", "#524287"],
        ["R1", "#-524288"],
        ["R0", "#0"],
    ] {
        let decoded = round_trip("LOADI", &args);
        assert_eq!(decoded.op, "LOADI");
        assert_eq!(decoded.args, args, "{args:?}");
    }
}

#[test]
fn compare_round_trips() {
    let decoded = round_trip("CMP", &["R2", "R7"]);
    assert_eq!(decoded.op, "CMP");
    assert_eq!(decoded.args, ["R2", "R7"]);
}

#[test]
fn direct_memory_round_trips() {
    for (op, args) in [
        ("LOAD", ["R1", "0x2000"]),
        ("STORE", ["R4", "0x2100"]),
        ("LOAD", ["R15", "0xffffc"]),
    ] {
        let decoded = round_trip(op, &args);
        assert_eq!(decoded.op, op);
        assert_eq!(decoded.args, args, "{op}");
    }
}

#[test]
fn indexed_memory_round_trips() {
    for (op, args) in [
        ("LOAD", ["R1", "[R2 + 8]"]),
        ("STORE", ["R3", "[R4 + -4]"]),
        ("LOAD", ["R5", "[R6 + 0]"]),
    ] {
        let decoded = round_trip(op, &args);
        assert_eq!(decoded.op, op);
        assert_eq!(decoded.args, args, "{op}");
    }
}

#[test]
fn no_operand_round_trips() {
    let decoded = round_trip("HALT", &[]);
    assert_eq!(decoded.op, "HALT");
    assert!(decoded.args.is_empty());
}

#[test]
fn absolute_jump_reconstructs_instruction_index() {
    // Literal target 0x100 is a byte address; PC is an instruction index.
    let decoded = round_trip("JMP", &["0x100"]);
    assert_eq!(decoded.op, "JMP");
    assert_eq!(decoded.args, ["#64"]);
}

// ──────────────────────────────────────────────────────────
// Branch offset correctness
// ──────────────────────────────────────────────────────────

/// Assembles a program, decodes the word at instruction `index`, and
/// returns the reconstructed branch target index.
fn decoded_target(source: &str, index: usize) -> usize {
    let profile = Profile::bit32();
    let image = assemble(&profile, source).expect("assemble");
    let word = image.word_at((index * 4) as u32);
    let decoded = decode_word(&profile, word, index).expect("decode");
    let token = decoded.args[0].strip_prefix('#').expect("target token");
    token.parse().expect("target index")
}

#[test]
fn forward_branch_offset_reconstructs_target() {
    let source = "\
        LOADI R1, #0\n\
        JMP end\n\
        LOADI R1, #1\n\
        end: HALT\n";
    assert_eq!(decoded_target(source, 1), 3);
}

#[test]
fn backward_branch_offset_reconstructs_target() {
    let source = "\
        LOADI R1, #10\n\
        loop: SUBI R1, R1, #1\n\
        JNZ loop\n\
        HALT\n";
    assert_eq!(decoded_target(source, 2), 1);
}

#[test]
fn branch_to_next_instruction_encodes_zero_offset() {
    let source = "\
        JMP next\n\
        next: HALT\n";
    let profile = Profile::bit32();
    let image = assemble(&profile, source).expect("assemble");
    // Offset field must be zero: target == pc + 4.
    assert_eq!(image.word_at(0) & 0xFFF, 0);
    assert_eq!(decoded_target(source, 0), 1);
}

#[test]
fn branch_offset_overflow_is_a_hard_error() {
    // A backward displacement of -4097 words cannot round-trip through the
    // 12-bit field; silently wrapping it would be catastrophic.
    let source = "\
        target: HALT\n\
        .org 0x4000\n\
        JMP target\n";
    let profile = Profile::bit32();
    let report = assemble(&profile, source).expect_err("must overflow");
    assert!(report.errors.iter().any(|e| matches!(
        e.kind,
        AsmErrorKind::OffsetOutOfRange { bits: 12, .. }
    )));
}

#[test]
fn undecodable_word_is_reported() {
    let profile = Profile::bit32();
    // Opcode 0 names no instruction.
    assert!(matches!(
        decode_word(&profile, 0, 0),
        Err(AsmErrorKind::UndecodableWord(0))
    ));
}
