//! Machine-word decoder.
//!
//! Reconstructs [`Instruction`] records from encoded 32-bit words so the
//! engine can run a previously assembled image, and so tests can assert the
//! encode/decode round-trip. Only profiles that declare
//! [`supports_decode`](super::Profile::supports_decode) may be decoded; the
//! loader enforces that. The 8-bit profile's packed register fields are not
//! recoverable and its streams are consumed by the hardware decoder instead.

use crate::common::AsmErrorKind;

use super::instruction::Instruction;
use super::{
    OperandShape, Profile, IMM12_MASK, IMM20_MASK, OPCODE_SHIFT, RD_SHIFT, REG_MASK, RS1_SHIFT,
    RS2_SHIFT, TAG_BIT,
};

/// Sign-extends the low `bits` of `value` to an `i32`.
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Decodes one instruction word sitting at instruction index `index`.
///
/// Relative branch targets are folded back into absolute instruction
/// indexes using `index`, so the reconstructed record is directly
/// executable regardless of where the branch sat in the image.
///
/// # Errors
///
/// [`AsmErrorKind::UndecodableWord`] if the opcode field does not name an
/// instruction of this profile.
pub fn decode_word(profile: &Profile, word: u32, index: usize) -> Result<Instruction, AsmErrorKind> {
    let opcode = word >> OPCODE_SHIFT;
    let Some(spec) = profile.lookup_opcode(opcode) else {
        return Err(AsmErrorKind::UndecodableWord(word));
    };

    let rd = (word >> RD_SHIFT) & REG_MASK;
    let rs1 = (word >> RS1_SHIFT) & REG_MASK;
    let rs2 = (word >> RS2_SHIFT) & REG_MASK;
    let extend = |value: u32, bits: u32| -> i32 {
        if profile.sign_extend_immediates {
            sign_extend(value, bits)
        } else {
            value as i32
        }
    };
    let imm12 = extend(word & IMM12_MASK, profile.immediate_bits);
    let imm20 = extend(word & IMM20_MASK, profile.wide_immediate_bits);
    let tagged = word & TAG_BIT != 0;

    let args = match spec.shape {
        OperandShape::NoOperand => vec![],
        OperandShape::RegRegReg => vec![reg(rd), reg(rs1), reg(rs2)],
        OperandShape::RegRegImm => vec![reg(rd), reg(rs1), format!("#{imm12}")],
        OperandShape::RegImm => vec![reg(rd), format!("#{imm20}")],
        // CMP packs its two sources in the rs1/rs2 fields.
        OperandShape::RegReg | OperandShape::RegRegSub => vec![reg(rs1), reg(rs2)],
        OperandShape::Reg => vec![reg(rd)],
        OperandShape::RegAddr => {
            if tagged {
                // Indexed displacements are signed regardless of the
                // profile's immediate-extension policy.
                let offset = sign_extend(word & IMM12_MASK, profile.immediate_bits);
                vec![reg(rd), format!("[{} + {offset}]", reg(rs1))]
            } else {
                vec![reg(rd), format!("{:#x}", word & IMM20_MASK)]
            }
        }
        OperandShape::AddrOnly => {
            let target = if tagged {
                // Relative: signed offset in instruction words from the
                // slot after the branch.
                let offset = sign_extend(word & IMM12_MASK, profile.branch_offset_bits);
                index as i64 + 1 + i64::from(offset)
            } else {
                // Absolute: a byte address; PC is an instruction index.
                i64::from(word & IMM20_MASK) / i64::from(profile.word_size)
            };
            vec![format!("#{target}")]
        }
    };

    let raw = if args.is_empty() {
        spec.mnemonic.to_string()
    } else {
        format!("{} {}", spec.mnemonic, args.join(", "))
    };
    Ok(Instruction::new(spec.mnemonic, args, 0, raw))
}

/// Formats a register index as its assembly token.
fn reg(idx: u32) -> String {
    format!("R{idx}")
}
