//! Instruction-set descriptions.
//!
//! This module defines the declarative [`Profile`] type that both the
//! assembler and the execution engine consume, guaranteeing they agree on
//! opcode semantics. It provides:
//! 1. **Operand shapes:** the tagged set of operand layouts an instruction
//!    can declare.
//! 2. **Profiles:** the two built-in instruction sets (8-bit variable-width
//!    and 32-bit fixed-width) behind one description.
//! 3. **Validation:** caller-misuse checks for inconsistent field widths.

/// Word decoding for profiles that declare it.
pub mod decode;
/// Instruction records shared by assembler, decoder, and engine.
pub mod instruction;
/// Opcode constant tables for the built-in profiles.
pub mod opcodes;

pub use instruction::Instruction;

use crate::common::ProfileError;

/// Bit position of the 5-bit opcode field in a 32-bit instruction word.
pub const OPCODE_SHIFT: u32 = 27;

/// Bit position of the 3-bit function field (bits 26-24).
pub const FUNC_SHIFT: u32 = 24;

/// Bit position of the destination-register field (bits 23-20).
pub const RD_SHIFT: u32 = 20;

/// Bit position of the first source-register field (bits 19-16).
pub const RS1_SHIFT: u32 = 16;

/// Bit position of the second source-register field (bits 15-12).
pub const RS2_SHIFT: u32 = 12;

/// Mask for 4-bit register-id fields.
pub const REG_MASK: u32 = 0xF;

/// Mask for the 12-bit immediate/offset field of the standard format.
pub const IMM12_MASK: u32 = 0xFFF;

/// Mask for the 20-bit immediate/address field of the wide format.
pub const IMM20_MASK: u32 = 0xFFFFF;

/// Function-field bit distinguishing the standard format from the wide one.
///
/// For branches this is the relative/absolute tag: set means a signed word
/// offset in the 12-bit field, clear means an absolute address in the 20-bit
/// field. For memory operations, set means an indexed `[Rbase + offset]`
/// operand.
pub const TAG_BIT: u32 = 1 << FUNC_SHIFT;

/// Operand layout an opcode declares.
///
/// The shape fixes both the operand count the assembler accepts and the bit
/// fields the encoder packs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandShape {
    /// Two registers, both encoded (e.g. `CMP R1, R2`).
    RegReg,
    /// Two registers where the low bits of the opcode byte carry a
    /// sub-operation instead of the second register id (8-bit ALU groups).
    RegRegSub,
    /// Three registers: destination and two sources.
    RegRegReg,
    /// Destination register, source register, immediate.
    RegRegImm,
    /// Destination register and immediate.
    RegImm,
    /// Register plus a literal address, label, or `[Rbase + offset]`.
    RegAddr,
    /// A branch target: label or literal address.
    AddrOnly,
    /// A single register (unary ALU and stack operations).
    Reg,
    /// No operands.
    NoOperand,
}

impl OperandShape {
    /// Number of operand tokens the shape expects.
    pub fn operand_count(self) -> usize {
        match self {
            Self::NoOperand => 0,
            Self::Reg | Self::AddrOnly => 1,
            Self::RegReg | Self::RegRegSub | Self::RegImm | Self::RegAddr => 2,
            Self::RegRegReg | Self::RegRegImm => 3,
        }
    }
}

/// One row of a profile's opcode table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpcodeSpec {
    /// Uppercase mnemonic.
    pub mnemonic: &'static str,
    /// Opcode value: the 5-bit opcode for the 32-bit profile, the base
    /// instruction byte (group nibble plus sub-operation) for the 8-bit one.
    pub opcode: u32,
    /// Operand layout.
    pub shape: OperandShape,
}

/// Declarative description of one instruction set.
///
/// A profile is immutable once constructed; the assembler and the engine for
/// a given program must use the same profile instance. Distinct profiles
/// never mix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// Profile name, used in diagnostics.
    pub name: &'static str,
    /// Machine word size in bytes.
    pub word_size: u32,
    /// Fixed encoded instruction length in bytes, or `None` for
    /// variable-width encodings (length then derives from the shape).
    pub instruction_width: Option<u32>,
    /// Number of architectural registers (`R0` is hardwired to zero).
    pub register_count: u32,
    /// Opcode field width in bits.
    pub opcode_bits: u32,
    /// Register-id field width in bits.
    pub register_bits: u32,
    /// Standard immediate field width in bits.
    pub immediate_bits: u32,
    /// Wide immediate field width in bits (equals `immediate_bits` when the
    /// profile has no wide format).
    pub wide_immediate_bits: u32,
    /// Relative branch-offset field width in bits.
    pub branch_offset_bits: u32,
    /// Absolute address field width in bits.
    pub address_bits: u32,
    /// Whether immediates are sign-extended (else zero-extended).
    pub sign_extend_immediates: bool,
    /// Whether label branch targets encode as relative word offsets
    /// (else every branch target is absolute).
    pub relative_branches: bool,
    /// Whether a literal address too wide for the absolute field is carried
    /// in a synthesized extra word (else it is a hard encode error).
    pub wide_address_synthesis: bool,
    /// Whether encoded streams can be decoded back into instruction
    /// records. Encode-only profiles target an external hardware decoder.
    pub supports_decode: bool,
    /// The opcode table.
    pub opcodes: &'static [OpcodeSpec],
}

/// Opcode table for the 32-bit profile.
const OPCODES_32: &[OpcodeSpec] = {
    use self::opcodes::op32;
    use self::OperandShape::{AddrOnly, NoOperand, RegAddr, RegImm, RegReg, RegRegImm, RegRegReg};
    &[
        OpcodeSpec { mnemonic: "LOADI", opcode: op32::LOADI, shape: RegImm },
        OpcodeSpec { mnemonic: "LOAD", opcode: op32::LOAD, shape: RegAddr },
        OpcodeSpec { mnemonic: "STORE", opcode: op32::STORE, shape: RegAddr },
        OpcodeSpec { mnemonic: "ADD", opcode: op32::ADD, shape: RegRegReg },
        OpcodeSpec { mnemonic: "ADDI", opcode: op32::ADDI, shape: RegRegImm },
        OpcodeSpec { mnemonic: "SUB", opcode: op32::SUB, shape: RegRegReg },
        OpcodeSpec { mnemonic: "SUBI", opcode: op32::SUBI, shape: RegRegImm },
        OpcodeSpec { mnemonic: "AND", opcode: op32::AND, shape: RegRegReg },
        OpcodeSpec { mnemonic: "OR", opcode: op32::OR, shape: RegRegReg },
        OpcodeSpec { mnemonic: "XOR", opcode: op32::XOR, shape: RegRegReg },
        OpcodeSpec { mnemonic: "SHL", opcode: op32::SHL, shape: RegRegImm },
        OpcodeSpec { mnemonic: "SHR", opcode: op32::SHR, shape: RegRegImm },
        OpcodeSpec { mnemonic: "CMP", opcode: op32::CMP, shape: RegReg },
        OpcodeSpec { mnemonic: "JMP", opcode: op32::JMP, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JZ", opcode: op32::JZ, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JNZ", opcode: op32::JNZ, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JC", opcode: op32::JC, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JNC", opcode: op32::JNC, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JLT", opcode: op32::JLT, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JGE", opcode: op32::JGE, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JLE", opcode: op32::JLE, shape: AddrOnly },
        OpcodeSpec { mnemonic: "HALT", opcode: op32::HALT, shape: NoOperand },
    ]
};

/// Opcode table for the 8-bit profile.
const OPCODES_8: &[OpcodeSpec] = {
    use self::opcodes::op8;
    use self::OperandShape::{AddrOnly, NoOperand, Reg, RegAddr, RegImm, RegReg, RegRegSub};
    &[
        OpcodeSpec { mnemonic: "ADD", opcode: op8::ADD, shape: RegReg },
        OpcodeSpec { mnemonic: "SUB", opcode: op8::SUB, shape: RegRegSub },
        OpcodeSpec { mnemonic: "ADC", opcode: op8::ADC, shape: RegRegSub },
        OpcodeSpec { mnemonic: "SBC", opcode: op8::SBC, shape: RegRegSub },
        OpcodeSpec { mnemonic: "AND", opcode: op8::AND, shape: RegRegSub },
        OpcodeSpec { mnemonic: "OR", opcode: op8::OR, shape: RegRegSub },
        OpcodeSpec { mnemonic: "XOR", opcode: op8::XOR, shape: RegRegSub },
        OpcodeSpec { mnemonic: "NOT", opcode: op8::NOT, shape: Reg },
        OpcodeSpec { mnemonic: "SHL", opcode: op8::SHL, shape: Reg },
        OpcodeSpec { mnemonic: "SHR", opcode: op8::SHR, shape: Reg },
        OpcodeSpec { mnemonic: "ROL", opcode: op8::ROL, shape: Reg },
        OpcodeSpec { mnemonic: "ROR", opcode: op8::ROR, shape: Reg },
        OpcodeSpec { mnemonic: "LOAD", opcode: op8::LOAD, shape: RegAddr },
        OpcodeSpec { mnemonic: "STORE", opcode: op8::STORE, shape: RegAddr },
        OpcodeSpec { mnemonic: "LOADI", opcode: op8::LOADI, shape: RegImm },
        OpcodeSpec { mnemonic: "JMP", opcode: op8::JMP, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JEQ", opcode: op8::JEQ, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JNE", opcode: op8::JNE, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JLT", opcode: op8::JLT, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JGE", opcode: op8::JGE, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JCS", opcode: op8::JCS, shape: AddrOnly },
        OpcodeSpec { mnemonic: "JCC", opcode: op8::JCC, shape: AddrOnly },
        OpcodeSpec { mnemonic: "CALL", opcode: op8::CALL, shape: NoOperand },
        OpcodeSpec { mnemonic: "RET", opcode: op8::RET, shape: NoOperand },
        OpcodeSpec { mnemonic: "PUSH", opcode: op8::PUSH, shape: Reg },
        OpcodeSpec { mnemonic: "POP", opcode: op8::POP, shape: Reg },
        OpcodeSpec { mnemonic: "CMP", opcode: op8::CMP, shape: RegReg },
        OpcodeSpec { mnemonic: "SYSCALL", opcode: op8::SYSCALL, shape: NoOperand },
        OpcodeSpec { mnemonic: "IRET", opcode: op8::IRET, shape: NoOperand },
        OpcodeSpec { mnemonic: "EI", opcode: op8::EI, shape: NoOperand },
        OpcodeSpec { mnemonic: "DI", opcode: op8::DI, shape: NoOperand },
        OpcodeSpec { mnemonic: "HALT", opcode: op8::HALT, shape: NoOperand },
        OpcodeSpec { mnemonic: "NOP", opcode: op8::NOP, shape: NoOperand },
    ]
};

impl Profile {
    /// The 32-bit fixed-width profile: 4-byte instructions, 16 registers,
    /// 12/20-bit immediates, relative label branches, decodable.
    pub fn bit32() -> Self {
        Self {
            name: "32bit",
            word_size: 4,
            instruction_width: Some(4),
            register_count: 16,
            opcode_bits: 5,
            register_bits: 4,
            immediate_bits: 12,
            wide_immediate_bits: 20,
            branch_offset_bits: 12,
            address_bits: 20,
            sign_extend_immediates: true,
            relative_branches: true,
            wide_address_synthesis: false,
            supports_decode: true,
            opcodes: OPCODES_32,
        }
    }

    /// The 8-bit variable-width profile: 1/2/3-byte instructions, 8
    /// registers, 8-bit immediates, 16-bit absolute addresses, encode-only.
    pub fn bit8() -> Self {
        Self {
            name: "8bit",
            word_size: 1,
            instruction_width: None,
            register_count: 8,
            opcode_bits: 4,
            register_bits: 3,
            immediate_bits: 8,
            wide_immediate_bits: 8,
            branch_offset_bits: 16,
            address_bits: 16,
            sign_extend_immediates: false,
            relative_branches: false,
            wide_address_synthesis: false,
            supports_decode: false,
            opcodes: OPCODES_8,
        }
    }

    /// Looks up the opcode table row for an (uppercase) mnemonic.
    pub fn lookup(&self, mnemonic: &str) -> Option<&OpcodeSpec> {
        self.opcodes.iter().find(|s| s.mnemonic == mnemonic)
    }

    /// Looks up the opcode table row for an opcode value.
    ///
    /// Only meaningful for profiles whose opcode values are unambiguous;
    /// the 32-bit profile satisfies this.
    pub fn lookup_opcode(&self, opcode: u32) -> Option<&OpcodeSpec> {
        self.opcodes.iter().find(|s| s.opcode == opcode)
    }

    /// Checks the description for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] naming the first inconsistent field: a
    /// zero or over-wide field width, a register count that does not fit the
    /// register-id field, or an opcode value that does not fit the opcode
    /// field.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let fields = [
            ("opcode_bits", self.opcode_bits),
            ("register_bits", self.register_bits),
            ("immediate_bits", self.immediate_bits),
            ("wide_immediate_bits", self.wide_immediate_bits),
            ("branch_offset_bits", self.branch_offset_bits),
            ("address_bits", self.address_bits),
        ];
        for (field, bits) in fields {
            if bits == 0 || bits > 32 {
                return Err(ProfileError::InvalidFieldWidth {
                    profile: self.name.to_string(),
                    field,
                    bits,
                });
            }
        }
        if self.register_count > (1 << self.register_bits) {
            return Err(ProfileError::RegisterCountMismatch {
                profile: self.name.to_string(),
                count: self.register_count,
                bits: self.register_bits,
            });
        }
        // Variable-width opcode bytes carry group and sub-op together, so
        // only fixed-width profiles can check the raw opcode field.
        if self.instruction_width.is_some() {
            for spec in self.opcodes {
                if spec.opcode >= (1 << self.opcode_bits) {
                    return Err(ProfileError::OpcodeOutOfRange {
                        profile: self.name.to_string(),
                        mnemonic: spec.mnemonic.to_string(),
                        opcode: spec.opcode,
                        bits: self.opcode_bits,
                    });
                }
            }
        }
        Ok(())
    }
}
