//! Two-pass encoder.
//!
//! Pass 1 walks the parsed source assigning addresses and populating the
//! label table; forward references are legal and never fail here. Pass 2
//! re-walks the source, resolves every operand against the ISA profile, and
//! packs machine bytes. Pass 2 never stops at the first failure: it collects
//! every encode error, and the result of assembly is either a complete,
//! validated image or the complete error set — never a partial image.

use std::collections::BTreeMap;

use tracing::debug;

use crate::common::{AsmErrorKind, AsmReport};
use crate::isa::decode::sign_extend;
use crate::isa::{
    Instruction, OpcodeSpec, OperandShape, Profile, IMM12_MASK, IMM20_MASK, OPCODE_SHIFT,
    RD_SHIFT, RS1_SHIFT, RS2_SHIFT, TAG_BIT,
};

use super::image::MachineImage;
use super::parser::{
    is_label_like, parse_immediate, parse_indexed, parse_register, parse_source, ParsedLine,
    Statement,
};

/// Mapping from label name to its resolved byte address.
///
/// Populated only by pass 1; read-only afterward.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    map: BTreeMap<String, u32>,
}

impl LabelTable {
    /// Records a label definition at `addr`.
    ///
    /// # Errors
    ///
    /// [`AsmErrorKind::DuplicateLabel`] if the name is already defined.
    pub fn define(&mut self, name: &str, addr: u32) -> Result<(), AsmErrorKind> {
        if self.map.contains_key(name) {
            return Err(AsmErrorKind::DuplicateLabel(name.to_string()));
        }
        let _ = self.map.insert(name.to_string(), addr);
        Ok(())
    }

    /// Resolves a label name to its address.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied()
    }

    /// Number of labels defined.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if no label is defined.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A resolved address-class operand.
enum AddrOperand {
    /// A literal address.
    Direct(u32),
    /// A resolved label; branches encode these relative where the profile
    /// says so.
    Label(u32),
    /// `[Rbase + offset]`.
    Indexed { base: u32, offset: i64 },
}

/// Assembles source text into a machine image under the given profile.
///
/// # Errors
///
/// An [`AsmReport`] with every parse and encode failure of the run, each
/// naming its source line and offending token.
pub fn assemble(profile: &Profile, source: &str) -> Result<MachineImage, AsmReport> {
    let lines = parse_source(source)?;
    let mut report = AsmReport::default();

    let labels = first_pass(profile, &lines, &mut report);
    debug!(
        labels = labels.len(),
        lines = lines.len(),
        profile = profile.name,
        "pass 1 complete"
    );

    let image = second_pass(profile, &lines, &labels, &mut report);
    debug!(bytes = image.len(), errors = report.errors.len(), "pass 2 complete");

    if report.is_empty() {
        Ok(image)
    } else {
        Err(report)
    }
}

/// Pass 1: assign addresses and populate the label table.
///
/// A label records the address counter *before* the size of any instruction
/// on the same line. Unknown mnemonics are reported here (they cannot be
/// sized); unresolved references are not an error until pass 2.
fn first_pass(profile: &Profile, lines: &[ParsedLine], report: &mut AsmReport) -> LabelTable {
    let mut labels = LabelTable::default();
    let mut addr: u32 = 0;

    for parsed in lines {
        for label in &parsed.labels {
            if let Err(kind) = labels.define(label, addr) {
                report.push(parsed.line, kind);
            }
        }
        match &parsed.statement {
            Some(Statement::Org(target)) => addr = *target,
            Some(Statement::Word(_)) => addr += profile.word_size,
            Some(Statement::Byte(_)) => addr += 1,
            Some(Statement::Data(bytes)) => addr += bytes.len() as u32,
            Some(Statement::Instruction(inst)) => match profile.lookup(&inst.op) {
                Some(spec) => addr += encoded_length(profile, spec, inst),
                None => report.push(inst.line, AsmErrorKind::UnknownMnemonic(inst.op.clone())),
            },
            None => {}
        }
    }
    labels
}

/// Pass 2: encode every statement into the image.
fn second_pass(
    profile: &Profile,
    lines: &[ParsedLine],
    labels: &LabelTable,
    report: &mut AsmReport,
) -> MachineImage {
    let mut image = MachineImage::new(profile.word_size);
    let mut addr: u32 = 0;

    for parsed in lines {
        match &parsed.statement {
            Some(Statement::Org(target)) => addr = *target,
            Some(Statement::Word(value)) => {
                image.put_bytes(addr, &word_bytes(profile, *value));
                addr += profile.word_size;
            }
            Some(Statement::Byte(value)) => {
                image.put_bytes(addr, &[*value]);
                addr += 1;
            }
            Some(Statement::Data(bytes)) => {
                image.put_bytes(addr, bytes);
                addr += bytes.len() as u32;
            }
            Some(Statement::Instruction(inst)) => {
                // Unknown mnemonics were reported in pass 1.
                let Some(spec) = profile.lookup(&inst.op) else {
                    continue;
                };
                let length = encoded_length(profile, spec, inst);
                match encode_instruction(profile, spec, inst, addr, labels) {
                    Ok(bytes) => image.put_bytes(addr, &bytes),
                    Err(kind) => report.push(inst.line, kind),
                }
                addr += length;
            }
            None => {}
        }
    }
    image
}

/// Encoded length in bytes of one instruction.
///
/// Fixed-width profiles use their instruction width; under declared
/// wide-address synthesis a direct-address memory operation always occupies
/// two words (the length must not depend on a label value pass 1 has not
/// resolved yet). Variable-width profiles derive the length from the shape.
pub fn encoded_length(profile: &Profile, spec: &OpcodeSpec, inst: &Instruction) -> u32 {
    if let Some(width) = profile.instruction_width {
        let synthesized = profile.wide_address_synthesis
            && spec.shape == OperandShape::RegAddr
            && inst.args.get(1).is_some_and(|t| !t.starts_with('['));
        return if synthesized { width * 2 } else { width };
    }
    match spec.shape {
        OperandShape::RegImm => 2,
        OperandShape::RegAddr | OperandShape::AddrOnly => 3,
        _ => 1,
    }
}

/// Encodes one instruction at `addr` into its machine bytes.
///
/// # Errors
///
/// The specific [`AsmErrorKind`] for the failing operand: bad register or
/// immediate token, unresolved label, offset or address field overflow, or
/// wrong operand count for the mnemonic's shape.
pub fn encode_instruction(
    profile: &Profile,
    spec: &OpcodeSpec,
    inst: &Instruction,
    addr: u32,
    labels: &LabelTable,
) -> Result<Vec<u8>, AsmErrorKind> {
    let expected = spec.shape.operand_count();
    if inst.args.len() != expected {
        return Err(AsmErrorKind::WrongOperandCount {
            mnemonic: inst.op.clone(),
            expected,
            got: inst.args.len(),
        });
    }
    if profile.instruction_width.is_some() {
        encode_fixed(profile, spec, inst, addr, labels)
    } else {
        encode_variable(profile, spec, inst, labels)
    }
}

/// Resolves an address-class operand token.
fn resolve_address(
    profile: &Profile,
    token: &str,
    labels: &LabelTable,
) -> Result<AddrOperand, AsmErrorKind> {
    if let Some((base, offset)) = parse_indexed(profile, token)? {
        return Ok(AddrOperand::Indexed { base, offset });
    }
    if is_label_like(token) {
        return labels
            .get(token)
            .map(AddrOperand::Label)
            .ok_or_else(|| AsmErrorKind::UnresolvedLabel(token.to_string()));
    }
    let value = parse_immediate(token)
        .map_err(|_| AsmErrorKind::MalformedOperand(token.to_string()))?;
    u32::try_from(value)
        .map(AddrOperand::Direct)
        .map_err(|_| AsmErrorKind::MalformedOperand(token.to_string()))
}

/// Checks that an absolute address fits the profile's address field.
fn check_address(profile: &Profile, address: u32) -> Result<u32, AsmErrorKind> {
    if u64::from(address) >> profile.address_bits != 0 {
        return Err(AsmErrorKind::AddressOutOfRange {
            address: i64::from(address),
            bits: profile.address_bits,
        });
    }
    Ok(address)
}

/// Fixed-width (32-bit) encoding.
fn encode_fixed(
    profile: &Profile,
    spec: &OpcodeSpec,
    inst: &Instruction,
    addr: u32,
    labels: &LabelTable,
) -> Result<Vec<u8>, AsmErrorKind> {
    let op = spec.opcode << OPCODE_SHIFT;
    let reg = |i: usize| parse_register(profile, &inst.args[i]);
    let imm = |i: usize| parse_immediate(&inst.args[i]);

    let words: Vec<u32> = match spec.shape {
        OperandShape::NoOperand => vec![op],
        OperandShape::Reg => vec![op | reg(0)? << RD_SHIFT],
        OperandShape::RegRegReg => {
            vec![op | reg(0)? << RD_SHIFT | reg(1)? << RS1_SHIFT | reg(2)? << RS2_SHIFT]
        }
        OperandShape::RegRegImm => {
            vec![op | reg(0)? << RD_SHIFT | reg(1)? << RS1_SHIFT | (imm(2)? as u32 & IMM12_MASK)]
        }
        OperandShape::RegImm => vec![op | reg(0)? << RD_SHIFT | (imm(1)? as u32 & IMM20_MASK)],
        // Compare packs its two sources in the rs1/rs2 fields.
        OperandShape::RegReg | OperandShape::RegRegSub => {
            vec![op | reg(0)? << RS1_SHIFT | reg(1)? << RS2_SHIFT]
        }
        OperandShape::RegAddr => {
            let rd = reg(0)? << RD_SHIFT;
            match resolve_address(profile, &inst.args[1], labels)? {
                AddrOperand::Indexed { base, offset } => {
                    vec![op | TAG_BIT | rd | base << RS1_SHIFT | (offset as u32 & IMM12_MASK)]
                }
                AddrOperand::Direct(address) | AddrOperand::Label(address) => {
                    if profile.wide_address_synthesis {
                        vec![op | rd, address]
                    } else {
                        vec![op | rd | check_address(profile, address)?]
                    }
                }
            }
        }
        OperandShape::AddrOnly => match resolve_address(profile, &inst.args[0], labels)? {
            AddrOperand::Label(target) if profile.relative_branches => {
                vec![op | TAG_BIT | branch_offset_field(profile, addr, target)?]
            }
            AddrOperand::Label(address) | AddrOperand::Direct(address) => {
                vec![op | check_address(profile, address)?]
            }
            AddrOperand::Indexed { .. } => {
                return Err(AsmErrorKind::MalformedOperand(inst.args[0].clone()))
            }
        },
    };

    Ok(words.iter().flat_map(|w| w.to_le_bytes()).collect())
}

/// Computes and range-checks a relative branch offset field.
///
/// The displacement is counted in instruction words from the slot after the
/// branch: `(target - (addr + width)) / word_size`. The truncated field must
/// round-trip back to the same displacement; silently wrapping an
/// out-of-range offset is the one bug this toolchain must never have.
fn branch_offset_field(profile: &Profile, addr: u32, target: u32) -> Result<u32, AsmErrorKind> {
    let width = i64::from(profile.instruction_width.unwrap_or(profile.word_size));
    let offset = (i64::from(target) - (i64::from(addr) + width)) / i64::from(profile.word_size);
    let bits = profile.branch_offset_bits;
    let field = offset as u32 & field_mask(bits);
    if i64::from(sign_extend(field, bits)) != offset {
        return Err(AsmErrorKind::OffsetOutOfRange { offset, bits });
    }
    Ok(field)
}

/// All-ones mask of the given width.
fn field_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Variable-width (8-bit) encoding.
///
/// The first byte is the opcode base with register 1 OR'd into bits 3-1;
/// immediates and addresses follow little-endian in the trailing bytes.
fn encode_variable(
    profile: &Profile,
    spec: &OpcodeSpec,
    inst: &Instruction,
    labels: &LabelTable,
) -> Result<Vec<u8>, AsmErrorKind> {
    let base = spec.opcode as u8;
    let reg = |i: usize| parse_register(profile, &inst.args[i]);

    let bytes = match spec.shape {
        OperandShape::NoOperand => vec![base],
        OperandShape::Reg => vec![base | (reg(0)? as u8) << 1],
        OperandShape::RegReg => {
            // The control unit's low bits carry the high bits of the second
            // register id.
            let (r1, r2) = (reg(0)? as u8, reg(1)? as u8);
            vec![base | r1 << 1 | r2 >> 1]
        }
        OperandShape::RegRegSub => {
            // Both operands are validated, but the low bits already carry
            // the sub-operation; the second register id is implied.
            let r1 = reg(0)? as u8;
            let _ = reg(1)?;
            vec![base | r1 << 1]
        }
        OperandShape::RegImm => {
            let r1 = reg(0)? as u8;
            let value = parse_immediate(&inst.args[1])? as u32 & field_mask(profile.immediate_bits);
            vec![base | r1 << 1, value as u8]
        }
        OperandShape::RegAddr => {
            let r1 = reg(0)? as u8;
            let address = match resolve_address(profile, &inst.args[1], labels)? {
                AddrOperand::Direct(a) | AddrOperand::Label(a) => check_address(profile, a)?,
                AddrOperand::Indexed { .. } => {
                    return Err(AsmErrorKind::MalformedOperand(inst.args[1].clone()))
                }
            };
            vec![base | r1 << 1, address as u8, (address >> 8) as u8]
        }
        OperandShape::AddrOnly => {
            let address = match resolve_address(profile, &inst.args[0], labels)? {
                AddrOperand::Direct(a) | AddrOperand::Label(a) => check_address(profile, a)?,
                AddrOperand::Indexed { .. } => {
                    return Err(AsmErrorKind::MalformedOperand(inst.args[0].clone()))
                }
            };
            vec![base, address as u8, (address >> 8) as u8]
        }
        OperandShape::RegRegReg | OperandShape::RegRegImm => {
            return Err(AsmErrorKind::MalformedOperand(inst.raw.clone()))
        }
    };
    Ok(bytes)
}

/// Serializes one `.word` value for the profile's word size.
fn word_bytes(profile: &Profile, value: u32) -> Vec<u8> {
    value.to_le_bytes()[..profile.word_size as usize].to_vec()
}
