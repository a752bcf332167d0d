//! Assembly source front-end.
//!
//! Line-level processing shared by the two-pass encoder and the text-execution
//! loader: comment stripping, label extraction, directive parsing, and operand
//! tokenization. It also hosts the register/immediate parsing rules that the
//! execution engine reuses at decode time, so the encoder and the engine can
//! never disagree on what a token means.
//!
//! Source syntax:
//! - `;` begins a comment (inline allowed); blank lines are ignored.
//! - `label:` defines a label, optionally followed by an instruction.
//! - Directives: `.org <addr>`, `.word <value>`, `.byte <value>`,
//!   `.db "string"[, byte...]`.
//! - Instructions: `MNEMONIC operand[, operand...]`; registers `R<n>`,
//!   immediates `#`-prefixed decimal or `0x` hex, addresses bare literals or
//!   label names, memory operands `[Rbase + offset]`.

use crate::common::{AsmErrorKind, AsmReport};
use crate::isa::{Instruction, Profile};

/// One source statement after label extraction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `.org`: relocate the address cursor; emits nothing.
    Org(u32),
    /// `.word`: one literal machine word.
    Word(u32),
    /// `.byte`: one literal byte.
    Byte(u8),
    /// `.db`: string bytes (escapes expanded) plus trailing literal bytes.
    Data(Vec<u8>),
    /// An instruction to encode.
    Instruction(Instruction),
}

/// A cleaned source line: labels defined on it plus at most one statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedLine {
    /// Labels defined on this line, in order.
    pub labels: Vec<String>,
    /// The statement following the labels, if any.
    pub statement: Option<Statement>,
    /// 1-based source line number.
    pub line: u32,
}

/// Strips the comment portion of a line, honoring string literals.
///
/// A `;` inside a `.db "..."` string does not start a comment.
pub fn clean_line(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ';' if !in_string => return line[..i].trim(),
            _ => {}
        }
    }
    line.trim()
}

/// Splits an operand list on commas that sit outside string literals.
pub fn split_operands(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => {
                current.push(ch);
                escaped = true;
            }
            '"' => {
                current.push(ch);
                in_string = !in_string;
            }
            ',' if !in_string => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out.retain(|t| !t.is_empty());
    out
}

/// Parses a register token (`R<n>`) against the profile's register file.
///
/// # Errors
///
/// [`AsmErrorKind::InvalidRegister`] quoting the token if it is not of the
/// form `R<n>` or `n` is outside the register count.
pub fn parse_register(profile: &Profile, token: &str) -> Result<u32, AsmErrorKind> {
    let bad = || AsmErrorKind::InvalidRegister(token.to_string());
    let upper = token.trim().to_ascii_uppercase();
    let idx: u32 = upper
        .strip_prefix('R')
        .ok_or_else(bad)?
        .parse()
        .map_err(|_| bad())?;
    if idx >= profile.register_count {
        return Err(bad());
    }
    Ok(idx)
}

/// Parses an immediate token: optional `#` prefix, decimal or `0x` hex,
/// optional leading `-`.
///
/// # Errors
///
/// [`AsmErrorKind::MalformedImmediate`] quoting the token.
pub fn parse_immediate(token: &str) -> Result<i64, AsmErrorKind> {
    let bad = || AsmErrorKind::MalformedImmediate(token.to_string());
    let mut text = token.trim();
    text = text.strip_prefix('#').unwrap_or(text);
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| bad())?
    } else {
        digits.parse::<i64>().map_err(|_| bad())?
    };
    Ok(if negative { -magnitude } else { magnitude })
}

/// True if the token looks like a label reference rather than a literal.
pub fn is_label_like(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// A bracketed memory operand `[Rbase + offset]`, split into its parts.
///
/// Returns `None` if the token is not bracketed; an error if it is
/// bracketed but malformed.
pub fn parse_indexed(
    profile: &Profile,
    token: &str,
) -> Result<Option<(u32, i64)>, AsmErrorKind> {
    let Some(inner) = token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
    else {
        return Ok(None);
    };
    let inner = inner.trim();
    match inner.split_once('+') {
        Some((base, offset)) => {
            let base = parse_register(profile, base.trim())?;
            let offset = parse_immediate(offset.trim())?;
            Ok(Some((base, offset)))
        }
        None => {
            let base = parse_register(profile, inner)?;
            Ok(Some((base, 0)))
        }
    }
}

/// Expands the `.db` escape sequences `\n \t \r \\ \"` in a quoted string.
fn unescape(text: &str) -> Result<Vec<u8>, AsmErrorKind> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch as u8);
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            _ => return Err(AsmErrorKind::BadDirective(format!(".db \"{text}\""))),
        }
    }
    Ok(out)
}

/// Parses a directive line (already known to start with `.`).
fn parse_directive(text: &str) -> Result<Statement, AsmErrorKind> {
    let bad = || AsmErrorKind::BadDirective(text.to_string());
    let (name, rest) = match text.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (text, ""),
    };
    match name {
        ".org" => {
            let addr = parse_immediate(rest).map_err(|_| bad())?;
            u32::try_from(addr).map(Statement::Org).map_err(|_| bad())
        }
        ".word" => {
            let value = parse_immediate(rest).map_err(|_| bad())?;
            Ok(Statement::Word(value as u32))
        }
        ".byte" => {
            let value = parse_immediate(rest).map_err(|_| bad())?;
            Ok(Statement::Byte(value as u8))
        }
        ".db" => {
            let mut bytes = Vec::new();
            for item in split_operands(rest) {
                if let Some(inner) = item.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
                    bytes.extend(unescape(inner)?);
                } else {
                    bytes.push(parse_immediate(&item).map_err(|_| bad())? as u8);
                }
            }
            if bytes.is_empty() {
                return Err(bad());
            }
            Ok(Statement::Data(bytes))
        }
        _ => Err(bad()),
    }
}

/// Splits leading `label:` definitions off a cleaned line.
///
/// Multiple labels may chain on one line; the remainder (possibly empty) is
/// the statement text. A `:` inside a string literal is not a label
/// separator, so directive text passes through untouched.
pub fn split_labels(mut text: &str) -> (Vec<String>, &str) {
    let mut labels = Vec::new();
    loop {
        let Some(pos) = text.find(':') else { break };
        let candidate = text[..pos].trim();
        if !is_label_like(candidate) {
            break;
        }
        labels.push(candidate.to_string());
        text = text[pos + 1..].trim();
    }
    (labels, text)
}

/// Parses whole source text into cleaned lines.
///
/// This is classification only: mnemonics are uppercased and operands
/// tokenized, but register names, immediates, and label references are
/// validated later, against a profile. Directive operands are literal and
/// are parsed (and can fail) here.
///
/// # Errors
///
/// An [`AsmReport`] carrying every malformed directive found.
pub fn parse_source(source: &str) -> Result<Vec<ParsedLine>, AsmReport> {
    let mut lines = Vec::new();
    let mut report = AsmReport::default();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let cleaned = clean_line(raw_line);
        if cleaned.is_empty() {
            continue;
        }

        let (labels, rest) = split_labels(cleaned);
        let statement = if rest.is_empty() {
            None
        } else if rest.starts_with('.') {
            match parse_directive(rest) {
                Ok(stmt) => Some(stmt),
                Err(kind) => {
                    report.push(line_no, kind);
                    None
                }
            }
        } else {
            let (mnemonic, operand_text) = match rest.split_once(char::is_whitespace) {
                Some((m, rest)) => (m, rest.trim()),
                None => (rest, ""),
            };
            Some(Statement::Instruction(Instruction::new(
                mnemonic.to_ascii_uppercase(),
                split_operands(operand_text),
                line_no,
                rest,
            )))
        };

        if labels.is_empty() && statement.is_none() {
            continue;
        }
        lines.push(ParsedLine {
            labels,
            statement,
            line: line_no,
        });
    }

    if report.is_empty() {
        Ok(lines)
    } else {
        Err(report)
    }
}
