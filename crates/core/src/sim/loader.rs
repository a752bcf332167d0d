//! Program loader.
//!
//! Builds a runnable [`Program`] from either assembly source text or a
//! previously assembled machine image. It performs:
//! 1. **Text path:** a label pass over cleaned source lines, mapping labels
//!    to instruction indexes; directives emit no instructions and are
//!    skipped at run time.
//! 2. **Image path:** format detection (`words` vs `records`), word decode
//!    under the profile, and index-based target reconstruction.
//! 3. **File dispatch:** `.hex` extensions take the image path, everything
//!    else is treated as source text.

use std::collections::HashMap;
use std::path::Path;
use std::{fs, io};

use thiserror::Error;
use tracing::debug;

use crate::asm::image::{ImageParseError, MachineImage};
use crate::asm::parser::{parse_source, Statement};
use crate::common::{AsmErrorKind, AsmReport, ProfileError};
use crate::core::Program;
use crate::isa::{decode, Profile};

/// Failure to produce a runnable program.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The program file could not be read.
    #[error("cannot read '{path}': {source}")]
    Io {
        /// The path that failed.
        path: String,
        /// The underlying I/O failure.
        source: io::Error,
    },
    /// The source text failed to parse or decode.
    #[error(transparent)]
    Asm(#[from] AsmReport),
    /// The image text was malformed.
    #[error(transparent)]
    Image(#[from] ImageParseError),
    /// The profile cannot decode machine images.
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Builds a program from assembly source text.
///
/// Labels resolve to instruction indexes; directives are captured by the
/// front-end but emit nothing executable.
///
/// # Errors
///
/// An [`AsmReport`] for malformed directives.
pub fn program_from_source(source: &str) -> Result<Program, LoaderError> {
    let lines = parse_source(source)?;
    let mut instructions = Vec::new();
    let mut labels = HashMap::new();
    let mut report = AsmReport::default();

    for parsed in &lines {
        for label in &parsed.labels {
            if labels.insert(label.clone(), instructions.len()).is_some() {
                report.push(parsed.line, AsmErrorKind::DuplicateLabel(label.clone()));
            }
        }
        if let Some(Statement::Instruction(inst)) = &parsed.statement {
            instructions.push(inst.clone());
        }
    }
    if !report.is_empty() {
        return Err(report.into());
    }

    debug!(
        instructions = instructions.len(),
        labels = labels.len(),
        "program loaded from source"
    );
    Ok(Program {
        instructions,
        labels,
    })
}

/// Builds a program by decoding a machine image.
///
/// # Errors
///
/// [`ProfileError::DecodeUnsupported`] for encode-only profiles, or an
/// [`AsmReport`] naming every undecodable word.
pub fn program_from_image(profile: &Profile, image: &MachineImage) -> Result<Program, LoaderError> {
    if !profile.supports_decode {
        return Err(ProfileError::DecodeUnsupported {
            profile: profile.name.to_string(),
        }
        .into());
    }

    let mut instructions = Vec::new();
    let mut report = AsmReport::default();
    for (index, word) in image.words().into_iter().enumerate() {
        match decode::decode_word(profile, word, index) {
            Ok(inst) => instructions.push(inst),
            Err(kind) => report.push(index as u32, kind),
        }
    }
    if !report.is_empty() {
        return Err(report.into());
    }

    debug!(instructions = instructions.len(), "program decoded from image");
    Ok(Program {
        instructions,
        labels: HashMap::new(),
    })
}

/// Loads a program from a file, dispatching on its extension: `.hex` is a
/// machine image, anything else is assembly source.
///
/// # Errors
///
/// [`LoaderError`] for unreadable files, malformed text, or an encode-only
/// profile asked to decode.
pub fn load_program(profile: &Profile, path: &Path) -> Result<Program, LoaderError> {
    let text = fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let is_image = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hex"));
    if is_image {
        let format = MachineImage::detect_format(&text);
        let image = MachineImage::parse(format, profile.word_size, &text)?;
        program_from_image(profile, &image)
    } else {
        program_from_source(&text)
    }
}
