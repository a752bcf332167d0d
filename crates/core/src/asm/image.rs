//! Machine images and their text formats.
//!
//! A [`MachineImage`] is the sorted, byte-addressed output of pass 2. Two
//! serialization formats exist, mirroring the two hardware flows:
//! 1. **Words:** one fixed-width hex word value per line, ascending from
//!    address zero, `.org` gaps zero-filled (32-bit flow).
//! 2. **Records:** `:ADDR b0 b1 .. bF` rows of sixteen hex bytes aligned to
//!    16-byte boundaries, zero-filled within a row (8-bit flow).
//!
//! Writers are pure formatting over the sorted byte stream — no semantic
//! re-validation — and the same image always yields byte-identical text.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Failure to parse machine-image text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ImageParseError {
    /// A line that is not a valid hex word or record for the format.
    #[error("line {line}: malformed image line '{text}'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line verbatim.
        text: String,
    },
}

/// Serialization format of a machine image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// One hex word value per line.
    Words,
    /// 16-byte `:ADDR ..` records.
    Records,
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "words" => Ok(Self::Words),
            "records" => Ok(Self::Records),
            other => Err(format!("unknown image format '{other}'")),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Words => "words",
            Self::Records => "records",
        })
    }
}

/// Byte-addressed machine code, sorted by address.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MachineImage {
    word_size: u32,
    cells: BTreeMap<u32, u8>,
}

impl MachineImage {
    /// Creates an empty image for the given word size in bytes.
    pub fn new(word_size: u32) -> Self {
        Self {
            word_size,
            cells: BTreeMap::new(),
        }
    }

    /// Word size in bytes the image was produced under.
    pub fn word_size(&self) -> u32 {
        self.word_size
    }

    /// Number of populated bytes.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Writes a run of bytes starting at `addr`.
    pub fn put_bytes(&mut self, addr: u32, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            let _ = self.cells.insert(addr + i as u32, *byte);
        }
    }

    /// Reads the byte at `addr`; unpopulated cells are zero.
    pub fn byte_at(&self, addr: u32) -> u8 {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Reads the little-endian word at `addr` (word size 4).
    pub fn word_at(&self, addr: u32) -> u32 {
        u32::from_le_bytes([
            self.byte_at(addr),
            self.byte_at(addr + 1),
            self.byte_at(addr + 2),
            self.byte_at(addr + 3),
        ])
    }

    /// One past the highest populated address, or zero when empty.
    pub fn end(&self) -> u32 {
        self.cells.keys().next_back().map_or(0, |a| a + 1)
    }

    /// The image's machine words, ascending from address zero with gaps
    /// zero-filled.
    pub fn words(&self) -> Vec<u32> {
        let mut words = Vec::new();
        let mut addr = 0;
        while addr < self.end() {
            words.push(self.word_at(addr));
            addr += 4;
        }
        words
    }

    /// Serializes the image in the given format.
    pub fn render(&self, format: ImageFormat) -> String {
        match format {
            ImageFormat::Words => self.render_words(),
            ImageFormat::Records => self.render_records(),
        }
    }

    /// One 8-hex-digit word value per line.
    fn render_words(&self) -> String {
        let mut out = String::new();
        for word in self.words() {
            out.push_str(&format!("{word:08X}\n"));
        }
        out
    }

    /// `:ADDR b0 .. bF` rows; rows with no populated byte are skipped.
    fn render_records(&self) -> String {
        let mut out = String::new();
        let mut row: Option<u32> = None;
        for &addr in self.cells.keys() {
            let row_base = addr & !0xF;
            if row == Some(row_base) {
                continue;
            }
            row = Some(row_base);
            out.push_str(&format!(":{row_base:04X}"));
            for offset in 0..16 {
                out.push_str(&format!(" {:02X}", self.byte_at(row_base + offset)));
            }
            out.push('\n');
        }
        out
    }

    /// Parses image text in the given format.
    ///
    /// # Errors
    ///
    /// [`ImageParseError`] naming the first malformed line.
    pub fn parse(format: ImageFormat, word_size: u32, text: &str) -> Result<Self, ImageParseError> {
        match format {
            ImageFormat::Words => Self::parse_words(word_size, text),
            ImageFormat::Records => Self::parse_records(word_size, text),
        }
    }

    /// Detects the format of image text: record rows start with `:`.
    pub fn detect_format(text: &str) -> ImageFormat {
        let first = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with(';'));
        match first {
            Some(line) if line.starts_with(':') => ImageFormat::Records,
            _ => ImageFormat::Words,
        }
    }

    fn parse_words(word_size: u32, text: &str) -> Result<Self, ImageParseError> {
        let mut image = Self::new(word_size);
        let mut addr = 0;
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let word = u32::from_str_radix(line, 16).map_err(|_| ImageParseError::MalformedLine {
                line: idx + 1,
                text: line.to_string(),
            })?;
            image.put_bytes(addr, &word.to_le_bytes());
            addr += 4;
        }
        Ok(image)
    }

    fn parse_records(word_size: u32, text: &str) -> Result<Self, ImageParseError> {
        let mut image = Self::new(word_size);
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let malformed = || ImageParseError::MalformedLine {
                line: idx + 1,
                text: line.to_string(),
            };
            let rest = line.strip_prefix(':').ok_or_else(malformed)?;
            let mut fields = rest.split_whitespace();
            let addr_field = fields.next().ok_or_else(malformed)?;
            let base = u32::from_str_radix(addr_field, 16).map_err(|_| malformed())?;
            for (offset, field) in fields.enumerate() {
                let byte = u8::from_str_radix(field, 16).map_err(|_| malformed())?;
                // Rows are zero-filled to sixteen bytes; zero cells stay
                // implicit (unpopulated cells already read as zero).
                if byte != 0 {
                    image.put_bytes(base + offset as u32, &[byte]);
                }
            }
        }
        Ok(image)
    }
}
