//! Arithmetic status flags.
//!
//! The carry/zero/negative/overflow flag set recomputed by every arithmetic
//! and logic instruction and left untouched by data movement. The pure
//! helpers here are the single source of truth for flag arithmetic; the
//! engine and the property tests both go through them.

/// Sign bit of a 32-bit machine word.
pub const SIGN_BIT: u32 = 0x8000_0000;

/// The C/Z/N/V status flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags {
    /// Unsigned overflow: for addition `a + b > MAX`; for subtraction
    /// `a >= b` (no borrow).
    pub carry: bool,
    /// The truncated result is zero.
    pub zero: bool,
    /// Bit 31 of the truncated result is set.
    pub negative: bool,
    /// Signed overflow occurred.
    pub overflow: bool,
}

impl Flags {
    /// Recomputes all four flags after an arithmetic operation.
    pub fn set_arithmetic(&mut self, result: u32, carry: bool, overflow: bool) {
        self.carry = carry;
        self.overflow = overflow;
        self.zero = result == 0;
        self.negative = result & SIGN_BIT != 0;
    }

    /// Recomputes the flags after a logic operation: carry and overflow are
    /// forced false, zero and negative follow the result.
    pub fn set_logic(&mut self, result: u32) {
        self.carry = false;
        self.overflow = false;
        self.zero = result == 0;
        self.negative = result & SIGN_BIT != 0;
    }
}

/// Full-width addition: returns the truncated sum plus carry and signed
/// overflow.
pub fn add_with_flags(a: u32, b: u32) -> (u32, bool, bool) {
    let full = u64::from(a) + u64::from(b);
    let result = full as u32;
    let carry = full > u64::from(u32::MAX);
    let overflow = (a ^ result) & (b ^ result) & SIGN_BIT != 0;
    (result, carry, overflow)
}

/// Full-width subtraction: returns the truncated difference plus carry
/// ("no borrow": `a >= b`) and signed overflow.
pub fn sub_with_flags(a: u32, b: u32) -> (u32, bool, bool) {
    let result = a.wrapping_sub(b);
    let carry = a >= b;
    let overflow = (a ^ b) & (a ^ result) & SIGN_BIT != 0;
    (result, carry, overflow)
}
