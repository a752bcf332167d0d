//! Flag arithmetic properties.
//!
//! The C/Z/N/V predicates are checked against independent oracles over
//! random 32-bit operand pairs: wide-integer arithmetic decides what carry
//! and signed overflow *should* be, without reusing the implementation's
//! own bit formulas.

use proptest::prelude::*;

use mrisc_core::core::arch::flags::{add_with_flags, sub_with_flags, Flags, SIGN_BIT};

proptest! {
    #[test]
    fn add_carry_matches_unsigned_overflow(a: u32, b: u32) {
        let (_, carry, _) = add_with_flags(a, b);
        prop_assert_eq!(carry, u64::from(a) + u64::from(b) > 0xFFFF_FFFF);
    }

    #[test]
    fn add_overflow_matches_signed_overflow(a: u32, b: u32) {
        let (result, _, overflow) = add_with_flags(a, b);
        let wide = i64::from(a as i32) + i64::from(b as i32);
        prop_assert_eq!(overflow, wide != i64::from(result as i32));
    }

    #[test]
    fn add_result_is_truncated_sum(a: u32, b: u32) {
        let (result, _, _) = add_with_flags(a, b);
        prop_assert_eq!(result, a.wrapping_add(b));
    }

    #[test]
    fn sub_carry_means_no_borrow(a: u32, b: u32) {
        let (_, carry, _) = sub_with_flags(a, b);
        prop_assert_eq!(carry, a >= b);
    }

    #[test]
    fn sub_overflow_matches_signed_overflow(a: u32, b: u32) {
        let (result, _, overflow) = sub_with_flags(a, b);
        let wide = i64::from(a as i32) - i64::from(b as i32);
        prop_assert_eq!(overflow, wide != i64::from(result as i32));
    }

    #[test]
    fn zero_and_negative_follow_the_result(a: u32, b: u32) {
        let (result, carry, overflow) = add_with_flags(a, b);
        let mut flags = Flags::default();
        flags.set_arithmetic(result, carry, overflow);
        prop_assert_eq!(flags.zero, result == 0);
        prop_assert_eq!(flags.negative, result & SIGN_BIT != 0);
    }

    #[test]
    fn logic_flags_force_carry_and_overflow_false(r: u32) {
        let mut flags = Flags {
            carry: true,
            overflow: true,
            ..Flags::default()
        };
        flags.set_logic(r);
        prop_assert!(!flags.carry);
        prop_assert!(!flags.overflow);
        prop_assert_eq!(flags.zero, r == 0);
        prop_assert_eq!(flags.negative, r & SIGN_BIT != 0);
    }
}

// ──────────────────────────────────────────────────────────
// Anchor cases
// ──────────────────────────────────────────────────────────

#[test]
fn add_wraps_with_carry_at_the_top() {
    assert_eq!(add_with_flags(u32::MAX, 1), (0, true, false));
}

#[test]
fn add_signed_overflow_without_carry() {
    // 0x7FFFFFFF + 1: positive + positive -> negative.
    let (result, carry, overflow) = add_with_flags(0x7FFF_FFFF, 1);
    assert_eq!(result, 0x8000_0000);
    assert!(!carry);
    assert!(overflow);
}

#[test]
fn sub_borrow_clears_carry() {
    let (result, carry, overflow) = sub_with_flags(0, 1);
    assert_eq!(result, u32::MAX);
    assert!(!carry, "borrow means carry clear");
    assert!(!overflow);
}

#[test]
fn sub_equal_operands_set_zero_and_carry() {
    let (result, carry, _) = sub_with_flags(7, 7);
    assert_eq!(result, 0);
    assert!(carry);
}

#[test]
fn sub_signed_overflow_case() {
    // i32::MIN - 1: negative - positive -> positive.
    let (result, _, overflow) = sub_with_flags(0x8000_0000, 1);
    assert_eq!(result, 0x7FFF_FFFF);
    assert!(overflow);
}
