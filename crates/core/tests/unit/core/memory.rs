//! Memory access tests: alignment, range, endianness.

use mrisc_core::common::RuntimeError;
use mrisc_core::core::Memory;

#[test]
fn words_are_little_endian() {
    let mut mem = Memory::new(64);
    mem.write_word(0, 0x1234_5678).unwrap();
    assert_eq!(mem.read_word(0).unwrap(), 0x1234_5678);
    // Reading the next word exposes the byte order at the boundary.
    mem.write_word(4, 0xAABB_CCDD).unwrap();
    assert_eq!(mem.read_word(4).unwrap(), 0xAABB_CCDD);
}

#[test]
fn every_unaligned_offset_is_rejected() {
    let mut mem = Memory::new(64);
    for addr in [1u32, 2, 3, 0x2001, 0x2002, 0x2003] {
        assert_eq!(
            mem.read_word(addr).expect_err("read"),
            RuntimeError::UnalignedAccess(addr),
            "read at {addr:#x}"
        );
        assert_eq!(
            mem.write_word(addr, 0).expect_err("write"),
            RuntimeError::UnalignedAccess(addr),
            "write at {addr:#x}"
        );
    }
}

#[test]
fn the_last_aligned_word_is_accessible() {
    let mut mem = Memory::new(64);
    mem.write_word(60, 0xDEAD_BEEF).unwrap();
    assert_eq!(mem.read_word(60).unwrap(), 0xDEAD_BEEF);
}

#[test]
fn access_past_the_buffer_is_rejected() {
    let mut mem = Memory::new(64);
    assert_eq!(
        mem.read_word(64).expect_err("read"),
        RuntimeError::AccessOutOfRange(64)
    );
    assert_eq!(
        mem.write_word(1024, 1).expect_err("write"),
        RuntimeError::AccessOutOfRange(1024)
    );
}

#[test]
fn fresh_memory_reads_zero() {
    let mem = Memory::new(16);
    assert_eq!(mem.read_word(0).unwrap(), 0);
    assert_eq!(mem.read_word(12).unwrap(), 0);
}
