//! Encoding tests for edge cases not covered in unit tests

use kmvm_spec::encoding::*;
use kmvm_spec::{Instruction, Opcode, Operand, Program, Register, SpecError};
use proptest::prelude::*;

// ============================================================================
// Opcode Byte Edge Cases
// ============================================================================

#[test]
fn test_every_flag_combination_on_push() {
    for bits in 0u8..8 {
        let mode = Mode::from_bits_truncate(bits << 5);
        let byte = join_opcode_byte(Opcode::Push, mode);
        assert_eq!(split_opcode_byte(byte), Some((Opcode::Push, mode)));
        assert_eq!(byte & OPCODE_MASK, Opcode::Push.to_u8());
    }
}

#[test]
fn test_unknown_opcode_fields() {
    for field in 0x12u8..=0x1F {
        for flags in [0x00, 0x20, 0x40, 0x80, 0xE0] {
            assert_eq!(split_opcode_byte(field | flags), None);
        }
    }
}

#[test]
fn test_flags_rejected_on_jump() {
    let bytes = [join_opcode_byte(Opcode::Jmp, Mode::MEM), 0, 0, 0, 0];
    let err = CodeReader::new(&bytes).read_opcode().unwrap_err();
    assert!(matches!(err, SpecError::UnexpectedFlags { opcode: Opcode::Jmp, .. }));
}

// ============================================================================
// Instruction Shapes
// ============================================================================

#[test]
fn test_immediate_precedes_register() {
    let instr = Instruction::Push(Operand::imm_reg(7, Register::Dx));
    assert_eq!(instr.encoded_len(), 1 + IMM_SIZE + REG_SIZE);
    assert_eq!(instr.mode(), Mode::IMM | Mode::REG);
}

#[test]
fn test_jump_shape_is_fixed() {
    for op in Opcode::ALL.into_iter().filter(|op| op.is_jump()) {
        let instr = Instruction::branch(op, u32::MAX).unwrap();
        assert_eq!(instr.encoded_len(), 1 + TARGET_SIZE);
        assert!(instr.mode().is_empty());
    }
}

#[test]
fn test_program_header_is_checked_before_code() {
    // Bad magic with otherwise garbage code
    let err = Program::from_bytes(&[b'X', b'M', b'v', b'4', 0xFF]).unwrap_err();
    assert!(err.is_format_error());
}

// ============================================================================
// Cursor Properties
// ============================================================================

proptest! {
    #[test]
    fn test_writer_reader_agree(values in proptest::collection::vec(any::<i32>(), 0..32)) {
        let mut writer = CodeWriter::new();
        for v in &values {
            writer.write_i32(*v);
        }
        let bytes = writer.into_bytes();
        let mut reader = CodeReader::new(&bytes);
        for v in &values {
            prop_assert_eq!(reader.read_i32().unwrap(), *v);
        }
        prop_assert!(reader.is_at_end());
    }

    #[test]
    fn test_reader_never_reads_past_end(bytes in proptest::collection::vec(any::<u8>(), 0..8)) {
        let mut reader = CodeReader::new(&bytes);
        while reader.remaining() >= 4 {
            reader.read_u32().unwrap();
        }
        prop_assert!(reader.read_u32().is_err());
    }
}
