mod common;

use bsv_primitives::util::VarInt;
use bsv_pushtx::script::{
    append_get_locking_script_from_preimage, append_split_push_tx, build_locking_script,
    push_tx_template, PUSH_TX_TEMPLATE_LEN,
};
use bsv_pushtx::Preimage;
use bsv_script::{Address, Script};

use common::Evaluator;

/// A preimage whose scriptCode is `script` and whose fixed fields are filler.
fn preimage_with_script(script: &[u8]) -> Vec<u8> {
    let mut script_code = VarInt::from(script.len()).to_bytes();
    script_code.extend_from_slice(script);
    Preimage {
        version: 1u32.to_le_bytes(),
        hash_prevouts: [0x11; 32],
        hash_sequence: [0x22; 32],
        outpoint: [0x33; 36],
        script_code,
        value: 2000u64.to_le_bytes(),
        sequence: [0xff; 4],
        hash_outputs: [0x44; 32],
        lock_time: [0; 4],
        sighash_type: 0x41u32.to_le_bytes(),
    }
    .to_bytes()
}

fn filler_script(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Push `preimage`, run the extractor and return the final stack.
fn extract(preimage: &[u8]) -> Vec<Vec<u8>> {
    let mut script = Script::new();
    script.append_push_data(preimage).unwrap();
    append_get_locking_script_from_preimage(&mut script).unwrap();
    Evaluator::new(&[0u8; 32]).run(&[&script]).unwrap()
}

// ---------------------------------------------------------------------------
// Varint widths
// ---------------------------------------------------------------------------

/// One-byte lengths, including ones with the high bit set.
#[test]
fn test_extract_single_byte_lengths() {
    for len in [1usize, 75, 127, 128, 194, 252] {
        let script = filler_script(len);
        assert_eq!(extract(&preimage_with_script(&script)), vec![script], "length {}", len);
    }
}

/// 0xfd-prefixed lengths.
#[test]
fn test_extract_two_byte_lengths() {
    for len in [253usize, 255, 256, 0x8000, 0xffff] {
        let script = filler_script(len);
        assert_eq!(extract(&preimage_with_script(&script)), vec![script], "length {}", len);
    }
}

/// 0xfe-prefixed length.
#[test]
fn test_extract_four_byte_length() {
    let script = filler_script(65536);
    assert_eq!(extract(&preimage_with_script(&script)), vec![script]);
}

/// An empty scriptCode extracts to an empty item.
#[test]
fn test_extract_empty_script() {
    assert_eq!(extract(&preimage_with_script(&[])), vec![Vec::<u8>::new()]);
}

// ---------------------------------------------------------------------------
// Template splitting
// ---------------------------------------------------------------------------

/// Extracting a push-tx locking script and splitting it leaves the
/// template on top.
#[test]
fn test_extract_then_split() {
    let address = Address::from_string("mtdruWYVEV1wz5yL7GvpBj4MgifCB7yhPd").unwrap();
    let locking = build_locking_script(&address).unwrap();

    let mut script = Script::new();
    script.append_push_data(&preimage_with_script(locking.to_bytes())).unwrap();
    append_get_locking_script_from_preimage(&mut script).unwrap();
    append_split_push_tx(&mut script).unwrap();

    let stack = Evaluator::new(&[0u8; 32]).run(&[&script]).unwrap();
    assert_eq!(stack.len(), 2);
    assert_eq!(stack[0], locking.to_bytes()[PUSH_TX_TEMPLATE_LEN..].to_vec());
    assert_eq!(stack[1], push_tx_template().unwrap().to_bytes().to_vec());
}

// ---------------------------------------------------------------------------
// Number encoding
// ---------------------------------------------------------------------------

/// Numeric operands with a redundant sign byte are refused, so the length
/// markers 0x00 and 0x80 only pass because they are compared as bytes.
#[test]
fn test_non_minimal_numbers_rejected() {
    for bytes in [[0x00u8], [0x80]] {
        let mut script = Script::new();
        script.append_push_data(&bytes).unwrap();
        script.append_opcodes(&[bsv_script::opcodes::OP_1ADD]).unwrap();
        assert!(Evaluator::new(&[0u8; 32]).run(&[&script]).is_err(), "{:02x?}", bytes);
    }

    for len in [0usize, 128] {
        let script = filler_script(len);
        assert_eq!(extract(&preimage_with_script(&script)), vec![script], "length {}", len);
    }
}
