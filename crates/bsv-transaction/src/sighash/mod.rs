//! FORKID signature preimages.
//!
//! BSV signs a BIP-143 style digest that commits to the spent value and
//! locking script. The preimage is built here; its double SHA-256 is the
//! message an input signature covers.
//!
//! See <https://github.com/bitcoin-sv/bitcoin-sv/blob/master/doc/abc/replay-protected-sighash.md#digest-algorithm>

use bsv_primitives::hash::sha256d;
use bsv_primitives::util::{BsvWriter, VarInt};

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign only the output at the signed input's index.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Sign only the current input.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protection bit required on every BSV signature.
pub const SIGHASH_FORKID: u32 = 0x40;

/// ALL | FORKID, the default for every signer in this workspace.
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

/// Mask selecting the base type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Build the preimage for one input.
///
/// Layout:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32) - zero under ANYONECANPAY
/// 3. hashSequence (32) - zero under ANYONECANPAY, SINGLE or NONE
/// 4. outpoint (36)
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE)
/// 7. nSequence (4 bytes LE)
/// 8. hashOutputs (32) - all outputs, the matching one for SINGLE, or zero
/// 9. nLocktime (4 bytes LE)
/// 10. sighash type (4 bytes LE)
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - Locking script of the spent output.
/// * `sighash_type` - Combined sighash flags.
/// * `satoshis` - Value of the spent output.
///
/// # Returns
/// The raw preimage bytes, or `InputIndexOutOfRange`.
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.inputs.get(input_index).ok_or(TransactionError::InputIndexOutOfRange {
        index: input_index,
        count: tx.inputs.len(),
    })?;

    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;
    let base_type = sighash_type & SIGHASH_MASK;

    let hash_prevouts = if anyone_can_pay { [0u8; 32] } else { prevouts_hash(tx) };

    let hash_sequence = match base_type {
        _ if anyone_can_pay => [0u8; 32],
        SIGHASH_SINGLE | SIGHASH_NONE => [0u8; 32],
        _ => sequence_hash(tx),
    };

    let hash_outputs = match base_type {
        SIGHASH_NONE => [0u8; 32],
        SIGHASH_SINGLE => match tx.outputs.get(input_index) {
            Some(output) => sha256d(&output.to_bytes()),
            None => [0u8; 32],
        },
        _ => outputs_hash(tx),
    };

    let mut writer = BsvWriter::with_capacity(156 + script_code.len() + 9);
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.source_txid);
    writer.write_u32_le(input.source_tx_out_index);
    writer.write_varint(VarInt::from(script_code.len()));
    writer.write_bytes(script_code);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);

    Ok(writer.into_bytes())
}

/// Double SHA-256 of the preimage: the digest an input signature signs.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    satoshis: u64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_preimage(tx, input_index, script_code, sighash_type, satoshis)?;
    Ok(sha256d(&preimage))
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_tx_out_index);
    }
    sha256d(writer.as_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

fn outputs_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::new();
    for output in &tx.outputs {
        output.write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}
