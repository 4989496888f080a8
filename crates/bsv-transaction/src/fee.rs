//! Size-based fee estimation.
//!
//! Fees are charged per kilobyte of serialized transaction, rounded up to
//! the next satoshi. Unsigned inputs are sized with an estimated unlocking
//! script length supplied by the caller.

use bsv_primitives::util::VarInt;

use crate::input::TransactionInput;
use crate::transaction::Transaction;

/// Serialized size of a P2PKH output: value, varint and 25-byte script.
pub const P2PKH_OUTPUT_LEN: usize = 8 + 1 + 25;

/// Fee for a transaction of `size` bytes at `sat_per_kb`.
///
/// # Arguments
/// * `size` - Serialized size in bytes.
/// * `sat_per_kb` - Rate in satoshis per 1000 bytes.
///
/// # Returns
/// The fee, rounded up. Saturates instead of overflowing.
pub fn fee_for_size(size: usize, sat_per_kb: u64) -> u64 {
    (size as u64).saturating_mul(sat_per_kb).div_ceil(1000)
}

/// Estimate the signed size of `tx`.
///
/// Inputs that already carry an unlocking script are sized as-is; unsigned
/// inputs use `estimate_unlocking_len(index)`.
///
/// # Arguments
/// * `tx` - The transaction, possibly partially signed.
/// * `estimate_unlocking_len` - Estimated unlocking script length per input.
///
/// # Returns
/// The estimated serialized size in bytes.
pub fn estimate_size<F>(tx: &Transaction, estimate_unlocking_len: F) -> usize
where
    F: Fn(usize) -> usize,
{
    let inputs: usize = tx
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let script_len = match &input.unlocking_script {
                Some(script) => script.len(),
                None => estimate_unlocking_len(i),
            };
            TransactionInput::serialized_len_with_script(script_len)
        })
        .sum();
    let outputs: usize = tx.outputs.iter().map(|o| o.serialized_len()).sum();

    4 + VarInt::from(tx.inputs.len()).length()
        + inputs
        + VarInt::from(tx.outputs.len()).length()
        + outputs
        + 4
}
