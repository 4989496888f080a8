//! Signing templates that turn a transaction input into an unlocking script.

pub mod p2pkh;

use bsv_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// A signing strategy for one kind of locking script.
///
/// `sign` reads the transaction, computes the digest for the input and
/// returns the unlocking script; it never mutates the transaction.
pub trait UnlockingScriptTemplate {
    /// Produce an unlocking script for the given input.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The index of the input to sign.
    ///
    /// # Returns
    /// The unlocking script, or an error if the input cannot be signed.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError>;

    /// Estimated unlocking script length, used to size fees before signing.
    fn estimate_length(&self, tx: &Transaction, input_index: usize) -> usize;
}
