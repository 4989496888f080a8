//! Pay-to-Public-Key-Hash signing.
//!
//! Unlocking scripts take the form `<DER signature || flag> <compressed pubkey>`.

use bsv_primitives::ec::PrivateKey;
use bsv_script::Script;

use crate::sighash::SIGHASH_ALL_FORKID;
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Typical P2PKH unlocking script length: two push bytes, a DER signature
/// with its flag byte, and a 33-byte key.
pub const ESTIMATED_UNLOCKING_LEN: usize = 106;

/// Create a P2PKH signer.
///
/// # Arguments
/// * `private_key` - The key that owns the spent output.
/// * `sighash_flag` - Flags to sign with; `None` means `SIGHASH_ALL_FORKID`.
pub fn unlock(private_key: PrivateKey, sighash_flag: Option<u32>) -> P2PKH {
    P2PKH {
        private_key,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
    }
}

/// P2PKH signer holding a private key and sighash flag.
#[derive(Clone, Debug)]
pub struct P2PKH {
    private_key: PrivateKey,
    sighash_flag: u32,
}

impl P2PKH {
    /// The flags this signer commits to.
    pub fn sighash_flag(&self) -> u32 {
        self.sighash_flag
    }
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the input with RFC6979 ECDSA over its FORKID sighash.
    ///
    /// # Returns
    /// `<sig||flag> <pubkey>`, or `InputIndexOutOfRange` /
    /// `MissingSourceOutput` if the input cannot be hashed.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        let sig_hash = tx.calc_input_signature_hash(input_index, self.sighash_flag)?;
        let signature = self.private_key.sign(&sig_hash)?;

        let mut sig_buf = signature.to_der();
        sig_buf.push(self.sighash_flag as u8);
        let pub_key = self.private_key.pub_key().to_compressed();

        let mut script = Script::new();
        script.append_push_data(&sig_buf)?;
        script.append_push_data(&pub_key)?;
        Ok(script)
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        ESTIMATED_UNLOCKING_LEN
    }
}
