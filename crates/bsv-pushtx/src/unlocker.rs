//! Unlocking script assembly and per-input signer dispatch.
//!
//! Push-tx unlocking scripts take the form
//! `<sig||flag> <pubkey> <preimage>`: the preimage sits on top for the
//! self-verification sequence, and the signature and key stay underneath for
//! the P2PKH check that follows it.

use bsv_primitives::ec::{PrivateKey, PublicKey, Signature};
use bsv_primitives::hash::sha256d;
use bsv_primitives::util::VarInt;
use bsv_script::chunk::push_data_prefix;
use bsv_script::Script;
use bsv_transaction::template::{p2pkh, UnlockingScriptTemplate};
use bsv_transaction::Transaction;

use crate::config::PushTxConfig;
use crate::malleate::check_for_low_s_with_limit;
use crate::preimage::{SCRIPT_CODE_OFFSET, TAIL_LEN};
use crate::script::is_push_tx;
use crate::PushTxError;

/// Upper bound for a DER signature plus its flag byte, with the push prefix.
const MAX_SIG_PUSH_LEN: usize = 1 + 72 + 1;

/// A compressed public key with its push prefix.
const PUB_KEY_PUSH_LEN: usize = 1 + 33;

/// Assemble a push-tx unlocking script.
///
/// # Arguments
/// * `pub_key` - The spender's public key, pushed compressed.
/// * `preimage` - The low-S preimage, pushed last.
/// * `signature` - Signature over the preimage digest.
/// * `sighash_flag` - Flag byte appended to the DER signature.
///
/// # Returns
/// `<sig||flag> <pubkey> <preimage>`, `InvalidConfig` if the flag does not
/// fit in one byte, or `ScriptBuildFailure` if a push does not fit.
pub fn build_unlocking_script(
    pub_key: &PublicKey,
    preimage: &[u8],
    signature: &Signature,
    sighash_flag: u32,
) -> Result<Script, PushTxError> {
    let mut sig_buf = signature.to_der();
    let flag_byte = u8::try_from(sighash_flag).map_err(|_| {
        PushTxError::InvalidConfig(format!("sighash_flag {:#x} does not fit in one byte", sighash_flag))
    })?;
    sig_buf.push(flag_byte);
    let pub_key = pub_key.to_compressed();

    let mut script = Script::new();
    script.append_push_data_array(&[&sig_buf, &pub_key])?;
    script.append_push_data(preimage)?;
    Ok(script)
}

/// The bytes handed to the signer for a given preimage.
///
/// `0x01` followed by 31 zero bytes is what some signers hand over when the
/// value should be signed as given, so it is not hashed again.
fn signing_digest(preimage: &[u8]) -> Vec<u8> {
    if is_sign_as_is_marker(preimage) {
        return preimage.to_vec();
    }
    sha256d(preimage).to_vec()
}

fn is_sign_as_is_marker(preimage: &[u8]) -> bool {
    preimage.len() == 32 && preimage[0] == 1 && preimage[1..].iter().all(|&b| b == 0)
}

// ---------------------------------------------------------------------------
// Unlocker
// ---------------------------------------------------------------------------

/// A signer for one kind of locking script.
///
/// Unlike `UnlockingScriptTemplate`, an unlocker may change the transaction
/// it signs: the push-tx unlocker commits a lock time.
pub trait Unlocker {
    /// Produce the unlocking script for one input.
    ///
    /// # Arguments
    /// * `tx` - The transaction being signed.
    /// * `input_index` - The input to sign.
    /// * `sighash_flag` - Flags to sign with; `None` picks the unlocker's default.
    fn unlocking_script(
        &self,
        tx: &mut Transaction,
        input_index: usize,
        sighash_flag: Option<u32>,
    ) -> Result<Script, PushTxError>;

    /// Estimated unlocking script length before signing.
    fn estimate_length(&self, tx: &Transaction, input_index: usize) -> usize;

    /// Whether signing may change the transaction's lock time.
    fn moves_lock_time(&self) -> bool {
        false
    }
}

/// Plain P2PKH signer.
#[derive(Clone, Debug)]
pub struct P2pkhUnlocker {
    private_key: PrivateKey,
}

impl P2pkhUnlocker {
    /// Wrap a signing key.
    pub fn new(private_key: PrivateKey) -> Self {
        Self { private_key }
    }
}

impl Unlocker for P2pkhUnlocker {
    fn unlocking_script(
        &self,
        tx: &mut Transaction,
        input_index: usize,
        sighash_flag: Option<u32>,
    ) -> Result<Script, PushTxError> {
        let template = p2pkh::unlock(self.private_key.clone(), sighash_flag);
        Ok(template.sign(tx, input_index)?)
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        p2pkh::ESTIMATED_UNLOCKING_LEN
    }
}

/// Signer for outputs locked by the push-tx template.
#[derive(Clone, Debug)]
pub struct PushTxUnlocker {
    private_key: PrivateKey,
    config: PushTxConfig,
}

impl PushTxUnlocker {
    /// A signer using `config` for the flag and the search cap.
    ///
    /// The config is checked when signing, not here.
    pub fn new(private_key: PrivateKey, config: PushTxConfig) -> Self {
        Self { private_key, config }
    }
}

impl Unlocker for PushTxUnlocker {
    /// Malleate the lock time until the input's preimage is low-S, commit it
    /// to `tx`, and sign.
    ///
    /// # Returns
    /// `<sig||flag> <pubkey> <preimage>`, or the first error from preimage
    /// calculation, the low-S search, signing or script assembly.
    fn unlocking_script(
        &self,
        tx: &mut Transaction,
        input_index: usize,
        sighash_flag: Option<u32>,
    ) -> Result<Script, PushTxError> {
        self.config.validate()?;
        let sighash_flag = sighash_flag.unwrap_or(self.config.sighash_flag);
        let preimage = tx.calc_input_preimage(input_index, sighash_flag)?;

        let low_s = check_for_low_s_with_limit(&preimage, self.config.max_malleation_attempts)?;
        tx.lock_time = low_s.lock_time();
        tracing::debug!(
            "input {} committed lock time {} after {} malleation steps",
            input_index,
            low_s.lock_time(),
            low_s.counter
        );

        let signature = self.private_key.sign(&signing_digest(&low_s.preimage))?;
        build_unlocking_script(&self.private_key.pub_key(), &low_s.preimage, &signature, sighash_flag)
    }

    fn estimate_length(&self, tx: &Transaction, input_index: usize) -> usize {
        let script_len = tx
            .inputs
            .get(input_index)
            .and_then(|input| input.source_locking_script())
            .map_or(0, |script| script.len());
        let preimage_len =
            SCRIPT_CODE_OFFSET + VarInt::from(script_len).length() + script_len + TAIL_LEN;
        let preimage_push_len = push_data_prefix(preimage_len).map_or(5, |p| p.len()) + preimage_len;
        MAX_SIG_PUSH_LEN + PUB_KEY_PUSH_LEN + preimage_push_len
    }

    fn moves_lock_time(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Picks an unlocker for a spent locking script.
pub trait UnlockerGetter {
    /// # Returns
    /// The unlocker, or `UnsupportedLockingScript`.
    fn unlocker(&self, locking_script: &Script) -> Result<Box<dyn Unlocker>, PushTxError>;
}

/// Unlocker selection for a single signing key.
#[derive(Clone, Debug)]
pub struct Getter {
    /// Key every selected unlocker signs with.
    pub private_key: PrivateKey,
    /// Settings handed to push-tx unlockers.
    pub config: PushTxConfig,
}

impl Getter {
    /// A getter with the default configuration.
    pub fn new(private_key: PrivateKey) -> Self {
        Self { private_key, config: PushTxConfig::default() }
    }

    /// A getter with an explicit configuration.
    pub fn with_config(private_key: PrivateKey, config: PushTxConfig) -> Self {
        Self { private_key, config }
    }
}

impl UnlockerGetter for Getter {
    fn unlocker(&self, locking_script: &Script) -> Result<Box<dyn Unlocker>, PushTxError> {
        if locking_script.is_p2pkh() {
            tracing::debug!("dispatching P2PKH unlocker");
            return Ok(Box::new(P2pkhUnlocker::new(self.private_key.clone())));
        }
        if self.config.permissive_template_detection || is_push_tx(locking_script) {
            self.config.validate()?;
            tracing::debug!("dispatching push-tx unlocker");
            return Ok(Box::new(PushTxUnlocker::new(self.private_key.clone(), self.config.clone())));
        }
        Err(PushTxError::UnsupportedLockingScript(format!(
            "locking script is neither P2PKH nor push-tx: {}",
            locking_script
        )))
    }
}

/// Select an unlocker for `locking_script` with the default configuration.
///
/// # Arguments
/// * `locking_script` - The spent output's locking script.
/// * `private_key` - The key the unlocker signs with.
///
/// # Returns
/// A P2PKH unlocker for P2PKH scripts, a push-tx unlocker for scripts that
/// start with the template, otherwise `UnsupportedLockingScript`.
pub fn select_unlocker(
    locking_script: &Script,
    private_key: &PrivateKey,
) -> Result<Box<dyn Unlocker>, PushTxError> {
    Getter::new(private_key.clone()).unlocker(locking_script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::build_locking_script;
    use bsv_script::{Address, Network};

    const TEST_WIF: &str = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";

    fn test_key() -> PrivateKey {
        PrivateKey::from_wif(TEST_WIF).unwrap()
    }

    // -----------------------------------------------------------------------
    // build_unlocking_script
    // -----------------------------------------------------------------------

    /// Pushes come out as sig||flag, pubkey, preimage.
    #[test]
    fn test_build_unlocking_script_layout() {
        let key = test_key();
        let preimage = vec![0xab; 200];
        let signature = key.sign(&sha256d(&preimage)).unwrap();
        let script = build_unlocking_script(&key.pub_key(), &preimage, &signature, 0x41).unwrap();

        let chunks = script.chunks().unwrap();
        assert_eq!(chunks.len(), 3);

        let mut sig_buf = signature.to_der();
        sig_buf.push(0x41);
        assert_eq!(chunks[0].data.as_deref(), Some(sig_buf.as_slice()));
        assert_eq!(chunks[1].data.as_deref(), Some(key.pub_key().to_compressed().as_slice()));
        assert_eq!(chunks[2].data.as_deref(), Some(preimage.as_slice()));
    }

    /// The flag byte is the low byte of the flag.
    #[test]
    fn test_build_unlocking_script_flag_byte() {
        let key = test_key();
        let signature = key.sign(&[7u8; 32]).unwrap();
        let script = build_unlocking_script(&key.pub_key(), &[1, 2, 3], &signature, 0xc1).unwrap();
        let chunks = script.chunks().unwrap();
        assert_eq!(chunks[0].data.as_ref().and_then(|d| d.last()), Some(&0xc1));
    }

    /// A flag wider than one byte is refused instead of truncated.
    #[test]
    fn test_build_unlocking_script_wide_flag() {
        let key = test_key();
        let signature = key.sign(&[7u8; 32]).unwrap();
        let result = build_unlocking_script(&key.pub_key(), &[1, 2, 3], &signature, 0x141);
        assert!(matches!(result, Err(PushTxError::InvalidConfig(_))));
    }

    // -----------------------------------------------------------------------
    // signing_digest
    // -----------------------------------------------------------------------

    /// The marker preimage is signed as-is; anything else is hashed.
    #[test]
    fn test_signing_digest() {
        let mut marker = vec![0u8; 32];
        marker[0] = 1;
        assert_eq!(signing_digest(&marker), marker);

        let other = vec![2u8; 32];
        assert_eq!(signing_digest(&other), sha256d(&other).to_vec());
        assert_eq!(signing_digest(&[1]), sha256d(&[1]).to_vec());
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// P2PKH and template scripts select their unlockers.
    #[test]
    fn test_select_unlocker() {
        let key = test_key();
        let address = Address::from_public_key(&key.pub_key(), Network::Testnet);

        let p2pkh = select_unlocker(&address.to_locking_script(), &key).unwrap();
        assert!(!p2pkh.moves_lock_time());

        let push_tx = select_unlocker(&build_locking_script(&address).unwrap(), &key).unwrap();
        assert!(push_tx.moves_lock_time());
    }

    /// Other scripts are rejected unless detection is permissive.
    #[test]
    fn test_select_unlocker_unsupported() {
        let key = test_key();
        let script = Script::from_hex("006a0568656c6c6f").unwrap();
        assert!(matches!(
            select_unlocker(&script, &key),
            Err(PushTxError::UnsupportedLockingScript(_))
        ));

        let config = PushTxConfig { permissive_template_detection: true, ..Default::default() };
        let getter = Getter::with_config(key, config);
        assert!(getter.unlocker(&script).unwrap().moves_lock_time());
    }

    /// An out-of-range config is refused before anything is signed.
    #[test]
    fn test_invalid_config_rejected() {
        let key = test_key();
        let address = Address::from_public_key(&key.pub_key(), Network::Testnet);
        let locking = build_locking_script(&address).unwrap();
        let config = PushTxConfig { sighash_flag: 0x141, ..Default::default() };

        let getter = Getter::with_config(key.clone(), config.clone());
        assert!(matches!(getter.unlocker(&locking), Err(PushTxError::InvalidConfig(_))));

        let mut tx = Transaction::new();
        tx.add_input_from(&"11".repeat(32), 0, locking, 5000).unwrap();
        tx.add_output(bsv_transaction::TransactionOutput::new(4000, address.to_locking_script()));
        let lock_time = tx.lock_time;

        let result = PushTxUnlocker::new(key, config).unlocking_script(&mut tx, 0, None);
        assert!(matches!(result, Err(PushTxError::InvalidConfig(_))));
        assert_eq!(tx.lock_time, lock_time);
        assert!(tx.inputs[0].unlocking_script.is_none());
    }

    /// Estimates cover the real push-tx unlocking script.
    #[test]
    fn test_push_tx_estimate_length() {
        let key = test_key();
        let address = Address::from_public_key(&key.pub_key(), Network::Testnet);
        let locking = build_locking_script(&address).unwrap();

        let mut tx = Transaction::new();
        tx.add_input_from(&"11".repeat(32), 0, locking, 5000).unwrap();
        tx.add_output(bsv_transaction::TransactionOutput::new(4000, address.to_locking_script()));

        let unlocker = PushTxUnlocker::new(key, PushTxConfig::default());
        let estimate = unlocker.estimate_length(&tx, 0);
        let script = unlocker.unlocking_script(&mut tx, 0, None).unwrap();
        assert!(script.len() <= estimate);
        assert!(estimate - script.len() < 8);
    }
}
