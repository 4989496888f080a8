//! Whole-transaction signing and push-tx transaction construction.

use serde::{Deserialize, Serialize};

use bsv_primitives::ec::PrivateKey;
use bsv_script::{Address, Script};
use bsv_transaction::fee::{estimate_size, fee_for_size, P2PKH_OUTPUT_LEN};
use bsv_transaction::template::p2pkh::ESTIMATED_UNLOCKING_LEN;
use bsv_transaction::{Transaction, TransactionError, TransactionOutput};

use crate::config::PushTxConfig;
use crate::script::build_locking_script;
use crate::unlocker::{Getter, Unlocker, UnlockerGetter};
use crate::PushTxError;

/// An unspent output to fund a transaction from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutput {
    /// Index of the output in its transaction.
    pub vout: u32,
    /// The output's locking script.
    pub locking_script: Script,
    /// The output's value.
    pub satoshis: u64,
}

/// A push-tx output paying `satoshis` to `address`.
pub fn push_tx_output(address: &Address, satoshis: u64) -> Result<TransactionOutput, PushTxError> {
    Ok(TransactionOutput::new(satoshis, build_locking_script(address)?))
}

/// Append a push-tx output to `tx`.
///
/// # Arguments
/// * `tx` - The transaction to extend.
/// * `address` - Owner of the new output.
/// * `satoshis` - Value of the new output.
pub fn add_push_tx_output(
    tx: &mut Transaction,
    address: &Address,
    satoshis: u64,
) -> Result<(), PushTxError> {
    tx.add_output(push_tx_output(address, satoshis)?);
    Ok(())
}

/// Sign every input of `tx` with the unlockers `getter` picks.
///
/// Inputs whose unlocker may move the lock time are signed first, in
/// index order, so the remaining signatures commit to the final lock time.
/// Once one of them has committed a lock time, a later one that needs a
/// different value fails with `LockTimeConflict`.
///
/// If a lock-time moving input fails, `tx.lock_time` is put back to the
/// last committed value (or the original one), so the unlocking scripts
/// already set stay valid for it.
///
/// # Arguments
/// * `tx` - The transaction; every input needs its source output set.
/// * `getter` - Picks an unlocker per spent locking script.
///
/// # Returns
/// `Ok(())`, or the first selection or signing error.
pub fn fill_all_inputs<G>(tx: &mut Transaction, getter: &G) -> Result<(), PushTxError>
where
    G: UnlockerGetter + ?Sized,
{
    let mut unlockers: Vec<(usize, Box<dyn Unlocker>)> = Vec::with_capacity(tx.inputs.len());
    for (i, input) in tx.inputs.iter().enumerate() {
        let locking_script = input
            .source_locking_script()
            .ok_or(TransactionError::MissingSourceOutput(i))?;
        unlockers.push((i, getter.unlocker(locking_script)?));
    }

    let (lock_time_movers, others): (Vec<_>, Vec<_>) =
        unlockers.into_iter().partition(|(_, unlocker)| unlocker.moves_lock_time());

    let original = tx.lock_time;
    let mut committed: Option<u32> = None;
    for (i, unlocker) in lock_time_movers {
        let script = match unlocker.unlocking_script(tx, i, None) {
            Ok(script) => script,
            Err(e) => {
                tx.lock_time = committed.unwrap_or(original);
                return Err(e);
            }
        };
        if let Some(expected) = committed {
            if tx.lock_time != expected {
                tracing::warn!(
                    "input {} moved lock time from {} to {}",
                    i,
                    expected,
                    tx.lock_time
                );
                let found = tx.lock_time;
                tx.lock_time = expected;
                return Err(PushTxError::LockTimeConflict { input_index: i, expected, found });
            }
        }
        committed = Some(tx.lock_time);
        tx.inputs[i].unlocking_script = Some(script);
    }

    for (i, unlocker) in others {
        let script = unlocker.unlocking_script(tx, i, None)?;
        tx.inputs[i].unlocking_script = Some(script);
    }

    Ok(())
}

/// Build and sign a transaction that creates a push-tx output.
///
/// Uses the default configuration; see
/// `build_self_verifying_transaction_with_config`.
pub fn build_self_verifying_transaction(
    input: &SourceOutput,
    previous_tx_id: &str,
    destination: &Address,
    change: &Address,
    private_key: &PrivateKey,
    satoshis: u64,
) -> Result<String, PushTxError> {
    build_self_verifying_transaction_with_config(
        input,
        previous_tx_id,
        destination,
        change,
        private_key,
        satoshis,
        &PushTxConfig::default(),
    )
}

/// Build and sign a transaction that creates a push-tx output.
///
/// The transaction spends `input` and pays `satoshis` into a push-tx output
/// owned by `destination` at index 0. Change goes to `change` as P2PKH:
/// a P2PKH source pays a size-based fee at `fee_rate_sat_per_kb`, any other
/// source pays `flat_fee`. Change of zero is left out.
///
/// # Arguments
/// * `input` - The output being spent.
/// * `previous_tx_id` - Display-order hex txid of the transaction holding `input`.
/// * `destination` - Owner of the push-tx output.
/// * `change` - Receives the change.
/// * `private_key` - Signs the input.
/// * `satoshis` - Value of the push-tx output.
/// * `config` - Fees, flags and search limits.
///
/// # Returns
/// The signed transaction as hex, or `InsufficientFunds` if `input` cannot
/// cover the output and fee.
pub fn build_self_verifying_transaction_with_config(
    input: &SourceOutput,
    previous_tx_id: &str,
    destination: &Address,
    change: &Address,
    private_key: &PrivateKey,
    satoshis: u64,
    config: &PushTxConfig,
) -> Result<String, PushTxError> {
    config.validate()?;

    let mut tx = Transaction::new();
    tx.add_input_from(previous_tx_id, input.vout, input.locking_script.clone(), input.satoshis)?;
    add_push_tx_output(&mut tx, destination, satoshis)?;

    let fee = if input.locking_script.is_p2pkh() {
        let size = estimate_size(&tx, |_| ESTIMATED_UNLOCKING_LEN) + P2PKH_OUTPUT_LEN;
        fee_for_size(size, config.fee_rate_sat_per_kb)
    } else {
        config.flat_fee
    };

    let needed = satoshis.saturating_add(fee);
    if input.satoshis < needed {
        return Err(PushTxError::InsufficientFunds { needed, available: input.satoshis });
    }
    let change_sats = input.satoshis - needed;
    if change_sats > 0 {
        tx.add_output(TransactionOutput::new(change_sats, change.to_locking_script()));
    }
    tracing::debug!("paying {} satoshis with fee {} and change {}", satoshis, fee, change_sats);

    let getter = Getter::with_config(private_key.clone(), config.clone());
    fill_all_inputs(&mut tx, &getter)?;

    Ok(tx.to_hex())
}
