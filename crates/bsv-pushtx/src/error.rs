//! Error type for the push-tx crate.

/// Error types for the push-tx core.
///
/// Preimage decoding, template detection, the low-S search and the signing
/// orchestrator report through this enum; collaborator crate errors convert
/// in with `?`.
#[derive(Debug, thiserror::Error)]
pub enum PushTxError {
    /// Preimage bytes that do not match the sighash preimage layout.
    #[error("malformed preimage: {0}")]
    MalformedPreimage(String),

    /// A locking script no unlocker recognizes.
    #[error("unsupported locking script: {0}")]
    UnsupportedLockingScript(String),

    /// A push or opcode append failed while assembling a script.
    #[error("script build failure: {0}")]
    ScriptBuildFailure(#[from] bsv_script::ScriptError),

    /// No low-S lock time was found within the attempt cap.
    #[error("low-S search exhausted after {attempts} attempts")]
    LowSSearchExhausted {
        /// Lock-time values tried.
        attempts: u32,
    },

    /// A push-tx input moved the lock time after another push-tx input
    /// had already committed to it.
    #[error("input {input_index} needs lock time {found} but {expected} is already committed")]
    LockTimeConflict {
        /// The input whose search moved the lock time.
        input_index: usize,
        /// Lock time committed by earlier inputs.
        expected: u32,
        /// Lock time the input needed.
        found: u32,
    },

    /// The spent output cannot cover the payment and fee.
    #[error("insufficient funds: need {needed} satoshis, have {available}")]
    InsufficientFunds {
        /// Payment plus fee.
        needed: u64,
        /// Value of the spent output.
        available: u64,
    },

    /// A configuration value outside its valid range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An error from the transaction model.
    #[error("transaction error: {0}")]
    Transaction(#[from] bsv_transaction::TransactionError),

    /// An error from keys, signatures or hashing.
    #[error("primitives error: {0}")]
    Primitives(#[from] bsv_primitives::PrimitivesError),
}
