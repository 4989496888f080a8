/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Raw bytes or hex did not decode to a transaction.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An input index past the end of the input list.
    #[error("input index {index} out of range (tx has {count} inputs)")]
    InputIndexOutOfRange { index: usize, count: usize },

    /// The input carries no previous output, so it cannot be signed.
    #[error("input {0} has no source output")]
    MissingSourceOutput(usize),

    /// A previous transaction id that is not 32 bytes of hex.
    #[error("invalid txid: {0}")]
    InvalidTxid(String),

    /// An underlying script error (forwarded from `bsv-script`).
    #[error("script error: {0}")]
    Script(#[from] bsv_script::ScriptError),

    /// An underlying primitives error (forwarded from `bsv-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] bsv_primitives::PrimitivesError),
}
