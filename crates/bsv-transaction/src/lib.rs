/// Transaction model for the OP_PUSH_TX crates.
///
/// Provides the `Transaction` type with its inputs and outputs, wire
/// serialization, FORKID signature preimages, size-based fee estimation and
/// the P2PKH signing template.

pub mod transaction;
pub mod input;
pub mod output;
pub mod sighash;
pub mod fee;
pub mod template;

mod error;
pub use error::TransactionError;
pub use transaction::Transaction;
pub use input::TransactionInput;
pub use output::TransactionOutput;
