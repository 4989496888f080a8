#![deny(missing_docs)]
//! OP_PUSH_TX: self-verifying transaction outputs.
//!
//! A push-tx locking script makes the spender push the spending
//! transaction's signature preimage and checks it with a fixed signature,
//! so later script can read the transaction's own fields. This crate
//! provides the preimage codec, the low-S lock-time search, the opcode
//! templates, and the signers that build such transactions.

pub mod builder;
pub mod config;
pub mod error;
pub mod malleate;
pub mod preimage;
pub mod script;
pub mod unlocker;

pub use builder::{
    add_push_tx_output, build_self_verifying_transaction,
    build_self_verifying_transaction_with_config, fill_all_inputs, push_tx_output, SourceOutput,
};
pub use config::PushTxConfig;
pub use error::PushTxError;
pub use malleate::{check_for_low_s, check_for_low_s_with_limit, is_low_s, LowSPreimage};
pub use preimage::Preimage;
pub use script::{
    append_get_locking_script_from_preimage, append_push_tx, append_split_push_tx,
    build_locking_script, is_push_tx,
};
pub use unlocker::{
    build_unlocking_script, select_unlocker, Getter, P2pkhUnlocker, PushTxUnlocker, Unlocker,
    UnlockerGetter,
};
