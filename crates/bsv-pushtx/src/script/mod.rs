//! Opcode templates for the push-tx technique.
//!
//! `push_tx` holds the self-verification sequence and its detection and
//! splitting helpers; `extract` holds the sequence that recovers the
//! scriptCode from a preimage on the stack.

pub mod extract;
pub mod push_tx;

pub use extract::append_get_locking_script_from_preimage;
pub use push_tx::{
    append_push_tx, append_split_push_tx, build_locking_script, is_push_tx, push_tx_template,
    split_push_tx_from_locking_script, PUSH_TX_PUBLIC_KEY, PUSH_TX_SIG_PREFIX,
    PUSH_TX_TEMPLATE_LEN, SIGHASH_ALL_FORKID_MARKER,
};
