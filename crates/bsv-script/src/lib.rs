/// Script assembly for the OP_PUSH_TX crates.
///
/// Provides the `Script` byte newtype, the opcode table, push-data chunk
/// parsing and P2PKH address handling. Scripts are built by appending
/// opcodes and minimal pushes; nothing here executes them.

pub mod script;
pub mod opcodes;
pub mod chunk;
pub mod address;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use address::{Address, Network};
pub use chunk::ScriptChunk;
