/// Primitives shared by the OP_PUSH_TX crates.
///
/// This crate provides the building blocks the script, transaction and
/// push-tx layers consume through narrow interfaces:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Bitcoin VarInt encoding plus little-endian binary reader/writer
/// - secp256k1 private keys, public keys and DER signatures

pub mod hash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
