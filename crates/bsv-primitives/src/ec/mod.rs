/// Elliptic curve cryptography on secp256k1.
///
/// Private keys sign digests with RFC6979 nonces, public keys serialize in
/// compressed SEC1 form, and signatures encode as strict low-S DER.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
