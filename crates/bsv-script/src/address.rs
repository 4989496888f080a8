//! P2PKH addresses.
//!
//! An address is a Base58Check string wrapping a version byte and a 20-byte
//! public key hash. Only the P2PKH versions for mainnet (0x00) and testnet
//! (0x6f) are recognized; both produce the same locking script.

use std::fmt;
use std::str::FromStr;

use bsv_primitives::ec::PublicKey;
use bsv_primitives::hash::sha256d;

use crate::opcodes::*;
use crate::script::Script;
use crate::ScriptError;

/// Decoded length: version byte, 20-byte hash, 4-byte checksum.
const DECODED_LEN: usize = 25;

/// Network an address is encoded for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    /// Version byte 0x00; strings start with '1'.
    Mainnet,
    /// Version byte 0x6f; strings start with 'm' or 'n'.
    Testnet,
}

impl Network {
    fn version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    fn from_version(version: u8) -> Option<Self> {
        match version {
            0x00 => Some(Network::Mainnet),
            0x6f => Some(Network::Testnet),
            _ => None,
        }
    }
}

/// A P2PKH payment address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    public_key_hash: [u8; 20],
    network: Network,
}

impl Address {
    /// Parse a Base58Check address string.
    ///
    /// # Arguments
    /// * `addr` - The encoded address.
    ///
    /// # Returns
    /// The decoded `Address`. Bad characters, a wrong length, a checksum
    /// mismatch or a non-P2PKH version byte are all errors.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|e| ScriptError::InvalidAddress(format!("{}: {}", addr, e)))?;

        if decoded.len() != DECODED_LEN {
            return Err(ScriptError::InvalidAddressLength(addr.to_string()));
        }

        let (body, checksum) = decoded.split_at(21);
        if checksum != &sha256d(body)[..4] {
            return Err(ScriptError::EncodingChecksumFailed);
        }

        let network = Network::from_version(body[0])
            .ok_or_else(|| ScriptError::UnsupportedAddress(addr.to_string()))?;

        let mut public_key_hash = [0u8; 20];
        public_key_hash.copy_from_slice(&body[1..]);
        Ok(Address { public_key_hash, network })
    }

    /// Build an address from a 20-byte public key hash.
    pub fn from_public_key_hash(public_key_hash: [u8; 20], network: Network) -> Self {
        Address { public_key_hash, network }
    }

    /// Build the address that pays to `key`.
    pub fn from_public_key(key: &PublicKey, network: Network) -> Self {
        Address { public_key_hash: key.hash160(), network }
    }

    /// The 20-byte Hash160 this address commits to.
    pub fn public_key_hash(&self) -> &[u8; 20] {
        &self.public_key_hash
    }

    /// The network the address was encoded for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// Build the P2PKH locking script paying to this address.
    ///
    /// # Returns
    /// `OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn to_locking_script(&self) -> Script {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        bytes.extend_from_slice(&self.public_key_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script::from_bytes(&bytes)
    }
}

impl FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}

impl fmt::Display for Address {
    /// Display the Base58Check encoding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(DECODED_LEN);
        payload.push(self.network.version());
        payload.extend_from_slice(&self.public_key_hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        write!(f, "{}", bs58::encode(payload).into_string())
    }
}
