/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Scripts are append-only while being built: builders take `&mut Script`
/// and extend it with pushes and opcodes. Classification helpers recognize
/// the P2PKH pattern and generic byte prefixes.

use std::fmt;

use crate::chunk::{decode_script, encode_push_datas, push_data_prefix, read_chunk, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// Length of a standard P2PKH locking script.
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// The decoded `Script`, or `InvalidHex`.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from a space-separated ASM string.
    ///
    /// Known opcode names are emitted directly; every other token is treated
    /// as hex push data.
    ///
    /// # Arguments
    /// * `asm` - The ASM string.
    ///
    /// # Returns
    /// The assembled `Script`, or an error if a token is neither.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            match string_to_opcode(token) {
                Some(op) => script.0.push(op),
                None => script.append_push_data_hex(token)?,
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Render the script as ASM.
    ///
    /// # Returns
    /// Space-separated tokens, or an empty string for empty or malformed
    /// scripts.
    pub fn to_asm(&self) -> String {
        let mut parts = Vec::new();
        let mut pos = 0;
        while pos < self.0.len() {
            match read_chunk(&self.0, &mut pos) {
                Ok(chunk) => parts.push(chunk.to_asm_string()),
                Err(_) => return String::new(),
            }
        }
        parts.join(" ")
    }

    /// Borrow the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the script length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash locking script.
    ///
    /// Pattern: `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == P2PKH_SCRIPT_LEN
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check whether the script begins with the given bytes.
    ///
    /// # Arguments
    /// * `prefix` - The expected leading bytes.
    ///
    /// # Returns
    /// `true` if the script is at least as long as `prefix` and starts with it.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Extract the 20-byte hash from a P2PKH script.
    ///
    /// # Returns
    /// The public key hash, or `NotP2PKH` / `EmptyScript`.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if self.0.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2PKH);
        }
        let mut pkh = [0u8; 20];
        pkh.copy_from_slice(&self.0[3..23]);
        Ok(pkh)
    }

    /// Parse the script into chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Split the script at a byte offset.
    ///
    /// # Arguments
    /// * `mid` - Offset of the first byte of the second half.
    ///
    /// # Returns
    /// `(head, tail)`, or `None` if `mid` is past the end.
    pub fn split_at(&self, mid: usize) -> Option<(Script, Script)> {
        if mid > self.0.len() {
            return None;
        }
        let (head, tail) = self.0.split_at(mid);
        Some((Script::from_bytes(head), Script::from_bytes(tail)))
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Append one data push with its minimal prefix.
    ///
    /// # Arguments
    /// * `data` - The payload to push.
    ///
    /// # Returns
    /// `Ok(())`, or `DataTooBig` above the OP_PUSHDATA4 limit.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append several data pushes as one group, in order.
    ///
    /// Nothing is appended unless every part fits.
    ///
    /// # Arguments
    /// * `parts` - The payloads to push.
    ///
    /// # Returns
    /// `Ok(())`, or `PartTooBig(i)` naming the first oversized part.
    pub fn append_push_data_array(&mut self, parts: &[&[u8]]) -> Result<(), ScriptError> {
        let encoded = encode_push_datas(parts)?;
        self.0.extend_from_slice(&encoded);
        Ok(())
    }

    /// Append hex-encoded data as one push.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str).map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append bare opcodes.
    ///
    /// Push opcodes (OP_DATA_1..OP_PUSHDATA4) are rejected because they need
    /// a payload; use `append_push_data` for those.
    ///
    /// # Arguments
    /// * `opcodes` - Opcode bytes to append.
    ///
    /// # Returns
    /// `Ok(())`, or `InvalidOpcodeType` naming the offending push opcode.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| (OP_DATA_1..=OP_PUSHDATA4).contains(&op)) {
            return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op).to_string()));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append another script's bytes verbatim.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }
}

impl fmt::Display for Script {
    /// Display the script as lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
