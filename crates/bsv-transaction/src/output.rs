//! Transaction output: a satoshi value and its locking script.

use bsv_primitives::util::{BsvReader, BsvWriter, VarInt};
use bsv_script::Script;

use crate::TransactionError;

/// A single output in a transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Value locked by this output.
    pub satoshis: u64,

    /// Spending conditions for the value.
    pub locking_script: Script,
}

impl TransactionOutput {
    /// Create an output paying `satoshis` to `locking_script`.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput { satoshis, locking_script }
    }

    /// Deserialize an output from a reader.
    ///
    /// # Arguments
    /// * `reader` - Positioned at the start of an encoded output.
    ///
    /// # Returns
    /// The output, or a `SerializationError` if the data is truncated.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;
        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;
        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput::new(satoshis, Script::from_bytes(script_bytes)))
    }

    /// Serialize this output into a writer.
    pub fn write_to(&self, writer: &mut BsvWriter) {
        writer.write_u64_le(self.satoshis);
        let script = self.locking_script.to_bytes();
        writer.write_varint(VarInt::from(script.len()));
        writer.write_bytes(script);
    }

    /// Serialize this output to bytes. This is also the form hashed into
    /// `hashOutputs`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::with_capacity(self.serialized_len());
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Length of the serialized output.
    pub fn serialized_len(&self) -> usize {
        let script_len = self.locking_script.len();
        8 + VarInt::from(script_len).length() + script_len
    }
}
