//! Transaction input spending a previous output.
//!
//! An input names the outpoint it spends and carries the unlocking script
//! once signed. The spent output itself (value and locking script) is kept
//! alongside because every signature preimage commits to both; it is never
//! serialized.

use bsv_primitives::util::{BsvReader, BsvWriter, VarInt};
use bsv_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Sequence number of a final input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Serialized size of an outpoint: 32-byte txid plus 4-byte index.
pub const OUTPOINT_LEN: usize = 36;

/// A single input in a transaction.
///
/// # Wire format
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | source_txid        | 32 bytes (LE)    |
/// | source_tx_out_index| 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | unlocking_script   | variable         |
/// | sequence_number    | 4 bytes (LE)     |
#[derive(Clone, Debug)]
pub struct TransactionInput {
    /// Txid of the spent output in internal (reversed) byte order.
    pub source_txid: [u8; 32],

    /// Index of the spent output within its transaction.
    pub source_tx_out_index: u32,

    /// Sequence number, final by default.
    pub sequence_number: u32,

    /// The unlocking script, `None` until the input is signed.
    pub unlocking_script: Option<Script>,

    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// Create an unsigned input with a zero outpoint and final sequence.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_tx_out_index: 0,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: None,
            source_output: None,
        }
    }

    /// Deserialize an input from a reader.
    ///
    /// # Arguments
    /// * `reader` - Positioned at the start of an encoded input.
    ///
    /// # Returns
    /// The input, with an empty script mapped to `None`, or a
    /// `SerializationError` naming the truncated field.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let source_txid = reader.read_array::<32>().map_err(|e| field_error("source txid", e))?;
        let source_tx_out_index =
            reader.read_u32_le().map_err(|e| field_error("output index", e))?;
        let script_len = reader.read_varint().map_err(|e| field_error("script length", e))?;
        let script_bytes = reader
            .read_bytes(script_len.value() as usize)
            .map_err(|e| field_error("unlocking script", e))?;
        let sequence_number =
            reader.read_u32_le().map_err(|e| field_error("sequence number", e))?;

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script: (!script_bytes.is_empty()).then(|| Script::from_bytes(script_bytes)),
            source_output: None,
        })
    }

    /// Serialize this input into a writer.
    pub fn write_to(&self, writer: &mut BsvWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_tx_out_index);
        let script = self.unlocking_script.as_ref().map(Script::to_bytes).unwrap_or_default();
        writer.write_varint(VarInt::from(script.len()));
        writer.write_bytes(script);
        writer.write_u32_le(self.sequence_number);
    }

    /// Serialized size of this input given an unlocking script length.
    ///
    /// # Arguments
    /// * `script_len` - Length of the unlocking script to account for.
    ///
    /// # Returns
    /// Outpoint, varint, script and sequence bytes.
    pub fn serialized_len_with_script(script_len: usize) -> usize {
        OUTPOINT_LEN + VarInt::from(script_len).length() + script_len + 4
    }

    /// Attach (or clear) the output this input spends.
    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// The output this input spends, if known.
    pub fn source_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    /// Satoshis of the spent output, if known.
    pub fn source_satoshis(&self) -> Option<u64> {
        self.source_output.as_ref().map(|o| o.satoshis)
    }

    /// Locking script of the spent output, if known.
    pub fn source_locking_script(&self) -> Option<&Script> {
        self.source_output.as_ref().map(|o| &o.locking_script)
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}

fn field_error(field: &str, e: bsv_primitives::PrimitivesError) -> TransactionError {
    TransactionError::SerializationError(format!("reading {}: {}", field, e))
}
