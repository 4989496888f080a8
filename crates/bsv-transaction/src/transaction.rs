//! Core transaction type.
//!
//! A transaction is a version, ordered inputs and outputs, and a lock time.
//! This module owns the wire codec, txid computation, spending an output by
//! its display txid, and per-input preimage and sighash computation.

use bsv_primitives::hash::sha256d;
use bsv_primitives::util::{BsvReader, BsvWriter, VarInt};
use bsv_script::Script;

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash;
use crate::TransactionError;

/// A transaction.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time, committed to by every signature preimage.
    pub lock_time: u32,
}

impl Transaction {
    /// Create an empty version 1 transaction with lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Exactly one serialized transaction.
    ///
    /// # Returns
    /// The transaction, or a `SerializationError` if the data is truncated
    /// or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = BsvReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a reader.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;
        let inputs = (0..input_count.value())
            .map(|_| TransactionInput::read_from(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;
        let outputs = (0..output_count.value())
            .map(|_| TransactionOutput::read_from(reader))
            .collect::<Result<Vec<_>, _>>()?;

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction { version, inputs, outputs, lock_time })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::with_capacity(256);
        writer.write_u32_le(self.version);
        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }
        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }
        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Transaction id in internal byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// Transaction id in display (byte-reversed) hex.
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    /// Append an input.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Append an output.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Spend an output identified by its display txid.
    ///
    /// The spent output's locking script and value are recorded on the new
    /// input so it can be signed later.
    ///
    /// # Arguments
    /// * `prev_tx_id` - Display-order hex txid of the previous transaction.
    /// * `vout` - Index of the output being spent.
    /// * `prev_locking_script` - Locking script of that output.
    /// * `satoshis` - Value of that output.
    ///
    /// # Returns
    /// `Ok(())`, or `InvalidTxid` if the txid is not 32 bytes of hex.
    pub fn add_input_from(
        &mut self,
        prev_tx_id: &str,
        vout: u32,
        prev_locking_script: Script,
        satoshis: u64,
    ) -> Result<(), TransactionError> {
        let mut source_txid: [u8; 32] = hex::decode(prev_tx_id)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| TransactionError::InvalidTxid(prev_tx_id.to_string()))?;
        source_txid.reverse();

        let mut input = TransactionInput::new();
        input.source_txid = source_txid;
        input.source_tx_out_index = vout;
        input.set_source_output(Some(TransactionOutput::new(satoshis, prev_locking_script)));
        self.inputs.push(input);
        Ok(())
    }

    /// Sum of output values.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Sum of spent output values.
    ///
    /// # Returns
    /// The total, or `MissingSourceOutput` naming the first input without
    /// source information.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        self.inputs.iter().enumerate().try_fold(0u64, |acc, (i, input)| {
            input
                .source_satoshis()
                .map(|sats| acc + sats)
                .ok_or(TransactionError::MissingSourceOutput(i))
        })
    }

    // -----------------------------------------------------------------
    // Signature preimage
    // -----------------------------------------------------------------

    /// Build the signature preimage for one input.
    ///
    /// The scriptCode and value come from the input's source output.
    ///
    /// # Arguments
    /// * `input_index` - Index of the input being signed.
    /// * `sighash_flag` - Combined sighash flags.
    ///
    /// # Returns
    /// The raw preimage, or `InputIndexOutOfRange` / `MissingSourceOutput`.
    pub fn calc_input_preimage(
        &self,
        input_index: usize,
        sighash_flag: u32,
    ) -> Result<Vec<u8>, TransactionError> {
        let input = self.inputs.get(input_index).ok_or(TransactionError::InputIndexOutOfRange {
            index: input_index,
            count: self.inputs.len(),
        })?;
        let source = input
            .source_output()
            .ok_or(TransactionError::MissingSourceOutput(input_index))?;

        sighash::calc_preimage(
            self,
            input_index,
            source.locking_script.to_bytes(),
            sighash_flag,
            source.satoshis,
        )
    }

    /// Double SHA-256 of `calc_input_preimage`.
    pub fn calc_input_signature_hash(
        &self,
        input_index: usize,
        sighash_flag: u32,
    ) -> Result<[u8; 32], TransactionError> {
        Ok(sha256d(&self.calc_input_preimage(input_index, sighash_flag)?))
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as hex.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
