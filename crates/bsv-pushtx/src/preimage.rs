//! Signature preimage codec.
//!
//! A preimage is the byte string a FORKID signature digests. It has a fixed
//! 104-byte prefix, the spent locking script with its varint length, and a
//! fixed 52-byte tail:
//!
//! | Field        | Size          |
//! |--------------|---------------|
//! | version      | 4 (LE)        |
//! | hashPrevouts | 32            |
//! | hashSequence | 32            |
//! | outpoint     | 36            |
//! | scriptCode   | varint + data |
//! | value        | 8 (LE)        |
//! | sequence     | 4 (LE)        |
//! | hashOutputs  | 32            |
//! | lockTime     | 4 (LE)        |
//! | sighashType  | 4 (LE)        |
//!
//! Parsing copies every field, so a `Preimage` never borrows its source.

use bsv_primitives::util::{BsvReader, BsvWriter, VarInt};
use bsv_script::Script;

use crate::PushTxError;

/// Offset of the scriptCode varint: version, hashPrevouts, hashSequence and
/// outpoint.
pub const SCRIPT_CODE_OFFSET: usize = 104;

/// Length of the fields after scriptCode.
pub const TAIL_LEN: usize = 52;

/// A parsed signature preimage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preimage {
    /// Transaction version, little-endian.
    pub version: [u8; 4],
    /// Double SHA-256 of every input's outpoint.
    pub hash_prevouts: [u8; 32],
    /// Double SHA-256 of every input's sequence.
    pub hash_sequence: [u8; 32],
    /// Previous txid and output index of the signed input.
    pub outpoint: [u8; 36],
    /// The spent locking script including its varint length prefix.
    pub script_code: Vec<u8>,
    /// Satoshis in the spent output, little-endian.
    pub value: [u8; 8],
    /// The signed input's sequence number.
    pub sequence: [u8; 4],
    /// Double SHA-256 of the serialized outputs.
    pub hash_outputs: [u8; 32],
    /// Transaction lock time, little-endian.
    pub lock_time: [u8; 4],
    /// Sighash flags widened to four bytes.
    pub sighash_type: [u8; 4],
}

impl Preimage {
    /// Parse a preimage from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - A complete preimage.
    ///
    /// # Returns
    /// The parsed preimage, or `MalformedPreimage` if the input is shorter
    /// than the fixed prefix, the scriptCode varint or data is truncated, or
    /// the bytes after scriptCode are not exactly the 52-byte tail.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PushTxError> {
        if bytes.len() < SCRIPT_CODE_OFFSET {
            return Err(PushTxError::MalformedPreimage(format!(
                "{} bytes is shorter than the {} byte prefix",
                bytes.len(),
                SCRIPT_CODE_OFFSET
            )));
        }

        let mut reader = BsvReader::new(bytes);
        let version = reader.read_array::<4>().map_err(malformed)?;
        let hash_prevouts = reader.read_array::<32>().map_err(malformed)?;
        let hash_sequence = reader.read_array::<32>().map_err(malformed)?;
        let outpoint = reader.read_array::<36>().map_err(malformed)?;

        let (script_len, varint_len) =
            VarInt::from_bytes(&bytes[SCRIPT_CODE_OFFSET..]).map_err(malformed)?;
        let script_code_end = usize::try_from(script_len.value())
            .ok()
            .and_then(|len| (SCRIPT_CODE_OFFSET + varint_len).checked_add(len))
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                PushTxError::MalformedPreimage(format!(
                    "scriptCode of {} bytes runs past the end of a {} byte preimage",
                    script_len.value(),
                    bytes.len()
                ))
            })?;
        let script_code = reader
            .read_bytes(script_code_end - SCRIPT_CODE_OFFSET)
            .map_err(malformed)?
            .to_vec();

        if reader.remaining() != TAIL_LEN {
            return Err(PushTxError::MalformedPreimage(format!(
                "expected {} bytes after scriptCode, found {}",
                TAIL_LEN,
                reader.remaining()
            )));
        }
        let value = reader.read_array::<8>().map_err(malformed)?;
        let sequence = reader.read_array::<4>().map_err(malformed)?;
        let hash_outputs = reader.read_array::<32>().map_err(malformed)?;
        let lock_time = reader.read_array::<4>().map_err(malformed)?;
        let sighash_type = reader.read_array::<4>().map_err(malformed)?;

        Ok(Preimage {
            version,
            hash_prevouts,
            hash_sequence,
            outpoint,
            script_code,
            value,
            sequence,
            hash_outputs,
            lock_time,
            sighash_type,
        })
    }

    /// Parse a hex-encoded preimage.
    pub fn from_hex(hex_str: &str) -> Result<Self, PushTxError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| PushTxError::MalformedPreimage(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize the fields back in order. Inverse of `from_bytes`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::with_capacity(self.serialized_len());
        writer.write_bytes(&self.version);
        writer.write_bytes(&self.hash_prevouts);
        writer.write_bytes(&self.hash_sequence);
        writer.write_bytes(&self.outpoint);
        writer.write_bytes(&self.script_code);
        writer.write_bytes(&self.value);
        writer.write_bytes(&self.sequence);
        writer.write_bytes(&self.hash_outputs);
        writer.write_bytes(&self.lock_time);
        writer.write_bytes(&self.sighash_type);
        writer.into_bytes()
    }

    /// Serialize to lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Serialized length.
    pub fn serialized_len(&self) -> usize {
        SCRIPT_CODE_OFFSET + self.script_code.len() + TAIL_LEN
    }

    /// Hex of the scriptCode with its first byte dropped.
    ///
    /// Only correct when the length fits the single-byte varint form (under
    /// 253 bytes); use `locking_script` for the general case.
    pub fn locking_script_hex(&self) -> String {
        hex::encode(self.script_code.get(1..).unwrap_or_default())
    }

    /// The embedded locking script with its varint prefix decoded.
    ///
    /// # Returns
    /// The script, or `MalformedPreimage` if the stored scriptCode is
    /// inconsistent with its own prefix.
    pub fn locking_script(&self) -> Result<Script, PushTxError> {
        let (len, prefix_len) = VarInt::from_bytes(&self.script_code).map_err(malformed)?;
        let body = &self.script_code[prefix_len..];
        if body.len() as u64 != len.value() {
            return Err(PushTxError::MalformedPreimage(format!(
                "scriptCode declares {} bytes but holds {}",
                len.value(),
                body.len()
            )));
        }
        Ok(Script::from_bytes(body))
    }

    /// Transaction version.
    pub fn version(&self) -> u32 {
        u32::from_le_bytes(self.version)
    }

    /// Satoshis of the spent output.
    pub fn value(&self) -> u64 {
        u64::from_le_bytes(self.value)
    }

    /// Sequence number of the signed input.
    pub fn sequence(&self) -> u32 {
        u32::from_le_bytes(self.sequence)
    }

    /// Transaction lock time.
    pub fn lock_time(&self) -> u32 {
        u32::from_le_bytes(self.lock_time)
    }

    /// Replace the lock time.
    pub fn set_lock_time(&mut self, lock_time: u32) {
        self.lock_time = lock_time.to_le_bytes();
    }

    /// Sighash flags.
    pub fn sighash_type(&self) -> u32 {
        u32::from_le_bytes(self.sighash_type)
    }
}

fn malformed(e: bsv_primitives::PrimitivesError) -> PushTxError {
    PushTxError::MalformedPreimage(e.to_string())
}

#[cfg(test)]
mod tests {
    //! Tests for preimage parsing against a real push-tx preimage.

    use super::*;

    /// Preimage of a transaction spending a push-tx output whose scriptCode
    /// is 194 bytes.
    const FIXTURE_HEX: &str = "010000009a2fa936542fa3c61222edfe04cd69a4f5e152bc0248f6a48c8408e242610e8e3bb13029ce7b1f559ef5e747fcac439f1455a2ec7c5f09b72290795e7066504445b546bce8be4cd4625399b780d7cc99bace957e3b4e72928ad1b9d71993fc5800000000c20079aa517f7c818b7c7e263044022079be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f8179802207c7e01417e2102b405d7f0322a89d0f9f3a98e6f938fdc1c969a8d1382a2bf66a71ae74a1e83b0ad7514cb030491157b26a570b6ee91e5b068d99c3b72f6046d657461a72231346e64483972374e327072396d71793666536f635955483263534a707644394a71044e554c4c7176a9142989611fd22fb65e8d6bb2c2b4e3a2b10dc604dd88ad6d876a0774657374696e67d007000000000000ffffffff09488de72898e69b4be145d7f7e53bdc74069db4ba04a6be563e05e91c17c4770000000041000000";

    // -----------------------------------------------------------------------
    // Fixture breakdown
    // -----------------------------------------------------------------------

    /// Every field of the fixture lands at the expected bytes.
    #[test]
    fn test_parse_fixture_fields() {
        let p = Preimage::from_hex(FIXTURE_HEX).expect("fixture should parse");

        assert_eq!(hex::encode(p.version), "01000000");
        assert_eq!(
            hex::encode(p.hash_prevouts),
            "9a2fa936542fa3c61222edfe04cd69a4f5e152bc0248f6a48c8408e242610e8e"
        );
        assert_eq!(
            hex::encode(p.hash_sequence),
            "3bb13029ce7b1f559ef5e747fcac439f1455a2ec7c5f09b72290795e70665044"
        );
        assert_eq!(
            hex::encode(p.outpoint),
            "45b546bce8be4cd4625399b780d7cc99bace957e3b4e72928ad1b9d71993fc5800000000"
        );
        assert_eq!(p.script_code.len(), 195);
        assert_eq!(p.script_code[0], 0xc2);
        assert_eq!(hex::encode(p.value), "d007000000000000");
        assert_eq!(p.value(), 2000);
        assert_eq!(hex::encode(p.sequence), "ffffffff");
        assert_eq!(
            hex::encode(p.hash_outputs),
            "09488de72898e69b4be145d7f7e53bdc74069db4ba04a6be563e05e91c17c477"
        );
        assert_eq!(p.lock_time(), 0);
        assert_eq!(p.sighash_type(), 0x41);
        assert_eq!(p.version(), 1);
        assert_eq!(p.serialized_len(), FIXTURE_HEX.len() / 2);
    }

    /// Serialization reproduces the fixture exactly.
    #[test]
    fn test_fixture_roundtrip() {
        let p = Preimage::from_hex(FIXTURE_HEX).unwrap();
        assert_eq!(p.to_hex(), FIXTURE_HEX);
    }

    /// The embedded script begins with the push-tx template.
    #[test]
    fn test_fixture_locking_script() {
        let p = Preimage::from_hex(FIXTURE_HEX).unwrap();
        let script = p.locking_script().unwrap();
        assert_eq!(script.len(), 194);
        assert!(p.locking_script_hex().starts_with("0079aa517f7c818b7c7e"));
        assert_eq!(p.locking_script_hex(), script.to_hex());
    }

    // -----------------------------------------------------------------------
    // Malformed input
    // -----------------------------------------------------------------------

    /// Short input, truncated scriptCode and wrong tail lengths are errors.
    #[test]
    fn test_malformed_inputs() {
        let bytes = hex::decode(FIXTURE_HEX).unwrap();
        let cases: Vec<Vec<u8>> = vec![
            hex::decode("0100010001").unwrap(),
            bytes[..103].to_vec(),
            bytes[..104].to_vec(),
            bytes[..200].to_vec(),
            bytes[..bytes.len() - 1].to_vec(),
            [bytes.clone(), vec![0x00]].concat(),
        ];
        for case in cases {
            assert!(
                matches!(Preimage::from_bytes(&case), Err(PushTxError::MalformedPreimage(_))),
                "{} bytes should be rejected",
                case.len()
            );
        }
        assert!(matches!(Preimage::from_hex("xyz"), Err(PushTxError::MalformedPreimage(_))));
    }

    /// A varint announcing more data than exists is rejected.
    #[test]
    fn test_oversized_varint() {
        let mut bytes = vec![0u8; SCRIPT_CODE_OFFSET];
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        bytes.extend_from_slice(&[0u8; TAIL_LEN]);
        assert!(Preimage::from_bytes(&bytes).is_err());

        let mut truncated = vec![0u8; SCRIPT_CODE_OFFSET];
        truncated.extend_from_slice(&[0xfd, 0x01]);
        assert!(Preimage::from_bytes(&truncated).is_err());
    }

    // -----------------------------------------------------------------------
    // Lock time
    // -----------------------------------------------------------------------

    /// set_lock_time rewrites only the lock time bytes.
    #[test]
    fn test_set_lock_time() {
        let mut p = Preimage::from_hex(FIXTURE_HEX).unwrap();
        p.set_lock_time(0x0102_0304);
        let bytes = p.to_bytes();
        let n = bytes.len();
        assert_eq!(&bytes[n - 8..n - 4], &[0x04, 0x03, 0x02, 0x01]);

        let original = hex::decode(FIXTURE_HEX).unwrap();
        assert_eq!(&bytes[..n - 8], &original[..n - 8]);
        assert_eq!(&bytes[n - 4..], &original[n - 4..]);
    }
}
