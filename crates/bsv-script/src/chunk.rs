//! Script chunk parsing and push-data encoding.
//!
//! A chunk is either a bare opcode or a data push with its payload. Push
//! prefixes are always minimal: a direct length byte up to 75 bytes, then
//! OP_PUSHDATA1/2/4.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The pushed payload, if this chunk is a push.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render this chunk as one ASM token.
    ///
    /// Pushes render as their payload hex; everything else by opcode name.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) if self.op > OP_0 && self.op <= OP_PUSHDATA4 => hex::encode(data),
            _ => opcode_to_string(self.op).to_string(),
        }
    }
}

/// Read the chunk starting at `*pos` and advance past it.
///
/// # Arguments
/// * `bytes` - The full script.
/// * `pos` - Offset of the chunk's opcode byte; advanced on success.
///
/// # Returns
/// The chunk, or `DataTooSmall` if a push runs past the end of the script.
pub fn read_chunk(bytes: &[u8], pos: &mut usize) -> Result<ScriptChunk, ScriptError> {
    let op = *bytes.get(*pos).ok_or(ScriptError::IndexOutOfRange)?;
    let (len_size, data_len) = match op {
        OP_DATA_1..=OP_DATA_75 => (0, op as usize),
        OP_PUSHDATA1 => (1, read_le(bytes, *pos + 1, 1)?),
        OP_PUSHDATA2 => (2, read_le(bytes, *pos + 1, 2)?),
        OP_PUSHDATA4 => (4, read_le(bytes, *pos + 1, 4)?),
        _ => {
            *pos += 1;
            return Ok(ScriptChunk { op, data: None });
        }
    };
    let start = *pos + 1 + len_size;
    let end = start.checked_add(data_len).ok_or(ScriptError::DataTooSmall)?;
    if end > bytes.len() {
        return Err(ScriptError::DataTooSmall);
    }
    *pos = end;
    Ok(ScriptChunk { op, data: Some(bytes[start..end].to_vec()) })
}

/// Read a `width`-byte little-endian length at `at`.
fn read_le(bytes: &[u8], at: usize, width: usize) -> Result<usize, ScriptError> {
    let raw = bytes.get(at..at + width).ok_or(ScriptError::DataTooSmall)?;
    Ok(raw.iter().rev().fold(0usize, |acc, &b| (acc << 8) | b as usize))
}

/// Decode raw script bytes into chunks.
///
/// An OP_RETURN outside any conditional block swallows the rest of the
/// script as its data, matching how nodes treat trailing data outputs.
///
/// # Arguments
/// * `bytes` - The raw script bytes.
///
/// # Returns
/// The parsed chunks, or `DataTooSmall` if a push is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    let mut depth: i32 = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF => depth += 1,
            OP_ENDIF => depth -= 1,
            OP_RETURN if depth <= 0 => {
                chunks.push(ScriptChunk { op: OP_RETURN, data: Some(bytes[pos..].to_vec()) });
                break;
            }
            _ => {}
        }
        chunks.push(read_chunk(bytes, &mut pos)?);
    }

    Ok(chunks)
}

/// Compute the minimal push prefix for a payload of `data_len` bytes.
///
/// # Arguments
/// * `data_len` - Length of the payload to push.
///
/// # Returns
/// The prefix bytes, or `DataTooBig` above the OP_PUSHDATA4 limit.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    let mut buf = Vec::with_capacity(5);
    match data_len {
        0..=75 => buf.push(data_len as u8),
        76..=0xff => {
            buf.push(OP_PUSHDATA1);
            buf.push(data_len as u8);
        }
        0x100..=0xffff => {
            buf.push(OP_PUSHDATA2);
            buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        }
        _ if data_len as u64 <= 0xffff_ffff => {
            buf.push(OP_PUSHDATA4);
            buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        }
        _ => return Err(ScriptError::DataTooBig),
    }
    Ok(buf)
}

/// Encode several payloads as consecutive pushes.
///
/// # Arguments
/// * `parts` - Payloads in push order.
///
/// # Returns
/// The concatenated pushes, or `PartTooBig(i)` naming the oversized part.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut result = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let prefix = push_data_prefix(part.len()).map_err(|_| ScriptError::PartTooBig(i))?;
        result.extend_from_slice(&prefix);
        result.extend_from_slice(part);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    //! Tests for chunk decoding and push prefixes.

    use super::*;

    // -----------------------------------------------------------------------
    // decode_script
    // -----------------------------------------------------------------------

    /// Three direct pushes decode and re-encode to the same bytes.
    #[test]
    fn test_decode_and_encode_roundtrip() {
        let bytes = hex::decode("05000102030401ff02abcd").unwrap();
        let parts = decode_script(&bytes).unwrap();
        assert_eq!(parts.len(), 3);

        let data: Vec<&[u8]> = parts.iter().filter_map(|p| p.data.as_deref()).collect();
        assert_eq!(encode_push_datas(&data).unwrap(), bytes);
    }

    /// Empty input decodes to no chunks.
    #[test]
    fn test_decode_script_empty() {
        assert!(decode_script(&[]).unwrap().is_empty());
    }

    /// Truncated pushes of each width are errors.
    #[test]
    fn test_decode_script_truncated() {
        assert!(decode_script(&hex::decode("05000000").unwrap()).is_err());
        assert!(decode_script(&hex::decode("4c05000000").unwrap()).is_err());
        assert!(decode_script(&[OP_PUSHDATA1]).is_err());
        assert!(decode_script(&[OP_PUSHDATA2, 0x05]).is_err());
        assert!(decode_script(&[OP_PUSHDATA4, 0x05, 0x00]).is_err());
    }

    /// OP_PUSHDATA2 carries a 2-byte little-endian length.
    #[test]
    fn test_decode_script_pushdata2() {
        let mut bytes = vec![OP_PUSHDATA2, 0x00, 0x01];
        bytes.extend_from_slice(&[0xaa; 256]);
        bytes.push(OP_DROP);
        let parts = decode_script(&bytes).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].data.as_ref().map(Vec::len), Some(256));
        assert_eq!(parts[1].op, OP_DROP);
    }

    /// A top-level OP_RETURN takes the remaining bytes as data.
    #[test]
    fn test_decode_script_op_return_tail() {
        let parts = decode_script(&[OP_FALSE, OP_RETURN, 0x05, 0x01]).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].op, OP_RETURN);
        assert_eq!(parts[1].data, Some(vec![OP_RETURN, 0x05, 0x01]));
    }

    /// Inside a conditional OP_RETURN is just an opcode.
    #[test]
    fn test_decode_script_op_return_in_branch() {
        let parts = decode_script(&[OP_IF, OP_RETURN, OP_ENDIF, OP_1]).unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].data, None);
    }

    // -----------------------------------------------------------------------
    // push_data_prefix
    // -----------------------------------------------------------------------

    /// Prefixes at every width boundary.
    #[test]
    fn test_push_data_prefix_boundaries() {
        assert_eq!(push_data_prefix(20).unwrap(), vec![20u8]);
        assert_eq!(push_data_prefix(75).unwrap(), vec![75u8]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(255).unwrap(), vec![OP_PUSHDATA1, 255]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(push_data_prefix(65535).unwrap(), vec![OP_PUSHDATA2, 0xff, 0xff]);
        assert_eq!(
            push_data_prefix(65536).unwrap(),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    // -----------------------------------------------------------------------
    // ScriptChunk::to_asm_string
    // -----------------------------------------------------------------------

    /// Pushes render as hex, opcodes by name.
    #[test]
    fn test_chunk_to_asm_string() {
        let push = ScriptChunk { op: OP_DATA_20, data: Some(vec![0xab; 20]) };
        assert_eq!(push.to_asm_string(), "ab".repeat(20));
        let op = ScriptChunk { op: OP_SPLIT, data: None };
        assert_eq!(op.to_asm_string(), "OP_SPLIT");
    }
}
