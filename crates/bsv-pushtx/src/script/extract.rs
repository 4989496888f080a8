//! On-chain extraction of the spent locking script from a preimage.

use bsv_script::opcodes::*;
use bsv_script::Script;

use crate::preimage::SCRIPT_CODE_OFFSET;
use crate::PushTxError;

/// Append a sequence that replaces a preimage with its scriptCode.
///
/// Expects the preimage on top of the stack and leaves only the locking
/// script bytes there. Every width of the scriptCode varint is handled:
/// a single byte below 0xfd, or 0xfd / 0xfe / 0xff followed by 2, 4 or 8
/// little-endian bytes. The marker byte is compared raw with OP_EQUAL,
/// since bytes such as 0x00 and 0x80 are not minimal script numbers. A zero
/// byte is appended to each length before OP_BIN2NUM so a set high bit is
/// never read as a sign.
///
/// # Arguments
/// * `script` - The script to extend.
///
/// # Returns
/// `Ok(())`, or `ScriptBuildFailure` if an append fails.
pub fn append_get_locking_script_from_preimage(script: &mut Script) -> Result<(), PushTxError> {
    // <head> <varint byte> <rest>, then three copies of the varint byte
    script.append_push_data(&[SCRIPT_CODE_OFFSET as u8])?;
    script.append_opcodes(&[OP_BIN2NUM, OP_SPLIT, OP_1, OP_SPLIT, OP_SWAP, OP_DUP, OP_DUP, OP_DUP])?;

    script.append_push_data(&[0xff])?;
    script.append_opcodes(&[OP_EQUAL, OP_IF, OP_2DROP, OP_DROP, OP_8, OP_SPLIT, OP_SWAP])?;
    script.append_push_data(&[0x00])?;
    script.append_opcodes(&[OP_CAT, OP_ELSE])?;

    script.append_push_data(&[0xfe])?;
    script.append_opcodes(&[OP_EQUAL, OP_IF, OP_2DROP, OP_4, OP_SPLIT, OP_SWAP])?;
    script.append_push_data(&[0x00])?;
    script.append_opcodes(&[OP_CAT, OP_ELSE])?;

    script.append_push_data(&[0xfd])?;
    script.append_opcodes(&[OP_EQUAL, OP_IF, OP_DROP, OP_2, OP_SPLIT, OP_SWAP])?;
    script.append_push_data(&[0x00])?;
    script.append_opcodes(&[OP_CAT, OP_ELSE])?;

    script.append_push_data(&[0x00])?;
    script.append_opcodes(&[OP_CAT, OP_ENDIF, OP_ENDIF, OP_ENDIF])?;

    // <head> <script> <tail> -> <script>
    script.append_opcodes(&[OP_BIN2NUM, OP_SPLIT, OP_ROT, OP_2DROP])?;
    Ok(())
}
