//! Self-verification template.
//!
//! The template expects the spending transaction's preimage on top of the
//! stack. It hashes a copy, turns the digest into a signature with a fixed
//! `r` and `s = digest + 2^248`, and checks it against a fixed public key
//! whose private key makes that signature valid for any digest. The check
//! only passes when the preimage is the one the node computes for the
//! spending input, so the rest of the locking script can trust it.
//!
//! The first `PUSH_TX_TEMPLATE_LEN` bytes are a wire contract: outputs
//! already on chain are detected and split at that offset.

use bsv_script::opcodes::*;
use bsv_script::{Address, Script};

use crate::PushTxError;

/// DER header, the fixed `r` (the generator's x coordinate) and the header
/// of the `s` integer.
pub const PUSH_TX_SIG_PREFIX: [u8; 38] = [
    0x30, 0x44, 0x02, 0x20, 0x79, 0xbe, 0x66, 0x7e, 0xf9, 0xdc, 0xbb, 0xac, 0x55, 0xa0, 0x62,
    0x95, 0xce, 0x87, 0x0b, 0x07, 0x02, 0x9b, 0xfc, 0xdb, 0x2d, 0xce, 0x28, 0xd9, 0x59, 0xf2,
    0x81, 0x5b, 0x16, 0xf8, 0x17, 0x98, 0x02, 0x20,
];

/// Sighash byte appended to the assembled signature (ALL | FORKID).
pub const SIGHASH_ALL_FORKID_MARKER: u8 = 0x41;

/// Compressed public key the assembled signature is checked against.
pub const PUSH_TX_PUBLIC_KEY: [u8; 33] = [
    0x02, 0xb4, 0x05, 0xd7, 0xf0, 0x32, 0x2a, 0x89, 0xd0, 0xf9, 0xf3, 0xa9, 0x8e, 0x6f, 0x93,
    0x8f, 0xdc, 0x1c, 0x96, 0x9a, 0x8d, 0x13, 0x82, 0xa2, 0xbf, 0x66, 0xa7, 0x1a, 0xe7, 0x4a,
    0x1e, 0x83, 0xb0,
];

/// Length of the verification sequence through OP_CHECKSIGVERIFY.
pub const PUSH_TX_TEMPLATE_LEN: usize = 89;

/// Append the verification sequence without the trailing OP_DROP.
fn append_verify(script: &mut Script) -> Result<(), PushTxError> {
    // digest' = digest with its first byte incremented
    script.append_opcodes(&[
        OP_0, OP_PICK, OP_HASH256, OP_1, OP_SPLIT, OP_SWAP, OP_BIN2NUM, OP_1ADD, OP_SWAP, OP_CAT,
    ])?;
    script.append_push_data(&PUSH_TX_SIG_PREFIX)?;
    script.append_opcodes(&[OP_SWAP, OP_CAT])?;
    script.append_push_data(&[SIGHASH_ALL_FORKID_MARKER])?;
    script.append_opcodes(&[OP_CAT])?;
    script.append_push_data(&PUSH_TX_PUBLIC_KEY)?;
    script.append_opcodes(&[OP_CHECKSIGVERIFY])?;
    Ok(())
}

/// Append the self-verification sequence.
///
/// Consumes nothing: the preimage is verified and then dropped, leaving the
/// items beneath it for whatever script follows.
///
/// # Arguments
/// * `script` - The script to extend.
///
/// # Returns
/// `Ok(())`, or `ScriptBuildFailure` if an append fails.
pub fn append_push_tx(script: &mut Script) -> Result<(), PushTxError> {
    append_verify(script)?;
    script.append_opcodes(&[OP_DROP])?;
    Ok(())
}

/// The 89-byte verification prefix on its own.
pub fn push_tx_template() -> Result<Script, PushTxError> {
    let mut script = Script::new();
    append_verify(&mut script)?;
    Ok(script)
}

/// Check whether a locking script begins with the verification prefix.
pub fn is_push_tx(script: &Script) -> bool {
    push_tx_template().map_or(false, |template| script.starts_with(template.to_bytes()))
}

/// Append the on-chain split of a locking script at the template boundary.
///
/// With a locking script on top of the stack this leaves
/// `<rest> <template>`, template on top.
pub fn append_split_push_tx(script: &mut Script) -> Result<(), PushTxError> {
    script.append_push_data(&[PUSH_TX_TEMPLATE_LEN as u8])?;
    script.append_opcodes(&[OP_SPLIT, OP_SWAP])?;
    Ok(())
}

/// Split a push-tx locking script into `(template, rest)`.
///
/// # Returns
/// `None` if the script does not start with the template.
pub fn split_push_tx_from_locking_script(script: &Script) -> Option<(Script, Script)> {
    if !is_push_tx(script) {
        return None;
    }
    script.split_at(PUSH_TX_TEMPLATE_LEN)
}

/// Build the locking script for a push-tx output paying `address`.
///
/// # Arguments
/// * `address` - Owner of the output; spending also needs their signature.
///
/// # Returns
/// The self-verification sequence followed by P2PKH to `address`.
pub fn build_locking_script(address: &Address) -> Result<Script, PushTxError> {
    let mut script = Script::new();
    append_push_tx(&mut script)?;
    script.append_script(&address.to_locking_script());
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hex of the 89-byte verification prefix.
    const TEMPLATE_HEX: &str = "0079aa517f7c818b7c7e263044022079be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f8179802207c7e01417e2102b405d7f0322a89d0f9f3a98e6f938fdc1c969a8d1382a2bf66a71ae74a1e83b0ad";

    // -----------------------------------------------------------------------
    // Template bytes
    // -----------------------------------------------------------------------

    /// The template matches the deployed bytes exactly.
    #[test]
    fn test_template_bytes() {
        let template = push_tx_template().unwrap();
        assert_eq!(template.len(), PUSH_TX_TEMPLATE_LEN);
        assert_eq!(template.to_hex(), TEMPLATE_HEX);
    }

    /// append_push_tx adds a trailing OP_DROP.
    #[test]
    fn test_append_push_tx() {
        let mut script = Script::new();
        append_push_tx(&mut script).unwrap();
        assert_eq!(script.to_hex(), format!("{}75", TEMPLATE_HEX));
    }

    /// Constants decode to the published values.
    #[test]
    fn test_constants() {
        assert_eq!(
            hex::encode(PUSH_TX_SIG_PREFIX),
            "3044022079be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f817980220"
        );
        assert_eq!(
            hex::encode(PUSH_TX_PUBLIC_KEY),
            "02b405d7f0322a89d0f9f3a98e6f938fdc1c969a8d1382a2bf66a71ae74a1e83b0"
        );
    }

    // -----------------------------------------------------------------------
    // Locking script
    // -----------------------------------------------------------------------

    /// The locking script is template, OP_DROP, then P2PKH.
    #[test]
    fn test_build_locking_script() {
        let address = Address::from_string("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr").unwrap();
        let script = build_locking_script(&address).unwrap();
        assert_eq!(script.len(), PUSH_TX_TEMPLATE_LEN + 1 + 25);
        assert_eq!(
            script.to_hex(),
            format!("{}7576a9148fe80c75c9560e8b56ed64ea3c26e18d2c52211b88ac", TEMPLATE_HEX)
        );
        assert!(is_push_tx(&script));
        assert!(!script.is_p2pkh());
    }

    // -----------------------------------------------------------------------
    // Detection and splitting
    // -----------------------------------------------------------------------

    /// Detection requires the full prefix.
    #[test]
    fn test_is_push_tx() {
        let template = push_tx_template().unwrap();
        assert!(is_push_tx(&template));

        let p2pkh = Script::from_hex("76a9148fe80c75c9560e8b56ed64ea3c26e18d2c52211b88ac").unwrap();
        assert!(!is_push_tx(&p2pkh));
        assert!(!is_push_tx(&Script::new()));

        let (short, _) = template.split_at(PUSH_TX_TEMPLATE_LEN - 1).unwrap();
        assert!(!is_push_tx(&short));

        let mut tampered = template.to_bytes().to_vec();
        tampered[50] ^= 0x01;
        assert!(!is_push_tx(&Script::from_bytes(&tampered)));
    }

    /// The off-chain split separates template and remainder.
    #[test]
    fn test_split_push_tx_from_locking_script() {
        let address = Address::from_string("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr").unwrap();
        let script = build_locking_script(&address).unwrap();
        let (template, rest) = split_push_tx_from_locking_script(&script).unwrap();
        assert_eq!(template.to_hex(), TEMPLATE_HEX);
        assert_eq!(rest.to_hex(), "7576a9148fe80c75c9560e8b56ed64ea3c26e18d2c52211b88ac");

        assert!(split_push_tx_from_locking_script(&address.to_locking_script()).is_none());
    }

    /// The on-chain split helper is push 89, OP_SPLIT, OP_SWAP.
    #[test]
    fn test_append_split_push_tx() {
        let mut script = Script::new();
        append_split_push_tx(&mut script).unwrap();
        assert_eq!(script.to_hex(), "01597f7c");
    }
}
