//! ECDSA signature with strict DER serialization.
//!
//! Signatures are produced with RFC6979 deterministic nonces and always
//! serialized low-S (BIP-62), which is what script `OP_CHECKSIG` accepts.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// The secp256k1 curve order N.
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// N / 2, the largest S accepted as low-S.
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// An ECDSA signature with 32-byte big-endian R and S components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S values.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// The R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse a DER-encoded signature.
    ///
    /// Expected format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes, without a sighash byte.
    ///
    /// # Returns
    /// `Ok(Signature)`, or an error if the encoding is malformed or either
    /// integer is zero or not below the curve order.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let malformed = |why: &str| PrimitivesError::InvalidSignature(format!("malformed signature: {}", why));

        if bytes.len() < 8 {
            return Err(malformed("too short"));
        }
        if bytes[0] != 0x30 {
            return Err(malformed("no header magic"));
        }
        let total = bytes[1] as usize + 2;
        if total > bytes.len() {
            return Err(malformed("bad length"));
        }
        let data = &bytes[..total];

        let (r_bytes, rest) = read_der_int(&data[2..]).ok_or_else(|| malformed("bad R"))?;
        let (s_bytes, rest) = read_der_int(rest).ok_or_else(|| malformed("bad S"))?;
        if !rest.is_empty() {
            return Err(malformed("trailing bytes"));
        }

        let r = to_32_bytes(r_bytes)?;
        let s = to_32_bytes(s_bytes)?;
        for (name, v) in [("R", &r), ("S", &s)] {
            if v.iter().all(|&b| b == 0) {
                return Err(PrimitivesError::InvalidSignature(format!("signature {} is zero", name)));
            }
            if v >= &CURVE_ORDER {
                return Err(PrimitivesError::InvalidSignature(format!(
                    "signature {} is >= curve.N",
                    name
                )));
            }
        }
        Ok(Signature { r, s })
    }

    /// Serialize the signature as DER, normalizing S to the lower half of
    /// the curve order.
    ///
    /// # Returns
    /// `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    pub fn to_der(&self) -> Vec<u8> {
        let s = if self.s > HALF_ORDER { order_minus(&self.s) } else { self.s };
        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&s);

        let mut out = Vec::with_capacity(6 + rb.len() + sb.len());
        out.push(0x30);
        out.push((4 + rb.len() + sb.len()) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Sign a digest with RFC6979 deterministic nonces.
    ///
    /// # Arguments
    /// * `digest` - The digest to sign; normalized to 32 bytes.
    /// * `priv_key` - The signing key.
    ///
    /// # Returns
    /// A low-S `Signature`.
    pub fn sign(digest: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let prehash = normalize_digest(digest);
        let (sig, _recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = sig.split_bytes();
        let r: [u8; 32] = r_bytes.into();
        let mut s: [u8; 32] = s_bytes.into();
        if s > HALF_ORDER {
            s = order_minus(&s);
        }
        Ok(Signature { r, s })
    }

    /// Verify this signature over a digest.
    ///
    /// # Arguments
    /// * `digest` - The signed digest; normalized to 32 bytes.
    /// * `pub_key` - The key to verify against.
    ///
    /// # Returns
    /// `true` if the signature is valid.
    pub fn verify(&self, digest: &[u8], pub_key: &PublicKey) -> bool {
        let sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        pub_key
            .verifying_key()
            .verify_prehash(&normalize_digest(digest), &sig)
            .is_ok()
    }
}

/// Pad (left, with zeros) or truncate a digest to 32 bytes.
fn normalize_digest(digest: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    if digest.len() >= 32 {
        out.copy_from_slice(&digest[..32]);
    } else {
        out[32 - digest.len()..].copy_from_slice(digest);
    }
    out
}

/// Read one DER INTEGER (`0x02 <len> <bytes>`) and return it with the rest.
fn read_der_int(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if data.len() < 2 || data[0] != 0x02 {
        return None;
    }
    let len = data[1] as usize;
    if len == 0 || data.len() < 2 + len {
        return None;
    }
    Some((&data[2..2 + len], &data[2 + len..]))
}

/// Strip leading zeros and prepend 0x00 when the high bit is set.
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Left-pad a big-endian integer to 32 bytes.
fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "integer value too large for 32 bytes".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

/// Compute N - v for a big-endian v < N.
fn order_minus(v: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = CURVE_ORDER[i] as i16 - v[i] as i16 - borrow;
        borrow = if diff < 0 {
            diff += 256;
            1
        } else {
            0
        };
        out[i] = diff as u8;
    }
    out
}
