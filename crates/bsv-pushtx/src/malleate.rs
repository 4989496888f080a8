//! Low-S lock-time search.
//!
//! The push-tx template signs every preimage with the same nonce and a
//! signature whose `s` is the digest plus 2^248. That is only a valid low-S
//! signature while the digest's first byte stays below 0x7e, so the lock
//! time is stepped through 1, 2, 3... until the preimage hashes low.
//!
//! Lock time only restricts a transaction when some input has a non-final
//! sequence number, so with final sequences the search has no effect on when
//! the transaction can be mined.

use bsv_primitives::hash::sha256d;

use crate::config::DEFAULT_MAX_MALLEATION_ATTEMPTS;
use crate::preimage::Preimage;
use crate::PushTxError;

/// A preimage is low-S when its digest's first byte is below this.
pub const LOW_S_THRESHOLD: u8 = 0x7e;

/// Result of a successful low-S search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowSPreimage {
    /// The low-S preimage bytes.
    pub preimage: Vec<u8>,
    /// Malleation steps taken; zero when the input was already low-S.
    pub counter: u32,
    lock_time: u32,
}

impl LowSPreimage {
    /// Lock time committed in `preimage`.
    ///
    /// Equals `counter` when malleation happened, otherwise the original
    /// lock time. This, not `counter`, is what the transaction must carry.
    pub fn lock_time(&self) -> u32 {
        self.lock_time
    }
}

/// Check whether a preimage's double SHA-256 starts below `LOW_S_THRESHOLD`.
pub fn is_low_s(preimage: &[u8]) -> bool {
    sha256d(preimage)[0] < LOW_S_THRESHOLD
}

/// Advance the malleation counter and write it into a lock time field.
///
/// # Arguments
/// * `lock_time` - The current little-endian lock time field.
/// * `counter` - Steps taken so far.
///
/// # Returns
/// The overwritten field and the new counter (`counter + 1`).
pub fn malleate_lock_time(mut lock_time: [u8; 4], counter: u32) -> ([u8; 4], u32) {
    let next = counter.saturating_add(1);
    lock_time.copy_from_slice(&next.to_le_bytes());
    (lock_time, next)
}

/// Search for a low-S lock time with the default attempt cap.
pub fn check_for_low_s(preimage: &[u8]) -> Result<LowSPreimage, PushTxError> {
    check_for_low_s_with_limit(preimage, DEFAULT_MAX_MALLEATION_ATTEMPTS)
}

/// Search for a low-S lock time, giving up after `max_attempts` steps.
///
/// # Arguments
/// * `preimage` - Raw preimage bytes.
/// * `max_attempts` - Maximum number of lock times to try.
///
/// # Returns
/// The low-S preimage with its counter, `MalformedPreimage` if the input
/// does not parse, or `LowSSearchExhausted` past the cap.
pub fn check_for_low_s_with_limit(
    preimage: &[u8],
    max_attempts: u32,
) -> Result<LowSPreimage, PushTxError> {
    let mut parsed = Preimage::from_bytes(preimage)?;
    let mut current = preimage.to_vec();
    let mut counter = 0u32;

    while !is_low_s(&current) {
        if counter >= max_attempts {
            tracing::warn!("low-S search gave up after {} attempts", counter);
            return Err(PushTxError::LowSSearchExhausted { attempts: counter });
        }
        let (lock_time, next) = malleate_lock_time(parsed.lock_time, counter);
        parsed.lock_time = lock_time;
        counter = next;
        current = parsed.to_bytes();
    }

    tracing::debug!("low-S preimage found after {} attempts, lock time {}", counter, parsed.lock_time());
    Ok(LowSPreimage { preimage: current, counter, lock_time: parsed.lock_time() })
}
