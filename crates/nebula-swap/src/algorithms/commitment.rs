//! # Commitment Generation
//!
//! Secret, hashlock and timelock derivation for a new swap.

use crate::config::TimelockPolicy;
use crate::domain::{
    invariant_timelock_ordering, Commitment, SecureSecret, SwapError, TimelockPair, SECS_PER_HOUR,
};
use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a 32-byte secret from the operating system CSPRNG.
pub fn generate_secret() -> SecureSecret {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let secret = SecureSecret::new(bytes);
    zeroize::Zeroize::zeroize(&mut bytes);
    secret
}

/// Check a requested timelock against the policy bounds.
pub fn validate_timelock_hours(hours: u64, policy: &TimelockPolicy) -> Result<(), SwapError> {
    if hours < policy.min_hours || hours > policy.max_hours {
        return Err(SwapError::InvalidTimelock(format!(
            "{hours}h outside [{}h, {}h]",
            policy.min_hours, policy.max_hours
        )));
    }
    Ok(())
}

/// Derive both timelocks from chain time `now`.
///
/// `source = now + hours`, and the counterparty must expire at or before the
/// midpoint of the window left after the margin, so
/// `source > target + margin` holds for every accepted duration.
pub fn derive_timelocks(now: u64, hours: u64, margin_secs: u64) -> Result<TimelockPair, SwapError> {
    let duration = hours
        .checked_mul(SECS_PER_HOUR)
        .ok_or_else(|| SwapError::InvalidTimelock(format!("{hours}h overflows")))?;
    if duration <= margin_secs {
        return Err(SwapError::InvalidTimelock(format!(
            "{hours}h does not exceed the {margin_secs}s safety margin"
        )));
    }

    let source = now
        .checked_add(duration)
        .ok_or_else(|| SwapError::InvalidTimelock("timelock overflows".to_string()))?;
    let target = now + (duration - margin_secs) / 2;

    invariant_timelock_ordering(source, target, margin_secs)?;
    Ok(TimelockPair { source, target })
}

/// Generate a fresh commitment for a swap starting at chain time `now`.
pub fn generate_commitment(
    now: u64,
    hours: u64,
    policy: &TimelockPolicy,
) -> Result<Commitment, SwapError> {
    validate_timelock_hours(hours, policy)?;
    let timelocks = derive_timelocks(now, hours, policy.safety_margin_secs)?;
    Ok(Commitment::new(generate_secret(), timelocks))
}
