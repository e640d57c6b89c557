//! # Protocol Constants
//!
//! Every magic number in timevault lives here. The default withdrawal
//! rate is 0.005% of principal per day of custody, scaled to a fixed
//! 18-decimal resolution so the per-second figure stays an integer.

use crate::accrual::FeeRate;

/// Seconds in one day. Fee rates are quoted per day and charged per second.
pub const DAY_SECONDS: u64 = 86_400;

/// Fixed-point resolution for the scaled per-second fee: 10^18.
///
/// Chosen so that `resolution < u128::MAX / u64::MAX`, which makes the
/// fee formula's overflow behavior provably safe to saturate — see
/// [`FeeRate::pending_fee`](crate::accrual::FeeRate::pending_fee).
pub const SCALE_RESOLUTION: u128 = 1_000_000_000_000_000_000;

/// Default withdrawal fee per second of custody, scaled by
/// [`SCALE_RESOLUTION`].
///
/// Derived from a daily fee of 0.005%:
/// `0.00005 * 10^18 / 86_400 = 578_703_703` (truncated).
pub const WITHDRAWAL_FEE_PER_SECOND_SCALED: u128 = 578_703_703;

/// The default vault rate: 0.005% of principal per day.
pub fn default_rate() -> FeeRate {
    FeeRate::new(WITHDRAWAL_FEE_PER_SECOND_SCALED, SCALE_RESOLUTION)
}
