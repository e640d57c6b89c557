//! # Checkpointed Fee Accrual
//!
//! The interest core of the vault. A [`FeeAccumulator`] tracks a principal
//! amount and the withdrawal fee owed on it, charged as *simple* interest:
//!
//! ```text
//! fee(principal, dt) = principal * fee_per_second_scaled * dt / resolution
//! ```
//!
//! Fees are never written per second. Instead the accumulator stores the
//! timestamp of its last reconciliation (the checkpoint) and computes the
//! pending fee lazily from elapsed time whenever it is read. Every
//! principal-changing or fee-consuming operation first *flushes*: the
//! pending fee is folded into `accrued_fee` and the checkpoint advances.
//! Between checkpoints the principal is constant, so the lazy computation
//! is exact for the simple-interest model no matter how much wall-clock
//! time passed.
//!
//! ## Saturation
//!
//! The fee charged against a principal can never exceed that principal —
//! a depositor's position decays to zero, not below it. Newly accruing fee
//! is therefore clamped to the remaining headroom `principal - accrued_fee`.
//! Fee that a flush has already realized is sticky: it survives principal
//! decrements. A holder that wants realized fee out of the clamp's way
//! without collecting it takes it through [`FeeAccumulator::release_fee`] —
//! the ledger does this when a depositor departs, so the owner pot's
//! headroom keeps tracking active principal only (see [`crate::ledger`]).
//!
//! Principal arithmetic never saturates: overflow on `increment` is a hard
//! error that leaves the accumulator untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during accumulator operations.
#[derive(Debug, Error)]
pub enum AccrualError {
    /// Adding to the principal would overflow the numeric range.
    #[error("principal overflow: current {current}, added {added}")]
    Overflow {
        /// Principal before the rejected addition.
        current: u64,
        /// The amount that caused the overflow.
        added: u64,
    },

    /// Attempted to remove more principal than is tracked.
    #[error("insufficient principal: available {available}, requested {requested}")]
    InsufficientPrincipal {
        /// Principal currently tracked.
        available: u64,
        /// The amount that was requested.
        requested: u64,
    },
}

// ---------------------------------------------------------------------------
// FeeRate
// ---------------------------------------------------------------------------

/// An immutable fee rate: the fraction of principal charged per second of
/// custody, expressed as `fee_per_second_scaled / resolution`.
///
/// Both components are fixed at construction. Amounts are `u64`; the rate
/// components are `u128` so the fee product can be carried at full
/// precision before the resolution division.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate {
    /// Scaled per-second fee numerator.
    pub fee_per_second_scaled: u128,

    /// Fixed-point denominator (e.g. 10^18).
    pub resolution: u128,
}

impl FeeRate {
    /// Creates a rate. `resolution` must be non-zero.
    pub fn new(fee_per_second_scaled: u128, resolution: u128) -> Self {
        assert!(resolution > 0, "fee rate resolution must be non-zero");
        Self {
            fee_per_second_scaled,
            resolution,
        }
    }

    /// Raw simple-interest fee on `principal` over `elapsed_secs`.
    ///
    /// Saturates at `u64::MAX` when the true value cannot be represented.
    /// With `resolution < u128::MAX / u64::MAX` (which the default 10^18
    /// satisfies), a `u128` product overflow implies the divided result
    /// exceeds `u64::MAX`, so saturating loses nothing the caller's
    /// headroom clamp wouldn't discard anyway.
    pub fn pending_fee(&self, principal: u64, elapsed_secs: u64) -> u64 {
        let product = (principal as u128)
            .checked_mul(self.fee_per_second_scaled)
            .and_then(|v| v.checked_mul(elapsed_secs as u128));

        match product {
            Some(scaled) => u64::try_from(scaled / self.resolution).unwrap_or(u64::MAX),
            None => u64::MAX,
        }
    }
}

/// Whole seconds from `from` to `to`, clamped at zero for non-monotonic
/// inputs so a stale timestamp can never un-accrue fees.
fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from).num_seconds().max(0) as u64
}

// ---------------------------------------------------------------------------
// FeeAccumulator
// ---------------------------------------------------------------------------

/// A checkpointed simple-interest accumulator over one principal.
///
/// Created in the empty state (zero principal, zero fee) at its first
/// activity and mutated by every principal-changing or fee-consuming
/// operation. It is never destroyed — a fully withdrawn position simply
/// persists at zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeAccumulator {
    /// The rate this accumulator charges. Fixed at construction.
    rate: FeeRate,

    /// Principal currently subject to accrual, exclusive of accrued fee.
    principal: u64,

    /// Fee realized by flushes up to `checkpoint`.
    accrued_fee: u64,

    /// Timestamp of the last flush. Monotonically non-decreasing.
    checkpoint: DateTime<Utc>,
}

impl FeeAccumulator {
    /// Creates an empty accumulator checkpointed at `now`.
    pub fn new(rate: FeeRate, now: DateTime<Utc>) -> Self {
        Self {
            rate,
            principal: 0,
            accrued_fee: 0,
            checkpoint: now,
        }
    }

    /// The rate charged by this accumulator.
    pub fn rate(&self) -> FeeRate {
        self.rate
    }

    /// Principal currently subject to accrual.
    pub fn principal(&self) -> u64 {
        self.principal
    }

    /// Fee realized as of the last flush. Prefer [`current_fee`](Self::current_fee)
    /// for reads — this does not include time elapsed since the checkpoint.
    pub fn accrued_fee(&self) -> u64 {
        self.accrued_fee
    }

    /// Timestamp of the last flush.
    pub fn checkpoint(&self) -> DateTime<Utc> {
        self.checkpoint
    }

    /// Returns `true` if nothing is tracked: no principal, no fee owed.
    pub fn is_empty(&self) -> bool {
        self.principal == 0 && self.accrued_fee == 0
    }

    /// The total fee owed at `now`. Pure view, never mutates.
    ///
    /// Realized fee plus the pending accrual since the checkpoint, with the
    /// pending part clamped to the headroom `principal - accrued_fee`.
    pub fn current_fee(&self, now: DateTime<Utc>) -> u64 {
        let headroom = self.principal.saturating_sub(self.accrued_fee);
        let pending = self
            .rate
            .pending_fee(self.principal, elapsed_secs(self.checkpoint, now))
            .min(headroom);
        // Cannot overflow: pending <= headroom.
        self.accrued_fee + pending
    }

    /// What the position holder could take out at `now`: principal minus
    /// the fee owed on it. Pure view.
    pub fn withdrawable(&self, now: DateTime<Utc>) -> u64 {
        self.principal.saturating_sub(self.current_fee(now))
    }

    /// Flushes pending accrual into `accrued_fee` and advances the
    /// checkpoint. Idempotent when called twice at the same `now`; the
    /// checkpoint never moves backward.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.accrued_fee = self.current_fee(now);
        if now > self.checkpoint {
            self.checkpoint = now;
        }
    }

    /// Adds `amount` to the principal, flushing first so the fee accrued
    /// so far is computed against the old principal.
    ///
    /// # Errors
    ///
    /// [`AccrualError::Overflow`] if the addition would overflow; the
    /// accumulator is left untouched (the check precedes the flush).
    pub fn increment(&mut self, amount: u64, now: DateTime<Utc>) -> Result<(), AccrualError> {
        let new_principal =
            self.principal
                .checked_add(amount)
                .ok_or(AccrualError::Overflow {
                    current: self.principal,
                    added: amount,
                })?;
        self.touch(now);
        self.principal = new_principal;
        Ok(())
    }

    /// Removes `amount` from the principal, flushing first.
    ///
    /// Returns the withdrawable value `principal - accrued_fee` as it stood
    /// *before* the removal. The realized fee is retained: a position
    /// drained to zero principal stops accruing but still owes what it
    /// accrued.
    ///
    /// # Errors
    ///
    /// [`AccrualError::InsufficientPrincipal`] if `amount` exceeds the
    /// tracked principal; the accumulator is left untouched.
    pub fn decrement(&mut self, amount: u64, now: DateTime<Utc>) -> Result<u64, AccrualError> {
        if amount > self.principal {
            return Err(AccrualError::InsufficientPrincipal {
                available: self.principal,
                requested: amount,
            });
        }
        self.touch(now);
        let withdrawable = self.principal.saturating_sub(self.accrued_fee);
        self.principal -= amount;
        Ok(withdrawable)
    }

    /// Flushes, then takes the entire realized fee, resetting it to zero.
    pub fn consume_fee(&mut self, now: DateTime<Utc>) -> u64 {
        self.touch(now);
        std::mem::take(&mut self.accrued_fee)
    }

    /// Flushes, then moves up to `amount` out of the realized fee,
    /// returning what was actually released.
    ///
    /// Releasing frees headroom: fee taken out this way no longer counts
    /// against the `principal - accrued_fee` clamp, so the accumulator
    /// keeps realizing accrual on whatever principal remains.
    pub fn release_fee(&mut self, amount: u64, now: DateTime<Utc>) -> u64 {
        self.touch(now);
        let released = amount.min(self.accrued_fee);
        self.accrued_fee -= released;
        released
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
