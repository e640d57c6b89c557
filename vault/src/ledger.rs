//! # Per-Asset Ledger
//!
//! An [`AssetLedger`] keeps the books for a single asset: one
//! [`FeeAccumulator`] per depositor, plus one aggregate accumulator — the
//! *owner pot* — whose principal is always the sum of the depositor
//! principals. Both views are charged the same rate and flushed at the
//! same timestamps, so the fee owed across all depositors and the fee the
//! owner can collect stay reconciled by linearity: fee is linear in
//! principal, and equal principals under equal rates over equal intervals
//! accrue equal fees.
//!
//! Withdrawals are full-position only. The withdrawal fee is not paid by
//! the depositor separately — it is the slice of their principal that
//! stays behind in the vault. On departure that slice is reclassified:
//! the pot's realized share of it moves out of the accruing accumulator
//! into the plain `collectible` balance. Departed fees must not occupy
//! the pot's fee-saturation headroom, or a departure large enough to
//! exhaust it would silently stop realizing the remaining depositors'
//! accrual and strand their fees in custody.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accrual::{AccrualError, FeeAccumulator, FeeRate};
use crate::asset::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The depositor holds no active position for this asset.
    #[error("nothing to withdraw for depositor {depositor}")]
    NothingToWithdraw {
        /// The depositor whose withdrawal was rejected.
        depositor: Address,
    },

    /// An accumulator operation failed (overflow, insufficient principal).
    #[error("accrual error: {0}")]
    Accrual(#[from] AccrualError),
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

/// The outcome of a full withdrawal: what leaves the vault and what stays
/// behind as the owner's fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Amount paid out to the depositor.
    pub payout: u64,

    /// Fee retained for the owner. `payout + fee` equals the principal
    /// the depositor had on the books.
    pub fee: u64,
}

// ---------------------------------------------------------------------------
// AssetLedger
// ---------------------------------------------------------------------------

/// Fee-accrual bookkeeping for one asset.
///
/// Reconciliation invariant: whenever all accumulators are flushed to a
/// common checkpoint, `owner_pot.principal() == Σ depositor principals`,
/// and the owner's total claim (`collectible` plus the pot's fee) equals
/// the sum of active depositor fees plus uncollected departed fees
/// (within one smallest unit of rounding per depositor).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetLedger {
    /// The rate applied to every accumulator in this ledger.
    rate: FeeRate,

    /// Aggregate accumulator over the *active* principal. Its realized
    /// fee covers only depositors still in the books; departed fees move
    /// to `collectible` so they never pin the pot's saturation headroom.
    owner_pot: FeeAccumulator,

    /// Fees left behind by departed depositors, awaiting collection.
    /// Plain value — no longer accruing, no longer clamped.
    collectible: u64,

    /// Per-depositor accumulators. Entries persist at zero after a full
    /// withdrawal — positions are reset, never destroyed.
    depositors: HashMap<Address, FeeAccumulator>,
}

impl AssetLedger {
    /// Creates an empty ledger checkpointed at `now`.
    pub fn new(rate: FeeRate, now: DateTime<Utc>) -> Self {
        Self {
            rate,
            owner_pot: FeeAccumulator::new(rate, now),
            collectible: 0,
            depositors: HashMap::new(),
        }
    }

    /// The rate this ledger charges.
    pub fn rate(&self) -> FeeRate {
        self.rate
    }

    /// Records a deposit for `depositor`, updating the depositor's
    /// accumulator and the owner pot in lockstep at the same `now`.
    ///
    /// # Errors
    ///
    /// [`AccrualError::Overflow`] if the aggregate principal would overflow.
    /// The owner pot is updated first: its principal is the sum of all
    /// depositor principals, so its overflow check dominates the
    /// per-depositor one and a failure leaves both views untouched.
    pub fn deposit(
        &mut self,
        depositor: Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.owner_pot.increment(amount, now)?;
        self.depositors
            .entry(depositor)
            .or_insert_with(|| FeeAccumulator::new(self.rate, now))
            .increment(amount, now)?;
        Ok(())
    }

    /// Closes the depositor's entire position.
    ///
    /// The depositor's accumulator is flushed; its accrued fee (clamped at
    /// the principal by construction) stays in the vault for the owner and
    /// the remainder is the payout. The owner pot sheds the departed
    /// principal, and the fee it realized on the departing depositor's
    /// behalf is released into `collectible` — the reclassification from
    /// "accruing" to "collectible". Collections that already took part of
    /// that fee are accounted for: only what the pot still holds moves.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NothingToWithdraw`] if the depositor has no active
    /// position.
    pub fn withdraw(
        &mut self,
        depositor: Address,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, LedgerError> {
        let account = self
            .depositors
            .get_mut(&depositor)
            .filter(|acc| acc.principal() > 0)
            .ok_or(LedgerError::NothingToWithdraw { depositor })?;

        account.touch(now);
        let principal = account.principal();
        let fee = account.accrued_fee();
        let payout = account.decrement(principal, now)?;
        account.consume_fee(now);

        self.owner_pot.decrement(principal, now)?;
        let released = self.owner_pot.release_fee(fee, now);
        self.collectible = self.collectible.saturating_add(released);

        debug_assert_eq!(payout + fee, principal);
        Ok(Withdrawal { payout, fee })
    }

    /// Consumes everything the owner can take: departed-depositor fees
    /// plus the pot's realized accrual. Returns the total.
    pub fn collect_fees(&mut self, now: DateTime<Utc>) -> u64 {
        let realized = self.owner_pot.consume_fee(now);
        std::mem::take(&mut self.collectible).saturating_add(realized)
    }

    /// Flushes every accumulator to a common checkpoint. Values are
    /// unchanged (flushing only realizes what the views already report);
    /// useful before snapshotting state.
    pub fn touch_all(&mut self, now: DateTime<Utc>) {
        self.owner_pot.touch(now);
        for account in self.depositors.values_mut() {
            account.touch(now);
        }
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Principal currently deposited by `depositor`.
    pub fn deposited_for(&self, depositor: &Address) -> u64 {
        self.depositors
            .get(depositor)
            .map(|acc| acc.principal())
            .unwrap_or(0)
    }

    /// Fee accrued on the depositor's position at `now`.
    pub fn depositor_fee(&self, depositor: &Address, now: DateTime<Utc>) -> u64 {
        self.depositors
            .get(depositor)
            .map(|acc| acc.current_fee(now))
            .unwrap_or(0)
    }

    /// What the depositor would receive from a withdrawal at `now`.
    pub fn available_for_withdrawal(&self, depositor: &Address, now: DateTime<Utc>) -> u64 {
        self.depositors
            .get(depositor)
            .map(|acc| acc.withdrawable(now))
            .unwrap_or(0)
    }

    /// Fee the owner could collect at `now`: departed-depositor fees plus
    /// the pot's accrual over the active principal.
    pub fn owner_fee(&self, now: DateTime<Utc>) -> u64 {
        self.collectible
            .saturating_add(self.owner_pot.current_fee(now))
    }

    /// Aggregate principal across all depositors.
    pub fn total_principal(&self) -> u64 {
        self.owner_pot.principal()
    }

    /// Everything the vault owes against this asset at `now`: every
    /// depositor's withdrawable value plus the owner's collectible fee.
    /// The custody balance must never fall below this.
    pub fn liabilities(&self, now: DateTime<Utc>) -> u64 {
        let depositors: u64 = self
            .depositors
            .values()
            .map(|acc| acc.withdrawable(now))
            .sum();
        depositors.saturating_add(self.owner_fee(now))
    }

    /// Number of depositors with an active (non-zero) position.
    pub fn active_depositors(&self) -> usize {
        self.depositors
            .values()
            .filter(|acc| acc.principal() > 0)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
