//! # Vault Orchestrator
//!
//! [`Vault`] is the public face of the system: it validates inputs, moves
//! funds through its [`TransferAdapter`], and keeps one [`AssetLedger`]
//! per asset. A single privileged owner, fixed at construction, may
//! collect the accrued fees — there is no ambient authority, every
//! privileged call names its caller and is checked against that field.
//!
//! Operations are all-or-nothing. Validation happens before any funds
//! move; ledger bookkeeping happens after funds are secured, and the one
//! failure that can occur at that point (aggregate principal overflow)
//! returns the pulled funds before surfacing the error.
//!
//! ## Native vs. token deposits
//!
//! The deposit flow is selected by comparing the asset against
//! [`Address::NATIVE`]. A native deposit carries its value attached to
//! the call: the attached amount must cover the deposit and any excess is
//! pushed straight back to the sender. A token deposit must attach no
//! native value and is pulled through the adapter instead.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::accrual::FeeRate;
use crate::asset::Address;
use crate::events::VaultEvent;
use crate::ledger::{AssetLedger, LedgerError, Withdrawal};
use crate::transfer::{TransferAdapter, TransferError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The zero address was supplied where a real asset or recipient is
    /// required.
    #[error("zero address is not a valid asset or recipient")]
    ZeroAddress,

    /// Zero-amount deposits are rejected — use the ledger views to
    /// observe state without mutating it.
    #[error("zero-amount deposits are not permitted")]
    ZeroAmount,

    /// A native deposit did not attach enough value to cover the amount.
    #[error("native deposit underfunded: attached {attached}, required {required}")]
    NativeDepositUnderfunded {
        /// Value attached to the call.
        attached: u64,
        /// The deposit amount that must be covered.
        required: u64,
    },

    /// A token deposit attached native value, which has no destination.
    #[error("non-native deposit must not attach native value (attached {attached})")]
    NonNativeDepositMustNotSendNative {
        /// The attached value that was rejected.
        attached: u64,
    },

    /// A privileged operation was attempted by someone other than the owner.
    #[error("caller {caller} is not the vault owner")]
    Unauthorized {
        /// Who attempted the call.
        caller: Address,
    },

    /// A ledger operation failed (no position, overflow).
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Moving funds failed (insufficient balance or custody).
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Custodial multi-asset vault charging time-proportional withdrawal fees.
///
/// Every operation takes the current timestamp as an argument; the vault
/// never reads a clock. Callers must serialize operations per asset —
/// the vault is sequential state-transition logic, not a concurrent
/// service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vault<T> {
    /// The privileged principal allowed to collect fees.
    owner: Address,

    /// The withdrawal fee rate, fixed at construction and shared by every
    /// ledger.
    rate: FeeRate,

    /// One ledger per asset, created lazily on first deposit.
    ledgers: HashMap<Address, AssetLedger>,

    /// Moves funds into and out of custody.
    transfers: T,

    /// Log of completed operations, drained by the embedder.
    events: Vec<VaultEvent>,
}

impl<T: TransferAdapter> Vault<T> {
    /// Creates a vault owned by `owner`, charging `rate`, settling
    /// through `transfers`.
    pub fn new(owner: Address, rate: FeeRate, transfers: T) -> Self {
        Self {
            owner,
            rate,
            ledgers: HashMap::new(),
            transfers,
            events: Vec::new(),
        }
    }

    /// The privileged fee collector.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The immutable `(fee_per_second_scaled, resolution)` rate pair.
    pub fn rate(&self) -> FeeRate {
        self.rate
    }

    /// Read access to the transfer adapter.
    pub fn transfers(&self) -> &T {
        &self.transfers
    }

    /// Mutable access to the transfer adapter (funding test accounts,
    /// reconciling external settlement).
    pub fn transfers_mut(&mut self) -> &mut T {
        &mut self.transfers
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Deposits `amount` of `asset` for `depositor`.
    ///
    /// `attached_native` is the native value carried by the call. For a
    /// native-asset deposit it must cover `amount` and the excess is
    /// returned to the depositor; for a token deposit it must be zero and
    /// the amount is pulled through the adapter.
    ///
    /// # Errors
    ///
    /// Input validation (`ZeroAddress`, `ZeroAmount`, value rules) rejects
    /// before any funds move. A pull failure leaves everything untouched.
    /// A ledger overflow after the pull returns the funds first.
    pub fn deposit(
        &mut self,
        depositor: Address,
        asset: Address,
        amount: u64,
        attached_native: u64,
        now: DateTime<Utc>,
    ) -> Result<(), VaultError> {
        if depositor.is_zero() || asset.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        if asset.is_native() {
            if attached_native < amount {
                return Err(VaultError::NativeDepositUnderfunded {
                    attached: attached_native,
                    required: amount,
                });
            }
            self.transfers.pull(asset, depositor, attached_native)?;
            let excess = attached_native - amount;
            if excess > 0 {
                self.transfers.push(asset, depositor, excess)?;
            }
        } else {
            if attached_native != 0 {
                return Err(VaultError::NonNativeDepositMustNotSendNative {
                    attached: attached_native,
                });
            }
            self.transfers.pull(asset, depositor, amount)?;
        }

        let rate = self.rate;
        let ledger = self
            .ledgers
            .entry(asset)
            .or_insert_with(|| AssetLedger::new(rate, now));

        if let Err(err) = ledger.deposit(depositor, amount, now) {
            // Aggregate overflow after the funds arrived: hand them back.
            // The bookkeeping failure is the one the caller must see; if
            // the refund itself fails the funds sit in custody with no
            // booked position, which is worth a loud log line.
            if let Err(refund_err) = self.transfers.push(asset, depositor, amount) {
                error!(
                    asset = %asset,
                    depositor = %depositor,
                    amount,
                    error = %refund_err,
                    "deposit refund failed, funds remain in custody"
                );
            }
            return Err(err.into());
        }

        info!(asset = %asset, depositor = %depositor, amount, "deposit received");
        self.events.push(VaultEvent::DepositReceived {
            asset,
            depositor,
            amount,
            at: now,
        });
        Ok(())
    }

    /// Withdraws the depositor's entire position in `asset`.
    ///
    /// The accrued fee stays behind for the owner; the rest is pushed to
    /// the depositor. Partial withdrawals are not supported.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NothingToWithdraw`] (via [`VaultError::Ledger`]) if
    /// the depositor has no active position.
    pub fn withdraw(
        &mut self,
        depositor: Address,
        asset: Address,
        now: DateTime<Utc>,
    ) -> Result<Withdrawal, VaultError> {
        let ledger = self
            .ledgers
            .get_mut(&asset)
            .ok_or(LedgerError::NothingToWithdraw { depositor })?;

        if ledger.deposited_for(&depositor) == 0 {
            return Err(LedgerError::NothingToWithdraw { depositor }.into());
        }

        // Push before mutating the books: the payout view and the ledger
        // mutation are the same pure function of (state, now), so a
        // transfer failure rejects the whole operation with nothing moved.
        let payout = ledger.available_for_withdrawal(&depositor, now);
        self.transfers.push(asset, depositor, payout)?;

        let withdrawal = ledger.withdraw(depositor, now)?;
        debug_assert_eq!(withdrawal.payout, payout);

        info!(
            asset = %asset,
            depositor = %depositor,
            payout = withdrawal.payout,
            fee = withdrawal.fee,
            "withdrawal executed"
        );
        self.events.push(VaultEvent::WithdrawalExecuted {
            asset,
            depositor,
            payout: withdrawal.payout,
            fee: withdrawal.fee,
            at: now,
        });
        Ok(withdrawal)
    }

    /// Collects the accrued owner fees for `asset` and pushes them to `to`.
    ///
    /// Owner-only. An asset with no ledger collects zero.
    ///
    /// # Errors
    ///
    /// [`VaultError::Unauthorized`] unless `caller` is the owner;
    /// [`VaultError::ZeroAddress`] if `to` is the zero address.
    pub fn collect_fees(
        &mut self,
        caller: Address,
        asset: Address,
        to: Address,
        now: DateTime<Utc>,
    ) -> Result<u64, VaultError> {
        if caller != self.owner {
            return Err(VaultError::Unauthorized { caller });
        }
        if to.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        // Same ordering rationale as `withdraw`: view, push, then consume.
        let amount = self
            .ledgers
            .get(&asset)
            .map(|ledger| ledger.owner_fee(now))
            .unwrap_or(0);
        self.transfers.push(asset, to, amount)?;

        if let Some(ledger) = self.ledgers.get_mut(&asset) {
            let consumed = ledger.collect_fees(now);
            debug_assert_eq!(consumed, amount);
        }

        info!(asset = %asset, to = %to, amount, "fees collected");
        self.events.push(VaultEvent::FeesCollected {
            asset,
            to,
            amount,
            at: now,
        });
        Ok(amount)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Principal currently deposited by `depositor` in `asset`.
    pub fn deposited_for(&self, depositor: Address, asset: Address) -> u64 {
        self.ledgers
            .get(&asset)
            .map(|ledger| ledger.deposited_for(&depositor))
            .unwrap_or(0)
    }

    /// Fee accrued on the depositor's position at `now`.
    pub fn current_depositor_fee(
        &self,
        depositor: Address,
        asset: Address,
        now: DateTime<Utc>,
    ) -> u64 {
        self.ledgers
            .get(&asset)
            .map(|ledger| ledger.depositor_fee(&depositor, now))
            .unwrap_or(0)
    }

    /// What a withdrawal at `now` would pay out.
    pub fn available_for_withdrawal(
        &self,
        depositor: Address,
        asset: Address,
        now: DateTime<Utc>,
    ) -> u64 {
        self.ledgers
            .get(&asset)
            .map(|ledger| ledger.available_for_withdrawal(&depositor, now))
            .unwrap_or(0)
    }

    /// Fee the owner could collect for `asset` at `now`.
    pub fn current_owner_fee(&self, asset: Address, now: DateTime<Utc>) -> u64 {
        self.ledgers
            .get(&asset)
            .map(|ledger| ledger.owner_fee(now))
            .unwrap_or(0)
    }

    /// Everything the vault owes against `asset` at `now`. Custody must
    /// never fall below this — the solvency bound.
    pub fn liabilities(&self, asset: Address, now: DateTime<Utc>) -> u64 {
        self.ledgers
            .get(&asset)
            .map(|ledger| ledger.liabilities(now))
            .unwrap_or(0)
    }

    /// Amount of `asset` actually in custody.
    pub fn held(&self, asset: Address) -> u64 {
        self.transfers.held(asset)
    }

    /// Completed-operation log, oldest first.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Drains and returns the event log.
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_rate;
    use crate::transfer::SettlementBank;
    use chrono::Duration;

    fn owner() -> Address {
        Address::from_bytes([0x01; 20])
    }

    fn alice() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    fn token() -> Address {
        Address::from_bytes([0x11; 20])
    }

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    fn funded_vault() -> Vault<SettlementBank> {
        let mut bank = SettlementBank::new();
        bank.mint(alice(), Address::NATIVE, 1_000_000);
        bank.mint(alice(), token(), 1_000_000);
        Vault::new(owner(), default_rate(), bank)
    }

    #[test]
    fn native_deposit_moves_exact_amount() {
        let mut vault = funded_vault();
        let now = t0();

        vault
            .deposit(alice(), Address::NATIVE, 1_000, 1_000, now)
            .unwrap();

        assert_eq!(vault.deposited_for(alice(), Address::NATIVE), 1_000);
        assert_eq!(vault.held(Address::NATIVE), 1_000);
        assert_eq!(
            vault.transfers().balance_of(alice(), Address::NATIVE),
            999_000
        );
    }

    #[test]
    fn native_deposit_refunds_excess() {
        let mut vault = funded_vault();
        let now = t0();

        vault
            .deposit(alice(), Address::NATIVE, 1_000, 1_555, now)
            .unwrap();

        // Only the deposit amount stays in custody; the rest went back.
        assert_eq!(vault.deposited_for(alice(), Address::NATIVE), 1_000);
        assert_eq!(vault.held(Address::NATIVE), 1_000);
        assert_eq!(
            vault.transfers().balance_of(alice(), Address::NATIVE),
            999_000
        );
    }

    #[test]
    fn native_deposit_underfunded_rejected() {
        let mut vault = funded_vault();
        let result = vault.deposit(alice(), Address::NATIVE, 1_000, 999, t0());

        assert!(matches!(
            result,
            Err(VaultError::NativeDepositUnderfunded {
                attached: 999,
                required: 1_000,
            })
        ));
        assert_eq!(vault.held(Address::NATIVE), 0);
    }

    #[test]
    fn token_deposit_pulls_through_adapter() {
        let mut vault = funded_vault();
        let now = t0();

        vault.deposit(alice(), token(), 1_000, 0, now).unwrap();

        assert_eq!(vault.deposited_for(alice(), token()), 1_000);
        assert_eq!(vault.held(token()), 1_000);
        assert_eq!(vault.transfers().balance_of(alice(), token()), 999_000);
    }

    #[test]
    fn token_deposit_with_native_value_rejected() {
        let mut vault = funded_vault();
        let result = vault.deposit(alice(), token(), 1_000, 1_000, t0());

        assert!(matches!(
            result,
            Err(VaultError::NonNativeDepositMustNotSendNative { attached: 1_000 })
        ));
        assert_eq!(vault.held(token()), 0);
    }

    #[test]
    fn deposit_accumulates_across_calls() {
        let mut vault = funded_vault();
        let now = t0();

        vault.deposit(alice(), token(), 1_000, 0, now).unwrap();
        vault.deposit(alice(), token(), 1_000, 0, now).unwrap();
        assert_eq!(vault.deposited_for(alice(), token()), 2_000);
    }

    #[test]
    fn zero_amount_rejected() {
        let mut vault = funded_vault();
        let result = vault.deposit(alice(), token(), 0, 0, t0());
        assert!(matches!(result, Err(VaultError::ZeroAmount)));
    }

    #[test]
    fn zero_asset_rejected() {
        let mut vault = funded_vault();
        let result = vault.deposit(alice(), Address::ZERO, 1_000, 0, t0());
        assert!(matches!(result, Err(VaultError::ZeroAddress)));
    }

    #[test]
    fn zero_depositor_rejected() {
        let mut vault = funded_vault();
        let result = vault.deposit(Address::ZERO, token(), 1_000, 0, t0());
        assert!(matches!(result, Err(VaultError::ZeroAddress)));
    }

    #[test]
    fn deposit_pull_failure_leaves_ledger_untouched() {
        let mut vault = funded_vault();
        let result = vault.deposit(alice(), token(), 2_000_000, 0, t0());

        assert!(matches!(result, Err(VaultError::Transfer(_))));
        assert_eq!(vault.deposited_for(alice(), token()), 0);
        assert!(vault.events().is_empty());
    }

    /// Accepts every pull and refuses every push, standing in for an
    /// external settlement layer that breaks between the two calls.
    struct OneWayBank;

    impl TransferAdapter for OneWayBank {
        fn pull(
            &mut self,
            _asset: Address,
            _from: Address,
            _amount: u64,
        ) -> Result<(), TransferError> {
            Ok(())
        }

        fn push(&mut self, asset: Address, to: Address, amount: u64) -> Result<(), TransferError> {
            Err(TransferError::InsufficientFunds {
                holder: to,
                asset,
                available: 0,
                requested: amount,
            })
        }

        fn held(&self, _asset: Address) -> u64 {
            0
        }
    }

    #[test]
    fn failed_refund_does_not_mask_ledger_error() {
        let mut vault = Vault::new(owner(), default_rate(), OneWayBank);
        let now = t0();
        vault.deposit(alice(), token(), u64::MAX, 0, now).unwrap();

        // The second deposit overflows the aggregate principal; the
        // refund push also fails, but the caller still sees the
        // bookkeeping error, not the refund's.
        let result = vault.deposit(alice(), token(), 1, 0, now);
        assert!(matches!(result, Err(VaultError::Ledger(_))));
        assert_eq!(vault.deposited_for(alice(), token()), u64::MAX);
    }

    #[test]
    fn withdraw_without_position_rejected() {
        let mut vault = funded_vault();
        let result = vault.withdraw(alice(), token(), t0());
        assert!(matches!(
            result,
            Err(VaultError::Ledger(LedgerError::NothingToWithdraw { .. }))
        ));
    }

    #[test]
    fn withdraw_pays_out_and_clears_position() {
        let mut vault = funded_vault();
        let start = t0();
        vault.deposit(alice(), token(), 1_000, 0, start).unwrap();

        let w = vault.withdraw(alice(), token(), start).unwrap();
        // No time elapsed: no fee.
        assert_eq!(w.payout, 1_000);
        assert_eq!(w.fee, 0);
        assert_eq!(vault.transfers().balance_of(alice(), token()), 1_000_000);
        assert_eq!(vault.deposited_for(alice(), token()), 0);

        let second = vault.withdraw(alice(), token(), start);
        assert!(second.is_err());
    }

    #[test]
    fn collect_fees_requires_owner() {
        let mut vault = funded_vault();
        let result = vault.collect_fees(alice(), token(), alice(), t0());
        assert!(matches!(
            result,
            Err(VaultError::Unauthorized { caller }) if caller == alice()
        ));
    }

    #[test]
    fn collect_fees_rejects_zero_recipient() {
        let mut vault = funded_vault();
        let result = vault.collect_fees(owner(), token(), Address::ZERO, t0());
        assert!(matches!(result, Err(VaultError::ZeroAddress)));
    }

    #[test]
    fn collect_fees_on_unknown_asset_is_zero() {
        let mut vault = funded_vault();
        let amount = vault.collect_fees(owner(), token(), owner(), t0()).unwrap();
        assert_eq!(amount, 0);
    }

    #[test]
    fn collect_fees_pushes_to_recipient() {
        let mut vault = funded_vault();
        let start = t0();
        vault
            .deposit(alice(), token(), 1_000_000, 0, start)
            .unwrap();

        let later = start + Duration::days(200);
        let expected = vault.current_owner_fee(token(), later);
        assert!(expected > 0);

        let collected = vault.collect_fees(owner(), token(), owner(), later).unwrap();
        assert_eq!(collected, expected);
        assert_eq!(vault.transfers().balance_of(owner(), token()), collected);
        assert_eq!(vault.current_owner_fee(token(), later), 0);
    }

    #[test]
    fn operations_append_events() {
        let mut vault = funded_vault();
        let start = t0();

        vault.deposit(alice(), token(), 1_000, 0, start).unwrap();
        vault.withdraw(alice(), token(), start).unwrap();
        vault.collect_fees(owner(), token(), owner(), start).unwrap();

        let events = vault.take_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            VaultEvent::DepositReceived { amount: 1_000, .. }
        ));
        assert!(matches!(
            events[1],
            VaultEvent::WithdrawalExecuted {
                payout: 1_000,
                fee: 0,
                ..
            }
        ));
        assert!(matches!(events[2], VaultEvent::FeesCollected { .. }));
        assert!(vault.events().is_empty());
    }

    #[test]
    fn rate_view_returns_construction_pair() {
        let vault = funded_vault();
        assert_eq!(vault.rate(), default_rate());
    }

    #[test]
    fn views_on_unknown_asset_are_zero() {
        let vault = funded_vault();
        let now = t0();
        assert_eq!(vault.deposited_for(alice(), token()), 0);
        assert_eq!(vault.current_depositor_fee(alice(), token(), now), 0);
        assert_eq!(vault.available_for_withdrawal(alice(), token(), now), 0);
        assert_eq!(vault.current_owner_fee(token(), now), 0);
        assert_eq!(vault.liabilities(token(), now), 0);
    }
}
