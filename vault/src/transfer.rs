//! # Transfer Capability
//!
//! The vault never moves funds itself — it delegates to a
//! [`TransferAdapter`], a capability with exactly two verbs: `pull`
//! (from a holder into vault custody) and `push` (from custody to a
//! recipient). Each verb either succeeds fully or fails atomically.
//!
//! Native-versus-token semantics are *not* the adapter's concern: the
//! vault selects the flow by comparing the asset identifier against the
//! native sentinel, and the adapter just moves balances. This keeps the
//! dispatch a data comparison rather than an inheritance hierarchy.
//!
//! [`SettlementBank`] is the in-process implementation: a plain balance
//! table used by the test suite and by embedders that settle off-ledger.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while moving funds.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source of the transfer does not hold enough of the asset.
    #[error("insufficient funds: {holder} holds {available} of {asset}, requested {requested}")]
    InsufficientFunds {
        /// The account that was being debited.
        holder: Address,
        /// The asset being moved.
        asset: Address,
        /// Balance actually held.
        available: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// Crediting the destination would overflow its balance.
    #[error("balance overflow crediting {holder} with {amount} of {asset}")]
    Overflow {
        /// The account that was being credited.
        holder: Address,
        /// The asset being moved.
        asset: Address,
        /// The amount that caused the overflow.
        amount: u64,
    },
}

// ---------------------------------------------------------------------------
// TransferAdapter
// ---------------------------------------------------------------------------

/// Moves funds into and out of vault custody.
///
/// Implementations must be atomic per call: on error, no balance changes.
pub trait TransferAdapter {
    /// Moves `amount` of `asset` from `from` into vault custody.
    fn pull(&mut self, asset: Address, from: Address, amount: u64) -> Result<(), TransferError>;

    /// Moves `amount` of `asset` from vault custody to `to`.
    fn push(&mut self, asset: Address, to: Address, amount: u64) -> Result<(), TransferError>;

    /// The amount of `asset` currently in vault custody.
    fn held(&self, asset: Address) -> u64;
}

// ---------------------------------------------------------------------------
// SettlementBank
// ---------------------------------------------------------------------------

/// In-memory balance table implementing [`TransferAdapter`].
///
/// Tracks one balance per holder per asset plus the vault's custody
/// balances. `mint` funds accounts out of thin air — this is a settlement
/// model, not a token. Keyed by hex addresses, the whole table snapshots
/// cleanly to JSON alongside the vault state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettlementBank {
    /// Balances of external holders: holder, then asset.
    accounts: HashMap<Address, HashMap<Address, u64>>,

    /// Vault custody, per asset.
    custody: HashMap<Address, u64>,
}

impl SettlementBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `holder` with `amount` of `asset`, saturating at the max.
    pub fn mint(&mut self, holder: Address, asset: Address, amount: u64) {
        let balance = self
            .accounts
            .entry(holder)
            .or_default()
            .entry(asset)
            .or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Balance of `asset` held by `holder` (outside vault custody).
    pub fn balance_of(&self, holder: Address, asset: Address) -> u64 {
        self.accounts
            .get(&holder)
            .and_then(|assets| assets.get(&asset))
            .copied()
            .unwrap_or(0)
    }

    fn set_balance(&mut self, holder: Address, asset: Address, balance: u64) {
        self.accounts
            .entry(holder)
            .or_default()
            .insert(asset, balance);
    }
}

impl TransferAdapter for SettlementBank {
    fn pull(&mut self, asset: Address, from: Address, amount: u64) -> Result<(), TransferError> {
        let available = self.balance_of(from, asset);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                holder: from,
                asset,
                available,
                requested: amount,
            });
        }

        let held = self.held(asset);
        let new_held = held.checked_add(amount).ok_or(TransferError::Overflow {
            holder: from,
            asset,
            amount,
        })?;

        self.set_balance(from, asset, available - amount);
        self.custody.insert(asset, new_held);
        Ok(())
    }

    fn push(&mut self, asset: Address, to: Address, amount: u64) -> Result<(), TransferError> {
        let held = self.held(asset);
        if held < amount {
            return Err(TransferError::InsufficientFunds {
                holder: to,
                asset,
                available: held,
                requested: amount,
            });
        }

        let balance = self.balance_of(to, asset);
        let new_balance = balance.checked_add(amount).ok_or(TransferError::Overflow {
            holder: to,
            asset,
            amount,
        })?;

        self.custody.insert(asset, held - amount);
        self.set_balance(to, asset, new_balance);
        Ok(())
    }

    fn held(&self, asset: Address) -> u64 {
        self.custody.get(&asset).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
