//! # Vault Events
//!
//! Every successful state transition appends a [`VaultEvent`] to the
//! vault's in-memory log. Embedders drain the log to publish events to
//! whatever bus or chain they settle on; the vault itself only records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::Address;

/// A record of a completed vault operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// A deposit was credited to a depositor's position.
    DepositReceived {
        /// The asset deposited.
        asset: Address,
        /// Who now holds the position.
        depositor: Address,
        /// Amount credited, exactly as deposited.
        amount: u64,
        /// Timestamp supplied to the operation.
        at: DateTime<Utc>,
    },

    /// A full withdrawal was executed.
    WithdrawalExecuted {
        /// The asset withdrawn.
        asset: Address,
        /// Whose position was closed.
        depositor: Address,
        /// Amount pushed to the depositor.
        payout: u64,
        /// Fee retained for the owner.
        fee: u64,
        /// Timestamp supplied to the operation.
        at: DateTime<Utc>,
    },

    /// The owner collected the asset's accrued fees.
    FeesCollected {
        /// The asset whose fees were collected.
        asset: Address,
        /// Where the fees were pushed.
        to: Address,
        /// Amount collected (may be zero).
        amount: u64,
        /// Timestamp supplied to the operation.
        at: DateTime<Utc>,
    },
}
