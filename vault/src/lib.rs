//! # timevault — Custodial Multi-Asset Vault with Time-Accruing Fees
//!
//! A vault that holds deposits of arbitrary assets (one identifier is
//! reserved for the native currency) and charges each depositor a
//! continuously accruing, time-proportional withdrawal fee instead of a
//! flat one. The fee is simple interest on the deposited principal,
//! computed lazily from checkpoints — no per-second bookkeeping, O(1)
//! per operation regardless of how much wall-clock time has passed.
//!
//! ## Architecture
//!
//! ```text
//! config.rs   — Protocol constants: scale resolution, default fee rate
//! asset.rs    — 20-byte asset/account identifiers, native sentinel
//! accrual.rs  — FeeRate + FeeAccumulator: the checkpointed interest core
//! ledger.rs   — AssetLedger: per-depositor accumulators + aggregate owner pot
//! transfer.rs — TransferAdapter capability + in-memory settlement bank
//! events.rs   — Operation records emitted by the vault
//! vault.rs    — Vault: the public orchestrator
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` in smallest-unit denomination.** No floating
//!    point anywhere in the accounting path. Display decimals are the
//!    embedder's convention.
//!
//! 2. **Time is an input, never a side effect.** Every operation takes the
//!    current timestamp as a parameter; the core never reads a clock and is
//!    therefore fully deterministic.
//!
//! 3. **All-or-nothing operations.** A rejected deposit, withdrawal, or
//!    collection leaves every accumulator exactly as it was. Principal
//!    overflow is an error; only the *fee* saturates, and only by design.
//!
//! 4. **Serializable state.** Every persistent struct derives `Serialize`
//!    and `Deserialize` so vault state can be snapshotted or shipped
//!    between processes.

pub mod accrual;
pub mod asset;
pub mod config;
pub mod events;
pub mod ledger;
pub mod transfer;
pub mod vault;

pub use accrual::{AccrualError, FeeAccumulator, FeeRate};
pub use asset::Address;
pub use events::VaultEvent;
pub use ledger::{AssetLedger, LedgerError, Withdrawal};
pub use transfer::{SettlementBank, TransferAdapter, TransferError};
pub use vault::{Vault, VaultError};
