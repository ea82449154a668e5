//! Token-bonding-curve engine with per-block batched order settlement
//!
//! Users mint/burn a bond's token against one or more reserve tokens at a
//! price set by the bond's curve. Orders accumulate in a per-bond batch for a
//! fixed block window and settle atomically when the window elapses, so no
//! order can front-run another inside a block.
//!
//! The crate is a pure state-transition core: it never touches account
//! balances or storage directly. Balance movements come back as
//! [`LedgerInstruction`] values and records cross the [`BondStore`] seam as
//! plain values, which keeps every replica's output bit-identical for the
//! same ordered input.

#![forbid(unsafe_code)]

pub mod batch;
pub mod bond;
pub mod curve;
pub mod error;
pub mod lifecycle;
pub mod pricing;
pub mod query;
pub mod settlement;
pub mod store;

#[cfg(test)]
mod negative_tests;

pub use batch::{Batch, BuyOrder, OrderSide, SellOrder, SwapOrder};
pub use bond::{Bond, BondEdits, BondSpec, BondState, Coin};
pub use curve::{CurveFunction, PowerParams, Ratio, SigmoidParams};
pub use error::BondError;
pub use lifecycle::*;
pub use pricing::{BuyQuote, SellQuote, SwapQuote};
pub use settlement::{begin_block, settle, FailedOrder, LedgerInstruction, SettlementOutcome};
pub use store::{BondStore, MemStore};

pub use bond_math::{Decimal, MathError};
