//! Error kinds for bond operations
//!
//! Admission-time errors reject the order synchronously with no state
//! change. Settlement-time failures are per-order: the order is dropped and
//! reported, the rest of the batch proceeds.

use bond_math::MathError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BondError {
    /// Curve or bond parameters malformed; rejected before any state exists
    #[error("invalid parameter: {0}")]
    ParameterInvalid(String),

    /// Curve is singular at the requested supply
    #[error("curve undefined at requested supply")]
    CurveUndefined,

    /// Mint would push supply past the bond's max_supply
    #[error("order exceeds max supply")]
    ExceedsMaxSupply,

    /// Burn exceeds the batch-adjusted outstanding supply
    #[error("order exceeds outstanding supply")]
    ExceedsSupply,

    /// Bond was created with allow_sells = false
    #[error("sells are disabled for this bond")]
    SellsDisabled,

    /// Order amount exceeds the configured per-order limit
    #[error("order quantity exceeds per-order limit")]
    ExceedsOrderLimit,

    /// Swap rate falls outside sanity_rate ± sanity_margin_percentage
    #[error("swap rate outside sanity bounds")]
    SanityBoundExceeded,

    /// Quote recorded at admission is no longer satisfiable at settlement
    #[error("order invalidated at settlement")]
    SettlementInvalidated,

    #[error("bond not found: {0}")]
    BondNotFound(String),

    #[error("batch not found: {0}")]
    BatchNotFound(String),

    /// Operation not allowed in the bond's current state
    #[error("operation not allowed in state {0}")]
    InvalidState(&'static str),

    /// Address is not in the bond's signer set
    #[error("address is not a bond signer")]
    Unauthorized,

    #[error("order not found: {0}")]
    OrderNotFound(u64),

    #[error(transparent)]
    Math(#[from] MathError),
}
