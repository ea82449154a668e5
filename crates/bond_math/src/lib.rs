//! Deterministic fixed-point decimal arithmetic for bonding-curve math
//!
//! Every replica must reach bit-identical state from the same ordered input,
//! so all money math goes through this crate: checked i128 fixed point, no
//! binary floating point, explicit rounding direction at the unit boundary.

#![forbid(unsafe_code)]

pub mod decimal;
pub mod roots;

pub use decimal::{Decimal, MathError};

/// Fixed-point precision (9 decimals)
pub const DECIMALS: u32 = 9;
pub const SCALE: i128 = 1_000_000_000;
