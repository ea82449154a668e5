//! Curve function library
//!
//! Closed set of pricing functions dispatched by match, with per-variant
//! parameter structs validated once at bond creation/edit. Validation is a
//! hard precondition for every later call; nothing here re-validates per
//! order.
//!
//! Each shape supplies a spot price and a closed-form definite integral, so
//! mint cost and burn return are exact (up to fixed-point truncation) rather
//! than numerically integrated.

use bond_math::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BondError;

/// Non-negative rational exponent p/q
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub p: u32,
    pub q: u32,
}

impl Ratio {
    pub const fn new(p: u32, q: u32) -> Self {
        Ratio { p, q }
    }

    pub fn is_integer(&self) -> bool {
        self.q != 0 && self.p % self.q == 0
    }
}

/// Parameters for the Power (and Augmented) shape: price(s) = m·s^n + c
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerParams {
    pub m: Decimal,
    pub n: Ratio,
    pub c: Decimal,
}

/// Parameters for the Sigmoid shape:
/// price(s) = a·((s−b)/sqrt(c+(s−b)²) + 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigmoidParams {
    pub a: Decimal,
    pub b: Decimal,
    pub c: Decimal,
}

/// The four curve shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveFunction {
    Power(PowerParams),
    Sigmoid(SigmoidParams),
    /// Constant-product invariant over exactly two reserve tokens; mint and
    /// burn are pro-rata, so there are no free parameters
    Swapper,
    /// Power-shaped curve gated by the bond's outcome payment: once paid in
    /// full the bond moves to Settlement and burns become pro-rata
    Augmented(PowerParams),
}

impl CurveFunction {
    /// Number of reserve tokens this shape requires
    pub fn required_reserve_tokens(&self) -> usize {
        match self {
            CurveFunction::Swapper => 2,
            _ => 1,
        }
    }

    /// True for shapes priced by a single-token supply integral
    pub fn has_supply_integral(&self) -> bool {
        !matches!(self, CurveFunction::Swapper)
    }

    pub fn validate(&self) -> Result<(), BondError> {
        match self {
            CurveFunction::Power(p) | CurveFunction::Augmented(p) => {
                if p.m.is_negative() {
                    return Err(BondError::ParameterInvalid("m must be >= 0".into()));
                }
                if p.c.is_negative() {
                    return Err(BondError::ParameterInvalid("c must be >= 0".into()));
                }
                if p.n.q == 0 {
                    return Err(BondError::ParameterInvalid(
                        "exponent denominator must be > 0".into(),
                    ));
                }
                Ok(())
            }
            CurveFunction::Sigmoid(p) => {
                if p.a <= Decimal::ZERO {
                    return Err(BondError::ParameterInvalid("a must be > 0".into()));
                }
                if p.c <= Decimal::ZERO {
                    return Err(BondError::ParameterInvalid("c must be > 0".into()));
                }
                if p.b.is_negative() {
                    return Err(BondError::ParameterInvalid("b must be >= 0".into()));
                }
                Ok(())
            }
            CurveFunction::Swapper => Ok(()),
        }
    }

    /// Spot price at `supply` for supply-integral shapes
    pub fn price_at(&self, supply: Decimal) -> Result<Decimal, BondError> {
        match self {
            CurveFunction::Power(p) | CurveFunction::Augmented(p) => {
                // m·s^n + c
                let s_pow = supply.pow_rational(p.n.p, p.n.q)?;
                Ok(p.m.checked_mul(s_pow)?.checked_add(p.c)?)
            }
            CurveFunction::Sigmoid(p) => {
                // a·((s−b)/sqrt(c+(s−b)²) + 1)
                let shifted = supply.checked_sub(p.b)?;
                let denom = p.c.checked_add(shifted.checked_mul(shifted)?)?.sqrt()?;
                if denom.is_zero() {
                    return Err(BondError::CurveUndefined);
                }
                let frac = shifted.checked_div(denom)?;
                Ok(p.a.checked_mul(frac.checked_add(Decimal::ONE)?)?)
            }
            CurveFunction::Swapper => Err(BondError::CurveUndefined),
        }
    }

    /// Definite integral of the price from 0 to `supply` (reserve that backs
    /// `supply` outstanding tokens); zero at zero supply by construction
    pub fn reserve_at(&self, supply: Decimal) -> Result<Decimal, BondError> {
        match self {
            CurveFunction::Power(p) | CurveFunction::Augmented(p) => {
                // ∫(m·s^n + c)ds = m·s^(n+1)/(n+1) + c·s
                //               = m·q/(p+q) · s^((p+q)/q) + c·s
                let exp_num = p
                    .n
                    .p
                    .checked_add(p.n.q)
                    .ok_or(BondError::ParameterInvalid("exponent too large".into()))?;
                let s_pow = supply.pow_rational(exp_num, p.n.q)?;
                let coeff = p
                    .m
                    .checked_mul(Decimal::from_int(p.n.q as i128)?)?
                    .checked_div(Decimal::from_int(exp_num as i128)?)?;
                let curve_part = coeff.checked_mul(s_pow)?;
                let linear_part = p.c.checked_mul(supply)?;
                Ok(curve_part.checked_add(linear_part)?)
            }
            CurveFunction::Sigmoid(p) => {
                // ∫ = a·(s + sqrt(c+(s−b)²) − sqrt(c+b²))
                let shifted = supply.checked_sub(p.b)?;
                let sqrt_s = p.c.checked_add(shifted.checked_mul(shifted)?)?.sqrt()?;
                let sqrt_0 = p.c.checked_add(p.b.checked_mul(p.b)?)?.sqrt()?;
                let inner = supply.checked_add(sqrt_s)?.checked_sub(sqrt_0)?;
                Ok(p.a.checked_mul(inner)?)
            }
            CurveFunction::Swapper => Err(BondError::CurveUndefined),
        }
    }

    /// Reserve needed to mint `amount` on top of `supply`
    pub fn reserve_needed_to_mint(
        &self,
        supply: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, BondError> {
        let high = self.reserve_at(supply.checked_add(amount)?)?;
        let low = self.reserve_at(supply)?;
        Ok(high.checked_sub(low)?)
    }

    /// Reserve released by burning `amount` out of `supply`
    pub fn reserve_returned_on_burn(
        &self,
        supply: Decimal,
        amount: Decimal,
    ) -> Result<Decimal, BondError> {
        let high = self.reserve_at(supply)?;
        let low = self.reserve_at(supply.checked_sub(amount)?)?;
        Ok(high.checked_sub(low)?)
    }
}
