//! Deterministic root and power operations on [`Decimal`]
//!
//! Newton iteration over the scaled integer representation. Iteration counts
//! are bounded and the update rule uses only checked integer ops, so every
//! replica computes the same digits.

use crate::decimal::{Decimal, MathError};
use crate::SCALE;

/// Integer square root of a u128 (largest r with r*r <= value)
fn isqrt_u128(value: u128) -> u128 {
    if value < 2 {
        return value;
    }
    // Initial guess from bit length, then Newton; monotone decreasing once
    // above the root, so the first non-decreasing step is the answer.
    let shift = (128 - value.leading_zeros() + 1) / 2;
    let mut guess = 1u128 << shift;
    loop {
        let next = (guess + value / guess) / 2;
        if next >= guess {
            return guess;
        }
        guess = next;
    }
}

impl Decimal {
    /// Square root, deterministic
    ///
    /// `sqrt(v/S) = isqrt(v*S)/S`, computed entirely in integers.
    pub fn sqrt(self) -> Result<Decimal, MathError> {
        if self.is_negative() {
            return Err(MathError::NegativeRoot);
        }
        let scaled = (self.raw() as u128)
            .checked_mul(SCALE as u128)
            .ok_or(MathError::Overflow)?;
        let root = isqrt_u128(scaled);
        if root > i128::MAX as u128 {
            return Err(MathError::Overflow);
        }
        Ok(Decimal::from_raw(root as i128))
    }

    /// Checked integer power by repeated squaring; `x^0 = 1`
    pub fn powi(self, exp: u32) -> Result<Decimal, MathError> {
        let mut result = Decimal::ONE;
        let mut base = self;
        let mut exp = exp;
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            exp >>= 1;
            if exp > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Ok(result)
    }

    /// n-th root of a non-negative decimal, deterministic
    ///
    /// Newton update `y' = ((n-1)y + x/y^(n-1)) / n` starting from
    /// `max(x, 1)`, which sits at or above the root, so the sequence
    /// decreases monotonically; the first non-decreasing step terminates.
    pub fn nth_root(self, n: u32) -> Result<Decimal, MathError> {
        if self.is_negative() {
            return Err(MathError::NegativeRoot);
        }
        match n {
            0 => return Err(MathError::DivisionByZero),
            1 => return Ok(self),
            2 => return self.sqrt(),
            _ => {}
        }
        if self.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let n_dec = Decimal::from_int(n as i128)?;
        let n_minus_one = Decimal::from_int(n as i128 - 1)?;
        let mut guess = self.max(Decimal::ONE);
        // Bounded fallback; convergence is quadratic so 255 is far above
        // what any i128-range input needs.
        for _ in 0..255 {
            let denom = guess.powi(n - 1)?;
            if denom.is_zero() {
                return Err(MathError::DivisionByZero);
            }
            let next = n_minus_one
                .checked_mul(guess)?
                .checked_add(self.checked_div(denom)?)?
                .checked_div(n_dec)?;
            if next >= guess {
                break;
            }
            guess = next;
        }
        Ok(guess)
    }

    /// Rational power `x^(p/q)` for non-negative `x`
    ///
    /// Takes the q-th root first to keep intermediate magnitudes small, then
    /// raises to the integer power p. `x^0 = 1` for any x.
    pub fn pow_rational(self, p: u32, q: u32) -> Result<Decimal, MathError> {
        if q == 0 {
            return Err(MathError::DivisionByZero);
        }
        if p == 0 {
            return Ok(Decimal::ONE);
        }
        if p % q == 0 {
            return self.powi(p / q);
        }
        self.nth_root(q)?.powi(p)
    }
}
