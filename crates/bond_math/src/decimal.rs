//! Checked i128 fixed-point decimal (9 fractional digits)
//!
//! Rounding policy at the integer-unit boundary:
//! - amounts owed *to* the protocol (prices, fees) round up
//! - amounts owed *to* the user (returns) round down
//!
//! Internal multiply/divide truncate toward zero; the directional rounding
//! happens exactly once, when a decimal is converted back to whole units.

use core::fmt;
use core::str::FromStr;

use crate::SCALE;

/// Arithmetic errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Intermediate or final value exceeds i128 fixed-point range
    Overflow,
    /// Division by zero (curve singularity surfaces as this)
    DivisionByZero,
    /// Root of a negative value
    NegativeRoot,
    /// Negative value where a token amount was expected
    NegativeAmount,
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::Overflow => write!(f, "fixed-point overflow"),
            MathError::DivisionByZero => write!(f, "division by zero"),
            MathError::NegativeRoot => write!(f, "root of negative value"),
            MathError::NegativeAmount => write!(f, "negative token amount"),
        }
    }
}

/// Fixed-point decimal, raw value scaled by [`SCALE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Decimal(i128);

/// Full 256-bit product of two u128s as (hi, lo) limbs
fn mul_wide(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1 << 64) - 1;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);
    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;
    let (mid, mid_carry) = lh.overflowing_add(hl);
    let (lo, lo_carry) = ll.overflowing_add(mid << 64);
    let hi = hh + (mid >> 64) + ((mid_carry as u128) << 64) + lo_carry as u128;
    (hi, lo)
}

/// floor((hi·2^128 + lo) / d); None when the quotient exceeds u128.
/// Requires d > 0.
fn div_wide(hi: u128, lo: u128, d: u128) -> Option<u128> {
    if hi == 0 {
        return Some(lo / d);
    }
    if hi >= d {
        return None;
    }
    // binary long division; rem < d throughout, the shifted-out top bit of
    // rem stands in for the 2^128 term when the shift wraps
    let mut rem = hi;
    let mut quot = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1 << i;
        }
    }
    Some(quot)
}

/// floor(a·b/d) with a 256-bit intermediate. Requires d > 0.
fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    let (hi, lo) = mul_wide(a, b);
    div_wide(hi, lo, d)
}

impl Decimal {
    pub const ZERO: Decimal = Decimal(0);
    pub const ONE: Decimal = Decimal(SCALE);

    /// Build from a raw value already scaled by [`SCALE`]
    pub const fn from_raw(raw: i128) -> Self {
        Decimal(raw)
    }

    /// Raw scaled value
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Build from a signed integer count of whole units
    pub fn from_int(value: i128) -> Result<Self, MathError> {
        value.checked_mul(SCALE).map(Decimal).ok_or(MathError::Overflow)
    }

    /// Build from an unsigned count of whole units (token amounts)
    pub fn from_units(units: u128) -> Result<Self, MathError> {
        if units > (i128::MAX / SCALE) as u128 {
            return Err(MathError::Overflow);
        }
        Ok(Decimal(units as i128 * SCALE))
    }

    /// Build from a ratio of two integers
    pub fn from_ratio(numer: i128, denom: i128) -> Result<Self, MathError> {
        Self::from_int(numer)?.checked_div(Self::from_int(denom)?)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Result<Self, MathError> {
        self.0.checked_abs().map(Decimal).ok_or(MathError::Overflow)
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 { self } else { other }
    }

    pub fn checked_add(self, other: Self) -> Result<Self, MathError> {
        self.0.checked_add(other.0).map(Decimal).ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, MathError> {
        self.0.checked_sub(other.0).map(Decimal).ok_or(MathError::Overflow)
    }

    pub fn checked_neg(self) -> Result<Self, MathError> {
        self.0.checked_neg().map(Decimal).ok_or(MathError::Overflow)
    }

    fn from_sign_magnitude(negative: bool, mag: u128) -> Result<Self, MathError> {
        if mag > i128::MAX as u128 {
            return Err(MathError::Overflow);
        }
        let raw = mag as i128;
        Ok(Decimal(if negative { -raw } else { raw }))
    }

    /// Checked multiply, truncating toward zero
    ///
    /// `a*b/SCALE` over unsigned magnitudes with a 256-bit intermediate, so
    /// it only errors when the result itself is out of range.
    pub fn checked_mul(self, other: Self) -> Result<Self, MathError> {
        let negative = (self.0 < 0) != (other.0 < 0);
        let mag = mul_div(self.0.unsigned_abs(), other.0.unsigned_abs(), SCALE as u128)
            .ok_or(MathError::Overflow)?;
        Self::from_sign_magnitude(negative, mag)
    }

    /// Checked divide, truncating toward zero
    ///
    /// `a*SCALE/b` over unsigned magnitudes with a 256-bit intermediate.
    pub fn checked_div(self, other: Self) -> Result<Self, MathError> {
        if other.0 == 0 {
            return Err(MathError::DivisionByZero);
        }
        let negative = (self.0 < 0) != (other.0 < 0);
        let mag = mul_div(self.0.unsigned_abs(), SCALE as u128, other.0.unsigned_abs())
            .ok_or(MathError::Overflow)?;
        Self::from_sign_magnitude(negative, mag)
    }

    /// Whole units, rounded down (amounts owed to the user)
    pub fn to_units_floor(self) -> Result<u128, MathError> {
        if self.0 < 0 {
            return Err(MathError::NegativeAmount);
        }
        Ok((self.0 / SCALE) as u128)
    }

    /// Whole units, rounded up (amounts owed to the protocol)
    pub fn to_units_ceil(self) -> Result<u128, MathError> {
        if self.0 < 0 {
            return Err(MathError::NegativeAmount);
        }
        let q = self.0 / SCALE;
        let r = self.0 % SCALE;
        Ok((q + if r > 0 { 1 } else { 0 }) as u128)
    }

    /// Fractional part is exactly zero
    pub fn is_integral(self) -> bool {
        self.0 % SCALE == 0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let mag = self.0.unsigned_abs();
        let whole = mag / SCALE as u128;
        let frac = mag % SCALE as u128;
        if frac == 0 {
            write!(f, "{}{}", sign, whole)
        } else {
            let digits = format!("{:09}", frac);
            write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
        }
    }
}

/// Parse error for [`Decimal::from_str`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDecimalError;

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal")
    }
}

impl std::error::Error for ParseDecimalError {}
impl std::error::Error for MathError {}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sign, body) = match s.strip_prefix('-') {
            Some(rest) => (-1i128, rest),
            None => (1i128, s),
        };
        if body.is_empty() {
            return Err(ParseDecimalError);
        }
        let (whole_str, frac_str) = match body.split_once('.') {
            Some((w, fr)) => (w, fr),
            None => (body, ""),
        };
        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(ParseDecimalError);
        }
        if frac_str.len() > 9 {
            return Err(ParseDecimalError);
        }
        let whole: i128 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_| ParseDecimalError)?
        };
        let mut frac: i128 = 0;
        if !frac_str.is_empty() {
            frac = frac_str.parse().map_err(|_| ParseDecimalError)?;
            for _ in 0..(9 - frac_str.len()) {
                frac *= 10;
            }
        }
        let raw = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .and_then(|m| m.checked_mul(sign))
            .ok_or(ParseDecimalError)?;
        Ok(Decimal(raw))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Decimal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Decimal {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
