//! Bond pricing engine
//!
//! Pure quote computation over explicit (possibly batch-adjusted) supply and
//! reserve state. Fees are computed on the unrounded reserve amounts and
//! rounded exactly once; prices and fees round up, returns round down, so the
//! protocol is never net-short reserve funds.

use std::collections::BTreeMap;

use bond_math::Decimal;

use crate::bond::{Bond, Coin};
use crate::curve::CurveFunction;
use crate::error::BondError;

/// Reserve cost of a buy at admission-time state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyQuote {
    /// Curve cost per reserve token, rounded up
    pub gross: BTreeMap<String, u128>,
    /// Tx fee per reserve token, rounded up
    pub fees: BTreeMap<String, u128>,
    /// gross + fees: what the buyer pays
    pub total: BTreeMap<String, u128>,
}

/// Reserve payout of a sell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellQuote {
    /// Curve return per reserve token, rounded down
    pub gross: BTreeMap<String, u128>,
    /// Tx + exit fee per reserve token, rounded up then clamped to gross
    pub fees: BTreeMap<String, u128>,
    /// gross − fees: what the seller receives
    pub net: BTreeMap<String, u128>,
}

/// Outcome of a swap through the two-reserve invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    /// Input remaining after the tx fee, added to the from-reserve
    pub from_net: u128,
    /// Tx fee in the from token, kept by the pool for the fee address
    pub fee: u128,
    /// Output paid from the to-reserve, rounded down
    pub to_amount: u128,
}

const ONE_HUNDRED: Decimal = Decimal::from_raw(100 * bond_math::SCALE);

/// pct% of `amount`, unrounded
fn percentage_of(amount: Decimal, pct: Decimal) -> Result<Decimal, BondError> {
    Ok(amount.checked_mul(pct)?.checked_div(ONE_HUNDRED)?)
}

/// Spot price per reserve token at the given supply and reserve state
///
/// Swapper bonds have no curve of supply alone; their spot price is the
/// pro-rata reserve behind one bond token, undefined at zero supply.
pub fn spot_prices(
    bond: &Bond,
    supply: u128,
    reserve: &BTreeMap<String, u128>,
) -> Result<BTreeMap<String, Decimal>, BondError> {
    let mut prices = BTreeMap::new();
    if bond.function.has_supply_integral() {
        let price = bond.function.price_at(Decimal::from_units(supply)?)?;
        for denom in &bond.reserve_tokens {
            prices.insert(denom.clone(), price);
        }
    } else {
        if supply == 0 {
            return Err(BondError::CurveUndefined);
        }
        let supply_dec = Decimal::from_units(supply)?;
        for denom in &bond.reserve_tokens {
            let balance = Decimal::from_units(reserve.get(denom).copied().unwrap_or(0))?;
            prices.insert(denom.clone(), balance.checked_div(supply_dec)?);
        }
    }
    Ok(prices)
}

/// Reserve cost to mint `amount` bond tokens on top of `supply`
///
/// `max_prices` is consulted only for the first mint of a swapper bond,
/// where the buyer's ceilings seed the pool and define the initial rate.
pub fn buy_quote(
    bond: &Bond,
    supply: u128,
    reserve: &BTreeMap<String, u128>,
    amount: u128,
    max_prices: Option<&BTreeMap<String, u128>>,
) -> Result<BuyQuote, BondError> {
    if amount == 0 {
        return Err(BondError::ParameterInvalid("amount must be > 0".into()));
    }
    if supply.checked_add(amount).map_or(true, |s| s > bond.max_supply) {
        return Err(BondError::ExceedsMaxSupply);
    }

    let mut gross = BTreeMap::new();
    match &bond.function {
        CurveFunction::Swapper => {
            if supply == 0 {
                // First mint seeds the pool: the buyer's price ceilings set
                // the initial reserve ratio. The fee is carved out of the
                // declared seed so gross + fee equals the ceiling exactly
                // and the slippage check never rejects the seed itself.
                let max_prices = max_prices.ok_or(BondError::CurveUndefined)?;
                let mut fees = BTreeMap::new();
                for denom in &bond.reserve_tokens {
                    let seed = max_prices.get(denom).copied().unwrap_or(0);
                    if seed == 0 {
                        return Err(BondError::ParameterInvalid(format!(
                            "initial swapper mint requires a nonzero max price for {}",
                            denom
                        )));
                    }
                    let fee = percentage_of(Decimal::from_units(seed)?, bond.tx_fee_percentage)?
                        .to_units_ceil()?;
                    if fee >= seed {
                        return Err(BondError::ParameterInvalid(format!(
                            "initial swapper mint for {} is too small to cover the fee",
                            denom
                        )));
                    }
                    gross.insert(denom.clone(), seed - fee);
                    fees.insert(denom.clone(), fee);
                }
                return assemble_buy(gross, fees);
            } else {
                // Pro-rata deposit: cost_i = reserve_i · amount / supply
                let amount_dec = Decimal::from_units(amount)?;
                let supply_dec = Decimal::from_units(supply)?;
                for denom in &bond.reserve_tokens {
                    let balance = Decimal::from_units(reserve.get(denom).copied().unwrap_or(0))?;
                    let cost = balance.checked_mul(amount_dec)?.checked_div(supply_dec)?;
                    gross.insert(denom.clone(), cost.to_units_ceil()?);
                }
            }
        }
        _ => {
            let cost = bond.function.reserve_needed_to_mint(
                Decimal::from_units(supply)?,
                Decimal::from_units(amount)?,
            )?;
            let denom = &bond.reserve_tokens[0];
            // fee on the unrounded curve cost, both rounded up independently
            let fee = percentage_of(cost, bond.tx_fee_percentage)?;
            gross.insert(denom.clone(), cost.to_units_ceil()?);
            let mut fees = BTreeMap::new();
            fees.insert(denom.clone(), fee.to_units_ceil()?);
            return assemble_buy(gross, fees);
        }
    }

    // Swapper path: fee per token on the unrounded pro-rata cost
    let mut fees = BTreeMap::new();
    for (denom, &units) in &gross {
        let fee = percentage_of(Decimal::from_units(units)?, bond.tx_fee_percentage)?;
        fees.insert(denom.clone(), fee.to_units_ceil()?);
    }
    assemble_buy(gross, fees)
}

fn assemble_buy(
    gross: BTreeMap<String, u128>,
    fees: BTreeMap<String, u128>,
) -> Result<BuyQuote, BondError> {
    let mut total = BTreeMap::new();
    for (denom, &g) in &gross {
        let f = fees.get(denom).copied().unwrap_or(0);
        total.insert(
            denom.clone(),
            g.checked_add(f).ok_or(bond_math::MathError::Overflow)?,
        );
    }
    Ok(BuyQuote { gross, fees, total })
}

/// Reserve returned for burning `amount` bond tokens out of `supply`
pub fn sell_quote(
    bond: &Bond,
    supply: u128,
    reserve: &BTreeMap<String, u128>,
    amount: u128,
) -> Result<SellQuote, BondError> {
    if !bond.allow_sells {
        return Err(BondError::SellsDisabled);
    }
    if amount == 0 {
        return Err(BondError::ParameterInvalid("amount must be > 0".into()));
    }
    if amount > supply {
        return Err(BondError::ExceedsSupply);
    }

    let mut gross = BTreeMap::new();
    let mut fees = BTreeMap::new();
    let fee_pct = bond.tx_fee_percentage.checked_add(bond.exit_fee_percentage)?;

    match &bond.function {
        CurveFunction::Swapper => {
            // Pro-rata share of both reserves
            let amount_dec = Decimal::from_units(amount)?;
            let supply_dec = Decimal::from_units(supply)?;
            for denom in &bond.reserve_tokens {
                let balance = Decimal::from_units(reserve.get(denom).copied().unwrap_or(0))?;
                let ret = balance.checked_mul(amount_dec)?.checked_div(supply_dec)?;
                let fee = percentage_of(ret, fee_pct)?;
                let ret_units = ret.to_units_floor()?;
                // never extract more fee than the gross movement
                let fee_units = fee.to_units_ceil()?.min(ret_units);
                gross.insert(denom.clone(), ret_units);
                fees.insert(denom.clone(), fee_units);
            }
        }
        _ => {
            let ret = bond.function.reserve_returned_on_burn(
                Decimal::from_units(supply)?,
                Decimal::from_units(amount)?,
            )?;
            let fee = percentage_of(ret, fee_pct)?;
            let denom = &bond.reserve_tokens[0];
            let ret_units = ret.to_units_floor()?;
            let fee_units = fee.to_units_ceil()?.min(ret_units);
            gross.insert(denom.clone(), ret_units);
            fees.insert(denom.clone(), fee_units);
        }
    }

    let mut net = BTreeMap::new();
    for (denom, &g) in &gross {
        let f = fees.get(denom).copied().unwrap_or(0);
        net.insert(denom.clone(), g - f);
    }
    Ok(SellQuote { gross, fees, net })
}

/// Swap `from` into `to_token` through the constant-product invariant
///
/// Fee is taken on the input; the net input moves the invariant:
/// `out = to_reserve · from_net / (from_reserve + from_net)`, rounded down.
/// The effective rate is checked against the bond's sanity band.
pub fn swap_quote(
    bond: &Bond,
    reserve: &BTreeMap<String, u128>,
    from: &Coin,
    to_token: &str,
) -> Result<SwapQuote, BondError> {
    if !matches!(bond.function, CurveFunction::Swapper) {
        return Err(BondError::ParameterInvalid(
            "swaps only apply to swapper bonds".into(),
        ));
    }
    if from.amount == 0 {
        return Err(BondError::ParameterInvalid("amount must be > 0".into()));
    }
    if from.denom == to_token
        || !bond.reserve_tokens.iter().any(|t| t == &from.denom)
        || !bond.reserve_tokens.iter().any(|t| t == to_token)
    {
        return Err(BondError::ParameterInvalid(
            "swap must cross the two reserve tokens".into(),
        ));
    }

    let from_reserve = reserve.get(&from.denom).copied().unwrap_or(0);
    let to_reserve = reserve.get(to_token).copied().unwrap_or(0);
    if from_reserve == 0 || to_reserve == 0 {
        return Err(BondError::CurveUndefined);
    }

    let amount_dec = Decimal::from_units(from.amount)?;
    let fee_dec = percentage_of(amount_dec, bond.tx_fee_percentage)?;
    let fee = fee_dec.to_units_ceil()?.min(from.amount);
    let from_net = from.amount - fee;
    if from_net == 0 {
        return Err(BondError::ParameterInvalid("amount too small after fee".into()));
    }

    let x = Decimal::from_units(from_reserve)?;
    let y = Decimal::from_units(to_reserve)?;
    let dx = Decimal::from_units(from_net)?;
    // out = y·dx/(x+dx): strictly less than y, so the pool never drains
    let out = y.checked_mul(dx)?.checked_div(x.checked_add(dx)?)?;
    let to_amount = out.to_units_floor()?;
    if to_amount == 0 {
        return Err(BondError::ParameterInvalid("swap output rounds to zero".into()));
    }

    check_sanity_bound(bond, &from.denom, from_net, to_amount)?;

    Ok(SwapQuote {
        from_net,
        fee,
        to_amount,
    })
}

/// Effective t1-per-t2 rate must sit inside
/// `sanity_rate ± sanity_rate · sanity_margin_percentage / 100`
///
/// A zero sanity rate disables the check. This bounds the price impact of
/// any single swap regardless of what the invariant math produces.
pub fn check_sanity_bound(
    bond: &Bond,
    from_denom: &str,
    from_amount: u128,
    to_amount: u128,
) -> Result<(), BondError> {
    if bond.sanity_rate.is_zero() {
        return Ok(());
    }
    // Orient the realized rate as reserve_tokens[0] per reserve_tokens[1]
    let (t1_amount, t2_amount) = if from_denom == bond.reserve_tokens[0] {
        (from_amount, to_amount)
    } else {
        (to_amount, from_amount)
    };
    if t2_amount == 0 {
        return Err(BondError::SanityBoundExceeded);
    }
    let rate = Decimal::from_units(t1_amount)?.checked_div(Decimal::from_units(t2_amount)?)?;
    let margin = percentage_of(bond.sanity_rate, bond.sanity_margin_percentage)?;
    let lower = bond.sanity_rate.checked_sub(margin)?.max(Decimal::ZERO);
    let upper = bond.sanity_rate.checked_add(margin)?;
    if rate < lower || rate > upper {
        return Err(BondError::SanityBoundExceeded);
    }
    Ok(())
}
