//! Read-only query surface
//!
//! Everything here quotes against the last settled state of a bond, never
//! against the provisional batch-adjusted state; pending orders are visible
//! through the batch itself.

use std::collections::BTreeMap;

use bond_math::Decimal;

use crate::bond::{Bond, Coin};
use crate::error::BondError;
use crate::pricing::{self, BuyQuote, SellQuote, SwapQuote};

/// Spot price per reserve token at the bond's current supply
pub fn current_price(bond: &Bond) -> Result<BTreeMap<String, Decimal>, BondError> {
    pricing::spot_prices(bond, bond.current_supply, &bond.current_reserve)
}

/// Spot price at a hypothetical supply (supply-integral shapes only)
pub fn price_at_supply(bond: &Bond, supply: u128) -> Result<Decimal, BondError> {
    if !bond.function.has_supply_integral() {
        return Err(BondError::CurveUndefined);
    }
    bond.function.price_at(Decimal::from_units(supply)?)
}

/// What minting `amount` bond tokens would cost right now, fees included
pub fn price_to_mint(bond: &Bond, amount: u128) -> Result<BuyQuote, BondError> {
    pricing::buy_quote(
        bond,
        bond.current_supply,
        &bond.current_reserve,
        amount,
        None,
    )
}

/// What burning `amount` bond tokens would return right now, net of fees
pub fn return_on_burn(bond: &Bond, amount: u128) -> Result<SellQuote, BondError> {
    pricing::sell_quote(bond, bond.current_supply, &bond.current_reserve, amount)
}

/// What swapping `from` into `to_token` would return right now
pub fn return_on_swap(bond: &Bond, from: &Coin, to_token: &str) -> Result<SwapQuote, BondError> {
    pricing::swap_quote(bond, &bond.current_reserve, from, to_token)
}
