//! Batch settlement
//!
//! Runs once per bond when its batch's block window elapses. Offsetting
//! buy/sell volume is netted first and settles at the batch-start spot price
//! (fees only, no curve movement); the remaining net volume executes
//! sequentially in admission order against the curve, buys, then sells, then
//! swaps. Failure is per-order: an order whose admitted quote no longer
//! holds is dropped and reported, the rest of the batch proceeds.
//!
//! The core never moves balances. Every settlement returns the list of
//! [`LedgerInstruction`]s the host ledger must apply atomically.

use std::collections::BTreeMap;

use bond_math::Decimal;
use log::{debug, warn};

use crate::batch::Batch;
use crate::bond::{Bond, BondState, Coin};
use crate::error::BondError;
use crate::pricing;
use crate::store::BondStore;

/// A balance movement the host ledger must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerInstruction {
    /// Debit a user, credit the bond's reserve pool
    CollectFromUser { address: String, coin: Coin },
    /// Debit the reserve pool, credit a user
    PayToUser { address: String, coin: Coin },
    /// Debit the reserve pool, credit the bond's fee address
    PayFee { coin: Coin },
    /// Mint bond tokens to a user
    Mint { address: String, amount: u128 },
    /// Burn bond tokens from a user
    Burn { address: String, amount: u128 },
}

/// An order dropped during settlement, with the reason it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOrder {
    pub order_id: u64,
    pub address: String,
    pub reason: BondError,
}

/// Result of settling one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub token: String,
    pub instructions: Vec<LedgerInstruction>,
    pub executed_buys: usize,
    pub executed_sells: usize,
    pub executed_swaps: usize,
    pub failed: Vec<FailedOrder>,
}

fn add_to(map: &mut BTreeMap<String, u128>, denom: &str, amount: u128) {
    *map.entry(denom.to_string()).or_insert(0) += amount;
}

const ONE_HUNDRED: Decimal = Decimal::from_raw(100 * bond_math::SCALE);

fn percentage_of(amount: Decimal, pct: Decimal) -> Result<Decimal, BondError> {
    Ok(amount.checked_mul(pct)?.checked_div(ONE_HUNDRED)?)
}

/// Cost of a matched (netted) buy slice at the spot price: value rounds up,
/// fee on the unrounded value rounds up
fn matched_buy_cost(
    spot: &BTreeMap<String, Decimal>,
    amount: u128,
    fee_pct: Decimal,
) -> Result<(BTreeMap<String, u128>, BTreeMap<String, u128>), BondError> {
    let amount_dec = Decimal::from_units(amount)?;
    let mut gross = BTreeMap::new();
    let mut fees = BTreeMap::new();
    for (denom, price) in spot {
        let value = price.checked_mul(amount_dec)?;
        let fee = percentage_of(value, fee_pct)?;
        gross.insert(denom.clone(), value.to_units_ceil()?);
        fees.insert(denom.clone(), fee.to_units_ceil()?);
    }
    Ok((gross, fees))
}

/// Payout of a matched sell slice at the spot price: value rounds down, fee
/// rounds up but never exceeds the gross movement for its token
fn matched_sell_payout(
    spot: &BTreeMap<String, Decimal>,
    amount: u128,
    fee_pct: Decimal,
) -> Result<(BTreeMap<String, u128>, BTreeMap<String, u128>), BondError> {
    let amount_dec = Decimal::from_units(amount)?;
    let mut gross = BTreeMap::new();
    let mut fees = BTreeMap::new();
    for (denom, price) in spot {
        let value = price.checked_mul(amount_dec)?;
        let fee = percentage_of(value, fee_pct)?;
        let gross_units = value.to_units_floor()?;
        fees.insert(denom.clone(), fee.to_units_ceil()?.min(gross_units));
        gross.insert(denom.clone(), gross_units);
    }
    Ok((gross, fees))
}

/// Settle one batch into the bond, consuming every non-cancelled order
///
/// On return the batch has been replaced by a fresh empty one (window reset
/// to `batch_blocks` while the bond is Open, closed otherwise).
pub fn settle(bond: &mut Bond, batch: &mut Batch) -> Result<SettlementOutcome, BondError> {
    let mut outcome = SettlementOutcome {
        token: bond.token.clone(),
        instructions: Vec::new(),
        executed_buys: 0,
        executed_sells: 0,
        executed_swaps: 0,
        failed: Vec::new(),
    };

    let total_buys: u128 = batch
        .buy_orders
        .iter()
        .filter(|o| !o.cancelled)
        .map(|o| o.amount)
        .sum();
    let total_sells: u128 = batch
        .sell_orders
        .iter()
        .filter(|o| !o.cancelled)
        .map(|o| o.amount)
        .sum();
    let matched = total_buys.min(total_sells);

    // Spot price at batch start values the matched volume. A swapper batch
    // whose first mint and a sell land together has no spot yet; in that
    // case nothing nets and all volume walks the invariant sequentially.
    let spot = if matched > 0 {
        pricing::spot_prices(bond, bond.current_supply, &bond.current_reserve).ok()
    } else {
        None
    };
    let matched = if spot.is_some() { matched } else { 0 };

    let sell_fee_pct = bond.tx_fee_percentage.checked_add(bond.exit_fee_percentage)?;

    // Curve execution tracks its own supply: matched volume mints and burns
    // at the same spot price, so it must not move the integral bounds.
    let mut curve_supply = bond.current_supply;

    // ---- buys, admission order -------------------------------------------
    let mut matched_budget_buy = matched;
    let mut matched_consumed: u128 = 0;
    for order in batch.buy_orders.iter().filter(|o| !o.cancelled) {
        let result = (|| -> Result<(BTreeMap<String, u128>, BTreeMap<String, u128>, u128, u128), BondError> {
            if bond
                .current_supply
                .checked_add(order.amount)
                .map_or(true, |s| s > bond.max_supply)
            {
                return Err(BondError::ExceedsMaxSupply);
            }
            let m = order.amount.min(matched_budget_buy);
            let curve_amount = order.amount - m;

            let (mut gross, mut fees) = match (&spot, m) {
                (Some(spot), m) if m > 0 => matched_buy_cost(spot, m, bond.tx_fee_percentage)?,
                _ => (BTreeMap::new(), BTreeMap::new()),
            };
            if curve_amount > 0 {
                let quote = pricing::buy_quote(
                    bond,
                    curve_supply,
                    &bond.current_reserve,
                    curve_amount,
                    Some(&order.max_prices),
                )?;
                for (denom, g) in quote.gross {
                    add_to(&mut gross, &denom, g);
                }
                for (denom, f) in quote.fees {
                    add_to(&mut fees, &denom, f);
                }
            }

            // slippage ceiling applies to the total payable
            for (denom, &g) in &gross {
                let payable = g + fees.get(denom).copied().unwrap_or(0);
                if payable > order.max_prices.get(denom).copied().unwrap_or(0) {
                    return Err(BondError::SettlementInvalidated);
                }
            }
            Ok((gross, fees, m, curve_amount))
        })();

        match result {
            Ok((gross, fees, m, curve_amount)) => {
                for (denom, &g) in &gross {
                    let fee = fees.get(denom).copied().unwrap_or(0);
                    outcome.instructions.push(LedgerInstruction::CollectFromUser {
                        address: order.address.clone(),
                        coin: Coin::new(denom.clone(), g + fee),
                    });
                    if fee > 0 {
                        outcome
                            .instructions
                            .push(LedgerInstruction::PayFee { coin: Coin::new(denom.clone(), fee) });
                    }
                    bond.add_reserve(denom, g)?;
                }
                outcome.instructions.push(LedgerInstruction::Mint {
                    address: order.address.clone(),
                    amount: order.amount,
                });
                bond.current_supply += order.amount;
                curve_supply += curve_amount;
                matched_budget_buy -= m;
                matched_consumed += m;
                outcome.executed_buys += 1;
            }
            Err(reason) => {
                warn!(target: "settlement", "dropping buy order {} on {}: {}", order.order_id, bond.token, reason);
                outcome.failed.push(FailedOrder {
                    order_id: order.order_id,
                    address: order.address.clone(),
                    reason,
                });
            }
        }
    }

    // ---- sells, admission order ------------------------------------------
    // Only matched volume actually minted above may settle at spot; buy
    // failures shrink the budget and push the shortfall back onto the curve.
    let mut matched_budget_sell = matched_consumed;
    for order in batch.sell_orders.iter().filter(|o| !o.cancelled) {
        let result = (|| -> Result<(BTreeMap<String, u128>, BTreeMap<String, u128>, u128, u128), BondError> {
            let m = order.amount.min(matched_budget_sell);
            let curve_amount = order.amount - m;

            let (mut gross, mut fees) = match (&spot, m) {
                (Some(spot), m) if m > 0 => matched_sell_payout(spot, m, sell_fee_pct)?,
                _ => (BTreeMap::new(), BTreeMap::new()),
            };
            if curve_amount > 0 {
                let quote =
                    pricing::sell_quote(bond, curve_supply, &bond.current_reserve, curve_amount)?;
                for (denom, g) in quote.gross {
                    add_to(&mut gross, &denom, g);
                }
                for (denom, f) in quote.fees {
                    add_to(&mut fees, &denom, f);
                }
            }
            // the pool must be able to cover the payout
            for (denom, &g) in &gross {
                if g > bond.reserve_balance(denom) {
                    return Err(BondError::SettlementInvalidated);
                }
            }
            Ok((gross, fees, m, curve_amount))
        })();

        match result {
            Ok((gross, fees, m, curve_amount)) => {
                outcome.instructions.push(LedgerInstruction::Burn {
                    address: order.address.clone(),
                    amount: order.amount,
                });
                for (denom, &g) in &gross {
                    let fee = fees.get(denom).copied().unwrap_or(0);
                    if g - fee > 0 {
                        outcome.instructions.push(LedgerInstruction::PayToUser {
                            address: order.address.clone(),
                            coin: Coin::new(denom.clone(), g - fee),
                        });
                    }
                    if fee > 0 {
                        outcome
                            .instructions
                            .push(LedgerInstruction::PayFee { coin: Coin::new(denom.clone(), fee) });
                    }
                    bond.sub_reserve(denom, g)?;
                }
                bond.current_supply -= order.amount;
                curve_supply -= curve_amount;
                matched_budget_sell -= m;
                outcome.executed_sells += 1;
            }
            Err(reason) => {
                warn!(target: "settlement", "dropping sell order {} on {}: {}", order.order_id, bond.token, reason);
                outcome.failed.push(FailedOrder {
                    order_id: order.order_id,
                    address: order.address.clone(),
                    reason,
                });
            }
        }
    }

    // ---- swaps, admission order, against post-buy/sell reserves ----------
    for order in batch.swap_orders.iter().filter(|o| !o.cancelled) {
        match pricing::swap_quote(bond, &bond.current_reserve, &order.from, &order.to_token) {
            Ok(quote) => {
                outcome.instructions.push(LedgerInstruction::CollectFromUser {
                    address: order.address.clone(),
                    coin: order.from.clone(),
                });
                if quote.fee > 0 {
                    outcome.instructions.push(LedgerInstruction::PayFee {
                        coin: Coin::new(order.from.denom.clone(), quote.fee),
                    });
                }
                outcome.instructions.push(LedgerInstruction::PayToUser {
                    address: order.address.clone(),
                    coin: Coin::new(order.to_token.clone(), quote.to_amount),
                });
                bond.add_reserve(&order.from.denom, quote.from_net)?;
                bond.sub_reserve(&order.to_token, quote.to_amount)?;
                outcome.executed_swaps += 1;
            }
            Err(reason) => {
                warn!(target: "settlement", "dropping swap order {} on {}: {}", order.order_id, bond.token, reason);
                outcome.failed.push(FailedOrder {
                    order_id: order.order_id,
                    address: order.address.clone(),
                    reason,
                });
            }
        }
    }

    // ---- close the batch -------------------------------------------------
    let next_window = match bond.state {
        BondState::Open => bond.batch_blocks,
        _ => 0,
    };
    *batch = Batch::new(bond.token.clone(), next_window);

    debug!(
        target: "settlement",
        "settled {}: {} buys, {} sells, {} swaps, {} dropped",
        bond.token, outcome.executed_buys, outcome.executed_sells,
        outcome.executed_swaps, outcome.failed.len()
    );
    Ok(outcome)
}

/// Advance the block clock by one block for every bond in the store
///
/// Decrements each open batch's window and settles the ones that expire.
/// This is the single entry point the surrounding block-processing pipeline
/// calls once per block.
pub fn begin_block<S: BondStore>(store: &mut S) -> Result<Vec<SettlementOutcome>, BondError> {
    let mut outcomes = Vec::new();
    for token in store.bond_tokens() {
        let mut bond = store
            .get_bond(&token)
            .ok_or_else(|| BondError::BondNotFound(token.clone()))?;
        let mut batch = store
            .get_batch(&token)
            .ok_or_else(|| BondError::BatchNotFound(token.clone()))?;
        if batch.blocks_remaining > 0 {
            batch.blocks_remaining -= 1;
            if batch.blocks_remaining == 0 {
                outcomes.push(settle(&mut bond, &mut batch)?);
            }
        }
        store.set_bond(bond);
        store.set_batch(batch);
    }
    Ok(outcomes)
}
