//! Per-bond order batch for the current block window
//!
//! Orders append in admission order and are never removed before settlement;
//! insertion order is the settlement tie-break. Running totals and reserve
//! deltas give the provisionally adjusted supply/reserve that admission-time
//! quotes are computed against, so orders in the same batch quote
//! consistently without waiting for settlement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bond::{Bond, BondState, Coin};
use crate::error::BondError;
use crate::pricing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
    Swap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub order_id: u64,
    pub address: String,
    /// Bond tokens requested
    pub amount: u128,
    /// Slippage ceiling per reserve token, checked against the total payable
    pub max_prices: BTreeMap<String, u128>,
    pub cancelled: bool,
    /// Curve cost per reserve token at admission (carried in reserve_delta)
    pub quote_gross: BTreeMap<String, u128>,
    /// gross + fee: the total payable recorded at admission
    pub quote_total: BTreeMap<String, u128>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellOrder {
    pub order_id: u64,
    pub address: String,
    /// Bond tokens to burn
    pub amount: u128,
    pub cancelled: bool,
    /// Curve return per reserve token at admission (carried in reserve_delta)
    pub quote_gross: BTreeMap<String, u128>,
    /// gross − fees: the net payout recorded at admission
    pub quote_net: BTreeMap<String, u128>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    pub order_id: u64,
    pub address: String,
    pub from: Coin,
    pub to_token: String,
    pub cancelled: bool,
    /// Input net of fee at admission (carried in reserve_delta)
    pub quote_from_net: u128,
    /// Output amount recorded at admission (carried in reserve_delta)
    pub quote_to_amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub token: String,
    pub blocks_remaining: u64,
    /// Monotonic order id, unique within this batch
    pub next_order_id: u64,
    pub total_buy_amount: u128,
    pub total_sell_amount: u128,
    /// Net provisional reserve movement of admitted orders, by denom
    pub reserve_delta: BTreeMap<String, i128>,
    pub buy_orders: Vec<BuyOrder>,
    pub sell_orders: Vec<SellOrder>,
    pub swap_orders: Vec<SwapOrder>,
}

impl Batch {
    pub fn new(token: impl Into<String>, blocks: u64) -> Self {
        Batch {
            token: token.into(),
            blocks_remaining: blocks,
            next_order_id: 1,
            total_buy_amount: 0,
            total_sell_amount: 0,
            reserve_delta: BTreeMap::new(),
            buy_orders: Vec::new(),
            sell_orders: Vec::new(),
            swap_orders: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buy_orders.iter().all(|o| o.cancelled)
            && self.sell_orders.iter().all(|o| o.cancelled)
            && self.swap_orders.iter().all(|o| o.cancelled)
    }

    /// Supply including the net effect of admitted, unsettled orders
    pub fn adjusted_supply(&self, current: u128) -> u128 {
        // sells never exceed the adjusted supply at admission, so this
        // cannot underflow
        current + self.total_buy_amount - self.total_sell_amount
    }

    /// Reserve including the net effect of admitted, unsettled orders
    pub fn adjusted_reserve(
        &self,
        current: &BTreeMap<String, u128>,
    ) -> Result<BTreeMap<String, u128>, BondError> {
        let mut adjusted = current.clone();
        for (denom, &delta) in &self.reserve_delta {
            let balance = adjusted.entry(denom.clone()).or_insert(0);
            let next = (*balance as i128)
                .checked_add(delta)
                .ok_or(bond_math::MathError::Overflow)?;
            if next < 0 {
                return Err(BondError::SettlementInvalidated);
            }
            *balance = next as u128;
        }
        Ok(adjusted)
    }

    fn apply_reserve_delta(&mut self, denom: &str, delta: i128) {
        *self.reserve_delta.entry(denom.to_string()).or_insert(0) += delta;
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        id
    }

    /// Validate and enqueue a buy; returns the order id
    pub fn admit_buy(
        &mut self,
        bond: &Bond,
        address: impl Into<String>,
        amount: u128,
        max_prices: BTreeMap<String, u128>,
    ) -> Result<u64, BondError> {
        if bond.state != BondState::Open {
            return Err(BondError::InvalidState(bond.state.as_str()));
        }
        bond.check_order_limit(&bond.token, amount)?;

        let supply = self.adjusted_supply(bond.current_supply);
        let reserve = self.adjusted_reserve(&bond.current_reserve)?;
        let quote = pricing::buy_quote(bond, supply, &reserve, amount, Some(&max_prices))?;

        // slippage ceiling must already hold at admission
        for (denom, &payable) in &quote.total {
            let ceiling = max_prices.get(denom).copied().unwrap_or(0);
            if payable > ceiling {
                return Err(BondError::SettlementInvalidated);
            }
        }

        for (denom, &g) in &quote.gross {
            self.apply_reserve_delta(denom, g as i128);
        }
        self.total_buy_amount += amount;
        let order_id = self.next_id();
        self.buy_orders.push(BuyOrder {
            order_id,
            address: address.into(),
            amount,
            max_prices,
            cancelled: false,
            quote_gross: quote.gross,
            quote_total: quote.total,
        });
        Ok(order_id)
    }

    /// Validate and enqueue a sell; returns the order id
    pub fn admit_sell(
        &mut self,
        bond: &Bond,
        address: impl Into<String>,
        amount: u128,
    ) -> Result<u64, BondError> {
        if bond.state != BondState::Open {
            return Err(BondError::InvalidState(bond.state.as_str()));
        }
        bond.check_order_limit(&bond.token, amount)?;

        let supply = self.adjusted_supply(bond.current_supply);
        let reserve = self.adjusted_reserve(&bond.current_reserve)?;
        let quote = pricing::sell_quote(bond, supply, &reserve, amount)?;

        for (denom, &g) in &quote.gross {
            self.apply_reserve_delta(denom, -(g as i128));
        }
        self.total_sell_amount += amount;
        let order_id = self.next_id();
        self.sell_orders.push(SellOrder {
            order_id,
            address: address.into(),
            amount,
            cancelled: false,
            quote_gross: quote.gross,
            quote_net: quote.net,
        });
        Ok(order_id)
    }

    /// Validate and enqueue a swap; returns the order id
    pub fn admit_swap(
        &mut self,
        bond: &Bond,
        address: impl Into<String>,
        from: Coin,
        to_token: impl Into<String>,
    ) -> Result<u64, BondError> {
        if bond.state != BondState::Open {
            return Err(BondError::InvalidState(bond.state.as_str()));
        }
        let to_token = to_token.into();
        bond.check_order_limit(&from.denom, from.amount)?;

        let reserve = self.adjusted_reserve(&bond.current_reserve)?;
        let quote = pricing::swap_quote(bond, &reserve, &from, &to_token)?;

        self.apply_reserve_delta(&from.denom, quote.from_net as i128);
        self.apply_reserve_delta(&to_token, -(quote.to_amount as i128));
        let order_id = self.next_id();
        self.swap_orders.push(SwapOrder {
            order_id,
            address: address.into(),
            from,
            to_token,
            cancelled: false,
            quote_from_net: quote.from_net,
            quote_to_amount: quote.to_amount,
        });
        Ok(order_id)
    }

    /// Mark an order cancelled and back out its provisional effects
    ///
    /// Only the submitting address may cancel, and only while the batch is
    /// still open; settlement ignores cancelled orders entirely.
    pub fn cancel(&mut self, order_id: u64, address: &str) -> Result<OrderSide, BondError> {
        if let Some(idx) = self
            .buy_orders
            .iter()
            .position(|o| o.order_id == order_id && !o.cancelled)
        {
            if self.buy_orders[idx].address != address {
                return Err(BondError::Unauthorized);
            }
            self.buy_orders[idx].cancelled = true;
            let amount = self.buy_orders[idx].amount;
            let gross = self.buy_orders[idx].quote_gross.clone();
            self.total_buy_amount -= amount;
            for (denom, g) in gross {
                self.apply_reserve_delta(&denom, -(g as i128));
            }
            return Ok(OrderSide::Buy);
        }
        if let Some(idx) = self
            .sell_orders
            .iter()
            .position(|o| o.order_id == order_id && !o.cancelled)
        {
            if self.sell_orders[idx].address != address {
                return Err(BondError::Unauthorized);
            }
            self.sell_orders[idx].cancelled = true;
            let amount = self.sell_orders[idx].amount;
            let gross = self.sell_orders[idx].quote_gross.clone();
            self.total_sell_amount -= amount;
            for (denom, g) in gross {
                self.apply_reserve_delta(&denom, g as i128);
            }
            return Ok(OrderSide::Sell);
        }
        if let Some(idx) = self
            .swap_orders
            .iter()
            .position(|o| o.order_id == order_id && !o.cancelled)
        {
            if self.swap_orders[idx].address != address {
                return Err(BondError::Unauthorized);
            }
            self.swap_orders[idx].cancelled = true;
            let from_denom = self.swap_orders[idx].from.denom.clone();
            let to_denom = self.swap_orders[idx].to_token.clone();
            let from_net = self.swap_orders[idx].quote_from_net;
            let to_amount = self.swap_orders[idx].quote_to_amount;
            self.apply_reserve_delta(&from_denom, -(from_net as i128));
            self.apply_reserve_delta(&to_denom, to_amount as i128);
            return Ok(OrderSide::Swap);
        }
        Err(BondError::OrderNotFound(order_id))
    }
}
