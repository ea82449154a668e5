//! Store-level bond operations
//!
//! Thin orchestration over [`Bond`], [`Batch`] and [`BondStore`]: each
//! function loads, validates, mutates and writes back, returning the ledger
//! instructions the host must apply. Order admission happens here; order
//! execution happens in [`crate::settlement`].

use std::collections::BTreeMap;

use bond_math::Decimal;
use log::info;

use crate::batch::Batch;
use crate::bond::{Bond, BondEdits, BondSpec, BondState, Coin};
use crate::error::BondError;
use crate::settlement::{self, LedgerInstruction, SettlementOutcome};
use crate::store::BondStore;

/// Create a bond and open its first batch
pub fn create_bond<S: BondStore>(store: &mut S, spec: BondSpec) -> Result<(), BondError> {
    if store.get_bond(&spec.token).is_some() {
        return Err(BondError::ParameterInvalid(format!(
            "bond token {} already exists",
            spec.token
        )));
    }
    let bond = Bond::new(spec)?;
    info!(target: "bonds", "created bond {} ({})", bond.token, bond.name);
    store.set_batch(Batch::new(bond.token.clone(), bond.batch_blocks));
    store.set_bond(bond);
    Ok(())
}

/// Apply signer edits to an open bond
pub fn edit_bond<S: BondStore>(
    store: &mut S,
    token: &str,
    editor: &str,
    edits: BondEdits,
) -> Result<(), BondError> {
    let mut bond = store
        .get_bond(token)
        .ok_or_else(|| BondError::BondNotFound(token.to_string()))?;
    bond.edit(editor, edits)?;
    store.set_bond(bond);
    Ok(())
}

fn load<S: BondStore>(store: &S, token: &str) -> Result<(Bond, Batch), BondError> {
    let bond = store
        .get_bond(token)
        .ok_or_else(|| BondError::BondNotFound(token.to_string()))?;
    let batch = store
        .get_batch(token)
        .ok_or_else(|| BondError::BatchNotFound(token.to_string()))?;
    Ok((bond, batch))
}

/// Admit a buy order into the current batch; returns the order id
pub fn buy<S: BondStore>(
    store: &mut S,
    token: &str,
    address: &str,
    amount: u128,
    max_prices: BTreeMap<String, u128>,
) -> Result<u64, BondError> {
    let (bond, mut batch) = load(store, token)?;
    let order_id = batch.admit_buy(&bond, address, amount, max_prices)?;
    store.set_batch(batch);
    Ok(order_id)
}

/// Admit a sell order into the current batch; returns the order id
pub fn sell<S: BondStore>(
    store: &mut S,
    token: &str,
    address: &str,
    amount: u128,
) -> Result<u64, BondError> {
    let (bond, mut batch) = load(store, token)?;
    let order_id = batch.admit_sell(&bond, address, amount)?;
    store.set_batch(batch);
    Ok(order_id)
}

/// Admit a swap order into the current batch; returns the order id
pub fn swap<S: BondStore>(
    store: &mut S,
    token: &str,
    address: &str,
    from: Coin,
    to_token: &str,
) -> Result<u64, BondError> {
    let (bond, mut batch) = load(store, token)?;
    let order_id = batch.admit_swap(&bond, address, from, to_token)?;
    store.set_batch(batch);
    Ok(order_id)
}

/// Cancel an order still waiting in the current batch
pub fn cancel_order<S: BondStore>(
    store: &mut S,
    token: &str,
    order_id: u64,
    address: &str,
) -> Result<(), BondError> {
    let (_, mut batch) = load(store, token)?;
    batch.cancel(order_id, address)?;
    store.set_batch(batch);
    Ok(())
}

/// Pay (part of) an augmented bond's outcome payment into the reserve
///
/// The pending batch is settled before the state transition so no admitted
/// order is stranded. Once the full outcome amount has been received the
/// bond moves to Settlement and stops accepting orders; token holders then
/// exit via [`withdraw_share`].
pub fn make_outcome_payment<S: BondStore>(
    store: &mut S,
    token: &str,
    address: &str,
    amount: u128,
) -> Result<(Vec<LedgerInstruction>, Option<SettlementOutcome>), BondError> {
    let (mut bond, mut batch) = load(store, token)?;
    if bond.state != BondState::Open {
        return Err(BondError::InvalidState(bond.state.as_str()));
    }
    if bond.outcome_payment == 0 {
        return Err(BondError::ParameterInvalid(
            "bond has no outcome payment".into(),
        ));
    }
    let remaining = bond.outcome_payment - bond.outcome_paid;
    if amount == 0 || amount > remaining {
        return Err(BondError::ParameterInvalid(format!(
            "outcome payment must be in [1, {}]",
            remaining
        )));
    }

    // augmented bonds have exactly one reserve token
    let denom = bond.reserve_tokens[0].clone();
    let mut instructions = vec![LedgerInstruction::CollectFromUser {
        address: address.to_string(),
        coin: Coin::new(denom.clone(), amount),
    }];
    bond.add_reserve(&denom, amount)?;
    bond.outcome_paid += amount;

    let mut settled = None;
    if bond.outcome_fully_paid() {
        info!(target: "bonds", "outcome payment complete on {}, entering settlement", bond.token);
        let outcome = settlement::settle(&mut bond, &mut batch)?;
        instructions.extend(outcome.instructions.iter().cloned());
        settled = Some(outcome);
        bond.state = BondState::Settlement;
        batch.blocks_remaining = 0;
    }

    store.set_bond(bond);
    store.set_batch(batch);
    Ok((instructions, settled))
}

/// Withdraw a pro-rata share of the reserve during Settlement
///
/// `amount` is the caller's bond token holding to burn; the host has already
/// verified ownership. The last withdrawer takes the entire remaining pool,
/// so rounding dust never strands. At zero supply the bond ends.
pub fn withdraw_share<S: BondStore>(
    store: &mut S,
    token: &str,
    address: &str,
    amount: u128,
) -> Result<Vec<LedgerInstruction>, BondError> {
    let mut bond = store
        .get_bond(token)
        .ok_or_else(|| BondError::BondNotFound(token.to_string()))?;
    if bond.state != BondState::Settlement {
        return Err(BondError::InvalidState(bond.state.as_str()));
    }
    if amount == 0 {
        return Err(BondError::ParameterInvalid("amount must be > 0".into()));
    }
    if amount > bond.current_supply {
        return Err(BondError::ExceedsSupply);
    }

    let mut instructions = vec![LedgerInstruction::Burn {
        address: address.to_string(),
        amount,
    }];
    let denoms: Vec<String> = bond.reserve_tokens.clone();
    for denom in denoms {
        let balance = bond.reserve_balance(&denom);
        let share = if amount == bond.current_supply {
            balance
        } else {
            // floor(balance · amount / supply)
            let balance_dec = Decimal::from_units(balance)?;
            let amount_dec = Decimal::from_units(amount)?;
            let supply_dec = Decimal::from_units(bond.current_supply)?;
            balance_dec
                .checked_mul(amount_dec)?
                .checked_div(supply_dec)?
                .to_units_floor()?
        };
        if share > 0 {
            instructions.push(LedgerInstruction::PayToUser {
                address: address.to_string(),
                coin: Coin::new(denom.clone(), share),
            });
            bond.sub_reserve(&denom, share)?;
        }
    }
    bond.current_supply -= amount;
    if bond.current_supply == 0 {
        info!(target: "bonds", "bond {} fully withdrawn, ended", bond.token);
        bond.state = BondState::Ended;
    }
    store.set_bond(bond);
    Ok(instructions)
}
