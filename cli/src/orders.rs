//! Order entry and balances

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use bond_model::{lifecycle, Coin};
use colored::Colorize;

use crate::config::Config;
use crate::state::ChainState;

/// Parse repeated `DENOM=AMOUNT` arguments into a max-prices map
pub fn parse_max_prices(pairs: &[String]) -> Result<BTreeMap<String, u128>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let Some((denom, amount)) = pair.split_once('=') else {
            bail!("expected DENOM=AMOUNT, got '{}'", pair);
        };
        let amount: u128 = amount
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid amount in '{}': {}", pair, e))?;
        map.insert(denom.to_string(), amount);
    }
    Ok(map)
}

pub fn buy(
    config: &Config,
    state: &mut ChainState,
    token: &str,
    amount: u128,
    max_prices: &[String],
) -> Result<()> {
    let max_prices = parse_max_prices(max_prices)?;
    let order_id = lifecycle::buy(state, token, &config.from, amount, max_prices)?;
    println!(
        "{} buy order {} for {} {}",
        "Queued".bright_green(),
        order_id,
        amount,
        token
    );
    Ok(())
}

pub fn sell(config: &Config, state: &mut ChainState, token: &str, amount: u128) -> Result<()> {
    let order_id = lifecycle::sell(state, token, &config.from, amount)?;
    println!(
        "{} sell order {} for {} {}",
        "Queued".bright_green(),
        order_id,
        amount,
        token
    );
    Ok(())
}

pub fn swap(
    config: &Config,
    state: &mut ChainState,
    token: &str,
    from_denom: &str,
    amount: u128,
    to_denom: &str,
) -> Result<()> {
    let order_id = lifecycle::swap(
        state,
        token,
        &config.from,
        Coin::new(from_denom, amount),
        to_denom,
    )?;
    println!(
        "{} swap order {}: {} {} -> {}",
        "Queued".bright_green(),
        order_id,
        amount,
        from_denom,
        to_denom
    );
    Ok(())
}

pub fn cancel(config: &Config, state: &mut ChainState, token: &str, order_id: u64) -> Result<()> {
    lifecycle::cancel_order(state, token, order_id, &config.from)?;
    println!("{} order {}", "Cancelled".bright_yellow(), order_id);
    Ok(())
}

/// Credit tokens out of thin air; the simulator's stand-in for a bank module
pub fn faucet(state: &mut ChainState, address: &str, denom: &str, amount: u128) {
    state.credit(address, denom, amount);
    println!(
        "{} {} {} to {}",
        "Issued".bright_green(),
        amount,
        denom,
        address
    );
}

pub fn balances(state: &ChainState, address: &str) {
    match state.balances.get(address) {
        Some(held) if !held.is_empty() => {
            println!("{}", address.bold());
            for (denom, amount) in held {
                println!("  {:>20} {}", amount, denom);
            }
        }
        _ => println!("{} holds nothing", address),
    }
}
