//! Pricing queries against last-settled state

use anyhow::{Context, Result};
use bond_model::{query, BondStore, Coin};
use colored::Colorize;

use crate::state::ChainState;

pub fn price(state: &ChainState, token: &str) -> Result<()> {
    let bond = state
        .get_bond(token)
        .with_context(|| format!("unknown bond {}", token))?;
    let prices = query::current_price(&bond)?;
    for (denom, price) in prices {
        println!("{} {}", price.to_string().bold(), denom);
    }
    Ok(())
}

pub fn price_at(state: &ChainState, token: &str, supply: u128) -> Result<()> {
    let bond = state
        .get_bond(token)
        .with_context(|| format!("unknown bond {}", token))?;
    let price = query::price_at_supply(&bond, supply)?;
    println!("{} at supply {}", price.to_string().bold(), supply);
    Ok(())
}

pub fn mint_cost(state: &ChainState, token: &str, amount: u128) -> Result<()> {
    let bond = state
        .get_bond(token)
        .with_context(|| format!("unknown bond {}", token))?;
    let quote = query::price_to_mint(&bond, amount)?;
    println!("minting {} {}:", amount, token.bold());
    for (denom, total) in &quote.total {
        let fee = quote.fees.get(denom).copied().unwrap_or(0);
        println!("  {} {} ({} fee)", total, denom, fee);
    }
    Ok(())
}

pub fn burn_return(state: &ChainState, token: &str, amount: u128) -> Result<()> {
    let bond = state
        .get_bond(token)
        .with_context(|| format!("unknown bond {}", token))?;
    let quote = query::return_on_burn(&bond, amount)?;
    println!("burning {} {}:", amount, token.bold());
    for (denom, net) in &quote.net {
        let fee = quote.fees.get(denom).copied().unwrap_or(0);
        println!("  {} {} ({} fee)", net, denom, fee);
    }
    Ok(())
}

pub fn swap_return(
    state: &ChainState,
    token: &str,
    from_denom: &str,
    amount: u128,
    to_denom: &str,
) -> Result<()> {
    let bond = state
        .get_bond(token)
        .with_context(|| format!("unknown bond {}", token))?;
    let quote = query::return_on_swap(&bond, &Coin::new(from_denom, amount), to_denom)?;
    println!(
        "{} {} -> {} {} ({} {} fee)",
        amount,
        from_denom,
        quote.to_amount.to_string().bold(),
        to_denom,
        quote.fee,
        from_denom
    );
    Ok(())
}
