//! Block clock, settlement application, and the augmented-bond lifecycle

use anyhow::Result;
use bond_model::{begin_block, lifecycle, SettlementOutcome};
use colored::Colorize;
use log::debug;

use crate::config::Config;
use crate::state::ChainState;

/// Advance the chain by `blocks`, settling every batch whose window expires
pub fn advance(state: &mut ChainState, blocks: u64) -> Result<()> {
    for _ in 0..blocks {
        state.height += 1;
        debug!(target: "cli", "block {}", state.height);
        let outcomes = begin_block(state)?;
        for outcome in &outcomes {
            state.apply(&outcome.token, &outcome.instructions)?;
            report(state.height, outcome);
        }
    }
    println!("{} height {}", "Advanced to".bright_green(), state.height);
    Ok(())
}

fn report(height: u64, outcome: &SettlementOutcome) {
    println!(
        "{} {} at block {}: {} buys, {} sells, {} swaps",
        "Settled".bright_green(),
        outcome.token.bold(),
        height,
        outcome.executed_buys,
        outcome.executed_sells,
        outcome.executed_swaps
    );
    for failed in &outcome.failed {
        println!(
            "  {} order {} ({}): {}",
            "dropped".bright_red(),
            failed.order_id,
            failed.address,
            failed.reason
        );
    }
}

pub fn pay_outcome(
    config: &Config,
    state: &mut ChainState,
    token: &str,
    amount: u128,
) -> Result<()> {
    let (instructions, settled) =
        lifecycle::make_outcome_payment(state, token, &config.from, amount)?;
    state.apply(token, &instructions)?;
    println!(
        "{} {} outcome payment on {}",
        "Paid".bright_green(),
        amount,
        token.bold()
    );
    if let Some(outcome) = settled {
        println!(
            "{} {} entered settlement; holders may now withdraw",
            "Note:".bright_yellow(),
            token.bold()
        );
        report(state.height, &outcome);
    }
    Ok(())
}

pub fn withdraw(config: &Config, state: &mut ChainState, token: &str, amount: u128) -> Result<()> {
    let instructions = lifecycle::withdraw_share(state, token, &config.from, amount)?;
    state.apply(token, &instructions)?;
    println!(
        "{} share of {} for {} {}",
        "Withdrew".bright_green(),
        token.bold(),
        amount,
        token
    );
    Ok(())
}
