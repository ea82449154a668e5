//! Bond creation, editing and display

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, bail, Context, Result};
use bond_math::Decimal;
use bond_model::{
    lifecycle, query, BondEdits, BondSpec, BondStore, CurveFunction, PowerParams, Ratio,
    SigmoidParams,
};
use colored::Colorize;

use crate::config::Config;
use crate::state::ChainState;

pub struct CurveArgs {
    pub function: String,
    pub m: Option<String>,
    pub n: Option<String>,
    pub c: Option<String>,
    pub a: Option<String>,
    pub b: Option<String>,
}

fn parse_decimal(label: &str, value: &str) -> Result<Decimal> {
    value
        .parse()
        .map_err(|e| anyhow!("invalid {} '{}': {}", label, value, e))
}

fn parse_exponent(value: &str) -> Result<Ratio> {
    let (p, q) = match value.split_once('/') {
        Some((p, q)) => (p, q),
        None => (value, "1"),
    };
    Ok(Ratio::new(
        p.parse().with_context(|| format!("invalid exponent '{}'", value))?,
        q.parse().with_context(|| format!("invalid exponent '{}'", value))?,
    ))
}

fn required<'a>(label: &str, value: &'a Option<String>) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow!("--{} is required for this curve function", label))
}

/// Build the curve from CLI arguments. The exponent accepts `2` or `3/2`.
pub fn parse_function(args: &CurveArgs) -> Result<CurveFunction> {
    match args.function.as_str() {
        "power" | "augmented" => {
            let params = PowerParams {
                m: parse_decimal("m", required("m", &args.m)?)?,
                n: parse_exponent(required("n", &args.n)?)?,
                c: parse_decimal("c", required("c", &args.c)?)?,
            };
            Ok(if args.function == "power" {
                CurveFunction::Power(params)
            } else {
                CurveFunction::Augmented(params)
            })
        }
        "sigmoid" => Ok(CurveFunction::Sigmoid(SigmoidParams {
            a: parse_decimal("a", required("a", &args.a)?)?,
            b: parse_decimal("b", required("b", &args.b)?)?,
            c: parse_decimal("c", required("c", &args.c)?)?,
        })),
        "swapper" => Ok(CurveFunction::Swapper),
        other => bail!(
            "unknown curve function '{}'; expected power, sigmoid, swapper or augmented",
            other
        ),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    config: &Config,
    state: &mut ChainState,
    token: String,
    name: String,
    description: String,
    curve: CurveArgs,
    reserve_tokens: Vec<String>,
    tx_fee: String,
    exit_fee: String,
    max_supply: u128,
    batch_blocks: u64,
    allow_sells: bool,
    sanity_rate: Option<String>,
    sanity_margin: Option<String>,
    outcome_payment: u128,
    fee_address: Option<String>,
) -> Result<()> {
    let spec = BondSpec {
        token: token.clone(),
        name,
        description,
        creator: config.from.clone(),
        fee_address: fee_address.unwrap_or_else(|| "fee_pool".to_string()),
        signers: BTreeSet::from([config.from.clone()]),
        function: parse_function(&curve)?,
        reserve_tokens,
        tx_fee_percentage: parse_decimal("tx-fee", &tx_fee)?,
        exit_fee_percentage: parse_decimal("exit-fee", &exit_fee)?,
        max_supply,
        order_quantity_limits: BTreeMap::new(),
        sanity_rate: match sanity_rate {
            Some(rate) => parse_decimal("sanity-rate", &rate)?,
            None => Decimal::ZERO,
        },
        sanity_margin_percentage: match sanity_margin {
            Some(margin) => parse_decimal("sanity-margin", &margin)?,
            None => Decimal::ZERO,
        },
        allow_sells,
        batch_blocks,
        outcome_payment,
    };
    lifecycle::create_bond(state, spec)?;
    println!("{} bond {}", "Created".bright_green(), token.bold());
    Ok(())
}

pub fn edit(
    config: &Config,
    state: &mut ChainState,
    token: &str,
    name: Option<String>,
    description: Option<String>,
    sanity_rate: Option<String>,
    sanity_margin: Option<String>,
) -> Result<()> {
    let edits = BondEdits {
        name,
        description,
        order_quantity_limits: None,
        sanity_rate: sanity_rate
            .map(|rate| parse_decimal("sanity-rate", &rate))
            .transpose()?,
        sanity_margin_percentage: sanity_margin
            .map(|margin| parse_decimal("sanity-margin", &margin))
            .transpose()?,
    };
    lifecycle::edit_bond(state, token, &config.from, edits)?;
    println!("{} bond {}", "Updated".bright_green(), token.bold());
    Ok(())
}

pub fn show(state: &ChainState, token: &str) -> Result<()> {
    let bond = state
        .get_bond(token)
        .with_context(|| format!("unknown bond {}", token))?;
    println!("{}", bond.name.bold());
    println!("  token:       {}", bond.token);
    println!("  state:       {}", bond.state.as_str().bright_cyan());
    println!("  supply:      {} / {}", bond.current_supply, bond.max_supply);
    for denom in &bond.reserve_tokens {
        println!("  reserve:     {} {}", bond.reserve_balance(denom), denom);
    }
    println!(
        "  fees:        {}% tx, {}% exit -> {}",
        bond.tx_fee_percentage, bond.exit_fee_percentage, bond.fee_address
    );
    if bond.outcome_payment > 0 {
        println!(
            "  outcome:     {} / {} paid",
            bond.outcome_paid, bond.outcome_payment
        );
    }
    match query::current_price(&bond) {
        Ok(prices) => {
            for (denom, price) in prices {
                println!("  spot price:  {} {}", price, denom);
            }
        }
        Err(_) => println!("  spot price:  {}", "undefined".dimmed()),
    }
    if let Some(batch) = state.get_batch(token) {
        let pending = batch.buy_orders.iter().filter(|o| !o.cancelled).count()
            + batch.sell_orders.iter().filter(|o| !o.cancelled).count()
            + batch.swap_orders.iter().filter(|o| !o.cancelled).count();
        println!(
            "  batch:       {} pending order(s), settles in {} block(s)",
            pending, batch.blocks_remaining
        );
    }
    Ok(())
}

pub fn list(state: &ChainState) {
    if state.bonds.is_empty() {
        println!("{}", "no bonds".dimmed());
        return;
    }
    for bond in state.bonds.values() {
        println!(
            "{:12} {:10} supply {:>12}  {}",
            bond.token.bold(),
            bond.state.as_str().bright_cyan(),
            bond.current_supply,
            bond.name
        );
    }
}
