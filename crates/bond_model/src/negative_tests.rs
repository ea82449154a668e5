//! Adversarial scenarios: every test here must fail safely
//!
//! Each case models a hostile or degenerate input and asserts the engine
//! rejects it without corrupting supply or reserve state.

use std::collections::{BTreeMap, BTreeSet};

use bond_math::Decimal;

use crate::batch::Batch;
use crate::bond::{Bond, BondSpec, Coin};
use crate::curve::{CurveFunction, PowerParams, Ratio};
use crate::error::BondError;
use crate::lifecycle;
use crate::pricing;
use crate::settlement;
use crate::store::{BondStore, MemStore};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn power_spec() -> BondSpec {
    BondSpec {
        token: "abc".into(),
        name: "A Bond".into(),
        description: String::new(),
        creator: "alice".into(),
        fee_address: "fees".into(),
        signers: BTreeSet::from(["alice".to_string()]),
        function: CurveFunction::Power(PowerParams {
            m: dec("12"),
            n: Ratio::new(2, 1),
            c: dec("100"),
        }),
        reserve_tokens: vec!["res".into()],
        tx_fee_percentage: dec("0.5"),
        exit_fee_percentage: dec("0.1"),
        max_supply: 1_000_000,
        order_quantity_limits: Default::default(),
        sanity_rate: Decimal::ZERO,
        sanity_margin_percentage: Decimal::ZERO,
        allow_sells: true,
        batch_blocks: 1,
        outcome_payment: 0,
    }
}

fn swapper_spec() -> BondSpec {
    let mut spec = power_spec();
    spec.token = "pool".into();
    spec.function = CurveFunction::Swapper;
    spec.reserve_tokens = vec!["aaa".into(), "bbb".into()];
    spec.tx_fee_percentage = Decimal::ZERO;
    spec.exit_fee_percentage = Decimal::ZERO;
    spec
}

fn generous() -> BTreeMap<String, u128> {
    BTreeMap::from([
        ("res".to_string(), u128::MAX / 4),
        ("aaa".to_string(), u128::MAX / 4),
        ("bbb".to_string(), u128::MAX / 4),
    ])
}

#[test]
fn zero_amount_orders_are_rejected() {
    let bond = Bond::new(power_spec()).unwrap();
    assert!(matches!(
        pricing::buy_quote(&bond, 0, &bond.current_reserve, 0, None),
        Err(BondError::ParameterInvalid(_))
    ));
    assert!(matches!(
        pricing::sell_quote(&bond, 10, &bond.current_reserve, 0),
        Err(BondError::ParameterInvalid(_))
    ));
}

#[test]
fn selling_more_than_exists_never_underflows() {
    let mut store = MemStore::new();
    lifecycle::create_bond(&mut store, power_spec()).unwrap();
    lifecycle::buy(&mut store, "abc", "bob", 10, generous()).unwrap();
    settlement::begin_block(&mut store).unwrap();

    // direct oversell
    assert_eq!(
        lifecycle::sell(&mut store, "abc", "bob", 11),
        Err(BondError::ExceedsSupply)
    );
    // oversell split across two orders against the adjusted supply
    lifecycle::sell(&mut store, "abc", "bob", 10).unwrap();
    assert_eq!(
        lifecycle::sell(&mut store, "abc", "bob", 1),
        Err(BondError::ExceedsSupply)
    );
    settlement::begin_block(&mut store).unwrap();
    let bond = store.get_bond("abc").unwrap();
    assert_eq!(bond.current_supply, 0);
}

#[test]
fn buy_cannot_blow_past_max_supply_across_orders() {
    let mut spec = power_spec();
    spec.max_supply = 15;
    let mut store = MemStore::new();
    lifecycle::create_bond(&mut store, spec).unwrap();
    lifecycle::buy(&mut store, "abc", "bob", 10, generous()).unwrap();
    assert_eq!(
        lifecycle::buy(&mut store, "abc", "carol", 6, generous()),
        Err(BondError::ExceedsMaxSupply)
    );
    settlement::begin_block(&mut store).unwrap();
    assert!(store.get_bond("abc").unwrap().current_supply <= 15);
}

#[test]
fn splitting_an_order_into_dust_never_pays_less() {
    // per-order ceilings mean five 1-token buys cost at least as much as
    // one 5-token buy over the same curve segment
    let mut store = MemStore::new();
    lifecycle::create_bond(&mut store, power_spec()).unwrap();
    for _ in 0..5 {
        lifecycle::buy(&mut store, "abc", "bob", 1, generous()).unwrap();
    }
    settlement::begin_block(&mut store).unwrap();
    let bond = store.get_bond("abc").unwrap();
    assert_eq!(bond.current_supply, 5);
    let split_gross = bond.reserve_balance("res");

    let mut store2 = MemStore::new();
    lifecycle::create_bond(&mut store2, power_spec()).unwrap();
    lifecycle::buy(&mut store2, "abc", "bob", 5, generous()).unwrap();
    settlement::begin_block(&mut store2).unwrap();
    let single_gross = store2.get_bond("abc").unwrap().reserve_balance("res");
    assert!(split_gross >= single_gross);
}

#[test]
fn cancel_is_not_replayable_and_not_transferable() {
    let bond = Bond::new(power_spec()).unwrap();
    let mut batch = Batch::new("abc", 1);
    let id = batch.admit_buy(&bond, "bob", 10, generous()).unwrap();
    assert_eq!(batch.cancel(id, "mallory"), Err(BondError::Unauthorized));
    batch.cancel(id, "bob").unwrap();
    assert_eq!(batch.cancel(id, "bob"), Err(BondError::OrderNotFound(id)));
    // totals fully reversed, nothing to settle
    assert_eq!(batch.total_buy_amount, 0);
    assert_eq!(batch.reserve_delta.get("res").copied().unwrap_or(0), 0);
}

#[test]
fn swap_cannot_drain_a_reserve() {
    let mut store = MemStore::new();
    lifecycle::create_bond(&mut store, swapper_spec()).unwrap();
    let seed = BTreeMap::from([("aaa".to_string(), 1000u128), ("bbb".to_string(), 1000u128)]);
    lifecycle::buy(&mut store, "pool", "lp", 100, seed).unwrap();
    settlement::begin_block(&mut store).unwrap();

    // an enormous input asymptotically approaches, never reaches, the pool
    lifecycle::swap(
        &mut store,
        "pool",
        "whale",
        Coin::new("aaa", 1_000_000_000),
        "bbb",
    )
    .unwrap();
    settlement::begin_block(&mut store).unwrap();
    let bond = store.get_bond("pool").unwrap();
    assert!(bond.reserve_balance("bbb") > 0);
    assert!(bond.reserve_balance("aaa") > 1000);
}

#[test]
fn sanity_band_blocks_manipulated_pools() {
    let mut spec = swapper_spec();
    spec.sanity_rate = dec("1");
    spec.sanity_margin_percentage = dec("5");
    let mut store = MemStore::new();
    lifecycle::create_bond(&mut store, spec).unwrap();
    // seed a badly skewed pool: rate aaa:bbb = 10, far outside 1 ± 5%
    let seed = BTreeMap::from([("aaa".to_string(), 10_000u128), ("bbb".to_string(), 1000u128)]);
    lifecycle::buy(&mut store, "pool", "lp", 100, seed).unwrap();
    settlement::begin_block(&mut store).unwrap();

    assert_eq!(
        lifecycle::swap(&mut store, "pool", "bob", Coin::new("aaa", 100), "bbb"),
        Err(BondError::SanityBoundExceeded)
    );
}

#[test]
fn disabled_sells_stay_disabled_through_settlement() {
    let mut spec = power_spec();
    spec.allow_sells = false;
    let mut store = MemStore::new();
    lifecycle::create_bond(&mut store, spec).unwrap();
    lifecycle::buy(&mut store, "abc", "bob", 10, generous()).unwrap();
    settlement::begin_block(&mut store).unwrap();
    assert_eq!(
        lifecycle::sell(&mut store, "abc", "bob", 1),
        Err(BondError::SellsDisabled)
    );
}

#[test]
fn absurd_parameters_cannot_create_bonds() {
    for mutate in [
        (|s: &mut BondSpec| s.token = String::new()) as fn(&mut BondSpec),
        |s| s.batch_blocks = 0,
        |s| s.max_supply = 0,
        |s| s.tx_fee_percentage = dec("100"),
        |s| s.exit_fee_percentage = dec("-0.000000001"),
        |s| s.reserve_tokens = vec![],
        |s| s.reserve_tokens = vec!["abc".into()],
        |s| {
            s.function = CurveFunction::Power(PowerParams {
                m: dec("-1"),
                n: Ratio::new(1, 1),
                c: dec("0"),
            })
        },
        |s| {
            s.function = CurveFunction::Power(PowerParams {
                m: dec("1"),
                n: Ratio::new(1, 0),
                c: dec("0"),
            })
        },
    ] {
        let mut spec = power_spec();
        mutate(&mut spec);
        assert!(
            matches!(Bond::new(spec), Err(BondError::ParameterInvalid(_))),
            "mutation should have been rejected"
        );
    }
}

#[test]
fn huge_but_plausible_volumes_do_not_overflow() {
    // linear curve, supply near the u64 range the host would realistically
    // cap at; every step must stay within checked i128 math
    let mut spec = power_spec();
    spec.function = CurveFunction::Power(PowerParams {
        m: dec("0.000001"),
        n: Ratio::new(1, 1),
        c: dec("1"),
    });
    spec.max_supply = u64::MAX as u128;
    let bond = Bond::new(spec).unwrap();
    let supply = 1u128 << 40;
    let quote = pricing::buy_quote(&bond, supply, &bond.current_reserve, 1 << 20, None).unwrap();
    assert!(quote.total["res"] > 0);
}

#[test]
fn overflowing_volumes_error_instead_of_wrapping() {
    let mut spec = power_spec();
    spec.max_supply = u128::MAX;
    let bond = Bond::new(spec).unwrap();
    // supply beyond the fixed-point range must surface Math, not panic
    let result = pricing::buy_quote(&bond, u128::MAX / 2, &bond.current_reserve, 1, None);
    assert!(matches!(result, Err(BondError::Math(_))));
}
