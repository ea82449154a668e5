//! End-to-end scenarios for swapper (two-reserve) bonds

use std::collections::BTreeMap;

use bond_model::{lifecycle, BondError};
use bondworks_integration_tests::{coin, dec, swapper_spec, Harness};

fn seed_pool(h: &mut Harness, atom: u128, usdx: u128, shares: u128) {
    h.fund("lp", "atom", atom);
    h.fund("lp", "usdx", usdx);
    let seed = BTreeMap::from([("atom".to_string(), atom), ("usdx".to_string(), usdx)]);
    lifecycle::buy(&mut h.store, "pool", "lp", shares, seed).unwrap();
    h.settle("pool");
}

#[test]
fn first_mint_seeds_both_reserves() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, swapper_spec("pool")).unwrap();
    seed_pool(&mut h, 10_000, 2_500, 100);

    let bond = h.bond("pool");
    assert_eq!(bond.current_supply, 100);
    assert_eq!(bond.reserve_balance("atom"), 10_000);
    assert_eq!(bond.reserve_balance("usdx"), 2_500);
    assert_eq!(h.balance("lp", "atom"), 0);
    assert_eq!(h.balance("lp", "pool"), 100);
}

#[test]
fn later_mints_and_burns_are_pro_rata() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, swapper_spec("pool")).unwrap();
    seed_pool(&mut h, 10_000, 2_500, 100);

    // +50% of supply deposits +50% of each reserve
    h.fund("bob", "atom", 10_000);
    h.fund("bob", "usdx", 10_000);
    let max = BTreeMap::from([("atom".to_string(), 6_000u128), ("usdx".to_string(), 2_000u128)]);
    lifecycle::buy(&mut h.store, "pool", "bob", 50, max).unwrap();
    h.settle("pool");
    let bond = h.bond("pool");
    assert_eq!(bond.current_supply, 150);
    assert_eq!(bond.reserve_balance("atom"), 15_000);
    assert_eq!(bond.reserve_balance("usdx"), 3_750);
    assert_eq!(h.balance("bob", "atom"), 5_000);
    assert_eq!(h.balance("bob", "usdx"), 8_750);

    // burning returns the same share back
    lifecycle::sell(&mut h.store, "pool", "bob", 50).unwrap();
    h.settle("pool");
    assert_eq!(h.balance("bob", "atom"), 10_000);
    assert_eq!(h.balance("bob", "usdx"), 10_000);
    assert_eq!(h.bond("pool").current_supply, 100);
}

#[test]
fn swap_moves_the_invariant_and_charges_fee() {
    let mut h = Harness::new();
    let mut spec = swapper_spec("pool");
    spec.tx_fee_percentage = dec("1");
    lifecycle::create_bond(&mut h.store, spec).unwrap();
    seed_pool(&mut h, 10_000, 10_000, 100);

    // the 1% tx fee comes out of the lp's declared seed on each token
    assert_eq!(h.balance("fee_pool", "atom"), 100);
    assert_eq!(h.balance("fee_pool", "usdx"), 100);
    let bond = h.bond("pool");
    assert_eq!(bond.reserve_balance("atom"), 9_900);
    assert_eq!(bond.reserve_balance("usdx"), 9_900);

    h.fund("bob", "atom", 1_000);
    lifecycle::swap(&mut h.store, "pool", "bob", coin("atom", 1_000), "usdx").unwrap();
    let outcome = h.settle("pool");
    assert_eq!(outcome.executed_swaps, 1);

    // fee 1% of 1000 = 10; out = 9900·990/10890 = 900 exactly
    assert_eq!(h.balance("bob", "atom"), 0);
    assert_eq!(h.balance("bob", "usdx"), 900);
    assert_eq!(h.balance("fee_pool", "atom"), 110);
    let bond = h.bond("pool");
    assert_eq!(bond.reserve_balance("atom"), 10_890);
    assert_eq!(bond.reserve_balance("usdx"), 9_000);
}

#[test]
fn sanity_band_rechecked_at_settlement() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, swapper_spec("pool")).unwrap();
    seed_pool(&mut h, 10_000, 10_000, 100);

    // a signer tightens the band after the order was admitted
    h.fund("bob", "atom", 1_000);
    lifecycle::swap(&mut h.store, "pool", "bob", coin("atom", 1_000), "usdx").unwrap();
    lifecycle::edit_bond(
        &mut h.store,
        "pool",
        "alice",
        bond_model::BondEdits {
            sanity_rate: Some(dec("5")),
            sanity_margin_percentage: Some(dec("1")),
            ..Default::default()
        },
    )
    .unwrap();

    let outcome = h.settle("pool");
    assert_eq!(outcome.executed_swaps, 0);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].reason, BondError::SanityBoundExceeded);
    // nothing moved
    assert_eq!(h.balance("bob", "atom"), 1_000);
    assert_eq!(h.bond("pool").reserve_balance("usdx"), 10_000);
}

#[test]
fn swaps_execute_after_burns_in_the_same_batch() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, swapper_spec("pool")).unwrap();
    seed_pool(&mut h, 10_000, 10_000, 100);

    // lp burns half the pool in the same batch bob swaps; the swap quotes
    // against the post-burn reserves
    h.fund("bob", "atom", 1_000);
    lifecycle::sell(&mut h.store, "pool", "lp", 50).unwrap();
    lifecycle::swap(&mut h.store, "pool", "bob", coin("atom", 1_000), "usdx").unwrap();
    let outcome = h.settle("pool");
    assert!(outcome.failed.is_empty());

    // burn leaves 5000/5000; swap: 5000·1000/6000 = 833.33 -> 833
    assert_eq!(h.balance("bob", "usdx"), 833);
    let bond = h.bond("pool");
    assert_eq!(bond.reserve_balance("atom"), 6_000);
    assert_eq!(bond.reserve_balance("usdx"), 4_167);
}
