//! End-to-end scenarios for power and augmented bonds

use bond_model::{lifecycle, BondState, CurveFunction, PowerParams, Ratio};
use bondworks_integration_tests::{dec, generous, power_spec, Harness};

#[test]
fn power_bond_full_lifecycle() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, power_spec("abc", 2)).unwrap();
    h.fund("bob", "res", 100_000);
    h.fund("carol", "res", 100_000);

    // batch 1: two buys queue, nothing settles until the window elapses
    lifecycle::buy(&mut h.store, "abc", "bob", 10, generous(&["res"])).unwrap();
    lifecycle::buy(&mut h.store, "abc", "carol", 10, generous(&["res"])).unwrap();
    assert!(h.step().is_empty());
    assert_eq!(h.bond("abc").current_supply, 0);

    let outcome = h.settle("abc");
    assert_eq!(outcome.executed_buys, 2);
    assert!(outcome.failed.is_empty());

    // bob paid the 0→10 integral, carol the 10→20 one
    assert_eq!(h.balance("bob", "res"), 100_000 - 5_000);
    assert_eq!(h.balance("carol", "res"), 100_000 - 29_000);
    assert_eq!(h.balance("bob", "abc"), 10);
    assert_eq!(h.balance("carol", "abc"), 10);
    let bond = h.bond("abc");
    assert_eq!(bond.current_supply, 20);
    assert_eq!(bond.reserve_balance("res"), 34_000);

    // batch 2: carol exits entirely, curve returns her integral back
    lifecycle::sell(&mut h.store, "abc", "carol", 10).unwrap();
    let outcome = h.settle("abc");
    assert_eq!(outcome.executed_sells, 1);
    assert_eq!(h.balance("carol", "res"), 100_000);
    assert_eq!(h.balance("carol", "abc"), 0);
    assert_eq!(h.bond("abc").current_supply, 10);
    assert_eq!(h.bond("abc").reserve_balance("res"), 5_000);
}

#[test]
fn fees_route_to_the_fee_address() {
    let mut h = Harness::new();
    let mut spec = power_spec("abc", 1);
    spec.tx_fee_percentage = dec("1");
    spec.exit_fee_percentage = dec("2");
    lifecycle::create_bond(&mut h.store, spec).unwrap();
    h.fund("bob", "res", 100_000);

    lifecycle::buy(&mut h.store, "abc", "bob", 10, generous(&["res"])).unwrap();
    h.settle("abc");
    // 1% of 5000
    assert_eq!(h.balance("fee_pool", "res"), 50);
    assert_eq!(h.balance("bob", "res"), 100_000 - 5_050);

    lifecycle::sell(&mut h.store, "abc", "bob", 10).unwrap();
    h.settle("abc");
    // sells pay tx + exit: 3% of 5000
    assert_eq!(h.balance("fee_pool", "res"), 50 + 150);
    assert_eq!(h.balance("bob", "res"), 100_000 - 5_050 + 4_850);
    assert_eq!(h.bond("abc").reserve_balance("res"), 0);
}

#[test]
fn netted_batch_settles_matched_volume_at_spot() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, power_spec("abc", 1)).unwrap();
    h.fund("seed", "res", 10_000_000);
    h.fund("bob", "res", 10_000_000);

    lifecycle::buy(&mut h.store, "abc", "seed", 100, generous(&["res"])).unwrap();
    h.settle("abc");
    let reserve_before = h.bond("abc").reserve_balance("res");

    // equal volumes: seed sells 30, bob buys 30, spot = 12·100²+100 = 120100
    lifecycle::sell(&mut h.store, "abc", "seed", 30).unwrap();
    lifecycle::buy(&mut h.store, "abc", "bob", 30, generous(&["res"])).unwrap();
    let outcome = h.settle("abc");
    assert!(outcome.failed.is_empty());

    assert_eq!(h.bond("abc").current_supply, 100);
    assert_eq!(h.bond("abc").reserve_balance("res"), reserve_before);
    assert_eq!(h.balance("bob", "res"), 10_000_000 - 30 * 120_100);
    assert_eq!(h.balance("seed", "res"), 10_000_000 - reserve_before + 30 * 120_100);
    assert_eq!(h.balance("bob", "abc"), 30);
    assert_eq!(h.balance("seed", "abc"), 70);
}

#[test]
fn augmented_bond_outcome_and_withdraw() {
    let mut h = Harness::new();
    let mut spec = power_spec("abc", 1);
    spec.function = CurveFunction::Augmented(PowerParams {
        m: dec("12"),
        n: Ratio::new(2, 1),
        c: dec("100"),
    });
    spec.outcome_payment = 10_000;
    lifecycle::create_bond(&mut h.store, spec).unwrap();
    h.fund("bob", "res", 100_000);
    h.fund("carol", "res", 100_000);
    h.fund("oracle", "res", 100_000);

    lifecycle::buy(&mut h.store, "abc", "bob", 6, generous(&["res"])).unwrap();
    lifecycle::buy(&mut h.store, "abc", "carol", 4, generous(&["res"])).unwrap();
    h.settle("abc");
    assert_eq!(h.bond("abc").reserve_balance("res"), 5_000);

    // partial payment leaves the bond open
    h.pay_outcome("abc", "oracle", 4_000);
    assert_eq!(h.bond("abc").state, BondState::Open);

    h.pay_outcome("abc", "oracle", 6_000);
    let bond = h.bond("abc");
    assert_eq!(bond.state, BondState::Settlement);
    assert_eq!(bond.reserve_balance("res"), 15_000);
    assert_eq!(h.balance("oracle", "res"), 90_000);

    // orders are refused during settlement
    assert!(lifecycle::buy(&mut h.store, "abc", "bob", 1, generous(&["res"])).is_err());

    // pro-rata exit: 15000 split 6:4, ended once supply hits zero.
    // bob's buy cost the 0→6 integral (1464), carol's the 6→10 one (3536).
    h.withdraw("abc", "bob", 6);
    assert_eq!(h.balance("bob", "res"), 100_000 - 1_464 + 9_000);
    h.withdraw("abc", "carol", 4);
    assert_eq!(h.balance("carol", "res"), 100_000 - 3_536 + 6_000);
    let bond = h.bond("abc");
    assert_eq!(bond.state, BondState::Ended);
    assert_eq!(bond.reserve_balance("res"), 0);
    assert_eq!(bond.current_supply, 0);
}

#[test]
fn order_limits_and_edits_apply_across_batches() {
    let mut h = Harness::new();
    lifecycle::create_bond(&mut h.store, power_spec("abc", 1)).unwrap();
    h.fund("bob", "res", 100_000);

    lifecycle::edit_bond(
        &mut h.store,
        "abc",
        "alice",
        bond_model::BondEdits {
            order_quantity_limits: Some([("abc".to_string(), 5u128)].into()),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(matches!(
        lifecycle::buy(&mut h.store, "abc", "bob", 6, generous(&["res"])),
        Err(bond_model::BondError::ExceedsOrderLimit)
    ));
    lifecycle::buy(&mut h.store, "abc", "bob", 5, generous(&["res"])).unwrap();
    h.settle("abc");
    assert_eq!(h.bond("abc").current_supply, 5);
}

#[test]
fn bond_cost_breakdown_in_augmented_buy() {
    // buying on an augmented bond before the outcome behaves exactly like
    // the power curve it wraps
    let mut h = Harness::new();
    let mut power = Harness::new();
    let mut spec = power_spec("abc", 1);
    spec.function = CurveFunction::Augmented(PowerParams {
        m: dec("12"),
        n: Ratio::new(2, 1),
        c: dec("100"),
    });
    spec.outcome_payment = 1;
    lifecycle::create_bond(&mut h.store, spec).unwrap();
    lifecycle::create_bond(&mut power.store, power_spec("abc", 1)).unwrap();
    h.fund("bob", "res", 100_000);
    power.fund("bob", "res", 100_000);

    lifecycle::buy(&mut h.store, "abc", "bob", 10, generous(&["res"])).unwrap();
    lifecycle::buy(&mut power.store, "abc", "bob", 10, generous(&["res"])).unwrap();
    h.settle("abc");
    power.settle("abc");
    assert_eq!(
        h.balance("bob", "res"),
        power.balance("bob", "res")
    );
}
