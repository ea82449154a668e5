//! Shared harness for end-to-end bond scenarios
//!
//! Wraps a [`MemStore`] with a toy ledger so tests can assert on user
//! balances the way a host chain would see them, not just on bond state.

use std::collections::{BTreeMap, BTreeSet};

use bond_math::Decimal;
use bond_model::{
    begin_block, lifecycle, Bond, BondSpec, BondStore, Coin, CurveFunction, LedgerInstruction,
    MemStore, PowerParams, Ratio, SettlementOutcome,
};

pub struct Harness {
    pub store: MemStore,
    /// address -> denom -> balance
    pub balances: BTreeMap<String, BTreeMap<String, u128>>,
    pub height: u64,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            store: MemStore::new(),
            balances: BTreeMap::new(),
            height: 0,
        }
    }

    pub fn fund(&mut self, address: &str, denom: &str, amount: u128) {
        *self
            .balances
            .entry(address.to_string())
            .or_default()
            .entry(denom.to_string())
            .or_insert(0) += amount;
    }

    pub fn balance(&self, address: &str, denom: &str) -> u128 {
        self.balances
            .get(address)
            .and_then(|b| b.get(denom))
            .copied()
            .unwrap_or(0)
    }

    pub fn apply(&mut self, token: &str, instructions: &[LedgerInstruction]) {
        let bond = self.store.get_bond(token).expect("bond exists");
        for instruction in instructions {
            match instruction {
                LedgerInstruction::CollectFromUser { address, coin } => {
                    let balance = self.balance(address, &coin.denom);
                    assert!(
                        balance >= coin.amount,
                        "{} cannot cover {} {}",
                        address,
                        coin.amount,
                        coin.denom
                    );
                    self.set_balance(address, &coin.denom, balance - coin.amount);
                }
                LedgerInstruction::PayToUser { address, coin } => {
                    self.fund(address, &coin.denom, coin.amount);
                }
                LedgerInstruction::PayFee { coin } => {
                    let fee_address = bond.fee_address.clone();
                    self.fund(&fee_address, &coin.denom, coin.amount);
                }
                LedgerInstruction::Mint { address, amount } => {
                    self.fund(address, token, *amount);
                }
                LedgerInstruction::Burn { address, amount } => {
                    let balance = self.balance(address, token);
                    assert!(balance >= *amount, "{} cannot burn {}", address, amount);
                    self.set_balance(address, token, balance - amount);
                }
            }
        }
    }

    fn set_balance(&mut self, address: &str, denom: &str, amount: u128) {
        self.balances
            .entry(address.to_string())
            .or_default()
            .insert(denom.to_string(), amount);
    }

    /// Advance one block; apply and return any settlements
    pub fn step(&mut self) -> Vec<SettlementOutcome> {
        self.height += 1;
        let outcomes = begin_block(&mut self.store).expect("begin_block");
        for outcome in &outcomes {
            self.apply(&outcome.token, &outcome.instructions);
        }
        outcomes
    }

    /// Advance until the named bond's batch settles, returning its outcome
    pub fn settle(&mut self, token: &str) -> SettlementOutcome {
        for _ in 0..64 {
            let outcomes = self.step();
            if let Some(outcome) = outcomes.into_iter().find(|o| o.token == token) {
                return outcome;
            }
        }
        panic!("batch for {} never settled", token);
    }

    pub fn bond(&self, token: &str) -> Bond {
        self.store.get_bond(token).expect("bond exists")
    }

    pub fn pay_outcome(&mut self, token: &str, address: &str, amount: u128) {
        let (instructions, _) =
            lifecycle::make_outcome_payment(&mut self.store, token, address, amount)
                .expect("outcome payment");
        self.apply(token, &instructions);
    }

    pub fn withdraw(&mut self, token: &str, address: &str, amount: u128) {
        let instructions = lifecycle::withdraw_share(&mut self.store, token, address, amount)
            .expect("withdraw");
        self.apply(token, &instructions);
    }
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

pub fn power_spec(token: &str, batch_blocks: u64) -> BondSpec {
    BondSpec {
        token: token.into(),
        name: format!("{} bond", token),
        description: String::new(),
        creator: "alice".into(),
        fee_address: "fee_pool".into(),
        signers: BTreeSet::from(["alice".to_string()]),
        function: CurveFunction::Power(PowerParams {
            m: dec("12"),
            n: Ratio::new(2, 1),
            c: dec("100"),
        }),
        reserve_tokens: vec!["res".into()],
        tx_fee_percentage: Decimal::ZERO,
        exit_fee_percentage: Decimal::ZERO,
        max_supply: 1_000_000,
        order_quantity_limits: BTreeMap::new(),
        sanity_rate: Decimal::ZERO,
        sanity_margin_percentage: Decimal::ZERO,
        allow_sells: true,
        batch_blocks,
        outcome_payment: 0,
    }
}

pub fn swapper_spec(token: &str) -> BondSpec {
    let mut spec = power_spec(token, 1);
    spec.function = CurveFunction::Swapper;
    spec.reserve_tokens = vec!["atom".into(), "usdx".into()];
    spec
}

pub fn generous(denoms: &[&str]) -> BTreeMap<String, u128> {
    denoms
        .iter()
        .map(|d| (d.to_string(), u128::MAX / 4))
        .collect()
}

pub fn coin(denom: &str, amount: u128) -> Coin {
    Coin::new(denom, amount)
}
