//! Bond record, creation-time validation, and the lifecycle state machine
//!
//! Open —orders/edits— Open; Open —outcome payment (Augmented)— Settlement;
//! Settlement —all reserve withdrawn— Ended. Ended is terminal.

use std::collections::{BTreeMap, BTreeSet};

use bond_math::Decimal;
use serde::{Deserialize, Serialize};

use crate::curve::CurveFunction;
use crate::error::BondError;

/// A (denom, amount) pair in integer base units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondState {
    Open,
    Settlement,
    Ended,
}

impl BondState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BondState::Open => "open",
            BondState::Settlement => "settlement",
            BondState::Ended => "ended",
        }
    }
}

/// Everything needed to create a bond; validated as a whole by [`Bond::new`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondSpec {
    pub token: String,
    pub name: String,
    pub description: String,
    pub creator: String,
    pub fee_address: String,
    pub signers: BTreeSet<String>,
    pub function: CurveFunction,
    pub reserve_tokens: Vec<String>,
    pub tx_fee_percentage: Decimal,
    pub exit_fee_percentage: Decimal,
    pub max_supply: u128,
    pub order_quantity_limits: BTreeMap<String, u128>,
    pub sanity_rate: Decimal,
    pub sanity_margin_percentage: Decimal,
    pub allow_sells: bool,
    pub batch_blocks: u64,
    pub outcome_payment: u128,
}

/// Signer-editable fields; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct BondEdits {
    pub name: Option<String>,
    pub description: Option<String>,
    pub order_quantity_limits: Option<BTreeMap<String, u128>>,
    pub sanity_rate: Option<Decimal>,
    pub sanity_margin_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bond {
    pub token: String,
    pub name: String,
    pub description: String,
    pub creator: String,
    pub fee_address: String,
    pub signers: BTreeSet<String>,
    pub function: CurveFunction,
    pub reserve_tokens: Vec<String>,
    pub current_supply: u128,
    pub current_reserve: BTreeMap<String, u128>,
    pub tx_fee_percentage: Decimal,
    pub exit_fee_percentage: Decimal,
    pub max_supply: u128,
    pub order_quantity_limits: BTreeMap<String, u128>,
    pub sanity_rate: Decimal,
    pub sanity_margin_percentage: Decimal,
    pub allow_sells: bool,
    pub batch_blocks: u64,
    pub outcome_payment: u128,
    /// Outcome payment received so far (Augmented only)
    pub outcome_paid: u128,
    pub state: BondState,
}

const MAX_FEE_PERCENTAGE: Decimal = Decimal::from_raw(100 * bond_math::SCALE);

impl Bond {
    pub fn new(spec: BondSpec) -> Result<Self, BondError> {
        spec.function.validate()?;

        if spec.token.is_empty() {
            return Err(BondError::ParameterInvalid("token must not be empty".into()));
        }
        if spec.batch_blocks == 0 {
            return Err(BondError::ParameterInvalid(
                "batch_blocks must be positive".into(),
            ));
        }
        if spec.max_supply == 0 {
            return Err(BondError::ParameterInvalid("max_supply must be > 0".into()));
        }

        let wanted = spec.function.required_reserve_tokens();
        if spec.reserve_tokens.len() != wanted {
            return Err(BondError::ParameterInvalid(format!(
                "function requires {} reserve token(s), got {}",
                wanted,
                spec.reserve_tokens.len()
            )));
        }
        let distinct: BTreeSet<&String> = spec.reserve_tokens.iter().collect();
        if distinct.len() != spec.reserve_tokens.len() {
            return Err(BondError::ParameterInvalid(
                "reserve tokens must be distinct".into(),
            ));
        }
        if spec.reserve_tokens.iter().any(|t| t == &spec.token) {
            return Err(BondError::ParameterInvalid(
                "bond token cannot be its own reserve".into(),
            ));
        }

        for (label, pct) in [
            ("tx_fee_percentage", spec.tx_fee_percentage),
            ("exit_fee_percentage", spec.exit_fee_percentage),
        ] {
            if pct.is_negative() || pct >= MAX_FEE_PERCENTAGE {
                return Err(BondError::ParameterInvalid(format!(
                    "{} must be in [0, 100)",
                    label
                )));
            }
        }

        let is_swapper = matches!(spec.function, CurveFunction::Swapper);
        if is_swapper {
            if spec.sanity_rate.is_negative() || spec.sanity_margin_percentage.is_negative() {
                return Err(BondError::ParameterInvalid(
                    "sanity parameters must be >= 0".into(),
                ));
            }
        } else if !spec.sanity_rate.is_zero() || !spec.sanity_margin_percentage.is_zero() {
            return Err(BondError::ParameterInvalid(
                "sanity parameters only apply to swapper bonds".into(),
            ));
        }

        if spec.outcome_payment > 0 && !matches!(spec.function, CurveFunction::Augmented(_)) {
            return Err(BondError::ParameterInvalid(
                "outcome_payment only applies to augmented bonds".into(),
            ));
        }

        let current_reserve = spec
            .reserve_tokens
            .iter()
            .map(|t| (t.clone(), 0u128))
            .collect();

        Ok(Bond {
            token: spec.token,
            name: spec.name,
            description: spec.description,
            creator: spec.creator,
            fee_address: spec.fee_address,
            signers: spec.signers,
            function: spec.function,
            reserve_tokens: spec.reserve_tokens,
            current_supply: 0,
            current_reserve,
            tx_fee_percentage: spec.tx_fee_percentage,
            exit_fee_percentage: spec.exit_fee_percentage,
            max_supply: spec.max_supply,
            order_quantity_limits: spec.order_quantity_limits,
            sanity_rate: spec.sanity_rate,
            sanity_margin_percentage: spec.sanity_margin_percentage,
            allow_sells: spec.allow_sells,
            batch_blocks: spec.batch_blocks,
            outcome_payment: spec.outcome_payment,
            outcome_paid: 0,
            state: BondState::Open,
        })
    }

    /// Apply signer edits; rejected for non-signers and non-open bonds
    pub fn edit(&mut self, editor: &str, edits: BondEdits) -> Result<(), BondError> {
        if self.state != BondState::Open {
            return Err(BondError::InvalidState(self.state.as_str()));
        }
        if !self.signers.contains(editor) {
            return Err(BondError::Unauthorized);
        }
        if let Some(rate) = edits.sanity_rate {
            if !matches!(self.function, CurveFunction::Swapper) && !rate.is_zero() {
                return Err(BondError::ParameterInvalid(
                    "sanity parameters only apply to swapper bonds".into(),
                ));
            }
            if rate.is_negative() {
                return Err(BondError::ParameterInvalid("sanity_rate must be >= 0".into()));
            }
        }
        if let Some(margin) = edits.sanity_margin_percentage {
            if margin.is_negative() {
                return Err(BondError::ParameterInvalid(
                    "sanity_margin_percentage must be >= 0".into(),
                ));
            }
        }

        if let Some(name) = edits.name {
            self.name = name;
        }
        if let Some(description) = edits.description {
            self.description = description;
        }
        if let Some(limits) = edits.order_quantity_limits {
            self.order_quantity_limits = limits;
        }
        if let Some(rate) = edits.sanity_rate {
            self.sanity_rate = rate;
        }
        if let Some(margin) = edits.sanity_margin_percentage {
            self.sanity_margin_percentage = margin;
        }
        Ok(())
    }

    pub fn reserve_balance(&self, denom: &str) -> u128 {
        self.current_reserve.get(denom).copied().unwrap_or(0)
    }

    pub fn add_reserve(&mut self, denom: &str, amount: u128) -> Result<(), BondError> {
        let balance = self
            .current_reserve
            .get_mut(denom)
            .ok_or_else(|| BondError::ParameterInvalid(format!("unknown reserve token {}", denom)))?;
        *balance = balance
            .checked_add(amount)
            .ok_or(bond_math::MathError::Overflow)?;
        Ok(())
    }

    pub fn sub_reserve(&mut self, denom: &str, amount: u128) -> Result<(), BondError> {
        let balance = self
            .current_reserve
            .get_mut(denom)
            .ok_or_else(|| BondError::ParameterInvalid(format!("unknown reserve token {}", denom)))?;
        *balance = balance
            .checked_sub(amount)
            .ok_or(BondError::SettlementInvalidated)?;
        Ok(())
    }

    /// Per-order quantity limit (0 or absent = unlimited)
    pub fn check_order_limit(&self, denom: &str, amount: u128) -> Result<(), BondError> {
        match self.order_quantity_limits.get(denom) {
            Some(&limit) if limit > 0 && amount > limit => Err(BondError::ExceedsOrderLimit),
            _ => Ok(()),
        }
    }

    /// Outcome payment fully received
    pub fn outcome_fully_paid(&self) -> bool {
        self.outcome_payment > 0 && self.outcome_paid >= self.outcome_payment
    }
}
