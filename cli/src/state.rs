//! On-disk chain state for the local simulator
//!
//! One JSON file holds everything: block height, user balances, bonds and
//! their open batches. Commands load it, run the model, apply the returned
//! ledger instructions to the balances, and write the file back. Nothing is
//! persisted until a command fully succeeds, so a failed command leaves the
//! state untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bond_model::{Batch, Bond, BondStore, LedgerInstruction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChainState {
    pub height: u64,
    /// Wall-clock stamp of the last mutation, informational only
    pub updated_at: Option<String>,
    /// address -> denom -> balance
    pub balances: BTreeMap<String, BTreeMap<String, u128>>,
    pub bonds: BTreeMap<String, Bond>,
    pub batches: BTreeMap<String, Batch>,
}

impl BondStore for ChainState {
    fn get_bond(&self, token: &str) -> Option<Bond> {
        self.bonds.get(token).cloned()
    }

    fn set_bond(&mut self, bond: Bond) {
        self.bonds.insert(bond.token.clone(), bond);
    }

    fn remove_bond(&mut self, token: &str) {
        self.bonds.remove(token);
    }

    fn get_batch(&self, token: &str) -> Option<Batch> {
        self.batches.get(token).cloned()
    }

    fn set_batch(&mut self, batch: Batch) {
        self.batches.insert(batch.token.clone(), batch);
    }

    fn remove_batch(&mut self, token: &str) {
        self.batches.remove(token);
    }

    fn bond_tokens(&self) -> Vec<String> {
        self.bonds.keys().cloned().collect()
    }
}

impl ChainState {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("corrupt state file {}", path.display()))
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        // write-then-rename so a crash never truncates the state file
        let tmp = tmp_path(path);
        fs::write(&tmp, data)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn balance(&self, address: &str, denom: &str) -> u128 {
        self.balances
            .get(address)
            .and_then(|b| b.get(denom))
            .copied()
            .unwrap_or(0)
    }

    pub fn credit(&mut self, address: &str, denom: &str, amount: u128) {
        *self
            .balances
            .entry(address.to_string())
            .or_default()
            .entry(denom.to_string())
            .or_insert(0) += amount;
    }

    pub fn debit(&mut self, address: &str, denom: &str, amount: u128) -> Result<()> {
        let balance = self.balance(address, denom);
        if balance < amount {
            bail!(
                "{} holds {} {} but {} is required",
                address,
                balance,
                denom,
                amount
            );
        }
        *self
            .balances
            .get_mut(address)
            .and_then(|b| b.get_mut(denom))
            .context("balance entry vanished")? = balance - amount;
        Ok(())
    }

    /// Apply settlement output to user balances
    ///
    /// The reserve-pool side of every movement already happened inside the
    /// model; only the user and fee-address legs remain.
    pub fn apply(&mut self, token: &str, instructions: &[LedgerInstruction]) -> Result<()> {
        let (bond_token, fee_address) = {
            let bond = self
                .bonds
                .get(token)
                .with_context(|| format!("unknown bond {}", token))?;
            (bond.token.clone(), bond.fee_address.clone())
        };
        for instruction in instructions {
            match instruction {
                LedgerInstruction::CollectFromUser { address, coin } => {
                    self.debit(address, &coin.denom, coin.amount)?;
                }
                LedgerInstruction::PayToUser { address, coin } => {
                    self.credit(address, &coin.denom, coin.amount);
                }
                LedgerInstruction::PayFee { coin } => {
                    self.credit(&fee_address, &coin.denom, coin.amount);
                }
                LedgerInstruction::Mint { address, amount } => {
                    self.credit(address, &bond_token, *amount);
                }
                LedgerInstruction::Burn { address, amount } => {
                    self.debit(address, &bond_token, *amount)?;
                }
            }
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
