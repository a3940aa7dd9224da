//! Host-agnostic vault engine
//!
//! Every operation is a staged transition: it works on copies of the global
//! state and the vault, and writes them back only when all checks pass. The
//! caller gets the notifications it must publish, in order.

pub mod admin;
pub mod interest;
pub mod ledger;
pub mod liquidation;
pub mod ratio;
pub mod rebalancing;

use solana_program::clock::UnixTimestamp;

use crate::{
    error::VaultError,
    events::VaultEvent,
    state::{EngineConfig, GlobalState, Vault},
};

/// Inputs every transition reads from outside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Market {
    /// Oracle price normalized to WAD (debt units per collateral unit)
    pub price: u128,
    /// Host clock at call time
    pub now: UnixTimestamp,
}

impl Market {
    pub fn new(price: u128, now: UnixTimestamp) -> Self {
        Self { price, now }
    }
}

/// Run `transition` on copies of `global` and `vault`; commit only on success
pub(crate) fn staged<T>(
    global: &mut GlobalState,
    vault: &mut Vault,
    transition: impl FnOnce(&mut GlobalState, &mut Vault) -> Result<T, VaultError>,
) -> Result<T, VaultError> {
    let mut next_global = global.clone();
    let mut next_vault = vault.clone();
    let output = transition(&mut next_global, &mut next_vault)?;
    *global = next_global;
    *vault = next_vault;
    Ok(output)
}

/// Pause guard, accrual, then rebalance. Shared entry of every mutating operation.
pub(crate) fn prologue(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
) -> Result<Vec<VaultEvent>, VaultError> {
    global.ensure_running()?;
    interest::accrue(vault, global, market.now)?;

    let mut events = Vec::new();
    if let Some(event) = rebalancing::maybe_rebalance(global, config, market.price, market.now)? {
        events.push(event);
    }
    Ok(events)
}
