//! Owner-gated configuration and pause control

use solana_program::{msg, pubkey::Pubkey};

use crate::{
    error::VaultError,
    events::{
        BonusPercentUpdated, CollateralFloorUpdated, Paused, RatePerSecondUpdated,
        RatiosUpdated, RebalanceIntervalUpdated, RebalancingToggled, Unpaused, VaultEvent,
    },
    state::{EngineConfig, GlobalState, SystemStatus},
};

pub fn pause(
    config: &EngineConfig,
    global: &mut GlobalState,
    caller: &Pubkey,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    global.ensure_running()?;

    global.status = SystemStatus::Paused;
    msg!("System paused by {}", caller);
    Ok(vec![VaultEvent::Paused(Paused { account: *caller })])
}

pub fn unpause(
    config: &EngineConfig,
    global: &mut GlobalState,
    caller: &Pubkey,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    if !global.is_paused() {
        return Err(VaultError::ExpectedPause);
    }

    global.status = SystemStatus::Running;
    msg!("System unpaused by {}", caller);
    Ok(vec![VaultEvent::Unpaused(Unpaused { account: *caller })])
}

pub fn set_collateral_floor(
    config: &mut EngineConfig,
    caller: &Pubkey,
    collateral_floor: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    config.set_collateral_floor(collateral_floor)?;
    Ok(vec![VaultEvent::CollateralFloorUpdated(CollateralFloorUpdated {
        collateral_floor,
    })])
}

pub fn set_ratios(
    config: &mut EngineConfig,
    caller: &Pubkey,
    standard_ratio: u128,
    zero_liquidation_ratio: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    config.set_ratios(standard_ratio, zero_liquidation_ratio)?;
    Ok(vec![VaultEvent::RatiosUpdated(RatiosUpdated {
        standard_ratio,
        zero_liquidation_ratio,
    })])
}

pub fn set_bonus_percent(
    config: &mut EngineConfig,
    caller: &Pubkey,
    bonus_percent: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    config.set_bonus_percent(bonus_percent)?;
    Ok(vec![VaultEvent::BonusPercentUpdated(BonusPercentUpdated {
        bonus_percent,
    })])
}

pub fn set_rebalance_interval(
    config: &mut EngineConfig,
    caller: &Pubkey,
    seconds: i64,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    config.set_rebalance_interval(seconds)?;
    Ok(vec![VaultEvent::RebalanceIntervalUpdated(RebalanceIntervalUpdated {
        seconds,
    })])
}

/// Override the per-second rate. The next due rebalance may replace it.
pub fn set_rate_per_second(
    config: &EngineConfig,
    global: &mut GlobalState,
    caller: &Pubkey,
    rate: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    let old_rate = global.current_rate_per_second;
    global.set_rate_per_second(rate)?;

    if old_rate == rate {
        return Ok(Vec::new());
    }
    Ok(vec![VaultEvent::RatePerSecondUpdated(RatePerSecondUpdated {
        old_rate,
        new_rate: rate,
    })])
}

pub fn set_rebalancing_enabled(
    config: &EngineConfig,
    global: &mut GlobalState,
    caller: &Pubkey,
    enabled: bool,
) -> Result<Vec<VaultEvent>, VaultError> {
    config.require_owner(caller)?;
    global.rebalancing_enabled = enabled;
    Ok(vec![VaultEvent::RebalancingToggled(RebalancingToggled { enabled })])
}
