//! Periodic system-wide rate adjustment
//!
//! Every mutating operation gives the controller a chance to run. Once the
//! rebalance interval has elapsed, the aggregate collateral ratio selects a
//! per-second rate from a descending tier table. Healthier systems pay less.

use solana_program::{clock::UnixTimestamp, msg};

use super::ratio::collateral_value;
use crate::{
    error::VaultError,
    events::{RatePerSecondUpdated, VaultEvent},
    math::{mul_div_saturating, rpow, WAD},
    state::{EngineConfig, GlobalState},
};

/// 365 days
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Per-second factor compounding to 5% a year
pub const DEFAULT_RATE_PER_SECOND: u128 = 1_000_000_001_547_125_957;

pub const MIN_RATE_PER_SECOND: u128 = WAD;
pub const MAX_RATE_PER_SECOND: u128 = 2 * WAD;

/// One row of the tier table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateTier {
    /// Lowest global ratio (inclusive) that selects this tier
    pub min_ratio: u128,
    /// Per-second compounding factor (WAD)
    pub rate_per_second: u128,
    /// Published annual rate in basis points
    pub annual_bps: u16,
}

/// Ordered from healthiest to least healthy
pub static RATE_TIERS: [RateTier; 7] = [
    RateTier {
        min_ratio: 2_000_000_000_000_000_000,
        rate_per_second: 1_000_000_000_937_303_470,
        annual_bps: 300,
    },
    RateTier {
        min_ratio: 1_800_000_000_000_000_000,
        rate_per_second: 1_000_000_001_090_862_085,
        annual_bps: 350,
    },
    RateTier {
        min_ratio: 1_600_000_000_000_000_000,
        rate_per_second: 1_000_000_001_243_680_656,
        annual_bps: 400,
    },
    RateTier {
        min_ratio: 1_400_000_000_000_000_000,
        rate_per_second: 1_000_000_001_395_766_281,
        annual_bps: 450,
    },
    RateTier {
        min_ratio: 1_200_000_000_000_000_000,
        rate_per_second: DEFAULT_RATE_PER_SECOND,
        annual_bps: 500,
    },
    RateTier {
        min_ratio: WAD,
        rate_per_second: 1_000_000_001_847_694_957,
        annual_bps: 600,
    },
    RateTier {
        min_ratio: 0,
        rate_per_second: 1_000_000_002_145_441_671,
        annual_bps: 700,
    },
];

/// Tier selected by a global collateral ratio
pub fn tier_for_ratio(global_ratio: u128) -> &'static RateTier {
    RATE_TIERS
        .iter()
        .find(|tier| global_ratio >= tier.min_ratio)
        .unwrap_or(&RATE_TIERS[RATE_TIERS.len() - 1])
}

pub fn rate_for_ratio(global_ratio: u128) -> u128 {
    tier_for_ratio(global_ratio).rate_per_second
}

/// Aggregate collateral value over aggregate debt, `None` with no debt outstanding
pub fn global_ratio(
    global: &GlobalState,
    config: &EngineConfig,
    price: u128,
) -> Result<Option<u128>, VaultError> {
    if global.total_debt == 0 {
        return Ok(None);
    }
    let value = collateral_value(global.total_collateral, config.collateral_decimals, price)?;
    mul_div_saturating(value, WAD, global.total_debt, u128::MAX - 1).map(Some)
}

/// Reselect the per-second rate if rebalancing is enabled and due.
///
/// With no outstanding debt there is nothing to correct: the call returns
/// without touching `last_rebalance_time`.
pub fn maybe_rebalance(
    global: &mut GlobalState,
    config: &EngineConfig,
    price: u128,
    now: UnixTimestamp,
) -> Result<Option<VaultEvent>, VaultError> {
    if !global.rebalancing_enabled {
        return Ok(None);
    }

    let since_last = now.saturating_sub(global.last_rebalance_time);
    if since_last < config.rebalance_interval {
        return Ok(None);
    }

    let ratio = match global_ratio(global, config, price)? {
        Some(ratio) => ratio,
        None => return Ok(None),
    };

    let old_rate = global.current_rate_per_second;
    let new_rate = rate_for_ratio(ratio);
    global.set_rate_per_second(new_rate)?;
    global.last_rebalance_time = now;

    if new_rate == old_rate {
        return Ok(None);
    }

    msg!(
        "Rebalanced: global ratio {} -> rate {} (was {})",
        ratio,
        new_rate,
        old_rate
    );
    Ok(Some(VaultEvent::RatePerSecondUpdated(RatePerSecondUpdated {
        old_rate,
        new_rate,
    })))
}

/// Yearly growth factor of a per-second rate (WAD)
pub fn annualized_rate(rate_per_second: u128) -> Result<u128, VaultError> {
    rpow(rate_per_second, SECONDS_PER_YEAR)
}
