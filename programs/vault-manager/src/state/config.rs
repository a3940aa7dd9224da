use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::{
    error::VaultError,
    math::{pow10, WAD},
};

/// Default minimum collateral ratio (150%)
pub const DEFAULT_STANDARD_RATIO: u128 = 1_500_000_000_000_000_000;

/// Default minimum ratio for zero-liquidation vaults (250%)
pub const DEFAULT_ZERO_LIQUIDATION_RATIO: u128 = 2_500_000_000_000_000_000;

/// Default liquidation bonus (105%)
pub const DEFAULT_BONUS_PERCENT: u128 = 1_050_000_000_000_000_000;

/// Default rebalance interval (12 hours)
pub const DEFAULT_REBALANCE_INTERVAL: i64 = 12 * 60 * 60;

/// Largest supported collateral precision
pub const MAX_COLLATERAL_DECIMALS: u8 = 36;

/// Owner-settable engine parameters
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Authority allowed to change parameters and pause the system
    pub owner: Pubkey,

    /// Minimum collateral a non-empty vault must hold (native units)
    pub collateral_floor: u128,

    /// Minimum ratio for standard vaults (WAD)
    pub standard_ratio: u128,

    /// Minimum ratio for zero-liquidation vaults (WAD)
    pub zero_liquidation_ratio: u128,

    /// Collateral paid to liquidators per unit of repaid value (WAD)
    pub bonus_percent: u128,

    /// Seconds between rate rebalances
    pub rebalance_interval: i64,

    /// Precision of the native collateral unit
    pub collateral_decimals: u8,
}

impl EngineConfig {
    pub const LEN: usize = 32 + // owner
        16 + // collateral_floor
        16 + // standard_ratio
        16 + // zero_liquidation_ratio
        16 + // bonus_percent
        8 + // rebalance_interval
        1; // collateral_decimals

    /// Create default configuration for 18-decimal collateral
    pub fn default(owner: Pubkey) -> Self {
        Self {
            owner,
            collateral_floor: WAD / 100, // 0.01 units
            standard_ratio: DEFAULT_STANDARD_RATIO,
            zero_liquidation_ratio: DEFAULT_ZERO_LIQUIDATION_RATIO,
            bonus_percent: DEFAULT_BONUS_PERCENT,
            rebalance_interval: DEFAULT_REBALANCE_INTERVAL,
            collateral_decimals: 18,
        }
    }

    /// Default configuration for collateral with a different precision.
    /// The floor stays at 0.01 units of that collateral.
    pub fn with_collateral_decimals(owner: Pubkey, decimals: u8) -> Result<Self, VaultError> {
        if decimals > MAX_COLLATERAL_DECIMALS {
            return Err(VaultError::InvalidCollateralDecimals);
        }
        let config = Self {
            collateral_floor: pow10(decimals)? / 100,
            collateral_decimals: decimals,
            ..Self::default(owner)
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.standard_ratio < WAD || self.zero_liquidation_ratio <= self.standard_ratio {
            return Err(VaultError::InvalidRatios);
        }
        if self.bonus_percent < WAD {
            return Err(VaultError::InvalidBonusPercent);
        }
        if self.rebalance_interval <= 0 {
            return Err(VaultError::InvalidRebalanceInterval);
        }
        if self.collateral_decimals > MAX_COLLATERAL_DECIMALS {
            return Err(VaultError::InvalidCollateralDecimals);
        }
        Ok(())
    }

    /// Minimum ratio a vault must keep given its zero-liquidation flag
    pub fn threshold_for(&self, zero_liquidation: bool) -> u128 {
        if zero_liquidation {
            self.zero_liquidation_ratio
        } else {
            self.standard_ratio
        }
    }

    /// Fails unless `caller` is the owner
    pub fn require_owner(&self, caller: &Pubkey) -> Result<(), VaultError> {
        if *caller != self.owner {
            msg!("Caller {} is not the owner", caller);
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    pub fn set_collateral_floor(&mut self, floor: u128) -> Result<(), VaultError> {
        self.apply(|c| c.collateral_floor = floor)
    }

    pub fn set_ratios(&mut self, standard: u128, zero_liquidation: u128) -> Result<(), VaultError> {
        self.apply(|c| {
            c.standard_ratio = standard;
            c.zero_liquidation_ratio = zero_liquidation;
        })
    }

    pub fn set_bonus_percent(&mut self, bonus: u128) -> Result<(), VaultError> {
        self.apply(|c| c.bonus_percent = bonus)
    }

    pub fn set_rebalance_interval(&mut self, seconds: i64) -> Result<(), VaultError> {
        self.apply(|c| c.rebalance_interval = seconds)
    }

    // Mutate a candidate copy and commit only if it still validates
    fn apply(&mut self, change: impl FnOnce(&mut Self)) -> Result<(), VaultError> {
        let mut candidate = self.clone();
        change(&mut candidate);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }
}
