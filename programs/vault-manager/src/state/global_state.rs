use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, msg};

use crate::{
    engine::rebalancing::{DEFAULT_RATE_PER_SECOND, MAX_RATE_PER_SECOND, MIN_RATE_PER_SECOND},
    error::VaultError,
};

/// Two-state switch checked at the entry of every mutating operation
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Running,
    Paused,
}

/// Aggregate state shared by all vaults
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct GlobalState {
    /// Sum of collateral over all vaults (native units)
    pub total_collateral: u128,

    /// Sum of accrued debt over all vaults (WAD)
    pub total_debt: u128,

    /// Per-second compounding factor (WAD, within [1.0, 2.0])
    pub current_rate_per_second: u128,

    /// Timestamp of the last rebalance that selected a tier
    pub last_rebalance_time: UnixTimestamp,

    pub rebalancing_enabled: bool,

    pub status: SystemStatus,
}

impl GlobalState {
    pub const LEN: usize = 16 + // total_collateral
        16 + // total_debt
        16 + // current_rate_per_second
        8 + // last_rebalance_time
        1 + // rebalancing_enabled
        1; // status

    pub fn new(now: UnixTimestamp) -> Self {
        Self {
            total_collateral: 0,
            total_debt: 0,
            current_rate_per_second: DEFAULT_RATE_PER_SECOND,
            last_rebalance_time: now,
            rebalancing_enabled: true,
            status: SystemStatus::Running,
        }
    }

    pub fn ensure_running(&self) -> Result<(), VaultError> {
        if self.status == SystemStatus::Paused {
            msg!("System is paused");
            return Err(VaultError::EnforcedPause);
        }
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.status == SystemStatus::Paused
    }

    pub fn set_rate_per_second(&mut self, rate: u128) -> Result<(), VaultError> {
        if !(MIN_RATE_PER_SECOND..=MAX_RATE_PER_SECOND).contains(&rate) {
            return Err(VaultError::RateOutOfBounds);
        }
        self.current_rate_per_second = rate;
        Ok(())
    }

    pub fn add_collateral(&mut self, amount: u128) -> Result<(), VaultError> {
        self.total_collateral = self
            .total_collateral
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn sub_collateral(&mut self, amount: u128) -> Result<(), VaultError> {
        self.total_collateral = self
            .total_collateral
            .checked_sub(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn add_debt(&mut self, amount: u128) -> Result<(), VaultError> {
        self.total_debt = self
            .total_debt
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn sub_debt(&mut self, amount: u128) -> Result<(), VaultError> {
        self.total_debt = self
            .total_debt
            .checked_sub(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }
}
