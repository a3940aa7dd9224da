use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::error::VaultError;

/// Vault account discriminator
pub const VAULT_DISCRIMINATOR: [u8; 8] = [86, 65, 85, 76, 84, 65, 67, 67]; // "VAULTACC"

/// Lifecycle of a vault; derived, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultStatus {
    Idle,
    ActiveStandard,
    ActiveZeroLiquidation,
}

/// A single collateral/debt position, keyed by owner
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    pub discriminator: [u8; 8],

    pub owner: Pubkey,

    /// PDA bump when stored on-chain
    pub bump: u8,

    /// Locked collateral (native units)
    pub collateral_amount: u128,

    /// Debt including all interest accrued up to `last_accrual_time` (WAD)
    pub debt_principal: u128,

    /// Opt-in liquidation protection
    pub zero_liquidation: bool,

    pub last_accrual_time: UnixTimestamp,
}

impl Vault {
    pub const LEN: usize = 8 + // discriminator
        32 + // owner
        1 + // bump
        16 + // collateral_amount
        16 + // debt_principal
        1 + // zero_liquidation
        8; // last_accrual_time

    pub fn new(owner: Pubkey, bump: u8, now: UnixTimestamp) -> Self {
        Self {
            discriminator: VAULT_DISCRIMINATOR,
            owner,
            bump,
            collateral_amount: 0,
            debt_principal: 0,
            zero_liquidation: false,
            last_accrual_time: now,
        }
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.discriminator != VAULT_DISCRIMINATOR {
            return Err(VaultError::InvalidAccountData);
        }
        Ok(())
    }

    pub fn status(&self) -> VaultStatus {
        if self.collateral_amount == 0 && self.debt_principal == 0 {
            VaultStatus::Idle
        } else if self.zero_liquidation {
            VaultStatus::ActiveZeroLiquidation
        } else {
            VaultStatus::ActiveStandard
        }
    }
}

/// Read-only projection returned by `get_vault`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultView {
    pub collateral: u128,
    pub principal_debt: u128,
    pub zero_liquidation: bool,
}

impl From<&Vault> for VaultView {
    fn from(vault: &Vault) -> Self {
        Self {
            collateral: vault.collateral_amount,
            principal_debt: vault.debt_principal,
            zero_liquidation: vault.zero_liquidation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_status() {
        let mut vault = Vault::new(Pubkey::new_unique(), 255, 100);
        assert_eq!(vault.status(), VaultStatus::Idle);
        assert!(vault.validate().is_ok());

        vault.collateral_amount = 1;
        assert_eq!(vault.status(), VaultStatus::ActiveStandard);

        vault.zero_liquidation = true;
        assert_eq!(vault.status(), VaultStatus::ActiveZeroLiquidation);

        // flag alone does not make an empty vault active
        vault.collateral_amount = 0;
        assert_eq!(vault.status(), VaultStatus::Idle);
    }

    #[test]
    fn test_len_matches_serialization() {
        let vault = Vault::new(Pubkey::new_unique(), 1, 0);
        let bytes = vault.try_to_vec().unwrap();
        assert_eq!(bytes.len(), Vault::LEN);
    }
}
