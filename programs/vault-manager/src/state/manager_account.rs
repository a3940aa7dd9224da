use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use super::{EngineConfig, GlobalState};
use crate::error::VaultError;

/// Manager account discriminator
pub const MANAGER_DISCRIMINATOR: [u8; 8] = [86, 65, 85, 76, 84, 77, 71, 82]; // "VAULTMGR"

/// On-chain envelope for the engine's configuration and aggregate state
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct ManagerAccount {
    pub discriminator: [u8; 8],

    pub is_initialized: bool,

    pub bump: u8,

    /// Bump of the PDA that holds mint authority over `debt_mint`
    pub mint_authority_bump: u8,

    /// SPL mint of the debt asset
    pub debt_mint: Pubkey,

    /// Price feed account read for every operation
    pub price_feed: Pubkey,

    pub config: EngineConfig,

    pub global: GlobalState,
}

impl ManagerAccount {
    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + // bump
        1 + // mint_authority_bump
        32 + // debt_mint
        32 + // price_feed
        EngineConfig::LEN +
        GlobalState::LEN +
        64; // padding for growth

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.discriminator != MANAGER_DISCRIMINATOR {
            return Err(VaultError::InvalidAccountData);
        }
        if !self.is_initialized {
            return Err(VaultError::AccountNotInitialized);
        }
        Ok(())
    }
}
