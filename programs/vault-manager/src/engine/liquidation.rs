//! Liquidation of undercollateralized standard vaults
//!
//! A third party repays part of a vault's debt and is paid the equivalent
//! collateral plus the bonus. Zero-liquidation vaults are never eligible.

use solana_program::{msg, pubkey::Pubkey};

use super::{prologue, ratio::vault_ratio, staged, Market};
use crate::{
    error::VaultError,
    events::{CollateralLiquidated, VaultEvent},
    math::{from_wad, wdiv, wmul},
    state::{EngineConfig, GlobalState, Vault},
};

/// Result of a successful liquidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationOutcome {
    /// Collateral owed to the liquidator (native units)
    pub collateral_reward: u128,
    pub events: Vec<VaultEvent>,
}

/// `(repay / price) * bonus`, converted to native collateral units
pub fn collateral_reward(
    repay_amount: u128,
    price: u128,
    bonus_percent: u128,
    collateral_decimals: u8,
) -> Result<u128, VaultError> {
    let base = wdiv(repay_amount, price)?;
    from_wad(wmul(base, bonus_percent)?, collateral_decimals)
}

/// Settle a liquidation of `vault` by `liquidator`.
///
/// The vault's debt and collateral and the totals are written here; the host
/// burns `repay_amount` from the liquidator and pays out the reward afterwards.
pub fn liquidate(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
    liquidator: Pubkey,
    repay_amount: u128,
    liquidator_balance: u128,
) -> Result<LiquidationOutcome, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        if repay_amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if vault.zero_liquidation {
            msg!("Vault {} is protected from liquidation", vault.owner);
            return Err(VaultError::ZeroLiquidationProtected);
        }

        let ratio = vault_ratio(vault, config.collateral_decimals, market.price)?;
        if ratio >= config.standard_ratio {
            msg!("Vault ratio {} is not below {}", ratio, config.standard_ratio);
            return Err(VaultError::NotUndercollateralized);
        }
        if repay_amount > vault.debt_principal {
            return Err(VaultError::RepayExceedsDebt);
        }

        let reward = collateral_reward(
            repay_amount,
            market.price,
            config.bonus_percent,
            config.collateral_decimals,
        )?;
        if reward > vault.collateral_amount {
            msg!(
                "Reward {} exceeds vault collateral {}",
                reward,
                vault.collateral_amount
            );
            return Err(VaultError::InsufficientVaultCollateral);
        }
        if liquidator_balance < repay_amount {
            return Err(VaultError::InsufficientTokenBalance);
        }

        vault.debt_principal -= repay_amount;
        vault.collateral_amount -= reward;
        global.sub_debt(repay_amount)?;
        global.sub_collateral(reward)?;

        msg!(
            "Liquidated vault {}: repaid {}, reward {}",
            vault.owner,
            repay_amount,
            reward
        );
        events.push(VaultEvent::CollateralLiquidated(CollateralLiquidated {
            owner: vault.owner,
            liquidator,
            repay_amount,
            collateral_reward: reward,
        }));

        Ok(LiquidationOutcome {
            collateral_reward: reward,
            events,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::WAD,
        state::{SystemStatus, DEFAULT_BONUS_PERCENT},
    };

    const PRICE: u128 = 2_000 * WAD;

    // 1 unit against 3000 debt at price 2000 (~66%)
    fn underwater() -> (EngineConfig, GlobalState, Vault) {
        let config = EngineConfig::default(Pubkey::new_unique());
        let mut global = GlobalState::new(0);
        let mut vault = Vault::new(Pubkey::new_unique(), 0, 0);
        vault.collateral_amount = WAD;
        vault.debt_principal = 3_000 * WAD;
        global.total_collateral = WAD;
        global.total_debt = 3_000 * WAD;
        (config, global, vault)
    }

    fn run(
        config: &EngineConfig,
        global: &mut GlobalState,
        vault: &mut Vault,
        repay: u128,
    ) -> Result<LiquidationOutcome, VaultError> {
        liquidate(
            config,
            global,
            vault,
            Market::new(PRICE, 0),
            Pubkey::new_unique(),
            repay,
            10_000 * WAD,
        )
    }

    #[test]
    fn test_reward_calculation() {
        assert_eq!(
            collateral_reward(1_500 * WAD, PRICE, DEFAULT_BONUS_PERCENT, 18).unwrap(),
            787_500_000_000_000_000
        );
        // lamports
        assert_eq!(
            collateral_reward(1_500 * WAD, PRICE, DEFAULT_BONUS_PERCENT, 9).unwrap(),
            787_500_000
        );
    }

    #[test]
    fn test_partial_liquidation() {
        let (config, mut global, mut vault) = underwater();
        let liquidator = Pubkey::new_unique();

        let outcome = liquidate(
            &config,
            &mut global,
            &mut vault,
            Market::new(PRICE, 0),
            liquidator,
            1_500 * WAD,
            2_000 * WAD,
        )
        .unwrap();

        assert_eq!(outcome.collateral_reward, 787_500_000_000_000_000);
        assert_eq!(
            outcome.events,
            vec![VaultEvent::CollateralLiquidated(CollateralLiquidated {
                owner: vault.owner,
                liquidator,
                repay_amount: 1_500 * WAD,
                collateral_reward: 787_500_000_000_000_000,
            })]
        );
        assert_eq!(vault.debt_principal, 1_500 * WAD);
        assert_eq!(vault.collateral_amount, 212_500_000_000_000_000);
        assert_eq!(global.total_debt, 1_500 * WAD);
        assert_eq!(global.total_collateral, 212_500_000_000_000_000);
    }

    #[test]
    fn test_reward_exceeding_collateral() {
        let (config, mut global, mut vault) = underwater();
        assert_eq!(
            run(&config, &mut global, &mut vault, 3_000 * WAD),
            Err(VaultError::InsufficientVaultCollateral)
        );
        assert_eq!(vault.debt_principal, 3_000 * WAD);
    }

    #[test]
    fn test_rejections() {
        let (config, mut global, mut vault) = underwater();
        assert_eq!(run(&config, &mut global, &mut vault, 0), Err(VaultError::ZeroAmount));
        assert_eq!(
            run(&config, &mut global, &mut vault, 3_001 * WAD),
            Err(VaultError::RepayExceedsDebt)
        );

        let poor = liquidate(
            &config,
            &mut global,
            &mut vault,
            Market::new(PRICE, 0),
            Pubkey::new_unique(),
            1_000 * WAD,
            999 * WAD,
        );
        assert_eq!(poor, Err(VaultError::InsufficientTokenBalance));
    }

    #[test]
    fn test_repay_bound_checked_before_reward() {
        // 0.25 units against 1000 debt, repaying 1500
        let (config, mut global, mut vault) = underwater();
        vault.collateral_amount = WAD / 4;
        vault.debt_principal = 1_000 * WAD;
        assert_eq!(
            run(&config, &mut global, &mut vault, 1_500 * WAD),
            Err(VaultError::RepayExceedsDebt)
        );
    }

    #[test]
    fn test_healthy_vault_not_eligible() {
        let (config, mut global, mut vault) = underwater();
        vault.collateral_amount = 3 * WAD;
        vault.debt_principal = 2_000 * WAD;
        assert_eq!(
            run(&config, &mut global, &mut vault, 1_000 * WAD),
            Err(VaultError::NotUndercollateralized)
        );

        // exactly at the standard ratio is still healthy
        vault.debt_principal = 4_000 * WAD;
        assert_eq!(
            run(&config, &mut global, &mut vault, 1_000 * WAD),
            Err(VaultError::NotUndercollateralized)
        );
    }

    #[test]
    fn test_zero_liquidation_vault_protected() {
        let (config, mut global, mut vault) = underwater();
        vault.zero_liquidation = true;
        assert_eq!(
            run(&config, &mut global, &mut vault, 1_500 * WAD),
            Err(VaultError::ZeroLiquidationProtected)
        );
    }

    #[test]
    fn test_paused() {
        let (config, mut global, mut vault) = underwater();
        global.status = SystemStatus::Paused;
        assert_eq!(
            run(&config, &mut global, &mut vault, 1_500 * WAD),
            Err(VaultError::EnforcedPause)
        );
    }
}
