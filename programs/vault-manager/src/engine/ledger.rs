//! Vault ledger operations
//!
//! Collateral amounts are native units, debt amounts are WAD. Each function
//! returns the notifications of the transition; on error nothing is written.

use solana_program::msg;

use super::{prologue, ratio::ratio_of, staged, Market};
use crate::{
    error::VaultError,
    events::{
        CollateralDeposited, CollateralWithdrawn, DebtBurned, DebtMinted, VaultEvent,
        ZeroLiquidationDisabled, ZeroLiquidationEnabled,
    },
    state::{EngineConfig, GlobalState, Vault},
};

pub fn deposit_collateral(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
    amount: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let new_collateral = vault
            .collateral_amount
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        if new_collateral < config.collateral_floor {
            msg!(
                "Deposit leaves {} collateral, floor is {}",
                new_collateral,
                config.collateral_floor
            );
            return Err(VaultError::BelowCollateralFloor);
        }

        vault.collateral_amount = new_collateral;
        global.add_collateral(amount)?;

        events.push(VaultEvent::CollateralDeposited(CollateralDeposited {
            owner: vault.owner,
            amount,
        }));
        Ok(events)
    })
}

/// Release collateral. A full withdrawal to zero skips the floor check; any
/// non-zero remainder must stay at or above the floor.
pub fn withdraw_collateral(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
    amount: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if amount > vault.collateral_amount {
            return Err(VaultError::ExceedsCollateral);
        }
        let remaining = vault.collateral_amount - amount;
        if remaining > 0 && remaining < config.collateral_floor {
            msg!("Withdrawal leaves {} collateral below floor", remaining);
            return Err(VaultError::BelowCollateralFloor);
        }

        let ratio = ratio_of(
            remaining,
            vault.debt_principal,
            config.collateral_decimals,
            market.price,
        )?;
        if ratio < config.threshold_for(vault.zero_liquidation) {
            msg!("Withdrawal would make vault undercollateralized: ratio {}", ratio);
            return Err(VaultError::WithdrawalUndercollateralized);
        }

        vault.collateral_amount = remaining;
        global.sub_collateral(amount)?;

        events.push(VaultEvent::CollateralWithdrawn(CollateralWithdrawn {
            owner: vault.owner,
            amount,
        }));
        Ok(events)
    })
}

/// Record new debt. The host issues the tokens after this returns.
pub fn mint(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
    amount: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let new_debt = vault
            .debt_principal
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;

        let ratio = ratio_of(
            vault.collateral_amount,
            new_debt,
            config.collateral_decimals,
            market.price,
        )?;
        if ratio < config.threshold_for(vault.zero_liquidation) {
            msg!("Mint would leave ratio {} below threshold", ratio);
            return Err(VaultError::InsufficientCollateral);
        }

        vault.debt_principal = new_debt;
        global.add_debt(amount)?;

        events.push(VaultEvent::DebtMinted(DebtMinted {
            owner: vault.owner,
            amount,
        }));
        Ok(events)
    })
}

/// Repay debt. `caller_balance` is the owner's debt-asset balance; the host
/// destroys `amount` tokens after this returns.
///
/// `token_unit` is the smallest amount the host's debt token can express (WAD).
/// Accrued debt is rarely a whole number of token units, so an `amount` that
/// overshoots the debt by less than one unit settles it in full.
pub fn burn(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
    amount: u128,
    caller_balance: u128,
    token_unit: u128,
) -> Result<Vec<VaultEvent>, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if amount > vault.debt_principal && amount - vault.debt_principal >= token_unit {
            return Err(VaultError::ExceedsDebt);
        }
        if caller_balance < amount {
            msg!("Balance {} cannot cover burn of {}", caller_balance, amount);
            return Err(VaultError::InsufficientTokenBalance);
        }

        let repaid = amount.min(vault.debt_principal);
        vault.debt_principal -= repaid;
        global.sub_debt(repaid)?;

        events.push(VaultEvent::DebtBurned(DebtBurned {
            owner: vault.owner,
            amount: repaid,
        }));
        Ok(events)
    })
}

pub fn enable_zero_liquidation(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
) -> Result<Vec<VaultEvent>, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        let ratio = ratio_of(
            vault.collateral_amount,
            vault.debt_principal,
            config.collateral_decimals,
            market.price,
        )?;
        if ratio < config.zero_liquidation_ratio {
            msg!("Ratio {} too low for zero liquidation", ratio);
            return Err(VaultError::InsufficientCollateral);
        }

        vault.zero_liquidation = true;
        events.push(VaultEvent::ZeroLiquidationEnabled(ZeroLiquidationEnabled {
            owner: vault.owner,
        }));
        Ok(events)
    })
}

pub fn disable_zero_liquidation(
    config: &EngineConfig,
    global: &mut GlobalState,
    vault: &mut Vault,
    market: Market,
) -> Result<Vec<VaultEvent>, VaultError> {
    staged(global, vault, |global, vault| {
        let mut events = prologue(config, global, vault, market)?;

        let ratio = ratio_of(
            vault.collateral_amount,
            vault.debt_principal,
            config.collateral_decimals,
            market.price,
        )?;
        if ratio < config.standard_ratio {
            msg!("Ratio {} too low to leave zero liquidation", ratio);
            return Err(VaultError::InsufficientCollateral);
        }

        vault.zero_liquidation = false;
        events.push(VaultEvent::ZeroLiquidationDisabled(ZeroLiquidationDisabled {
            owner: vault.owner,
        }));
        Ok(events)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::WAD,
        state::{SystemStatus, VaultStatus},
    };
    use solana_program::pubkey::Pubkey;

    const PRICE: u128 = 2_000 * WAD;

    struct Fixture {
        config: EngineConfig,
        global: GlobalState,
        vault: Vault,
        market: Market,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: EngineConfig::default(Pubkey::new_unique()),
                global: GlobalState::new(0),
                vault: Vault::new(Pubkey::new_unique(), 0, 0),
                market: Market::new(PRICE, 0),
            }
        }

        fn deposit(&mut self, amount: u128) -> Result<Vec<VaultEvent>, VaultError> {
            deposit_collateral(&self.config, &mut self.global, &mut self.vault, self.market, amount)
        }

        fn withdraw(&mut self, amount: u128) -> Result<Vec<VaultEvent>, VaultError> {
            withdraw_collateral(&self.config, &mut self.global, &mut self.vault, self.market, amount)
        }

        fn mint(&mut self, amount: u128) -> Result<Vec<VaultEvent>, VaultError> {
            mint(&self.config, &mut self.global, &mut self.vault, self.market, amount)
        }

        fn burn(&mut self, amount: u128, balance: u128) -> Result<Vec<VaultEvent>, VaultError> {
            self.burn_in_units(amount, balance, 1)
        }

        fn burn_in_units(&mut self, amount: u128, balance: u128, unit: u128) -> Result<Vec<VaultEvent>, VaultError> {
            burn(&self.config, &mut self.global, &mut self.vault, self.market, amount, balance, unit)
        }

        fn enable_zl(&mut self) -> Result<Vec<VaultEvent>, VaultError> {
            enable_zero_liquidation(&self.config, &mut self.global, &mut self.vault, self.market)
        }

        fn disable_zl(&mut self) -> Result<Vec<VaultEvent>, VaultError> {
            disable_zero_liquidation(&self.config, &mut self.global, &mut self.vault, self.market)
        }
    }

    #[test]
    fn test_deposit() {
        let mut f = Fixture::new();
        let events = f.deposit(WAD).unwrap();
        assert_eq!(
            events,
            vec![VaultEvent::CollateralDeposited(CollateralDeposited {
                owner: f.vault.owner,
                amount: WAD,
            })]
        );
        assert_eq!(f.vault.collateral_amount, WAD);
        assert_eq!(f.global.total_collateral, WAD);

        assert_eq!(f.deposit(0), Err(VaultError::ZeroAmount));
    }

    #[test]
    fn test_deposit_below_floor() {
        let mut f = Fixture::new();
        assert_eq!(f.deposit(WAD / 1_000), Err(VaultError::BelowCollateralFloor));
        assert_eq!(f.vault.collateral_amount, 0);
        f.deposit(WAD / 100).unwrap();
        // once above the floor, small top-ups are fine
        f.deposit(1).unwrap();
    }

    #[test]
    fn test_withdraw_paths() {
        let mut f = Fixture::new();
        f.deposit(6 * WAD).unwrap();

        assert_eq!(f.withdraw(0), Err(VaultError::ZeroAmount));
        assert_eq!(f.withdraw(7 * WAD), Err(VaultError::ExceedsCollateral));

        f.withdraw(2 * WAD).unwrap();
        assert_eq!(f.vault.collateral_amount, 4 * WAD);
        assert_eq!(f.global.total_collateral, 4 * WAD);
    }

    #[test]
    fn test_withdraw_floor_policy() {
        let mut f = Fixture::new();
        f.deposit(WAD).unwrap();

        // tiny non-zero remainder is rejected
        assert_eq!(
            f.withdraw(WAD - WAD / 1_000),
            Err(VaultError::BelowCollateralFloor)
        );
        // full exit is allowed without debt
        f.withdraw(WAD).unwrap();
        assert_eq!(f.vault.collateral_amount, 0);
    }

    #[test]
    fn test_withdraw_ratio_guard() {
        let mut f = Fixture::new();
        f.deposit(3 * WAD).unwrap();
        f.mint(4_000 * WAD).unwrap();

        assert_eq!(f.withdraw(WAD), Err(VaultError::WithdrawalUndercollateralized));
        assert_eq!(f.withdraw(3 * WAD), Err(VaultError::WithdrawalUndercollateralized));
        assert_eq!(f.vault.collateral_amount, 3 * WAD);
    }

    #[test]
    fn test_mint_threshold() {
        let mut f = Fixture::new();
        f.deposit(3 * WAD).unwrap();

        assert_eq!(f.mint(0), Err(VaultError::ZeroAmount));
        assert_eq!(f.mint(5_000 * WAD), Err(VaultError::InsufficientCollateral));
        assert_eq!(f.vault.debt_principal, 0);
        assert_eq!(f.global.total_debt, 0);

        // exactly 150%
        f.mint(4_000 * WAD).unwrap();
        assert_eq!(f.vault.debt_principal, 4_000 * WAD);
        assert_eq!(f.global.total_debt, 4_000 * WAD);
        assert_eq!(f.mint(1), Err(VaultError::InsufficientCollateral));
    }

    #[test]
    fn test_burn_paths() {
        let mut f = Fixture::new();
        f.deposit(3 * WAD).unwrap();
        f.mint(2_000 * WAD).unwrap();

        assert_eq!(f.burn(0, 2_000 * WAD), Err(VaultError::ZeroAmount));
        assert_eq!(f.burn(3_000 * WAD, 3_000 * WAD), Err(VaultError::ExceedsDebt));
        assert_eq!(
            f.burn(1_000 * WAD, 999 * WAD),
            Err(VaultError::InsufficientTokenBalance)
        );

        let events = f.burn(1_000 * WAD, 2_000 * WAD).unwrap();
        assert_eq!(
            events,
            vec![VaultEvent::DebtBurned(DebtBurned {
                owner: f.vault.owner,
                amount: 1_000 * WAD,
            })]
        );
        assert_eq!(f.vault.debt_principal, 1_000 * WAD);
        assert_eq!(f.global.total_debt, 1_000 * WAD);
    }

    #[test]
    fn test_full_repayment_after_interest_releases_collateral() {
        // 6-decimal debt token, lamport collateral
        const TOKEN_UNIT: u128 = 1_000_000_000_000;
        let mut f = Fixture::new();
        f.config = EngineConfig::with_collateral_decimals(Pubkey::new_unique(), 9).unwrap();
        f.deposit(3_000_000_000).unwrap();
        f.mint(2_000 * WAD).unwrap();

        // one hour of interest leaves debt between token units
        f.market = Market::new(PRICE, 3_600);
        let accrued = 2_000_011_139_337_899_854_000;
        let ceiling = 2_000_011_140_000_000_000_000;

        assert_eq!(
            f.burn_in_units(ceiling + TOKEN_UNIT, ceiling + TOKEN_UNIT, TOKEN_UNIT),
            Err(VaultError::ExceedsDebt)
        );
        assert_eq!(f.vault.debt_principal, 2_000 * WAD);

        let events = f.burn_in_units(ceiling, ceiling, TOKEN_UNIT).unwrap();
        assert_eq!(
            events,
            vec![VaultEvent::DebtBurned(DebtBurned {
                owner: f.vault.owner,
                amount: accrued,
            })]
        );
        assert_eq!(f.vault.debt_principal, 0);
        assert_eq!(f.global.total_debt, 0);

        f.withdraw(3_000_000_000).unwrap();
        assert_eq!(f.vault.status(), VaultStatus::Idle);
        assert_eq!(f.global.total_collateral, 0);
    }

    #[test]
    fn test_zero_liquidation_toggle() {
        let mut f = Fixture::new();
        f.deposit(3 * WAD).unwrap();
        f.mint(2_400 * WAD).unwrap();

        // exactly 250%
        f.enable_zl().unwrap();
        assert!(f.vault.zero_liquidation);
        assert_eq!(f.mint(1), Err(VaultError::InsufficientCollateral));
        assert_eq!(f.withdraw(WAD), Err(VaultError::WithdrawalUndercollateralized));

        f.disable_zl().unwrap();
        assert!(!f.vault.zero_liquidation);
    }

    #[test]
    fn test_enable_zero_liquidation_requires_ratio() {
        let mut f = Fixture::new();
        f.deposit(3 * WAD).unwrap();
        f.mint(2_401 * WAD).unwrap();
        assert_eq!(f.enable_zl(), Err(VaultError::InsufficientCollateral));
        assert!(!f.vault.zero_liquidation);
    }

    #[test]
    fn test_paused_rejects_everything() {
        let mut f = Fixture::new();
        f.deposit(3 * WAD).unwrap();
        f.mint(1_000 * WAD).unwrap();
        f.global.status = SystemStatus::Paused;

        assert_eq!(f.deposit(WAD), Err(VaultError::EnforcedPause));
        assert_eq!(f.withdraw(WAD), Err(VaultError::EnforcedPause));
        assert_eq!(f.mint(WAD), Err(VaultError::EnforcedPause));
        assert_eq!(f.burn(WAD, WAD), Err(VaultError::EnforcedPause));
        assert_eq!(f.enable_zl(), Err(VaultError::EnforcedPause));
        assert_eq!(f.disable_zl(), Err(VaultError::EnforcedPause));
    }

    #[test]
    fn test_failed_operation_rolls_back_accrual_and_rebalance() {
        let mut f = Fixture::new();
        f.deposit(WAD).unwrap();
        f.mint(1_000 * WAD).unwrap();

        let global_before = f.global.clone();
        let vault_before = f.vault.clone();

        // a day later the interval is due and interest is pending, but the mint fails
        f.market = Market::new(PRICE, 86_400);
        assert_eq!(f.mint(1_000 * WAD), Err(VaultError::InsufficientCollateral));
        assert_eq!(f.global, global_before);
        assert_eq!(f.vault, vault_before);

        // a successful call commits both
        let events = f.deposit(WAD).unwrap();
        assert!(f.vault.debt_principal > 1_000 * WAD);
        assert_eq!(f.global.total_debt, f.vault.debt_principal);
        assert_eq!(f.global.last_rebalance_time, 86_400);

        // ratio just under 2.0 moves the system to the 3.5% tier before the deposit lands
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], VaultEvent::RatePerSecondUpdated(_)));
        assert!(matches!(events[1], VaultEvent::CollateralDeposited(_)));
    }
}
