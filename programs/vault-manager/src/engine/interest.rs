//! Per-vault interest accrual
//!
//! Debt compounds every second at the system rate. Accrual folds the pending
//! interest into `debt_principal` and the aggregate debt, so every later check
//! works on current debt.

use solana_program::{clock::UnixTimestamp, msg};

use crate::{
    error::VaultError,
    math::{rpow, wmul},
    state::{GlobalState, Vault},
};

/// Debt of `vault` at `now` without mutating anything
pub fn accrued_debt(vault: &Vault, rate_per_second: u128, now: UnixTimestamp) -> Result<u128, VaultError> {
    if vault.debt_principal == 0 || now <= vault.last_accrual_time {
        return Ok(vault.debt_principal);
    }
    let elapsed = (now - vault.last_accrual_time) as u64;
    wmul(vault.debt_principal, rpow(rate_per_second, elapsed)?)
}

/// Bring `vault` up to `now`, returning the interest added.
///
/// A vault without debt only advances its clock. A timestamp at or before the
/// last accrual changes nothing, so calling twice with the same `now` is a no-op.
pub fn accrue(vault: &mut Vault, global: &mut GlobalState, now: UnixTimestamp) -> Result<u128, VaultError> {
    if vault.debt_principal == 0 {
        if now > vault.last_accrual_time {
            vault.last_accrual_time = now;
        }
        return Ok(0);
    }
    if now <= vault.last_accrual_time {
        return Ok(0);
    }

    let new_debt = accrued_debt(vault, global.current_rate_per_second, now)?;
    let interest = new_debt
        .checked_sub(vault.debt_principal)
        .ok_or(VaultError::ArithmeticOverflow)?;

    global.add_debt(interest)?;
    vault.debt_principal = new_debt;
    vault.last_accrual_time = now;

    if interest > 0 {
        msg!("Accrued {} interest on vault {}", interest, vault.owner);
    }
    Ok(interest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::rebalancing::{DEFAULT_RATE_PER_SECOND, SECONDS_PER_YEAR},
        math::WAD,
    };
    use solana_program::pubkey::Pubkey;

    fn vault_with_debt(debt: u128) -> (Vault, GlobalState) {
        let mut vault = Vault::new(Pubkey::new_unique(), 0, 0);
        vault.debt_principal = debt;
        let mut global = GlobalState::new(0);
        global.total_debt = debt;
        (vault, global)
    }

    #[test]
    fn test_one_year_at_five_percent() {
        let (mut vault, mut global) = vault_with_debt(1_000 * WAD);
        let now = SECONDS_PER_YEAR as i64;

        let interest = accrue(&mut vault, &mut global, now).unwrap();

        // truncating compounding lands just under 1050
        assert_eq!(vault.debt_principal, 1_049_999_999_957_494_335_000);
        assert_eq!(interest, vault.debt_principal - 1_000 * WAD);
        assert_eq!(global.total_debt, vault.debt_principal);
        assert_eq!(vault.last_accrual_time, now);
        assert!(1_050 * WAD - vault.debt_principal < WAD / 1_000_000);
    }

    #[test]
    fn test_accrual_is_idempotent() {
        let (mut vault, mut global) = vault_with_debt(1_000 * WAD);

        accrue(&mut vault, &mut global, 3_600).unwrap();
        let debt = vault.debt_principal;
        assert_eq!(debt, 1_000_005_569_668_949_927_000);

        assert_eq!(accrue(&mut vault, &mut global, 3_600).unwrap(), 0);
        assert_eq!(vault.debt_principal, debt);
        assert_eq!(global.total_debt, debt);
    }

    #[test]
    fn test_zero_elapsed_and_backwards_clock() {
        let (mut vault, mut global) = vault_with_debt(1_000 * WAD);
        vault.last_accrual_time = 500;

        assert_eq!(accrue(&mut vault, &mut global, 500).unwrap(), 0);
        assert_eq!(accrue(&mut vault, &mut global, 100).unwrap(), 0);
        assert_eq!(vault.debt_principal, 1_000 * WAD);
        assert_eq!(vault.last_accrual_time, 500);
    }

    #[test]
    fn test_no_debt_only_moves_clock() {
        let (mut vault, mut global) = vault_with_debt(0);
        assert_eq!(accrue(&mut vault, &mut global, 10_000).unwrap(), 0);
        assert_eq!(vault.last_accrual_time, 10_000);
        assert_eq!(global.total_debt, 0);
    }

    #[test]
    fn test_accrued_debt_is_read_only() {
        let (vault, _) = vault_with_debt(1_000 * WAD);
        let projected = accrued_debt(&vault, DEFAULT_RATE_PER_SECOND, SECONDS_PER_YEAR as i64).unwrap();
        assert_eq!(projected, 1_049_999_999_957_494_335_000);
        assert_eq!(vault.debt_principal, 1_000 * WAD);
        assert_eq!(vault.last_accrual_time, 0);
    }
}
