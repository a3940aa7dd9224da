use crate::{
    error::VaultError,
    math::{mul_div_saturating, to_wad, wmul, WAD},
    state::Vault,
};

/// Ratio reported for a vault without debt
pub const MAX_RATIO: u128 = u128::MAX;

/// Value of `collateral` native units in debt-asset terms (WAD)
pub fn collateral_value(collateral: u128, decimals: u8, price: u128) -> Result<u128, VaultError> {
    wmul(to_wad(collateral, decimals)?, price)
}

/// `value(collateral) / debt` in WAD.
///
/// Returns `MAX_RATIO` iff `debt == 0`. Finite ratios too large for `u128`
/// saturate one below the sentinel.
pub fn ratio_of(collateral: u128, debt: u128, decimals: u8, price: u128) -> Result<u128, VaultError> {
    if debt == 0 {
        return Ok(MAX_RATIO);
    }
    let value = collateral_value(collateral, decimals, price)?;
    mul_div_saturating(value, WAD, debt, MAX_RATIO - 1)
}

/// Ratio of a vault against its current (already accrued) debt
pub fn vault_ratio(vault: &Vault, decimals: u8, price: u128) -> Result<u128, VaultError> {
    ratio_of(vault.collateral_amount, vault.debt_principal, decimals, price)
}
