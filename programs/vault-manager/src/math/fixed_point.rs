//! WAD fixed-point arithmetic
//!
//! All values are unsigned 18-decimal fixed point stored in `u128`. Products are
//! formed in 256 bits and every division truncates toward zero, so repeated
//! calls never round in the caller's favour.

use crate::error::VaultError;

uint::construct_uint! {
    /// 256-bit intermediate for u128 x u128 products
    pub struct U256(4);
}

/// 1.0 in WAD
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Number of decimals carried by a WAD value
pub const WAD_DECIMALS: u8 = 18;

/// `a * b / c`, truncated
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, VaultError> {
    if c == 0 {
        return Err(VaultError::DivisionByZero);
    }
    let result = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(VaultError::ArithmeticOverflow)?
        / U256::from(c);
    to_u128(result)
}

/// Like `mul_div` but clamps to `cap` instead of failing on overflow
pub fn mul_div_saturating(a: u128, b: u128, c: u128, cap: u128) -> Result<u128, VaultError> {
    if c == 0 {
        return Err(VaultError::DivisionByZero);
    }
    let result = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(VaultError::ArithmeticOverflow)?
        / U256::from(c);
    if result > U256::from(cap) {
        Ok(cap)
    } else {
        Ok(result.as_u128())
    }
}

/// `a * b / WAD`
pub fn wmul(a: u128, b: u128) -> Result<u128, VaultError> {
    mul_div(a, b, WAD)
}

/// `a * WAD / b`
pub fn wdiv(a: u128, b: u128) -> Result<u128, VaultError> {
    mul_div(a, WAD, b)
}

/// Raise a WAD value to an integer power by repeated squaring.
/// Each square and each multiply truncates.
pub fn rpow(base: u128, exponent: u64) -> Result<u128, VaultError> {
    let mut x = base;
    let mut n = exponent;
    let mut z = if n % 2 != 0 { x } else { WAD };

    n /= 2;
    while n > 0 {
        x = wmul(x, x)?;
        if n % 2 != 0 {
            z = wmul(z, x)?;
        }
        n /= 2;
    }

    Ok(z)
}

/// Rescale an amount carrying `decimals` decimals to WAD
pub fn to_wad(amount: u128, decimals: u8) -> Result<u128, VaultError> {
    if decimals <= WAD_DECIMALS {
        amount
            .checked_mul(pow10(WAD_DECIMALS - decimals)?)
            .ok_or(VaultError::ArithmeticOverflow)
    } else {
        Ok(amount / pow10(decimals - WAD_DECIMALS)?)
    }
}

/// Rescale a WAD amount down (or up) to `decimals` decimals, truncating
pub fn from_wad(amount: u128, decimals: u8) -> Result<u128, VaultError> {
    if decimals <= WAD_DECIMALS {
        Ok(amount / pow10(WAD_DECIMALS - decimals)?)
    } else {
        amount
            .checked_mul(pow10(decimals - WAD_DECIMALS)?)
            .ok_or(VaultError::ArithmeticOverflow)
    }
}

pub fn pow10(exp: u8) -> Result<u128, VaultError> {
    10u128
        .checked_pow(exp as u32)
        .ok_or(VaultError::ArithmeticOverflow)
}

fn to_u128(value: U256) -> Result<u128, VaultError> {
    if value > U256::from(u128::MAX) {
        return Err(VaultError::ArithmeticOverflow);
    }
    Ok(value.as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_uses_wide_intermediate() {
        // 3e18 * 2000e18 overflows u128 but the quotient does not
        let value = mul_div(3 * WAD, 2_000 * WAD, WAD).unwrap();
        assert_eq!(value, 6_000 * WAD);
    }

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(wdiv(2, 3).unwrap(), 666_666_666_666_666_666);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div(1, 1, 0), Err(VaultError::DivisionByZero));
        assert_eq!(
            mul_div(u128::MAX, u128::MAX, 1),
            Err(VaultError::ArithmeticOverflow)
        );
        assert_eq!(mul_div_saturating(u128::MAX, 4, 2, 77).unwrap(), 77);
    }

    #[test]
    fn test_rpow() {
        assert_eq!(rpow(2 * WAD, 0).unwrap(), WAD);
        assert_eq!(rpow(2 * WAD, 1).unwrap(), 2 * WAD);
        assert_eq!(rpow(2 * WAD, 10).unwrap(), 1_024 * WAD);
        assert_eq!(rpow(WAD, 31_536_000).unwrap(), WAD);
        assert_eq!(rpow(3 * WAD / 2, 3).unwrap(), 3_375 * WAD / 1_000);
    }

    #[test]
    fn test_rpow_overflow() {
        assert_eq!(rpow(2 * WAD, 200), Err(VaultError::ArithmeticOverflow));
    }

    #[test]
    fn test_decimal_rescaling() {
        assert_eq!(to_wad(2_000 * 100_000_000, 8).unwrap(), 2_000 * WAD);
        assert_eq!(to_wad(5, 18).unwrap(), 5);
        assert_eq!(from_wad(787_500_000_000_000_000, 9).unwrap(), 787_500_000);
        assert_eq!(to_wad(1_000, 21).unwrap(), 1);
        assert_eq!(from_wad(1, 21).unwrap(), 1_000);
    }
}
