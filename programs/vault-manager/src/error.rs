//! Error types for the vault manager
//!
//! Every rejected operation surfaces one of these codes; nothing is partially applied.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Failure taxonomy shared by every host
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    InputValidation,
    InsufficientCollateral,
    InsufficientBalance,
    StateGuard,
    AccessControl,
    Configuration,
    Oracle,
    Arithmetic,
    Account,
}

#[derive(Clone, Copy, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum VaultError {
    // Input validation (6000-6009)
    #[error("Amount must be > 0")]
    ZeroAmount = 6000,

    #[error("Collateral below floor")]
    BelowCollateralFloor = 6001,

    // Collateralization (6010-6019)
    #[error("Not enough collateral")]
    InsufficientCollateral = 6010,

    #[error("Withdrawing would cause debt to be undercollateralised")]
    WithdrawalUndercollateralized = 6011,

    #[error("Not enough collateral in vault")]
    InsufficientVaultCollateral = 6012,

    // Balances and debt bounds (6020-6029)
    #[error("Not enough collateral to withdraw")]
    ExceedsCollateral = 6020,

    #[error("Insufficient token balance")]
    InsufficientTokenBalance = 6021,

    #[error("Not enough debt")]
    ExceedsDebt = 6022,

    #[error("Cannot repay more than debt")]
    RepayExceedsDebt = 6023,

    // State guards (6030-6039)
    #[error("Zero Liquidation vault cannot be liquidated")]
    ZeroLiquidationProtected = 6030,

    #[error("Vault not undercollateralised")]
    NotUndercollateralized = 6031,

    #[error("Enforced pause")]
    EnforcedPause = 6032,

    #[error("Expected pause")]
    ExpectedPause = 6033,

    // Access control (6040-6049)
    #[error("Caller is not the owner")]
    Unauthorized = 6040,

    #[error("Caller is not a minter")]
    CallerNotMinter = 6041,

    #[error("Caller is not a burner")]
    CallerNotBurner = 6042,

    // Configuration (6050-6059)
    #[error("Invalid collateral ratios")]
    InvalidRatios = 6050,

    #[error("Invalid bonus percent")]
    InvalidBonusPercent = 6051,

    #[error("Rate per second out of bounds")]
    RateOutOfBounds = 6052,

    #[error("Invalid rebalance interval")]
    InvalidRebalanceInterval = 6053,

    #[error("Invalid collateral decimals")]
    InvalidCollateralDecimals = 6054,

    // Oracle (6060-6069)
    #[error("Invalid oracle price")]
    InvalidOraclePrice = 6060,

    // Arithmetic (6070-6079)
    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 6070,

    #[error("Division by zero")]
    DivisionByZero = 6071,

    // Host accounts (6080-6089)
    #[error("Account not initialized")]
    AccountNotInitialized = 6080,

    #[error("Account already initialized")]
    AccountAlreadyInitialized = 6081,

    #[error("Invalid PDA")]
    InvalidPDA = 6082,

    #[error("Invalid account data")]
    InvalidAccountData = 6083,

    #[error("Account does not match manager binding")]
    AccountMismatch = 6084,
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        use VaultError::*;
        match self {
            ZeroAmount | BelowCollateralFloor => ErrorKind::InputValidation,
            InsufficientCollateral | WithdrawalUndercollateralized | InsufficientVaultCollateral => {
                ErrorKind::InsufficientCollateral
            }
            ExceedsCollateral | InsufficientTokenBalance | ExceedsDebt | RepayExceedsDebt => {
                ErrorKind::InsufficientBalance
            }
            ZeroLiquidationProtected | NotUndercollateralized | EnforcedPause | ExpectedPause => {
                ErrorKind::StateGuard
            }
            Unauthorized | CallerNotMinter | CallerNotBurner => ErrorKind::AccessControl,
            InvalidRatios
            | InvalidBonusPercent
            | RateOutOfBounds
            | InvalidRebalanceInterval
            | InvalidCollateralDecimals => ErrorKind::Configuration,
            InvalidOraclePrice => ErrorKind::Oracle,
            ArithmeticOverflow | DivisionByZero => ErrorKind::Arithmetic,
            AccountNotInitialized
            | AccountAlreadyInitialized
            | InvalidPDA
            | InvalidAccountData
            | AccountMismatch => ErrorKind::Account,
        }
    }

    /// Decode a `ProgramError::Custom` code back into a vault error
    pub fn from_code(code: u32) -> Option<Self> {
        Self::from_u32(code)
    }
}

impl PrintProgramError for VaultError {
    fn print<E>(&self) {
        msg!("Vault Manager Error: {}", self);
    }
}

impl From<VaultError> for ProgramError {
    fn from(e: VaultError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for VaultError {
    fn type_of() -> &'static str {
        "VaultError"
    }
}
