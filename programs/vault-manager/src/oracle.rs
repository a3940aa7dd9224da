//! Collateral price source
//!
//! Prices arrive as a signed integer answer with its own precision and are
//! normalized to WAD before the engine sees them.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    error::VaultError,
    math::{pow10, WAD_DECIMALS},
};

/// Precision used by aggregator-style feeds
pub const DEFAULT_FEED_DECIMALS: u8 = 8;

/// Largest precision a feed may report
pub const MAX_FEED_DECIMALS: u8 = 36;

/// Raw answer of a price feed
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceData {
    pub answer: i128,
    pub decimals: u8,
}

impl PriceData {
    /// Price in WAD; non-positive answers are rejected
    pub fn to_wad(&self) -> Result<u128, VaultError> {
        if self.answer <= 0 || self.decimals > MAX_FEED_DECIMALS {
            return Err(VaultError::InvalidOraclePrice);
        }
        let answer = self.answer as u128;
        let price = if self.decimals <= WAD_DECIMALS {
            answer
                .checked_mul(pow10(WAD_DECIMALS - self.decimals)?)
                .ok_or(VaultError::ArithmeticOverflow)?
        } else {
            answer / pow10(self.decimals - WAD_DECIMALS)?
        };
        if price == 0 {
            return Err(VaultError::InvalidOraclePrice);
        }
        Ok(price)
    }
}

/// Capability to read the latest collateral price
pub trait PriceOracle {
    fn latest_price(&self) -> Result<PriceData, VaultError>;

    fn latest_price_wad(&self) -> Result<u128, VaultError> {
        self.latest_price()?.to_wad()
    }
}

/// In-memory aggregator with a settable answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAggregator {
    answer: i128,
    decimals: u8,
}

impl MockAggregator {
    pub fn new(answer: i128) -> Self {
        Self::with_decimals(answer, DEFAULT_FEED_DECIMALS)
    }

    pub fn with_decimals(answer: i128, decimals: u8) -> Self {
        Self { answer, decimals }
    }

    pub fn update_answer(&mut self, answer: i128) {
        self.answer = answer;
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl PriceOracle for MockAggregator {
    fn latest_price(&self) -> Result<PriceData, VaultError> {
        Ok(PriceData {
            answer: self.answer,
            decimals: self.decimals,
        })
    }
}

/// Price feed account discriminator
pub const PRICE_FEED_DISCRIMINATOR: [u8; 8] = [80, 82, 73, 67, 69, 70, 68, 49]; // "PRICEFD1"

/// On-chain price feed, written by its authority
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PriceFeed {
    pub discriminator: [u8; 8],
    pub is_initialized: bool,
    pub authority: Pubkey,
    pub answer: i128,
    pub decimals: u8,
    pub updated_at: UnixTimestamp,
}

impl PriceFeed {
    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // authority
        16 + // answer
        1 + // decimals
        8; // updated_at

    pub fn new(authority: Pubkey, answer: i128, decimals: u8, now: UnixTimestamp) -> Self {
        Self {
            discriminator: PRICE_FEED_DISCRIMINATOR,
            is_initialized: true,
            authority,
            answer,
            decimals,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.discriminator != PRICE_FEED_DISCRIMINATOR {
            return Err(VaultError::InvalidAccountData);
        }
        if !self.is_initialized {
            return Err(VaultError::AccountNotInitialized);
        }
        Ok(())
    }

    pub fn update(&mut self, answer: i128, now: UnixTimestamp) {
        self.answer = answer;
        self.updated_at = now;
    }
}

impl PriceOracle for PriceFeed {
    fn latest_price(&self) -> Result<PriceData, VaultError> {
        Ok(PriceData {
            answer: self.answer,
            decimals: self.decimals,
        })
    }
}
