//! Debt asset and collateral custody capabilities
//!
//! The engine never keeps token balances itself. It asks a `DebtAsset` to
//! issue and destroy debt tokens and a `CollateralCustody` to release native
//! collateral. The in-memory implementations back `VaultManager`.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

use crate::error::VaultError;

/// Role flags held by a debt-asset caller
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions(pub u8);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const MINT: Self = Self(1 << 0);
    pub const BURN: Self = Self(1 << 1);
    pub const MINT_AND_BURN: Self = Self(Self::MINT.0 | Self::BURN.0);

    pub fn has(&self, permission: Self) -> bool {
        (self.0 & permission.0) == permission.0
    }

    pub fn add(&mut self, permission: Self) {
        self.0 |= permission.0;
    }

    pub fn remove(&mut self, permission: Self) {
        self.0 &= !permission.0;
    }
}

/// Mint/burn capability over the debt token
pub trait DebtAsset {
    fn balance_of(&self, owner: &Pubkey) -> u128;

    /// Fails unless `caller` holds the mint role
    fn mint(&mut self, caller: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), VaultError>;

    /// Fails unless `caller` holds the burn role
    fn burn(&mut self, caller: &Pubkey, from: &Pubkey, amount: u128) -> Result<(), VaultError>;
}

/// In-memory debt token: balances plus per-holder roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtLedger {
    admin: Pubkey,
    balances: BTreeMap<Pubkey, u128>,
    roles: BTreeMap<Pubkey, Permissions>,
    total_supply: u128,
}

impl DebtLedger {
    pub fn new(admin: Pubkey) -> Self {
        Self {
            admin,
            balances: BTreeMap::new(),
            roles: BTreeMap::new(),
            total_supply: 0,
        }
    }

    pub fn admin(&self) -> &Pubkey {
        &self.admin
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn permissions_of(&self, account: &Pubkey) -> Permissions {
        self.roles.get(account).copied().unwrap_or_default()
    }

    pub fn grant(&mut self, caller: &Pubkey, account: Pubkey, permission: Permissions) -> Result<(), VaultError> {
        self.require_admin(caller)?;
        self.roles.entry(account).or_default().add(permission);
        Ok(())
    }

    pub fn revoke(&mut self, caller: &Pubkey, account: &Pubkey, permission: Permissions) -> Result<(), VaultError> {
        self.require_admin(caller)?;
        if let Some(roles) = self.roles.get_mut(account) {
            roles.remove(permission);
        }
        Ok(())
    }

    /// Move tokens between holders
    pub fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), VaultError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn require_admin(&self, caller: &Pubkey) -> Result<(), VaultError> {
        if *caller != self.admin {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    fn credit(&mut self, to: &Pubkey, amount: u128) -> Result<(), VaultError> {
        let balance = self.balances.entry(*to).or_default();
        *balance = balance.checked_add(amount).ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    fn debit(&mut self, from: &Pubkey, amount: u128) -> Result<(), VaultError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(VaultError::InsufficientTokenBalance);
        }
        self.balances.insert(*from, balance - amount);
        Ok(())
    }
}

impl DebtAsset for DebtLedger {
    fn balance_of(&self, owner: &Pubkey) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn mint(&mut self, caller: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), VaultError> {
        if !self.permissions_of(caller).has(Permissions::MINT) {
            msg!("{} is not a minter", caller);
            return Err(VaultError::CallerNotMinter);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        self.credit(to, amount)?;
        self.total_supply = supply;
        Ok(())
    }

    fn burn(&mut self, caller: &Pubkey, from: &Pubkey, amount: u128) -> Result<(), VaultError> {
        if !self.permissions_of(caller).has(Permissions::BURN) {
            msg!("{} is not a burner", caller);
            return Err(VaultError::CallerNotBurner);
        }
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }
}

/// Capability to release native collateral held for the vaults
pub trait CollateralCustody {
    /// Balance currently held on behalf of the vaults
    fn held(&self) -> u128;

    /// Take collateral into custody
    fn receive(&mut self, from: &Pubkey, amount: u128) -> Result<(), VaultError>;

    fn pay_out(&mut self, to: &Pubkey, amount: u128) -> Result<(), VaultError>;
}

/// In-memory native balances with a custody pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeLedger {
    balances: BTreeMap<Pubkey, u128>,
    custody: u128,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Pubkey) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Credit an account out of thin air, for funding test wallets
    pub fn airdrop(&mut self, to: &Pubkey, amount: u128) -> Result<(), VaultError> {
        let balance = self.balances.entry(*to).or_default();
        *balance = balance.checked_add(amount).ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }
}

impl CollateralCustody for NativeLedger {
    fn held(&self) -> u128 {
        self.custody
    }

    fn receive(&mut self, from: &Pubkey, amount: u128) -> Result<(), VaultError> {
        let balance = self.balance_of(from);
        if balance < amount {
            msg!("{} holds {} native units, needs {}", from, balance, amount);
            return Err(VaultError::InsufficientTokenBalance);
        }
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        self.balances.insert(*from, balance - amount);
        self.custody = custody;
        Ok(())
    }

    fn pay_out(&mut self, to: &Pubkey, amount: u128) -> Result<(), VaultError> {
        if self.custody < amount {
            return Err(VaultError::InsufficientVaultCollateral);
        }
        self.custody -= amount;
        self.airdrop(to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Actors {
        admin: Pubkey,
        minter: Pubkey,
        burner: Pubkey,
        random: Pubkey,
    }

    fn ledger() -> (DebtLedger, Actors) {
        let actors = Actors {
            admin: Pubkey::new_unique(),
            minter: Pubkey::new_unique(),
            burner: Pubkey::new_unique(),
            random: Pubkey::new_unique(),
        };
        let mut ledger = DebtLedger::new(actors.admin);
        ledger.grant(&actors.admin, actors.minter, Permissions::MINT).unwrap();
        ledger.grant(&actors.admin, actors.burner, Permissions::BURN).unwrap();
        (ledger, actors)
    }

    #[test]
    fn test_minter_mints_burner_burns() {
        let (mut ledger, a) = ledger();
        ledger.mint(&a.minter, &a.random, 1_000).unwrap();
        assert_eq!(ledger.balance_of(&a.random), 1_000);
        assert_eq!(ledger.total_supply(), 1_000);

        ledger.burn(&a.burner, &a.random, 400).unwrap();
        assert_eq!(ledger.balance_of(&a.random), 600);
        assert_eq!(ledger.total_supply(), 600);
    }

    #[test]
    fn test_role_errors() {
        let (mut ledger, a) = ledger();
        assert_eq!(ledger.mint(&a.burner, &a.random, 1), Err(VaultError::CallerNotMinter));
        assert_eq!(ledger.burn(&a.minter, &a.random, 1), Err(VaultError::CallerNotBurner));
        assert_eq!(ledger.mint(&a.random, &a.random, 1), Err(VaultError::CallerNotMinter));
        assert_eq!(ledger.burn(&a.random, &a.random, 1), Err(VaultError::CallerNotBurner));
    }

    #[test]
    fn test_burn_more_than_balance() {
        let (mut ledger, a) = ledger();
        ledger.mint(&a.minter, &a.random, 5).unwrap();
        assert_eq!(
            ledger.burn(&a.burner, &a.random, 6),
            Err(VaultError::InsufficientTokenBalance)
        );
        assert_eq!(ledger.total_supply(), 5);
    }

    #[test]
    fn test_grant_and_revoke() {
        let (mut ledger, a) = ledger();
        assert_eq!(
            ledger.grant(&a.random, a.random, Permissions::MINT),
            Err(VaultError::Unauthorized)
        );

        ledger.grant(&a.admin, a.random, Permissions::MINT_AND_BURN).unwrap();
        assert!(ledger.permissions_of(&a.random).has(Permissions::MINT_AND_BURN));

        ledger.revoke(&a.admin, &a.random, Permissions::MINT).unwrap();
        assert!(!ledger.permissions_of(&a.random).has(Permissions::MINT));
        assert!(ledger.permissions_of(&a.random).has(Permissions::BURN));
    }

    #[test]
    fn test_native_custody() {
        let user = Pubkey::new_unique();
        let mut native = NativeLedger::new();
        native.airdrop(&user, 10).unwrap();

        native.receive(&user, 7).unwrap();
        assert_eq!(native.held(), 7);
        assert_eq!(native.balance_of(&user), 3);
        assert_eq!(native.receive(&user, 4), Err(VaultError::InsufficientTokenBalance));

        native.pay_out(&user, 5).unwrap();
        assert_eq!(native.held(), 2);
        assert_eq!(native.balance_of(&user), 8);
        assert_eq!(native.pay_out(&user, 3), Err(VaultError::InsufficientVaultCollateral));
    }
}
