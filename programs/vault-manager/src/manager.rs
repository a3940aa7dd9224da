//! In-memory vault manager
//!
//! Binds the engine to a price oracle, a debt asset and collateral custody.
//! Calls are sequential and take the host clock as an argument. Engine state
//! is written before any asset interaction; if an interaction fails the
//! previous state is restored.

use std::collections::BTreeMap;

use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::{
    assets::{CollateralCustody, DebtAsset},
    engine::{
        admin, interest, ledger, liquidation,
        ratio::ratio_of,
        rebalancing::annualized_rate,
        Market,
    },
    error::VaultError,
    events::{emit_all, VaultEvent},
    oracle::PriceOracle,
    state::{EngineConfig, GlobalState, Vault, VaultStatus, VaultView},
};

pub struct VaultManager<O, D, C> {
    config: EngineConfig,
    global: GlobalState,
    vaults: BTreeMap<Pubkey, Vault>,
    oracle: O,
    debt_asset: D,
    custody: C,
    /// Identity holding the mint and burn roles on `debt_asset`
    authority: Pubkey,
    history: Vec<VaultEvent>,
}

struct Snapshot {
    global: GlobalState,
    owner: Pubkey,
    vault: Option<Vault>,
}

impl<O, D, C> VaultManager<O, D, C>
where
    O: PriceOracle,
    D: DebtAsset,
    C: CollateralCustody,
{
    pub fn new(
        config: EngineConfig,
        oracle: O,
        debt_asset: D,
        custody: C,
        authority: Pubkey,
        now: UnixTimestamp,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        Ok(Self {
            config,
            global: GlobalState::new(now),
            vaults: BTreeMap::new(),
            oracle,
            debt_asset,
            custody,
            authority,
            history: Vec::new(),
        })
    }

    // === Vault operations ===

    pub fn deposit_collateral(
        &mut self,
        owner: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let snapshot = self.snapshot(owner);
        let mut vault = self.load_vault(owner, now);

        let events = ledger::deposit_collateral(&self.config, &mut self.global, &mut vault, market, amount)?;
        self.vaults.insert(*owner, vault);

        let received = self.custody.receive(owner, amount);
        self.finish(snapshot, received, events)
    }

    pub fn withdraw_collateral(
        &mut self,
        owner: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let snapshot = self.snapshot(owner);
        let mut vault = self.load_vault(owner, now);

        let events = ledger::withdraw_collateral(&self.config, &mut self.global, &mut vault, market, amount)?;
        self.vaults.insert(*owner, vault);

        let paid = self.custody.pay_out(owner, amount);
        self.finish(snapshot, paid, events)
    }

    pub fn mint(
        &mut self,
        owner: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let snapshot = self.snapshot(owner);
        let mut vault = self.load_vault(owner, now);

        let events = ledger::mint(&self.config, &mut self.global, &mut vault, market, amount)?;
        self.vaults.insert(*owner, vault);

        let minted = self.debt_asset.mint(&self.authority, owner, amount);
        self.finish(snapshot, minted, events)
    }

    pub fn burn(
        &mut self,
        owner: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let snapshot = self.snapshot(owner);
        let mut vault = self.load_vault(owner, now);
        let balance = self.debt_asset.balance_of(owner);

        let events = ledger::burn(&self.config, &mut self.global, &mut vault, market, amount, balance, 1)?;
        self.vaults.insert(*owner, vault);

        let burned = self.debt_asset.burn(&self.authority, owner, amount);
        self.finish(snapshot, burned, events)
    }

    pub fn enable_zero_liquidation(
        &mut self,
        owner: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let mut vault = self.existing_vault(owner)?;

        let events = ledger::enable_zero_liquidation(&self.config, &mut self.global, &mut vault, market)?;
        self.vaults.insert(*owner, vault);
        Ok(self.publish(events))
    }

    pub fn disable_zero_liquidation(
        &mut self,
        owner: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let mut vault = self.existing_vault(owner)?;

        let events = ledger::disable_zero_liquidation(&self.config, &mut self.global, &mut vault, market)?;
        self.vaults.insert(*owner, vault);
        Ok(self.publish(events))
    }

    /// Repay part of `owner`'s debt from `liquidator`'s tokens in exchange for collateral
    pub fn liquidate(
        &mut self,
        liquidator: &Pubkey,
        owner: &Pubkey,
        repay_amount: u128,
        now: UnixTimestamp,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let market = self.market(now)?;
        let snapshot = self.snapshot(owner);
        let mut vault = self.load_vault(owner, now);
        let balance = self.debt_asset.balance_of(liquidator);

        let outcome = liquidation::liquidate(
            &self.config,
            &mut self.global,
            &mut vault,
            market,
            *liquidator,
            repay_amount,
            balance,
        )?;
        self.vaults.insert(*owner, vault);

        // custody always holds at least total collateral, so the payout cannot fail after the burn
        let settled = self
            .debt_asset
            .burn(&self.authority, liquidator, repay_amount)
            .and_then(|_| self.custody.pay_out(liquidator, outcome.collateral_reward));
        self.finish(snapshot, settled, outcome.events)
    }

    // === Admin ===

    pub fn pause(&mut self, caller: &Pubkey) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::pause(&self.config, &mut self.global, caller)?;
        Ok(self.publish(events))
    }

    pub fn unpause(&mut self, caller: &Pubkey) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::unpause(&self.config, &mut self.global, caller)?;
        Ok(self.publish(events))
    }

    pub fn set_collateral_floor(&mut self, caller: &Pubkey, floor: u128) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::set_collateral_floor(&mut self.config, caller, floor)?;
        Ok(self.publish(events))
    }

    pub fn set_ratios(
        &mut self,
        caller: &Pubkey,
        standard_ratio: u128,
        zero_liquidation_ratio: u128,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::set_ratios(&mut self.config, caller, standard_ratio, zero_liquidation_ratio)?;
        Ok(self.publish(events))
    }

    pub fn set_bonus_percent(&mut self, caller: &Pubkey, bonus: u128) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::set_bonus_percent(&mut self.config, caller, bonus)?;
        Ok(self.publish(events))
    }

    pub fn set_rate_per_second(&mut self, caller: &Pubkey, rate: u128) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::set_rate_per_second(&self.config, &mut self.global, caller, rate)?;
        Ok(self.publish(events))
    }

    pub fn set_rebalancing_enabled(&mut self, caller: &Pubkey, enabled: bool) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::set_rebalancing_enabled(&self.config, &mut self.global, caller, enabled)?;
        Ok(self.publish(events))
    }

    pub fn set_rebalance_interval(&mut self, caller: &Pubkey, seconds: i64) -> Result<Vec<VaultEvent>, VaultError> {
        let events = admin::set_rebalance_interval(&mut self.config, caller, seconds)?;
        Ok(self.publish(events))
    }

    // === Queries ===

    /// Stored position; pending interest is not included
    pub fn get_vault(&self, owner: &Pubkey) -> VaultView {
        self.vaults
            .get(owner)
            .map(VaultView::from)
            .unwrap_or(VaultView {
                collateral: 0,
                principal_debt: 0,
                zero_liquidation: false,
            })
    }

    pub fn get_accrued_debt(&self, owner: &Pubkey, now: UnixTimestamp) -> Result<u128, VaultError> {
        match self.vaults.get(owner) {
            Some(vault) => interest::accrued_debt(vault, self.global.current_rate_per_second, now),
            None => Ok(0),
        }
    }

    /// Ratio against accrued debt at `now`
    pub fn get_collateral_ratio(&self, owner: &Pubkey, now: UnixTimestamp) -> Result<u128, VaultError> {
        let price = self.oracle.latest_price_wad()?;
        let collateral = self.get_vault(owner).collateral;
        let debt = self.get_accrued_debt(owner, now)?;
        ratio_of(collateral, debt, self.config.collateral_decimals, price)
    }

    pub fn get_annualized_rate(&self) -> Result<u128, VaultError> {
        annualized_rate(self.global.current_rate_per_second)
    }

    pub fn get_global_state(&self) -> &GlobalState {
        &self.global
    }

    pub fn vault_status(&self, owner: &Pubkey) -> VaultStatus {
        self.vaults
            .get(owner)
            .map(Vault::status)
            .unwrap_or(VaultStatus::Idle)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Every notification published so far, in order
    pub fn history(&self) -> &[VaultEvent] {
        &self.history
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn debt_asset(&self) -> &D {
        &self.debt_asset
    }

    pub fn debt_asset_mut(&mut self) -> &mut D {
        &mut self.debt_asset
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    // === Internals ===

    fn market(&self, now: UnixTimestamp) -> Result<Market, VaultError> {
        Ok(Market::new(self.oracle.latest_price_wad()?, now))
    }

    fn load_vault(&self, owner: &Pubkey, now: UnixTimestamp) -> Vault {
        self.vaults
            .get(owner)
            .cloned()
            .unwrap_or_else(|| Vault::new(*owner, 0, now))
    }

    /// Vaults are opened by a deposit; toggles on an unknown owner are rejected
    fn existing_vault(&self, owner: &Pubkey) -> Result<Vault, VaultError> {
        self.vaults
            .get(owner)
            .cloned()
            .ok_or(VaultError::AccountNotInitialized)
    }

    fn snapshot(&self, owner: &Pubkey) -> Snapshot {
        Snapshot {
            global: self.global.clone(),
            owner: *owner,
            vault: self.vaults.get(owner).cloned(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.global = snapshot.global;
        match snapshot.vault {
            Some(vault) => {
                self.vaults.insert(snapshot.owner, vault);
            }
            None => {
                self.vaults.remove(&snapshot.owner);
            }
        }
    }

    fn finish(
        &mut self,
        snapshot: Snapshot,
        interaction: Result<(), VaultError>,
        events: Vec<VaultEvent>,
    ) -> Result<Vec<VaultEvent>, VaultError> {
        if let Err(err) = interaction {
            self.restore(snapshot);
            return Err(err);
        }
        Ok(self.publish(events))
    }

    fn publish(&mut self, events: Vec<VaultEvent>) -> Vec<VaultEvent> {
        emit_all(&events);
        self.history.extend(events.iter().cloned());
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assets::{DebtLedger, NativeLedger, Permissions},
        math::WAD,
        oracle::MockAggregator,
    };

    type Manager = VaultManager<MockAggregator, DebtLedger, NativeLedger>;

    fn manager(user: &Pubkey) -> Manager {
        let owner = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mut debt = DebtLedger::new(owner);
        debt.grant(&owner, authority, Permissions::MINT_AND_BURN).unwrap();
        let mut native = NativeLedger::new();
        native.airdrop(user, 100 * WAD).unwrap();

        VaultManager::new(
            EngineConfig::default(owner),
            MockAggregator::new(2_000_00000000),
            debt,
            native,
            authority,
            0,
        )
        .unwrap()
    }

    #[test]
    fn test_failed_custody_restores_state() {
        let user = Pubkey::new_unique();
        let mut m = manager(&user);

        assert_eq!(
            m.deposit_collateral(&user, 101 * WAD, 0),
            Err(VaultError::InsufficientTokenBalance)
        );
        assert_eq!(m.get_global_state().total_collateral, 0);
        assert_eq!(m.vault_status(&user), VaultStatus::Idle);
        assert!(m.history().is_empty());
    }

    #[test]
    fn test_missing_mint_role_restores_state() {
        let user = Pubkey::new_unique();
        let mut m = manager(&user);
        m.deposit_collateral(&user, 3 * WAD, 0).unwrap();

        let admin = *m.debt_asset().admin();
        let authority = m.authority;
        m.debt_asset_mut()
            .revoke(&admin, &authority, Permissions::MINT)
            .unwrap();

        assert_eq!(m.mint(&user, 1_000 * WAD, 0), Err(VaultError::CallerNotMinter));
        assert_eq!(m.get_vault(&user).principal_debt, 0);
        assert_eq!(m.get_global_state().total_debt, 0);
    }

    #[test]
    fn test_custody_tracks_total_collateral() {
        let user = Pubkey::new_unique();
        let mut m = manager(&user);
        m.deposit_collateral(&user, 6 * WAD, 0).unwrap();
        m.withdraw_collateral(&user, 2 * WAD, 10).unwrap();

        assert_eq!(m.custody().held(), m.get_global_state().total_collateral);
        assert_eq!(m.custody().balance_of(&user), 96 * WAD);
    }

    #[test]
    fn test_unknown_owner_queries() {
        let user = Pubkey::new_unique();
        let m = manager(&user);
        let stranger = Pubkey::new_unique();
        assert_eq!(m.get_vault(&stranger).collateral, 0);
        assert_eq!(m.get_accrued_debt(&stranger, 100).unwrap(), 0);
        assert_eq!(m.get_collateral_ratio(&stranger, 100).unwrap(), u128::MAX);
    }
}
