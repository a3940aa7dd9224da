use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::{Clock, UnixTimestamp},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};
use spl_token::state::{Account as TokenAccount, Mint};

use crate::{
    engine::{admin, ledger, liquidation, Market},
    error::VaultError,
    events::{emit_all, VaultEvent},
    instruction::VaultInstruction,
    math::to_wad,
    oracle::{PriceData, PriceFeed, PriceOracle},
    pda::{
        find_manager_address, find_mint_authority_address, find_vault_address, MANAGER_SEED,
        MINT_AUTHORITY_SEED, VAULT_SEED,
    },
    state::{EngineConfig, GlobalState, ManagerAccount, Vault, MANAGER_DISCRIMINATOR},
};

/// Precision of lamports
pub const LAMPORT_DECIMALS: u8 = 9;

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    Processor::process(program_id, accounts, instruction_data)
}

pub struct Processor;

impl Processor {
    fn borsh_deserialize_unchecked<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
        let mut cursor: &[u8] = data;
        T::deserialize(&mut cursor).map_err(|_| ProgramError::InvalidAccountData)
    }

    fn save<T: BorshSerialize>(value: &T, info: &AccountInfo) -> ProgramResult {
        value
            .serialize(&mut &mut info.try_borrow_mut_data()?[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = VaultInstruction::unpack(instruction_data)?;

        match instruction {
            VaultInstruction::InitializeManager => {
                msg!("Instruction: InitializeManager");
                Self::process_initialize_manager(program_id, accounts)
            }
            VaultInstruction::InitializePriceFeed { answer, decimals } => {
                msg!("Instruction: InitializePriceFeed");
                Self::process_initialize_price_feed(program_id, accounts, answer, decimals)
            }
            VaultInstruction::UpdatePrice { answer } => {
                msg!("Instruction: UpdatePrice");
                Self::process_update_price(program_id, accounts, answer)
            }
            VaultInstruction::DepositCollateral { amount } => {
                msg!("Instruction: DepositCollateral");
                Self::process_deposit_collateral(program_id, accounts, amount)
            }
            VaultInstruction::WithdrawCollateral { amount } => {
                msg!("Instruction: WithdrawCollateral");
                Self::process_withdraw_collateral(program_id, accounts, amount)
            }
            VaultInstruction::Mint { amount } => {
                msg!("Instruction: Mint");
                Self::process_mint(program_id, accounts, amount)
            }
            VaultInstruction::Burn { amount } => {
                msg!("Instruction: Burn");
                Self::process_burn(program_id, accounts, amount)
            }
            VaultInstruction::EnableZeroLiquidation => {
                msg!("Instruction: EnableZeroLiquidation");
                Self::process_toggle_zero_liquidation(program_id, accounts, true)
            }
            VaultInstruction::DisableZeroLiquidation => {
                msg!("Instruction: DisableZeroLiquidation");
                Self::process_toggle_zero_liquidation(program_id, accounts, false)
            }
            VaultInstruction::Liquidate { repay_amount } => {
                msg!("Instruction: Liquidate");
                Self::process_liquidate(program_id, accounts, repay_amount)
            }
            other => {
                msg!("Instruction: {:?}", other);
                Self::process_admin(program_id, accounts, other)
            }
        }
    }

    fn process_initialize_manager(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let debt_mint_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (manager_key, manager_bump) = find_manager_address(program_id);
        if manager_key != *manager_info.key {
            return Err(VaultError::InvalidPDA.into());
        }
        if !manager_info.data_is_empty() {
            return Err(VaultError::AccountAlreadyInitialized.into());
        }

        // The program must control issuance of the debt token
        if *debt_mint_info.owner != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        let mint = Mint::unpack(&debt_mint_info.try_borrow_data()?)?;
        let (mint_authority, mint_authority_bump) = find_mint_authority_address(program_id);
        if mint.mint_authority != COption::Some(mint_authority) {
            msg!("Debt mint authority must be {}", mint_authority);
            return Err(VaultError::AccountMismatch.into());
        }

        Self::load_price_feed(program_id, price_feed_info)?;

        let rent = Rent::get()?;
        invoke_signed(
            &system_instruction::create_account(
                owner_info.key,
                manager_info.key,
                rent.minimum_balance(ManagerAccount::LEN),
                ManagerAccount::LEN as u64,
                program_id,
            ),
            &[owner_info.clone(), manager_info.clone(), system_program.clone()],
            &[&[MANAGER_SEED, &[manager_bump]]],
        )?;

        let now = Clock::get()?.unix_timestamp;
        let manager = ManagerAccount {
            discriminator: MANAGER_DISCRIMINATOR,
            is_initialized: true,
            bump: manager_bump,
            mint_authority_bump,
            debt_mint: *debt_mint_info.key,
            price_feed: *price_feed_info.key,
            config: EngineConfig::with_collateral_decimals(*owner_info.key, LAMPORT_DECIMALS)?,
            global: GlobalState::new(now),
        };
        Self::save(&manager, manager_info)?;

        msg!("Vault manager initialized, owner {}", owner_info.key);
        Ok(())
    }

    fn process_initialize_price_feed(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        answer: i128,
        decimals: u8,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let feed_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        if feed_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        if feed_info.data_len() < PriceFeed::LEN {
            return Err(ProgramError::AccountDataTooSmall);
        }

        let existing: PriceFeed = Self::borsh_deserialize_unchecked(&feed_info.try_borrow_data()?)?;
        if existing.is_initialized {
            return Err(VaultError::AccountAlreadyInitialized.into());
        }

        PriceData { answer, decimals }.to_wad()?;

        let now = Clock::get()?.unix_timestamp;
        let feed = PriceFeed::new(*authority_info.key, answer, decimals, now);
        Self::save(&feed, feed_info)?;

        msg!("Price feed initialized: {} ({} decimals)", answer, decimals);
        Ok(())
    }

    fn process_update_price(program_id: &Pubkey, accounts: &[AccountInfo], answer: i128) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let feed_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut feed = Self::load_price_feed(program_id, feed_info)?;
        if feed.authority != *authority_info.key {
            return Err(VaultError::Unauthorized.into());
        }
        PriceData { answer, decimals: feed.decimals }.to_wad()?;

        feed.update(answer, Clock::get()?.unix_timestamp);
        Self::save(&feed, feed_info)?;

        msg!("Price updated to {}", answer);
        Ok(())
    }

    fn process_deposit_collateral(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let market = Self::load_market(program_id, &manager, price_feed_info)?;

        let (vault_key, vault_bump) = find_vault_address(program_id, owner_info.key);
        if vault_key != *vault_info.key {
            return Err(VaultError::InvalidPDA.into());
        }

        // Vaults are created on first deposit
        let mut vault = if vault_info.data_is_empty() {
            let rent = Rent::get()?;
            invoke_signed(
                &system_instruction::create_account(
                    owner_info.key,
                    vault_info.key,
                    rent.minimum_balance(Vault::LEN),
                    Vault::LEN as u64,
                    program_id,
                ),
                &[owner_info.clone(), vault_info.clone(), system_program.clone()],
                &[&[VAULT_SEED, owner_info.key.as_ref(), &[vault_bump]]],
            )?;
            Vault::new(*owner_info.key, vault_bump, market.now)
        } else {
            Self::load_vault(program_id, vault_info, owner_info.key)?
        };

        let events = ledger::deposit_collateral(
            &manager.config,
            &mut manager.global,
            &mut vault,
            market,
            amount as u128,
        )?;
        Self::commit(&manager, manager_info, &vault, vault_info)?;

        invoke(
            &system_instruction::transfer(owner_info.key, vault_info.key, amount),
            &[owner_info.clone(), vault_info.clone(), system_program.clone()],
        )?;

        emit_all(&events);
        Ok(())
    }

    fn process_withdraw_collateral(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let market = Self::load_market(program_id, &manager, price_feed_info)?;
        let mut vault = Self::load_vault(program_id, vault_info, owner_info.key)?;

        let events = ledger::withdraw_collateral(
            &manager.config,
            &mut manager.global,
            &mut vault,
            market,
            amount as u128,
        )?;
        Self::commit(&manager, manager_info, &vault, vault_info)?;

        Self::transfer_lamports(vault_info, owner_info, amount)?;

        emit_all(&events);
        Ok(())
    }

    fn process_mint(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;
        let debt_mint_info = next_account_info(account_info_iter)?;
        let token_account_info = next_account_info(account_info_iter)?;
        let mint_authority_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let market = Self::load_market(program_id, &manager, price_feed_info)?;
        let mut vault = Self::load_vault(program_id, vault_info, owner_info.key)?;
        let decimals = Self::debt_decimals(&manager, debt_mint_info, token_program)?;
        Self::check_token_account(token_account_info, &manager.debt_mint, owner_info.key)?;

        let mint_authority = Pubkey::create_program_address(
            &[MINT_AUTHORITY_SEED, &[manager.mint_authority_bump]],
            program_id,
        )?;
        if mint_authority != *mint_authority_info.key {
            return Err(VaultError::InvalidPDA.into());
        }

        let debt = to_wad(amount as u128, decimals)?;
        let events = ledger::mint(&manager.config, &mut manager.global, &mut vault, market, debt)?;
        Self::commit(&manager, manager_info, &vault, vault_info)?;

        invoke_signed(
            &spl_token::instruction::mint_to(
                token_program.key,
                debt_mint_info.key,
                token_account_info.key,
                mint_authority_info.key,
                &[],
                amount,
            )?,
            &[
                debt_mint_info.clone(),
                token_account_info.clone(),
                mint_authority_info.clone(),
                token_program.clone(),
            ],
            &[&[MINT_AUTHORITY_SEED, &[manager.mint_authority_bump]]],
        )?;

        emit_all(&events);
        Ok(())
    }

    fn process_burn(program_id: &Pubkey, accounts: &[AccountInfo], amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;
        let debt_mint_info = next_account_info(account_info_iter)?;
        let token_account_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let market = Self::load_market(program_id, &manager, price_feed_info)?;
        let mut vault = Self::load_vault(program_id, vault_info, owner_info.key)?;
        let decimals = Self::debt_decimals(&manager, debt_mint_info, token_program)?;
        let token_balance = Self::check_token_account(token_account_info, &manager.debt_mint, owner_info.key)?;

        let debt = to_wad(amount as u128, decimals)?;
        let balance = to_wad(token_balance as u128, decimals)?;
        let token_unit = to_wad(1, decimals)?;
        let events = ledger::burn(
            &manager.config,
            &mut manager.global,
            &mut vault,
            market,
            debt,
            balance,
            token_unit,
        )?;
        Self::commit(&manager, manager_info, &vault, vault_info)?;

        invoke(
            &spl_token::instruction::burn(
                token_program.key,
                token_account_info.key,
                debt_mint_info.key,
                owner_info.key,
                &[],
                amount,
            )?,
            &[
                token_account_info.clone(),
                debt_mint_info.clone(),
                owner_info.clone(),
                token_program.clone(),
            ],
        )?;

        emit_all(&events);
        Ok(())
    }

    fn process_toggle_zero_liquidation(program_id: &Pubkey, accounts: &[AccountInfo], enable: bool) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let market = Self::load_market(program_id, &manager, price_feed_info)?;
        let mut vault = Self::load_vault(program_id, vault_info, owner_info.key)?;

        let events = if enable {
            ledger::enable_zero_liquidation(&manager.config, &mut manager.global, &mut vault, market)?
        } else {
            ledger::disable_zero_liquidation(&manager.config, &mut manager.global, &mut vault, market)?
        };
        Self::commit(&manager, manager_info, &vault, vault_info)?;

        emit_all(&events);
        Ok(())
    }

    fn process_liquidate(program_id: &Pubkey, accounts: &[AccountInfo], repay_amount: u64) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let liquidator_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let price_feed_info = next_account_info(account_info_iter)?;
        let debt_mint_info = next_account_info(account_info_iter)?;
        let token_account_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !liquidator_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let market = Self::load_market(program_id, &manager, price_feed_info)?;
        if vault_info.data_is_empty() {
            return Err(VaultError::AccountNotInitialized.into());
        }
        let target: Vault = Self::borsh_deserialize_unchecked(&vault_info.try_borrow_data()?)?;
        let mut vault = Self::load_vault(program_id, vault_info, &target.owner)?;

        let decimals = Self::debt_decimals(&manager, debt_mint_info, token_program)?;
        let token_balance =
            Self::check_token_account(token_account_info, &manager.debt_mint, liquidator_info.key)?;

        let outcome = liquidation::liquidate(
            &manager.config,
            &mut manager.global,
            &mut vault,
            market,
            *liquidator_info.key,
            to_wad(repay_amount as u128, decimals)?,
            to_wad(token_balance as u128, decimals)?,
        )?;
        let reward = u64::try_from(outcome.collateral_reward).map_err(|_| VaultError::ArithmeticOverflow)?;
        Self::commit(&manager, manager_info, &vault, vault_info)?;

        invoke(
            &spl_token::instruction::burn(
                token_program.key,
                token_account_info.key,
                debt_mint_info.key,
                liquidator_info.key,
                &[],
                repay_amount,
            )?,
            &[
                token_account_info.clone(),
                debt_mint_info.clone(),
                liquidator_info.clone(),
                token_program.clone(),
            ],
        )?;
        Self::transfer_lamports(vault_info, liquidator_info, reward)?;

        emit_all(&outcome.events);
        Ok(())
    }

    fn process_admin(program_id: &Pubkey, accounts: &[AccountInfo], instruction: VaultInstruction) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let manager_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut manager = Self::load_manager(program_id, manager_info)?;
        let caller = owner_info.key;
        let ManagerAccount { config, global, .. } = &mut manager;

        let events: Vec<VaultEvent> = match instruction {
            VaultInstruction::Pause => admin::pause(config, global, caller)?,
            VaultInstruction::Unpause => admin::unpause(config, global, caller)?,
            VaultInstruction::SetCollateralFloor { collateral_floor } => {
                admin::set_collateral_floor(config, caller, collateral_floor as u128)?
            }
            VaultInstruction::SetRatios {
                standard_ratio,
                zero_liquidation_ratio,
            } => admin::set_ratios(config, caller, standard_ratio, zero_liquidation_ratio)?,
            VaultInstruction::SetBonusPercent { bonus_percent } => {
                admin::set_bonus_percent(config, caller, bonus_percent)?
            }
            VaultInstruction::SetRatePerSecond { rate } => {
                admin::set_rate_per_second(config, global, caller, rate)?
            }
            VaultInstruction::SetRebalancingEnabled { enabled } => {
                admin::set_rebalancing_enabled(config, global, caller, enabled)?
            }
            VaultInstruction::SetRebalanceInterval { seconds } => {
                admin::set_rebalance_interval(config, caller, seconds)?
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        };
        Self::save(&manager, manager_info)?;

        emit_all(&events);
        Ok(())
    }

    // === Account helpers ===

    fn load_manager(program_id: &Pubkey, manager_info: &AccountInfo) -> Result<ManagerAccount, ProgramError> {
        if manager_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *manager_info.key != find_manager_address(program_id).0 {
            return Err(VaultError::InvalidPDA.into());
        }
        let manager: ManagerAccount = Self::borsh_deserialize_unchecked(&manager_info.try_borrow_data()?)?;
        manager.validate()?;
        Ok(manager)
    }

    fn load_price_feed(program_id: &Pubkey, feed_info: &AccountInfo) -> Result<PriceFeed, ProgramError> {
        if feed_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let feed: PriceFeed = Self::borsh_deserialize_unchecked(&feed_info.try_borrow_data()?)?;
        feed.validate()?;
        Ok(feed)
    }

    /// Current oracle price and clock for the bound feed
    fn load_market(
        program_id: &Pubkey,
        manager: &ManagerAccount,
        feed_info: &AccountInfo,
    ) -> Result<Market, ProgramError> {
        if *feed_info.key != manager.price_feed {
            return Err(VaultError::AccountMismatch.into());
        }
        let feed = Self::load_price_feed(program_id, feed_info)?;
        let now: UnixTimestamp = Clock::get()?.unix_timestamp;
        Ok(Market::new(feed.latest_price_wad()?, now))
    }

    fn load_vault(program_id: &Pubkey, vault_info: &AccountInfo, owner: &Pubkey) -> Result<Vault, ProgramError> {
        if vault_info.owner != program_id || vault_info.data_is_empty() {
            return Err(VaultError::AccountNotInitialized.into());
        }
        if *vault_info.key != find_vault_address(program_id, owner).0 {
            return Err(VaultError::InvalidPDA.into());
        }
        let vault: Vault = Self::borsh_deserialize_unchecked(&vault_info.try_borrow_data()?)?;
        vault.validate()?;
        if vault.owner != *owner {
            return Err(VaultError::AccountMismatch.into());
        }
        Ok(vault)
    }

    /// Decimals of the bound debt mint
    fn debt_decimals(
        manager: &ManagerAccount,
        debt_mint_info: &AccountInfo,
        token_program: &AccountInfo,
    ) -> Result<u8, ProgramError> {
        if *token_program.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }
        if *debt_mint_info.key != manager.debt_mint {
            return Err(VaultError::AccountMismatch.into());
        }
        Ok(Mint::unpack(&debt_mint_info.try_borrow_data()?)?.decimals)
    }

    /// Verifies mint and owner, returns the token balance
    fn check_token_account(
        token_account_info: &AccountInfo,
        debt_mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<u64, ProgramError> {
        let token_account = TokenAccount::unpack(&token_account_info.try_borrow_data()?)?;
        if token_account.mint != *debt_mint || token_account.owner != *owner {
            return Err(VaultError::AccountMismatch.into());
        }
        Ok(token_account.amount)
    }

    /// Write engine state back before any external call
    fn commit(
        manager: &ManagerAccount,
        manager_info: &AccountInfo,
        vault: &Vault,
        vault_info: &AccountInfo,
    ) -> ProgramResult {
        Self::save(manager, manager_info)?;
        Self::save(vault, vault_info)
    }

    /// Move collateral lamports out of a program-owned vault
    fn transfer_lamports(from: &AccountInfo, to: &AccountInfo, amount: u64) -> ProgramResult {
        let from_balance = from
            .lamports()
            .checked_sub(amount)
            .ok_or(VaultError::InsufficientVaultCollateral)?;
        let to_balance = to
            .lamports()
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        **from.try_borrow_mut_lamports()? = from_balance;
        **to.try_borrow_mut_lamports()? = to_balance;
        Ok(())
    }
}
