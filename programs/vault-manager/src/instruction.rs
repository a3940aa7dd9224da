use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::pda::{find_manager_address, find_mint_authority_address, find_vault_address};

/// Collateral amounts are lamports; debt amounts are base units of the debt mint.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum VaultInstruction {
    /// Create the manager account
    /// Accounts:
    /// 0. `[signer, writable]` Owner (payer)
    /// 1. `[writable]` Manager PDA
    /// 2. `[]` Debt mint (mint authority must be the mint authority PDA)
    /// 3. `[]` Price feed
    /// 4. `[]` System program
    InitializeManager,

    /// Initialize a price feed account already allocated to this program
    /// Accounts:
    /// 0. `[signer]` Feed authority
    /// 1. `[writable]` Price feed
    InitializePriceFeed { answer: i128, decimals: u8 },

    /// Accounts:
    /// 0. `[signer]` Feed authority
    /// 1. `[writable]` Price feed
    UpdatePrice { answer: i128 },

    /// Lock lamports in the caller's vault, creating it on first use
    /// Accounts:
    /// 0. `[signer, writable]` Vault owner
    /// 1. `[writable]` Manager PDA
    /// 2. `[writable]` Vault PDA
    /// 3. `[]` Price feed
    /// 4. `[]` System program
    DepositCollateral { amount: u64 },

    /// Accounts:
    /// 0. `[signer, writable]` Vault owner
    /// 1. `[writable]` Manager PDA
    /// 2. `[writable]` Vault PDA
    /// 3. `[]` Price feed
    WithdrawCollateral { amount: u64 },

    /// Accounts:
    /// 0. `[signer]` Vault owner
    /// 1. `[writable]` Manager PDA
    /// 2. `[writable]` Vault PDA
    /// 3. `[]` Price feed
    /// 4. `[writable]` Debt mint
    /// 5. `[writable]` Owner's debt token account
    /// 6. `[]` Mint authority PDA
    /// 7. `[]` Token program
    Mint { amount: u64 },

    /// Accounts:
    /// 0. `[signer]` Vault owner
    /// 1. `[writable]` Manager PDA
    /// 2. `[writable]` Vault PDA
    /// 3. `[]` Price feed
    /// 4. `[writable]` Debt mint
    /// 5. `[writable]` Owner's debt token account
    /// 6. `[]` Token program
    Burn { amount: u64 },

    /// Accounts:
    /// 0. `[signer]` Vault owner
    /// 1. `[writable]` Manager PDA
    /// 2. `[writable]` Vault PDA
    /// 3. `[]` Price feed
    EnableZeroLiquidation,

    /// Same accounts as `EnableZeroLiquidation`
    DisableZeroLiquidation,

    /// Accounts:
    /// 0. `[signer, writable]` Liquidator
    /// 1. `[writable]` Manager PDA
    /// 2. `[writable]` Target vault PDA
    /// 3. `[]` Price feed
    /// 4. `[writable]` Debt mint
    /// 5. `[writable]` Liquidator's debt token account
    /// 6. `[]` Token program
    Liquidate { repay_amount: u64 },

    /// Owner-only. Accounts:
    /// 0. `[signer]` Owner
    /// 1. `[writable]` Manager PDA
    Pause,
    Unpause,
    SetCollateralFloor { collateral_floor: u64 },
    SetRatios { standard_ratio: u128, zero_liquidation_ratio: u128 },
    SetBonusPercent { bonus_percent: u128 },
    SetRatePerSecond { rate: u128 },
    SetRebalancingEnabled { enabled: bool },
    SetRebalanceInterval { seconds: i64 },
}

impl VaultInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn pack(&self) -> Vec<u8> {
        // serializing into a Vec cannot fail
        self.try_to_vec().unwrap_or_default()
    }
}

fn build(program_id: &Pubkey, instruction: &VaultInstruction, accounts: Vec<AccountMeta>) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts,
        data: instruction.pack(),
    }
}

/// Accounts shared by every vault operation
fn vault_accounts(program_id: &Pubkey, signer: &Pubkey, vault_owner: &Pubkey, price_feed: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new(*signer, true),
        AccountMeta::new(find_manager_address(program_id).0, false),
        AccountMeta::new(find_vault_address(program_id, vault_owner).0, false),
        AccountMeta::new_readonly(*price_feed, false),
    ]
}

pub fn initialize_manager(
    program_id: &Pubkey,
    owner: &Pubkey,
    debt_mint: &Pubkey,
    price_feed: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new(find_manager_address(program_id).0, false),
        AccountMeta::new_readonly(*debt_mint, false),
        AccountMeta::new_readonly(*price_feed, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];
    build(program_id, &VaultInstruction::InitializeManager, accounts)
}

pub fn initialize_price_feed(
    program_id: &Pubkey,
    authority: &Pubkey,
    price_feed: &Pubkey,
    answer: i128,
    decimals: u8,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*price_feed, false),
    ];
    build(
        program_id,
        &VaultInstruction::InitializePriceFeed { answer, decimals },
        accounts,
    )
}

pub fn update_price(program_id: &Pubkey, authority: &Pubkey, price_feed: &Pubkey, answer: i128) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*price_feed, false),
    ];
    build(program_id, &VaultInstruction::UpdatePrice { answer }, accounts)
}

pub fn deposit_collateral(program_id: &Pubkey, owner: &Pubkey, price_feed: &Pubkey, amount: u64) -> Instruction {
    let mut accounts = vault_accounts(program_id, owner, owner, price_feed);
    accounts.push(AccountMeta::new_readonly(system_program::id(), false));
    build(program_id, &VaultInstruction::DepositCollateral { amount }, accounts)
}

pub fn withdraw_collateral(program_id: &Pubkey, owner: &Pubkey, price_feed: &Pubkey, amount: u64) -> Instruction {
    let accounts = vault_accounts(program_id, owner, owner, price_feed);
    build(program_id, &VaultInstruction::WithdrawCollateral { amount }, accounts)
}

pub fn mint(
    program_id: &Pubkey,
    owner: &Pubkey,
    price_feed: &Pubkey,
    debt_mint: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
) -> Instruction {
    let mut accounts = vault_accounts(program_id, owner, owner, price_feed);
    accounts.extend([
        AccountMeta::new(*debt_mint, false),
        AccountMeta::new(*owner_token_account, false),
        AccountMeta::new_readonly(find_mint_authority_address(program_id).0, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ]);
    build(program_id, &VaultInstruction::Mint { amount }, accounts)
}

pub fn burn(
    program_id: &Pubkey,
    owner: &Pubkey,
    price_feed: &Pubkey,
    debt_mint: &Pubkey,
    owner_token_account: &Pubkey,
    amount: u64,
) -> Instruction {
    let mut accounts = vault_accounts(program_id, owner, owner, price_feed);
    accounts.extend([
        AccountMeta::new(*debt_mint, false),
        AccountMeta::new(*owner_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ]);
    build(program_id, &VaultInstruction::Burn { amount }, accounts)
}

pub fn enable_zero_liquidation(program_id: &Pubkey, owner: &Pubkey, price_feed: &Pubkey) -> Instruction {
    let accounts = vault_accounts(program_id, owner, owner, price_feed);
    build(program_id, &VaultInstruction::EnableZeroLiquidation, accounts)
}

pub fn disable_zero_liquidation(program_id: &Pubkey, owner: &Pubkey, price_feed: &Pubkey) -> Instruction {
    let accounts = vault_accounts(program_id, owner, owner, price_feed);
    build(program_id, &VaultInstruction::DisableZeroLiquidation, accounts)
}

pub fn liquidate(
    program_id: &Pubkey,
    liquidator: &Pubkey,
    vault_owner: &Pubkey,
    price_feed: &Pubkey,
    debt_mint: &Pubkey,
    liquidator_token_account: &Pubkey,
    repay_amount: u64,
) -> Instruction {
    let mut accounts = vault_accounts(program_id, liquidator, vault_owner, price_feed);
    accounts.extend([
        AccountMeta::new(*debt_mint, false),
        AccountMeta::new(*liquidator_token_account, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ]);
    build(program_id, &VaultInstruction::Liquidate { repay_amount }, accounts)
}

/// Any owner-only instruction (`Pause`, `Unpause`, the setters)
pub fn admin(program_id: &Pubkey, owner: &Pubkey, instruction: VaultInstruction) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*owner, true),
        AccountMeta::new(find_manager_address(program_id).0, false),
    ];
    build(program_id, &instruction, accounts)
}
