use solana_program::pubkey::Pubkey;

pub const MANAGER_SEED: &[u8] = b"manager";
pub const VAULT_SEED: &[u8] = b"vault";
pub const MINT_AUTHORITY_SEED: &[u8] = b"mint_authority";

/// Singleton manager account
pub fn find_manager_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MANAGER_SEED], program_id)
}

/// Per-owner vault; also holds the owner's collateral lamports
pub fn find_vault_address(program_id: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, owner.as_ref()], program_id)
}

/// Mint authority of the debt token
pub fn find_mint_authority_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[MINT_AUTHORITY_SEED], program_id)
}
