// Vault Manager: collateralized debt positions with dynamic interest
// Native Solana implementation - NO ANCHOR

pub mod assets;
pub mod engine;
pub mod error;
pub mod events;
pub mod instruction;
pub mod manager;
pub mod math;
pub mod oracle;
pub mod pda;
pub mod processor;
pub mod state;

pub use error::VaultError;
pub use manager::VaultManager;
pub use processor::process_instruction;

// Declare program ID
solana_program::declare_id!("VauLtMgr11111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);
