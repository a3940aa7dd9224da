pub mod config;
pub mod global_state;
pub mod manager_account;
pub mod vault;

pub use config::*;
pub use global_state::*;
pub use manager_account::*;
pub use vault::*;
