pub mod bc_client;
pub mod parsed_account;
pub mod shutdown;
pub mod solana_client;
