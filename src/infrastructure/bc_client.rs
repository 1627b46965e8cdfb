use crate::domain::errors::GatewayError;
use crate::domain::models::{HoldingAccount, HoldingFilter, MintDescriptor, SignatureRecord};
use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature};
use std::{str::FromStr, sync::Arc};

/// A trait representing the RPC gateway to one ledger node.
///
/// Implementations hold no per-call state and never cache: every call reflects the node at the
/// time it is made.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BcClient {
    /// Retrieves the mint at `mint`.
    ///
    /// # Returns
    ///
    /// * `Result<MintDescriptor, GatewayError>` - `NotFound` if no account exists at the address.
    ///   Unparseable mint state degrades to the fallback decimals instead of failing.
    async fn get_mint_descriptor(&self, mint: &Pubkey) -> Result<MintDescriptor, GatewayError>;

    /// Lists holding accounts, either all holders of a mint or all holdings of a wallet.
    async fn list_holding_accounts(
        &self,
        filter: HoldingFilter,
    ) -> Result<Vec<HoldingAccount>, GatewayError>;

    /// Retrieves up to `limit` confirmed signatures referencing `address`, newest first.
    async fn list_recent_signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, GatewayError>;

    /// Retrieves a fresh blockhash for a transaction about to be signed.
    async fn get_latest_blockhash(&self) -> Result<Hash, GatewayError>;

    /// Tells whether any account exists at `address`.
    async fn account_exists(&self, address: &Pubkey) -> Result<bool, GatewayError>;

    /// Retrieves the native balance of `owner` in lamports.
    async fn get_sol_balance(&self, owner: &Pubkey) -> Result<u64, GatewayError>;

    /// Submits a serialized, signed transaction. Never retried.
    async fn submit_signed_transaction(&self, bytes: Vec<u8>) -> Result<Signature, GatewayError>;

    /// Waits until `signature` is confirmed, failing with `ConfirmationTimeout` after the
    /// configured bound.
    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), GatewayError>;

    /// Asks the test-network faucet for `lamports`. The faucet enforces its own ceiling.
    async fn request_airdrop(&self, address: &Pubkey, lamports: u64)
        -> Result<Signature, GatewayError>;
}

/// Lets one gateway handle be shared by every component of the application.
#[async_trait::async_trait]
impl<T> BcClient for Arc<T>
where
    T: BcClient + Send + Sync + ?Sized,
{
    async fn get_mint_descriptor(&self, mint: &Pubkey) -> Result<MintDescriptor, GatewayError> {
        (**self).get_mint_descriptor(mint).await
    }

    async fn list_holding_accounts(
        &self,
        filter: HoldingFilter,
    ) -> Result<Vec<HoldingAccount>, GatewayError> {
        (**self).list_holding_accounts(filter).await
    }

    async fn list_recent_signatures(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureRecord>, GatewayError> {
        (**self).list_recent_signatures(address, limit).await
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, GatewayError> {
        (**self).get_latest_blockhash().await
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, GatewayError> {
        (**self).account_exists(address).await
    }

    async fn get_sol_balance(&self, owner: &Pubkey) -> Result<u64, GatewayError> {
        (**self).get_sol_balance(owner).await
    }

    async fn submit_signed_transaction(&self, bytes: Vec<u8>) -> Result<Signature, GatewayError> {
        (**self).submit_signed_transaction(bytes).await
    }

    async fn confirm_transaction(&self, signature: &Signature) -> Result<(), GatewayError> {
        (**self).confirm_transaction(signature).await
    }

    async fn request_airdrop(
        &self,
        address: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, GatewayError> {
        (**self).request_airdrop(address, lamports).await
    }
}

/// Parses a base58 address, rejecting malformed input before it reaches the network.
pub fn parse_address(text: &str) -> Result<Pubkey, GatewayError> {
    Pubkey::from_str(text.trim()).map_err(|e| GatewayError::InvalidAddress(format!("{text}: {e}")))
}
