use clap::Parser;
use std::time::Duration;

use crate::infrastructure::solana_client::{SolanaClient, DEFAULT_READ_RETRIES};

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about,
    long_about = "Token dashboard backend: ledger aggregation and transfer submission over Solana RPC"
)]
pub struct AppConfig {
    /// RPC endpoint
    #[arg(short, long, env = "SOLANA_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_endpoint: String,

    /// Transport retries for read queries (writes are never retried)
    #[arg(short, long, env = "RPC_READ_RETRIES", default_value_t = DEFAULT_READ_RETRIES)]
    pub num_retries: usize,

    /// Seconds to wait for a submitted transaction to confirm
    #[arg(long, env = "CONFIRM_TIMEOUT_SECS", default_value_t = 30)]
    pub confirm_timeout_secs: u64,

    /// Listen port REST API
    #[arg(short, long, env = "LISTEN_PORT", default_value_t = 3000)]
    pub listen_port: u16,

    /// Mints shown on the market page
    #[arg(long, env = "LISTED_MINTS", value_delimiter = ',')]
    pub listed_mints: Vec<String>,

    /// Cluster name used in explorer links; empty for mainnet
    #[arg(long, env = "EXPLORER_CLUSTER", default_value = "devnet")]
    pub explorer_cluster: String,
}

impl AppConfig {
    /// Builds the one gateway handle the whole process shares.
    pub fn gateway(&self) -> SolanaClient {
        SolanaClient::from_url(&self.rpc_endpoint)
            .with_read_retries(self.num_retries)
            .with_confirm_timeout(Duration::from_secs(self.confirm_timeout_secs))
    }

    pub fn explorer_cluster(&self) -> Option<String> {
        let cluster = self.explorer_cluster.trim();
        (!cluster.is_empty()).then(|| cluster.to_string())
    }
}
