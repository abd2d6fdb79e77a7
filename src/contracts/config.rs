use std::env;

use ethers::types::Address;

use crate::config::ConfigError;
use crate::wallet::parse_address;

/// Arbitrum Sepolia
pub const DEFAULT_CHAIN_ID: u64 = 421614;
pub const DEFAULT_RPC_URL: &str = "https://sepolia-rollup.arbitrum.io/rpc";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x72f7a34bdbaff6228f5c4e25c0d7731ba5a46dec";

#[derive(Debug, Clone)]
pub struct ContractConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Without a key the client is read-only.
    pub private_key: Option<String>,
    pub address: Address,
}

impl ContractConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let chain_id = match env::var("CHAIN_ID") {
            Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid("CHAIN_ID"))?,
            Err(_) => DEFAULT_CHAIN_ID,
        };

        let address = env::var("CONTRACT_ADDRESS").unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.to_string());
        let address = parse_address(&address).ok_or(ConfigError::Invalid("CONTRACT_ADDRESS"))?;

        Ok(Self {
            chain_id,
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            private_key: env::var("PRIVATE_KEY").ok().filter(|key| !key.trim().is_empty()),
            address,
        })
    }
}
