use ethers::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
}

/// Local signing account used for every write against the contract.
#[derive(Debug, Clone)]
pub struct Account {
    wallet: LocalWallet,
}

impl Account {
    /// Load an account from a hex private key, with or without `0x`.
    pub fn from_private_key(key: &str) -> Result<Self, AccountError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let wallet = key
            .parse::<LocalWallet>()
            .map_err(|e| AccountError::InvalidKey(e.to_string()))?;

        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Checksummed address
    pub fn address_string(&self) -> String {
        ethers::utils::to_checksum(&self.wallet.address(), None)
    }

    /// Signer bound to `chain_id` (EIP-155 replay protection).
    pub fn signer(&self, chain_id: u64) -> LocalWallet {
        self.wallet.clone().with_chain_id(chain_id)
    }
}
