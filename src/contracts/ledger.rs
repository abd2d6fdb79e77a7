use async_trait::async_trait;
use ethers::types::{Address, TransactionReceipt, TxHash, U256};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::wallet::{format_amount, short_address};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Wrong network (chain id {actual}). Please switch to chain id {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("No signing account configured. Set PRIVATE_KEY to send transactions")]
    NoAccount,
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Transaction {0:?} reverted")]
    Reverted(TxHash),
    #[error("Transaction {0:?} was dropped before inclusion")]
    Dropped(TxHash),
    #[error("Provider error: {0}")]
    Provider(String),
}

/// Snapshot of one group as last observed on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub id: U256,
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub target: U256,
    pub raised: U256,
    /// Amount currently deposited in the lending pool.
    pub deposited: U256,
    /// Unix seconds
    pub target_date: u64,
    pub active: bool,
    pub goal_reached: bool,
    pub quorum: U256,
    pub participants: Vec<Address>,
}

/// Arguments of `crearGrupo`, in contract order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub name: String,
    pub target: U256,
    pub target_date: u64,
    pub description: String,
    pub quorum: U256,
    pub approvers: Vec<Address>,
}

/// A state-changing contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    CreateGroup(NewGroup),
    Contribute { group_id: U256, amount: U256 },
    AddParticipant { group_id: U256, participant: Address },
    RequestWithdrawal { group_id: U256, recipient: Address },
    ApproveWithdrawal { group_id: U256, request_id: U256 },
    ExecuteWithdrawal { group_id: U256, request_id: U256 },
}

impl LedgerCall {
    pub fn describe(&self) -> String {
        match self {
            LedgerCall::CreateGroup(group) => format!("create group '{}'", group.name),
            LedgerCall::Contribute { group_id, amount } => {
                format!("contribute {} ETH to group #{}", format_amount(*amount), group_id)
            }
            LedgerCall::AddParticipant { group_id, participant } => {
                format!("add {} to group #{}", short_address(participant), group_id)
            }
            LedgerCall::RequestWithdrawal { group_id, recipient } => {
                format!("request withdrawal from group #{} to {}", group_id, short_address(recipient))
            }
            LedgerCall::ApproveWithdrawal { group_id, request_id } => {
                format!("approve withdrawal #{} of group #{}", request_id, group_id)
            }
            LedgerCall::ExecuteWithdrawal { group_id, request_id } => {
                format!("execute withdrawal #{} of group #{}", request_id, group_id)
            }
        }
    }
}

/// Typed access to the savings-group contract.
#[async_trait]
pub trait GroupLedger: Send + Sync {
    /// Network every write must target.
    fn expected_chain_id(&self) -> u64;

    /// Signing account, if one is configured.
    fn account(&self) -> Option<Address>;

    /// Network the provider is currently connected to.
    async fn active_chain_id(&self) -> Result<u64, LedgerError>;

    async fn group(&self, group_id: U256) -> Result<GroupInfo, LedgerError>;

    async fn participants(&self, group_id: U256) -> Result<Vec<Address>, LedgerError>;

    async fn contribution(&self, group_id: U256, participant: Address) -> Result<U256, LedgerError>;

    async fn total_balance(&self, group_id: U256) -> Result<U256, LedgerError>;

    async fn groups_for_user(&self, user: Address) -> Result<Vec<U256>, LedgerError>;

    async fn total_groups(&self) -> Result<U256, LedgerError>;

    async fn native_balance(&self, address: Address) -> Result<U256, LedgerError>;

    /// Held from signing until broadcast so each write gets the next nonce.
    fn write_gate(&self) -> &Mutex<()>;

    /// Sign and broadcast. Returns once the node has accepted the transaction.
    async fn submit(&self, call: LedgerCall) -> Result<TxHash, LedgerError>;

    /// Wait until `tx` is included. Reverted or dropped transactions are errors.
    async fn await_confirmation(&self, tx: TxHash) -> Result<TransactionReceipt, LedgerError>;

    /// Fails with `WrongNetwork` unless the provider is on the expected chain.
    async fn ensure_network(&self) -> Result<(), LedgerError> {
        let expected = self.expected_chain_id();
        let actual = self.active_chain_id().await?;
        if actual != expected {
            return Err(LedgerError::WrongNetwork { expected, actual });
        }
        Ok(())
    }

    fn require_account(&self) -> Result<Address, LedgerError> {
        self.account().ok_or(LedgerError::NoAccount)
    }
}
