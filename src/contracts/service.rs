use std::sync::Arc;

use async_trait::async_trait;
use ethers::abi::Detokenize;
use ethers::contract::ContractCall;
use ethers::prelude::*;

use super::abi::GruposAhorro;
use super::config::ContractConfig;
use super::ledger::{GroupInfo, GroupLedger, LedgerCall, LedgerError};
use crate::wallet::Account;

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// `GroupLedger` backed by a JSON-RPC node.
pub struct ContractService {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
    account: Option<Address>,
    reader: GruposAhorro<Provider<Http>>,
    writer: Option<GruposAhorro<SignerClient>>,
    write_gate: tokio::sync::Mutex<()>,
}

impl ContractService {
    pub fn new(config: &ContractConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())?;
        let provider = Arc::new(provider);

        let reader = GruposAhorro::new(config.address, provider.clone());

        let (account, writer) = match config.private_key.as_deref() {
            Some(key) => {
                let account = Account::from_private_key(key)?;
                let client = SignerMiddleware::new(provider.as_ref().clone(), account.signer(config.chain_id));
                let writer = GruposAhorro::new(config.address, Arc::new(client));
                tracing::info!(account = %account.address_string(), "Signing account loaded");
                (Some(account.address()), Some(writer))
            }
            None => (None, None),
        };

        Ok(Self {
            provider,
            chain_id: config.chain_id,
            account,
            reader,
            writer,
            write_gate: tokio::sync::Mutex::new(()),
        })
    }

    fn writer(&self) -> Result<&GruposAhorro<SignerClient>, LedgerError> {
        self.writer.as_ref().ok_or(LedgerError::NoAccount)
    }
}

/// Best-effort human message for a failed call.
fn rejection<M: Middleware>(err: ContractError<M>) -> LedgerError {
    if let Some(reason) = err.decode_revert::<String>() {
        return LedgerError::Rejected(reason);
    }

    let message = err.to_string();
    if message.contains("insufficient funds") {
        LedgerError::Rejected("insufficient funds for value + gas".to_string())
    } else {
        LedgerError::Rejected(message)
    }
}

async fn send<D: Detokenize>(call: ContractCall<SignerClient, D>, description: &str) -> Result<TxHash, LedgerError> {
    let pending = call.send().await.map_err(|e| {
        tracing::warn!(call = %description, error = %e, "Contract call rejected");
        rejection(e)
    })?;
    Ok(*pending)
}

fn provider_error(err: impl std::fmt::Display) -> LedgerError {
    LedgerError::Provider(err.to_string())
}

#[async_trait]
impl GroupLedger for ContractService {
    fn expected_chain_id(&self) -> u64 {
        self.chain_id
    }

    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn active_chain_id(&self) -> Result<u64, LedgerError> {
        let chain_id = self.provider.get_chainid().await.map_err(provider_error)?;
        Ok(chain_id.as_u64())
    }

    async fn group(&self, group_id: U256) -> Result<GroupInfo, LedgerError> {
        let (id, creator, name, target, raised, deposited, target_date, description, active, goal_reached, quorum) =
            self.reader.obtener_grupo(group_id).call().await.map_err(rejection)?;
        let participants = self.participants(group_id).await?;

        Ok(GroupInfo {
            id,
            creator,
            name,
            description,
            target,
            raised,
            deposited,
            target_date: target_date.low_u64(),
            active,
            goal_reached,
            quorum,
            participants,
        })
    }

    async fn participants(&self, group_id: U256) -> Result<Vec<Address>, LedgerError> {
        self.reader.obtener_participantes(group_id).call().await.map_err(rejection)
    }

    async fn contribution(&self, group_id: U256, participant: Address) -> Result<U256, LedgerError> {
        self.reader
            .obtener_aporte(group_id, participant)
            .call()
            .await
            .map_err(rejection)
    }

    async fn total_balance(&self, group_id: U256) -> Result<U256, LedgerError> {
        self.reader.obtener_balance_total(group_id).call().await.map_err(rejection)
    }

    async fn groups_for_user(&self, user: Address) -> Result<Vec<U256>, LedgerError> {
        self.reader.obtener_grupos_por_usuario(user).call().await.map_err(rejection)
    }

    async fn total_groups(&self) -> Result<U256, LedgerError> {
        self.reader.total_grupos().call().await.map_err(rejection)
    }

    async fn native_balance(&self, address: Address) -> Result<U256, LedgerError> {
        self.provider.get_balance(address, None).await.map_err(provider_error)
    }

    fn write_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.write_gate
    }

    async fn submit(&self, call: LedgerCall) -> Result<TxHash, LedgerError> {
        let writer = self.writer()?;
        self.ensure_network().await?;

        let description = call.describe();
        let tx_hash = match call {
            LedgerCall::CreateGroup(group) => {
                let call = writer.crear_grupo(
                    group.name,
                    group.target,
                    U256::from(group.target_date),
                    group.description,
                    group.quorum,
                    group.approvers,
                );
                send(call, &description).await?
            }
            LedgerCall::Contribute { group_id, amount } => {
                send(writer.aportar(group_id).value(amount), &description).await?
            }
            LedgerCall::AddParticipant { group_id, participant } => {
                send(writer.agregar_participante(group_id, participant), &description).await?
            }
            LedgerCall::RequestWithdrawal { group_id, recipient } => {
                send(writer.solicitar_retiro(group_id, recipient), &description).await?
            }
            LedgerCall::ApproveWithdrawal { group_id, request_id } => {
                send(writer.aprobar_retiro(group_id, request_id), &description).await?
            }
            LedgerCall::ExecuteWithdrawal { group_id, request_id } => {
                send(writer.ejecutar_retiro(group_id, request_id), &description).await?
            }
        };

        tracing::info!(call = %description, tx = ?tx_hash, "Transaction submitted");
        Ok(tx_hash)
    }

    async fn await_confirmation(&self, tx: TxHash) -> Result<TransactionReceipt, LedgerError> {
        let receipt = PendingTransaction::new(tx, self.provider.as_ref())
            .await
            .map_err(provider_error)?
            .ok_or(LedgerError::Dropped(tx))?;

        if receipt.status != Some(U64::one()) {
            tracing::warn!(tx = ?tx, "Transaction reverted");
            return Err(LedgerError::Reverted(tx));
        }

        tracing::info!(tx = ?tx, block = ?receipt.block_number, "Transaction confirmed");
        Ok(receipt)
    }
}
