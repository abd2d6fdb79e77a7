//! In-memory ledger for tests. Confirmations apply the call's effect and
//! return receipts whose logs are ABI-encoded the way the contract emits them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ethers::abi::{self, Token};
use ethers::contract::EthEvent;
use ethers::types::{Address, Bytes, Log, TransactionReceipt, TxHash, H256, U256, U64};

use super::abi::{
    AporteRealizadoFilter, AprobacionAgregadaFilter, GrupoCreadoFilter, MetaAlcanzadaFilter,
    ParticipanteAgregadoFilter, RetiroEjecutadoFilter, SolicitudRetiroCreadaFilter,
};
use super::ledger::{GroupInfo, GroupLedger, LedgerCall, LedgerError};

pub const TEST_CHAIN_ID: u64 = 421614;

pub fn creator() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn invitee(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn topic_u256(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256(bytes)
}

fn topic_address(address: Address) -> H256 {
    let mut bytes = [0u8; 32];
    bytes[12..].copy_from_slice(address.as_bytes());
    H256(bytes)
}

fn event_log(signature: H256, indexed: Vec<H256>, data: Vec<Token>) -> Log {
    let mut topics = vec![signature];
    topics.extend(indexed);
    Log {
        address: Address::repeat_byte(0x72),
        topics,
        data: Bytes::from(abi::encode(&data)),
        ..Default::default()
    }
}

pub fn grupo_creado_log(group_id: U256, creator: Address, name: &str) -> Log {
    event_log(
        GrupoCreadoFilter::signature(),
        vec![topic_u256(group_id), topic_address(creator)],
        vec![
            Token::String(name.to_string()),
            Token::Uint(U256::from(100)),
            Token::Uint(U256::from(1_767_139_200u64)),
            Token::Uint(U256::one()),
        ],
    )
}

pub fn aporte_realizado_log(group_id: U256, participant: Address, amount: U256) -> Log {
    event_log(
        AporteRealizadoFilter::signature(),
        vec![topic_u256(group_id), topic_address(participant)],
        vec![Token::Uint(amount), Token::Uint(amount), Token::Uint(amount)],
    )
}

/// Transfer event from some unrelated token contract.
pub fn foreign_log() -> Log {
    Log {
        address: Address::repeat_byte(0xee),
        topics: vec![
            H256::repeat_byte(0xdd),
            topic_address(Address::repeat_byte(0x01)),
            topic_address(Address::repeat_byte(0x02)),
        ],
        data: Bytes::from(abi::encode(&[Token::Uint(U256::from(5))])),
        ..Default::default()
    }
}

pub fn receipt_with_logs(logs: Vec<Log>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: H256::repeat_byte(0xaa),
        status: Some(U64::one()),
        logs,
        ..Default::default()
    }
}

pub fn sample_group(id: u64) -> GroupInfo {
    GroupInfo {
        id: U256::from(id),
        creator: creator(),
        name: "Viaje Familiar".to_string(),
        description: "Viaje".to_string(),
        target: ethers::utils::parse_ether("10").unwrap(),
        raised: ethers::utils::parse_ether("4").unwrap(),
        deposited: ethers::utils::parse_ether("4").unwrap(),
        target_date: 1_767_139_200,
        active: true,
        goal_reached: false,
        quorum: U256::one(),
        participants: vec![creator()],
    }
}

#[derive(Default)]
struct MockState {
    next_group_id: U256,
    next_request_id: U256,
    nonce: u64,
    groups: HashMap<U256, GroupInfo>,
    balances: HashMap<U256, U256>,
    contributions: HashMap<(U256, Address), U256>,
    submitted: Vec<LedgerCall>,
    pending: HashMap<TxHash, LedgerCall>,
    revert_participant: Option<Address>,
    reject_all: Option<String>,
    omit_group_event: bool,
}

pub struct MockLedger {
    expected_chain_id: u64,
    active_chain_id: u64,
    account: Option<Address>,
    state: Mutex<MockState>,
    write_gate: tokio::sync::Mutex<()>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            expected_chain_id: TEST_CHAIN_ID,
            active_chain_id: TEST_CHAIN_ID,
            account: Some(creator()),
            state: Mutex::new(MockState {
                next_group_id: U256::one(),
                next_request_id: U256::one(),
                ..Default::default()
            }),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn without_account(mut self) -> Self {
        self.account = None;
        self
    }

    pub fn with_account(mut self, account: Address) -> Self {
        self.account = Some(account);
        self
    }

    pub fn on_chain(mut self, chain_id: u64) -> Self {
        self.active_chain_id = chain_id;
        self
    }

    pub fn next_group_id(self, id: u64) -> Self {
        self.state.lock().unwrap().next_group_id = U256::from(id);
        self
    }

    /// Enrolling `participant` will revert on chain.
    pub fn revert_participant(self, participant: Address) -> Self {
        self.state.lock().unwrap().revert_participant = Some(participant);
        self
    }

    /// Every submit fails with `Rejected(reason)`.
    pub fn reject_all(self, reason: &str) -> Self {
        self.state.lock().unwrap().reject_all = Some(reason.to_string());
        self
    }

    /// Creation receipts come back without a `GrupoCreado` log.
    pub fn omit_group_event(self) -> Self {
        self.state.lock().unwrap().omit_group_event = true;
        self
    }

    pub fn with_group(self, group: GroupInfo, balance: U256) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.balances.insert(group.id, balance);
            state.groups.insert(group.id, group);
        }
        self
    }

    pub fn submitted(&self) -> Vec<LedgerCall> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn snapshot(&self, group_id: u64) -> Option<GroupInfo> {
        self.state.lock().unwrap().groups.get(&U256::from(group_id)).cloned()
    }

    fn confirm(&self, state: &mut MockState, tx: TxHash, call: LedgerCall) -> Result<Vec<Log>, LedgerError> {
        let sender = self.account.unwrap_or_default();
        let mut logs = vec![foreign_log()];

        match call {
            LedgerCall::CreateGroup(new_group) => {
                let id = state.next_group_id;
                state.next_group_id = id + U256::one();
                state.groups.insert(
                    id,
                    GroupInfo {
                        id,
                        creator: sender,
                        name: new_group.name.clone(),
                        description: new_group.description,
                        target: new_group.target,
                        raised: U256::zero(),
                        deposited: U256::zero(),
                        target_date: new_group.target_date,
                        active: true,
                        goal_reached: false,
                        quorum: new_group.quorum,
                        participants: vec![sender],
                    },
                );
                if !state.omit_group_event {
                    logs.push(grupo_creado_log(id, sender, &new_group.name));
                }
            }
            LedgerCall::Contribute { group_id, amount } => {
                let group = state
                    .groups
                    .get_mut(&group_id)
                    .ok_or(LedgerError::Reverted(tx))?;
                group.raised += amount;
                group.deposited += amount;
                let raised = group.raised;
                let reached = !group.goal_reached && group.raised >= group.target;
                if reached {
                    group.goal_reached = true;
                }
                *state.balances.entry(group_id).or_default() += amount;
                *state.contributions.entry((group_id, sender)).or_default() += amount;
                logs.push(event_log(
                    AporteRealizadoFilter::signature(),
                    vec![topic_u256(group_id), topic_address(sender)],
                    vec![Token::Uint(amount), Token::Uint(raised), Token::Uint(raised)],
                ));
                if reached {
                    logs.push(event_log(
                        MetaAlcanzadaFilter::signature(),
                        vec![topic_u256(group_id)],
                        vec![Token::Uint(raised)],
                    ));
                }
            }
            LedgerCall::AddParticipant { group_id, participant } => {
                if state.revert_participant == Some(participant) {
                    return Err(LedgerError::Reverted(tx));
                }
                let group = state
                    .groups
                    .get_mut(&group_id)
                    .ok_or(LedgerError::Reverted(tx))?;
                group.participants.push(participant);
                logs.push(event_log(
                    ParticipanteAgregadoFilter::signature(),
                    vec![topic_u256(group_id), topic_address(participant)],
                    vec![],
                ));
            }
            LedgerCall::RequestWithdrawal { group_id, recipient } => {
                let request_id = state.next_request_id;
                state.next_request_id = request_id + U256::one();
                let amount = state.balances.get(&group_id).copied().unwrap_or_default();
                logs.push(event_log(
                    SolicitudRetiroCreadaFilter::signature(),
                    vec![topic_u256(request_id), topic_u256(group_id), topic_address(sender)],
                    vec![Token::Address(recipient), Token::Uint(amount)],
                ));
            }
            LedgerCall::ApproveWithdrawal { group_id, request_id } => {
                let quorum = state.groups.get(&group_id).map(|g| g.quorum).unwrap_or_default();
                logs.push(event_log(
                    AprobacionAgregadaFilter::signature(),
                    vec![topic_u256(request_id), topic_u256(group_id), topic_address(sender)],
                    vec![Token::Uint(U256::one()), Token::Uint(quorum)],
                ));
            }
            LedgerCall::ExecuteWithdrawal { group_id, request_id } => {
                let balance = state.balances.get(&group_id).copied().unwrap_or_default();
                let group = state
                    .groups
                    .get_mut(&group_id)
                    .ok_or(LedgerError::Reverted(tx))?;
                let interest = balance.saturating_sub(group.raised);
                group.active = false;
                logs.push(event_log(
                    RetiroEjecutadoFilter::signature(),
                    vec![topic_u256(request_id), topic_u256(group_id), topic_address(sender)],
                    vec![Token::Uint(balance), Token::Uint(interest)],
                ));
            }
        }
        Ok(logs)
    }
}

#[async_trait]
impl GroupLedger for MockLedger {
    fn expected_chain_id(&self) -> u64 {
        self.expected_chain_id
    }

    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn active_chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.active_chain_id)
    }

    async fn group(&self, group_id: U256) -> Result<GroupInfo, LedgerError> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| LedgerError::Rejected("execution reverted: Grupo no existe".to_string()))
    }

    async fn participants(&self, group_id: U256) -> Result<Vec<Address>, LedgerError> {
        Ok(self.group(group_id).await?.participants)
    }

    async fn contribution(&self, group_id: U256, participant: Address) -> Result<U256, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.contributions.get(&(group_id, participant)).copied().unwrap_or_default())
    }

    async fn total_balance(&self, group_id: U256) -> Result<U256, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.balances.get(&group_id).copied().unwrap_or_default())
    }

    async fn groups_for_user(&self, user: Address) -> Result<Vec<U256>, LedgerError> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<U256> = state
            .groups
            .values()
            .filter(|g| g.creator == user || g.participants.contains(&user))
            .map(|g| g.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn total_groups(&self) -> Result<U256, LedgerError> {
        Ok(U256::from(self.state.lock().unwrap().groups.len()))
    }

    async fn native_balance(&self, _address: Address) -> Result<U256, LedgerError> {
        Ok(ethers::utils::parse_ether("2").unwrap())
    }

    fn write_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.write_gate
    }

    /// Reads the pending nonce, then broadcasts after a yield. A write that
    /// lands in between makes this one fail the way a node would.
    async fn submit(&self, call: LedgerCall) -> Result<TxHash, LedgerError> {
        self.require_account()?;
        self.ensure_network().await?;

        let pending_nonce = self.state.lock().unwrap().nonce;
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.reject_all {
            return Err(LedgerError::Rejected(reason.clone()));
        }
        if state.nonce != pending_nonce {
            return Err(LedgerError::Rejected("nonce too low".to_string()));
        }
        state.nonce += 1;
        let tx = H256::from_low_u64_be(state.nonce);
        state.submitted.push(call.clone());
        state.pending.insert(tx, call);
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: TxHash) -> Result<TransactionReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let call = state.pending.remove(&tx).ok_or(LedgerError::Dropped(tx))?;
        let logs = self.confirm(&mut state, tx, call)?;
        Ok(TransactionReceipt {
            transaction_hash: tx,
            status: Some(U64::one()),
            logs,
            ..Default::default()
        })
    }
}
