use std::sync::Arc;
use std::time::Duration;

use ethers::types::U256;

use super::view::{GroupSummary, SavingsPlan};
use crate::contracts::abi::{
    AporteRealizadoFilter, AprobacionAgregadaFilter, MetaAlcanzadaFilter, ParticipanteAgregadoFilter,
    RetiroEjecutadoFilter, SolicitudRetiroCreadaFilter,
};
use crate::contracts::{decode_event, GroupLedger, LedgerCall, LedgerError};
use crate::wallet::{format_amount, parse_address, parse_amount, short_address};
use crate::workflow::validation::parse_group_id;
use crate::workflow::{transact, EnrollmentWorkflow, GroupDraft, Notifier, WorkflowError};

const CREATE_USAGE: &str = "Usage: CREATE <name> | <target ETH> | <YYYY-MM-DD> | [0xabc..., 0xdef...] | [purpose]\nExample: CREATE Viaje | 1.5 | 2026-12-31 | 0x12...";

/// Parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show help/available commands
    Help,
    /// Account, network and native balance
    Wallet,
    /// Groups of the current account
    Groups,
    /// One group card
    Group { group_id: U256 },
    /// Create a group and enroll its participants
    Create(GroupDraft),
    /// Savings plan preview for a target amount
    Plan { target: String },
    /// Contribute ETH: CONTRIBUTE <id> <amount>
    Contribute { group_id: U256, amount: String },
    /// Add a participant: ADD <id> [address]
    Add { group_id: U256, participant: Option<String> },
    /// Request a withdrawal: WITHDRAW <id> <recipient>
    Withdraw { group_id: U256, recipient: String },
    /// Approve a withdrawal request: APPROVE <id> <request>
    Approve { group_id: U256, request_id: U256 },
    /// Execute an approved withdrawal: EXECUTE <id> <request>
    Execute { group_id: U256, request_id: U256 },
    /// Number of groups in the contract
    Total,
    /// Refresh a group card periodically: WATCH <id> [seconds]
    Watch { group_id: U256, interval_secs: Option<u64> },
    /// Unknown command
    Unknown(String),
}

/// Command processor that parses and executes commands
#[derive(Clone)]
pub struct CommandProcessor {
    ledger: Arc<dyn GroupLedger>,
    notifier: Notifier,
    watch_interval: Duration,
}

impl CommandProcessor {
    pub fn new(ledger: Arc<dyn GroupLedger>, notifier: Notifier, watch_interval: Duration) -> Self {
        Self {
            ledger,
            notifier,
            watch_interval,
        }
    }

    /// Process one input line and return the response
    pub async fn process(&self, body: &str) -> String {
        let command = self.parse(body);

        tracing::debug!(command = ?command, "Processing command");

        self.execute(command).await
    }

    /// Parse input text into a structured command
    pub fn parse(&self, text: &str) -> Command {
        let original = text.trim();
        let (keyword, rest) = match original.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (original, ""),
        };
        let parts: Vec<&str> = rest.split_whitespace().collect();

        if keyword.is_empty() {
            return Command::Unknown("".to_string());
        }

        match keyword.to_uppercase().as_str() {
            "HELP" | "MENU" | "?" => Command::Help,
            "WALLET" | "STATUS" => Command::Wallet,
            "GROUPS" | "LIST" => Command::Groups,
            "GROUP" | "INFO" => match parts.first().map(|id| parse_group_id(id)) {
                Some(Ok(group_id)) => Command::Group { group_id },
                Some(Err(e)) => Command::Unknown(e.to_string()),
                None => Command::Unknown("Usage: GROUP <id>".to_string()),
            },
            "CREATE" | "NEW" => self.parse_create(rest),
            "PLAN" => match parts.first() {
                Some(target) => Command::Plan { target: target.to_string() },
                None => Command::Unknown("Usage: PLAN <target ETH>".to_string()),
            },
            "CONTRIBUTE" | "APORTAR" | "DEPOSIT" => self.parse_contribute(&parts),
            "ADD" | "JOIN" => self.parse_add(&parts),
            "WITHDRAW" => self.parse_withdraw(&parts),
            "APPROVE" => match self.parse_request(&parts, "APPROVE") {
                Ok((group_id, request_id)) => Command::Approve { group_id, request_id },
                Err(usage) => usage,
            },
            "EXECUTE" => match self.parse_request(&parts, "EXECUTE") {
                Ok((group_id, request_id)) => Command::Execute { group_id, request_id },
                Err(usage) => usage,
            },
            "TOTAL" => Command::Total,
            "WATCH" => self.parse_watch(&parts),
            _ => Command::Unknown(original.to_string()),
        }
    }

    /// Parse CREATE: fields are separated by `|` so names may contain spaces
    fn parse_create(&self, rest: &str) -> Command {
        let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
        if fields.len() < 3 {
            return Command::Unknown(CREATE_USAGE.to_string());
        }

        Command::Create(GroupDraft {
            name: fields[0].to_string(),
            target: fields[1].to_string(),
            target_date: fields[2].to_string(),
            participants: fields.get(3).map(|p| p.to_string()).unwrap_or_default(),
            purpose: fields.get(4).map(|p| p.to_string()).filter(|p| !p.is_empty()),
        })
    }

    /// Parse CONTRIBUTE <id> <amount>
    fn parse_contribute(&self, parts: &[&str]) -> Command {
        if parts.len() < 2 {
            return Command::Unknown("Usage: CONTRIBUTE <id> <amount ETH>\nExample: CONTRIBUTE 3 0.01".to_string());
        }
        match parse_group_id(parts[0]) {
            Ok(group_id) => Command::Contribute {
                group_id,
                amount: parts[1].to_string(),
            },
            Err(e) => Command::Unknown(e.to_string()),
        }
    }

    /// Parse ADD <id> [address]
    fn parse_add(&self, parts: &[&str]) -> Command {
        let Some(id) = parts.first() else {
            return Command::Unknown("Usage: ADD <id> [address]".to_string());
        };
        match parse_group_id(id) {
            Ok(group_id) => Command::Add {
                group_id,
                participant: parts.get(1).map(|p| p.to_string()),
            },
            Err(e) => Command::Unknown(e.to_string()),
        }
    }

    /// Parse WITHDRAW <id> <recipient>
    fn parse_withdraw(&self, parts: &[&str]) -> Command {
        if parts.len() < 2 {
            return Command::Unknown("Usage: WITHDRAW <id> <recipient address>".to_string());
        }
        match parse_group_id(parts[0]) {
            Ok(group_id) => Command::Withdraw {
                group_id,
                recipient: parts[1].to_string(),
            },
            Err(e) => Command::Unknown(e.to_string()),
        }
    }

    /// Parse `<id> <request>` for APPROVE and EXECUTE
    fn parse_request(&self, parts: &[&str], keyword: &str) -> Result<(U256, U256), Command> {
        if parts.len() < 2 {
            return Err(Command::Unknown(format!("Usage: {} <id> <request id>", keyword)));
        }
        let group_id = parse_group_id(parts[0]).map_err(|e| Command::Unknown(e.to_string()))?;
        let request_id = parse_group_id(parts[1])
            .map_err(|_| Command::Unknown(format!("Invalid request id '{}'", parts[1])))?;
        Ok((group_id, request_id))
    }

    /// Parse WATCH <id> [seconds]
    fn parse_watch(&self, parts: &[&str]) -> Command {
        let Some(id) = parts.first() else {
            return Command::Unknown("Usage: WATCH <id> [seconds]".to_string());
        };
        let group_id = match parse_group_id(id) {
            Ok(group_id) => group_id,
            Err(e) => return Command::Unknown(e.to_string()),
        };
        let interval_secs = match parts.get(1).map(|s| s.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Some(secs),
            Some(_) => return Command::Unknown("Interval must be a positive number of seconds".to_string()),
            None => None,
        };
        Command::Watch { group_id, interval_secs }
    }

    /// Execute a parsed command and return the response text
    pub async fn execute(&self, command: Command) -> String {
        match command {
            Command::Help => self.help_response(),
            Command::Wallet => self.wallet_response().await,
            Command::Groups => self.groups_response().await,
            Command::Group { group_id } | Command::Watch { group_id, .. } => self.group_response(group_id).await,
            Command::Create(draft) => self.create_response(draft).await,
            Command::Plan { target } => self.plan_response(&target),
            Command::Contribute { group_id, amount } => self.contribute_response(group_id, &amount).await,
            Command::Add { group_id, participant } => self.add_response(group_id, participant).await,
            Command::Withdraw { group_id, recipient } => self.withdraw_response(group_id, &recipient).await,
            Command::Approve { group_id, request_id } => self.approve_response(group_id, request_id).await,
            Command::Execute { group_id, request_id } => self.execute_response(group_id, request_id).await,
            Command::Total => self.total_response().await,
            Command::Unknown(text) => self.unknown_response(&text),
        }
    }

    /// Period for WATCH, falling back to the configured default
    pub fn watch_interval(&self, requested_secs: Option<u64>) -> Duration {
        requested_secs.map(Duration::from_secs).unwrap_or(self.watch_interval)
    }

    /// Snapshot plus balances for one group card
    pub async fn summary(&self, group_id: U256) -> Result<GroupSummary, LedgerError> {
        let group = self.ledger.group(group_id).await?;
        let balance = self.ledger.total_balance(group_id).await?;
        let viewer = self.ledger.account();
        let own_contribution = match viewer {
            Some(account) => Some(self.ledger.contribution(group_id, account).await?),
            None => None,
        };

        Ok(GroupSummary {
            group,
            balance,
            own_contribution,
            viewer,
        })
    }

    fn help_response(&self) -> String {
        [
            "Savings group commands:",
            "WALLET - Account and network",
            "GROUPS - Your groups",
            "GROUP <id> - Group details",
            "CREATE <name> | <target> | <YYYY-MM-DD> | [addresses] | [purpose]",
            "PLAN <target> - Savings plan preview",
            "CONTRIBUTE <id> <amount> - Add funds",
            "ADD <id> [address] - Add a participant (creator only)",
            "WITHDRAW <id> <recipient> - Request a withdrawal",
            "APPROVE <id> <request> - Approve a withdrawal",
            "EXECUTE <id> <request> - Execute an approved withdrawal",
            "TOTAL - Number of groups",
            "WATCH <id> [seconds] - Refresh a group until the next input",
            "HELP - Show this help",
            "EXIT - Quit",
        ]
        .join("\n")
    }

    async fn wallet_response(&self) -> String {
        let expected = self.ledger.expected_chain_id();
        let network = match self.ledger.active_chain_id().await {
            Ok(actual) if actual == expected => format!("Network: chain id {} ✓", actual),
            Ok(actual) => format!("⚠️ Connected to chain id {}. Please switch to chain id {}", actual, expected),
            Err(e) => {
                tracing::error!("Failed to read chain id: {}", e);
                "Network: unreachable".to_string()
            }
        };

        let Some(account) = self.ledger.account() else {
            return format!("No account configured (read-only).\nSet PRIVATE_KEY to send transactions.\n{}", network);
        };

        let balance = match self.ledger.native_balance(account).await {
            Ok(balance) => format!("{} ETH", format_amount(balance)),
            Err(e) => {
                tracing::error!("Failed to read balance: {}", e);
                "unavailable".to_string()
            }
        };

        format!(
            "Account: {}\nBalance: {}\n{}",
            ethers::utils::to_checksum(&account, None),
            balance,
            network
        )
    }

    async fn groups_response(&self) -> String {
        let Some(account) = self.ledger.account() else {
            return format!("❌ {}", LedgerError::NoAccount);
        };

        let ids = match self.ledger.groups_for_user(account).await {
            Ok(ids) => ids,
            Err(e) => return format!("❌ Error loading groups: {}", e),
        };

        if ids.is_empty() {
            return "You have no groups yet.\nReply CREATE to create your first group, or HELP for usage.".to_string();
        }

        let now = now();
        let mut cards = Vec::with_capacity(ids.len());
        for id in ids {
            match self.summary(id).await {
                Ok(summary) => cards.push(summary.render(now)),
                Err(e) => cards.push(format!("Group #{}: unavailable ({})", id, e)),
            }
        }
        cards.join("\n\n")
    }

    async fn group_response(&self, group_id: U256) -> String {
        match self.summary(group_id).await {
            Ok(summary) => summary.render(now()),
            Err(e) => format!("❌ Error loading group #{}: {}", group_id, e),
        }
    }

    async fn create_response(&self, draft: GroupDraft) -> String {
        let mut workflow = EnrollmentWorkflow::new(self.ledger.clone(), self.notifier.clone());

        match workflow.run(draft).await {
            Ok(enrollment) => format!("{}\n\nReply GROUP {} to see it.", enrollment, enrollment.group_id),
            Err(WorkflowError::Enrollment {
                group_id,
                participant,
                enrolled,
                source,
            }) => format!(
                "❌ Error adding participant {:?}: {}\nGroup #{} was created with {} of its participants added.\nReply ADD {} <address> to add the rest.",
                participant,
                source,
                group_id,
                enrolled.len(),
                group_id
            ),
            Err(e) => format!("❌ {}", e),
        }
    }

    fn plan_response(&self, target: &str) -> String {
        match parse_amount(target) {
            Ok(target) => SavingsPlan::preview(target).render(),
            Err(e) => format!("❌ {}", e),
        }
    }

    async fn contribute_response(&self, group_id: U256, amount: &str) -> String {
        let amount = match parse_amount(amount) {
            Ok(amount) => amount,
            Err(e) => return format!("❌ {}", e),
        };

        match self.ledger.group(group_id).await {
            Ok(group) if !group.active || group.goal_reached => {
                return format!("Group #{} is not accepting contributions.", group_id);
            }
            Ok(_) => {}
            Err(e) => return format!("❌ Error loading group #{}: {}", group_id, e),
        }

        let receipt = match transact(&*self.ledger, LedgerCall::Contribute { group_id, amount }, &self.notifier).await {
            Ok(receipt) => receipt,
            Err(e) => return format!("❌ Contribution failed.\n{}", e),
        };

        let mut response = format!("✅ Contributed {} ETH to group #{}", format_amount(amount), group_id);
        if let Some(event) = decode_event::<AporteRealizadoFilter>(&receipt) {
            response.push_str(&format!("\nTotal raised: {} ETH", format_amount(event.total_recaudado)));
        }
        if decode_event::<MetaAlcanzadaFilter>(&receipt).is_some() {
            response.push_str("\n🎉 Goal reached!");
        }
        response.push_str(&format!("\nTX: {:?}", receipt.transaction_hash));
        response
    }

    async fn add_response(&self, group_id: U256, participant: Option<String>) -> String {
        let Some(account) = self.ledger.account() else {
            return format!("❌ {}", LedgerError::NoAccount);
        };

        let participant = match participant {
            Some(input) => match parse_address(&input) {
                Some(address) => address,
                None => {
                    return format!(
                        "❌ Invalid address {}. It must be an Ethereum address (0x... with 42 characters)",
                        input
                    )
                }
            },
            None => account,
        };

        match self.ledger.group(group_id).await {
            Ok(group) if group.creator != account => {
                return "❌ Only the group creator can add participants. If you are the creator, check that you are using the right account.".to_string();
            }
            Ok(group) if group.participants.contains(&participant) => {
                return format!("{} is already in group #{}.", short_address(&participant), group_id);
            }
            Ok(_) => {}
            Err(e) => return format!("❌ Error loading group #{}: {}", group_id, e),
        }

        let call = LedgerCall::AddParticipant { group_id, participant };
        match transact(&*self.ledger, call, &self.notifier).await {
            Ok(receipt) => {
                let added = decode_event::<ParticipanteAgregadoFilter>(&receipt)
                    .map(|event| event.participante)
                    .unwrap_or(participant);
                format!(
                    "✅ {} added to group #{}\nTX: {:?}",
                    short_address(&added),
                    group_id,
                    receipt.transaction_hash
                )
            }
            Err(e) => format!("❌ Error adding participant {:?}: {}", participant, e),
        }
    }

    async fn withdraw_response(&self, group_id: U256, recipient: &str) -> String {
        let Some(recipient) = parse_address(recipient) else {
            return format!("❌ Invalid recipient {}. It must be an Ethereum address (0x... with 42 characters)", recipient);
        };

        let call = LedgerCall::RequestWithdrawal { group_id, recipient };
        let receipt = match transact(&*self.ledger, call, &self.notifier).await {
            Ok(receipt) => receipt,
            Err(e) => return format!("❌ Withdrawal request failed.\n{}", e),
        };

        match decode_event::<SolicitudRetiroCreadaFilter>(&receipt) {
            Some(event) => format!(
                "✅ Withdrawal request #{} created for {} ETH to {}.\nApprovers reply: APPROVE {} {}",
                event.solicitud_id,
                format_amount(event.cantidad),
                short_address(&event.destinatario),
                group_id,
                event.solicitud_id
            ),
            None => format!("✅ Withdrawal requested.\nTX: {:?}", receipt.transaction_hash),
        }
    }

    async fn approve_response(&self, group_id: U256, request_id: U256) -> String {
        let call = LedgerCall::ApproveWithdrawal { group_id, request_id };
        let receipt = match transact(&*self.ledger, call, &self.notifier).await {
            Ok(receipt) => receipt,
            Err(e) => return format!("❌ Approval failed.\n{}", e),
        };

        match decode_event::<AprobacionAgregadaFilter>(&receipt) {
            Some(event) if event.num_aprobaciones >= event.quorum => format!(
                "✅ Approved ({}/{}). Quorum reached.\nReply EXECUTE {} {}",
                event.num_aprobaciones, event.quorum, group_id, request_id
            ),
            Some(event) => format!("✅ Approved ({}/{}).", event.num_aprobaciones, event.quorum),
            None => format!("✅ Approved.\nTX: {:?}", receipt.transaction_hash),
        }
    }

    async fn execute_response(&self, group_id: U256, request_id: U256) -> String {
        let call = LedgerCall::ExecuteWithdrawal { group_id, request_id };
        let receipt = match transact(&*self.ledger, call, &self.notifier).await {
            Ok(receipt) => receipt,
            Err(e) => return format!("❌ Withdrawal failed.\n{}", e),
        };

        match decode_event::<RetiroEjecutadoFilter>(&receipt) {
            Some(event) => format!(
                "✅ Withdrawn {} ETH to {} (interest {} ETH).",
                format_amount(event.cantidad),
                short_address(&event.destinatario),
                format_amount(event.intereses_generados)
            ),
            None => format!("✅ Withdrawal executed.\nTX: {:?}", receipt.transaction_hash),
        }
    }

    async fn total_response(&self) -> String {
        match self.ledger.total_groups().await {
            Ok(total) => format!("Total groups: {}", total),
            Err(e) => format!("❌ {}", e),
        }
    }

    fn unknown_response(&self, text: &str) -> String {
        if text.is_empty() {
            "Welcome to savings groups!\n\nReply HELP for commands.".to_string()
        } else {
            format!("{}\n\nReply HELP for commands.", text)
        }
    }
}

impl std::fmt::Debug for CommandProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("account", &self.ledger.account())
            .field("chain_id", &self.ledger.expected_chain_id())
            .field("watch_interval", &self.watch_interval)
            .finish()
    }
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}
