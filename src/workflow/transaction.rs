use std::fmt;

use ethers::types::{TransactionReceipt, TxHash};
use tokio::sync::mpsc::UnboundedSender;

use super::enrollment::EnrollmentState;
use crate::contracts::{GroupLedger, LedgerCall, LedgerError};

/// Lifecycle of one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Waiting for the signer and the node to accept it.
    Submitted,
    /// Accepted, waiting for block inclusion.
    Confirming(TxHash),
    Confirmed(TxHash),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxUpdate {
    pub action: String,
    pub status: TxStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    State(EnrollmentState),
    Tx(TxUpdate),
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowEvent::State(state) => write!(f, "· {}", state),
            WorkflowEvent::Tx(update) => match &update.status {
                TxStatus::Submitted => write!(f, "⏳ {}: waiting for signature...", update.action),
                TxStatus::Confirming(tx) => write!(f, "⏳ {}: confirming {:?}", update.action, tx),
                TxStatus::Confirmed(tx) => write!(f, "✅ {}: confirmed {:?}", update.action, tx),
                TxStatus::Failed(reason) => write!(f, "❌ {}: {}", update.action, reason),
            },
        }
    }
}

/// Sending half of the progress channel. Events are dropped once nobody listens.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sender: Option<UnboundedSender<WorkflowEvent>>,
}

impl Notifier {
    pub fn new(sender: UnboundedSender<WorkflowEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    #[cfg(test)]
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: WorkflowEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    fn tx(&self, action: &str, status: TxStatus) {
        self.emit(WorkflowEvent::Tx(TxUpdate {
            action: action.to_string(),
            status,
        }));
    }
}

/// Submit `call` and wait for its receipt, reporting each lifecycle step.
pub async fn transact<L: GroupLedger + ?Sized>(
    ledger: &L,
    call: LedgerCall,
    notifier: &Notifier,
) -> Result<TransactionReceipt, LedgerError> {
    let action = call.describe();
    notifier.tx(&action, TxStatus::Submitted);

    let result = async {
        let tx = {
            let _turn = ledger.write_gate().lock().await;
            ledger.submit(call).await?
        };
        notifier.tx(&action, TxStatus::Confirming(tx));
        ledger.await_confirmation(tx).await
    }
    .await;

    match &result {
        Ok(receipt) => notifier.tx(&action, TxStatus::Confirmed(receipt.transaction_hash)),
        Err(e) => {
            tracing::warn!(action = %action, error = %e, "Transaction failed");
            notifier.tx(&action, TxStatus::Failed(e.to_string()));
        }
    }
    result
}
