//! Create a group, then enroll its invitees one transaction at a time.
//!
//! The group id only exists once the creation receipt has been decoded, so
//! enrollment never starts before that. Enrollments are strictly sequential:
//! the next one is submitted only after the previous one confirmed. A failed
//! enrollment stops the run; participants already enrolled stay enrolled.

use std::fmt;
use std::sync::Arc;

use ethers::types::{Address, TxHash, U256};
use thiserror::Error;

use super::transaction::{transact, Notifier, WorkflowEvent};
use super::validation::{GroupDraft, ValidationError};
use crate::contracts::abi::GrupoCreadoFilter;
use crate::contracts::{decode_event, GroupLedger, LedgerCall, LedgerError};
use crate::wallet::short_address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentState {
    Idle,
    CreatingGroup,
    AwaitingGroupId,
    EnrollingParticipant { index: usize, total: usize },
    Done { group_id: U256 },
    Error,
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentState::Idle => write!(f, "idle"),
            EnrollmentState::CreatingGroup => write!(f, "creating group..."),
            EnrollmentState::AwaitingGroupId => write!(f, "reading group id from receipt"),
            EnrollmentState::EnrollingParticipant { index, total } => {
                write!(f, "adding participants... ({}/{})", index + 1, total)
            }
            EnrollmentState::Done { group_id } => write!(f, "group #{} ready", group_id),
            EnrollmentState::Error => write!(f, "failed"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Group creation {tx:?} confirmed but its receipt has no GrupoCreado event")]
    GroupIdMissing { tx: TxHash },
    #[error("Error adding participant {participant:?} to group #{group_id}: {source}")]
    Enrollment {
        group_id: U256,
        participant: Address,
        /// Invitees enrolled before the failure; they remain in the group.
        enrolled: Vec<Address>,
        #[source]
        source: LedgerError,
    },
}

/// Invitees still to be enrolled into a freshly created group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentQueue {
    group_id: U256,
    invitees: Vec<Address>,
    cursor: usize,
}

impl EnrollmentQueue {
    pub fn new(group_id: U256, invitees: Vec<Address>) -> Self {
        Self {
            group_id,
            invitees,
            cursor: 0,
        }
    }

    pub fn group_id(&self) -> U256 {
        self.group_id
    }

    pub fn current(&self) -> Option<Address> {
        self.invitees.get(self.cursor).copied()
    }

    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(self.invitees.len());
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.invitees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invitees.is_empty()
    }

    pub fn enrolled(&self) -> &[Address] {
        &self.invitees[..self.cursor]
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub group_id: U256,
    pub creation_tx: TxHash,
    pub enrolled: Vec<Address>,
}

impl fmt::Display for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "✅ Group #{} created.\nTX: {:?}", self.group_id, self.creation_tx)?;
        if !self.enrolled.is_empty() {
            write!(f, "\nParticipants added:")?;
            for participant in &self.enrolled {
                write!(f, "\n  {}", short_address(participant))?;
            }
        }
        Ok(())
    }
}

pub struct EnrollmentWorkflow<L: ?Sized> {
    ledger: Arc<L>,
    notifier: Notifier,
    state: EnrollmentState,
}

impl<L: GroupLedger + ?Sized> EnrollmentWorkflow<L> {
    pub fn new(ledger: Arc<L>, notifier: Notifier) -> Self {
        Self {
            ledger,
            notifier,
            state: EnrollmentState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &EnrollmentState {
        &self.state
    }

    /// Run the whole workflow for `draft`. On failure the workflow is back
    /// in `Idle` and nothing is retried.
    pub async fn run(&mut self, draft: GroupDraft) -> Result<Enrollment, WorkflowError> {
        if matches!(self.state, EnrollmentState::Done { .. }) {
            self.transition(EnrollmentState::Idle);
        }

        let result = self.drive(draft).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Group enrollment failed");
            if self.state != EnrollmentState::Idle {
                self.transition(EnrollmentState::Error);
                self.transition(EnrollmentState::Idle);
            }
        }
        result
    }

    async fn drive(&mut self, draft: GroupDraft) -> Result<Enrollment, WorkflowError> {
        draft.check_required()?;
        let creator = self.ledger.require_account()?;
        let plan = draft.into_plan(creator)?;

        tracing::info!(
            name = %plan.group.name,
            approvers = plan.group.approvers.len(),
            quorum = %plan.group.quorum,
            "Creating group"
        );

        self.transition(EnrollmentState::CreatingGroup);
        let receipt = transact(&*self.ledger, LedgerCall::CreateGroup(plan.group), &self.notifier).await?;
        let creation_tx = receipt.transaction_hash;

        self.transition(EnrollmentState::AwaitingGroupId);
        let created = decode_event::<GrupoCreadoFilter>(&receipt)
            .ok_or(WorkflowError::GroupIdMissing { tx: creation_tx })?;

        let mut queue = EnrollmentQueue::new(created.grupo_id, plan.invitees);
        if queue.is_empty() {
            tracing::info!(group_id = %queue.group_id(), "Group created without invitees");
        } else {
            tracing::info!(group_id = %queue.group_id(), invitees = queue.len(), "Group created");
        }

        while let Some(participant) = queue.current() {
            self.transition(EnrollmentState::EnrollingParticipant {
                index: queue.cursor(),
                total: queue.len(),
            });

            let call = LedgerCall::AddParticipant {
                group_id: queue.group_id(),
                participant,
            };
            if let Err(source) = transact(&*self.ledger, call, &self.notifier).await {
                return Err(WorkflowError::Enrollment {
                    group_id: queue.group_id(),
                    participant,
                    enrolled: queue.enrolled().to_vec(),
                    source,
                });
            }
            queue.advance();
        }

        self.transition(EnrollmentState::Done {
            group_id: queue.group_id(),
        });

        Ok(Enrollment {
            group_id: queue.group_id(),
            creation_tx,
            enrolled: queue.enrolled().to_vec(),
        })
    }

    fn transition(&mut self, next: EnrollmentState) {
        tracing::debug!(from = ?self.state, to = ?next, "Enrollment state");
        self.state = next.clone();
        self.notifier.emit(WorkflowEvent::State(next));
    }
}
