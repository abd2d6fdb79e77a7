use std::collections::HashSet;

use chrono::NaiveDate;
use ethers::types::{Address, U256};
use thiserror::Error;

use crate::contracts::NewGroup;
use crate::wallet::{is_address, parse_address, parse_amount, AmountError};

pub const DEFAULT_DESCRIPTION: &str = "Grupo de ahorro";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all required fields (missing {0})")]
    MissingField(&'static str),
    #[error("Invalid addresses: {}. They must be Ethereum addresses (0x... with 42 characters)", .0.join(", "))]
    InvalidAddresses(Vec<String>),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("Invalid date '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Group id must be a non-negative number, got '{0}'")]
    InvalidGroupId(String),
}

/// Raw form input for a new group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    /// ETH
    pub target: String,
    /// YYYY-MM-DD
    pub target_date: String,
    /// Comma separated addresses
    pub participants: String,
    pub purpose: Option<String>,
}

/// A validated draft: the creation call plus the invitees to enroll afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentPlan {
    pub group: NewGroup,
    pub invitees: Vec<Address>,
}

impl GroupDraft {
    pub fn check_required(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.target.trim().is_empty() {
            return Err(ValidationError::MissingField("target amount"));
        }
        if self.target_date.trim().is_empty() {
            return Err(ValidationError::MissingField("target date"));
        }
        Ok(())
    }

    pub fn into_plan(self, creator: Address) -> Result<EnrollmentPlan, ValidationError> {
        self.check_required()?;

        let candidates = parse_participants(&self.participants)?;
        let target = parse_amount(&self.target)?;
        let target_date = parse_target_date(&self.target_date)?;

        let invitees = invitees(creator, &candidates);
        let approvers = approvers(creator, &invitees);
        let quorum = quorum_for(approvers.len());

        let description = self
            .purpose
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        Ok(EnrollmentPlan {
            group: NewGroup {
                name: self.name.trim().to_string(),
                target,
                target_date,
                description,
                quorum,
                approvers,
            },
            invitees,
        })
    }
}

/// Split a comma separated list; every non-empty entry must be an address.
pub fn parse_participants(input: &str) -> Result<Vec<Address>, ValidationError> {
    let entries: Vec<&str> = input.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();

    let invalid: Vec<String> = entries
        .iter()
        .filter(|p| !is_address(p))
        .map(|p| p.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidAddresses(invalid));
    }

    Ok(entries.iter().filter_map(|p| parse_address(p)).collect())
}

/// Candidates in first-seen order, without duplicates and without the creator.
pub fn invitees(creator: Address, candidates: &[Address]) -> Vec<Address> {
    let mut seen = HashSet::from([creator]);
    candidates.iter().copied().filter(|a| seen.insert(*a)).collect()
}

/// Creator first, then the invitees.
pub fn approvers(creator: Address, invitees: &[Address]) -> Vec<Address> {
    std::iter::once(creator).chain(invitees.iter().copied()).collect()
}

/// Simple majority: 1 approver needs 1, otherwise ceil(n / 2).
pub fn quorum_for(approvers: usize) -> U256 {
    if approvers <= 1 {
        U256::one()
    } else {
        U256::from(approvers.div_ceil(2))
    }
}

/// `YYYY-MM-DD` as unix seconds at UTC midnight.
pub fn parse_target_date(input: &str) -> Result<u64, ValidationError> {
    let input = input.trim();
    let invalid = || ValidationError::InvalidDate(input.to_string());

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    u64::try_from(midnight.and_utc().timestamp()).map_err(|_| invalid())
}

pub fn parse_group_id(input: &str) -> Result<U256, ValidationError> {
    let input = input.trim();
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidGroupId(input.to_string()));
    }
    U256::from_dec_str(input).map_err(|_| ValidationError::InvalidGroupId(input.to_string()))
}
