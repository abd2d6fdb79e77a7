use chrono::DateTime;
use ethers::types::{Address, U256};

use crate::contracts::GroupInfo;
use crate::wallet::{format_amount, short_address};

const BAR_WIDTH: usize = 20;

/// Number of installments the savings plan preview splits a target into.
pub const PLAN_INSTALLMENTS: u64 = 12;
/// Expected yield shown in the plan preview, in percent.
pub const PLAN_EXPECTED_YIELD_PERCENT: u64 = 5;

/// A group snapshot plus the balances needed to render its card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group: GroupInfo,
    /// Total balance reported by the contract, principal plus yield.
    pub balance: U256,
    pub own_contribution: Option<U256>,
    pub viewer: Option<Address>,
}

impl GroupSummary {
    /// Raised over target, clamped to 0..=100.
    pub fn percent_complete(&self) -> f64 {
        let target = self.group.target;
        if target.is_zero() {
            return 0.0;
        }
        let basis_points = (self.group.raised.saturating_mul(U256::from(10_000)) / target).min(U256::from(10_000));
        basis_points.as_u64() as f64 / 100.0
    }

    /// Balance above what was contributed. Never negative.
    pub fn accrued_yield(&self) -> U256 {
        self.balance.saturating_sub(self.group.raised)
    }

    pub fn status_label(&self) -> &'static str {
        if self.group.goal_reached {
            "Goal reached ✓"
        } else if self.group.active {
            "Active"
        } else {
            "Inactive"
        }
    }

    pub fn can_contribute(&self) -> bool {
        self.group.active && !self.group.goal_reached
    }

    pub fn can_withdraw(&self, now: u64) -> bool {
        !self.group.active || self.group.goal_reached || self.group.target_date < now
    }

    pub fn render(&self, now: u64) -> String {
        let group = &self.group;
        let mut lines = vec![format!("Group #{} · {}", group.id, group.name)];
        if !group.description.is_empty() {
            lines.push(group.description.clone());
        }

        lines.push(format!("Target: {} ETH", format_amount(group.target)));
        lines.push(format!("Raised: {} ETH", format_amount(group.raised)));
        lines.push(format!("Total balance: {} ETH", format_amount(self.balance)));
        lines.push(format!("In lending pool: {} ETH", format_amount(group.deposited)));
        lines.push(format!("Interest earned: +{} ETH", format_amount(self.accrued_yield())));
        if let Some(own) = self.own_contribution {
            lines.push(format!("Your contribution: {} ETH", format_amount(own)));
        }
        lines.push(format!("Target date: {}", format_date(group.target_date)));
        lines.push(format!("Status: {}", self.status_label()));
        lines.push(format!("{} {:.1}% complete", progress_bar(self.percent_complete()), self.percent_complete()));
        lines.push(format!("Quorum: {} of {}", group.quorum, group.participants.len()));

        lines.push("Participants:".to_string());
        for participant in &group.participants {
            let you = if Some(*participant) == self.viewer { " (you)" } else { "" };
            lines.push(format!("  {}{}", short_address(participant), you));
        }

        let mut actions = Vec::new();
        if self.can_contribute() {
            actions.push(format!("CONTRIBUTE {} <amount>", group.id));
        }
        if self.can_withdraw(now) {
            actions.push(format!("WITHDRAW {} <recipient>", group.id));
        }
        if !actions.is_empty() {
            lines.push(format!("Reply: {}", actions.join(" | ")));
        }

        lines.join("\n")
    }
}

/// Preview shown before creating a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsPlan {
    pub target: U256,
    pub installments: u64,
    pub per_installment: U256,
    pub expected_yield: U256,
}

impl SavingsPlan {
    pub fn preview(target: U256) -> Self {
        Self {
            target,
            installments: PLAN_INSTALLMENTS,
            per_installment: target / U256::from(PLAN_INSTALLMENTS),
            expected_yield: target.saturating_mul(U256::from(PLAN_EXPECTED_YIELD_PERCENT)) / U256::from(100),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Total: {} ETH\nInstallments: {}\nSave per installment: {} ETH\nExpected yield: {} ETH",
            format_amount(self.target),
            self.installments,
            format_amount(self.per_installment),
            format_amount(self.expected_yield),
        )
    }
}

pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Unix seconds as YYYY-MM-DD (UTC).
pub fn format_date(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::mock::{creator, invitee, sample_group};
    use ethers::utils::parse_ether;

    fn summary(raised: &str, balance: &str) -> GroupSummary {
        let mut group = sample_group(7);
        group.raised = parse_ether(raised).unwrap();
        group.participants.push(invitee(1));
        GroupSummary {
            group,
            balance: parse_ether(balance).unwrap(),
            own_contribution: Some(parse_ether("1").unwrap()),
            viewer: Some(creator()),
        }
    }

    #[test]
    fn test_percent_complete() {
        assert_eq!(summary("4", "4").percent_complete(), 40.0);
        assert_eq!(summary("0", "0").percent_complete(), 0.0);
        assert_eq!(summary("25", "25").percent_complete(), 100.0);

        let mut zero_target = summary("1", "1");
        zero_target.group.target = U256::zero();
        assert_eq!(zero_target.percent_complete(), 0.0);
    }

    #[test]
    fn test_accrued_yield_is_floored() {
        assert_eq!(summary("4", "4.25").accrued_yield(), parse_ether("0.25").unwrap());
        assert_eq!(summary("4", "3.9").accrued_yield(), U256::zero());
    }

    #[test]
    fn test_status_and_actions() {
        let mut s = summary("4", "4");
        assert_eq!(s.status_label(), "Active");
        assert!(s.can_contribute());
        assert!(!s.can_withdraw(s.group.target_date - 1));
        assert!(s.can_withdraw(s.group.target_date + 1));

        s.group.goal_reached = true;
        assert_eq!(s.status_label(), "Goal reached ✓");
        assert!(!s.can_contribute());
        assert!(s.can_withdraw(0));

        s.group.goal_reached = false;
        s.group.active = false;
        assert_eq!(s.status_label(), "Inactive");
        assert!(s.can_withdraw(0));
    }

    #[test]
    fn test_render_card() {
        let s = summary("4", "4.5");
        let card = s.render(0);

        assert!(card.starts_with("Group #7 · Viaje Familiar"));
        assert!(card.contains("Target: 10 ETH"));
        assert!(card.contains("Total balance: 4.5 ETH"));
        assert!(card.contains("In lending pool: 4 ETH"));
        assert!(card.contains("Interest earned: +0.5 ETH"));
        assert!(card.contains("Your contribution: 1 ETH"));
        assert!(card.contains("Target date: 2025-12-31"));
        assert!(card.contains("40.0% complete"));
        assert!(card.contains(&format!("{} (you)", short_address(&creator()))));
        assert!(card.contains("CONTRIBUTE 7 <amount>"));
        assert!(!card.contains("WITHDRAW"));
    }

    #[test]
    fn test_plan_preview() {
        let plan = SavingsPlan::preview(parse_ether("12").unwrap());
        assert_eq!(plan.installments, 12);
        assert_eq!(plan.per_installment, parse_ether("1").unwrap());
        assert_eq!(plan.expected_yield, parse_ether("0.6").unwrap());
        assert!(plan.render().contains("Save per installment: 1 ETH"));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), format!("[{}]", ".".repeat(20)));
        assert_eq!(progress_bar(50.0), format!("[{}{}]", "#".repeat(10), ".".repeat(10)));
        assert_eq!(progress_bar(250.0), format!("[{}]", "#".repeat(20)));
    }
}
