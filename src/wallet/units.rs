use ethers::types::U256;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is required")]
    Missing,
    #[error("Invalid amount: {0}")]
    Invalid(String),
    #[error("Amount must be greater than zero")]
    NotPositive,
}

/// Parse a human ETH amount ("0.25") into wei.
pub fn parse_amount(input: &str) -> Result<U256, AmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AmountError::Missing);
    }
    // parse_ether wraps negative values into two's complement
    if input.starts_with('-') {
        return Err(AmountError::NotPositive);
    }

    let wei = ethers::utils::parse_ether(input).map_err(|_| AmountError::Invalid(input.to_string()))?;
    if wei.is_zero() {
        return Err(AmountError::NotPositive);
    }
    Ok(wei)
}

/// Format wei as ETH without trailing zeros ("1.5", "0", "12").
pub fn format_amount(value: U256) -> String {
    let formatted = ethers::utils::format_ether(value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}
