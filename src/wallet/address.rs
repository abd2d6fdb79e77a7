use ethers::types::Address;

/// `0x` followed by exactly 40 hex digits.
pub fn is_address(candidate: &str) -> bool {
    candidate.len() == 42
        && candidate.starts_with("0x")
        && candidate[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Parse an address, rejecting anything that is not in the `0x` + 40 hex form.
pub fn parse_address(candidate: &str) -> Option<Address> {
    let candidate = candidate.trim();
    if !is_address(candidate) {
        return None;
    }
    candidate.parse().ok()
}

/// `0x12345678...abcdef12`
pub fn short_address(address: &Address) -> String {
    let full = format!("{:?}", address);
    format!("{}...{}", &full[..10], &full[full.len() - 8..])
}
