use ethers::abi::RawLog;
use ethers::contract::EthLogDecode;
use ethers::types::TransactionReceipt;

/// First log in `receipt` that decodes as `E`.
///
/// Receipts routinely carry logs from other events or other contracts, so a
/// log that fails to decode is skipped rather than treated as an error.
pub fn decode_event<E: EthLogDecode>(receipt: &TransactionReceipt) -> Option<E> {
    receipt.logs.iter().find_map(|log| {
        let raw = RawLog {
            topics: log.topics.clone(),
            data: log.data.to_vec(),
        };
        E::decode_log(&raw).ok()
    })
}
