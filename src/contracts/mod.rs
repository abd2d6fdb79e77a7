// Contract integration for the GruposAhorro savings-group contract
pub mod abi;
pub mod config;
pub mod events;
pub mod ledger;
pub mod service;

#[cfg(test)]
pub mod mock;

pub use config::ContractConfig;
pub use events::decode_event;
pub use ledger::{GroupInfo, GroupLedger, LedgerCall, LedgerError, NewGroup};
pub use service::ContractService;
