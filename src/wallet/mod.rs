pub mod account;
pub mod address;
pub mod units;

pub use account::*;
pub use address::*;
pub use units::*;
