pub mod parser;
pub mod view;
pub mod watch;

pub use parser::{Command, CommandProcessor};
pub use watch::Watch;
