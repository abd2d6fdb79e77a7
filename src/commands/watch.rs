use std::time::Duration;

use ethers::types::U256;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::parser::{Command, CommandProcessor};

/// Periodic refresh of one group card. Dropping the handle stops the task.
pub struct Watch {
    group_id: U256,
    handle: JoinHandle<()>,
}

impl Watch {
    pub fn start(
        processor: CommandProcessor,
        group_id: U256,
        period: Duration,
        output: UnboundedSender<String>,
    ) -> Self {
        tracing::info!(group_id = %group_id, period_secs = period.as_secs(), "Watching group");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let card = processor.execute(Command::Group { group_id }).await;
                if output.send(card).is_err() {
                    break;
                }
            }
        });

        Self { group_id, handle }
    }

    pub fn group_id(&self) -> U256 {
        self.group_id
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        tracing::debug!(group_id = %self.group_id, "Stopped watching group");
        self.handle.abort();
    }
}
