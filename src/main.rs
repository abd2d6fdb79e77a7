mod commands;
mod config;
mod contracts;
mod wallet;
mod workflow;

use std::sync::Arc;

use commands::{Command, CommandProcessor, Watch};
use config::Config;
use contracts::{ContractService, GroupLedger};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workflow::{Notifier, WorkflowEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, replies to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "savings_groups=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        chain_id = config.contract.chain_id,
        rpc_url = %config.contract.rpc_url,
        contract = ?config.contract.address,
        "Starting savings group client"
    );

    let service = ContractService::new(&config.contract).map_err(|e| anyhow::anyhow!(e))?;
    if !config.can_sign() {
        tracing::warn!("PRIVATE_KEY not set - running read-only");
    }
    let ledger: Arc<dyn GroupLedger> = Arc::new(service);

    // Transaction and workflow progress
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            println!("{}", event);
        }
    });

    // Command replies and watch refreshes
    let (output_tx, mut output_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(reply) = output_rx.recv().await {
            println!("{}\n", reply);
        }
    });

    let processor = CommandProcessor::new(ledger, Notifier::new(progress_tx), config.watch_interval);
    println!("{}\n", processor.process("HELP").await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut watch: Option<Watch> = None;

    while let Some(line) = lines.next_line().await? {
        if let Some(stopped) = watch.take() {
            println!("Stopped watching group #{}.", stopped.group_id());
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line.to_uppercase().as_str(), "EXIT" | "QUIT") {
            break;
        }

        match processor.parse(line) {
            Command::Watch { group_id, interval_secs } => {
                let period = processor.watch_interval(interval_secs);
                println!("Watching group #{} every {}s. Press enter to stop.", group_id, period.as_secs());
                watch = Some(Watch::start(processor.clone(), group_id, period, output_tx.clone()));
            }
            command => {
                let processor = processor.clone();
                let output = output_tx.clone();
                tokio::spawn(async move {
                    let reply = processor.execute(command).await;
                    let _ = output.send(reply);
                });
            }
        }
    }

    drop(watch);
    tracing::info!("Console closed");

    Ok(())
}
