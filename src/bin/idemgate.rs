//! idemgate CLI — exercise the deduplication engine from the command line.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use idemgate::config::Config;
use idemgate::engine::{Coordinator, Outcome, Sweeper};
use idemgate::processor::PaymentProcessor;
use idemgate::store::MemoryStore;
use idemgate::telemetry;

#[derive(Parser)]
#[command(name = "idemgate", about = "Request deduplication engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a payment, repeating with the same key to observe replays
    Charge {
        /// Idempotency key
        #[arg(long)]
        key: String,
        /// Amount to charge
        #[arg(long)]
        amount: f64,
        /// Currency code
        #[arg(long, default_value = "GHS")]
        currency: String,
        /// Submissions to make with the same key
        #[arg(long, default_value_t = 2)]
        repeat: usize,
    },
    /// Run the scripted deduplication scenarios against one engine
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_logging();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let store = Arc::new(MemoryStore::new(config.key_ttl));
    let coordinator = Coordinator::new(store.clone());
    let sweeper = Sweeper::new(store, config.sweep_interval);
    let sweeper_task = sweeper.spawn();
    let processor = PaymentProcessor::new(config.processing_delay);

    match cli.command {
        Command::Charge {
            key,
            amount,
            currency,
            repeat,
        } => cmd_charge(&coordinator, &processor, &key, amount, &currency, repeat).await?,
        Command::Demo => cmd_demo(&coordinator, &processor).await?,
    }

    sweeper.shutdown();
    sweeper_task.await?;
    Ok(())
}

async fn cmd_charge(
    coordinator: &Coordinator,
    processor: &PaymentProcessor,
    key: &str,
    amount: f64,
    currency: &str,
    repeat: usize,
) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(&serde_json::json!({
        "amount": amount,
        "currency": currency,
    }))?;

    for attempt in 1..=repeat {
        let outcome = coordinator
            .handle(key, &payload, || processor.process(&payload))
            .await;
        print_outcome(&format!("attempt {attempt}"), &outcome);
    }
    Ok(())
}

async fn cmd_demo(coordinator: &Coordinator, processor: &PaymentProcessor) -> anyhow::Result<()> {
    let payload: Vec<u8> = br#"{"amount": 100.0, "currency": "GHS"}"#.to_vec();

    println!("-- duplicate submission: same key, same payload");
    for attempt in 1..=2 {
        let outcome = coordinator
            .handle("demo-dup", &payload, || processor.process(&payload))
            .await;
        print_outcome(&format!("attempt {attempt}"), &outcome);
    }

    println!("-- same key, different payload");
    let other: &[u8] = br#"{"amount": 500.0, "currency": "GHS"}"#;
    let outcome = coordinator
        .handle("demo-dup", other, || processor.process(other))
        .await;
    print_outcome("conflicting attempt", &outcome);

    println!("-- two concurrent submissions, same key");
    let race = |tag: &'static str| {
        let coordinator = coordinator.clone();
        let processor = processor.clone();
        let payload = payload.clone();
        tokio::spawn(async move {
            let outcome = coordinator
                .handle("demo-race", &payload, || processor.process(&payload))
                .await;
            print_outcome(tag, &outcome);
        })
    };
    let (a, b) = (race("submission a"), race("submission b"));
    a.await?;
    b.await?;

    println!("-- missing key");
    let outcome = coordinator
        .handle("", &payload, || processor.process(&payload))
        .await;
    print_outcome("keyless attempt", &outcome);

    Ok(())
}

fn print_outcome(label: &str, outcome: &idemgate::Result<Outcome>) {
    match outcome {
        Ok(outcome) => {
            let kind = if outcome.is_replay() {
                "replayed"
            } else {
                "executed"
            };
            let result = outcome.result();
            println!("{label}: {kind} ({}) {}", result.code, result.body_text());
        }
        Err(err) => println!("{label}: rejected — {err}"),
    }
}
