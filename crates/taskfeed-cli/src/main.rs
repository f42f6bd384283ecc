//! Taskfeed CLI
//!
//! Thin wrapper around taskfeed-core for command-line usage.
//!
//! ## Usage
//!
//! ```bash
//! # Run the scripted end-to-end demo
//! taskfeed demo
//!
//! # Same, with a custom owner id and a faster simulated API
//! taskfeed demo --owner alice --latency-ms 50
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskfeed_core::{DataMode, MutationGateway, RemoteApi, SyncEngine, TaskStore, TaskView};
use tracing::info;

/// Taskfeed - real-time shared task list sync
#[derive(Parser)]
#[command(name = "taskfeed")]
#[command(version = "0.1.0")]
#[command(about = "Taskfeed - real-time shared task list sync")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session: create, toggle, switch data mode, delete
    Demo {
        /// Owner id for the session
        #[arg(short, long, default_value = "demo-user")]
        owner: String,

        /// Simulated API latency in milliseconds
        #[arg(short, long, default_value_t = 500)]
        latency_ms: u64,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

fn print_view(label: &str, view: &TaskView) {
    println!("\n{} (mode: {})", label, view.mode);
    if view.tasks.is_empty() {
        println!("  (no tasks)");
    }
    for task in &view.tasks {
        println!(
            "  {} {} ({})",
            if task.completed { "✓" } else { "○" },
            task.text,
            task.owner_id
        );
    }
}

async fn run_demo(owner: String, latency_ms: u64) -> Result<()> {
    let latency = Duration::from_millis(latency_ms);
    // Give the feed a beat to deliver each snapshot
    let settle = Duration::from_millis(50);

    let store = TaskStore::open("artifacts/demo/public/data/tasks");
    info!(path = store.path(), ?latency, "Starting demo session");
    let engine = SyncEngine::with_remote(RemoteApi::with_latency(latency));
    engine.start(&store);

    let gateway = MutationGateway::new(store.clone());
    gateway.set_owner(owner);

    println!("Creating tasks...");
    let milk = gateway.create_task("Buy milk")?;
    gateway.create_task("Plant garden")?;
    gateway.create_task("Fix the fence")?;
    tokio::time::sleep(settle).await;
    print_view("Direct view", &engine.view());

    println!("\nToggling 'Buy milk'...");
    gateway.toggle_task(&milk, false)?;
    tokio::time::sleep(settle).await;
    print_view("Direct view", &engine.view());

    println!("\nSwitching to the simulated task API...");
    engine.set_mode(DataMode::Api);
    tokio::time::sleep(latency + settle).await;
    print_view("API view", &engine.view());

    println!("\nDeleting 'Buy milk'...");
    gateway.delete_task(&milk)?;
    tokio::time::sleep(latency + settle).await;
    print_view("API view", &engine.view());

    engine.shutdown();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Demo { owner, latency_ms } => run_demo(owner, latency_ms).await,
    }
}
