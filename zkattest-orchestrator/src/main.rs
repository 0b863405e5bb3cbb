//! zkattest - Main Entry Point
//!
//! Ledger administration, attestation submission, and the proof
//! orchestrator service, all over a JSON ledger file.
//!
//! Usage:
//!     zkattest init --admin admin --quorum 2
//!     zkattest --caller 0xexchange commit 1500000 --key regulator.pub
//!     zkattest --config zkattest.json run

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use zkattest::tracing::prefix;
use zkattest_core::PeriodId;
use zkattest_orchestrator::{CommandContext, OrchestratorConfig};

#[derive(Parser, Debug)]
#[command(name = "zkattest")]
#[command(about = "Periodic encrypted attestations with zero-knowledge verification")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file (overrides config)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Identity making the call (defaults to the configured operator)
    #[arg(long, global = true)]
    caller: Option<String>,

    /// Log level (debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new ledger file at period 0
    Init {
        /// Administrator identity (defaults to the caller)
        #[arg(long)]
        admin: Option<String>,
        /// Distinct attestors required per period
        #[arg(long, default_value = "2")]
        quorum: usize,
        /// Overwrite an existing ledger file
        #[arg(long)]
        force: bool,
    },
    /// Register an attestor (administrator only)
    Register { address: String, name: String },
    /// Submit a payload file for the current period
    Submit {
        payload: PathBuf,
        /// Submit as administrator on behalf of this attestor
        #[arg(long)]
        on_behalf: Option<String>,
    },
    /// Encrypt a value and submit the ciphertext
    Commit {
        value: u64,
        /// Public key material passed to the encryptor
        #[arg(long)]
        key: PathBuf,
        /// Ciphertext location (defaults under the work dir)
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        on_behalf: Option<String>,
    },
    /// Append a verification rule (administrator only)
    AddRule {
        description: String,
        /// Rule data as hex
        #[arg(long, default_value = "")]
        data: String,
    },
    /// Publish a verification result manually (administrator only)
    Publish {
        period: PeriodId,
        /// Proof bytes to record
        #[arg(long)]
        proof: PathBuf,
        /// Record a failed verification
        #[arg(long)]
        failed: bool,
    },
    /// Move past a period that will never reach quorum (administrator only)
    ForceAdvance,
    /// Print ledger state as JSON
    Status {
        #[arg(long)]
        period: Option<PeriodId>,
    },
    /// Run the proof orchestrator until Ctrl+C / SIGTERM
    Run,
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: zkattest panicked");
        eprintln!(
            "  Location: {}",
            panic_info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
        eprintln!(
            "  Message: {}",
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .unwrap_or(&"<no message>")
        );
    }));

    let args = Args::parse();
    zkattest::tracing::init_with_filter(&args.log_level);

    if let Err(e) = execute(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn execute(args: Args) -> zkattest::Result<()> {
    let mut config = OrchestratorConfig::load(args.config.as_deref())?;
    if let Some(ledger) = args.ledger {
        config.ledger_path = ledger;
    }
    let ctx = CommandContext::new(config, args.caller);

    match args.command {
        Command::Init {
            admin,
            quorum,
            force,
        } => {
            ctx.init(admin.as_deref(), quorum, force)?;
            println!("{}", ctx.config().ledger_path.display());
        }
        Command::Register { address, name } => ctx.register(&address, &name)?,
        Command::Submit { payload, on_behalf } => {
            let bytes = std::fs::read(&payload)?;
            let receipt = ctx.submit(bytes, on_behalf.as_deref())?;
            println!(
                "period {} attestors {} quorum {}",
                receipt.period, receipt.attestor_count, receipt.quorum_reached
            );
        }
        Command::Commit {
            value,
            key,
            output,
            on_behalf,
        } => {
            let receipt = ctx
                .commit(value, &key, output, on_behalf.as_deref())
                .await?;
            println!(
                "period {} attestors {} quorum {}",
                receipt.period, receipt.attestor_count, receipt.quorum_reached
            );
        }
        Command::AddRule { description, data } => {
            let rule_data = hex::decode(data.trim_start_matches("0x"))
                .map_err(|e| zkattest::Error::config(format!("rule data is not hex: {}", e)))?;
            let index = ctx.add_rule(&description, rule_data)?;
            println!("{}", index);
        }
        Command::Publish {
            period,
            proof,
            failed,
        } => {
            let bytes = std::fs::read(&proof)?;
            ctx.publish(period, !failed, bytes)?;
        }
        Command::ForceAdvance => {
            let period = ctx.force_advance()?;
            println!("{}", period);
        }
        Command::Status { period } => {
            let status = ctx.status(period)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Run => {
            info!(
                "{} zkattest orchestrator v{} (ledger {})",
                prefix::PULSE_OPEN,
                env!("CARGO_PKG_VERSION"),
                ctx.config().ledger_path.display()
            );
            ctx.run(shutdown_signal()).await?;
            info!("{} Shutdown complete", prefix::PULSE_CLOSE);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("{} Received Ctrl+C, shutting down", prefix::PULSE_CLOSE);
        }
        _ = terminate => {
            info!("{} Received terminate signal, shutting down", prefix::PULSE_CLOSE);
        }
    }
}
