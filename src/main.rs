use alloy::providers::DynProvider;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use farm_probe::Engine;
use farm_probe::config::RuntimeConfig;
use farm_probe::ledger::CancelToken;
use farm_probe::ledger::evm::EvmLedger;
use farm_probe::model::FixedPointAmount;
use farm_probe::report;

mod cli;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cli = cli::Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn run(cli: cli::Cli) -> Result<()> {
    let config = RuntimeConfig::from_cli(&cli.global.options())?;
    let json = cli.global.json;

    let (handle, mut cancel) = CancelToken::new();
    if let Some(timeout) = config.timeout {
        cancel = cancel.with_timeout(timeout);
    }
    ctrlc::set_handler(move || handle.cancel()).context("installing Ctrl-C handler")?;

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(run_async(cli.command, config, json, cancel))
}

async fn run_async(
    command: cli::Command,
    config: RuntimeConfig,
    json: bool,
    cancel: CancelToken,
) -> Result<()> {
    match command {
        cli::Command::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config.farm)?);
        }
        cli::Command::Position => {
            let engine = connect(&config)?;
            let report = engine
                .check_position(&cancel)
                .await
                .context("checking position")?;
            if json {
                println!("{}", report::position_json(&report)?);
            } else {
                print!("{}", report::render_position(&report, engine.config()));
            }
        }
        cli::Command::SimulateWithdraw { amount } => {
            let caller = config.require_caller()?;
            let engine = connect(&config)?;
            let text = amount.unwrap_or_else(|| config.farm.default_withdraw_amount.clone());
            let amount = FixedPointAmount::parse(&text, config.farm.underlying.decimals)?;

            let preview = engine
                .simulate_withdraw(&amount, caller, &cancel)
                .await
                .context("simulating withdraw")?;
            if json {
                println!("{}", report::dry_run_json(&amount, &preview)?);
            } else {
                print!("{}", report::render_dry_run(&amount, &preview));
            }
        }
    }

    Ok(())
}

fn connect(config: &RuntimeConfig) -> Result<Engine<EvmLedger<DynProvider>>> {
    info!(
        chain = %config.farm.chain,
        block = ?config.block,
        farm = %config.farm.farm,
        "connecting"
    );
    let ledger = EvmLedger::connect_http(&config.farm.chain.rpc_url, config.block)?;
    Ok(Engine::new(ledger, config.farm.clone()))
}
