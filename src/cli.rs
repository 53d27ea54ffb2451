use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use farm_probe::config::CliOptions;

/// Value a leveraged lending-market farm position and dry-run withdrawals
/// without sending a transaction.
#[derive(Parser)]
#[command(name = "farm-probe", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// JSON file overriding the built-in farm configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Chain to read from (base, ethereum, arbitrum, optimism)
    #[arg(long, global = true)]
    pub chain: Option<String>,

    /// JSON-RPC endpoint (overrides FARM_PROBE_RPC_URL and the chain default)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Pin every read and simulation to this block number
    #[arg(long, global = true)]
    pub block: Option<u64>,

    /// Caller address for simulations (overrides FARM_PROBE_PRIVATE_KEY)
    #[arg(long, global = true)]
    pub from: Option<String>,

    /// Abandon the run after this many seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Emit the report as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    pub fn options(&self) -> CliOptions {
        CliOptions {
            config: self.config.clone(),
            chain: self.chain.clone(),
            rpc_url: self.rpc_url.clone(),
            block: self.block,
            from: self.from.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Report supplied, borrowed and net amounts plus outstanding rewards
    Position,

    /// Dry-run withdraw(amount) on the farm and report predicted balance changes
    SimulateWithdraw {
        /// Amount in underlying units (default from config, e.g. "503")
        #[arg(long)]
        amount: Option<String>,
    },

    /// Print the effective farm configuration as JSON
    ShowConfig,
}
