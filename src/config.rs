use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::{Address, address};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::ledger::CallerIdentity;
use crate::model::{Asset, Chain, RewardDecimals};

pub const RPC_URL_ENV: &str = "FARM_PROBE_RPC_URL";
pub const PRIVATE_KEY_ENV: &str = "FARM_PROBE_PRIVATE_KEY";

/// Scale conventions of the market's exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateScale {
    /// Decimals the stored rate value carries.
    pub value_decimals: u8,
    /// Exponent the product `balance * rate` is divided by.
    pub divisor_decimals: u8,
}

impl ExchangeRateScale {
    /// Compound-style mantissa: divided by 1e18, worth `18 - market + underlying` decimals.
    ///
    /// Fails when the market token has more decimals than the mantissa can absorb.
    pub fn compound(market_decimals: u8, underlying_decimals: u8) -> Result<Self> {
        let value_decimals = 18u8
            .checked_add(underlying_decimals)
            .and_then(|d| d.checked_sub(market_decimals))
            .ok_or_else(|| {
                anyhow!(
                    "no Compound-style exchange rate for a {market_decimals}-decimal market \
                     over a {underlying_decimals}-decimal underlying"
                )
            })?;
        Ok(Self {
            value_decimals,
            divisor_decimals: 18,
        })
    }
}

/// Everything that identifies one leveraged farm position.
///
/// Passed explicitly into every component; nothing is read from process
/// state once this is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmConfig {
    pub chain: Chain,
    /// The farm contract: holder of the market position and target of `withdraw`.
    pub farm: Address,
    /// Collateral/debt asset.
    pub underlying: Asset,
    /// Collateral-bearing wrapper (market) token.
    pub market: Asset,
    pub reward_distributor: Address,
    /// Reward token tracked by withdrawal simulations.
    pub reward_token: Asset,
    pub reward_decimals: RewardDecimals,
    pub exchange_rate: ExchangeRateScale,
    /// Withdrawal amount, in underlying units, when none is given.
    pub default_withdraw_amount: String,
}

impl FarmConfig {
    /// The EURC farm on Base: EURC (6 dp) supplied to the mEURC market (8 dp), WELL rewards (18 dp).
    pub fn base_eurc() -> Result<Self> {
        let underlying = Asset::new("EURC", address!("0x60a3E35Cc302bFA44Cb288Bc5a4F316Fdb1adb42"), 6);
        let market = Asset::new("mEURC", address!("0xb682c840B5F4FC58B20769E691A6fa1305A501a2"), 8);
        let reward_token = Asset::new("WELL", address!("0xA88594D404727625A9437C3f886C7643872296AE"), 18);
        let exchange_rate = ExchangeRateScale::compound(market.decimals, underlying.decimals)?;

        Ok(FarmConfig {
            chain: Chain::base(),
            farm: address!("0xdf095422e096f7D1Dd9b05a027DDaDb29b944E30"),
            reward_distributor: address!("0xe9005b078701e2A0948D2EaC43010D35870Ad9d2"),
            reward_decimals: RewardDecimals::uniform(18)
                .with_override(reward_token.address, reward_token.decimals),
            underlying,
            market,
            reward_token,
            exchange_rate,
            default_withdraw_amount: "503".to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Assets whose balances a withdrawal simulation diffs.
    pub fn tracked_assets(&self) -> Vec<Asset> {
        vec![self.underlying.clone(), self.reward_token.clone()]
    }
}

/// Edge-of-process options before environment resolution.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub chain: Option<String>,
    pub rpc_url: Option<String>,
    pub block: Option<u64>,
    pub from: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub farm: FarmConfig,
    pub block: Option<u64>,
    pub caller: Option<CallerIdentity>,
    pub timeout: Option<Duration>,
}

impl RuntimeConfig {
    pub fn from_cli(cli: &CliOptions) -> Result<Self> {
        Self::from_cli_with_env(cli, &std::env::vars().collect())
    }

    /// Flags win over environment, environment wins over the config file.
    pub fn from_cli_with_env(cli: &CliOptions, env: &HashMap<String, String>) -> Result<Self> {
        let mut farm = match &cli.config {
            Some(path) => FarmConfig::load(path)?,
            None => FarmConfig::base_eurc()?,
        };

        if let Some(name) = &cli.chain {
            farm.chain = Chain::from_name(name)
                .ok_or_else(|| anyhow!("Unknown chain '{name}'. Use base, ethereum, arbitrum or optimism."))?;
        }

        let rpc_override = cli
            .rpc_url
            .clone()
            .or_else(|| env.get(RPC_URL_ENV).filter(|v| !v.is_empty()).cloned());
        if let Some(url) = rpc_override {
            farm.chain = farm.chain.with_rpc_url(url);
        }

        let caller = match (&cli.from, env.get(PRIVATE_KEY_ENV).filter(|v| !v.is_empty())) {
            (Some(from), _) => {
                let addr: Address = from
                    .parse()
                    .map_err(|e| anyhow!("Invalid --from address '{from}': {e}"))?;
                Some(CallerIdentity(addr))
            }
            (None, Some(key)) => {
                let signer: PrivateKeySigner = key
                    .trim_start_matches("0x")
                    .parse()
                    .map_err(|e| anyhow!("Invalid {PRIVATE_KEY_ENV}: {e}"))?;
                Some(CallerIdentity(signer.address()))
            }
            (None, None) => None,
        };

        let timeout = match cli.timeout_secs {
            Some(0) => bail!("--timeout-secs must be positive"),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(RuntimeConfig {
            farm,
            block: cli.block,
            caller,
            timeout,
        })
    }

    /// The identity simulations run as.
    pub fn require_caller(&self) -> Result<CallerIdentity> {
        self.caller.ok_or_else(|| {
            anyhow!(
                "No caller identity. Pass --from <address> or set {PRIVATE_KEY_ENV} \
                 (hex private key) so the dry run executes as the farm's owner."
            )
        })
    }
}
