use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::primitives::{Address, BlockNumber, Bytes, U64, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use alloy::sol_types::{Panic, Revert, SolCall, SolError};
use alloy::transports::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    LedgerClient, ReadCall, ReadMethod, RewardInfo, RewardQuery, SimulateCall, SimulateMethod,
    SimulateOutcome,
};
use crate::error::{EngineError, Result};

// ── Contract interfaces ────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IMarketToken {
        function exchangeRateStored() external view returns (uint256);
        function borrowBalanceCurrent(address account) external returns (uint256);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IRewardDistributor {
        struct RewardInfo {
            address emissionToken;
            uint256 totalAmount;
            uint256 supplySide;
            uint256 borrowSide;
        }

        function getOutstandingRewardsForUser(address mToken, address user)
            external view returns (RewardInfo[] memory);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ILeveragedYieldFarm {
        function withdraw(uint256 amount) external;
    }
}

// ── eth_simulateV1 wire types ──────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulatePayload {
    block_state_calls: Vec<SimBlock>,
    validation: bool,
}

#[derive(Debug, Clone, Serialize)]
struct SimBlock {
    calls: Vec<SimCall>,
}

#[derive(Debug, Clone, Serialize)]
struct SimCall {
    from: Address,
    to: Address,
    data: Bytes,
}

#[derive(Debug, Deserialize)]
struct SimulatedBlock {
    calls: Vec<SimCallResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimCallResult {
    #[serde(default)]
    return_data: Bytes,
    status: U64,
    #[serde(default)]
    error: Option<SimCallError>,
}

#[derive(Debug, Deserialize)]
struct SimCallError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Bytes>,
}

// ── Ledger client ──────────────────────────────────────────────────

/// JSON-RPC ledger client for an EVM chain.
///
/// Calls are evaluated at the block the engine resolved for the operation:
/// the pinned block when one was given, otherwise the head at resolve time.
pub struct EvmLedger<P> {
    provider: P,
    pinned: Option<BlockNumber>,
}

impl EvmLedger<DynProvider> {
    /// Read-only HTTP connection. No signer is attached: nothing is ever sent.
    pub fn connect_http(rpc_url: &str, block: Option<BlockNumber>) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| EngineError::LedgerUnavailable(format!("invalid RPC URL {rpc_url}: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self::new(provider, block))
    }
}

impl<P: Provider> EvmLedger<P> {
    pub fn new(provider: P, pinned: Option<BlockNumber>) -> Self {
        Self { provider, pinned }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync> LedgerClient for EvmLedger<P> {
    async fn resolve_block(&self) -> Result<BlockNumber> {
        match self.pinned {
            Some(block) => Ok(block),
            None => self
                .provider
                .get_block_number()
                .await
                .map_err(|e| transport_error("eth_blockNumber", e)),
        }
    }

    async fn read_quantity(&self, call: &ReadCall, at: BlockNumber) -> Result<U256> {
        debug!(contract = %short_addr(&call.contract), method = ?call.method, block = at, "read");
        let value = match &call.method {
            ReadMethod::BalanceOf { holder } => IERC20::new(call.contract, &self.provider)
                .balanceOf(*holder)
                .block(BlockId::number(at))
                .call()
                .await
                .map_err(|e| contract_error("balanceOf", e))?,
            ReadMethod::ExchangeRateStored => IMarketToken::new(call.contract, &self.provider)
                .exchangeRateStored()
                .block(BlockId::number(at))
                .call()
                .await
                .map_err(|e| contract_error("exchangeRateStored", e))?,
            ReadMethod::BorrowBalanceCurrent { borrower } => {
                IMarketToken::new(call.contract, &self.provider)
                    .borrowBalanceCurrent(*borrower)
                    .block(BlockId::number(at))
                    .call()
                    .await
                    .map_err(|e| contract_error("borrowBalanceCurrent", e))?
            }
        };
        Ok(value)
    }

    async fn read_rewards(&self, query: &RewardQuery, at: BlockNumber) -> Result<Vec<RewardInfo>> {
        debug!(
            distributor = %short_addr(&query.distributor),
            market = %short_addr(&query.market),
            "read rewards"
        );
        let infos = IRewardDistributor::new(query.distributor, &self.provider)
            .getOutstandingRewardsForUser(query.market, query.user)
            .block(BlockId::number(at))
            .call()
            .await
            .map_err(|e| contract_error("getOutstandingRewardsForUser", e))?;

        Ok(infos
            .into_iter()
            .map(|info| RewardInfo {
                emission_token: info.emissionToken,
                total_amount: info.totalAmount,
                supply_side: info.supplySide,
                borrow_side: info.borrowSide,
            })
            .collect())
    }

    async fn simulate_call(&self, call: &SimulateCall, at: BlockNumber) -> Result<SimulateOutcome> {
        let from = call.caller.0;
        let primary = match &call.method {
            SimulateMethod::Withdraw { amount } => SimCall {
                from,
                to: call.contract,
                data: ILeveragedYieldFarm::withdrawCall { amount: *amount }
                    .abi_encode()
                    .into(),
            },
        };

        let mut calls = vec![primary];
        calls.extend(call.speculative_reads.iter().map(|read| SimCall {
            from,
            to: read.contract,
            data: encode_read(&read.method),
        }));

        let payload = SimulatePayload {
            block_state_calls: vec![SimBlock { calls }],
            validation: false,
        };

        debug!(
            contract = %short_addr(&call.contract),
            method = ?call.method,
            reads = call.speculative_reads.len(),
            block = at,
            "eth_simulateV1"
        );
        let blocks: Vec<SimulatedBlock> = self
            .provider
            .raw_request("eth_simulateV1".into(), (payload, BlockNumberOrTag::Number(at)))
            .await
            .map_err(|e| transport_error("eth_simulateV1", e))?;

        outcome_from_blocks(call, blocks)
    }
}

/// Map an `eth_simulateV1` response onto the request: the first call is the
/// simulated method, the rest answer `speculative_reads` in order.
fn outcome_from_blocks(call: &SimulateCall, blocks: Vec<SimulatedBlock>) -> Result<SimulateOutcome> {
    let results = match blocks.into_iter().next() {
        Some(block) => block.calls,
        None => {
            return Err(EngineError::MalformedResponse(
                "eth_simulateV1 returned no blocks".into(),
            ));
        }
    };
    let mut results = results.into_iter();

    let first = results.next().ok_or_else(|| {
        EngineError::MalformedResponse("eth_simulateV1 returned no call results".into())
    })?;
    if first.status != U64::from(1) {
        return Ok(SimulateOutcome::Reverted {
            reason: revert_reason(&first),
        });
    }

    let mut speculative_reads = Vec::with_capacity(call.speculative_reads.len());
    for (read, result) in call.speculative_reads.iter().zip(results.by_ref()) {
        if result.status != U64::from(1) {
            return Err(EngineError::MalformedResponse(format!(
                "speculative read {:?} on {} failed: {}",
                read.method,
                short_addr(&read.contract),
                revert_reason(&result)
            )));
        }
        speculative_reads.push(decode_read(&read.method, &result.return_data)?);
    }
    if speculative_reads.len() != call.speculative_reads.len() {
        return Err(EngineError::MalformedResponse(format!(
            "expected {} speculative reads, node returned {}",
            call.speculative_reads.len(),
            speculative_reads.len()
        )));
    }

    Ok(SimulateOutcome::Success { speculative_reads })
}

// ── Encoding helpers ───────────────────────────────────────────────

fn encode_read(method: &ReadMethod) -> Bytes {
    match method {
        ReadMethod::BalanceOf { holder } => IERC20::balanceOfCall { account: *holder }.abi_encode(),
        ReadMethod::ExchangeRateStored => IMarketToken::exchangeRateStoredCall {}.abi_encode(),
        ReadMethod::BorrowBalanceCurrent { borrower } => {
            IMarketToken::borrowBalanceCurrentCall { account: *borrower }.abi_encode()
        }
    }
    .into()
}

fn decode_read(method: &ReadMethod, data: &[u8]) -> Result<U256> {
    let decoded = match method {
        ReadMethod::BalanceOf { .. } => IERC20::balanceOfCall::abi_decode_returns(data),
        ReadMethod::ExchangeRateStored => IMarketToken::exchangeRateStoredCall::abi_decode_returns(data),
        ReadMethod::BorrowBalanceCurrent { .. } => {
            IMarketToken::borrowBalanceCurrentCall::abi_decode_returns(data)
        }
    };
    decoded.map_err(|e| EngineError::MalformedResponse(format!("{method:?}: {e}")))
}

/// `Error(string)` yields its bare message, `Panic(uint256)` its code.
fn decode_reason(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason).filter(|r| !r.is_empty());
    }
    Panic::abi_decode(data)
        .ok()
        .map(|panic| format!("panic code {:#x}", panic.code))
}

fn revert_reason(result: &SimCallResult) -> String {
    let payloads: Vec<&Bytes> = [result.error.as_ref().and_then(|e| e.data.as_ref()), Some(&result.return_data)]
        .into_iter()
        .flatten()
        .filter(|data| !data.is_empty())
        .collect();

    payloads
        .iter()
        .find_map(|data| decode_reason(data))
        // custom error: show the raw selector and arguments
        .or_else(|| payloads.first().map(|data| data.to_string()))
        .or_else(|| {
            result
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .filter(|m| !m.is_empty())
        })
        .unwrap_or_else(|| "execution reverted".to_string())
}

fn transport_error(what: &str, e: TransportError) -> EngineError {
    match e.as_error_resp() {
        // the call itself reverted; the node is fine
        Some(resp) if resp.as_revert_data().is_some() => {
            EngineError::MalformedResponse(format!("{what} reverted: {}", resp.message))
        }
        Some(resp) => EngineError::LedgerUnavailable(format!("{what}: {} ({})", resp.message, resp.code)),
        None => EngineError::LedgerUnavailable(format!("{what}: {e}")),
    }
}

fn contract_error(what: &str, e: alloy::contract::Error) -> EngineError {
    match e {
        alloy::contract::Error::TransportError(e) => transport_error(what, e),
        other => EngineError::MalformedResponse(format!("{what}: {other}")),
    }
}

/// Format an address for display (shortened).
pub fn short_addr(addr: &Address) -> String {
    let s = format!("{addr}");
    if s.len() > 10 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ledger::CallerIdentity;

    fn error_string(reason: &str) -> Vec<u8> {
        Revert {
            reason: reason.to_string(),
        }
        .abi_encode()
    }

    fn word(value: u64) -> String {
        format!("0x{value:064x}")
    }

    fn withdraw_with_two_reads() -> SimulateCall {
        let farm = Address::repeat_byte(0xfa);
        SimulateCall {
            contract: farm,
            method: SimulateMethod::Withdraw {
                amount: U256::from(503_000_000u64),
            },
            caller: CallerIdentity(Address::repeat_byte(0xca)),
            speculative_reads: vec![
                ReadCall::balance_of(Address::repeat_byte(0xe0), farm),
                ReadCall::balance_of(Address::repeat_byte(0x77), farm),
            ],
        }
    }

    fn blocks(value: serde_json::Value) -> Vec<SimulatedBlock> {
        serde_json::from_value(value).unwrap()
    }

    fn result(status: u64, return_data: Bytes, error: Option<SimCallError>) -> SimCallResult {
        SimCallResult {
            return_data,
            status: U64::from(status),
            error,
        }
    }

    #[test]
    fn test_decode_read_single_word() {
        let word = U256::from(1_500_000u64);
        let data = word.to_be_bytes::<32>();
        let decoded = decode_read(&ReadMethod::ExchangeRateStored, &data).unwrap();
        assert_eq!(decoded, word);
        assert!(decode_read(&ReadMethod::ExchangeRateStored, &data[..8]).is_err());
    }

    #[test]
    fn test_revert_reason_from_error_string() {
        let r = result(0, Bytes::from(error_string("insufficient liquidity")), None);
        assert_eq!(revert_reason(&r), "insufficient liquidity");
    }

    #[test]
    fn test_revert_reason_from_panic() {
        let data = Panic {
            code: U256::from(0x11u64),
        }
        .abi_encode();
        let r = result(0, Bytes::from(data), None);
        assert_eq!(revert_reason(&r), "panic code 0x11");
    }

    #[test]
    fn test_revert_reason_falls_back_to_message() {
        let r = result(
            0,
            Bytes::new(),
            Some(SimCallError {
                message: "out of gas".into(),
                data: None,
            }),
        );
        assert_eq!(revert_reason(&r), "out of gas");
        assert_eq!(revert_reason(&result(0, Bytes::new(), None)), "execution reverted");
    }

    #[test]
    fn test_revert_reason_raw_custom_error() {
        let r = result(0, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]), None);
        assert_eq!(revert_reason(&r), "0xdeadbeef");
    }

    #[test]
    fn test_simulate_payload_shape() {
        let payload = SimulatePayload {
            block_state_calls: vec![SimBlock {
                calls: vec![SimCall {
                    from: Address::ZERO,
                    to: Address::ZERO,
                    data: encode_read(&ReadMethod::ExchangeRateStored),
                }],
            }],
            validation: false,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["blockStateCalls"][0]["calls"][0]["data"].is_string());
        assert_eq!(json["validation"], false);
    }

    #[test]
    fn test_short_addr() {
        let addr: Address = "0xdf095422e096f7D1Dd9b05a027DDaDb29b944E30".parse().unwrap();
        assert_eq!(short_addr(&addr), "0xdf09...4E30");
    }

    // ── eth_simulateV1 response mapping ──────────────────────────────

    #[test]
    fn test_outcome_success_reads_in_order() {
        let call = withdraw_with_two_reads();
        let response = blocks(json!([{
            "number": "0x1",
            "calls": [
                { "returnData": "0x", "status": "0x1", "gasUsed": "0x5208", "logs": [] },
                { "returnData": word(603_000_000), "status": "0x1", "gasUsed": "0x100", "logs": [] },
                { "returnData": word(0), "status": "0x1", "gasUsed": "0x100", "logs": [] }
            ]
        }]));

        let outcome = outcome_from_blocks(&call, response).unwrap();
        assert_eq!(
            outcome,
            SimulateOutcome::Success {
                speculative_reads: vec![U256::from(603_000_000u64), U256::ZERO],
            }
        );
    }

    #[test]
    fn test_outcome_revert_uses_error_data() {
        let call = withdraw_with_two_reads();
        let data = Bytes::from(error_string("insufficient liquidity")).to_string();
        let response = blocks(json!([{
            "calls": [
                {
                    "returnData": "0x",
                    "status": "0x0",
                    "error": { "code": 3, "message": "execution reverted", "data": data }
                },
                { "returnData": word(1), "status": "0x1" },
                { "returnData": word(2), "status": "0x1" }
            ]
        }]));

        let outcome = outcome_from_blocks(&call, response).unwrap();
        assert_eq!(
            outcome,
            SimulateOutcome::Reverted {
                reason: "insufficient liquidity".into()
            }
        );
    }

    #[test]
    fn test_outcome_failed_speculative_read_is_malformed() {
        let call = withdraw_with_two_reads();
        let response = blocks(json!([{
            "calls": [
                { "returnData": "0x", "status": "0x1" },
                { "returnData": word(1), "status": "0x1" },
                { "returnData": "0x", "status": "0x0", "error": { "message": "invalid opcode" } }
            ]
        }]));

        let err = outcome_from_blocks(&call, response).unwrap_err();
        assert!(matches!(err, EngineError::MalformedResponse(ref m) if m.contains("invalid opcode")));
    }

    #[test]
    fn test_outcome_short_result_is_malformed() {
        let call = withdraw_with_two_reads();
        let response = blocks(json!([{
            "calls": [
                { "returnData": "0x", "status": "0x1" },
                { "returnData": word(1), "status": "0x1" }
            ]
        }]));

        let err = outcome_from_blocks(&call, response).unwrap_err();
        assert!(matches!(err, EngineError::MalformedResponse(_)));
        assert!(matches!(
            outcome_from_blocks(&call, Vec::new()),
            Err(EngineError::MalformedResponse(_))
        ));
    }
}
