
use std::sync::atomic::Ordering;
use std::time::Duration;

use alloy::primitives::Address;

use farm_probe::config::FarmConfig;
use farm_probe::ledger::{CallerIdentity, CancelToken, ReadCall};
use farm_probe::model::FixedPointAmount;
use farm_probe::{Engine, EngineError, report};

use mock_ledger::*;

fn scenario_ledger() -> MockLedger {
    let m = market().address;
    MockLedger::new()
        .with_read(ReadCall::balance_of(m, farm_addr()), 1_000_000_000)
        .with_read(ReadCall::exchange_rate_stored(m), 220_000_000_000_000_000)
        .with_read(ReadCall::borrow_balance_current(m, farm_addr()), 1_500_000)
        .with_reward(reward_token().address, 1_000, 300, 600)
        .with_reward(Address::repeat_byte(0x42), 7, 7, 7)
}

#[tokio::test]
async fn test_check_position_scenario() {
    let engine = Engine::new(scenario_ledger(), test_config());
    let report = engine.check_position(&CancelToken::never()).await.unwrap();

    assert_eq!(report.collateral_balance.to_decimal_string(), "10.0");
    assert_eq!(report.exchange_rate.to_decimal_string(), "0.22");
    assert_eq!(*report.snapshot.supplied(), FixedPointAmount::from_i128(2_200_000, 6));
    assert_eq!(*report.snapshot.borrowed(), FixedPointAmount::from_i128(1_500_000, 6));
    assert_eq!(*report.snapshot.net(), FixedPointAmount::from_i128(700_000, 6));

    let rewards = &report.rewards.entries;
    assert_eq!(rewards.len(), 2);
    assert_eq!(rewards[0].emission_token, reward_token().address);
    assert_eq!(rewards[0].total, FixedPointAmount::from_i128(1_000, 18));
    assert_eq!(rewards[0].supply_side, FixedPointAmount::from_i128(300, 18));
    assert_eq!(rewards[0].borrow_side, FixedPointAmount::from_i128(600, 18));
    assert_eq!(rewards[1].total, FixedPointAmount::from_i128(7, 18));
}

#[tokio::test]
async fn test_read_groups_are_issued_concurrently() {
    let ledger = scenario_ledger().with_delay(Duration::from_millis(20));
    let engine = Engine::new(ledger, test_config());
    engine.check_position(&CancelToken::never()).await.unwrap();

    // three market reads plus the reward read, all outstanding together
    assert_eq!(engine.ledger().max_in_flight.load(Ordering::SeqCst), 4);
    assert_eq!(engine.ledger().read_calls.load(Ordering::SeqCst), 4);
    assert_eq!(engine.ledger().simulate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failure_yields_no_report() {
    let engine = Engine::new(scenario_ledger().unavailable("503 from upstream"), test_config());
    let err = engine.check_position(&CancelToken::never()).await.unwrap_err();
    assert_eq!(err, EngineError::LedgerUnavailable("503 from upstream".into()));
}

#[tokio::test]
async fn test_missing_read_fails_whole_check() {
    let m = market().address;
    let ledger = MockLedger::new()
        .with_read(ReadCall::balance_of(m, farm_addr()), 1)
        .with_read(ReadCall::exchange_rate_stored(m), 1);
    let engine = Engine::new(ledger, test_config());
    let err = engine.check_position(&CancelToken::never()).await.unwrap_err();
    assert!(matches!(err, EngineError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_cancellation_abandons_in_flight_reads() {
    let ledger = scenario_ledger().with_delay(Duration::from_secs(30));
    let engine = Engine::new(ledger, test_config());
    let (handle, cancel) = CancelToken::new();

    let canceller = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();
    };
    let (result, ()) = tokio::join!(engine.check_position(&cancel), canceller);
    assert_eq!(result.unwrap_err(), EngineError::Cancelled);
}

#[tokio::test]
async fn test_deadline_surfaces_cancelled() {
    let ledger = scenario_ledger().with_delay(Duration::from_secs(30));
    let engine = Engine::new(ledger, test_config());
    let cancel = CancelToken::never().with_timeout(Duration::from_millis(10));
    assert_eq!(
        engine.check_position(&cancel).await.unwrap_err(),
        EngineError::Cancelled
    );
}

#[tokio::test]
async fn test_default_config_uses_compound_convention() {
    let cfg = FarmConfig::base_eurc().unwrap();
    let m = cfg.market.address;
    let farm = cfg.farm;
    let ledger = MockLedger::new()
        .with_read(ReadCall::balance_of(m, farm), 50_000_000_000)
        .with_read(ReadCall::exchange_rate_stored(m), 205_000_000_000_000)
        .with_read(ReadCall::borrow_balance_current(m, farm), 8_000_000);
    let engine = Engine::new(ledger, cfg);

    let report = engine.check_position(&CancelToken::never()).await.unwrap();
    assert_eq!(report.snapshot.supplied().to_decimal_string(), "10.25");
    assert_eq!(report.snapshot.net().to_decimal_string(), "2.25");
    assert!(report.rewards.is_empty());
}

#[tokio::test]
async fn test_engine_simulates_configured_assets() {
    let ledger = scenario_ledger()
        .with_read(ReadCall::balance_of(underlying().address, farm_addr()), 0)
        .with_read(ReadCall::balance_of(reward_token().address, farm_addr()), 0)
        .with_simulation(ScriptedSim::Revert("insufficient liquidity".into()));
    let engine = Engine::new(ledger, test_config());

    let amount = FixedPointAmount::parse("503", 6).unwrap();
    let preview = engine
        .simulate_withdraw(
            &amount,
            CallerIdentity(Address::repeat_byte(0xca)),
            &CancelToken::never(),
        )
        .await
        .unwrap();
    assert_eq!(preview.result.revert_reason(), Some("insufficient liquidity"));
    assert!(preview.result.balance_delta().is_empty());
    assert_eq!(preview.pre_state.len(), 2);

    let call = engine.ledger().last_simulation.lock().unwrap().clone().unwrap();
    assert_eq!(call.speculative_reads.len(), 2);
}

#[tokio::test]
async fn test_reverted_withdraw_report_lists_pre_state() {
    let ledger = scenario_ledger()
        .with_read(ReadCall::balance_of(underlying().address, farm_addr()), 100_000_000)
        .with_read(ReadCall::balance_of(reward_token().address, farm_addr()), 0)
        .with_simulation(ScriptedSim::Revert("insufficient liquidity".into()));
    let engine = Engine::new(ledger, test_config());
    let amount = FixedPointAmount::parse("503", 6).unwrap();

    let preview = engine
        .simulate_withdraw(
            &amount,
            CallerIdentity(Address::repeat_byte(0xca)),
            &CancelToken::never(),
        )
        .await
        .unwrap();
    let text = report::render_dry_run(&amount, &preview);

    assert!(text.contains("Pre-withdraw EURC: 100.0"));
    assert!(text.contains("Pre-withdraw WELL: 0.0"));
    assert!(text.ends_with("withdraw(503.0) would revert: insufficient liquidity\n"));
}

#[tokio::test]
async fn test_position_reads_pinned_to_resolved_block() {
    let engine = Engine::new(scenario_ledger(), test_config());

    let report = engine.check_position(&CancelToken::never()).await.unwrap();
    assert_eq!(report.block, GENESIS_HEAD);
    assert_eq!(engine.ledger().block_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.ledger().blocks_used(), vec![GENESIS_HEAD; 4]);

    let again = engine.check_position(&CancelToken::never()).await.unwrap();
    assert_eq!(again.block, GENESIS_HEAD + 1);
    assert_eq!(engine.ledger().blocks_used()[4..], [GENESIS_HEAD + 1; 4]);
}
