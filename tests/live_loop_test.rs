//! Interval-driven live loop and the coordinator that owns it.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use position_trader::adapter::TradingCoordinator;
use position_trader::application::service::{share_bot, LiveTradingExecutionContext, TradingExecutionContext};
use position_trader::application::usecase::{LiveTradingUseCase, StopTradingBotUseCase};
use position_trader::domain::model::{BotStatus, OrderSide, TradingDecision};
use position_trader::domain::repository::TradingBotRepository;
use position_trader::infrastructure::persistence::{
    InMemoryTradingBotRepository, InMemoryTradingDecisionLogRepository,
};

const HOUR: Duration = Duration::from_secs(3_600);

fn flat_market() -> Arc<SteppingMarketData> {
    Arc::new(SteppingMarketData::new(candles(&[100.0; 10]), 100))
}

fn live_context(repository: Arc<InMemoryTradingBotRepository>) -> Arc<LiveTradingExecutionContext> {
    Arc::new(LiveTradingExecutionContext::new(
        Arc::new(FakeOrderGateway::new()),
        repository,
        Arc::new(InMemoryTradingDecisionLogRepository::new()),
        Arc::new(RecordingPublisher::new()),
        Duration::from_secs(5),
    ))
}

#[tokio::test(start_paused = true)]
async fn loop_ticks_once_per_interval_until_stopped() {
    let repository = Arc::new(InMemoryTradingBotRepository::new());
    let mut bot = constant_bot(TradingDecision::Hold, false);
    bot.start().unwrap();
    repository.save(&bot).await.unwrap();

    let market = flat_market();
    let context = live_context(repository.clone());
    let use_case = LiveTradingUseCase::new(repository.clone(), market.clone(), context.clone());

    let handle = tokio::spawn(async move { use_case.run(share_bot(bot)).await });

    // Ticks at 0h, 1h, 2h and 3h
    tokio::time::sleep(HOUR * 3 + Duration::from_secs(1)).await;
    assert_eq!(market.calls(), 4);

    context.stop();
    handle.await.unwrap().unwrap();
    assert_eq!(market.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn loop_exits_when_bot_is_stopped_in_repository() {
    let repository = Arc::new(InMemoryTradingBotRepository::new());
    let mut bot = constant_bot(TradingDecision::Hold, false);
    bot.start().unwrap();
    repository.save(&bot).await.unwrap();
    let bot_id = bot.id();

    let market = flat_market();
    let use_case = LiveTradingUseCase::new(repository.clone(), market.clone(), live_context(repository.clone()));
    let handle = tokio::spawn(async move { use_case.run(share_bot(bot)).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    StopTradingBotUseCase::new(repository.clone())
        .execute(bot_id)
        .await
        .unwrap();

    handle.await.unwrap().unwrap();
    assert_eq!(market.calls(), 1);
}

#[tokio::test]
async fn loop_never_ticks_a_bot_that_was_not_started() {
    let repository = Arc::new(InMemoryTradingBotRepository::new());
    let bot = constant_bot(TradingDecision::Buy, false);
    repository.save(&bot).await.unwrap();

    let market = flat_market();
    let use_case = LiveTradingUseCase::new(repository.clone(), market.clone(), live_context(repository));
    use_case.run(share_bot(bot)).await.unwrap();

    assert_eq!(market.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn coordinator_starts_and_stops_bots() {
    let repository = Arc::new(InMemoryTradingBotRepository::new());
    let bot = constant_bot(TradingDecision::Buy, false);
    let bot_id = bot.id();
    repository.save(&bot).await.unwrap();

    let gateway = Arc::new(FakeOrderGateway::new());
    let coordinator = TradingCoordinator::new(
        repository.clone(),
        Arc::new(InMemoryTradingDecisionLogRepository::new()),
        gateway.clone(),
        flat_market(),
        Arc::new(RecordingPublisher::new()),
        Duration::from_secs(5),
    );

    let shared = coordinator.start_bot(bot_id).await.unwrap();
    assert_eq!(coordinator.running_bots().await, vec![bot_id]);

    // First tick runs immediately and buys; later ticks are state conflicts
    tokio::time::sleep(HOUR * 2 + Duration::from_secs(1)).await;
    assert_eq!(gateway.orders().len(), 1);
    assert!(shared.lock().await.is_positioned());

    coordinator.stop_bot(bot_id).await.unwrap();
    assert!(coordinator.running_bots().await.is_empty());

    let stored = repository.get_by_id(bot_id).await.unwrap();
    assert_eq!(stored.status(), BotStatus::Stopped);
    assert!(stored.is_positioned());

    assert!(coordinator.stop_bot(bot_id).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn coordinator_resumes_running_bots() {
    let repository = Arc::new(InMemoryTradingBotRepository::new());
    for _ in 0..2 {
        let mut bot = constant_bot(TradingDecision::Hold, false);
        bot.start().unwrap();
        repository.save(&bot).await.unwrap();
    }
    repository
        .save(&constant_bot(TradingDecision::Hold, false))
        .await
        .unwrap();

    let coordinator = TradingCoordinator::new(
        repository.clone(),
        Arc::new(InMemoryTradingDecisionLogRepository::new()),
        Arc::new(FakeOrderGateway::new()),
        flat_market(),
        Arc::new(RecordingPublisher::new()),
        Duration::from_secs(5),
    );

    assert_eq!(coordinator.resume_running_bots().await.unwrap(), 2);
    assert_eq!(coordinator.running_bots().await.len(), 2);

    coordinator.shutdown().await;
    assert!(coordinator.running_bots().await.is_empty());
    assert!(repository
        .get_all_by_status(BotStatus::Running)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_resume_keeps_one_loop_per_bot() {
    let repository = Arc::new(InMemoryTradingBotRepository::new());
    let started = constant_bot(TradingDecision::Buy, false);
    let started_id = started.id();
    repository.save(&started).await.unwrap();
    let mut resumed = constant_bot(TradingDecision::Buy, false);
    resumed.start().unwrap();
    repository.save(&resumed).await.unwrap();

    let gateway = Arc::new(FakeOrderGateway::new());
    let market = flat_market();
    let coordinator = TradingCoordinator::new(
        repository.clone(),
        Arc::new(InMemoryTradingDecisionLogRepository::new()),
        gateway.clone(),
        market.clone(),
        Arc::new(RecordingPublisher::new()),
        Duration::from_secs(5),
    );

    let shared = coordinator.start_bot(started_id).await.unwrap();
    assert_eq!(coordinator.resume_running_bots().await.unwrap(), 1);
    assert_eq!(coordinator.resume_running_bots().await.unwrap(), 0);
    assert_eq!(coordinator.running_bots().await.len(), 2);

    // Two loops tick at 0h, 1h and 2h; each bot buys exactly once
    tokio::time::sleep(HOUR * 2 + Duration::from_secs(1)).await;
    assert_eq!(market.calls(), 6);
    assert_eq!(gateway.count(OrderSide::Buy), 2);
    assert!(shared.lock().await.is_positioned());

    coordinator.shutdown().await;
    assert!(coordinator.running_bots().await.is_empty());
}
