pub mod backtest_usecase;
pub mod live_trading_usecase;
pub mod trading_bot_usecase;

// Re-export public API
pub use backtest_usecase::{BacktestInput, BacktestTradingBotUseCase};
pub use live_trading_usecase::LiveTradingUseCase;
pub use trading_bot_usecase::{
    CreateTradingBotUseCase, ListTradingBotsUseCase, StartTradingBotUseCase, StopTradingBotUseCase,
};
