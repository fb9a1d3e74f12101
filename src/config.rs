// src/config.rs
use crate::application::service::BacktestConfig;
use crate::domain::errors::{AppError, AppResult};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Live trading or historical replay
    pub mode: RunMode,

    /// Exchange API credentials
    pub exchange: ExchangeConfig,

    /// Bot to run
    pub bot: BotConfig,

    /// Backtest range and data source
    pub backtest: BacktestSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Live,
    Backtest,
}

/// Exchange API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Exchange name (e.g., "binance")
    pub name: String,

    /// API key
    pub api_key: String,

    /// API secret
    pub api_secret: String,

    /// Use testnet
    pub testnet: bool,

    /// Upper bound for exchange and persistence calls
    pub request_timeout_secs: u64,
}

/// Bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    pub strategy: String,
    pub strategy_params: serde_json::Value,
    pub interval_seconds: u64,
    pub base_quantity: f64,
    pub trade_amount: f64,
    pub currency: String,
    pub trading_fees_percent: f64,
    pub minimum_profit_threshold_percent: f64,
    pub stop_loss_percent: Option<f64>,
    pub use_fixed_quantity: bool,
    pub initial_capital: f64,
}

/// Backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Range start, RFC 3339
    pub start_date: Option<String>,

    /// Range end, RFC 3339
    pub end_date: Option<String>,

    /// Candles handed to the strategy per tick
    pub window_size: usize,

    /// JSON file of candles to replay instead of fetching from the exchange
    pub kline_file: Option<String>,

    /// Where to write the JSON report
    pub report_file: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,

    /// Log to file
    pub to_file: bool,

    /// Log file path
    pub file_path: Option<String>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let mode = match env::var("RUN_MODE").unwrap_or_else(|_| "backtest".to_string()).to_lowercase().as_str() {
            "live" => RunMode::Live,
            "backtest" => RunMode::Backtest,
            other => return Err(AppError::Config(format!("Unknown RUN_MODE: {}", other))),
        };

        let api_key = env::var("API_KEY").unwrap_or_default();
        let api_secret = env::var("API_SECRET").unwrap_or_default();
        if mode == RunMode::Live && (api_key.is_empty() || api_secret.is_empty()) {
            return Err(AppError::Config(
                "API_KEY and API_SECRET are required in live mode".to_string(),
            ));
        }

        let exchange_config = ExchangeConfig {
            name: env::var("EXCHANGE_NAME").unwrap_or_else(|_| "binance".to_string()),
            api_key,
            api_secret,
            testnet: env_or("USE_TESTNET", false),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.exchange.request_timeout_secs),
        };

        let strategy_params = match env::var("STRATEGY_PARAMS") {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Config(format!("STRATEGY_PARAMS is not valid JSON: {}", e))
            })?,
            Err(_) => defaults.bot.strategy_params.clone(),
        };

        let bot_config = BotConfig {
            symbol: env::var("TRADING_SYMBOL").unwrap_or(defaults.bot.symbol),
            strategy: env::var("STRATEGY").unwrap_or(defaults.bot.strategy),
            strategy_params,
            interval_seconds: env_or("INTERVAL_SECONDS", defaults.bot.interval_seconds),
            base_quantity: env_or("BASE_QUANTITY", defaults.bot.base_quantity),
            trade_amount: env_or("TRADE_AMOUNT", defaults.bot.trade_amount),
            currency: env::var("CURRENCY").unwrap_or(defaults.bot.currency),
            trading_fees_percent: env_or("TRADING_FEES_PERCENT", defaults.bot.trading_fees_percent),
            minimum_profit_threshold_percent: env_or(
                "MINIMUM_PROFIT_THRESHOLD_PERCENT",
                defaults.bot.minimum_profit_threshold_percent,
            ),
            stop_loss_percent: env::var("STOP_LOSS_PERCENT").ok().and_then(|v| v.parse().ok()),
            use_fixed_quantity: env_or("USE_FIXED_QUANTITY", defaults.bot.use_fixed_quantity),
            initial_capital: env_or("INITIAL_CAPITAL", defaults.bot.initial_capital),
        };

        let backtest_config = BacktestSettings {
            start_date: env::var("BACKTEST_START").ok(),
            end_date: env::var("BACKTEST_END").ok(),
            window_size: env_or("BACKTEST_WINDOW_SIZE", defaults.backtest.window_size),
            kline_file: env::var("BACKTEST_KLINE_FILE").ok(),
            report_file: env::var("BACKTEST_REPORT_FILE").ok(),
        };

        // Create Logging config
        let logging_config = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            to_file: env_or("LOG_TO_FILE", false),
            file_path: env::var("LOG_FILE_PATH").ok(),
        };

        Ok(Config {
            mode,
            exchange: exchange_config,
            bot: bot_config,
            backtest: backtest_config,
            logging: logging_config,
        })
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let mut file = File::open(path).map_err(|e| {
            AppError::Config(format!("Failed to open config file: {}", e))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file: {}", e))
        })?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::Config(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, contents).map_err(|e| {
            AppError::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Backtest engine parameters derived from the bot section
    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.bot.initial_capital,
            trade_amount: self.bot.trade_amount,
            currency: self.bot.currency.clone(),
            trading_fees_percent: self.bot.trading_fees_percent,
            minimum_profit_threshold_percent: self.bot.minimum_profit_threshold_percent,
            interval_seconds: self.bot.interval_seconds,
            window_size: self.backtest.window_size,
            base_quantity: self.bot.base_quantity,
            use_fixed_quantity: self.bot.use_fixed_quantity,
            stop_loss_percent: self.bot.stop_loss_percent,
        }
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> AppResult<()> {
        let mut builder = env_logger::Builder::new();

        // Set log level
        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };

        builder.filter_level(log_level);

        // Configure output
        if self.logging.to_file {
            if let Some(file_path) = &self.logging.file_path {
                let file = File::create(file_path).map_err(|e| {
                    AppError::Config(format!("Failed to create log file: {}", e))
                })?;

                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }

        builder
            .try_init()
            .map_err(|e| AppError::Config(format!("Failed to initialize logger: {}", e)))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: RunMode::Backtest,
            exchange: ExchangeConfig {
                name: "binance".to_string(),
                api_key: "".to_string(),
                api_secret: "".to_string(),
                testnet: true,
                request_timeout_secs: 10,
            },
            bot: BotConfig {
                symbol: "BTCUSDT".to_string(),
                strategy: "MovingAverage".to_string(),
                strategy_params: serde_json::json!({"FastWindow": 7, "SlowWindow": 40}),
                interval_seconds: 3_600,
                base_quantity: 0.001,
                trade_amount: 100.0,
                currency: "USDT".to_string(),
                trading_fees_percent: 0.1,
                minimum_profit_threshold_percent: 0.0,
                stop_loss_percent: None,
                use_fixed_quantity: false,
                initial_capital: 1_000.0,
            },
            backtest: BacktestSettings {
                start_date: None,
                end_date: None,
                window_size: 100,
                kline_file: None,
                report_file: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                to_file: false,
                file_path: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_file() {
        let path = env::temp_dir().join(format!("position_trader_config_{}.json", std::process::id()));
        let config = Config::default();
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.mode, RunMode::Backtest);
        assert_eq!(loaded.bot.symbol, "BTCUSDT");
        assert_eq!(loaded.bot.strategy_params["SlowWindow"], 40);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn backtest_config_mirrors_bot_section() {
        let config = Config::default();
        let backtest = config.backtest_config();
        assert_eq!(backtest.initial_capital, 1_000.0);
        assert_eq!(backtest.window_size, 100);
        assert_eq!(backtest.interval_seconds, 3_600);
        assert!(backtest.validate().is_ok());
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
