// src/infrastructure/exchange/binance.rs
// Binance spot adapter: market orders and candle history

use async_trait::async_trait;
use binance_spot_connector_rust::{
    http::Credentials,
    hyper::BinanceHttpClient,
    market::{self, klines::KlineInterval as BinanceKlineInterval},
    trade::{self, order::Side},
};
use chrono::{DateTime, Utc};
use hyper::client::HttpConnector;
use hyper_tls::HttpsConnector;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::application::dto::parser::parse_klines_body;
use crate::domain::errors::{ExchangeError, ExchangeResult};
use crate::domain::model::{Kline, KlineInterval, OrderConfirmation, OrderSide, Symbol};
use crate::domain::service::{KlineProvider, OrderGateway};

const TESTNET_URL: &str = "https://testnet.binance.vision";
const QUANTITY_DECIMALS: u32 = 8;

pub struct BinanceExchange {
    client: BinanceHttpClient<HttpsConnector<HttpConnector>>,
}

impl BinanceExchange {
    pub fn new(api_key: String, api_secret: String, testnet: bool) -> Self {
        let credentials = Credentials::from_hmac(api_key, api_secret);
        let client = if testnet {
            BinanceHttpClient::with_url(TESTNET_URL)
        } else {
            BinanceHttpClient::default()
        };
        Self {
            client: client.credentials(credentials),
        }
    }

    fn interval(interval: KlineInterval) -> BinanceKlineInterval {
        match interval {
            KlineInterval::Minutes1 => BinanceKlineInterval::Minutes1,
            KlineInterval::Minutes3 => BinanceKlineInterval::Minutes3,
            KlineInterval::Minutes5 => BinanceKlineInterval::Minutes5,
            KlineInterval::Minutes15 => BinanceKlineInterval::Minutes15,
            KlineInterval::Minutes30 => BinanceKlineInterval::Minutes30,
            KlineInterval::Hours1 => BinanceKlineInterval::Hours1,
            KlineInterval::Hours2 => BinanceKlineInterval::Hours2,
            KlineInterval::Hours4 => BinanceKlineInterval::Hours4,
            KlineInterval::Hours6 => BinanceKlineInterval::Hours6,
            KlineInterval::Hours8 => BinanceKlineInterval::Hours8,
            KlineInterval::Hours12 => BinanceKlineInterval::Hours12,
            KlineInterval::Days1 => BinanceKlineInterval::Days1,
            KlineInterval::Days3 => BinanceKlineInterval::Days3,
            KlineInterval::Weeks1 => BinanceKlineInterval::Weeks1,
            KlineInterval::Months1 => BinanceKlineInterval::Months1,
        }
    }

    async fn send_klines(&self, request: market::klines::Klines) -> ExchangeResult<Vec<Kline>> {
        let body = self
            .client
            .send(request)
            .await
            .map_err(|e| ExchangeError::Request(format!("{:?}", e)))?
            .into_body_str()
            .await
            .map_err(|e| ExchangeError::Request(format!("{:?}", e)))?;

        parse_klines_body(&body)?
            .iter()
            .map(|k| k.to_kline().map_err(|e| ExchangeError::Parse(e.to_string())))
            .collect()
    }
}

/// Round down to the exchange's step so a sell never exceeds what is held.
pub fn order_quantity(quantity: f64) -> ExchangeResult<Decimal> {
    let decimal = Decimal::from_f64(quantity)
        .ok_or_else(|| ExchangeError::Order(format!("Invalid quantity {}", quantity)))?
        .round_dp_with_strategy(QUANTITY_DECIMALS, RoundingStrategy::ToZero)
        .normalize();

    if decimal <= Decimal::ZERO {
        return Err(ExchangeError::Order(format!(
            "Quantity {} rounds to zero",
            quantity
        )));
    }
    Ok(decimal)
}

fn parse_order_response(body: &str, symbol: &Symbol, side: OrderSide, quantity: f64) -> ExchangeResult<OrderConfirmation> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ExchangeError::Parse(e.to_string()))?;

    if let Some(code) = value.get("code").and_then(|c| c.as_i64()) {
        let msg = value.get("msg").and_then(|m| m.as_str()).unwrap_or("unknown error");
        return Err(ExchangeError::Api(format!("{}: {}", code, msg)));
    }

    let order_id = value
        .get("orderId")
        .and_then(|id| id.as_u64())
        .ok_or_else(|| ExchangeError::Parse(format!("missing orderId in {}", body)))?;
    let status = value
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let executed = value
        .get("executedQty")
        .and_then(|q| q.as_str())
        .and_then(|q| q.parse::<f64>().ok())
        .unwrap_or(quantity);

    if status == "REJECTED" || status == "EXPIRED" {
        return Err(ExchangeError::Order(format!("order {} {}", order_id, status)));
    }

    Ok(OrderConfirmation {
        order_id: order_id.to_string(),
        symbol: symbol.to_string(),
        side,
        quantity: executed,
        status,
    })
}

#[async_trait]
impl OrderGateway for BinanceExchange {
    async fn place_market_order(
        &self,
        symbol: &Symbol,
        side: OrderSide,
        quantity: f64,
    ) -> ExchangeResult<OrderConfirmation> {
        let decimal = order_quantity(quantity)?;
        let binance_side = match side {
            OrderSide::Buy => Side::Buy,
            OrderSide::Sell => Side::Sell,
        };

        let body = self
            .client
            .send(trade::new_order(symbol.as_str(), binance_side, "MARKET").quantity(decimal))
            .await
            .map_err(|e| ExchangeError::Order(format!("{:?}", e)))?
            .into_body_str()
            .await
            .map_err(|e| ExchangeError::Order(format!("{:?}", e)))?;

        log::info!("Order result: {}", body);
        parse_order_response(&body, symbol, side, quantity)
    }
}

#[async_trait]
impl KlineProvider for BinanceExchange {
    async fn get_recent_klines(
        &self,
        symbol: &Symbol,
        interval: KlineInterval,
        limit: usize,
    ) -> ExchangeResult<Vec<Kline>> {
        let request = market::klines(symbol.as_str(), Self::interval(interval)).limit(limit as u32);
        self.send_klines(request).await
    }

    async fn get_klines_between(
        &self,
        symbol: &Symbol,
        interval: KlineInterval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> ExchangeResult<Vec<Kline>> {
        let request = market::klines(symbol.as_str(), Self::interval(interval))
            .start_time(start.timestamp_millis().max(0) as u64)
            .end_time(end.timestamp_millis().max(0) as u64)
            .limit(limit as u32);
        self.send_klines(request).await
    }
}
