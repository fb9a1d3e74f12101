// src/infrastructure/messaging/mod.rs
// Event publishers for position notifications

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::errors::{PublishError, PublishResult};
use crate::domain::model::TradingEvent;
use crate::domain::service::TradingEventPublisher;

/// Writes events to the log as JSON
#[derive(Debug, Default)]
pub struct LogEventPublisher;

#[async_trait]
impl TradingEventPublisher for LogEventPublisher {
    async fn publish(&self, event: &TradingEvent) -> PublishResult<()> {
        let payload =
            serde_json::to_string(event).map_err(|e| PublishError::Serialization(e.to_string()))?;
        log::info!("[{}] {}", event.routing_key(), payload);
        Ok(())
    }
}

/// Fans events out to in-process subscribers
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<TradingEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradingEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl TradingEventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &TradingEvent) -> PublishResult<()> {
        self.sender
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| PublishError::ChannelClosed(format!("no subscribers for {}", event.routing_key())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TradingBotId;
    use chrono::Utc;

    fn event() -> TradingEvent {
        TradingEvent::PositionOpened {
            bot_id: TradingBotId::new(),
            symbol: "BTCBRL".to_string(),
            price: 830.0,
            quantity: 0.001,
            total_value: 0.83,
            strategy: "MovingAverage".to_string(),
            trading_fees: 0.1,
            currency: "BRL".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn broadcast_delivers_to_subscribers() {
        let publisher = BroadcastEventPublisher::new(8);
        let mut receiver = publisher.subscribe();
        let sent = event();
        publisher.publish(&sent).await.unwrap();
        assert_eq!(receiver.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_fails() {
        let publisher = BroadcastEventPublisher::new(8);
        assert!(publisher.publish(&event()).await.is_err());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["type"], "position_opened");
        assert_eq!(event().routing_key(), "trading.buy_executed");
    }
}
