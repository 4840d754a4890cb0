//! Notification contracts: queue events for realtime fan-out and the SMS
//! sender interface. Both are best-effort; a failed notification never
//! fails the queue operation that produced it.

mod twilio;

pub use twilio::TwilioSmsSender;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{SmsBackend, SmsConfig};
use crate::queue::TicketStatus;

/// Realtime event published after a queue state change. Customer names
/// are masked before they reach a sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QueueEvent {
    Joined {
        queue_number: u32,
        customer_name: String,
        position: u32,
        estimated_wait_minutes: u32,
    },
    Serving {
        queue_number: u32,
        customer_name: String,
        status: TicketStatus,
    },
    Completed {
        queue_number: u32,
        customer_name: String,
    },
    Cancelled {
        queue_number: u32,
        customer_name: String,
    },
    ShopStatusUpdated {
        is_open: bool,
    },
}

/// Fire-and-forget event fan-out. Implementations must never block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: QueueEvent);
}

/// Sink that drops every event. Used when no realtime surface is wired.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: QueueEvent) {}
}

/// Outbound SMS delivery. Returns whether the message was accepted;
/// callers treat `false` as a logged shrug, never an error.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> bool;

    /// Name of this delivery backend.
    fn backend_name(&self) -> &'static str;
}

/// Sender that logs messages instead of delivering them.
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, message: &str) -> bool {
        tracing::info!(phone, message, "sms (log backend)");
        true
    }

    fn backend_name(&self) -> &'static str {
        "log"
    }
}

/// Build the configured SMS sender. No config or an incomplete Twilio
/// section falls back to the log backend.
pub fn create_sms_sender(config: Option<&SmsConfig>) -> Arc<dyn SmsSender> {
    match config {
        Some(sms) if sms.backend == SmsBackend::Twilio => match &sms.twilio {
            Some(twilio) => Arc::new(TwilioSmsSender::new(twilio.clone())),
            None => {
                tracing::warn!("sms backend is twilio but sms.twilio is missing, logging instead");
                Arc::new(LogSmsSender)
            }
        },
        _ => Arc::new(LogSmsSender),
    }
}

/// Message sent right after a successful join.
pub fn joined_message(customer_name: &str, queue_number: u32, wait_minutes: u32) -> String {
    format!(
        "Hi {customer_name}! You are number {queue_number} in the queue. \
         Estimated wait: {wait_minutes} minutes."
    )
}

/// Message sent when the chair frees up for this customer.
pub fn your_turn_message(customer_name: &str) -> String {
    format!("Hi {customer_name}, it's your turn! Please come to the counter.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event = QueueEvent::Joined {
            queue_number: 3,
            customer_name: "John D.".to_string(),
            position: 2,
            estimated_wait_minutes: 50,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"action\":\"joined\""));
        assert!(json.contains("\"queue_number\":3"));

        let roundtrip: QueueEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, event);
    }

    #[test]
    fn test_serving_event_carries_status() {
        let event = QueueEvent::Serving {
            queue_number: 2,
            customer_name: "John D.".to_string(),
            status: TicketStatus::Serving,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"action\":\"serving\""));
        assert!(json.contains("\"status\":\"serving\""));
        assert!(json.contains("\"customer_name\":\"John D.\""));
    }

    #[test]
    fn test_terminal_events_carry_customer_name() {
        let json = serde_json::to_string(&QueueEvent::Completed {
            queue_number: 5,
            customer_name: "Mary J.".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"customer_name\":\"Mary J.\""));

        let json = serde_json::to_string(&QueueEvent::Cancelled {
            queue_number: 6,
            customer_name: "Ravi K.".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"action\":\"cancelled\""));
        assert!(json.contains("\"customer_name\":\"Ravi K.\""));
    }

    #[test]
    fn test_shop_status_event_serialization() {
        let json = serde_json::to_string(&QueueEvent::ShopStatusUpdated { is_open: false }).unwrap();
        assert_eq!(json, r#"{"action":"shop_status_updated","is_open":false}"#);
    }

    #[tokio::test]
    async fn test_log_sender_always_succeeds() {
        let sender = LogSmsSender;
        assert!(sender.send("+15550001111", "hello").await);
        assert_eq!(sender.backend_name(), "log");
    }

    #[test]
    fn test_create_sender_defaults_to_log() {
        let sender = create_sms_sender(None);
        assert_eq!(sender.backend_name(), "log");

        let config = SmsConfig {
            backend: SmsBackend::Twilio,
            twilio: None,
        };
        let sender = create_sms_sender(Some(&config));
        assert_eq!(sender.backend_name(), "log");
    }

    #[test]
    fn test_message_templates() {
        let msg = joined_message("Alice", 4, 30);
        assert!(msg.contains("Alice"));
        assert!(msg.contains("number 4"));
        assert!(msg.contains("30 minutes"));

        assert!(your_turn_message("Bob").contains("Bob"));
    }
}
