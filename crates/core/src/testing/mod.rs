//! Test doubles shared across unit and integration tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::notify::{EventSink, QueueEvent, SmsSender};

/// Event sink that records everything it is given.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, event: QueueEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// SMS sender that records messages and reports a configurable outcome.
pub struct RecordingSmsSender {
    messages: Mutex<Vec<(String, String)>>,
    succeed: bool,
}

impl RecordingSmsSender {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            succeed: true,
        }
    }

    /// A sender whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            succeed: false,
        }
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Default for RecordingSmsSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SmsSender for RecordingSmsSender {
    async fn send(&self, phone: &str, message: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        self.succeed
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
