//! Message recorders

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_common::MESSAGE_LOG_TARGET;
use relay_core::{ChatMessage, DomainResult, MessageRecorder, Principal};

/// Writes each routed message as a structured log record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMessageRecorder;

#[async_trait]
impl MessageRecorder for TracingMessageRecorder {
    async fn record_message(
        &self,
        message: &ChatMessage,
        sender: &Principal,
        receiver: Option<&str>,
    ) -> DomainResult<()> {
        tracing::info!(
            target: MESSAGE_LOG_TARGET,
            sender = %sender,
            receiver = receiver.unwrap_or("*"),
            text = %message.text,
            "Message recorded"
        );
        Ok(())
    }
}

/// A message captured by [`InMemoryMessageRecorder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedMessage {
    pub message: ChatMessage,
    pub sender: String,
    pub receiver: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Keeps recorded messages in memory
#[derive(Debug, Default)]
pub struct InMemoryMessageRecorder {
    records: Mutex<Vec<RecordedMessage>>,
}

impl InMemoryMessageRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn records(&self) -> Vec<RecordedMessage> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl MessageRecorder for InMemoryMessageRecorder {
    async fn record_message(
        &self,
        message: &ChatMessage,
        sender: &Principal,
        receiver: Option<&str>,
    ) -> DomainResult<()> {
        self.records.lock().push(RecordedMessage {
            message: message.clone(),
            sender: sender.name().to_string(),
            receiver: receiver.map(str::to_string),
            sent_at: Utc::now(),
        });
        Ok(())
    }
}
