//! Append-only chat transcript.
//!
//! A [`Transcript`] holds the messages of one chat session in insertion
//! order. Messages are immutable once built and there is no way to edit,
//! delete, or reorder them. Observers can [`subscribe`](Transcript::subscribe)
//! to be told about every appended message.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::persona::Persona;
use crate::remote::{ContextMessage, ContextRole, QualityScore};

/// Buffered notifications per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Unique message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Typed by the user.
    User,
    /// Reply from the persona.
    System,
    /// Locally generated notice about a failed exchange.
    Error,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    origin: Origin,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality_score: Option<QualityScore>,
}

impl Message {
    fn new(origin: Origin, text: String, quality_score: Option<QualityScore>) -> Self {
        Self {
            id: MessageId::new(),
            origin,
            text,
            created_at: Utc::now(),
            quality_score,
        }
    }

    /// A message typed by the user. Empty or whitespace-only text is rejected.
    pub fn user(text: impl Into<String>) -> AppResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::validation("message", "Message cannot be empty"));
        }
        Ok(Self::new(Origin::User, text, None))
    }

    /// A reply from the chat service, with its quality score if one was given.
    pub fn system(text: impl Into<String>, quality_score: Option<QualityScore>) -> Self {
        Self::new(Origin::System, text.into(), quality_score)
    }

    /// An error notice shown in the conversation.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Origin::Error, text.into(), None)
    }

    /// Unique id.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Who produced it.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Score, on scored replies only.
    pub fn quality_score(&self) -> Option<&QualityScore> {
        self.quality_score.as_ref()
    }

    /// Whether this is an error notice.
    pub fn is_error(&self) -> bool {
        self.origin == Origin::Error
    }

    /// Local wall-clock time, `HH:MM`.
    pub fn display_time(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string()
    }
}

/// Ordered, append-only message log of one chat session.
#[derive(Debug)]
pub struct Transcript {
    messages: Vec<Message>,
    events: broadcast::Sender<Message>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: Vec::new(),
            events,
        }
    }

    /// Transcript opened with the persona's greeting.
    pub fn with_welcome(persona: Persona) -> Self {
        let mut transcript = Self::new();
        transcript.append(Message::system(persona.welcome_message(), None));
        transcript
    }

    /// Transcript seeded with existing messages, in the given order.
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let mut transcript = Self::new();
        transcript.messages.extend(messages);
        transcript
    }

    /// Add a message at the end and notify subscribers.
    pub fn append(&mut self, message: Message) -> &Message {
        // No subscribers is not an error.
        let _ = self.events.send(message.clone());
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// All messages in insertion order.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Receive every message appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Conversation context for the chat service. Error notices are local and left out.
    pub fn context(&self) -> Vec<ContextMessage> {
        self.messages
            .iter()
            .filter_map(|m| {
                let role = match m.origin {
                    Origin::User => ContextRole::User,
                    Origin::System => ContextRole::Assistant,
                    Origin::Error => return None,
                };
                Some(ContextMessage {
                    role,
                    content: m.text.clone(),
                })
            })
            .collect()
    }
}
