//! One chat session: a transcript, a points ledger, and the exchange flow between them.

use chrono::{Local, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::metrics::{MetricsAccumulator, PointsUpdate, SessionMetrics};
use crate::persona::Persona;
use crate::remote::{ChatRequest, ChatService, PointsService};
use crate::storage::KeyValueStore;
use crate::transcript::{Message, Transcript};

/// Whether a reply is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for the next message.
    Idle,
    /// A submission is in flight.
    AwaitingResponse,
}

/// Options for opening a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Persona to chat with.
    pub persona: Persona,
    /// Generated when not given.
    pub session_id: Option<String>,
    /// Replaces the persona greeting when given.
    pub initial_transcript: Option<Vec<Message>>,
}

impl SessionOptions {
    /// Options for `persona` with a generated id and greeting.
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            ..Default::default()
        }
    }

    /// Use a fixed session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Start from existing messages.
    pub fn with_initial_transcript(mut self, messages: Vec<Message>) -> Self {
        self.initial_transcript = Some(messages);
        self
    }
}

/// What a successful exchange produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeReport {
    /// The submitted message.
    pub user_message: Message,
    /// The persona's reply.
    pub reply: Message,
    /// Present when the reply carried a quality score and was scored.
    pub points: Option<PointsUpdate>,
}

/// A chat session with one persona.
///
/// `submit` borrows the session mutably, so a second message cannot be sent
/// while a reply is outstanding.
pub struct ChatSession<C, P, S> {
    persona: Persona,
    session_id: String,
    chat: C,
    accumulator: MetricsAccumulator<P, S>,
    transcript: Transcript,
    state: SessionState,
}

impl<C, P, S> ChatSession<C, P, S>
where
    C: ChatService,
    P: PointsService,
    S: KeyValueStore,
{
    /// Open a session ready for its first message.
    pub async fn new(options: SessionOptions, chat: C, points: P, store: S) -> AppResult<Self> {
        let session_id = options
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let transcript = match options.initial_transcript {
            Some(messages) => Transcript::from_messages(messages),
            None => Transcript::with_welcome(options.persona),
        };
        let accumulator = MetricsAccumulator::open(points, store, session_id.clone()).await?;

        info!(
            session_id = %session_id,
            persona = %options.persona,
            total_points = accumulator.metrics().total_points,
            "Chat session opened"
        );

        Ok(Self {
            persona: options.persona,
            session_id,
            chat,
            accumulator,
            transcript,
            state: SessionState::Idle,
        })
    }

    /// Persona of this session.
    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Read-only transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Current point totals.
    pub fn metrics(&self) -> &SessionMetrics {
        self.accumulator.metrics()
    }

    /// Receive every message appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.transcript.subscribe()
    }

    /// Send one user message and fold the reply and its score into the session.
    ///
    /// Blank input is rejected before anything is appended or sent. A failed
    /// remote call appends one error notice and returns the error; if the
    /// failure is in the points call, the reply stays in the transcript and
    /// the total is left as it was.
    pub async fn submit(&mut self, text: &str) -> AppResult<ExchangeReport> {
        let user_message = Message::user(text)?;

        self.state = SessionState::AwaitingResponse;
        let result = self.exchange(user_message).await;
        self.state = SessionState::Idle;

        if let Err(e) = &result {
            self.transcript.append(Message::error(e.user_message()));
        }
        result
    }

    async fn exchange(&mut self, user_message: Message) -> AppResult<ExchangeReport> {
        let request = ChatRequest {
            message: user_message.text().to_string(),
            persona: self.persona,
            session_id: self.session_id.clone(),
            context: self.transcript.context(),
        };
        let user_message = self.transcript.append(user_message).clone();

        debug!(session_id = %self.session_id, "Awaiting chat reply");
        let reply = self.chat.generate_reply(&request).await.map_err(|e| {
            warn!(session_id = %self.session_id, error = %e, "Chat call failed");
            AppError::from(e)
        })?;

        let quality_score = reply.quality_score.clone();
        let reply = self
            .transcript
            .append(Message::system(reply.message, quality_score.clone()))
            .clone();

        let points = match quality_score {
            Some(quality_score) => {
                let inputs = self
                    .accumulator
                    .exchange_inputs(Local::now().date_naive())
                    .await?;
                let elapsed = self.accumulator.metrics().elapsed_seconds(Utc::now());
                Some(
                    self.accumulator
                        .record_exchange(
                            quality_score,
                            elapsed,
                            inputs.is_consecutive_day,
                            inputs.total_questions,
                        )
                        .await?,
                )
            }
            None => None,
        };

        Ok(ExchangeReport {
            user_message,
            reply,
            points,
        })
    }

    /// Clear the durable points ledger.
    pub async fn reset_points(&mut self) -> AppResult<()> {
        self.accumulator.reset().await
    }
}
