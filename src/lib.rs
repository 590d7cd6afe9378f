//! # Nandi Chat
//!
//! Client library for the Nandi companion services: persona chat with an
//! append-only transcript, a points ledger over durable key/value storage,
//! and the quest and wisdom-pet catalog.
//!
//! ## Architecture
//!
//! ```text
//! ChatSession ─┬─ Transcript (in memory, per session)
//!              ├─ ChatService ──────► chat generation service (HTTP)
//!              └─ MetricsAccumulator ─┬─ PointsService ──► points service (HTTP)
//!                                     └─ KeyValueStore ──► SQLite
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use nandi_chat::{Config, ChatSession, SessionOptions};
//! use nandi_chat::remote::NandiClient;
//! use nandi_chat::storage::SqliteKeyValueStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = SqliteKeyValueStore::new(&config.storage).await?;
//!     let client = NandiClient::new(&config.services, config.request.clone())?;
//!     let mut session = ChatSession::new(
//!         SessionOptions::new(config.chat.persona),
//!         client.clone(),
//!         client,
//!         store,
//!     )
//!     .await?;
//!     let report = session.submit("What is karma?").await?;
//!     println!("{}", report.reply.text());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Command-line presentation layer.
pub mod cli;
/// Configuration loaded from the environment.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Session points ledger.
pub mod metrics;
/// Chat personas.
pub mod persona;
/// HTTP clients for the chat, points, and catalog services.
pub mod remote;
/// Chat session orchestration.
pub mod session;
/// Durable key/value storage.
pub mod storage;
/// Append-only chat transcript.
pub mod transcript;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use persona::Persona;
pub use session::{ChatSession, ExchangeReport, SessionOptions, SessionState};
pub use transcript::{Message, Origin, Transcript};
