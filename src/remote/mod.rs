//! Remote call adapter for the Nandi services.
//!
//! The chat and points calls sit behind the [`ChatService`] and
//! [`PointsService`] traits so the session core can run against fakes.

/// Quest and wisdom-pet endpoints.
pub mod catalog;
mod client;
mod types;

pub use catalog::CatalogClient;
pub use client::NandiClient;
pub use types::{
    ChatReply, ChatRequest, ContextMessage, ContextRole, PointsReply, PointsRequest,
    QualityLevel, QualityScore, QuestionPoints, MAX_QUALITY_SCORE,
};

use async_trait::async_trait;

use crate::error::RemoteResult;

/// Chat generation call: one reply and an optional quality score per user message.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Request a reply for the user's message.
    async fn generate_reply(&self, request: &ChatRequest) -> RemoteResult<ChatReply>;
}

/// Points call: turns exchange metrics into a cumulative point total.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointsService: Send + Sync {
    /// Ask the service to score the exchange.
    async fn calculate_points(&self, request: &PointsRequest) -> RemoteResult<PointsReply>;
}
