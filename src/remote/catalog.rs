//! Quest and wisdom-pet endpoints of the Nandi API.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::client::HttpTransport;
use crate::config::{RequestConfig, ServiceConfig};
use crate::error::RemoteResult;

/// A guided reflection quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    /// Quest id.
    pub id: i64,
    /// Short title.
    pub title: String,
    /// One-paragraph summary.
    #[serde(default)]
    pub description: String,
    /// Questions in answer order.
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// One question of a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Question id, unique within the quest.
    pub id: i64,
    /// Question text.
    pub text: String,
    /// Hint shown before answering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// Progress status of a quest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    /// Accepted, not all questions answered.
    #[default]
    InProgress,
    /// Every question answered.
    Completed,
}

/// Progress of the current user through a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    /// Quest this progress belongs to.
    #[serde(default)]
    pub quest_id: Option<i64>,
    /// Ids of answered questions.
    #[serde(default)]
    pub completed_questions: Vec<i64>,
    /// Overall status.
    #[serde(default)]
    pub status: QuestStatus,
}

impl QuestProgress {
    /// First question of `quest` not yet answered, in quest order.
    pub fn next_question<'a>(&self, quest: &'a Quest) -> Option<&'a Question> {
        quest
            .questions
            .iter()
            .find(|q| !self.completed_questions.contains(&q.id))
    }
}

/// Mood gauges of a wisdom pet, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetStatus {
    /// Happiness gauge.
    pub happiness: u8,
    /// Energy gauge.
    pub energy: u8,
    /// Wisdom gauge.
    pub wisdom: u8,
}

/// An action the user can take with a pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction id.
    pub id: i64,
    /// Action name sent to `interact`.
    pub name: String,
    /// Wisdom line the action yields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wisdom: Option<String>,
}

/// A virtual companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    /// Pet id.
    pub id: i64,
    /// Pet name.
    pub name: String,
    /// Animal kind, `type` on the wire.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Current gauges.
    #[serde(default)]
    pub status: PetStatus,
    /// Actions the pet supports.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// Outcome of interacting with a pet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InteractionOutcome {
    /// Wisdom the pet shared.
    pub wisdom: String,
    /// Gauges after the interaction, when sent.
    #[serde(default)]
    pub status: Option<PetStatus>,
}

/// Client for the quest and pet catalog
#[derive(Clone)]
pub struct CatalogClient {
    transport: HttpTransport,
    base_url: String,
}

impl CatalogClient {
    /// Create a new catalog client
    pub fn new(config: &ServiceConfig, request_config: RequestConfig) -> RemoteResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(&config.api_key, &request_config)?,
            base_url: config.catalog_url.trim_end_matches('/').to_string(),
        })
    }

    /// Catalog API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List every quest.
    pub async fn quests(&self) -> RemoteResult<Vec<Quest>> {
        self.transport
            .get_json(&format!("{}/soul_quest/quests", self.base_url))
            .await
    }

    /// Fetch one quest.
    pub async fn quest(&self, quest_id: i64) -> RemoteResult<Quest> {
        self.transport
            .get_json(&format!("{}/soul_quest/quests/{}", self.base_url, quest_id))
            .await
    }

    /// Current user's progress through a quest.
    pub async fn quest_progress(&self, quest_id: i64) -> RemoteResult<QuestProgress> {
        self.transport
            .get_json(&format!(
                "{}/soul_quest/quests/{}/progress",
                self.base_url, quest_id
            ))
            .await
    }

    /// Submit an answer and get the updated progress back.
    pub async fn submit_answer(
        &self,
        quest_id: i64,
        question_id: i64,
        answer: &str,
    ) -> RemoteResult<QuestProgress> {
        let url = format!(
            "{}/soul_quest/quests/{}/questions/{}/answer",
            self.base_url, quest_id, question_id
        );
        let progress: QuestProgress = self
            .transport
            .post_json(&url, &json!({ "answer": answer }))
            .await?;
        info!(
            quest_id,
            question_id,
            status = ?progress.status,
            "Quest answer submitted"
        );
        Ok(progress)
    }

    /// Mark a quest task done.
    pub async fn complete_task(&self, quest_id: i64, task_id: i64) -> RemoteResult<QuestProgress> {
        self.transport
            .post_empty(&format!(
                "{}/soul_quest/quests/{}/tasks/{}/complete",
                self.base_url, quest_id, task_id
            ))
            .await
    }

    /// Start a quest.
    pub async fn accept_quest(&self, quest_id: i64) -> RemoteResult<QuestProgress> {
        self.transport
            .post_empty(&format!(
                "{}/soul_quest/quests/{}/accept",
                self.base_url, quest_id
            ))
            .await
    }

    /// List every wisdom pet.
    pub async fn pets(&self) -> RemoteResult<Vec<Pet>> {
        self.transport
            .get_json(&format!("{}/wisdom_pets/pets", self.base_url))
            .await
    }

    /// Fetch one pet.
    pub async fn pet(&self, pet_id: i64) -> RemoteResult<Pet> {
        self.transport
            .get_json(&format!("{}/wisdom_pets/pets/{}", self.base_url, pet_id))
            .await
    }

    /// Perform `action` with a pet.
    pub async fn interact_with_pet(
        &self,
        pet_id: i64,
        action: &str,
    ) -> RemoteResult<InteractionOutcome> {
        self.transport
            .post_json(
                &format!("{}/wisdom_pets/pets/{}/interact", self.base_url, pet_id),
                &json!({ "action": action }),
            )
            .await
    }

    /// Unlock a pet for the current user.
    pub async fn unlock_pet(&self, pet_id: i64) -> RemoteResult<Pet> {
        self.transport
            .post_empty(&format!(
                "{}/wisdom_pets/pets/{}/unlock",
                self.base_url, pet_id
            ))
            .await
    }
}
