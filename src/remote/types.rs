use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persona::Persona;

/// Highest quality score the chat service assigns.
pub const MAX_QUALITY_SCORE: u8 = 10;

/// A 0-10 rating of a single exchange, assigned by the chat service.
///
/// Accepted on the wire either as a bare integer or as `{"score": n, "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQualityScore")]
pub struct QualityScore {
    score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawQualityScore {
    Bare(u8),
    Detailed { score: u8, reason: Option<String> },
}

impl TryFrom<RawQualityScore> for QualityScore {
    type Error = String;

    fn try_from(raw: RawQualityScore) -> Result<Self, Self::Error> {
        match raw {
            RawQualityScore::Bare(score) => QualityScore::new(score),
            RawQualityScore::Detailed { score, reason } => {
                QualityScore::new(score).map(|q| QualityScore { reason, ..q })
            }
        }
    }
}

/// Display band of a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityLevel {
    /// 8 and above.
    High,
    /// 4 to 7.
    Medium,
    /// Below 4.
    Low,
}

impl QualityScore {
    /// Create a score, rejecting values above [`MAX_QUALITY_SCORE`].
    pub fn new(score: u8) -> Result<Self, String> {
        if score > MAX_QUALITY_SCORE {
            return Err(format!(
                "quality score {} exceeds maximum of {}",
                score, MAX_QUALITY_SCORE
            ));
        }
        Ok(Self {
            score,
            reason: None,
        })
    }

    /// Numeric score, 0-10.
    pub fn score(&self) -> u8 {
        self.score
    }

    /// Explanation the service gave for the score, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Badge text, e.g. `8/10`.
    pub fn badge(&self) -> String {
        format!("{}/{}", self.score, MAX_QUALITY_SCORE)
    }

    /// Display band.
    pub fn level(&self) -> QualityLevel {
        match self.score {
            8..=u8::MAX => QualityLevel::High,
            4..=7 => QualityLevel::Medium,
            _ => QualityLevel::Low,
        }
    }
}

/// Role of a prior message sent as chat context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextRole {
    /// Typed by the user.
    User,
    /// Sent by the persona.
    Assistant,
}

/// Prior message sent with a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    /// Who said it.
    pub role: ContextRole,
    /// What was said.
    pub content: String,
}

/// Request to the chat generation service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Persona that should answer.
    pub persona: Persona,
    /// Chat session id.
    pub session_id: String,
    /// Prior conversation, oldest first.
    pub context: Vec<ContextMessage>,
}

/// Reply from the chat generation service
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawChatReply")]
pub struct ChatReply {
    /// Reply text.
    pub message: String,
    /// Score of the user's question; `None` when missing or unusable.
    pub quality_score: Option<QualityScore>,
}

/// Wire shape of a chat reply, in either field spelling.
#[derive(Deserialize)]
struct RawChatReply {
    #[serde(alias = "content")]
    message: String,
    #[serde(default, alias = "qualityScore")]
    quality_score: Option<serde_json::Value>,
    #[serde(default, alias = "scoreReason")]
    score_reason: Option<String>,
}

impl From<RawChatReply> for ChatReply {
    fn from(raw: RawChatReply) -> Self {
        let RawChatReply {
            message,
            quality_score,
            score_reason,
        } = raw;

        // A bad score must not cost the user the reply text.
        let quality_score = quality_score
            .and_then(|value| match serde_json::from_value::<QualityScore>(value.clone()) {
                Ok(score) => Some(score),
                Err(e) => {
                    warn!(value = %value, error = %e, "Ignoring unusable quality score");
                    None
                }
            })
            .map(|mut score| {
                if score.reason.is_none() {
                    score.reason = score_reason;
                }
                score
            });

        Self {
            message,
            quality_score,
        }
    }
}

/// Request to the points service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointsRequest {
    /// Scores being submitted; one per exchange.
    pub quality_scores: Vec<u8>,
    /// Session length so far, rounded to minutes.
    pub session_duration_minutes: u64,
    /// Previous scored exchange was yesterday.
    pub is_consecutive_day: bool,
    /// Lifetime question count including this one.
    pub total_questions_count: u64,
    /// Chat session id.
    pub session_id: String,
}

/// Per-question entry of a points breakdown
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionPoints {
    /// Points for that question.
    pub points: u64,
}

/// Points service result.
///
/// `total_points` is the cumulative total as computed by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointsReply {
    /// Cumulative total.
    #[serde(alias = "totalPoints")]
    pub total_points: u64,
    /// Points for this request, when reported.
    #[serde(default, alias = "pointsEarned")]
    pub points_earned: Option<u64>,
    /// Per-category breakdown.
    #[serde(default)]
    pub breakdown: Option<serde_json::Value>,
    /// Per-question breakdown.
    #[serde(default, alias = "questionsBreakdown")]
    pub questions_breakdown: Vec<QuestionPoints>,
}

impl PointsReply {
    /// Points attributed to the latest exchange, when the service reports them.
    pub fn reported_points_earned(&self) -> Option<u64> {
        self.points_earned
            .or_else(|| self.questions_breakdown.first().map(|q| q.points))
    }
}

/// The points service answers either flat or wrapped in `points_data`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum PointsEnvelope {
    Wrapped { points_data: PointsReply },
    Flat(PointsReply),
}

impl From<PointsEnvelope> for PointsReply {
    fn from(envelope: PointsEnvelope) -> Self {
        match envelope {
            PointsEnvelope::Wrapped { points_data } => points_data,
            PointsEnvelope::Flat(reply) => reply,
        }
    }
}

/// Error body shapes the services return: `message`, `detail`, or `error.message`.
#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
    error: Option<NestedError>,
}

#[derive(Deserialize)]
struct NestedError {
    message: Option<String>,
}

impl ErrorBody {
    /// Pull a human-readable message out of an error response body.
    pub(crate) fn extract(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .message
            .or_else(|| match parsed.detail {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            })
            .or_else(|| parsed.error.and_then(|e| e.message))
            .filter(|m| !m.trim().is_empty())
    }
}
