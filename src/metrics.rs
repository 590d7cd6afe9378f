//! Session points ledger.
//!
//! The [`MetricsAccumulator`] turns one exchange's quality score into a
//! points request, and folds the service's answer into the durable total.
//! It never computes points itself.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::remote::{PointsRequest, PointsService, QualityScore};
use crate::storage::{
    KeyValueStore, LAST_ACTIVITY_DATE_KEY, TOTAL_POINTS_KEY, TOTAL_QUESTIONS_KEY,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Running point totals of a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetrics {
    /// Lifetime total; never decreases while the store is intact.
    pub total_points: u64,
    /// Score of the most recent scored exchange.
    pub last_quality_score: Option<QualityScore>,
    /// Points the most recent exchange earned.
    pub last_points_earned: u64,
    /// Category breakdown of the last points answer, as sent by the service.
    pub last_breakdown: Option<serde_json::Value>,
    /// When this session opened.
    pub session_started_at: DateTime<Utc>,
}

impl SessionMetrics {
    fn new(total_points: u64) -> Self {
        Self {
            total_points,
            last_quality_score: None,
            last_points_earned: 0,
            last_breakdown: None,
            session_started_at: Utc::now(),
        }
    }

    /// Whole seconds since the session started.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now - self.session_started_at).num_seconds().max(0) as u64
    }
}

/// Derived inputs for the next points request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeInputs {
    /// The last scored exchange happened yesterday.
    pub is_consecutive_day: bool,
    /// Lifetime question count including the exchange being scored.
    pub total_questions: u64,
}

/// Result of one successfully scored exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PointsUpdate {
    /// Stored total after the exchange.
    pub total_points: u64,
    /// Points attributed to this exchange.
    pub points_earned: u64,
    /// Score that was submitted.
    pub quality_score: QualityScore,
    /// Category breakdown, as sent by the service.
    pub breakdown: Option<serde_json::Value>,
}

/// Thin ledger between the points service and durable storage.
pub struct MetricsAccumulator<P, S> {
    points: P,
    store: S,
    session_id: String,
    metrics: SessionMetrics,
}

impl<P, S> MetricsAccumulator<P, S>
where
    P: PointsService,
    S: KeyValueStore,
{
    /// Create an accumulator and read the stored total.
    pub async fn open(points: P, store: S, session_id: impl Into<String>) -> AppResult<Self> {
        let mut accumulator = Self {
            points,
            store,
            session_id: session_id.into(),
            metrics: SessionMetrics::new(0),
        };
        accumulator.load().await?;
        Ok(accumulator)
    }

    /// Refresh the total from storage.
    pub async fn load(&mut self) -> AppResult<&SessionMetrics> {
        self.metrics.total_points = self.read_counter(TOTAL_POINTS_KEY).await?;
        Ok(&self.metrics)
    }

    /// Current snapshot.
    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    /// Session id sent with every points request.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Work out the streak flag and question count for an exchange scored on `today`.
    pub async fn exchange_inputs(&self, today: NaiveDate) -> AppResult<ExchangeInputs> {
        let last_activity = self.store.get(LAST_ACTIVITY_DATE_KEY).await?;
        let is_consecutive_day = last_activity
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .map(|last| last + Duration::days(1) == today)
            .unwrap_or(false);

        let total_questions = self.read_counter(TOTAL_QUESTIONS_KEY).await? + 1;

        Ok(ExchangeInputs {
            is_consecutive_day,
            total_questions,
        })
    }

    /// Score one exchange through the points service.
    ///
    /// Nothing is written unless the service answers successfully. On
    /// success the total, the lifetime question count, and today's date are
    /// persisted and the `last_*` snapshot is replaced.
    pub async fn record_exchange(
        &mut self,
        quality_score: QualityScore,
        session_elapsed_seconds: u64,
        is_consecutive_day: bool,
        total_questions_so_far: u64,
    ) -> AppResult<PointsUpdate> {
        let prior_total = self.read_counter(TOTAL_POINTS_KEY).await?;

        let request = PointsRequest {
            quality_scores: vec![quality_score.score()],
            session_duration_minutes: rounded_minutes(session_elapsed_seconds),
            is_consecutive_day,
            total_questions_count: total_questions_so_far,
            session_id: self.session_id.clone(),
        };

        debug!(
            session_id = %self.session_id,
            quality = quality_score.score(),
            prior_total,
            "Requesting points"
        );

        let reply = match self.points.calculate_points(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "Points call failed; total left unchanged"
                );
                return Err(e.into());
            }
        };

        if reply.total_points < prior_total {
            warn!(
                session_id = %self.session_id,
                reported = reply.total_points,
                prior_total,
                "Points service reported a lower total; keeping stored total"
            );
        }
        let total_points = reply.total_points.max(prior_total);
        let points_earned = reply
            .reported_points_earned()
            .unwrap_or_else(|| reply.total_points.saturating_sub(prior_total));

        // Total goes last so a failed write never leaves it ahead of the snapshot.
        self.store
            .set(TOTAL_QUESTIONS_KEY, &total_questions_so_far.to_string())
            .await?;
        self.store
            .set(
                LAST_ACTIVITY_DATE_KEY,
                &Local::now().date_naive().format(DATE_FORMAT).to_string(),
            )
            .await?;
        self.store
            .set(TOTAL_POINTS_KEY, &total_points.to_string())
            .await?;

        self.metrics.total_points = total_points;
        self.metrics.last_quality_score = Some(quality_score.clone());
        self.metrics.last_points_earned = points_earned;
        self.metrics.last_breakdown = reply.breakdown.clone();

        info!(
            session_id = %self.session_id,
            total_points,
            points_earned,
            quality = quality_score.score(),
            "Exchange scored"
        );

        Ok(PointsUpdate {
            total_points,
            points_earned,
            quality_score,
            breakdown: reply.breakdown,
        })
    }

    /// Forget every durable counter. The only way the total goes back to zero.
    pub async fn reset(&mut self) -> AppResult<()> {
        clear_ledger(&self.store).await?;
        let started = self.metrics.session_started_at;
        self.metrics = SessionMetrics {
            session_started_at: started,
            ..SessionMetrics::new(0)
        };
        info!(session_id = %self.session_id, "Points ledger reset");
        Ok(())
    }

    async fn read_counter(&self, key: &str) -> AppResult<u64> {
        let raw = self.store.get(key).await?;
        Ok(parse_counter(key, raw.as_deref()))
    }
}

/// Remove every durable ledger key from `store`.
pub async fn clear_ledger<S: KeyValueStore + ?Sized>(store: &S) -> AppResult<()> {
    for key in [TOTAL_POINTS_KEY, LAST_ACTIVITY_DATE_KEY, TOTAL_QUESTIONS_KEY] {
        store.remove(key).await?;
    }
    Ok(())
}

/// Missing or malformed counters read as zero.
fn parse_counter(key: &str, raw: Option<&str>) -> u64 {
    match raw {
        None => 0,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!(key, value, "Ignoring malformed stored counter");
            0
        }),
    }
}

fn rounded_minutes(seconds: u64) -> u64 {
    (seconds + 30) / 60
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, RemoteError, StorageError, StorageResult};
    use crate::remote::{MockPointsService, PointsReply};
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn reply(total: u64, earned: Option<u64>) -> PointsReply {
        PointsReply {
            total_points: total,
            points_earned: earned,
            breakdown: None,
            questions_breakdown: Vec::new(),
        }
    }

    fn score(n: u8) -> QualityScore {
        QualityScore::new(n).unwrap()
    }

    #[test]
    fn test_rounded_minutes() {
        assert_eq!(rounded_minutes(0), 0);
        assert_eq!(rounded_minutes(29), 0);
        assert_eq!(rounded_minutes(30), 1);
        assert_eq!(rounded_minutes(150), 3);
    }

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("k", None), 0);
        assert_eq!(parse_counter("k", Some("42")), 42);
        assert_eq!(parse_counter("k", Some("NaN")), 0);
    }

    #[tokio::test]
    async fn test_open_reads_stored_total() {
        let store = MemoryStore::with_entries([(TOTAL_POINTS_KEY, "250")]);
        let accumulator = MetricsAccumulator::open(MockPointsService::new(), store, "s")
            .await
            .unwrap();
        assert_eq!(accumulator.metrics().total_points, 250);
    }

    #[tokio::test]
    async fn test_record_exchange_stores_reported_total() {
        let mut points = MockPointsService::new();
        points
            .expect_calculate_points()
            .withf(|req| {
                req.quality_scores == vec![8]
                    && req.session_duration_minutes == 2
                    && req.is_consecutive_day
                    && req.total_questions_count == 3
                    && req.session_id == "sess-1"
            })
            .times(1)
            .returning(|_| Ok(reply(100, Some(12))));

        let store = Arc::new(MemoryStore::new());
        let mut accumulator = MetricsAccumulator::open(points, store.clone(), "sess-1")
            .await
            .unwrap();

        let update = accumulator
            .record_exchange(score(8), 120, true, 3)
            .await
            .unwrap();

        assert_eq!(update.total_points, 100);
        assert_eq!(update.points_earned, 12);
        assert_eq!(accumulator.metrics().total_points, 100);
        assert_eq!(
            accumulator.metrics().last_quality_score.as_ref().unwrap().badge(),
            "8/10"
        );
        assert_eq!(
            store.get(TOTAL_POINTS_KEY).await.unwrap(),
            Some("100".to_string())
        );
        assert_eq!(
            store.get(TOTAL_QUESTIONS_KEY).await.unwrap(),
            Some("3".to_string())
        );
        assert!(store.get(LAST_ACTIVITY_DATE_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_total_replaces_first() {
        let mut points = MockPointsService::new();
        let mut seq = mockall::Sequence::new();
        points
            .expect_calculate_points()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(reply(10, None)));
        points
            .expect_calculate_points()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(reply(25, None)));

        let mut accumulator = MetricsAccumulator::open(points, MemoryStore::new(), "s")
            .await
            .unwrap();

        let first = accumulator.record_exchange(score(5), 10, false, 1).await.unwrap();
        assert_eq!(first.points_earned, 10);
        let second = accumulator.record_exchange(score(6), 20, false, 2).await.unwrap();

        assert_eq!(second.total_points, 25);
        assert_eq!(second.points_earned, 15);
        assert_eq!(accumulator.metrics().total_points, 25);
    }

    #[tokio::test]
    async fn test_failed_points_call_writes_nothing() {
        let mut points = MockPointsService::new();
        points.expect_calculate_points().returning(|_| {
            Err(RemoteError::Server {
                status: 500,
                message: None,
            })
        });

        let store = Arc::new(MemoryStore::with_entries([(TOTAL_POINTS_KEY, "40")]));
        let mut accumulator = MetricsAccumulator::open(points, store.clone(), "s")
            .await
            .unwrap();

        let result = accumulator.record_exchange(score(9), 60, false, 5).await;

        assert!(matches!(result, Err(AppError::Remote(RemoteError::Server { .. }))));
        assert_eq!(accumulator.metrics().total_points, 40);
        assert!(accumulator.metrics().last_quality_score.is_none());
        assert_eq!(
            store.get(TOTAL_POINTS_KEY).await.unwrap(),
            Some("40".to_string())
        );
        assert_eq!(store.get(TOTAL_QUESTIONS_KEY).await.unwrap(), None);
        assert_eq!(store.get(LAST_ACTIVITY_DATE_KEY).await.unwrap(), None);
    }

    /// Fails every write to one key.
    struct FailingStore {
        inner: MemoryStore,
        failing_key: &'static str,
    }

    #[async_trait::async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if key == self.failing_key {
                return Err(StorageError::Query {
                    message: "disk full".to_string(),
                });
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key).await
        }

        async fn clear(&self) -> StorageResult<()> {
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn test_failed_counter_write_leaves_total_untouched() {
        for failing_key in [TOTAL_QUESTIONS_KEY, LAST_ACTIVITY_DATE_KEY] {
            let mut points = MockPointsService::new();
            points
                .expect_calculate_points()
                .times(1)
                .returning(|_| Ok(reply(100, Some(100))));

            let store = Arc::new(FailingStore {
                inner: MemoryStore::with_entries([(TOTAL_POINTS_KEY, "20")]),
                failing_key,
            });
            let mut accumulator = MetricsAccumulator::open(points, store.clone(), "s")
                .await
                .unwrap();

            let result = accumulator.record_exchange(score(8), 60, false, 1).await;

            assert!(matches!(result, Err(AppError::Storage(_))));
            assert_eq!(
                store.get(TOTAL_POINTS_KEY).await.unwrap(),
                Some("20".to_string())
            );
            assert_eq!(accumulator.metrics().total_points, 20);
            assert!(accumulator.metrics().last_quality_score.is_none());
        }
    }

    #[tokio::test]
    async fn test_total_never_decreases() {
        let mut points = MockPointsService::new();
        points
            .expect_calculate_points()
            .returning(|_| Ok(reply(5, Some(5))));

        let store = MemoryStore::with_entries([(TOTAL_POINTS_KEY, "70")]);
        let mut accumulator = MetricsAccumulator::open(points, store, "s").await.unwrap();

        let update = accumulator.record_exchange(score(7), 0, false, 1).await.unwrap();
        assert_eq!(update.total_points, 70);
        assert_eq!(accumulator.metrics().total_points, 70);
    }

    #[tokio::test]
    async fn test_exchange_inputs_consecutive_day() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let store = MemoryStore::with_entries([
            (LAST_ACTIVITY_DATE_KEY, "2026-10-18"),
            (TOTAL_QUESTIONS_KEY, "4"),
        ]);
        let accumulator = MetricsAccumulator::open(MockPointsService::new(), store, "s")
            .await
            .unwrap();

        let inputs = accumulator.exchange_inputs(today).await.unwrap();
        assert_eq!(
            inputs,
            ExchangeInputs {
                is_consecutive_day: true,
                total_questions: 5
            }
        );
    }

    #[tokio::test]
    async fn test_exchange_inputs_same_day_or_gap_is_not_consecutive() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        for last in ["2026-10-19", "2026-10-10", "Sun Oct 18 2026"] {
            let store = MemoryStore::with_entries([(LAST_ACTIVITY_DATE_KEY, last)]);
            let accumulator = MetricsAccumulator::open(MockPointsService::new(), store, "s")
                .await
                .unwrap();
            let inputs = accumulator.exchange_inputs(today).await.unwrap();
            assert!(!inputs.is_consecutive_day, "{} should not count", last);
            assert_eq!(inputs.total_questions, 1);
        }
    }

    #[tokio::test]
    async fn test_reset_clears_counters() {
        let store = Arc::new(MemoryStore::with_entries([
            (TOTAL_POINTS_KEY, "90"),
            (TOTAL_QUESTIONS_KEY, "9"),
            (LAST_ACTIVITY_DATE_KEY, "2026-10-18"),
        ]));
        let mut accumulator = MetricsAccumulator::open(MockPointsService::new(), store.clone(), "s")
            .await
            .unwrap();

        accumulator.reset().await.unwrap();

        assert_eq!(accumulator.metrics().total_points, 0);
        assert_eq!(store.get(TOTAL_POINTS_KEY).await.unwrap(), None);
        assert_eq!(store.get(TOTAL_QUESTIONS_KEY).await.unwrap(), None);
    }

    #[test]
    fn test_elapsed_seconds_never_negative() {
        let metrics = SessionMetrics::new(0);
        let earlier = metrics.session_started_at - Duration::seconds(10);
        assert_eq!(metrics.elapsed_seconds(earlier), 0);
        let later = metrics.session_started_at + Duration::seconds(90);
        assert_eq!(metrics.elapsed_seconds(later), 90);
    }
}
