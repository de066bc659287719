//! Habit engine: repeated-action observations and threshold promotion
//!
//! Each (user, action_type, context) triple moves through three states:
//! Unobserved, Observed(count), Habitual(confidence). The increment is a
//! single server-side upsert, never a client-side read-then-write, and
//! promotion is gated in the store on the observation count so a racing
//! pair of calls cannot promote from a stale counter.

use crate::error::Result;
use crate::store::GraphStore;
use crate::types::{ActionObservation, Habit};

use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

/// Observation count at which a repeated action becomes a habit
pub const PROMOTION_THRESHOLD: i64 = 3;

/// Confidence assigned at first promotion
pub const CONFIDENCE_FLOOR: f64 = 0.6;

/// Confidence gained per post-initial promotion
pub const CONFIDENCE_STEP: f64 = 0.05;

/// Confidence never exceeds this; a habit never claims certainty
pub const CONFIDENCE_CEILING: f64 = 0.95;

/// Tracks repeated actions and promotes them into confidence-scored habits
#[derive(Debug, Clone)]
pub struct HabitEngine {
    store: Arc<GraphStore>,
}

impl HabitEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self { store }
    }

    /// Record one occurrence of (action_type, context) for a user and
    /// promote it to a habit once the default threshold is crossed
    pub async fn record_action(
        &self,
        user_id: &str,
        action_type: &str,
        context: &str,
    ) -> Result<()> {
        self.record_action_with_threshold(user_id, action_type, context, PROMOTION_THRESHOLD)
            .await
    }

    /// Record an occurrence with a per-call promotion threshold.
    ///
    /// The count increment is durable on its own: if the promotion write
    /// fails afterwards, the triple stays Observed(count) and the next
    /// call promotes it (at-least-once, no rollback).
    pub async fn record_action_with_threshold(
        &self,
        user_id: &str,
        action_type: &str,
        context: &str,
        threshold: i64,
    ) -> Result<()> {
        let now = Utc::now();

        self.store.upsert_user(user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO performed (user_id, action_type, context, count, first_seen, last_seen)
            VALUES (?, ?, ?, 1, ?, ?)
            ON CONFLICT(user_id, action_type, context) DO UPDATE SET
                count = performed.count + 1,
                last_seen = excluded.last_seen
            "#,
        )
        .bind(user_id)
        .bind(action_type)
        .bind(context)
        .bind(now)
        .bind(now)
        .execute(self.store.pool())
        .await?;

        self.promote(user_id, action_type, context, threshold).await
    }

    /// Promotion: creates the habit at the confidence floor the first
    /// time the count meets the threshold; afterwards resyncs frequency
    /// and ratchets confidence up one step, capped at the ceiling.
    async fn promote(
        &self,
        user_id: &str,
        action_type: &str,
        context: &str,
        threshold: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO habits (user_id, action_type, context, frequency, confidence)
            SELECT user_id, action_type, context, count, ?
            FROM performed
            WHERE user_id = ? AND action_type = ? AND context = ? AND count >= ?
            ON CONFLICT(user_id, action_type, context) DO UPDATE SET
                frequency = excluded.frequency,
                confidence = MIN(habits.confidence + ?, ?)
            "#,
        )
        .bind(CONFIDENCE_FLOOR)
        .bind(user_id)
        .bind(action_type)
        .bind(context)
        .bind(threshold)
        .bind(CONFIDENCE_STEP)
        .bind(CONFIDENCE_CEILING)
        .execute(self.store.pool())
        .await?;

        if result.rows_affected() > 0 {
            tracing::debug!(user_id, action_type, context, "habit promoted");
        }
        Ok(())
    }

    /// Get a user's habits at or above `min_confidence`, most entrenched
    /// first. Order within a confidence tie is unspecified.
    pub async fn get_habits(&self, user_id: &str, min_confidence: f64) -> Result<Vec<Habit>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, action_type, context, frequency, confidence
            FROM habits
            WHERE user_id = ? AND confidence >= ?
            ORDER BY confidence DESC
            "#,
        )
        .bind(user_id)
        .bind(min_confidence)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| Habit {
                user_id: row.try_get("user_id").unwrap_or_default(),
                action_type: row.try_get("action_type").unwrap_or_default(),
                context: row.try_get("context").unwrap_or_default(),
                frequency: row.try_get("frequency").unwrap_or(0),
                confidence: row.try_get("confidence").unwrap_or(0.0),
            })
            .collect())
    }

    /// Load the raw observation for a triple, if any
    pub async fn observation(
        &self,
        user_id: &str,
        action_type: &str,
        context: &str,
    ) -> Result<Option<ActionObservation>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, action_type, context, count, first_seen, last_seen
            FROM performed
            WHERE user_id = ? AND action_type = ? AND context = ?
            "#,
        )
        .bind(user_id)
        .bind(action_type)
        .bind(context)
        .fetch_optional(self.store.pool())
        .await?;

        Ok(row.map(|row| ActionObservation {
            user_id: row.try_get("user_id").unwrap_or_default(),
            action_type: row.try_get("action_type").unwrap_or_default(),
            context: row.try_get("context").unwrap_or_default(),
            count: row.try_get("count").unwrap_or(0),
            first_seen: row.try_get("first_seen").unwrap_or_else(|_| Utc::now()),
            last_seen: row.try_get("last_seen").unwrap_or_else(|_| Utc::now()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn engine() -> HabitEngine {
        HabitEngine::new(GraphStore::connect_in_memory().await)
    }

    async fn record_n(engine: &HabitEngine, n: usize) {
        for _ in 0..n {
            engine.record_action("u1", "snooze_alarm", "morning").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_count_equals_number_of_calls() {
        let engine = engine().await;
        record_n(&engine, 5).await;

        let obs = engine
            .observation("u1", "snooze_alarm", "morning")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(obs.count, 5);
        assert!(obs.last_seen >= obs.first_seen);
    }

    #[tokio::test]
    async fn test_no_habit_below_threshold() {
        let engine = engine().await;
        record_n(&engine, 2).await;

        let habits = engine.get_habits("u1", 0.0).await.unwrap();
        assert!(habits.is_empty());
    }

    #[tokio::test]
    async fn test_promotion_at_threshold() {
        let engine = engine().await;
        record_n(&engine, 3).await;

        let habits = engine.get_habits("u1", 0.6).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].action_type, "snooze_alarm");
        assert_eq!(habits[0].context, "morning");
        assert_eq!(habits[0].frequency, 3);
        assert!((habits[0].confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fourth_call_ratchets_confidence() {
        let engine = engine().await;
        record_n(&engine, 4).await;

        let habits = engine.get_habits("u1", 0.6).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].frequency, 4);
        assert!((habits[0].confidence - 0.65).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_confidence_is_capped_at_ceiling() {
        let engine = engine().await;
        // 3 calls reach the floor; 7 more would add 0.35, landing exactly
        // at the ceiling; extra calls must not push past it
        record_n(&engine, 3 + 7 + 5).await;

        let habits = engine.get_habits("u1", 0.6).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].frequency, 15);
        assert!((habits[0].confidence - CONFIDENCE_CEILING).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_confidence_never_decreases() {
        let engine = engine().await;
        let mut last = 0.0;
        for _ in 0..12 {
            engine.record_action("u1", "snooze_alarm", "morning").await.unwrap();
            if let Some(habit) = engine
                .get_habits("u1", 0.0)
                .await
                .unwrap()
                .into_iter()
                .next()
            {
                assert!(habit.confidence >= last);
                last = habit.confidence;
            }
        }
        assert!((last - CONFIDENCE_CEILING).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_per_call_threshold_override() {
        let engine = engine().await;
        engine
            .record_action_with_threshold("u1", "stretch", "desk", 1)
            .await
            .unwrap();

        let habits = engine.get_habits("u1", 0.6).await.unwrap();
        assert_eq!(habits.len(), 1);
        assert_eq!(habits[0].frequency, 1);
    }

    #[tokio::test]
    async fn test_triples_are_tracked_independently() {
        let engine = engine().await;
        record_n(&engine, 3).await;
        engine.record_action("u1", "snooze_alarm", "weekend").await.unwrap();
        engine.record_action("u2", "snooze_alarm", "morning").await.unwrap();

        let obs_morning = engine
            .observation("u1", "snooze_alarm", "morning")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(obs_morning.count, 3);

        let obs_weekend = engine
            .observation("u1", "snooze_alarm", "weekend")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(obs_weekend.count, 1);

        assert!(engine.get_habits("u2", 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_habits_orders_by_confidence_and_filters() {
        let engine = engine().await;
        // "older" habit gets 3 extra promotions beyond the floor
        for _ in 0..6 {
            engine.record_action("u1", "coffee", "morning").await.unwrap();
        }
        for _ in 0..3 {
            engine.record_action("u1", "walk", "evening").await.unwrap();
        }

        let habits = engine.get_habits("u1", 0.6).await.unwrap();
        assert_eq!(habits.len(), 2);
        assert_eq!(habits[0].action_type, "coffee");
        assert!(habits[0].confidence > habits[1].confidence);

        // Filter drops the floor-level habit
        let entrenched = engine.get_habits("u1", 0.7).await.unwrap();
        assert_eq!(entrenched.len(), 1);
        assert_eq!(entrenched[0].action_type, "coffee");
    }
}
