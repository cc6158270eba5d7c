//! crates/mystery_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete store and text-generation backend.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{Attempt, AttemptOutcome, Case, NewCase, PlayerProfile};

//=========================================================================================
// Error Taxonomy
//=========================================================================================

/// Every failure the core can surface, with the classification preserved so
/// callers can distinguish "retry the generation" from "this request is
/// invalid" from "data integrity incident".
#[derive(Debug, thiserror::Error)]
pub enum MysteryError {
    /// The generated payload violated the case-data contract.
    #[error("invalid case payload at `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// The generative collaborator failed, timed out, or produced output that
    /// could not be parsed or validated. Safe to retry from scratch.
    #[error("case generation failed: {0}")]
    Generation(String),

    /// Tag mismatch, malformed blob, or wrong key. Never partial plaintext;
    /// indicates corrupted storage or a key rotation gone wrong.
    #[error("solution decryption failed: {0}")]
    Decryption(String),

    /// An operation was attempted from the wrong lifecycle state.
    #[error("invalid attempt state: {0}")]
    InvalidAttempt(String),

    /// The attempt already reached its terminal state.
    #[error("attempt already completed")]
    AlreadyCompleted,

    /// The referenced case or attempt does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected a write (daily-case race). Recovered
    /// internally by re-reading the winner's record.
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// Unexpected persistence or encryption failure.
    #[error("storage error: {0}")]
    Store(String),
}

pub type MysteryResult<T> = Result<T, MysteryError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The generative text collaborator: structured prompt in, raw text out.
/// Implementations must bound the call with a timeout and surface transport,
/// quota, and expiry failures as [`MysteryError::Generation`].
#[async_trait]
pub trait NarrativeModel: Send + Sync {
    async fn write_case(&self, system: &str, prompt: &str) -> MysteryResult<String>;
}

/// The persistent store for cases, attempts, and player aggregates.
#[async_trait]
pub trait MysteryStore: Send + Sync {
    /// Persists a case with its evidence rows. A `daily_date` collision with
    /// an existing daily case must fail with [`MysteryError::Conflict`].
    async fn create_case(&self, case: NewCase) -> MysteryResult<Case>;

    /// Fetches a full case, evidence ordered by discovery index.
    /// The sealed solution rides along; callers that answer player reads must
    /// go through [`crate::domain::Case::into_public`].
    async fn get_case(&self, id: Uuid) -> MysteryResult<Case>;

    /// The case flagged daily for the given calendar date, if one exists.
    async fn find_daily_case(&self, day: NaiveDate) -> MysteryResult<Option<Case>>;

    async fn get_or_create_player(&self, user_id: Uuid) -> MysteryResult<PlayerProfile>;

    async fn find_attempt(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
    ) -> MysteryResult<Option<Attempt>>;

    /// Creates a fresh in-progress attempt with `started_at = now`.
    async fn create_attempt(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt>;

    /// Increments `hints_used` by exactly one, only while the attempt is in
    /// progress. Fails with [`MysteryError::InvalidAttempt`] otherwise.
    async fn record_hint_use(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt>;

    /// Moves an in-progress attempt to its terminal state and applies the
    /// player counter updates (solved/streak) as a single atomic unit.
    /// The transition is conditional on `completed_at` still being null:
    /// exactly one concurrent caller succeeds, the rest observe
    /// [`MysteryError::AlreadyCompleted`].
    async fn complete_attempt(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
        outcome: AttemptOutcome,
    ) -> MysteryResult<Attempt>;

    /// The player's attempts, newest first, bounded by `limit`.
    async fn attempts_for_player(&self, user_id: Uuid, limit: i64)
        -> MysteryResult<Vec<Attempt>>;
}
