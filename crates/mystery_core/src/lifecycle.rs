//! crates/mystery_core/src/lifecycle.rs
//!
//! The attempt lifecycle manager: one state machine per (player, case).
//! NotStarted -> start -> InProgress -> submit -> Completed, with hints only
//! while in progress. Completed attempts are immutable; the store enforces
//! the terminal transition with a conditional write so concurrent submits
//! cannot both succeed.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::codec::SolutionCodec;
use crate::domain::{Attempt, AttemptOutcome, Case, DomainType, Solution, Submission};
use crate::ports::{MysteryError, MysteryResult, MysteryStore};

/// Hints in the fixed ladder per case.
pub const HINT_COUNT: usize = 4;

/// Most evidence ids a submission may cite.
pub const MAX_KEY_EVIDENCE: usize = 3;

/// Result of a hint request.
#[derive(Debug, Clone)]
pub struct HintOutcome {
    pub hint: String,
    pub hints_used: i32,
}

/// Result of a submission. The decrypted solution is present only when the
/// accusation was wrong, so a losing player learns the answer while a
/// winner's later replays stay unspoiled.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub attempt: Attempt,
    pub solution: Option<Solution>,
}

/// Grades an accusation: the culprit must match exactly, and the submitted
/// motive must contain the stored motive as a case-insensitive substring.
/// The substring check is deliberately kept as loose as the original game.
pub fn grade(solution: &Solution, submission: &Submission) -> bool {
    submission.culprit_id == solution.culprit_id
        && submission
            .motive
            .to_lowercase()
            .contains(&solution.motive.to_lowercase())
}

/// score = max(0, base + timeBonus - hintPenalty) where base is 100 on a
/// correct accusation, timeBonus = max(0, 20 - elapsed whole minutes), and
/// hintPenalty = 10 per hint. No ceiling beyond the arithmetic bound of 120.
pub fn score(is_correct: bool, elapsed_secs: i64, hints_used: i32) -> i32 {
    let base = if is_correct { 100 } else { 0 };
    let minutes = (elapsed_secs / 60).max(0) as i32;
    let time_bonus = (20 - minutes).max(0);
    let hint_penalty = 10 * hints_used;
    (base + time_bonus - hint_penalty).max(0)
}

/// The fixed 4-entry hint ladder, derived from the case's timeline bounds,
/// its first genuine (non-red-herring) evidence, the domain's motive
/// category, and the setting location.
pub fn hint_ladder(case: &Case) -> [String; HINT_COUNT] {
    let timeline = &case.narrative.timeline;
    let first_time = timeline.first().map(|e| e.time.as_str()).unwrap_or("the beginning");
    let last_time = timeline.last().map(|e| e.time.as_str()).unwrap_or("the end");
    let genuine = case
        .evidence
        .iter()
        .find(|e| !e.detail.is_red_herring)
        .or_else(|| case.evidence.first())
        .map(|e| e.detail.name.as_str())
        .unwrap_or("the evidence");

    [
        format!("Focus on the timeline between {first_time} and {last_time}"),
        format!("Pay special attention to {genuine}"),
        format!(
            "Consider the motive: it might be related to {}",
            motive_hint(case.domain_type)
        ),
        format!("The culprit had access to {}", case.narrative.setting.location),
    ]
}

pub fn motive_hint(domain: DomainType) -> &'static str {
    match domain {
        DomainType::Homicide => "personal relationships or financial gain",
        DomainType::Theft => "desperation or professional ambition",
        DomainType::Disappearance => "escape or protection",
        DomainType::Fraud => "maintaining a lifestyle or covering losses",
        DomainType::Espionage => "ideology or coercion",
    }
}

/// Orchestrates start/hint/submit over the store and the solution codec.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn MysteryStore>,
    codec: SolutionCodec,
}

impl AttemptService {
    pub fn new(store: Arc<dyn MysteryStore>, codec: SolutionCodec) -> Self {
        Self { store, codec }
    }

    /// Starts an attempt, or returns the existing in-progress one unchanged.
    /// Fails with [`MysteryError::AlreadyCompleted`] once the attempt is
    /// terminal and with [`MysteryError::NotFound`] for an unknown case.
    pub async fn start(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt> {
        self.store.get_case(mystery_id).await?;
        self.store.get_or_create_player(user_id).await?;

        if let Some(existing) = self.store.find_attempt(user_id, mystery_id).await? {
            if existing.is_completed() {
                return Err(MysteryError::AlreadyCompleted);
            }
            return Ok(existing);
        }

        let attempt = self.store.create_attempt(user_id, mystery_id).await?;
        info!(%user_id, %mystery_id, "attempt started");
        Ok(attempt)
    }

    /// Serves one hint. The requested level indexes the ladder, clamped to
    /// its last entry; every call costs exactly one hint regardless of level.
    pub async fn hint(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
        level: u32,
    ) -> MysteryResult<HintOutcome> {
        let attempt = self
            .store
            .find_attempt(user_id, mystery_id)
            .await?
            .ok_or_else(|| MysteryError::InvalidAttempt("attempt not started".into()))?;
        if attempt.is_completed() {
            return Err(MysteryError::InvalidAttempt(
                "attempt already completed".into(),
            ));
        }

        let case = self.store.get_case(mystery_id).await?;
        let ladder = hint_ladder(&case);
        let index = (level as usize).min(ladder.len() - 1);
        let hint = ladder[index].clone();

        let updated = self.store.record_hint_use(user_id, mystery_id).await?;
        Ok(HintOutcome {
            hint,
            hints_used: updated.hints_used,
        })
    }

    /// Grades and completes an in-progress attempt. The solution is decrypted
    /// here and only here; the terminal write plus the solved/streak counter
    /// updates happen as one atomic unit inside the store.
    pub async fn submit(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
        submission: Submission,
    ) -> MysteryResult<SubmitOutcome> {
        if submission.key_evidence.len() > MAX_KEY_EVIDENCE {
            return Err(MysteryError::InvalidAttempt(format!(
                "a submission may cite at most {MAX_KEY_EVIDENCE} evidence ids"
            )));
        }

        let case = self.store.get_case(mystery_id).await?;
        let attempt = self
            .store
            .find_attempt(user_id, mystery_id)
            .await?
            .ok_or_else(|| MysteryError::InvalidAttempt("attempt not started".into()))?;
        if attempt.is_completed() {
            return Err(MysteryError::AlreadyCompleted);
        }

        let solution = self.codec.decrypt(&case.encrypted_solution)?;
        let now = Utc::now();
        let elapsed_secs = (now - attempt.started_at).num_seconds().max(0);
        let is_correct = grade(&solution, &submission);
        let outcome = AttemptOutcome {
            submission,
            is_correct,
            score: score(is_correct, elapsed_secs, attempt.hints_used),
            accuracy: if is_correct { 1.0 } else { 0.0 },
            time_spent_secs: elapsed_secs,
            completed_at: now,
        };

        let completed = self
            .store
            .complete_attempt(user_id, mystery_id, outcome)
            .await?;
        info!(%user_id, %mystery_id, is_correct, score = completed.score, "attempt completed");

        Ok(SubmitOutcome {
            attempt: completed,
            solution: (!is_correct).then_some(solution),
        })
    }

    /// The player's recent history, newest first.
    pub async fn history(&self, user_id: Uuid) -> MysteryResult<Vec<Attempt>> {
        self.store.attempts_for_player(user_id, 20).await
    }
}
