//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `MysteryStore` port. It handles all interactions with PostgreSQL
//! using `sqlx`.
//!
//! Two invariants live at this layer: at most one daily case per calendar
//! day (partial unique index on `daily_date`), and the terminal attempt
//! transition plus the player counter updates applied as one transaction
//! conditional on `completed_at` still being null.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use mystery_core::domain::{
    Attempt, AttemptOutcome, Case, CaseEvidence, CaseNarrative, Difficulty, DomainType,
    Evidence, EvidenceKind, NewCase, PlayerProfile, Submission,
};
use mystery_core::ports::{MysteryError, MysteryResult, MysteryStore};

const UNIQUE_VIOLATION: &str = "23505";

fn store_err(e: sqlx::Error) -> MysteryError {
    MysteryError::Store(e.to_string())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `MysteryStore` port.
#[derive(Clone)]
pub struct PgMysteryStore {
    pool: PgPool,
}

impl PgMysteryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn evidence_for(&self, mystery_id: Uuid) -> MysteryResult<Vec<CaseEvidence>> {
        let records: Vec<EvidenceRecord> = sqlx::query_as(
            "SELECT evidence_id, kind, name, description, reveals_info, is_red_herring, \
             discovery_condition, discovery_order \
             FROM evidence WHERE mystery_id = $1 ORDER BY discovery_order ASC",
        )
        .bind(mystery_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct MysteryRecord {
    id: Uuid,
    title: String,
    synopsis: String,
    domain_type: String,
    difficulty: String,
    estimated_minutes: i32,
    narrative: serde_json::Value,
    encrypted_solution: String,
    daily_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl MysteryRecord {
    fn to_domain(self, evidence: Vec<CaseEvidence>) -> MysteryResult<Case> {
        let domain_type = DomainType::parse(&self.domain_type).ok_or_else(|| {
            MysteryError::Store(format!("unknown domain type `{}`", self.domain_type))
        })?;
        let difficulty = Difficulty::parse(&self.difficulty).ok_or_else(|| {
            MysteryError::Store(format!("unknown difficulty `{}`", self.difficulty))
        })?;
        let narrative: CaseNarrative = serde_json::from_value(self.narrative)
            .map_err(|e| MysteryError::Store(format!("corrupt narrative column: {e}")))?;

        Ok(Case {
            id: self.id,
            title: self.title,
            synopsis: self.synopsis,
            domain_type,
            difficulty,
            estimated_minutes: self.estimated_minutes,
            narrative,
            evidence,
            encrypted_solution: self.encrypted_solution,
            daily_date: self.daily_date,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct EvidenceRecord {
    evidence_id: String,
    kind: String,
    name: String,
    description: String,
    reveals_info: String,
    is_red_herring: bool,
    discovery_condition: Option<String>,
    discovery_order: i32,
}

impl EvidenceRecord {
    fn to_domain(self) -> MysteryResult<CaseEvidence> {
        let kind = EvidenceKind::parse(&self.kind).ok_or_else(|| {
            MysteryError::Store(format!("unknown evidence kind `{}`", self.kind))
        })?;
        Ok(CaseEvidence {
            discovery_order: self.discovery_order,
            detail: Evidence {
                id: self.evidence_id,
                kind,
                name: self.name,
                description: self.description,
                reveals_info: self.reveals_info,
                is_red_herring: self.is_red_herring,
                discovery_condition: self.discovery_condition,
            },
        })
    }
}

#[derive(FromRow)]
struct PlayerRecord {
    user_id: Uuid,
    cases_solved: i32,
    current_streak: i32,
}

impl PlayerRecord {
    fn to_domain(self) -> PlayerProfile {
        PlayerProfile {
            user_id: self.user_id,
            cases_solved: self.cases_solved,
            current_streak: self.current_streak,
        }
    }
}

#[derive(FromRow)]
struct AttemptRecord {
    user_id: Uuid,
    mystery_id: Uuid,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    hints_used: i32,
    submission: Option<serde_json::Value>,
    is_correct: Option<bool>,
    score: Option<i32>,
    accuracy: Option<f64>,
    time_spent_secs: Option<i64>,
}

impl AttemptRecord {
    fn to_domain(self) -> MysteryResult<Attempt> {
        let submission = self
            .submission
            .map(serde_json::from_value::<Submission>)
            .transpose()
            .map_err(|e| MysteryError::Store(format!("corrupt submission column: {e}")))?;
        Ok(Attempt {
            user_id: self.user_id,
            mystery_id: self.mystery_id,
            started_at: self.started_at,
            completed_at: self.completed_at,
            hints_used: self.hints_used,
            submission,
            is_correct: self.is_correct,
            score: self.score,
            accuracy: self.accuracy,
            time_spent_secs: self.time_spent_secs,
        })
    }
}

const ATTEMPT_COLUMNS: &str = "user_id, mystery_id, started_at, completed_at, hints_used, \
     submission, is_correct, score, accuracy, time_spent_secs";

//=========================================================================================
// `MysteryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MysteryStore for PgMysteryStore {
    async fn create_case(&self, case: NewCase) -> MysteryResult<Case> {
        let id = Uuid::new_v4();
        let narrative = serde_json::to_value(&case.narrative)
            .map_err(|e| MysteryError::Store(format!("narrative serialization failed: {e}")))?;

        let mut tx: Transaction<'_, Postgres> =
            self.pool.begin().await.map_err(store_err)?;

        let record: MysteryRecord = sqlx::query_as(
            "INSERT INTO mysteries \
             (id, title, synopsis, domain_type, difficulty, estimated_minutes, narrative, \
              encrypted_solution, daily_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, title, synopsis, domain_type, difficulty, estimated_minutes, \
                       narrative, encrypted_solution, daily_date, created_at",
        )
        .bind(id)
        .bind(&case.title)
        .bind(&case.synopsis)
        .bind(case.domain_type.as_str())
        .bind(case.difficulty.as_str())
        .bind(case.estimated_minutes)
        .bind(&narrative)
        .bind(&case.encrypted_solution)
        .bind(case.daily_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error().and_then(|d| d.code()) {
            Some(code) if code == UNIQUE_VIOLATION => {
                MysteryError::Conflict("daily case already exists for this date".into())
            }
            _ => store_err(e),
        })?;

        for item in &case.evidence {
            sqlx::query(
                "INSERT INTO evidence \
                 (id, mystery_id, evidence_id, kind, name, description, reveals_info, \
                  is_red_herring, discovery_condition, discovery_order) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(&item.detail.id)
            .bind(item.detail.kind.as_str())
            .bind(&item.detail.name)
            .bind(&item.detail.description)
            .bind(&item.detail.reveals_info)
            .bind(item.detail.is_red_herring)
            .bind(&item.detail.discovery_condition)
            .bind(item.discovery_order)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        record.to_domain(case.evidence)
    }

    async fn get_case(&self, id: Uuid) -> MysteryResult<Case> {
        let record: Option<MysteryRecord> = sqlx::query_as(
            "SELECT id, title, synopsis, domain_type, difficulty, estimated_minutes, \
             narrative, encrypted_solution, daily_date, created_at \
             FROM mysteries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        let record = record.ok_or_else(|| MysteryError::NotFound(format!("case {id}")))?;
        let evidence = self.evidence_for(id).await?;
        record.to_domain(evidence)
    }

    async fn find_daily_case(&self, day: NaiveDate) -> MysteryResult<Option<Case>> {
        let record: Option<MysteryRecord> = sqlx::query_as(
            "SELECT id, title, synopsis, domain_type, difficulty, estimated_minutes, \
             narrative, encrypted_solution, daily_date, created_at \
             FROM mysteries WHERE daily_date = $1",
        )
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        match record {
            Some(record) => {
                let evidence = self.evidence_for(record.id).await?;
                record.to_domain(evidence).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn get_or_create_player(&self, user_id: Uuid) -> MysteryResult<PlayerProfile> {
        sqlx::query("INSERT INTO players (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        let record: PlayerRecord = sqlx::query_as(
            "SELECT user_id, cases_solved, current_streak FROM players WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(record.to_domain())
    }

    async fn find_attempt(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
    ) -> MysteryResult<Option<Attempt>> {
        let record: Option<AttemptRecord> = sqlx::query_as(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = $1 AND mystery_id = $2"
        ))
        .bind(user_id)
        .bind(mystery_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        record.map(|r| r.to_domain()).transpose()
    }

    async fn create_attempt(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt> {
        let record: AttemptRecord = sqlx::query_as(&format!(
            "INSERT INTO attempts (user_id, mystery_id) VALUES ($1, $2) \
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(mystery_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error().and_then(|d| d.code()) {
            Some(code) if code == UNIQUE_VIOLATION => {
                MysteryError::Conflict("attempt already exists".into())
            }
            _ => store_err(e),
        })?;

        record.to_domain()
    }

    async fn record_hint_use(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt> {
        let record: Option<AttemptRecord> = sqlx::query_as(&format!(
            "UPDATE attempts SET hints_used = hints_used + 1 \
             WHERE user_id = $1 AND mystery_id = $2 AND completed_at IS NULL \
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(mystery_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        record
            .ok_or_else(|| {
                MysteryError::InvalidAttempt("hint on a missing or completed attempt".into())
            })?
            .to_domain()
    }

    async fn complete_attempt(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
        outcome: AttemptOutcome,
    ) -> MysteryResult<Attempt> {
        let submission = serde_json::to_value(&outcome.submission)
            .map_err(|e| MysteryError::Store(format!("submission serialization failed: {e}")))?;

        let mut tx: Transaction<'_, Postgres> =
            self.pool.begin().await.map_err(store_err)?;

        // Conditional write: exactly one concurrent submitter wins the
        // transition; everyone else lands in the None branch below.
        let record: Option<AttemptRecord> = sqlx::query_as(&format!(
            "UPDATE attempts SET completed_at = $3, submission = $4, is_correct = $5, \
             score = $6, accuracy = $7, time_spent_secs = $8 \
             WHERE user_id = $1 AND mystery_id = $2 AND completed_at IS NULL \
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(mystery_id)
        .bind(outcome.completed_at)
        .bind(&submission)
        .bind(outcome.is_correct)
        .bind(outcome.score)
        .bind(outcome.accuracy)
        .bind(outcome.time_spent_secs)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        let record = match record {
            Some(record) => record,
            None => {
                let existing: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
                    "SELECT completed_at FROM attempts WHERE user_id = $1 AND mystery_id = $2",
                )
                .bind(user_id)
                .bind(mystery_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(store_err)?;
                return Err(match existing {
                    Some(_) => MysteryError::AlreadyCompleted,
                    None => MysteryError::NotFound("attempt".into()),
                });
            }
        };

        if outcome.is_correct {
            sqlx::query(
                "UPDATE players SET cases_solved = cases_solved + 1, \
                 current_streak = current_streak + 1 WHERE user_id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        } else {
            sqlx::query("UPDATE players SET current_streak = 0 WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        record.to_domain()
    }

    async fn attempts_for_player(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> MysteryResult<Vec<Attempt>> {
        let records: Vec<AttemptRecord> = sqlx::query_as(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = $1 \
             ORDER BY started_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
