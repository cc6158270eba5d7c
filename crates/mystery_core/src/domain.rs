//! crates/mystery_core/src/domain.rs
//!
//! Defines the core data structures for the mystery game.
//! These structs are independent of any database or HTTP framework; the
//! serde derives exist because generated case payloads cross a JSON boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of mystery genres a case can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    Homicide,
    Theft,
    Disappearance,
    Fraud,
    Espionage,
}

impl DomainType {
    pub const ALL: [DomainType; 5] = [
        DomainType::Homicide,
        DomainType::Theft,
        DomainType::Disappearance,
        DomainType::Fraud,
        DomainType::Espionage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DomainType::Homicide => "homicide",
            DomainType::Theft => "theft",
            DomainType::Disappearance => "disappearance",
            DomainType::Fraud => "fraud",
            DomainType::Espionage => "espionage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }

    /// How long a player is expected to need, in minutes.
    pub fn estimated_minutes(self) -> i32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 7,
            Difficulty::Hard => 10,
            Difficulty::Expert => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Document,
    Photo,
    Testimony,
    Physical,
    Digital,
}

impl EvidenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceKind::Document => "document",
            EvidenceKind::Photo => "photo",
            EvidenceKind::Testimony => "testimony",
            EvidenceKind::Physical => "physical",
            EvidenceKind::Digital => "digital",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            EvidenceKind::Document,
            EvidenceKind::Photo,
            EvidenceKind::Testimony,
            EvidenceKind::Physical,
            EvidenceKind::Digital,
        ]
        .into_iter()
        .find(|k| k.as_str() == s)
    }
}

/// Who can see a timeline event before the case is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Hidden,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub location: String,
    pub time: String,
    pub atmosphere: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    pub name: String,
    pub role: String,
    pub description: String,
    pub alibi: String,
    #[serde(default)]
    pub motive: Option<String>,
    pub secrets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    pub name: String,
    pub description: String,
    pub reveals_info: String,
    pub is_red_herring: bool,
    #[serde(default)]
    pub discovery_condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub time: String,
    pub event: String,
    pub visibility: Visibility,
    pub involved_characters: Vec<String>,
}

/// The answer to a case. Never exposed to players before completion, and
/// after completion only when the submission was wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub culprit_id: String,
    pub motive: String,
    pub method: String,
    pub key_evidence: Vec<String>,
    pub explanation: String,
}

/// A deliberately suspicious-but-innocent lead attached to a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedHerring {
    pub character_id: String,
    pub suspicious_activity: String,
    pub explanation: String,
}

/// The shape the generative model must produce, as accepted by the
/// schema validator. This is the only type constructed from untrusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCase {
    pub title: String,
    pub synopsis: String,
    pub setting: Setting,
    pub characters: Vec<Character>,
    pub timeline: Vec<TimelineEvent>,
    pub evidence: Vec<Evidence>,
    pub solution: Solution,
    pub red_herrings: Vec<RedHerring>,
}

/// The narrative portion of a case, stored as one JSON document alongside
/// the scalar columns. Evidence lives in its own ordered rows instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseNarrative {
    pub setting: Setting,
    pub characters: Vec<Character>,
    pub timeline: Vec<TimelineEvent>,
    pub red_herrings: Vec<RedHerring>,
}

/// One evidence item with its stable discovery position (1-based,
/// contiguous within a case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseEvidence {
    pub discovery_order: i32,
    #[serde(flatten)]
    pub detail: Evidence,
}

/// A persisted case, including the sealed solution. This type stays on the
/// server side; anything returned to a player goes through [`PublicCase`].
#[derive(Debug, Clone)]
pub struct Case {
    pub id: Uuid,
    pub title: String,
    pub synopsis: String,
    pub domain_type: DomainType,
    pub difficulty: Difficulty,
    pub estimated_minutes: i32,
    pub narrative: CaseNarrative,
    pub evidence: Vec<CaseEvidence>,
    pub encrypted_solution: String,
    pub daily_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Case {
    pub fn is_daily(&self) -> bool {
        self.daily_date.is_some()
    }

    /// Strips the encrypted solution. This is the only way a case leaves the
    /// server; the sealed blob must never ride along on a read path.
    pub fn into_public(self) -> PublicCase {
        PublicCase {
            id: self.id,
            title: self.title,
            synopsis: self.synopsis,
            domain_type: self.domain_type,
            difficulty: self.difficulty,
            estimated_minutes: self.estimated_minutes,
            is_daily: self.daily_date.is_some(),
            setting: self.narrative.setting,
            characters: self.narrative.characters,
            timeline: self.narrative.timeline,
            red_herrings: self.narrative.red_herrings,
            evidence: self.evidence,
            created_at: self.created_at,
        }
    }
}

/// The player-facing view of a case: everything except the solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicCase {
    pub id: Uuid,
    pub title: String,
    pub synopsis: String,
    pub domain_type: DomainType,
    pub difficulty: Difficulty,
    pub estimated_minutes: i32,
    pub is_daily: bool,
    pub setting: Setting,
    pub characters: Vec<Character>,
    pub timeline: Vec<TimelineEvent>,
    pub red_herrings: Vec<RedHerring>,
    pub evidence: Vec<CaseEvidence>,
    pub created_at: DateTime<Utc>,
}

/// A not-yet-persisted case, handed to the store which assigns id and
/// creation timestamp.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub title: String,
    pub synopsis: String,
    pub domain_type: DomainType,
    pub difficulty: Difficulty,
    pub estimated_minutes: i32,
    pub narrative: CaseNarrative,
    pub evidence: Vec<CaseEvidence>,
    pub encrypted_solution: String,
    pub daily_date: Option<NaiveDate>,
}

/// A player's accusation: who did it, why, and the supporting evidence
/// (at most three items, enforced by the lifecycle manager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub culprit_id: String,
    pub motive: String,
    pub key_evidence: Vec<String>,
}

/// One player's recorded progress against one case, keyed by
/// (user_id, mystery_id). `completed_at == None` means in progress; once it
/// is set the record is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub user_id: Uuid,
    pub mystery_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub hints_used: i32,
    pub submission: Option<Submission>,
    pub is_correct: Option<bool>,
    pub score: Option<i32>,
    pub accuracy: Option<f64>,
    pub time_spent_secs: Option<i64>,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Aggregate counters for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    pub user_id: Uuid,
    pub cases_solved: i32,
    pub current_streak: i32,
}

/// Everything the store needs to move an attempt to its terminal state.
/// Applied atomically together with the player counter updates.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub submission: Submission,
    pub is_correct: bool,
    pub score: i32,
    pub accuracy: f64,
    pub time_spent_secs: i64,
    pub completed_at: DateTime<Utc>,
}
