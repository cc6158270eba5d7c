//! Integration tests for the attempt lifecycle and the daily-case path,
//! driven by an in-memory store and a scripted narrative model.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use mystery_core::domain::{
    Attempt, AttemptOutcome, Case, CaseEvidence, CaseNarrative, Character, Difficulty,
    DomainType, Evidence, EvidenceKind, NewCase, PlayerProfile, Setting, Solution, Submission,
    TimelineEvent, Visibility,
};
use mystery_core::ports::{MysteryError, MysteryResult, MysteryStore, NarrativeModel};
use mystery_core::{AttemptService, CaseService, SolutionCodec};

//=========================================================================================
// In-memory store
//=========================================================================================

#[derive(Default)]
struct Inner {
    cases: HashMap<Uuid, Case>,
    daily: HashMap<NaiveDate, Uuid>,
    players: HashMap<Uuid, PlayerProfile>,
    attempts: HashMap<(Uuid, Uuid), Attempt>,
}

#[derive(Default)]
struct MemoryStore {
    inner: Mutex<Inner>,
}

#[async_trait]
impl MysteryStore for MemoryStore {
    async fn create_case(&self, new_case: NewCase) -> MysteryResult<Case> {
        let mut inner = self.inner.lock().expect("store lock");
        if let Some(day) = new_case.daily_date {
            if inner.daily.contains_key(&day) {
                return Err(MysteryError::Conflict(format!(
                    "daily case for {day} already exists"
                )));
            }
        }
        let case = Case {
            id: Uuid::new_v4(),
            title: new_case.title,
            synopsis: new_case.synopsis,
            domain_type: new_case.domain_type,
            difficulty: new_case.difficulty,
            estimated_minutes: new_case.estimated_minutes,
            narrative: new_case.narrative,
            evidence: new_case.evidence,
            encrypted_solution: new_case.encrypted_solution,
            daily_date: new_case.daily_date,
            created_at: Utc::now(),
        };
        if let Some(day) = case.daily_date {
            inner.daily.insert(day, case.id);
        }
        inner.cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn get_case(&self, id: Uuid) -> MysteryResult<Case> {
        self.inner
            .lock()
            .expect("store lock")
            .cases
            .get(&id)
            .cloned()
            .ok_or_else(|| MysteryError::NotFound(format!("case {id}")))
    }

    async fn find_daily_case(&self, day: NaiveDate) -> MysteryResult<Option<Case>> {
        let inner = self.inner.lock().expect("store lock");
        Ok(inner
            .daily
            .get(&day)
            .and_then(|id| inner.cases.get(id))
            .cloned())
    }

    async fn get_or_create_player(&self, user_id: Uuid) -> MysteryResult<PlayerProfile> {
        let mut inner = self.inner.lock().expect("store lock");
        Ok(inner
            .players
            .entry(user_id)
            .or_insert_with(|| PlayerProfile {
                user_id,
                cases_solved: 0,
                current_streak: 0,
            })
            .clone())
    }

    async fn find_attempt(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
    ) -> MysteryResult<Option<Attempt>> {
        Ok(self
            .inner
            .lock()
            .expect("store lock")
            .attempts
            .get(&(user_id, mystery_id))
            .cloned())
    }

    async fn create_attempt(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt> {
        let mut inner = self.inner.lock().expect("store lock");
        let attempt = Attempt {
            user_id,
            mystery_id,
            started_at: Utc::now(),
            completed_at: None,
            hints_used: 0,
            submission: None,
            is_correct: None,
            score: None,
            accuracy: None,
            time_spent_secs: None,
        };
        inner.attempts.insert((user_id, mystery_id), attempt.clone());
        Ok(attempt)
    }

    async fn record_hint_use(&self, user_id: Uuid, mystery_id: Uuid) -> MysteryResult<Attempt> {
        let mut inner = self.inner.lock().expect("store lock");
        let attempt = inner
            .attempts
            .get_mut(&(user_id, mystery_id))
            .filter(|a| a.completed_at.is_none())
            .ok_or_else(|| {
                MysteryError::InvalidAttempt("hint on a missing or completed attempt".into())
            })?;
        attempt.hints_used += 1;
        Ok(attempt.clone())
    }

    async fn complete_attempt(
        &self,
        user_id: Uuid,
        mystery_id: Uuid,
        outcome: AttemptOutcome,
    ) -> MysteryResult<Attempt> {
        let mut inner = self.inner.lock().expect("store lock");
        let attempt = inner
            .attempts
            .get_mut(&(user_id, mystery_id))
            .ok_or_else(|| MysteryError::NotFound("attempt".into()))?;
        if attempt.completed_at.is_some() {
            return Err(MysteryError::AlreadyCompleted);
        }
        attempt.completed_at = Some(outcome.completed_at);
        attempt.submission = Some(outcome.submission);
        attempt.is_correct = Some(outcome.is_correct);
        attempt.score = Some(outcome.score);
        attempt.accuracy = Some(outcome.accuracy);
        attempt.time_spent_secs = Some(outcome.time_spent_secs);
        let completed = attempt.clone();

        let player = inner.players.entry(user_id).or_insert_with(|| PlayerProfile {
            user_id,
            cases_solved: 0,
            current_streak: 0,
        });
        if outcome.is_correct {
            player.cases_solved += 1;
            player.current_streak += 1;
        } else {
            player.current_streak = 0;
        }
        Ok(completed)
    }

    async fn attempts_for_player(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> MysteryResult<Vec<Attempt>> {
        let inner = self.inner.lock().expect("store lock");
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        attempts.truncate(limit as usize);
        Ok(attempts)
    }
}

//=========================================================================================
// Scripted narrative model
//=========================================================================================

struct ScriptedModel;

#[async_trait]
impl NarrativeModel for ScriptedModel {
    async fn write_case(&self, _system: &str, _prompt: &str) -> MysteryResult<String> {
        // Yield once so two racing daily_case callers both pass the
        // find-before-create window.
        tokio::task::yield_now().await;
        Ok(serde_json::json!({
            "title": "The Borrowed Key",
            "synopsis": "A vault opens itself at midnight.",
            "setting": {"location": "bank", "time": "midnight", "atmosphere": "hushed"},
            "characters": [
                {"id": "char1", "name": "A", "role": "teller", "description": "d",
                 "alibi": "counting drawers", "secrets": []},
                {"id": "char2", "name": "B", "role": "manager", "description": "d",
                 "alibi": "at dinner", "motive": "greed", "secrets": ["copied the key"]}
            ],
            "timeline": [
                {"time": "23:50", "event": "side door opens", "visibility": "hidden",
                 "involvedCharacters": ["char2"]},
                {"time": "00:05", "event": "vault alarm trips", "visibility": "public",
                 "involvedCharacters": []}
            ],
            "evidence": [
                {"id": "ev1", "type": "digital", "name": "door log", "description": "d",
                 "revealsInfo": "badge swipe at 23:50", "isRedHerring": false},
                {"id": "ev2", "type": "testimony", "name": "waiter's account", "description": "d",
                 "revealsInfo": "the manager left dinner early", "isRedHerring": false},
                {"id": "ev3", "type": "physical", "name": "dropped scarf", "description": "d",
                 "revealsInfo": "belongs to the teller", "isRedHerring": true}
            ],
            "solution": {
                "culpritId": "char2", "motive": "greed", "method": "copied key",
                "keyEvidence": ["ev1", "ev2"], "explanation": "e"
            },
            "redHerrings": [
                {"characterId": "char1", "suspiciousActivity": "stayed late",
                 "explanation": "month-end reconciliation"}
            ]
        })
        .to_string())
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

fn codec() -> SolutionCodec {
    SolutionCodec::new("lifecycle-test-secret").expect("codec")
}

fn known_solution() -> Solution {
    Solution {
        culprit_id: "char1".into(),
        motive: "revenge".into(),
        method: "the candlestick".into(),
        key_evidence: vec!["ev2".into()],
        explanation: "char1 resented years of humiliation".into(),
    }
}

/// Persists a hand-built case with a known solution (culprit `char1`,
/// motive `revenge`, key evidence `ev2`).
async fn seed_case(store: &Arc<MemoryStore>, codec: &SolutionCodec) -> Case {
    let encrypted_solution = codec.encrypt(&known_solution()).expect("seal");
    store
        .create_case(NewCase {
            title: "The Study Door".into(),
            synopsis: "s".into(),
            domain_type: DomainType::Homicide,
            difficulty: Difficulty::Medium,
            estimated_minutes: 7,
            narrative: CaseNarrative {
                setting: Setting {
                    location: "the manor".into(),
                    time: "night".into(),
                    atmosphere: "tense".into(),
                },
                characters: vec![
                    Character {
                        id: "char1".into(),
                        name: "N1".into(),
                        role: "butler".into(),
                        description: "d".into(),
                        alibi: "polishing silver".into(),
                        motive: Some("revenge".into()),
                        secrets: vec![],
                    },
                    Character {
                        id: "char3".into(),
                        name: "N3".into(),
                        role: "heir".into(),
                        description: "d".into(),
                        alibi: "asleep".into(),
                        motive: None,
                        secrets: vec![],
                    },
                ],
                timeline: vec![TimelineEvent {
                    time: "22:00".into(),
                    event: "a shout from the study".into(),
                    visibility: Visibility::Public,
                    involved_characters: vec!["char1".into()],
                }],
                red_herrings: vec![],
            },
            evidence: vec![
                CaseEvidence {
                    discovery_order: 1,
                    detail: Evidence {
                        id: "ev1".into(),
                        kind: EvidenceKind::Physical,
                        name: "a muddy boot".into(),
                        description: "d".into(),
                        reveals_info: "r".into(),
                        is_red_herring: true,
                        discovery_condition: None,
                    },
                },
                CaseEvidence {
                    discovery_order: 2,
                    detail: Evidence {
                        id: "ev2".into(),
                        kind: EvidenceKind::Document,
                        name: "a dismissal letter".into(),
                        description: "d".into(),
                        reveals_info: "r".into(),
                        is_red_herring: false,
                        discovery_condition: None,
                    },
                },
            ],
            encrypted_solution,
            daily_date: None,
        })
        .await
        .expect("seed case")
}

fn services(store: Arc<MemoryStore>) -> (CaseService, AttemptService) {
    let codec = codec();
    let cases = CaseService::new(store.clone(), Arc::new(ScriptedModel), codec.clone());
    let attempts = AttemptService::new(store, codec);
    (cases, attempts)
}

//=========================================================================================
// Lifecycle tests
//=========================================================================================

#[tokio::test]
async fn start_is_idempotent_while_in_progress() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let case = seed_case(&store, &codec()).await;
    let user = Uuid::new_v4();

    let first = attempts.start(user, case.id).await.expect("start");
    let second = attempts.start(user, case.id).await.expect("restart");
    assert_eq!(first.started_at, second.started_at);
    assert!(second.completed_at.is_none());
}

#[tokio::test]
async fn start_fails_for_unknown_case() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store);
    let err = attempts
        .start(Uuid::new_v4(), Uuid::new_v4())
        .await
        .expect_err("no such case");
    assert!(matches!(err, MysteryError::NotFound(_)));
}

#[tokio::test]
async fn completed_attempts_are_immutable() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let case = seed_case(&store, &codec()).await;
    let user = Uuid::new_v4();

    attempts.start(user, case.id).await.expect("start");
    let outcome = attempts
        .submit(
            user,
            case.id,
            Submission {
                culprit_id: "char1".into(),
                motive: "revenge".into(),
                key_evidence: vec!["ev2".into()],
            },
        )
        .await
        .expect("submit");
    let frozen = outcome.attempt.clone();

    let err = attempts.start(user, case.id).await.expect_err("start after completion");
    assert!(matches!(err, MysteryError::AlreadyCompleted));

    let err = attempts.hint(user, case.id, 0).await.expect_err("hint after completion");
    assert!(matches!(err, MysteryError::InvalidAttempt(_)));

    let err = attempts
        .submit(
            user,
            case.id,
            Submission {
                culprit_id: "char3".into(),
                motive: "greed".into(),
                key_evidence: vec![],
            },
        )
        .await
        .expect_err("second submit");
    assert!(matches!(err, MysteryError::AlreadyCompleted));

    let unchanged = store
        .find_attempt(user, case.id)
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(unchanged.completed_at, frozen.completed_at);
    assert_eq!(unchanged.score, frozen.score);
    assert_eq!(unchanged.hints_used, frozen.hints_used);
}

#[tokio::test]
async fn hints_cost_one_each_and_clamp_the_level() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let case = seed_case(&store, &codec()).await;
    let user = Uuid::new_v4();

    let err = attempts.hint(user, case.id, 0).await.expect_err("hint before start");
    assert!(matches!(err, MysteryError::InvalidAttempt(_)));

    attempts.start(user, case.id).await.expect("start");
    let h0 = attempts.hint(user, case.id, 0).await.expect("hint 0");
    assert_eq!(h0.hints_used, 1);
    assert!(h0.hint.contains("timeline"));

    let h3 = attempts.hint(user, case.id, 3).await.expect("hint 3");
    let h9 = attempts.hint(user, case.id, 9).await.expect("hint 9");
    assert_eq!(h3.hint, h9.hint);
    assert_eq!(h9.hints_used, 3);
}

#[tokio::test]
async fn winning_submission_scores_110_and_withholds_the_solution() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let case = seed_case(&store, &codec()).await;
    let user = Uuid::new_v4();

    attempts.start(user, case.id).await.expect("start");
    attempts.hint(user, case.id, 0).await.expect("one hint");

    let outcome = attempts
        .submit(
            user,
            case.id,
            Submission {
                culprit_id: "char1".into(),
                motive: "out of revenge for his brother".into(),
                key_evidence: vec!["ev2".into()],
            },
        )
        .await
        .expect("submit");

    assert_eq!(outcome.attempt.is_correct, Some(true));
    // 100 base + 20 time bonus (well under a minute) - 10 hint penalty.
    assert_eq!(outcome.attempt.score, Some(110));
    assert_eq!(outcome.attempt.accuracy, Some(1.0));
    assert!(outcome.solution.is_none(), "a winner is not shown the solution");

    let player = store.get_or_create_player(user).await.expect("player");
    assert_eq!(player.cases_solved, 1);
    assert_eq!(player.current_streak, 1);
}

#[tokio::test]
async fn losing_submission_reveals_the_solution_and_resets_the_streak() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let codec = codec();
    let won = seed_case(&store, &codec).await;
    let lost = seed_case(&store, &codec).await;
    let user = Uuid::new_v4();

    // Build up a streak first.
    attempts.start(user, won.id).await.expect("start");
    attempts
        .submit(
            user,
            won.id,
            Submission {
                culprit_id: "char1".into(),
                motive: "revenge".into(),
                key_evidence: vec![],
            },
        )
        .await
        .expect("winning submit");

    attempts.start(user, lost.id).await.expect("start");
    for _ in 0..3 {
        attempts.hint(user, lost.id, 0).await.expect("hint");
    }
    let outcome = attempts
        .submit(
            user,
            lost.id,
            Submission {
                culprit_id: "char3".into(),
                motive: "greed".into(),
                key_evidence: vec!["ev1".into()],
            },
        )
        .await
        .expect("losing submit");

    assert_eq!(outcome.attempt.is_correct, Some(false));
    // 0 base + 20 bonus - 30 hint penalty, floored at zero.
    assert_eq!(outcome.attempt.score, Some(0));
    assert_eq!(outcome.attempt.accuracy, Some(0.0));
    let revealed = outcome.solution.expect("a loser learns the answer");
    assert_eq!(revealed, known_solution());

    let player = store.get_or_create_player(user).await.expect("player");
    assert_eq!(player.cases_solved, 1);
    assert_eq!(player.current_streak, 0);
}

#[tokio::test]
async fn submissions_cite_at_most_three_evidence_ids() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let case = seed_case(&store, &codec()).await;
    let user = Uuid::new_v4();

    attempts.start(user, case.id).await.expect("start");
    let err = attempts
        .submit(
            user,
            case.id,
            Submission {
                culprit_id: "char1".into(),
                motive: "revenge".into(),
                key_evidence: vec!["ev1".into(), "ev2".into(), "ev1".into(), "ev2".into()],
            },
        )
        .await
        .expect_err("four ids");
    assert!(matches!(err, MysteryError::InvalidAttempt(_)));
}

#[tokio::test]
async fn history_is_newest_first_for_the_requesting_player() {
    let store = Arc::new(MemoryStore::default());
    let (_, attempts) = services(store.clone());
    let codec = codec();
    let a = seed_case(&store, &codec).await;
    let b = seed_case(&store, &codec).await;
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();

    attempts.start(user, a.id).await.expect("start a");
    attempts.start(user, b.id).await.expect("start b");
    attempts.start(other, a.id).await.expect("other player");

    let history = attempts.history(user).await.expect("history");
    assert_eq!(history.len(), 2);
    assert!(history[0].started_at >= history[1].started_at);
    assert!(history.iter().all(|h| h.user_id == user));
}

//=========================================================================================
// Generation and daily-case tests
//=========================================================================================

#[tokio::test]
async fn generated_cases_persist_with_contiguous_discovery_order() {
    let store = Arc::new(MemoryStore::default());
    let (cases, _) = services(store.clone());
    let mut rng = SmallRng::seed_from_u64(11);

    let case = cases
        .create_case(DomainType::Theft, Difficulty::Easy, None, &mut rng)
        .await
        .expect("generate");

    let orders: Vec<i32> = case.evidence.iter().map(|e| e.discovery_order).collect();
    assert_eq!(orders, (1..=case.evidence.len() as i32).collect::<Vec<_>>());

    let character_ids: Vec<&str> = case
        .narrative
        .characters
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    let solution = codec().decrypt(&case.encrypted_solution).expect("open");
    assert!(character_ids.contains(&solution.culprit_id.as_str()));
    for key in &solution.key_evidence {
        assert!(case.evidence.iter().any(|e| &e.detail.id == key));
    }
    assert_eq!(case.estimated_minutes, 5);
}

#[tokio::test]
async fn public_reads_never_carry_the_solution() {
    let store = Arc::new(MemoryStore::default());
    let (cases, _) = services(store.clone());
    let seeded = seed_case(&store, &codec()).await;

    let public = cases.public_case(seeded.id).await.expect("read");
    let json = serde_json::to_value(&public).expect("serialize");
    let rendered = json.to_string();
    assert!(!rendered.contains("encryptedSolution"));
    assert!(!rendered.contains("culpritId"));

    let err = cases.public_case(Uuid::new_v4()).await.expect_err("missing");
    assert!(matches!(err, MysteryError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_daily_requests_agree_on_one_case() {
    let store = Arc::new(MemoryStore::default());
    let (cases, _) = services(store.clone());

    let mut rng_a = SmallRng::seed_from_u64(1);
    let mut rng_b = SmallRng::seed_from_u64(2);
    let (a, b) = tokio::join!(cases.daily_case(&mut rng_a), cases.daily_case(&mut rng_b));
    let a = a.expect("daily a");
    let b = b.expect("daily b");

    assert_eq!(a.id, b.id);
    assert!(a.is_daily);
    assert_eq!(a.difficulty, Difficulty::Medium);

    let today = Utc::now().date_naive();
    let persisted = store
        .find_daily_case(today)
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(persisted.id, a.id);

    let dailies = store.inner.lock().expect("lock").daily.len();
    assert_eq!(dailies, 1);

    // A later call reuses the same record.
    let mut rng_c = SmallRng::seed_from_u64(3);
    let c = cases.daily_case(&mut rng_c).await.expect("daily c");
    assert_eq!(c.id, a.id);
}
