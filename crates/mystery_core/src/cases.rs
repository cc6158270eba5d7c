//! crates/mystery_core/src/cases.rs
//!
//! Case orchestration: generate a case, seal its solution, persist it, and
//! serve player-facing reads with the solution stripped. Also owns the
//! daily-case path, including recovery from the create race.

use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::codec::SolutionCodec;
use crate::domain::{
    Case, CaseEvidence, CaseNarrative, Difficulty, DomainType, NewCase, PublicCase,
};
use crate::generate;
use crate::ports::{MysteryError, MysteryResult, MysteryStore, NarrativeModel};

#[derive(Clone)]
pub struct CaseService {
    store: Arc<dyn MysteryStore>,
    model: Arc<dyn NarrativeModel>,
    codec: SolutionCodec,
}

impl CaseService {
    pub fn new(
        store: Arc<dyn MysteryStore>,
        model: Arc<dyn NarrativeModel>,
        codec: SolutionCodec,
    ) -> Self {
        Self { store, model, codec }
    }

    /// Generates and persists a new case. The solution is sealed before the
    /// case ever reaches the store; plaintext solutions exist only inside
    /// the generation call and at grading time.
    pub async fn create_case<R: Rng>(
        &self,
        domain: DomainType,
        difficulty: Difficulty,
        daily_date: Option<NaiveDate>,
        rng: &mut R,
    ) -> MysteryResult<Case> {
        let generated =
            generate::generate(self.model.as_ref(), domain, difficulty, rng).await?;
        let encrypted_solution = self.codec.encrypt(&generated.solution)?;

        let evidence = generated
            .evidence
            .into_iter()
            .enumerate()
            .map(|(index, detail)| CaseEvidence {
                discovery_order: index as i32 + 1,
                detail,
            })
            .collect();

        let case = self
            .store
            .create_case(NewCase {
                title: generated.title,
                synopsis: generated.synopsis,
                domain_type: domain,
                difficulty,
                estimated_minutes: difficulty.estimated_minutes(),
                narrative: CaseNarrative {
                    setting: generated.setting,
                    characters: generated.characters,
                    timeline: generated.timeline,
                    red_herrings: generated.red_herrings,
                },
                evidence,
                encrypted_solution,
                daily_date,
            })
            .await?;

        info!(case_id = %case.id, domain = domain.as_str(), "case created");
        Ok(case)
    }

    /// Player-facing read: the case without its solution.
    pub async fn public_case(&self, id: Uuid) -> MysteryResult<PublicCase> {
        Ok(self.store.get_case(id).await?.into_public())
    }

    /// Today's canonical case, created on first demand: difficulty fixed to
    /// medium, domain chosen uniformly at random. Two racing creators are
    /// resolved by the store's uniqueness constraint on the day bucket; the
    /// loser falls back to reading the winner's record.
    pub async fn daily_case<R: Rng>(&self, rng: &mut R) -> MysteryResult<PublicCase> {
        let today = Utc::now().date_naive();
        if let Some(existing) = self.store.find_daily_case(today).await? {
            return Ok(existing.into_public());
        }

        let domain = DomainType::ALL[rng.gen_range(0..DomainType::ALL.len())];
        match self
            .create_case(domain, Difficulty::Medium, Some(today), rng)
            .await
        {
            Ok(case) => Ok(case.into_public()),
            Err(MysteryError::Conflict(_)) => {
                warn!(%today, "lost the daily-case creation race, reading the winner");
                let winner = self
                    .store
                    .find_daily_case(today)
                    .await?
                    .ok_or_else(|| {
                        MysteryError::Store("daily-case conflict but no winner row".into())
                    })?;
                Ok(winner.into_public())
            }
            Err(e) => Err(e),
        }
    }
}
