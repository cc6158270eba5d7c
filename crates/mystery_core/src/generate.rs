//! crates/mystery_core/src/generate.rs
//!
//! The case generator: picks a domain template, samples setting and motive,
//! builds the generation prompt with its fair-play constraints, invokes the
//! narrative model, and funnels the raw output through the schema validator.
//!
//! The template layer decouples what varies across a domain (settings,
//! motives, counts) from what the model must produce. The fairness
//! constraints in the prompt are the only solvability mechanism the system
//! has; there is no independent solver.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::domain::{Difficulty, DomainType, GeneratedCase};
use crate::ports::{MysteryError, MysteryResult, NarrativeModel};
use crate::validate;

/// Fixed per-domain knobs for generation.
#[derive(Debug)]
pub struct CaseTemplate {
    pub settings: &'static [&'static str],
    pub motives: &'static [&'static str],
    pub evidence_kinds: &'static [&'static str],
    pub suspect_count: u32,
    pub red_herring_count: u32,
}

pub fn template_for(domain: DomainType) -> &'static CaseTemplate {
    match domain {
        DomainType::Homicide => &CaseTemplate {
            settings: &["mansion", "office building", "restaurant", "theater", "cruise ship"],
            motives: &["inheritance", "revenge", "jealousy", "blackmail", "business rivalry"],
            evidence_kinds: &[
                "fingerprints",
                "witness testimony",
                "security footage",
                "financial records",
                "threatening letter",
            ],
            suspect_count: 5,
            red_herring_count: 2,
        },
        DomainType::Theft => &CaseTemplate {
            settings: &["museum", "jewelry store", "art gallery", "bank", "private collection"],
            motives: &["greed", "desperation", "revenge", "thrill", "professional job"],
            evidence_kinds: &[
                "security logs",
                "footprints",
                "tool marks",
                "witness accounts",
                "digital traces",
            ],
            suspect_count: 4,
            red_herring_count: 2,
        },
        DomainType::Disappearance => &CaseTemplate {
            settings: &[
                "small town",
                "university campus",
                "mountain resort",
                "research facility",
                "island retreat",
            ],
            motives: &[
                "escape",
                "kidnapping",
                "accident cover-up",
                "witness protection",
                "personal crisis",
            ],
            evidence_kinds: &[
                "last known location",
                "personal belongings",
                "communication records",
                "travel documents",
                "psychological profile",
            ],
            suspect_count: 6,
            red_herring_count: 3,
        },
        DomainType::Fraud => &CaseTemplate {
            settings: &[
                "corporate office",
                "investment firm",
                "charity organization",
                "tech startup",
                "government agency",
            ],
            motives: &["greed", "covering losses", "lifestyle maintenance", "revenge", "ideological"],
            evidence_kinds: &[
                "financial records",
                "email trails",
                "forged documents",
                "insider testimony",
                "audit reports",
            ],
            suspect_count: 5,
            red_herring_count: 3,
        },
        DomainType::Espionage => &CaseTemplate {
            settings: &["embassy", "tech company", "military base", "research lab", "international summit"],
            motives: &["ideology", "money", "coercion", "revenge", "double agent"],
            evidence_kinds: &[
                "encrypted messages",
                "dead drops",
                "surveillance footage",
                "communication intercepts",
                "behavioral analysis",
            ],
            suspect_count: 6,
            red_herring_count: 4,
        },
    }
}

/// The system role handed to the narrative model on every generation call.
pub const SYSTEM_ROLE: &str = "You are a master mystery writer creating engaging, solvable \
mysteries for a game. Create mysteries that can be solved in 5-10 minutes with logical deduction.";

/// Builds the user prompt: sampled parameters plus the structural and
/// fair-play constraints, ending with the exact JSON shape expected back.
pub fn build_prompt(
    domain: DomainType,
    difficulty: Difficulty,
    setting: &str,
    motive: &str,
    template: &CaseTemplate,
) -> String {
    format!(
        r#"Generate a {domain} mystery with the following specifications:
- Setting: {setting}
- Difficulty: {difficulty}
- True culprit's motive: {motive}
- Number of suspects: {suspects}
- Number of red herrings: {herrings}
- Preferred evidence flavors: {kinds}

Requirements:
1. Create a compelling narrative that can be solved in 5-10 minutes
2. Include {suspects} distinct characters with believable motives
3. Generate a logical timeline of events
4. Create evidence that leads to the solution when properly analyzed
5. Include {herrings} red herrings that seem suspicious but have innocent explanations
6. Ensure the solution is fair - all necessary clues must appear in the evidence list
7. Make character IDs simple (e.g., "char1", "char2", etc.)
8. Evidence IDs should be simple (e.g., "ev1", "ev2", etc.)

The mystery must follow classic detective fiction rules:
- The culprit must be one of the listed characters, introduced early in the story
- All clues must be plainly stated and described
- There must be no supernatural elements
- Nothing outside the generated universe may be required to solve it
- The solution must be logical and satisfying

Return a JSON object matching this exact structure:
{{
  "title": "Engaging mystery title",
  "synopsis": "Brief 2-3 sentence hook",
  "setting": {{
    "location": "Specific location name",
    "time": "Time period or specific time",
    "atmosphere": "Mood and ambiance description"
  }},
  "characters": [
    {{
      "id": "char1",
      "name": "Character Name",
      "role": "Their role/job",
      "description": "Physical and personality description",
      "alibi": "What they claim they were doing",
      "motive": "Potential reason to commit the crime",
      "secrets": ["Secret 1", "Secret 2"]
    }}
  ],
  "timeline": [
    {{
      "time": "Specific time",
      "event": "What happened",
      "visibility": "public|hidden|partial",
      "involvedCharacters": ["char1", "char2"]
    }}
  ],
  "evidence": [
    {{
      "id": "ev1",
      "type": "document|photo|testimony|physical|digital",
      "name": "Evidence name",
      "description": "What it is",
      "revealsInfo": "What it tells the detective",
      "isRedHerring": false,
      "discoveryCondition": "Optional: how/when it's found"
    }}
  ],
  "solution": {{
    "culpritId": "char_id",
    "motive": "Why they did it",
    "method": "How they did it",
    "keyEvidence": ["ev1", "ev2"],
    "explanation": "Full explanation tying everything together"
  }},
  "redHerrings": [
    {{
      "characterId": "char_id",
      "suspiciousActivity": "What makes them look guilty",
      "explanation": "Innocent reason for the activity"
    }}
  ]
}}"#,
        domain = domain.as_str(),
        difficulty = difficulty.as_str(),
        setting = setting,
        motive = motive,
        suspects = template.suspect_count,
        herrings = template.red_herring_count,
        kinds = template.evidence_kinds.join(", "),
    )
}

/// Runs one generation attempt end to end: sample, prompt, model call, parse,
/// validate. Does not retry; a [`MysteryError::Generation`] is safe to retry
/// from the caller.
pub async fn generate<R: Rng>(
    model: &dyn NarrativeModel,
    domain: DomainType,
    difficulty: Difficulty,
    rng: &mut R,
) -> MysteryResult<GeneratedCase> {
    let template = template_for(domain);
    let setting = *template
        .settings
        .choose(rng)
        .ok_or_else(|| MysteryError::Generation("template has no settings".into()))?;
    let motive = *template
        .motives
        .choose(rng)
        .ok_or_else(|| MysteryError::Generation("template has no motives".into()))?;

    debug!(domain = domain.as_str(), %setting, %motive, "requesting case generation");
    let prompt = build_prompt(domain, difficulty, setting, motive, template);
    let raw = model.write_case(SYSTEM_ROLE, &prompt).await?;

    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
        warn!(error = %e, "model output was not parseable JSON");
        MysteryError::Generation(format!("model returned unparseable JSON: {e}"))
    })?;

    validate::validate(&value).map_err(|e| {
        warn!(error = %e, "generated case failed validation");
        MysteryError::Generation(format!("generated case failed validation: {e}"))
    })
}
