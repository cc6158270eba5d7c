//! crates/mystery_core/src/validate.rs
//!
//! The schema validator: the single gate between raw generative output and
//! the typed domain. Total over arbitrary JSON; any violation yields a typed
//! [`MysteryError::Validation`], never a panic or partial acceptance.

use serde_json::Value;
use std::collections::HashSet;

use crate::domain::GeneratedCase;
use crate::ports::{MysteryError, MysteryResult};

fn violation(field: &str, reason: impl Into<String>) -> MysteryError {
    MysteryError::Validation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Validates an untrusted payload against the case-data contract.
///
/// Structural checks (field presence, types, closed enumerations) are done by
/// typed deserialization; referential and cardinality invariants are checked
/// explicitly afterwards:
/// - at least one character, one evidence item, one timeline event
/// - character and evidence ids unique within the case
/// - the culprit id references an existing character
/// - every key-evidence id references existing evidence
/// - every red-herring annotation references an existing character
pub fn validate(raw: &Value) -> MysteryResult<GeneratedCase> {
    if !raw.is_object() {
        return Err(violation("$", "expected a JSON object"));
    }

    let case: GeneratedCase = serde_json::from_value(raw.clone())
        .map_err(|e| violation("$", e.to_string()))?;

    if case.characters.is_empty() {
        return Err(violation("characters", "a case needs at least one character"));
    }
    if case.evidence.is_empty() {
        return Err(violation("evidence", "a case needs at least one evidence item"));
    }
    if case.timeline.is_empty() {
        return Err(violation("timeline", "a case needs at least one timeline event"));
    }

    let mut character_ids = HashSet::new();
    for character in &case.characters {
        if character.id.is_empty() {
            return Err(violation("characters.id", "character id must be non-empty"));
        }
        if !character_ids.insert(character.id.as_str()) {
            return Err(violation(
                "characters.id",
                format!("duplicate character id `{}`", character.id),
            ));
        }
    }

    let mut evidence_ids = HashSet::new();
    for evidence in &case.evidence {
        if evidence.id.is_empty() {
            return Err(violation("evidence.id", "evidence id must be non-empty"));
        }
        if !evidence_ids.insert(evidence.id.as_str()) {
            return Err(violation(
                "evidence.id",
                format!("duplicate evidence id `{}`", evidence.id),
            ));
        }
    }

    if !character_ids.contains(case.solution.culprit_id.as_str()) {
        return Err(violation(
            "solution.culpritId",
            format!("culprit `{}` is not in the cast", case.solution.culprit_id),
        ));
    }

    for key_id in &case.solution.key_evidence {
        if !evidence_ids.contains(key_id.as_str()) {
            return Err(violation(
                "solution.keyEvidence",
                format!("key evidence `{key_id}` does not exist"),
            ));
        }
    }

    for herring in &case.red_herrings {
        if !character_ids.contains(herring.character_id.as_str()) {
            return Err(violation(
                "redHerrings.characterId",
                format!("red herring points at unknown character `{}`", herring.character_id),
            ));
        }
    }

    Ok(case)
}
