pub mod cases;
pub mod codec;
pub mod domain;
pub mod generate;
pub mod lifecycle;
pub mod ports;
pub mod validate;

pub use cases::CaseService;
pub use codec::SolutionCodec;
pub use domain::{
    Attempt, AttemptOutcome, Case, CaseEvidence, CaseNarrative, Character, Difficulty,
    DomainType, Evidence, EvidenceKind, GeneratedCase, NewCase, PlayerProfile, PublicCase,
    RedHerring, Setting, Solution, Submission, TimelineEvent, Visibility,
};
pub use lifecycle::{AttemptService, HintOutcome, SubmitOutcome};
pub use ports::{MysteryError, MysteryResult, MysteryStore, NarrativeModel};
