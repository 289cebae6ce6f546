mod bubble_fun;
mod compatibility;
pub(crate) mod factors;
mod params;
mod score_card;

#[cfg(test)]
mod conformance;

pub use bubble_fun::BubbleFunScorer;
pub use compatibility::CompatibilityScorer;
pub use params::{ScoringParams, SharedScoringParams};
pub use score_card::ScoreCardBasedScorer;

use crate::candidates::{Candidate, CandidateKey};
use crate::error::ScoringError;
use std::fmt;
use std::str::FromStr;

const ID_PREFIX: i32 = 42_000_000;
const ID_SUFFIX_MOD: u32 = 1_000_000;

/// Outcome of scoring: the winning candidate's key and its score.
///
/// Scores are only comparable between results of the same scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub value: f64,
    /// Estimated uncertainty of `value`
    pub err: f64,
    pub candidate_key: Option<CandidateKey>,
    pub user_connect_choice_override: bool,
    pub scorer: String,
    pub expid: i32,
}

impl ScoredCandidate {
    /// Loses against any real score
    pub fn none(scorer: &str) -> Self {
        Self {
            value: f64::NEG_INFINITY,
            err: f64::INFINITY,
            candidate_key: None,
            user_connect_choice_override: false,
            scorer: scorer.to_string(),
            expid: experiment_id_from_identifier(scorer),
        }
    }
}

/// A way of ranking candidates
pub trait CandidateScorer {
    /// Stable, versioned name; the experiment id is derived from it
    fn identifier(&self) -> &str;

    /// Pick the best of a non-empty collection.
    ///
    /// On equal scores the earlier candidate wins.
    fn score_candidates(&self, candidates: &[&dyn Candidate]) -> Result<ScoredCandidate, ScoringError>;

    /// Whether an explicit user connect choice may override this scorer's pick
    fn user_connect_choice_override_wanted(&self) -> bool {
        true
    }

    fn experiment_id(&self) -> i32 {
        experiment_id_from_identifier(self.identifier())
    }
}

/// Map a scorer identifier into 42000000..=42999999.
///
/// Uses the 31-multiplier string hash over UTF-16 code units so ids stay
/// stable across processes and platforms.
pub fn experiment_id_from_identifier(id: &str) -> i32 {
    let hash = id
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32));
    ID_PREFIX + (hash.unsigned_abs() % ID_SUFFIX_MOD) as i32
}

/// Shared loop of the built-in scorers: score each candidate, keep the first
/// strictly best.
fn choose_best<F>(scorer: &str, candidates: &[&dyn Candidate], score: F) -> Result<ScoredCandidate, ScoringError>
where
    F: Fn(&dyn Candidate) -> ScoredCandidate,
{
    if candidates.is_empty() {
        return Err(ScoringError::NoCandidates {
            scorer: scorer.to_string(),
        });
    }

    let mut choice = ScoredCandidate::none(scorer);
    for candidate in candidates {
        let scored = score(*candidate);
        tracing::trace!(scorer, key = %candidate.key(), value = scored.value, "scored candidate");
        if scored.value > choice.value {
            choice = scored;
        }
    }
    Ok(choice)
}

/// Built-in scorer variants, selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerKind {
    Compatibility,
    ScoreCardBased,
    BubbleFunction,
}

impl ScorerKind {
    pub const ALL: [ScorerKind; 3] = [
        ScorerKind::Compatibility,
        ScorerKind::ScoreCardBased,
        ScorerKind::BubbleFunction,
    ];

    pub fn build(self, params: SharedScoringParams) -> Box<dyn CandidateScorer + Send + Sync> {
        match self {
            ScorerKind::Compatibility => Box::new(CompatibilityScorer::new(params)),
            ScorerKind::ScoreCardBased => Box::new(ScoreCardBasedScorer::new(params)),
            ScorerKind::BubbleFunction => Box::new(BubbleFunScorer::new(params)),
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorerKind::Compatibility => write!(f, "compatibility"),
            ScorerKind::ScoreCardBased => write!(f, "score-card"),
            ScorerKind::BubbleFunction => write!(f, "bubble"),
        }
    }
}

impl FromStr for ScorerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compatibility" | "compat" => Ok(ScorerKind::Compatibility),
            "score-card" | "scorecard" => Ok(ScorerKind::ScoreCardBased),
            "bubble" | "bubble-fun" => Ok(ScorerKind::BubbleFunction),
            other => Err(format!("unknown scorer {:?}", other)),
        }
    }
}
