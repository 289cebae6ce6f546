use crate::candidates::Candidate;
use crate::error::ScoringError;
use crate::scoring::factors::{RSSI_SCORE_OFFSET, linear_score};
use crate::scoring::{CandidateScorer, ScoredCandidate, ScoringParams, SharedScoringParams, choose_best};

const IDENTIFIER: &str = "CompatibilityScorer_v1";

/// Additive weighted score over a fixed RSSI offset, reproducing the classic
/// network selection behaviour.
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    params: SharedScoringParams,
}

impl CompatibilityScorer {
    /// Experiment id of [`IDENTIFIER`]
    pub const DEFAULT_EXPID: i32 = 42_793_142;

    pub fn new(params: SharedScoringParams) -> Self {
        Self { params }
    }

    fn score_candidate(&self, params: &ScoringParams, candidate: &dyn Candidate) -> ScoredCandidate {
        ScoredCandidate {
            value: linear_score(params, candidate, -RSSI_SCORE_OFFSET),
            err: 10.0,
            candidate_key: Some(candidate.key().clone()),
            user_connect_choice_override: true,
            scorer: IDENTIFIER.to_string(),
            expid: Self::DEFAULT_EXPID,
        }
    }
}

impl CandidateScorer for CompatibilityScorer {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn score_candidates(&self, candidates: &[&dyn Candidate]) -> Result<ScoredCandidate, ScoringError> {
        let params = self.params.snapshot();
        choose_best(IDENTIFIER, candidates, |c| self.score_candidate(&params, c))
    }
}
