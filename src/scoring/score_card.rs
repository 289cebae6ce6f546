use crate::candidates::{Candidate, EventKind};
use crate::error::ScoringError;
use crate::scoring::factors::{RSSI_SCORE_OFFSET, linear_score};
use crate::scoring::{CandidateScorer, ScoredCandidate, ScoringParams, SharedScoringParams, choose_best};

const IDENTIFIER: &str = "ScoreCardBasedScorer_v1";

/// Polls needed before the history overrides the default cutoff
const MIN_POLLS_FOR_SIGNIFICANCE: u32 = 30;
/// How far the estimated cutoff may stray from the default
const RSSI_RAIL: i32 = 5;
const ESTIMATION_SIGMAS: f64 = 2.0;

/// Like [`super::CompatibilityScorer`], but the zero point of the RSSI term
/// comes from the BSSID's signal poll history when there is enough of it.
#[derive(Debug, Clone)]
pub struct ScoreCardBasedScorer {
    params: SharedScoringParams,
}

impl ScoreCardBasedScorer {
    pub const DEFAULT_EXPID: i32 = 42_605_111;

    pub fn new(params: SharedScoringParams) -> Self {
        Self { params }
    }

    fn score_candidate(&self, params: &ScoringParams, candidate: &dyn Candidate) -> ScoredCandidate {
        let cutoff = estimated_cutoff(candidate);
        ScoredCandidate {
            value: linear_score(params, candidate, cutoff),
            err: 10.0,
            candidate_key: Some(candidate.key().clone()),
            user_connect_choice_override: true,
            scorer: IDENTIFIER.to_string(),
            expid: Self::DEFAULT_EXPID,
        }
    }
}

/// Mean minus two standard deviations of polled RSSI, kept within
/// `RSSI_RAIL` of the default.
pub(crate) fn estimated_cutoff(candidate: &dyn Candidate) -> i32 {
    let cutoff = -RSSI_SCORE_OFFSET;
    let lowest = cutoff - RSSI_RAIL;
    let highest = cutoff + RSSI_RAIL;

    let Some(rssi) = candidate
        .event_statistics(EventKind::SignalPoll)
        .and_then(|stats| stats.rssi)
    else {
        return cutoff;
    };
    if rssi.count <= MIN_POLLS_FOR_SIGNIFICANCE {
        return cutoff;
    }
    let (Some(mean), Some(variance)) = (rssi.mean(), rssi.variance()) else {
        return cutoff;
    };
    let estimate = mean - ESTIMATION_SIGMAS * variance.sqrt();
    if !estimate.is_finite() {
        return cutoff;
    }
    estimate.clamp(lowest as f64, highest as f64) as i32
}

impl CandidateScorer for ScoreCardBasedScorer {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn score_candidates(&self, candidates: &[&dyn Candidate]) -> Result<ScoredCandidate, ScoringError> {
        let params = self.params.snapshot();
        choose_best(IDENTIFIER, candidates, |c| self.score_candidate(&params, c))
    }
}
