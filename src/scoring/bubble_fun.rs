use crate::candidates::Candidate;
use crate::error::ScoringError;
use crate::scoring::factors::{evaluator_penalty, is_high_band, sanitize_rssi, selection_weight};
use crate::scoring::{CandidateScorer, ScoredCandidate, ScoringParams, SharedScoringParams, choose_best};

const IDENTIFIER: &str = "BubbleFunScorer_v2";

const BELS_PER_DECIBEL: f64 = 0.1;
/// Low-band scores and gains are scaled down by this much
const LOW_BAND_FACTOR: f64 = 0.25;
const TYPICAL_SCAN_RSSI_STD: f64 = 4.0;
const LAST_SELECTION_BOOST: f64 = 22.0;
/// Outweighs the 5 GHz gap between -77 and -68, not the one between -80 and -60
const CURRENT_NETWORK_BOOST: f64 = 40.0;
const SECURITY_AWARD: f64 = 44.0;

/// Scores RSSI along an exponential curve anchored at the band's entry
/// threshold, so the first few dB above the threshold matter far more than
/// signal that is already strong.
#[derive(Debug, Clone)]
pub struct BubbleFunScorer {
    params: SharedScoringParams,
}

fn unscaled_shape(rssi: f64) -> f64 {
    -(-rssi * BELS_PER_DECIBEL).exp()
}

/// Shape normalized so that 0 dBm sits 100 points above -85 dBm
fn shape(rssi: f64) -> f64 {
    let rescale = 100.0 / (unscaled_shape(0.0) - unscaled_shape(-85.0));
    unscaled_shape(rssi) * rescale
}

impl BubbleFunScorer {
    pub const DEFAULT_EXPID: i32 = 42_885_496;

    pub fn new(params: SharedScoringParams) -> Self {
        Self { params }
    }

    fn score_candidate(&self, params: &ScoringParams, candidate: &dyn Candidate) -> ScoredCandidate {
        let rssi = sanitize_rssi(candidate.scan_rssi()) as f64;
        let entry = params.entry_rssi(candidate.frequency()) as f64;

        let mut score = shape(rssi) - shape(entry);
        // Falling below the entry threshold hurts twice as much
        if score < 0.0 {
            score *= 2.0;
        }
        let mut gain = shape(rssi + 0.5) - shape(rssi - 0.5);

        if !is_high_band(candidate) {
            score *= LOW_BAND_FACTOR;
            gain *= LOW_BAND_FACTOR;
        }

        score += selection_weight(candidate) * LAST_SELECTION_BOOST;
        if candidate.is_current_network() {
            score += CURRENT_NETWORK_BOOST;
        }
        if !candidate.is_open_network() {
            score += SECURITY_AWARD;
        }
        score -= evaluator_penalty(candidate.evaluator_id());

        ScoredCandidate {
            value: score,
            err: gain * TYPICAL_SCAN_RSSI_STD,
            candidate_key: Some(candidate.key().clone()),
            user_connect_choice_override: true,
            scorer: IDENTIFIER.to_string(),
            expid: Self::DEFAULT_EXPID,
        }
    }
}

impl CandidateScorer for BubbleFunScorer {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn score_candidates(&self, candidates: &[&dyn Candidate]) -> Result<ScoredCandidate, ScoringError> {
        let params = self.params.snapshot();
        choose_best(IDENTIFIER, candidates, |c| self.score_candidate(&params, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::ConcreteCandidate;

    fn at(frequency: i32, rssi: i32) -> ConcreteCandidate {
        ConcreteCandidate::new()
            .set_evaluator_id(0)
            .set_frequency(frequency)
            .set_scan_rssi(rssi)
    }

    #[test]
    fn test_shape_normalization() {
        assert!((shape(0.0) - shape(-85.0) - 100.0).abs() < 1e-9);
        assert!(shape(-60.0) > shape(-61.0));
    }

    #[test]
    fn test_zero_at_entry_threshold() {
        let scorer = BubbleFunScorer::new(SharedScoringParams::default());
        // 5 GHz entry is -77
        let scored = scorer.score_candidates(&[&at(5180, -77)]).unwrap();
        assert!(scored.value.abs() < 1e-9);
        assert!(scored.err > 0.0);
    }

    #[test]
    fn test_below_entry_is_doubled() {
        let scorer = BubbleFunScorer::new(SharedScoringParams::default());
        let value = scorer.score_candidates(&[&at(5180, -80)]).unwrap().value;
        let expected = 2.0 * (shape(-80.0) - shape(-77.0));
        assert!((value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_low_band_is_damped() {
        let scorer = BubbleFunScorer::new(SharedScoringParams::default());
        let low = scorer.score_candidates(&[&at(2412, -60)]).unwrap();
        let expected = LOW_BAND_FACTOR * (shape(-60.0) - shape(-80.0));
        assert!((low.value - expected).abs() < 1e-9);

        let high = scorer.score_candidates(&[&at(5180, -60)]).unwrap();
        assert!(high.err > low.err);
    }

    #[test]
    fn test_awards() {
        let scorer = BubbleFunScorer::new(SharedScoringParams::default());
        let base = scorer.score_candidates(&[&at(5180, -77)]).unwrap().value;
        let decorated = at(5180, -77)
            .set_open_network(false)
            .set_current_network(true)
            .set_last_selection_weight(0.5);
        let value = scorer.score_candidates(&[&decorated]).unwrap().value;
        assert!((value - base - (44.0 + 40.0 + 11.0)).abs() < 1e-9);
    }
}
