use crate::candidates::{Candidate, EVALUATOR_ID_SCORED};
use crate::scanner::{FrequencyBand, UNKNOWN_RSSI};
use crate::scoring::ScoringParams;

/// RSSI at which the linear scorers reach zero
pub const RSSI_SCORE_OFFSET: i32 = 85;
pub const RSSI_SCORE_SLOPE_IS_4: i32 = 4;
pub const BAND_5GHZ_AWARD_IS_40: i32 = 40;
pub const LAST_SELECTION_AWARD_IS_480: f64 = 480.0;
pub const CURRENT_NETWORK_BOOST_IS_16: i32 = 16;
pub const SAME_BSSID_AWARD_IS_24: i32 = 24;
pub const SECURITY_AWARD_IS_80: i32 = 80;

/// Each step of evaluator priority costs this much
const EVALUATOR_PENALTY: f64 = 1000.0;

/// Implausible readings count as the weakest possible signal
pub fn sanitize_rssi(rssi: i32) -> i32 {
    if (UNKNOWN_RSSI..=0).contains(&rssi) {
        rssi
    } else {
        UNKNOWN_RSSI
    }
}

/// Signal capped at the band's "good" breakpoint
pub fn saturated_rssi(params: &ScoringParams, candidate: &dyn Candidate) -> i32 {
    sanitize_rssi(candidate.scan_rssi()).min(params.good_rssi(candidate.frequency()))
}

pub fn is_high_band(candidate: &dyn Candidate) -> bool {
    FrequencyBand::from_frequency(candidate.frequency()).is_high_band()
}

/// Clamped to [0, 1]; NaN counts as no recent selection
pub fn selection_weight(candidate: &dyn Candidate) -> f64 {
    let weight = candidate.last_selection_weight();
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

/// Penalty emulating strict evaluator priority. Unknown ids rank below all
/// known evaluators.
pub fn evaluator_penalty(evaluator_id: i32) -> f64 {
    let rank = if (0..=EVALUATOR_ID_SCORED).contains(&evaluator_id) {
        evaluator_id
    } else {
        EVALUATOR_ID_SCORED + 1
    };
    EVALUATOR_PENALTY * rank as f64
}

/// Additive score shared by the compatibility and score-card scorers.
///
/// `cutoff` is the RSSI that contributes zero. The raw RSSI divided by 1000
/// breaks ties in favor of the stronger signal, even above saturation.
pub fn linear_score(params: &ScoringParams, candidate: &dyn Candidate, cutoff: i32) -> f64 {
    let rssi = saturated_rssi(params, candidate);
    let mut score = (rssi - cutoff) * RSSI_SCORE_SLOPE_IS_4;

    if is_high_band(candidate) {
        score += BAND_5GHZ_AWARD_IS_40;
    }
    if candidate.is_current_network() {
        score += CURRENT_NETWORK_BOOST_IS_16;
    }
    if candidate.is_current_bssid() {
        score += SAME_BSSID_AWARD_IS_24;
    }
    if !candidate.is_open_network() {
        score += SECURITY_AWARD_IS_80;
    }

    let tie_breaker = sanitize_rssi(candidate.scan_rssi()) as f64 / 1000.0;
    score as f64 + selection_weight(candidate) * LAST_SELECTION_AWARD_IS_480
        - evaluator_penalty(candidate.evaluator_id())
        + tie_breaker
}
