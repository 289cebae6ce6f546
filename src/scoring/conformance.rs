//! Behaviour every built-in scorer must share

use super::*;
use crate::candidates::{
    Candidate, CandidateKey, ConcreteCandidate, EVALUATOR_ID_SAVED, EventKind, MacAddress, SignalStatistics,
    UnivariateStatistic, UNKNOWN_EVALUATOR_ID,
};
use crate::scanner::{ScanResultMatchInfo, SecurityType};
use proptest::prelude::*;

fn key(n: u8) -> CandidateKey {
    CandidateKey {
        match_info: ScanResultMatchInfo::new(&format!("net{}", n), SecurityType::Open),
        bssid: format!("00:11:22:33:44:{:02x}", n).parse::<MacAddress>().unwrap(),
        network_id: n as i32,
    }
}

/// Saved, open, 2.4 GHz, not current
fn candidate(n: u8, rssi: i32) -> ConcreteCandidate {
    ConcreteCandidate::new()
        .set_key(key(n))
        .set_evaluator_id(EVALUATOR_ID_SAVED)
        .set_frequency(2437)
        .set_scan_rssi(rssi)
}

fn current(n: u8, rssi: i32) -> ConcreteCandidate {
    candidate(n, rssi).set_current_network(true).set_current_bssid(true)
}

fn scorers() -> Vec<Box<dyn CandidateScorer + Send + Sync>> {
    ScorerKind::ALL
        .iter()
        .map(|kind| kind.build(SharedScoringParams::default()))
        .collect()
}

fn winner(scorer: &dyn CandidateScorer, candidates: &[&dyn Candidate]) -> CandidateKey {
    scorer
        .score_candidates(candidates)
        .unwrap()
        .candidate_key
        .unwrap()
}

#[test]
fn test_expids_match_identifiers() {
    for scorer in scorers() {
        let expid = scorer.experiment_id();
        assert_eq!(expid, experiment_id_from_identifier(scorer.identifier()));
        let scored = scorer.score_candidates(&[&candidate(1, -60)]).unwrap();
        assert_eq!(scored.expid, expid);
        assert_eq!(scored.scorer, scorer.identifier());
        assert!(scored.user_connect_choice_override);
        assert!(scorer.user_connect_choice_override_wanted());
    }
}

#[test]
fn test_stronger_signal_wins() {
    for scorer in scorers() {
        let weak = candidate(1, -71);
        let strong = candidate(2, -70);
        assert_eq!(winner(&*scorer, &[&weak, &strong]), key(2), "{}", scorer.identifier());
        assert_eq!(winner(&*scorer, &[&strong, &weak]), key(2), "{}", scorer.identifier());
    }
}

#[test]
fn test_high_band_preferred() {
    for scorer in scorers() {
        let low = candidate(1, -70).set_frequency(2432);
        let high = candidate(2, -70).set_frequency(5180);
        assert_eq!(winner(&*scorer, &[&low, &high]), key(2), "{}", scorer.identifier());
    }
}

#[test]
fn test_secured_preferred() {
    for scorer in scorers() {
        let open = candidate(1, -40);
        let secured = candidate(2, -40).set_open_network(false);
        assert_eq!(winner(&*scorer, &[&open, &secured]), key(2), "{}", scorer.identifier());
    }
}

#[test]
fn test_current_network_is_sticky() {
    for frequency in [2437, 5180] {
        for scorer in scorers() {
            let mine = current(1, -77).set_frequency(frequency);
            let other = candidate(2, -68).set_frequency(frequency);
            assert_eq!(
                winner(&*scorer, &[&other, &mine]),
                key(1),
                "{} at {}",
                scorer.identifier(),
                frequency
            );
        }
    }
}

#[test]
fn test_large_gap_overrides_stickiness() {
    for scorer in scorers() {
        let mine = current(1, -80).set_frequency(5180);
        let other = candidate(2, -60).set_frequency(5180);
        assert_eq!(winner(&*scorer, &[&mine, &other]), key(2), "{}", scorer.identifier());
    }
}

#[test]
fn test_no_switch_above_saturation() {
    let params = ScoringParams::default();
    for frequency in [2437, 5180] {
        for scorer in scorers() {
            let mine = current(1, params.good_rssi(frequency)).set_frequency(frequency);
            let other = candidate(2, -1).set_frequency(frequency);
            assert_eq!(
                winner(&*scorer, &[&other, &mine]),
                key(1),
                "{} at {}",
                scorer.identifier(),
                frequency
            );
        }
    }
}

#[test]
fn test_empty_input_is_an_error() {
    for scorer in scorers() {
        assert!(matches!(
            scorer.score_candidates(&[]),
            Err(ScoringError::NoCandidates { .. })
        ));
    }
}

#[test]
fn test_sentinels_score_lowest() {
    for scorer in scorers() {
        let unknown = ConcreteCandidate::new().set_key(key(1));
        let bogus = candidate(2, 40).set_frequency(-7).set_evaluator_id(UNKNOWN_EVALUATOR_ID);
        let weak = candidate(3, -90);
        assert_eq!(winner(&*scorer, &[&unknown, &bogus, &weak]), key(3), "{}", scorer.identifier());

        let scored = scorer.score_candidates(&[&unknown]).unwrap();
        assert!(scored.value.is_finite());
    }
}

#[test]
fn test_first_of_equals_wins() {
    for scorer in scorers() {
        let a = candidate(1, -65);
        let b = candidate(2, -65);
        assert_eq!(winner(&*scorer, &[&a, &b]), key(1));
        assert_eq!(winner(&*scorer, &[&b, &a]), key(2));
    }
}

#[test]
fn test_empty_update_changes_nothing() {
    let params = SharedScoringParams::default();
    let before = params.snapshot();
    params.update("").unwrap();
    assert_eq!(*params.snapshot(), *before);

    for kind in ScorerKind::ALL {
        let scorer = kind.build(params.clone());
        let fresh = kind.build(SharedScoringParams::default());
        let c = candidate(1, -66);
        assert_eq!(
            scorer.score_candidates(&[&c]).unwrap(),
            fresh.score_candidates(&[&c]).unwrap()
        );
    }
}

#[test]
fn test_bubble_prefers_low_band_near_fringe() {
    let scorer = ScorerKind::BubbleFunction.build(SharedScoringParams::default());
    let low = candidate(1, -78).set_frequency(2412);
    let high = candidate(2, -78).set_frequency(5180);
    assert_eq!(winner(&*scorer, &[&high, &low]), key(1));
}

#[test]
fn test_score_card_history_changes_outcome() {
    let scorer = ScorerKind::ScoreCardBased.build(SharedScoringParams::default());
    let mut rssi = UnivariateStatistic::default();
    for _ in 0..50 {
        rssi.record(-55.0);
    }
    let history = SignalStatistics {
        rssi: Some(rssi),
        link_speed: None,
    };

    // Without history the stronger one wins by a single point
    let plain = candidate(1, -70);
    let stronger = candidate(2, -69);
    assert_eq!(winner(&*scorer, &[&plain, &stronger]), key(2));

    // A strong track record raises the cutoff of the second
    let veteran = candidate(2, -69).set_event_statistics(EventKind::SignalPoll, history);
    assert_eq!(winner(&*scorer, &[&plain, &veteran]), key(1));
}

proptest! {
    #[test]
    fn prop_scoring_is_deterministic(
        rssis in proptest::collection::vec(-127i32..=0, 1..8),
        five_ghz in any::<bool>(),
    ) {
        let frequency = if five_ghz { 5200 } else { 2462 };
        let candidates: Vec<ConcreteCandidate> = rssis
            .iter()
            .enumerate()
            .map(|(i, rssi)| candidate(i as u8, *rssi).set_frequency(frequency))
            .collect();
        let refs: Vec<&dyn Candidate> = candidates.iter().map(|c| c as &dyn Candidate).collect();

        for scorer in scorers() {
            let first = scorer.score_candidates(&refs).unwrap();
            let second = scorer.score_candidates(&refs).unwrap();
            prop_assert_eq!(first.value.to_bits(), second.value.to_bits());
            prop_assert_eq!(first.candidate_key, second.candidate_key);
        }
    }

    #[test]
    fn prop_monotonic_in_rssi(rssi in -126i32..=0, frequency in prop_oneof![Just(2412), Just(5180), Just(5975)]) {
        for scorer in scorers() {
            let lower = candidate(1, rssi - 1).set_frequency(frequency);
            let higher = candidate(2, rssi).set_frequency(frequency);
            let a = scorer.score_candidates(&[&lower]).unwrap().value;
            let b = scorer.score_candidates(&[&higher]).unwrap().value;
            prop_assert!(b > a, "{}: {} vs {}", scorer.identifier(), a, b);
        }
    }
}
