//! Runs the registered scorers over a candidate set and reports the active one's pick

use crate::candidates::{Candidate, CandidateSet};
use crate::error::ScoringError;
use crate::scoring::{CandidateScorer, ScoredCandidate, ScorerKind, SharedScoringParams};

type BoxedScorer = Box<dyn CandidateScorer + Send + Sync>;

pub struct NetworkSelector {
    params: SharedScoringParams,
    scorers: Vec<BoxedScorer>,
    /// Network the user explicitly connected to
    user_connect_choice: Option<i32>,
}

impl NetworkSelector {
    pub fn new(params: SharedScoringParams) -> Self {
        Self {
            params,
            scorers: Vec::new(),
            user_connect_choice: None,
        }
    }

    /// Selector with every built-in scorer registered, compatibility first
    pub fn with_builtin_scorers(params: SharedScoringParams) -> Self {
        let mut selector = Self::new(params.clone());
        for kind in ScorerKind::ALL {
            selector.register_candidate_scorer(kind.build(params.clone()));
        }
        selector
    }

    pub fn params(&self) -> &SharedScoringParams {
        &self.params
    }

    /// Register a scorer. One with the same identifier is replaced in place.
    pub fn register_candidate_scorer(&mut self, scorer: BoxedScorer) {
        tracing::debug!(scorer = scorer.identifier(), expid = scorer.experiment_id(), "registering scorer");
        match self
            .scorers
            .iter_mut()
            .find(|s| s.identifier() == scorer.identifier())
        {
            Some(slot) => *slot = scorer,
            None => self.scorers.push(scorer),
        }
    }

    /// Remember (or forget) the network id the user explicitly picked
    pub fn set_user_connect_choice(&mut self, network_id: Option<i32>) {
        self.user_connect_choice = network_id;
    }

    pub fn user_connect_choice(&self) -> Option<i32> {
        self.user_connect_choice
    }

    pub fn unregister_candidate_scorer(&mut self, identifier: &str) -> bool {
        let before = self.scorers.len();
        self.scorers.retain(|s| s.identifier() != identifier);
        self.scorers.len() != before
    }

    pub fn scorer_identifiers(&self) -> Vec<&str> {
        self.scorers.iter().map(|s| s.identifier()).collect()
    }

    /// The scorer whose experiment id matches the `expid` knob, else the first
    /// registered one.
    pub fn active_scorer(&self) -> Option<&dyn CandidateScorer> {
        let expid = self.params.snapshot().experiment_identifier();
        self.scorers
            .iter()
            .find(|s| s.experiment_id() == expid)
            .or_else(|| self.scorers.first())
            .map(|s| &**s as &dyn CandidateScorer)
    }

    /// Score the set with every registered scorer and return the active
    /// scorer's choice.
    pub fn select(&self, candidates: &CandidateSet) -> Result<ScoredCandidate, ScoringError> {
        let active = self.active_scorer().ok_or(ScoringError::NoScorer)?;
        let choice = candidates.choose(active)?;
        tracing::debug!(
            scorer = active.identifier(),
            candidates = candidates.len(),
            choice = ?choice.candidate_key.as_ref().map(ToString::to_string),
            value = choice.value,
            "network selected"
        );

        for scorer in &self.scorers {
            if scorer.identifier() == active.identifier() {
                continue;
            }
            match candidates.choose(&**scorer) {
                Ok(other) => {
                    let agrees = other.candidate_key == choice.candidate_key;
                    tracing::debug!(
                        scorer = scorer.identifier(),
                        active = active.identifier(),
                        agrees,
                        "shadow scorer result"
                    );
                }
                Err(e) => tracing::warn!(scorer = scorer.identifier(), error = %e, "shadow scorer failed"),
            }
        }

        self.apply_user_connect_choice(active, candidates, choice)
    }

    /// Swap in the user's chosen network when both the scorer and its result
    /// allow it and that network is in range.
    fn apply_user_connect_choice(
        &self,
        active: &dyn CandidateScorer,
        candidates: &CandidateSet,
        choice: ScoredCandidate,
    ) -> Result<ScoredCandidate, ScoringError> {
        let Some(network_id) = self.user_connect_choice else {
            return Ok(choice);
        };
        if !active.user_connect_choice_override_wanted() || !choice.user_connect_choice_override {
            return Ok(choice);
        }
        if choice
            .candidate_key
            .as_ref()
            .is_some_and(|key| key.network_id == network_id)
        {
            return Ok(choice);
        }

        let groups = candidates.grouped_candidates();
        let Some(group) = groups.get(&network_id) else {
            tracing::debug!(network_id, "user connect choice not in range");
            return Ok(choice);
        };
        let preferred: Vec<&dyn Candidate> = group.iter().map(|c| *c as &dyn Candidate).collect();
        let overridden = active.score_candidates(&preferred)?;
        tracing::info!(
            network_id,
            scorer = active.identifier(),
            replaced = ?choice.candidate_key.as_ref().map(ToString::to_string),
            "user connect choice overrides selection"
        );
        Ok(overridden)
    }
}

impl std::fmt::Debug for NetworkSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSelector")
            .field("params", &self.params)
            .field("scorers", &self.scorer_identifiers())
            .field("user_connect_choice", &self.user_connect_choice)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::EVALUATOR_ID_SAVED;
    use crate::saved::SavedNetwork;
    use crate::scanner::{ScanResult, SecurityType};
    use crate::scoring::{BubbleFunScorer, CompatibilityScorer, ScoreCardBasedScorer};

    /// Always picks the last candidate
    struct LastScorer;

    impl CandidateScorer for LastScorer {
        fn identifier(&self) -> &str {
            "LastScorer"
        }

        fn score_candidates(&self, candidates: &[&dyn Candidate]) -> Result<ScoredCandidate, ScoringError> {
            let last = candidates.last().ok_or(ScoringError::NoCandidates {
                scorer: self.identifier().to_string(),
            })?;
            Ok(ScoredCandidate {
                value: 0.0,
                err: 0.0,
                candidate_key: Some(last.key().clone()),
                user_connect_choice_override: false,
                scorer: self.identifier().to_string(),
                expid: self.experiment_id(),
            })
        }
    }

    fn candidate_set() -> CandidateSet {
        let home = SavedNetwork::new(1, "HomeNet", SecurityType::Psk);
        let mut set = CandidateSet::new();
        for (bssid, frequency, level) in [("aa:00:00:00:00:01", 5180, -55), ("aa:00:00:00:00:02", 2412, -75)] {
            let scan = ScanResult {
                ssid: "HomeNet".to_string(),
                bssid: bssid.to_string(),
                frequency,
                level,
                capabilities: "[WPA2-PSK-CCMP][ESS]".to_string(),
            };
            set.add(&scan, &home, EVALUATOR_ID_SAVED, 0, 0.0).unwrap();
        }
        set
    }

    fn candidate_set_with_cafe() -> CandidateSet {
        let mut set = candidate_set();
        let cafe = SavedNetwork::new(2, "Cafe", SecurityType::Open);
        let scan = ScanResult {
            ssid: "Cafe".to_string(),
            bssid: "cc:00:00:00:00:01".to_string(),
            frequency: 2412,
            level: -75,
            capabilities: "[ESS]".to_string(),
        };
        set.add(&scan, &cafe, EVALUATOR_ID_SAVED, 0, 0.0).unwrap();
        set
    }

    #[test]
    fn test_user_connect_choice_overrides() {
        let params = SharedScoringParams::default();
        let mut selector = NetworkSelector::with_builtin_scorers(params);
        let set = candidate_set_with_cafe();
        assert_eq!(selector.select(&set).unwrap().candidate_key.unwrap().network_id, 1);

        selector.set_user_connect_choice(Some(2));
        let choice = selector.select(&set).unwrap();
        assert_eq!(choice.scorer, "CompatibilityScorer_v1");
        assert_eq!(choice.candidate_key.unwrap().bssid.to_string(), "cc:00:00:00:00:01");

        // Chosen network out of range
        selector.set_user_connect_choice(Some(42));
        assert_eq!(selector.select(&set).unwrap().candidate_key.unwrap().network_id, 1);

        selector.set_user_connect_choice(None);
        assert_eq!(selector.user_connect_choice(), None);
        assert_eq!(selector.select(&set).unwrap().candidate_key.unwrap().network_id, 1);
    }

    #[test]
    fn test_user_connect_choice_needs_scorer_consent() {
        let mut selector = NetworkSelector::new(SharedScoringParams::default());
        selector.register_candidate_scorer(Box::new(LastScorer));
        selector.set_user_connect_choice(Some(2));

        // LastScorer results do not allow an override
        let choice = selector.select(&candidate_set_with_cafe()).unwrap();
        assert_eq!(choice.candidate_key.unwrap().network_id, 1);
    }

    #[test]
    fn test_no_scorer() {
        let selector = NetworkSelector::new(SharedScoringParams::default());
        assert!(selector.active_scorer().is_none());
        assert_eq!(selector.select(&candidate_set()), Err(ScoringError::NoScorer));
    }

    #[test]
    fn test_falls_back_to_first_registered() {
        let selector = NetworkSelector::with_builtin_scorers(SharedScoringParams::default());
        assert_eq!(
            selector.scorer_identifiers(),
            vec!["CompatibilityScorer_v1", "ScoreCardBasedScorer_v1", "BubbleFunScorer_v2"]
        );
        let choice = selector.select(&candidate_set()).unwrap();
        assert_eq!(choice.scorer, "CompatibilityScorer_v1");
        assert_eq!(choice.candidate_key.unwrap().bssid.to_string(), "aa:00:00:00:00:01");
    }

    #[test]
    fn test_expid_picks_active_scorer() {
        let params = SharedScoringParams::default();
        let selector = NetworkSelector::with_builtin_scorers(params.clone());

        params
            .update(&format!("expid={}", BubbleFunScorer::DEFAULT_EXPID))
            .unwrap();
        assert_eq!(selector.select(&candidate_set()).unwrap().scorer, "BubbleFunScorer_v2");

        params
            .update(&format!("expid={}", ScoreCardBasedScorer::DEFAULT_EXPID))
            .unwrap();
        assert_eq!(selector.select(&candidate_set()).unwrap().scorer, "ScoreCardBasedScorer_v1");
    }

    #[test]
    fn test_register_and_unregister() {
        let params = SharedScoringParams::default();
        let mut selector = NetworkSelector::new(params.clone());
        selector.register_candidate_scorer(Box::new(LastScorer));
        selector.register_candidate_scorer(Box::new(CompatibilityScorer::new(params.clone())));
        selector.register_candidate_scorer(Box::new(LastScorer));
        assert_eq!(selector.scorer_identifiers(), vec!["LastScorer", "CompatibilityScorer_v1"]);

        // LastScorer disagrees with the compatibility scorer here
        let choice = selector.select(&candidate_set()).unwrap();
        assert_eq!(choice.scorer, "LastScorer");
        assert_eq!(choice.candidate_key.unwrap().bssid.to_string(), "aa:00:00:00:00:02");

        assert!(selector.unregister_candidate_scorer("LastScorer"));
        assert!(!selector.unregister_candidate_scorer("LastScorer"));
        assert_eq!(selector.select(&candidate_set()).unwrap().scorer, "CompatibilityScorer_v1");
    }

    #[test]
    fn test_empty_set_is_an_error() {
        let selector = NetworkSelector::with_builtin_scorers(SharedScoringParams::default());
        assert!(matches!(
            selector.select(&CandidateSet::new()),
            Err(ScoringError::NoCandidates { .. })
        ));
    }
}
