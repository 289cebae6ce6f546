//! Smoke run of the selection core against the demo scan

use chrono::Utc;
use wifi_selector::candidates::{Candidate, CandidateSet, ConcreteCandidate};
use wifi_selector::saved::{SavedNetworkSource, demo_saved_networks};
use wifi_selector::scanner::{FrequencyBand, ScanResult, demo_scan_results, parse_scan_dump};
use wifi_selector::scoring::{ScorerKind, SharedScoringParams};
use wifi_selector::selector::NetworkSelector;
use wifi_selector::wakeup::WakeupEvaluator;

fn check(ok: bool, pass: &str, fail: &str, all_passed: &mut bool) {
    if ok {
        println!("   ✓ {}", pass);
    } else {
        println!("   ✗ {}", fail);
        *all_passed = false;
    }
}

fn main() {
    println!("=== Wi-Fi Selector Core Checks ===\n");

    let mut all_passed = true;
    let params = SharedScoringParams::default();

    // 1: Demo scan
    println!("1. Demo scan...");
    let scans = demo_scan_results();
    check(
        scans.len() >= 10,
        &format!("{} sightings", scans.len()),
        &format!("expected at least 10 sightings, got {}", scans.len()),
        &mut all_passed,
    );
    for scan in scans.iter().take(3) {
        println!(
            "     {} ({} dBm {}, {} MHz, {}, {})",
            scan.ssid,
            scan.level,
            scan.signal_bars(),
            scan.frequency,
            scan.band(),
            scan.security()
        );
    }
    println!();

    // 2: Scan dump parsing
    println!("2. Scan dump parsing...");
    match parse_scan_dump("HomeNet|AA:BB:CC:DD:EE:FF|5180|-61|[WPA2-PSK-CCMP][ESS]\n# comment\n") {
        Ok(parsed) => check(
            parsed.len() == 1 && parsed[0].band() == FrequencyBand::Band5GHz,
            "one 5 GHz sighting parsed",
            &format!("unexpected parse result: {:?}", parsed),
            &mut all_passed,
        ),
        Err(e) => check(false, "", &format!("parse failed: {}", e), &mut all_passed),
    }
    check(
        parse_scan_dump("too|short").is_err(),
        "short line rejected",
        "short line accepted",
        &mut all_passed,
    );
    println!();

    // 3: Parameter updates
    println!("3. Scoring parameters...");
    let defaults = params.snapshot();
    check(
        params.update("").is_ok() && *params.snapshot() == *defaults,
        &format!("empty update keeps {}", defaults),
        "empty update changed the parameters",
        &mut all_passed,
    );
    check(
        params.update("rssi2=-60:-70:-80:-90").is_err() && *params.snapshot() == *defaults,
        "decreasing breakpoints rejected, old values kept",
        "bad update was applied",
        &mut all_passed,
    );
    println!();

    // 4: Every scorer prefers 5 GHz at equal signal
    println!("4. Band preference...");
    let low = ConcreteCandidate::new().set_evaluator_id(0).set_frequency(2437).set_scan_rssi(-65);
    let high = ConcreteCandidate::new().set_evaluator_id(0).set_frequency(5180).set_scan_rssi(-65);
    for kind in ScorerKind::ALL {
        let scorer = kind.build(params.clone());
        let a = scorer.score_candidates(&[&low]).map(|s| s.value);
        let b = scorer.score_candidates(&[&high]).map(|s| s.value);
        match (a, b) {
            (Ok(a), Ok(b)) => check(
                b > a,
                &format!("{}: 5 GHz {:.2} > 2.4 GHz {:.2}", scorer.identifier(), b, a),
                &format!("{}: 5 GHz {:.2} <= 2.4 GHz {:.2}", scorer.identifier(), b, a),
                &mut all_passed,
            ),
            _ => check(false, "", &format!("{} failed to score", scorer.identifier()), &mut all_passed),
        }
    }
    println!();

    // 5: Full selection over the demo set
    println!("5. Network selection...");
    let saved = demo_saved_networks();
    let mut candidates = CandidateSet::new();
    let taken = candidates.nominate_saved(&scans, &saved, Utc::now());
    check(
        taken > 0 && candidates.fault_count() == 0,
        &format!("{} candidates from {} saved networks", taken, saved.len()),
        &format!("{} candidates, {} faults", taken, candidates.fault_count()),
        &mut all_passed,
    );

    let selector = NetworkSelector::with_builtin_scorers(params.clone());
    for kind in ScorerKind::ALL {
        let expid = kind.build(params.clone()).experiment_id();
        if let Err(e) = params.update(&format!("expid={}", expid)) {
            check(false, "", &format!("cannot select {}: {}", kind, e), &mut all_passed);
            continue;
        }
        match selector.select(&candidates) {
            Ok(choice) => {
                let chosen = choice.candidate_key.as_ref().and_then(|key| candidates.get(key));
                check(
                    chosen.is_some() && choice.expid == expid,
                    &format!(
                        "{} picked {} ({:.2})",
                        choice.scorer,
                        chosen.map(|c| c.key().to_string()).unwrap_or_default(),
                        choice.value
                    ),
                    &format!("{} picked nothing usable", kind),
                    &mut all_passed,
                );
            }
            Err(e) => check(false, "", &format!("selection failed: {}", e), &mut all_passed),
        }
    }
    println!();

    // 6: Wakeup
    println!("6. Wakeup evaluation...");
    let evaluator = WakeupEvaluator::new(params.clone());
    match saved.saved_identities() {
        Ok(identities) => {
            let viable: Option<&ScanResult> = evaluator.find_viable_network(&scans, &identities);
            check(
                viable.is_some_and(|s| !evaluator.is_below_threshold(s)),
                &format!("would wake up for {:?}", viable.map(|s| &s.ssid)),
                "no viable network in the demo set",
                &mut all_passed,
            );
            check(
                evaluator.find_viable_network(&scans, &Default::default()).is_none(),
                "nothing viable without saved networks",
                "woke up for an unsaved network",
                &mut all_passed,
            );
        }
        Err(e) => check(false, "", &format!("saved identities failed: {}", e), &mut all_passed),
    }
    println!();

    println!("=== Summary ===");
    if all_passed {
        println!("✓ All checks PASSED!");
    } else {
        println!("✗ Some checks FAILED");
        std::process::exit(1);
    }
}
