use chrono::Utc;
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wifi_selector::candidates::{Candidate, CandidateSet, MacAddress};
use wifi_selector::saved::{
    KnownNetworksPlist, SavedNetwork, SavedNetworkSource, demo_saved_networks, security_from_description,
};
use wifi_selector::scanner::{ScanResult, demo_scan_results, normalize_ssid, parse_scan_dump};
use wifi_selector::scoring::{ScorerKind, SharedScoringParams};
use wifi_selector::selector::NetworkSelector;
use wifi_selector::wakeup::WakeupEvaluator;

#[derive(Parser, Debug)]
#[command(name = "wifi-selector")]
#[command(author = "Aviv E")]
#[command(version = "0.1.0")]
#[command(about = "Rank visible Wi-Fi networks against saved ones and pick the best")]
struct Args {
    /// Scan dump, one SSID|BSSID|FREQ_MHZ|RSSI|CAPABILITIES line per sighting
    #[arg(short, long, conflicts_with = "demo")]
    scan: Option<PathBuf>,

    /// Run with simulated scan results and saved networks
    #[arg(short, long)]
    demo: bool,

    /// Saved network as SSID:SECURITY, e.g. "HomeNet:WPA2 Personal" (repeatable)
    #[arg(long = "saved", value_name = "SSID:SECURITY")]
    saved: Vec<String>,

    /// Read saved networks from a macOS known-networks plist
    #[arg(long, value_name = "PLIST")]
    known_networks: Option<PathBuf>,

    /// Scoring parameters, e.g. rssi2=-83:-80:-73:-60,expid=42885496
    #[arg(short, long, env = "WIFI_SCORE_PARAMS", default_value = "")]
    params: String,

    /// Force a scorer instead of picking one by expid
    #[arg(long, value_name = "compatibility|score-card|bubble")]
    scorer: Option<ScorerKind>,

    /// BSSID of the access point we are associated with
    #[arg(short, long)]
    current: Option<String>,

    /// SSID the user explicitly picked; wins over the scorer when in range
    #[arg(long, value_name = "SSID")]
    user_choice: Option<String>,

    /// Only report whether a saved network is good enough to wake Wi-Fi up
    #[arg(short, long)]
    wakeup: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "wifi_selector=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let params = SharedScoringParams::default();
    params
        .update(&args.params)
        .wrap_err("invalid scoring parameters")?;
    if let Some(kind) = args.scorer {
        let expid = kind.build(params.clone()).experiment_id();
        params.update(&format!("expid={}", expid))?;
    }

    let scans = load_scans(&args)?;
    let saved = load_saved(&args)?;
    println!("{} sightings, {} saved networks", scans.len(), saved.len());

    if args.wakeup {
        let identities = saved.saved_identities()?;
        let evaluator = WakeupEvaluator::new(params);
        match evaluator.find_viable_network(&scans, &identities) {
            Some(scan) => println!(
                "Wake up for {} ({}, {} dBm {})",
                scan.ssid,
                scan.bssid,
                scan.level,
                scan.signal_bars()
            ),
            None => println!("Nothing worth waking up for"),
        }
        return Ok(());
    }

    let mut candidates = CandidateSet::new();
    candidates.nominate_saved(&scans, &saved, Utc::now());
    if let Some(current) = &args.current {
        let bssid: MacAddress = current.parse()?;
        candidates.set_current_bssid(bssid);
    }
    if candidates.is_empty() {
        println!("No saved network in range");
        return Ok(());
    }

    let mut selector = NetworkSelector::with_builtin_scorers(params);
    if let Some(ssid) = &args.user_choice {
        let wanted = normalize_ssid(ssid);
        let network = saved
            .iter()
            .find(|n| normalize_ssid(&n.ssid) == wanted)
            .ok_or_else(|| eyre!("--user-choice {:?} is not a saved network", ssid))?;
        selector.set_user_connect_choice(Some(network.network_id));
    }
    let active = selector
        .active_scorer()
        .ok_or_else(|| eyre!("no scorer registered"))?;
    print_ranking(&candidates, active.identifier(), |c| {
        active.score_candidates(&[c]).map(|scored| scored.value)
    })?;

    let choice = selector.select(&candidates)?;
    match choice.candidate_key.as_ref().and_then(|key| candidates.get(key)) {
        Some(best) => println!(
            "\nSelected {} ({}) by {} [expid {}], score {:.2} \u{00b1} {:.2}",
            best.scan_result().ssid,
            best.key().bssid,
            choice.scorer,
            choice.expid,
            choice.value,
            choice.err
        ),
        None => println!("\nNo candidate selected"),
    }

    Ok(())
}

fn load_scans(args: &Args) -> Result<Vec<ScanResult>> {
    match (&args.scan, args.demo) {
        (Some(path), _) => {
            let dump = std::fs::read_to_string(path).wrap_err_with(|| format!("cannot read {}", path.display()))?;
            Ok(parse_scan_dump(&dump)?)
        }
        (None, true) => Ok(demo_scan_results()),
        (None, false) => Err(eyre!("pass a scan dump with --scan, or --demo")),
    }
}

fn load_saved(args: &Args) -> Result<Vec<SavedNetwork>> {
    let mut saved = Vec::new();

    for entry in &args.saved {
        let (ssid, description) = entry
            .rsplit_once(':')
            .ok_or_else(|| eyre!("expected SSID:SECURITY, got {:?}", entry))?;
        let security =
            security_from_description(description).ok_or_else(|| eyre!("unknown security type {:?}", description))?;
        saved.push(SavedNetwork::new(saved.len() as i32, ssid, security));
    }

    if let Some(path) = &args.known_networks {
        for mut network in KnownNetworksPlist::new(path).saved_networks()? {
            network.network_id = saved.len() as i32;
            saved.push(network);
        }
    }

    if saved.is_empty() && args.demo {
        saved = demo_saved_networks();
    }
    Ok(saved)
}

fn print_ranking<F>(candidates: &CandidateSet, scorer: &str, score: F) -> Result<()>
where
    F: Fn(&dyn Candidate) -> Result<f64, wifi_selector::error::ScoringError>,
{
    let mut rows = Vec::new();
    for candidate in candidates.candidates() {
        rows.push((score(candidate)?, candidate));
    }
    rows.sort_by(|a, b| b.0.total_cmp(&a.0));

    println!("\nRanking by {}:", scorer);
    for (value, candidate) in rows {
        let marker = if candidate.is_current_bssid() { "*" } else { " " };
        println!(
            "{} {:<24} {}  {:>5} MHz  {:>4} dBm  {:>9.2}",
            marker,
            candidate.key().match_info.to_string(),
            candidate.key().bssid,
            candidate.frequency(),
            candidate.scan_rssi(),
            value
        );
    }
    Ok(())
}
