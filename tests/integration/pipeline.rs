//! Full slate runs: file → report → file.

use std::sync::Arc;

use propgrid::config::AppConfig;
use propgrid::filter::{anomaly::LineCanonicalizer, BetFilter};
use propgrid::payout::PayoutTable;
use propgrid::pipeline::SlatePipeline;
use propgrid::storage;
use propgrid::types::Bet;

use crate::fixtures::{make_slate, with_alternates};

fn temp_path(stem: &str) -> String {
    let mut p = std::env::temp_dir();
    p.push(format!("propgrid_it_{stem}_{}.json", uuid::Uuid::new_v4()));
    p.to_string_lossy().to_string()
}

fn default_pipeline() -> SlatePipeline {
    SlatePipeline::from_config(&AppConfig::default(), PayoutTable::default()).unwrap()
}

#[test]
fn test_alternate_lines_never_reach_slips() {
    let bets = with_alternates(make_slate(10, 5), 12);
    let report = default_pipeline().run("alts", &bets, Some(20));

    assert_eq!(report.bets_received, 40 + 24);
    assert_eq!(report.filter_report.output, 40);
    assert_eq!(report.filter_report.demons_filtered, 12);
    assert_eq!(report.filter_report.goblins_filtered, 12);
    assert!(!report.slips.is_empty());
    assert!(report
        .slips
        .iter()
        .flat_map(|s| &s.legs)
        .all(|b| !b.extra.contains_key("alt")));
}

#[test]
fn test_canonicalize_preserves_records() {
    let bets = with_alternates(make_slate(4, 2), 4);
    let canonical = LineCanonicalizer::default().canonicalize(&bets);
    assert_eq!(canonical, make_slate(4, 2));
}

#[test]
fn test_filter_floor() {
    let bets = make_slate(10, 5);
    let pool = BetFilter::default().prepare(&bets);
    let expected = bets.iter().filter(|b| b.confidence >= 0.45).count();
    assert_eq!(pool.bets.len(), expected);
}

#[test]
fn test_file_roundtrip() {
    let input = temp_path("bets");
    let output = temp_path("report");
    let bets = make_slate(10, 5);
    std::fs::write(&input, serde_json::to_string(&bets).unwrap()).unwrap();

    let loaded = storage::load_bets(&input).unwrap();
    assert_eq!(loaded, bets);
    assert_eq!(loaded[0].extra["prop_id"], "PP_00_0");

    let report = default_pipeline().run("file", &loaded, None);
    storage::save_report(&report, &output).unwrap();
    let restored = storage::load_report(&output).unwrap().unwrap();
    assert_eq!(restored, report);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert!(value["slips"][0]["legs"][0].get("prop_id").is_some());

    std::fs::remove_file(&input).unwrap();
    std::fs::remove_file(&output).unwrap();
}

#[test]
fn test_config_driven_run() {
    let toml = r#"
        [optimizer]
        max_per_player = 1

        [portfolio]
        target_slips = 4
        ticket_types = ["FLEX"]

        [staking]
        enabled = false
    "#;
    let cfg = AppConfig::from_toml_str(toml).unwrap();
    let pipeline = SlatePipeline::from_config(&cfg, PayoutTable::default()).unwrap();
    let report = pipeline.run("cfg", &make_slate(12, 4), None);

    assert!(!report.slips.is_empty());
    assert!(report.slips.len() <= 4);
    assert!(report.stakes.is_empty());
    for slip in &report.slips {
        let players: std::collections::HashSet<_> = slip.legs.iter().map(|b| &b.player).collect();
        assert_eq!(players.len(), slip.legs.len());
    }
}

#[tokio::test]
async fn test_concurrent_slates_match_sequential() {
    let pipeline = Arc::new(default_pipeline());
    let slates: Vec<Vec<Bet>> = vec![make_slate(8, 4), make_slate(10, 5), make_slate(12, 3)];

    let sequential: Vec<_> = slates
        .iter()
        .map(|bets| pipeline.run("seq", bets, None).slips)
        .collect();

    let tasks = slates.into_iter().map(|bets| {
        let pipeline = Arc::clone(&pipeline);
        tokio::task::spawn_blocking(move || pipeline.run("par", &bets, None).slips)
    });
    let concurrent: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(sequential, concurrent);
}
