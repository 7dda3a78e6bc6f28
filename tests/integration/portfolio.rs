//! Portfolio-level properties of `SlipOptimizer::optimize`.

use std::collections::{BTreeSet, HashMap, HashSet};

use propgrid::optimizer::beam::player_counts;
use propgrid::optimizer::{OptimizerConfig, SlipOptimizer};
use propgrid::payout::PayoutTable;
use propgrid::types::{LegKey, Slip, SlipKey, TicketType};

use crate::fixtures::{make_bet, make_slate, PROPS};

fn optimizer(config: OptimizerConfig) -> SlipOptimizer {
    SlipOptimizer::new(config, PayoutTable::default()).unwrap()
}

fn assert_portfolio_invariants(slips: &[Slip], target: usize, max_per_player: usize) {
    assert!(slips.len() <= target);
    assert!(slips
        .windows(2)
        .all(|w| w[0].expected_value >= w[1].expected_value));

    let keys: HashSet<SlipKey> = slips.iter().map(Slip::key).collect();
    assert_eq!(keys.len(), slips.len(), "duplicate leg sets in portfolio");

    for slip in slips {
        assert!((2..=6).contains(&slip.leg_count));
        assert_eq!(slip.legs.len(), slip.leg_count);
        assert!(slip.expected_value > 0.0, "{slip}");

        let legs: BTreeSet<_> = slip.legs.iter().map(|b| b.key()).collect();
        assert_eq!(legs.len(), slip.legs.len(), "duplicate prop on {}", slip.slip_id);
        assert!(player_counts(slip).values().all(|&c| c <= max_per_player));
    }
}

#[test]
fn test_portfolio_invariants_default_config() {
    let bets = make_slate(12, 4);
    let slips = optimizer(OptimizerConfig::default()).optimize(&bets, 15, TicketType::ALL);
    assert!(!slips.is_empty());
    assert_portfolio_invariants(&slips, 15, 3);
}

#[test]
fn test_every_leg_clears_global_floor() {
    let bets = make_slate(10, 5);
    let slips = optimizer(OptimizerConfig::default()).optimize(&bets, 20, TicketType::ALL);
    assert!(slips
        .iter()
        .flat_map(|s| &s.legs)
        .all(|b| b.confidence >= 0.45));
}

#[test]
fn test_one_leg_per_player() {
    let config = OptimizerConfig {
        max_per_player: 1,
        ..Default::default()
    };
    let bets = make_slate(10, 5);
    let slips = optimizer(config).optimize(&bets, 12, TicketType::ALL);
    assert!(!slips.is_empty());
    assert_portfolio_invariants(&slips, 12, 1);
}

#[test]
fn test_deterministic() {
    let bets = make_slate(12, 4);
    let optimizer = optimizer(OptimizerConfig::default());
    let first = optimizer.optimize(&bets, 10, TicketType::ALL);
    let second = optimizer.optimize(&bets, 10, TicketType::ALL);
    assert_eq!(first, second);
}

#[test]
fn test_slip_ids_rank_ordered() {
    let bets = make_slate(12, 4);
    let slips = optimizer(OptimizerConfig::default()).optimize(&bets, 10, TicketType::ALL);
    for (rank, slip) in slips.iter().enumerate() {
        let expected = format!("{}-{}L-{:03}", slip.ticket_type, slip.leg_count, rank + 1);
        assert_eq!(slip.slip_id, expected);
    }
}

#[test]
fn test_empty_and_filtered_pools() {
    let optimizer = optimizer(OptimizerConfig::default());
    assert!(optimizer.optimize(&[], 10, TicketType::ALL).is_empty());

    let weak: Vec<_> = (0..8)
        .map(|i| make_bet(&format!("P{i}"), PROPS[i % 4].clone(), 5.5, 0.40, &format!("G{i}")))
        .collect();
    assert!(optimizer.optimize(&weak, 10, TicketType::ALL).is_empty());
}

#[test]
fn test_no_positive_ev_is_empty_not_error() {
    // Above the floor but too weak for either ticket to pay.
    let bets: Vec<_> = (0..8)
        .map(|i| make_bet(&format!("P{i}"), PROPS[i % 4].clone(), 5.5, 0.46, &format!("G{i}")))
        .collect();
    let slips = optimizer(OptimizerConfig::default()).optimize(&bets, 10, TicketType::ALL);
    assert!(slips.is_empty());
}

#[test]
fn test_leg_bounds_respected() {
    let config = OptimizerConfig {
        min_legs: 4,
        max_legs: 5,
        ..Default::default()
    };
    let bets = make_slate(12, 4);
    let slips = optimizer(config).optimize(&bets, 10, &[TicketType::Flex]);
    assert!(!slips.is_empty());
    assert!(slips.iter().all(|s| (4..=5).contains(&s.leg_count)));
    assert!(slips.iter().all(|s| s.ticket_type == TicketType::Flex));
}

#[test]
fn test_power_portfolio() {
    let bets = make_slate(12, 4);
    let slips = optimizer(OptimizerConfig::default()).optimize(&bets, 8, &[TicketType::Power]);
    assert!(!slips.is_empty());
    for slip in &slips {
        assert!(slip.leg_count <= 3);
        assert_eq!(slip.top_multiplier(), PayoutTable::default().power_multiplier(slip.leg_count));
    }
}

#[test]
fn test_target_caps_portfolio() {
    let bets = make_slate(12, 4);
    let optimizer = optimizer(OptimizerConfig::default());
    let small = optimizer.optimize(&bets, 3, TicketType::ALL);
    let large = optimizer.optimize(&bets, 30, TicketType::ALL);
    assert_eq!(small.len(), 3);
    assert!(large.len() > small.len());
    assert_eq!(small[0].expected_value, large[0].expected_value);
}

#[test]
fn test_prop_exposure_bounded_across_portfolio() {
    let bets = make_slate(12, 4);
    let unbounded = optimizer(OptimizerConfig::default()).optimize(&bets, 20, TicketType::ALL);

    for cap in [1, 3] {
        let config = OptimizerConfig {
            max_prop_exposure: Some(cap),
            ..Default::default()
        };
        let slips = optimizer(config).optimize(&bets, 20, TicketType::ALL);
        assert!(!slips.is_empty());
        assert!(slips.len() <= unbounded.len());
        assert_portfolio_invariants(&slips, 20, 3);

        let mut usage: HashMap<LegKey, usize> = HashMap::new();
        for leg in slips.iter().flat_map(|s| &s.legs) {
            *usage.entry(leg.key()).or_default() += 1;
        }
        assert!(usage.values().all(|&n| n <= cap), "cap {cap}: {usage:?}");
    }
}
