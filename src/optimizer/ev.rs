//! Expected-value engine.
//!
//! Scores one finished leg combination under its ticket type. EV is stated
//! against a $1 stake, so `0.25` means +25%.
//!
//! Power: `combined_confidence × combined_odds − 1` (all or nothing).
//!
//! Flex: binomial over the number of hits using the slip's *average* leg
//! confidence as a shared success probability, weighted by the Flex payout
//! tier for each hit count, minus the stake. This is an approximation of the
//! non-identical Bernoulli case and downstream EV comparisons assume it.

use crate::payout::PayoutTable;
use crate::types::{Bet, TicketType};

/// Derived figures for a scored combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub combined_odds: f64,
    pub combined_confidence: f64,
    pub expected_value: f64,
}

/// American odds → decimal odds (stake included).
pub fn american_to_decimal(odds: i32) -> f64 {
    let o = f64::from(odds);
    if odds < 0 {
        -100.0 / o + 1.0
    } else {
        o / 100.0 + 1.0
    }
}

/// Product of per-leg decimal odds.
pub fn combined_odds(legs: &[&Bet]) -> f64 {
    legs.iter().map(|b| b.decimal_odds()).product()
}

/// Product of per-leg confidence, assuming independent legs.
pub fn combined_confidence(legs: &[&Bet]) -> f64 {
    legs.iter().map(|b| b.confidence).product()
}

pub fn average_confidence(legs: &[&Bet]) -> f64 {
    if legs.is_empty() {
        return 0.0;
    }
    legs.iter().map(|b| b.confidence).sum::<f64>() / legs.len() as f64
}

fn choose(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

/// P(exactly `k` successes in `n` trials with success probability `p`).
pub fn binomial_probability(n: usize, k: usize, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    choose(n, k) * p.powi(k as i32) * (1.0 - p).powi((n - k) as i32)
}

/// All-or-nothing EV.
pub fn power_ev(legs: &[&Bet]) -> f64 {
    combined_confidence(legs) * combined_odds(legs) - 1.0
}

/// Tiered EV using the average-confidence binomial model.
pub fn flex_ev(legs: &[&Bet], payouts: &PayoutTable) -> f64 {
    let n = legs.len();
    if n == 0 {
        return -1.0;
    }
    let p = average_confidence(legs);
    let gross: f64 = (0..=n)
        .map(|correct| binomial_probability(n, correct, p) * payouts.flex_multiplier(n, correct))
        .sum();
    gross - 1.0
}

impl TicketType {
    /// EV of `legs` under this ticket type's payout model.
    pub fn expected_value(&self, legs: &[&Bet], payouts: &PayoutTable) -> f64 {
        match self {
            TicketType::Power => power_ev(legs),
            TicketType::Flex => flex_ev(legs, payouts),
        }
    }

    /// Full set of derived figures for a finished combination.
    pub fn evaluate(&self, legs: &[&Bet], payouts: &PayoutTable) -> Evaluation {
        Evaluation {
            combined_odds: combined_odds(legs),
            combined_confidence: combined_confidence(legs),
            expected_value: self.expected_value(legs, payouts),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
