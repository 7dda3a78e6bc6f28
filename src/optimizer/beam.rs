//! Beam-search slip builder.
//!
//! Grows leg combinations one leg at a time for a single (ticket type, leg
//! count) target. Partial combinations are index vectors into a read-only
//! pool; each round extends every partial in the beam by every valid leg,
//! scores the results with a confidence/diversity heuristic and keeps the
//! best `beam_width`. Full-size combinations are scored by the EV engine.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::payout::PayoutTable;
use crate::types::{Bet, Slip, TicketType};

/// A partial combination: indices into the pool, in construction order.
type Partial = Vec<usize>;

/// A game already on the slip this many times blocks further legs from it...
const GAME_REPEAT_LIMIT: usize = 3;
/// ...while the slip spans fewer than this many games.
const MIN_DISTINCT_GAMES: usize = 3;

const PLAYER_DIVERSITY_WEIGHT: f64 = 0.10;
const GAME_DIVERSITY_WEIGHT: f64 = 0.05;

/// One beam-search target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTarget {
    pub ticket_type: TicketType,
    pub legs: usize,
    pub beam_width: usize,
    pub max_slips: usize,
}

pub struct BeamSearch<'a> {
    pool: &'a [Bet],
    payouts: &'a PayoutTable,
    max_per_player: usize,
    /// Pool indices by confidence, highest first (stable).
    by_confidence: Vec<usize>,
}

impl<'a> BeamSearch<'a> {
    pub fn new(pool: &'a [Bet], payouts: &'a PayoutTable, max_per_player: usize) -> Self {
        let mut by_confidence: Vec<usize> = (0..pool.len()).collect();
        by_confidence.sort_by(|&a, &b| pool[b].confidence.total_cmp(&pool[a].confidence));
        Self {
            pool,
            payouts,
            max_per_player,
            by_confidence,
        }
    }

    /// Positive-EV slips of exactly `target.legs` legs, best EV first, at most
    /// `target.max_slips`. Slip IDs are left empty for the assembler.
    pub fn search(&self, target: SearchTarget) -> Vec<Slip> {
        let SearchTarget {
            ticket_type,
            legs,
            beam_width,
            max_slips,
        } = target;

        if legs < 2 || beam_width == 0 || max_slips == 0 || self.pool.len() < legs {
            debug!(
                ticket = %ticket_type,
                legs,
                pool = self.pool.len(),
                "Search skipped: pool or target too small"
            );
            return Vec::new();
        }

        let mut beam: Vec<Partial> = self
            .by_confidence
            .iter()
            .take(beam_width.saturating_mul(2))
            .map(|&i| vec![i])
            .collect();

        for size in 2..=legs {
            let expanded = self.expand(&beam);
            if expanded.is_empty() {
                debug!(ticket = %ticket_type, legs, size, "No valid extensions, ending search");
                return Vec::new();
            }

            if size == legs {
                return self.finalize(&expanded, ticket_type, max_slips);
            }

            beam = self.prune(expanded, beam_width);
            debug!(ticket = %ticket_type, legs, size, beam = beam.len(), "Beam pruned");
        }

        Vec::new()
    }

    /// Every valid one-leg extension of every partial. Extensions that land
    /// on a leg set already produced this round are dropped.
    fn expand(&self, beam: &[Partial]) -> Vec<Partial> {
        let mut seen: HashSet<Partial> = HashSet::new();
        let mut expanded = Vec::new();

        for partial in beam {
            for &candidate in &self.by_confidence {
                if !self.can_extend(partial, candidate) {
                    continue;
                }
                let mut next = partial.clone();
                next.push(candidate);

                let mut signature = next.clone();
                signature.sort_unstable();
                if seen.insert(signature) {
                    expanded.push(next);
                }
            }
        }
        expanded
    }

    fn can_extend(&self, partial: &[usize], candidate: usize) -> bool {
        let bet = &self.pool[candidate];

        let mut player_legs = 0;
        let mut game_legs = 0;
        let mut games: BTreeSet<&str> = BTreeSet::new();
        for &i in partial {
            let leg = &self.pool[i];
            if leg.same_prop(bet) {
                return false;
            }
            if leg.player == bet.player {
                player_legs += 1;
            }
            if leg.game == bet.game {
                game_legs += 1;
            }
            games.insert(leg.game.as_str());
        }

        if player_legs >= self.max_per_player {
            return false;
        }
        !(games.len() < MIN_DISTINCT_GAMES && game_legs >= GAME_REPEAT_LIMIT)
    }

    /// `avg_confidence + 0.10 × unique_players/n + 0.05 × unique_games/n`
    pub(crate) fn heuristic(&self, partial: &[usize]) -> f64 {
        let n = partial.len() as f64;
        let mut players: BTreeSet<&str> = BTreeSet::new();
        let mut games: BTreeSet<&str> = BTreeSet::new();
        let mut confidence = 0.0;
        for &i in partial {
            let bet = &self.pool[i];
            confidence += bet.confidence;
            players.insert(bet.player.as_str());
            games.insert(bet.game.as_str());
        }
        confidence / n
            + PLAYER_DIVERSITY_WEIGHT * players.len() as f64 / n
            + GAME_DIVERSITY_WEIGHT * games.len() as f64 / n
    }

    fn prune(&self, expanded: Vec<Partial>, beam_width: usize) -> Vec<Partial> {
        let mut scored: Vec<(f64, Partial)> = expanded
            .into_iter()
            .map(|p| (self.heuristic(&p), p))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(beam_width);
        scored.into_iter().map(|(_, p)| p).collect()
    }

    fn finalize(&self, complete: &[Partial], ticket_type: TicketType, max_slips: usize) -> Vec<Slip> {
        let mut slips: Vec<Slip> = complete
            .iter()
            .filter_map(|partial| self.to_slip(partial, ticket_type))
            .collect();
        slips.sort_by(|a, b| b.expected_value.total_cmp(&a.expected_value));
        slips.truncate(max_slips);

        debug!(
            ticket = %ticket_type,
            candidates = complete.len(),
            kept = slips.len(),
            best_ev = ?slips.first().map(|s| s.expected_value),
            "Search finalized"
        );
        slips
    }

    /// Score a complete combination; `None` unless EV is strictly positive.
    fn to_slip(&self, partial: &[usize], ticket_type: TicketType) -> Option<Slip> {
        let legs: Vec<&Bet> = partial.iter().map(|&i| &self.pool[i]).collect();
        let eval = ticket_type.evaluate(&legs, self.payouts);
        if eval.expected_value <= 0.0 {
            return None;
        }
        Some(Slip {
            slip_id: String::new(),
            ticket_type,
            leg_count: legs.len(),
            legs: legs.into_iter().cloned().collect(),
            expected_value: eval.expected_value,
            combined_odds: eval.combined_odds,
            combined_confidence: eval.combined_confidence,
            payout_tiers: self.payouts.tiers(ticket_type, partial.len()),
        })
    }
}

/// Per-player leg counts on a slip; exposed for invariant checks.
pub fn player_counts(slip: &Slip) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for leg in &slip.legs {
        *counts.entry(leg.player.as_str()).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
