//! Slip optimizer: portfolio assembly over beam searches.
//!
//! Runs one beam search per (ticket type × leg count) with the pool and
//! quota that ticket type's policy prescribes, then merges, ranks and
//! deduplicates the results into the final portfolio.

pub mod beam;
pub mod ev;
pub mod stake;

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{debug, info};

use crate::filter::DEFAULT_MIN_CONFIDENCE;
use crate::payout::{PayoutTable, MAX_LEGS, MIN_LEGS};
use crate::types::{Bet, LegKey, PropGridError, Slip, TicketType};
use beam::{BeamSearch, SearchTarget};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Power ticket policy: short, high-confidence combinations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PowerPolicy {
    pub leg_counts: Vec<usize>,
    pub min_confidence: f64,
    /// Pool size used when fewer than two bets clear `min_confidence`.
    pub fallback_pool: usize,
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self {
            leg_counts: vec![2, 3],
            min_confidence: 0.55,
            fallback_pool: 10,
        }
    }
}

/// Share of the Flex quota and confidence floor for one leg count.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlexLegTarget {
    pub legs: usize,
    pub share: f64,
    pub min_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlexPolicy {
    pub legs: Vec<FlexLegTarget>,
}

impl Default for FlexPolicy {
    fn default() -> Self {
        let target = |legs, share, min_confidence| FlexLegTarget {
            legs,
            share,
            min_confidence,
        };
        Self {
            legs: vec![
                target(2, 0.30, 0.52),
                target(3, 0.30, 0.52),
                target(4, 0.20, 0.48),
                target(5, 0.10, 0.48),
                target(6, 0.10, 0.48),
            ],
        }
    }
}

/// Search constraints shared by every ticket type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub beam_width: usize,
    /// Global floor applied before any search.
    pub min_confidence: f64,
    pub max_per_player: usize,
    pub min_legs: usize,
    pub max_legs: usize,
    /// Most slips any one prop may appear on across the portfolio. `None`
    /// leaves exposure unbounded.
    pub max_prop_exposure: Option<usize>,
    /// Read from the top-level `[power]` table; see [`crate::config::AppConfig`].
    #[serde(skip)]
    pub power: PowerPolicy,
    /// Read from the top-level `[[flex.legs]]` tables.
    #[serde(skip)]
    pub flex: FlexPolicy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            beam_width: 50,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            max_per_player: 3,
            min_legs: MIN_LEGS,
            max_legs: MAX_LEGS,
            max_prop_exposure: None,
            power: PowerPolicy::default(),
            flex: FlexPolicy::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), PropGridError> {
        let fail = |msg: String| Err(PropGridError::Config(msg));
        let is_probability = |p: f64| (0.0..=1.0).contains(&p);

        if self.beam_width == 0 {
            return fail("beam_width must be positive".into());
        }
        if self.max_per_player == 0 {
            return fail("max_per_player must be at least 1".into());
        }
        if self.max_prop_exposure == Some(0) {
            return fail("max_prop_exposure must be at least 1 when set".into());
        }
        if self.min_legs < MIN_LEGS || self.max_legs > MAX_LEGS || self.min_legs > self.max_legs {
            return fail(format!(
                "leg bounds {}..={} must satisfy {MIN_LEGS} <= min_legs <= max_legs <= {MAX_LEGS}",
                self.min_legs, self.max_legs
            ));
        }
        if !is_probability(self.min_confidence) {
            return fail(format!("min_confidence {} outside [0, 1]", self.min_confidence));
        }
        if !is_probability(self.power.min_confidence) {
            return fail(format!(
                "power.min_confidence {} outside [0, 1]",
                self.power.min_confidence
            ));
        }
        if let Some(legs) = self
            .power
            .leg_counts
            .iter()
            .find(|l| !(MIN_LEGS..=MAX_LEGS).contains(*l))
        {
            return fail(format!("power leg count {legs} outside {MIN_LEGS}..={MAX_LEGS}"));
        }
        for target in &self.flex.legs {
            if !(MIN_LEGS..=MAX_LEGS).contains(&target.legs) {
                return fail(format!(
                    "flex leg count {} outside {MIN_LEGS}..={MAX_LEGS}",
                    target.legs
                ));
            }
            if !target.share.is_finite() || target.share < 0.0 {
                return fail(format!(
                    "flex share for {} legs must be non-negative, got {}",
                    target.legs, target.share
                ));
            }
            if !is_probability(target.min_confidence) {
                return fail(format!(
                    "flex min_confidence for {} legs outside [0, 1]",
                    target.legs
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Optimizer
// ---------------------------------------------------------------------------

/// One planned beam search.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchPlan {
    legs: usize,
    /// Slips this leg count is guaranteed in the portfolio, EV permitting.
    quota: usize,
    min_confidence: f64,
}

/// Portfolio assembler.
///
/// Construct once with a validated configuration and payout table; both are
/// immutable afterwards, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct SlipOptimizer {
    config: OptimizerConfig,
    payouts: PayoutTable,
}

impl SlipOptimizer {
    pub fn new(config: OptimizerConfig, payouts: PayoutTable) -> Result<Self, PropGridError> {
        config.validate()?;
        Ok(Self { config, payouts })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Build a ranked, deduplicated portfolio of at most `target_slips` slips
    /// from the requested ticket types. An empty or fully filtered pool
    /// yields an empty portfolio.
    pub fn optimize(
        &self,
        bets: &[Bet],
        target_slips: usize,
        ticket_types: &[TicketType],
    ) -> Vec<Slip> {
        let pool: Vec<Bet> = bets
            .iter()
            .filter(|b| b.confidence >= self.config.min_confidence)
            .cloned()
            .collect();

        if pool.is_empty() || target_slips == 0 {
            info!(
                bets = bets.len(),
                pool = pool.len(),
                target_slips,
                "Nothing to optimize"
            );
            return Vec::new();
        }

        let mut requested: Vec<TicketType> = Vec::new();
        for &ticket_type in ticket_types {
            if !requested.contains(&ticket_type) {
                requested.push(ticket_type);
            }
        }

        let mut candidates: Vec<Slip> = Vec::new();
        let mut overflow: Vec<Slip> = Vec::new();
        for ticket_type in requested {
            for plan in self.plan(ticket_type, target_slips) {
                let ticket_pool = self.pool_for(&pool, ticket_type, plan.min_confidence);
                let search = BeamSearch::new(&ticket_pool, &self.payouts, self.config.max_per_player);
                let mut found = search.search(SearchTarget {
                    ticket_type,
                    legs: plan.legs,
                    beam_width: self.config.beam_width,
                    max_slips: target_slips,
                });
                info!(
                    ticket = %ticket_type,
                    legs = plan.legs,
                    pool = ticket_pool.len(),
                    quota = plan.quota,
                    found = found.len(),
                    "Beam search complete"
                );
                overflow.extend(found.split_off(plan.quota.min(found.len())));
                candidates.extend(found);
            }
        }

        let portfolio = rank_portfolio(
            candidates,
            overflow,
            target_slips,
            self.config.max_prop_exposure,
        );
        info!(
            pool = pool.len(),
            target_slips,
            slips = portfolio.len(),
            best_ev = ?portfolio.first().map(|s| s.expected_value),
            "Portfolio assembled"
        );
        portfolio
    }

    /// Leg counts, quotas and confidence floors for one ticket type.
    fn plan(&self, ticket_type: TicketType, target_slips: usize) -> Vec<SearchPlan> {
        let in_bounds = |legs: usize| (self.config.min_legs..=self.config.max_legs).contains(&legs);

        let plans: Vec<SearchPlan> = match ticket_type {
            TicketType::Power => self
                .config
                .power
                .leg_counts
                .iter()
                .map(|&legs| SearchPlan {
                    legs,
                    quota: target_slips,
                    min_confidence: self.config.power.min_confidence,
                })
                .collect(),
            TicketType::Flex => self
                .config
                .flex
                .legs
                .iter()
                .filter(|t| t.share > 0.0)
                .map(|t| SearchPlan {
                    legs: t.legs,
                    quota: ((t.share * target_slips as f64).ceil() as usize).max(1),
                    min_confidence: t.min_confidence,
                })
                .collect(),
        };

        plans
            .into_iter()
            .filter(|plan| {
                // Power EV is odds-based, so a missing Power row only loses the tier listing.
                let keep = in_bounds(plan.legs)
                    && (ticket_type.is_all_or_nothing()
                        || self.payouts.supports(ticket_type, plan.legs));
                if !keep {
                    debug!(ticket = %ticket_type, legs = plan.legs, "Leg count not searched");
                }
                keep
            })
            .collect()
    }

    /// Ticket-specific pool. Power falls back to the highest-confidence bets
    /// when too few clear its floor.
    fn pool_for(&self, pool: &[Bet], ticket_type: TicketType, min_confidence: f64) -> Vec<Bet> {
        let qualified: Vec<Bet> = pool
            .iter()
            .filter(|b| b.confidence >= min_confidence)
            .cloned()
            .collect();

        if ticket_type == TicketType::Power && qualified.len() < 2 {
            let mut ranked: Vec<&Bet> = pool.iter().collect();
            ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
            debug!(
                qualified = qualified.len(),
                fallback = self.config.power.fallback_pool,
                "Power pool below two bets, using top-confidence fallback"
            );
            return ranked
                .into_iter()
                .take(self.config.power.fallback_pool)
                .cloned()
                .collect();
        }
        qualified
    }
}

/// Sort by EV (stable), drop duplicate leg sets and truncate. Slips beyond
/// their leg count's quota only fill places the quotas left empty. With
/// `max_prop_exposure` set, a slip is skipped when any of its props already
/// sits on that many admitted slips. IDs are assigned on the final order.
fn rank_portfolio(
    mut candidates: Vec<Slip>,
    mut overflow: Vec<Slip>,
    target_slips: usize,
    max_prop_exposure: Option<usize>,
) -> Vec<Slip> {
    let by_ev = |a: &Slip, b: &Slip| b.expected_value.total_cmp(&a.expected_value);
    candidates.sort_by(by_ev);
    overflow.sort_by(by_ev);

    let mut seen = HashSet::new();
    let mut exposure: HashMap<LegKey, usize> = HashMap::new();
    let mut ranked: Vec<Slip> = Vec::with_capacity(target_slips);

    for slip in candidates.into_iter().chain(overflow) {
        if ranked.len() >= target_slips {
            break;
        }
        let key = slip.key();
        if seen.contains(&key) {
            continue;
        }
        if let Some(cap) = max_prop_exposure {
            if let Some(leg) = key
                .legs
                .iter()
                .find(|leg| exposure.get(*leg).copied().unwrap_or(0) >= cap)
            {
                debug!(leg = %leg, cap, ev = slip.expected_value, "Prop exposure reached, slip skipped");
                continue;
            }
        }
        for leg in &key.legs {
            *exposure.entry(leg.clone()).or_default() += 1;
        }
        seen.insert(key);
        ranked.push(slip);
    }
    ranked.sort_by(by_ev);

    for (rank, slip) in ranked.iter_mut().enumerate() {
        slip.slip_id = format!("{}-{}L-{:03}", slip.ticket_type, slip.leg_count, rank + 1);
    }
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
