//! Fractional-Kelly stake sizing for finished slips.
//!
//! Kelly formula: f* = (bp - q) / b, with b the net odds of the winning
//! outcome. A slip's EV per dollar is `bp - q`, so f* = EV / b. Power
//! tickets win `combined_odds`; Flex tickets are sized against their
//! all-correct tier. The raw fraction is divided by `kelly_divisor`, capped
//! at `max_bet_pct` and dropped below `min_bet`. Money is carried as
//! `Decimal` and rounded to cents.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{PropGridError, Slip, TicketType};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StakeConfig {
    /// 4.0 = quarter-Kelly.
    pub kelly_divisor: f64,
    /// Largest stake as a fraction of bankroll.
    pub max_bet_pct: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_bet: Decimal,
}

impl Default for StakeConfig {
    fn default() -> Self {
        Self {
            kelly_divisor: 4.0,
            max_bet_pct: 0.05,
            min_bet: dec!(1),
        }
    }
}

/// Stake recommendation for one slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedSlip {
    pub slip_id: String,
    /// Raw Kelly fraction, before divisor and cap.
    pub kelly_fraction: f64,
    /// Bankroll fraction after divisor and cap.
    pub fraction: f64,
    #[serde(with = "rust_decimal::serde::float")]
    pub stake: Decimal,
    /// `stake × EV`.
    #[serde(with = "rust_decimal::serde::float")]
    pub expected_profit: Decimal,
}

// ---------------------------------------------------------------------------
// Sizer
// ---------------------------------------------------------------------------

pub struct StakeSizer {
    config: StakeConfig,
}

impl StakeSizer {
    pub fn new(config: StakeConfig) -> Result<Self, PropGridError> {
        if !config.kelly_divisor.is_finite() || config.kelly_divisor < 1.0 {
            return Err(PropGridError::Config(format!(
                "kelly_divisor must be at least 1, got {}",
                config.kelly_divisor
            )));
        }
        if !(config.max_bet_pct > 0.0 && config.max_bet_pct <= 1.0) {
            return Err(PropGridError::Config(format!(
                "max_bet_pct must be within (0, 1], got {}",
                config.max_bet_pct
            )));
        }
        if config.min_bet < Decimal::ZERO {
            return Err(PropGridError::Config("min_bet cannot be negative".into()));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &StakeConfig {
        &self.config
    }

    /// Stake for one slip, or `None` when the slip doesn't earn a bet.
    pub fn size(&self, slip: &Slip, bankroll: Decimal) -> Option<SizedSlip> {
        if bankroll <= Decimal::ZERO || slip.expected_value <= 0.0 {
            return None;
        }

        let Some(payout_ratio) = net_odds(slip) else {
            debug!(
                slip_id = %slip.slip_id,
                ticket = %slip.ticket_type,
                "No winning payout to size against"
            );
            return None;
        };

        let kelly = slip.expected_value / payout_ratio;
        let fraction = (kelly / self.config.kelly_divisor).min(self.config.max_bet_pct);
        let stake = (bankroll * Decimal::from_f64(fraction)?)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        if stake < self.config.min_bet {
            debug!(
                slip_id = %slip.slip_id,
                stake = %stake,
                min = %self.config.min_bet,
                "Stake below minimum"
            );
            return None;
        }

        let expected_profit = (stake * Decimal::from_f64(slip.expected_value)?)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        debug!(
            slip_id = %slip.slip_id,
            raw_kelly = format!("{:.2}%", kelly * 100.0),
            fraction = format!("{:.2}%", fraction * 100.0),
            stake = format!("${stake}"),
            expected_profit = format!("${expected_profit}"),
            "Slip sized"
        );

        Some(SizedSlip {
            slip_id: slip.slip_id.clone(),
            kelly_fraction: kelly,
            fraction,
            stake,
            expected_profit,
        })
    }

    /// Size every slip independently against the same bankroll.
    pub fn size_portfolio(&self, slips: &[Slip], bankroll: Decimal) -> Vec<SizedSlip> {
        slips.iter().filter_map(|s| self.size(s, bankroll)).collect()
    }
}

/// Net odds `b` of the all-correct outcome, if the ticket pays anything.
fn net_odds(slip: &Slip) -> Option<f64> {
    let gross = match slip.ticket_type {
        TicketType::Power => slip.combined_odds,
        TicketType::Flex => slip.top_multiplier()?,
    };
    let b = gross - 1.0;
    (b.is_finite() && b > 0.0).then_some(b)
}

/// Sum of stakes, as `f64` for log fields.
pub fn total_stake(sized: &[SizedSlip]) -> f64 {
    sized
        .iter()
        .map(|s| s.stake)
        .sum::<Decimal>()
        .to_f64()
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
