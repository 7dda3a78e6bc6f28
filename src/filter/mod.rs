//! Pre-search filtering: line canonicalization followed by the global
//! confidence floor. The result is the optimizer's input pool.

pub mod anomaly;

use tracing::{debug, info};

use crate::types::{Bet, PropGridError};
use anomaly::{FilterReport, LineCanonicalizer};

/// Default global confidence floor.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.45;

/// Bets ready for the optimizer.
#[derive(Debug, Clone)]
pub struct PreparedPool {
    pub bets: Vec<Bet>,
    pub report: FilterReport,
    /// Canonical lines dropped by the confidence floor.
    pub below_floor: usize,
}

/// Canonicalizes raw lines, then hard-excludes low-confidence bets.
#[derive(Debug, Clone)]
pub struct BetFilter {
    canonicalizer: LineCanonicalizer,
    min_confidence: f64,
}

impl Default for BetFilter {
    fn default() -> Self {
        Self {
            canonicalizer: LineCanonicalizer::default(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl BetFilter {
    pub fn new(canonicalizer: LineCanonicalizer, min_confidence: f64) -> Result<Self, PropGridError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(PropGridError::Config(format!(
                "min_confidence must be within [0, 1], got {min_confidence}"
            )));
        }
        Ok(Self {
            canonicalizer,
            min_confidence,
        })
    }

    pub fn prepare(&self, raw: &[Bet]) -> PreparedPool {
        let (canonical, report) = self.canonicalizer.canonicalize_with_report(raw);
        let before = canonical.len();

        let bets: Vec<Bet> = canonical
            .into_iter()
            .filter(|bet| {
                let keep = bet.confidence >= self.min_confidence;
                if !keep {
                    debug!(
                        player = %bet.player,
                        prop_type = %bet.prop_type,
                        confidence = bet.confidence,
                        floor = self.min_confidence,
                        "Below confidence floor"
                    );
                }
                keep
            })
            .collect();

        let below_floor = before - bets.len();
        info!(
            raw = raw.len(),
            canonical = before,
            pool = bets.len(),
            below_floor,
            "Bet pool prepared"
        );

        PreparedPool {
            bets,
            report,
            below_floor,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
