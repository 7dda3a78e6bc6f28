//! Payout tables.
//!
//! Maps ticket type and leg count to the multiplier paid for each number of
//! correct legs. Power tickets carry a single all-correct multiplier; Flex
//! tickets carry a tier per correct count. Loaded once from a JSON document
//! (or the built-in default) and read-only afterwards.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::types::{PayoutTier, PropGridError, TicketType};

/// Smallest slip the tables may describe.
pub const MIN_LEGS: usize = 2;
/// Largest slip the tables may describe.
pub const MAX_LEGS: usize = 6;

// ---------------------------------------------------------------------------
// Document format
// ---------------------------------------------------------------------------

/// On-disk form: `{"POWER": {"2_legs": 3.0}, "FLEX": {"3_legs": {"2_correct": 1.2}}}`.
/// Bare numeric keys (`"2"`) are accepted too.
#[derive(Debug, Deserialize)]
struct PayoutDocument {
    #[serde(rename = "POWER", alias = "power", alias = "Power", default)]
    power: BTreeMap<String, f64>,
    #[serde(rename = "FLEX", alias = "flex", alias = "Flex", default)]
    flex: BTreeMap<String, BTreeMap<String, f64>>,
}

fn parse_count(key: &str, suffix: &str) -> Result<usize, PropGridError> {
    let trimmed = key.trim();
    let digits = trimmed.strip_suffix(suffix).unwrap_or(trimmed);
    digits
        .parse::<usize>()
        .map_err(|_| PropGridError::PayoutTable(format!("Unrecognised key: {key:?}")))
}

// ---------------------------------------------------------------------------
// PayoutTable
// ---------------------------------------------------------------------------

/// Validated payout multipliers.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutTable {
    /// legs → all-correct multiplier
    power: BTreeMap<usize, f64>,
    /// legs → (correct → multiplier)
    flex: BTreeMap<usize, BTreeMap<usize, f64>>,
}

impl Default for PayoutTable {
    fn default() -> Self {
        let power = BTreeMap::from([(2, 3.0), (3, 6.0), (4, 10.0), (5, 20.0), (6, 37.5)]);
        let flex = BTreeMap::from([
            (2, BTreeMap::from([(1, 0.4), (2, 2.5)])),
            (3, BTreeMap::from([(1, 0.25), (2, 1.2), (3, 5.0)])),
            (4, BTreeMap::from([(3, 1.5), (4, 5.0)])),
            (5, BTreeMap::from([(3, 0.4), (4, 2.0), (5, 10.0)])),
            (6, BTreeMap::from([(4, 0.4), (5, 2.0), (6, 25.0)])),
        ]);
        Self { power, flex }
    }
}

impl PayoutTable {
    /// Build a table from explicit maps, validating every entry.
    pub fn new(
        power: BTreeMap<usize, f64>,
        flex: BTreeMap<usize, BTreeMap<usize, f64>>,
    ) -> Result<Self, PropGridError> {
        let table = Self { power, flex };
        table.validate()?;
        Ok(table)
    }

    /// Parse a JSON payout document.
    pub fn from_json_str(json: &str) -> Result<Self, PropGridError> {
        let doc: PayoutDocument = serde_json::from_str(json)
            .map_err(|e| PropGridError::PayoutTable(format!("Malformed document: {e}")))?;

        let mut power = BTreeMap::new();
        for (key, multiplier) in &doc.power {
            power.insert(parse_count(key, "_legs")?, *multiplier);
        }

        let mut flex = BTreeMap::new();
        for (key, tiers) in &doc.flex {
            let legs = parse_count(key, "_legs")?;
            let mut parsed = BTreeMap::new();
            for (tier_key, multiplier) in tiers {
                parsed.insert(parse_count(tier_key, "_correct")?, *multiplier);
            }
            flex.insert(legs, parsed);
        }

        Self::new(power, flex)
    }

    /// Load a payout document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payout table: {}", path.display()))?;
        let table = Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse payout table: {}", path.display()))?;
        info!(
            path = %path.display(),
            power_sizes = table.power.len(),
            flex_sizes = table.flex.len(),
            "Payout table loaded"
        );
        Ok(table)
    }

    /// Load from `path` if given and present, otherwise fall back to the
    /// built-in table. A file that exists but fails to parse is an error.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) if Path::new(p).exists() => Self::load(p),
            Some(p) => {
                warn!(path = p, "Payout table not found, using default payouts");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), PropGridError> {
        if self.power.is_empty() && self.flex.is_empty() {
            return Err(PropGridError::PayoutTable("Table defines no payouts".into()));
        }

        let check_legs = |legs: usize, ticket: TicketType| {
            if (MIN_LEGS..=MAX_LEGS).contains(&legs) {
                Ok(())
            } else {
                Err(PropGridError::PayoutTable(format!(
                    "{ticket} entry for {legs} legs outside {MIN_LEGS}..={MAX_LEGS}"
                )))
            }
        };
        let check_multiplier = |m: f64, ticket: TicketType, legs: usize| {
            if m.is_finite() && m >= 0.0 {
                Ok(())
            } else {
                Err(PropGridError::PayoutTable(format!(
                    "{ticket} {legs}-leg multiplier must be finite and non-negative, got {m}"
                )))
            }
        };

        for (&legs, &multiplier) in &self.power {
            check_legs(legs, TicketType::Power)?;
            check_multiplier(multiplier, TicketType::Power, legs)?;
        }
        for (&legs, tiers) in &self.flex {
            check_legs(legs, TicketType::Flex)?;
            for (&correct, &multiplier) in tiers {
                if correct > legs {
                    return Err(PropGridError::PayoutTable(format!(
                        "FLEX {legs}-leg tier for {correct} correct exceeds leg count"
                    )));
                }
                check_multiplier(multiplier, TicketType::Flex, legs)?;
            }
        }
        Ok(())
    }

    /// All-correct multiplier for a Power ticket of `legs` legs.
    pub fn power_multiplier(&self, legs: usize) -> Option<f64> {
        self.power.get(&legs).copied()
    }

    /// Flex multiplier for `correct` hits out of `legs`; zero when the tier
    /// isn't configured.
    pub fn flex_multiplier(&self, legs: usize, correct: usize) -> f64 {
        self.flex
            .get(&legs)
            .and_then(|tiers| tiers.get(&correct))
            .copied()
            .unwrap_or(0.0)
    }

    /// Whether the table has any payout for this ticket type and size.
    pub fn supports(&self, ticket_type: TicketType, legs: usize) -> bool {
        match ticket_type {
            TicketType::Power => self.power.contains_key(&legs),
            TicketType::Flex => self.flex.contains_key(&legs),
        }
    }

    /// Payout schedule attached to a finished slip, ascending by correct count.
    pub fn tiers(&self, ticket_type: TicketType, legs: usize) -> Vec<PayoutTier> {
        match ticket_type {
            TicketType::Power => self
                .power_multiplier(legs)
                .map(|multiplier| {
                    vec![PayoutTier {
                        correct: legs,
                        multiplier,
                    }]
                })
                .unwrap_or_default(),
            TicketType::Flex => self
                .flex
                .get(&legs)
                .map(|tiers| {
                    tiers
                        .iter()
                        .map(|(&correct, &multiplier)| PayoutTier {
                            correct,
                            multiplier,
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
