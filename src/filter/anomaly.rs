//! Line canonicalization (demon/goblin filter).
//!
//! Providers often list several lines for the same player and market: the
//! standard line plus easier (goblin) and harder (demon) variants. This pass
//! collapses each `(player, prop_type)` group to the one standard line.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{Bet, LegKey, PropGridError, PropType};

/// Default relative line difference above which two lines are treated as
/// standard plus alternate.
pub const DEFAULT_TOLERANCE: f64 = 0.15;

/// Anything with a player, a market and a numeric line can be canonicalized.
pub trait PropLine {
    fn player(&self) -> &str;
    fn prop_type(&self) -> &PropType;
    fn line(&self) -> f64;
}

impl PropLine for Bet {
    fn player(&self) -> &str {
        &self.player
    }

    fn prop_type(&self) -> &PropType {
        &self.prop_type
    }

    fn line(&self) -> f64 {
        self.line
    }
}

/// Classification of one line within its player/prop group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineClass {
    /// Easier-than-standard alternate.
    Goblin,
    Standard,
    /// Harder-than-standard alternate.
    Demon,
}

/// Summary of one canonicalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub input: usize,
    pub output: usize,
    pub demons_filtered: usize,
    pub goblins_filtered: usize,
}

impl FilterReport {
    /// Lines removed in total.
    pub fn removed(&self) -> usize {
        self.input - self.output
    }
}

/// Collapses duplicate lines to one canonical line per player/prop.
#[derive(Debug, Clone)]
pub struct LineCanonicalizer {
    tolerance: f64,
}

impl Default for LineCanonicalizer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl LineCanonicalizer {
    /// `tolerance` is a fraction (0.15 = 15%).
    pub fn new(tolerance: f64) -> Result<Self, PropGridError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(PropGridError::Config(format!(
                "Canonicalizer tolerance must be a non-negative fraction, got {tolerance}"
            )));
        }
        Ok(Self { tolerance })
    }

    /// One record per `(player, prop_type)`, in first-seen group order.
    pub fn canonicalize<L: PropLine + Clone>(&self, lines: &[L]) -> Vec<L> {
        self.canonicalize_with_report(lines).0
    }

    /// Like [`canonicalize`](Self::canonicalize), also counting what was dropped.
    pub fn canonicalize_with_report<L: PropLine + Clone>(
        &self,
        lines: &[L],
    ) -> (Vec<L>, FilterReport) {
        let mut report = FilterReport {
            input: lines.len(),
            ..Default::default()
        };

        let groups = group_by_prop(lines);
        let mut kept = Vec::with_capacity(groups.len());

        for group in &groups {
            let chosen = match group.len() {
                1 => group[0],
                2 => {
                    let (first, second) = (group[0], group[1]);
                    let (lower, upper) = if lines[second].line() < lines[first].line() {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    if self.exceeds_tolerance(lines[lower].line(), lines[upper].line()) {
                        debug!(
                            player = lines[lower].player(),
                            prop_type = %lines[lower].prop_type(),
                            kept = lines[lower].line(),
                            dropped = lines[upper].line(),
                            "Filtered demon line"
                        );
                        report.demons_filtered += 1;
                        lower
                    } else {
                        first
                    }
                }
                n => {
                    let sorted = sorted_by_line(lines, group);
                    let middle = n / 2;
                    debug!(
                        player = lines[sorted[middle]].player(),
                        prop_type = %lines[sorted[middle]].prop_type(),
                        kept = lines[sorted[middle]].line(),
                        alternates = n - 1,
                        "Filtered demon/goblin lines"
                    );
                    report.goblins_filtered += middle;
                    report.demons_filtered += n - middle - 1;
                    sorted[middle]
                }
            };
            kept.push(lines[chosen].clone());
        }

        report.output = kept.len();
        info!(
            input = report.input,
            output = report.output,
            demons = report.demons_filtered,
            goblins = report.goblins_filtered,
            "Line canonicalization complete"
        );
        (kept, report)
    }

    /// Label each line of a single player/prop group, in input order.
    pub fn classify<L: PropLine>(&self, group: &[L]) -> Vec<LineClass> {
        let mut classes = vec![LineClass::Standard; group.len()];
        if group.len() < 2 {
            return classes;
        }

        let indices: Vec<usize> = (0..group.len()).collect();
        let sorted = sorted_by_line(group, &indices);
        let (lowest, highest) = (sorted[0], sorted[sorted.len() - 1]);

        if group.len() == 2 && !self.exceeds_tolerance(group[lowest].line(), group[highest].line()) {
            return classes;
        }
        classes[lowest] = LineClass::Goblin;
        classes[highest] = LineClass::Demon;
        classes
    }

    /// Relative difference measured against the lower line.
    fn exceeds_tolerance(&self, lower: f64, upper: f64) -> bool {
        if lower <= 0.0 {
            return upper != lower;
        }
        (upper - lower).abs() / lower > self.tolerance
    }
}

/// Indices of `lines` grouped by leg identity, groups in first-seen order and
/// members in input order.
fn group_by_prop<L: PropLine>(lines: &[L]) -> Vec<Vec<usize>> {
    let mut slot: HashMap<LegKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let key = LegKey {
            player: line.player().to_string(),
            prop_type: line.prop_type().clone(),
        };
        match slot.get(&key) {
            Some(&g) => groups[g].push(i),
            None => {
                slot.insert(key, groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// Stable sort of a group's indices by line value.
fn sorted_by_line<L: PropLine>(lines: &[L], group: &[usize]) -> Vec<usize> {
    let mut sorted = group.to_vec();
    sorted.sort_by(|&a, &b| lines[a].line().total_cmp(&lines[b].line()));
    sorted
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
