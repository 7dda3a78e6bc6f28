//! Shared types for PropGrid.
//!
//! These types form the data model used across all modules: the single
//! proposition leg (`Bet`), the finished combination (`Slip`), and the
//! identities used to deduplicate both. Nothing in the pipeline mutates an
//! input `Bet`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Player-prop market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PropType {
    Points,
    Rebounds,
    Assists,
    ThreePointersMade,
    PointsReboundsAssists,
    Steals,
    Blocks,
    Turnovers,
    FantasyScore,
    /// Any market the enum doesn't name, normalised to lowercase snake_case.
    Other(String),
}

impl PropType {
    /// Canonical snake_case name.
    pub fn as_str(&self) -> &str {
        match self {
            PropType::Points => "points",
            PropType::Rebounds => "rebounds",
            PropType::Assists => "assists",
            PropType::ThreePointersMade => "three_pointers_made",
            PropType::PointsReboundsAssists => "pts_rebs_asts",
            PropType::Steals => "steals",
            PropType::Blocks => "blocks",
            PropType::Turnovers => "turnovers",
            PropType::FantasyScore => "fantasy_score",
            PropType::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a market name (case-insensitive, common provider aliases).
/// Unknown names become `Other`; only a blank name is rejected.
impl std::str::FromStr for PropType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s
            .trim()
            .to_lowercase()
            .replace(['-', ' '], "_");
        match normalised.as_str() {
            "" => Err(anyhow::anyhow!("Empty prop type")),
            "points" | "pts" => Ok(PropType::Points),
            "rebounds" | "rebs" | "reb" => Ok(PropType::Rebounds),
            "assists" | "asts" | "ast" => Ok(PropType::Assists),
            "three_pointers_made" | "3pt_made" | "threes" | "3_pt_made" => {
                Ok(PropType::ThreePointersMade)
            }
            "pts_rebs_asts" | "pra" | "pts+rebs+asts" | "points_rebounds_assists" => {
                Ok(PropType::PointsReboundsAssists)
            }
            "steals" | "stl" => Ok(PropType::Steals),
            "blocks" | "blocked_shots" | "blk" => Ok(PropType::Blocks),
            "turnovers" | "tov" => Ok(PropType::Turnovers),
            "fantasy_score" | "fantasy" | "fantasy_points" => Ok(PropType::FantasyScore),
            other => Ok(PropType::Other(other.to_string())),
        }
    }
}

impl TryFrom<String> for PropType {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropType> for String {
    fn from(value: PropType) -> Self {
        value.as_str().to_string()
    }
}

/// Pick direction relative to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "more", alias = "OVER", alias = "Over")]
    Over,
    #[serde(alias = "less", alias = "UNDER", alias = "Under")]
    Under,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Over => write!(f, "over"),
            Direction::Under => write!(f, "under"),
        }
    }
}

/// Ticket type. Each variant owns its payout semantics; see
/// [`TicketType::evaluate`](crate::optimizer::ev).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketType {
    /// Pays only when every leg hits.
    #[serde(alias = "power", alias = "Power")]
    Power,
    /// Tiered payout; partial hits can still pay.
    #[serde(alias = "flex", alias = "Flex")]
    Flex,
}

impl TicketType {
    pub const ALL: &'static [TicketType] = &[TicketType::Power, TicketType::Flex];

    /// Whether a miss on any leg loses the whole ticket.
    pub fn is_all_or_nothing(&self) -> bool {
        matches!(self, TicketType::Power)
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketType::Power => write!(f, "POWER"),
            TicketType::Flex => write!(f, "FLEX"),
        }
    }
}

impl std::str::FromStr for TicketType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "power" | "power_play" => Ok(TicketType::Power),
            "flex" | "flex_play" => Ok(TicketType::Flex),
            _ => Err(anyhow::anyhow!("Unknown ticket type: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet
// ---------------------------------------------------------------------------

/// Identity of a leg: two bets on the same player and market are the same
/// leg regardless of line or direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegKey {
    pub player: String,
    pub prop_type: PropType,
}

impl fmt::Display for LegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.player, self.prop_type)
    }
}

/// A single proposition leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub player: String,
    pub prop_type: PropType,
    pub line: f64,
    pub direction: Direction,
    /// American odds, e.g. -110 or +150.
    pub odds: i32,
    /// Model win probability, strictly between 0 and 1.
    pub confidence: f64,
    /// Contest identifier; bets sharing it are correlated.
    pub game: String,
    /// Any further fields of the source record, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.odds > 0 { "+" } else { "" };
        write!(
            f,
            "{} {} {} {} ({sign}{}, {:.0}%) [{}]",
            self.player,
            self.prop_type,
            self.direction,
            self.line,
            self.odds,
            self.confidence * 100.0,
            self.game,
        )
    }
}

impl Bet {
    /// Leg identity used for duplicate exclusion.
    pub fn key(&self) -> LegKey {
        LegKey {
            player: self.player.clone(),
            prop_type: self.prop_type.clone(),
        }
    }

    /// Whether two bets are the same leg (same player and market).
    pub fn same_prop(&self, other: &Bet) -> bool {
        self.player == other.player && self.prop_type == other.prop_type
    }

    /// Decimal odds for this leg.
    pub fn decimal_odds(&self) -> f64 {
        crate::optimizer::ev::american_to_decimal(self.odds)
    }

    /// Boundary validation for records entering the pipeline.
    pub fn validate(&self) -> Result<(), PropGridError> {
        let invalid = |reason: String| PropGridError::InvalidBet {
            player: self.player.clone(),
            reason,
        };

        if self.player.trim().is_empty() {
            return Err(invalid("missing player".into()));
        }
        if self.game.trim().is_empty() {
            return Err(invalid("missing game".into()));
        }
        if !self.line.is_finite() {
            return Err(invalid(format!("line is not finite: {}", self.line)));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(invalid(format!(
                "confidence {} outside (0, 1)",
                self.confidence
            )));
        }
        if self.odds.unsigned_abs() < 100 {
            return Err(invalid(format!("American odds {} below magnitude 100", self.odds)));
        }
        Ok(())
    }

    /// Helper to build a test bet with sensible defaults.
    #[cfg(test)]
    pub fn sample(player: &str, prop_type: PropType, confidence: f64, game: &str) -> Self {
        Bet {
            player: player.to_string(),
            prop_type,
            line: 20.5,
            direction: Direction::Over,
            odds: -110,
            confidence,
            game: game.to_string(),
            extra: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Slip
// ---------------------------------------------------------------------------

/// One row of a payout table: the multiplier paid when `correct` legs hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutTier {
    pub correct: usize,
    pub multiplier: f64,
}

/// Portfolio-level identity of a slip: its ticket type and the set of leg
/// identities, independent of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlipKey {
    pub ticket_type: TicketType,
    pub legs: BTreeSet<LegKey>,
}

/// A finished, scored combination of legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slip {
    /// Assigned by the portfolio assembler once the ranking is final.
    pub slip_id: String,
    pub ticket_type: TicketType,
    pub legs: Vec<Bet>,
    pub leg_count: usize,
    pub expected_value: f64,
    /// Product of per-leg decimal odds.
    pub combined_odds: f64,
    /// Product of per-leg confidence (independence assumption).
    pub combined_confidence: f64,
    /// Payout schedule for this ticket type and leg count.
    pub payout_tiers: Vec<PayoutTier>,
}

impl fmt::Display for Slip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let legs: Vec<String> = self.legs.iter().map(|b| b.to_string()).collect();
        write!(
            f,
            "[{} {}L] EV {:+.1}% | odds {:.2}x | {}",
            self.ticket_type,
            self.leg_count,
            self.expected_value * 100.0,
            self.combined_odds,
            legs.join(" + "),
        )
    }
}

impl Slip {
    pub fn key(&self) -> SlipKey {
        SlipKey {
            ticket_type: self.ticket_type,
            legs: self.legs.iter().map(Bet::key).collect(),
        }
    }

    /// Multiplier paid when every leg hits, if the table defines one.
    pub fn top_multiplier(&self) -> Option<f64> {
        self.payout_tiers
            .iter()
            .find(|t| t.correct == self.leg_count)
            .map(|t| t.multiplier)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for PropGrid.
#[derive(Debug, thiserror::Error)]
pub enum PropGridError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Payout table error: {0}")]
    PayoutTable(String),

    #[error("Invalid bet ({player}): {reason}")]
    InvalidBet { player: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- PropType tests --

    #[test]
    fn test_prop_type_from_str() {
        assert_eq!("points".parse::<PropType>().unwrap(), PropType::Points);
        assert_eq!("REBOUNDS".parse::<PropType>().unwrap(), PropType::Rebounds);
        assert_eq!("3-PT Made".parse::<PropType>().unwrap(), PropType::ThreePointersMade);
        assert_eq!("Pts+Rebs+Asts".parse::<PropType>().unwrap(), PropType::PointsReboundsAssists);
        assert_eq!(
            "Free Throws Made".parse::<PropType>().unwrap(),
            PropType::Other("free_throws_made".into())
        );
        assert!("  ".parse::<PropType>().is_err());
    }

    #[test]
    fn test_prop_type_serialization_roundtrip() {
        let json = serde_json::to_string(&PropType::ThreePointersMade).unwrap();
        assert_eq!(json, "\"three_pointers_made\"");
        let parsed: PropType = serde_json::from_str("\"Assists\"").unwrap();
        assert_eq!(parsed, PropType::Assists);
        let other: PropType = serde_json::from_str("\"double_double\"").unwrap();
        assert_eq!(other.to_string(), "double_double");
    }

    // -- Direction / TicketType tests --

    #[test]
    fn test_direction_aliases() {
        let over: Direction = serde_json::from_str("\"more\"").unwrap();
        let under: Direction = serde_json::from_str("\"UNDER\"").unwrap();
        assert_eq!(over, Direction::Over);
        assert_eq!(under, Direction::Under);
        assert_eq!(serde_json::to_string(&Direction::Over).unwrap(), "\"over\"");
    }

    #[test]
    fn test_ticket_type_display_and_parse() {
        assert_eq!(format!("{}", TicketType::Power), "POWER");
        assert_eq!(format!("{}", TicketType::Flex), "FLEX");
        assert_eq!("flex".parse::<TicketType>().unwrap(), TicketType::Flex);
        assert!("parlay".parse::<TicketType>().is_err());
        assert_eq!(serde_json::to_string(&TicketType::Power).unwrap(), "\"POWER\"");
        assert!(TicketType::Power.is_all_or_nothing());
        assert!(!TicketType::Flex.is_all_or_nothing());
    }

    // -- Bet tests --

    #[test]
    fn test_same_prop_ignores_line_and_direction() {
        let a = Bet::sample("A'ja Wilson", PropType::Points, 0.6, "LVA@SEA");
        let mut b = a.clone();
        b.line = 24.5;
        b.direction = Direction::Under;
        assert!(a.same_prop(&b));
        assert_eq!(a.key(), b.key());

        let c = Bet::sample("A'ja Wilson", PropType::Rebounds, 0.6, "LVA@SEA");
        assert!(!a.same_prop(&c));
    }

    #[test]
    fn test_bet_validate() {
        let ok = Bet::sample("Player", PropType::Points, 0.55, "G1");
        assert!(ok.validate().is_ok());

        let mut certain = ok.clone();
        certain.confidence = 1.0;
        assert!(certain.validate().is_err());

        let mut small_odds = ok.clone();
        small_odds.odds = -95;
        assert!(small_odds.validate().is_err());

        let mut no_game = ok.clone();
        no_game.game = String::new();
        assert!(matches!(
            no_game.validate(),
            Err(PropGridError::InvalidBet { .. })
        ));
    }

    #[test]
    fn test_bet_preserves_extra_fields() {
        let json = r#"{
            "player": "Caitlin Clark",
            "prop_type": "assists",
            "line": 8.5,
            "direction": "over",
            "odds": -120,
            "confidence": 0.58,
            "game": "IND@CHI",
            "prop_id": "PP_123",
            "team": "IND"
        }"#;
        let bet: Bet = serde_json::from_str(json).unwrap();
        assert_eq!(bet.prop_type, PropType::Assists);
        assert_eq!(bet.extra.get("prop_id").unwrap(), "PP_123");

        let out = serde_json::to_value(&bet).unwrap();
        assert_eq!(out["team"], "IND");
        assert_eq!(out["prop_type"], "assists");
    }

    // -- Slip tests --

    #[test]
    fn test_slip_key_is_order_independent() {
        let a = Bet::sample("A", PropType::Points, 0.6, "G1");
        let b = Bet::sample("B", PropType::Assists, 0.6, "G2");
        let make = |legs: Vec<Bet>| Slip {
            slip_id: String::new(),
            ticket_type: TicketType::Power,
            leg_count: legs.len(),
            legs,
            expected_value: 0.1,
            combined_odds: 3.6,
            combined_confidence: 0.36,
            payout_tiers: Vec::new(),
        };
        let s1 = make(vec![a.clone(), b.clone()]);
        let s2 = make(vec![b, a]);
        assert_eq!(s1.key(), s2.key());

        let mut s3 = s1.clone();
        s3.ticket_type = TicketType::Flex;
        assert_ne!(s1.key(), s3.key());
    }
}
