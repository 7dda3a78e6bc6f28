//! Deterministic bet pools for integration tests.

use std::collections::BTreeMap;

use propgrid::types::{Bet, Direction, PropType};

pub const PROPS: [PropType; 4] = [
    PropType::Points,
    PropType::Rebounds,
    PropType::Assists,
    PropType::ThreePointersMade,
];

pub fn make_bet(player: &str, prop_type: PropType, line: f64, confidence: f64, game: &str) -> Bet {
    Bet {
        player: player.to_string(),
        prop_type,
        line,
        direction: Direction::Over,
        odds: -110,
        confidence,
        game: game.to_string(),
        extra: BTreeMap::new(),
    }
}

/// `players` players with every prop in `PROPS`, spread round-robin over
/// `games` games. Confidences cycle through 0.47..=0.64.
pub fn make_slate(players: usize, games: usize) -> Vec<Bet> {
    let mut bets = Vec::new();
    for p in 0..players {
        for (j, prop) in PROPS.iter().enumerate() {
            let confidence = 0.47 + ((p * 5 + j * 7) % 18) as f64 * 0.01;
            let mut bet = make_bet(
                &format!("Player {p:02}"),
                prop.clone(),
                10.5 + (p + j) as f64,
                confidence,
                &format!("GAME{}", p % games),
            );
            bet.extra
                .insert("prop_id".into(), serde_json::json!(format!("PP_{p:02}_{j}")));
            bets.push(bet);
        }
    }
    bets
}

/// `make_slate` plus a far-off demon and goblin for the first `alternates`
/// standard lines.
pub fn with_alternates(mut bets: Vec<Bet>, alternates: usize) -> Vec<Bet> {
    let originals: Vec<Bet> = bets.iter().take(alternates).cloned().collect();
    for standard in originals {
        let mut demon = standard.clone();
        demon.line = standard.line * 1.5;
        demon.extra.insert("alt".into(), serde_json::json!("demon"));
        let mut goblin = standard.clone();
        goblin.line = standard.line * 0.5;
        goblin.extra.insert("alt".into(), serde_json::json!("goblin"));
        bets.push(demon);
        bets.push(goblin);
    }
    bets
}
