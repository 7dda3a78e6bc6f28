//! Persistence layer.
//!
//! Loads bet pools from JSON arrays and saves portfolio reports as pretty
//! JSON. Record validation happens here, at the boundary; everything
//! downstream assumes valid bets.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::filter::anomaly::FilterReport;
use crate::optimizer::stake::SizedSlip;
use crate::types::{Bet, PropGridError, Slip};

/// Everything produced for one slate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub slate: String,
    pub generated_at: DateTime<Utc>,
    pub bets_received: usize,
    pub bets_in_pool: usize,
    pub filter_report: FilterReport,
    pub slips: Vec<Slip>,
    #[serde(default)]
    pub stakes: Vec<SizedSlip>,
}

/// Parse a JSON array of bet records. Records that fail to deserialize or
/// validate are skipped with a warning.
pub fn parse_bets(json: &str) -> Result<Vec<Bet>> {
    let value: serde_json::Value = serde_json::from_str(json).context("Bet pool is not valid JSON")?;
    let serde_json::Value::Array(records) = value else {
        return Err(PropGridError::Storage("Bet pool must be a JSON array".into()).into());
    };

    let total = records.len();
    let mut bets = Vec::with_capacity(total);
    for (index, record) in records.into_iter().enumerate() {
        let bet: Bet = match serde_json::from_value(record) {
            Ok(bet) => bet,
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed bet record");
                continue;
            }
        };
        if let Err(e) = bet.validate() {
            warn!(index, error = %e, "Skipping invalid bet");
            continue;
        }
        bets.push(bet);
    }

    debug!(total, valid = bets.len(), "Bet records parsed");
    Ok(bets)
}

/// Load a bet pool from a JSON file.
pub fn load_bets(path: &str) -> Result<Vec<Bet>> {
    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read bets from {path}"))?;
    let bets = parse_bets(&json).context(format!("Failed to parse bets from {path}"))?;
    info!(path, bets = bets.len(), "Bet pool loaded");
    Ok(bets)
}

/// Save a portfolio report, creating parent directories as needed.
pub fn save_report(report: &PortfolioReport, path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create directory for {path}"))?;
    }

    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialise portfolio report")?;
    std::fs::write(path, &json)
        .context(format!("Failed to write report to {path}"))?;

    info!(
        path,
        slate = %report.slate,
        slips = report.slips.len(),
        "Portfolio report saved"
    );
    Ok(())
}

/// Load a previously saved report. Returns None if the file doesn't exist.
pub fn load_report(path: &str) -> Result<Option<PortfolioReport>> {
    if !Path::new(path).exists() {
        debug!(path, "No saved report found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read report from {path}"))?;
    let report: PortfolioReport = serde_json::from_str(&json)
        .context(format!("Failed to parse report from {path}"))?;
    Ok(Some(report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
