//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section has defaults, so a partial (or empty) file is a valid config.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;

use crate::filter::anomaly::DEFAULT_TOLERANCE;
use crate::optimizer::stake::StakeConfig;
use crate::optimizer::{FlexPolicy, OptimizerConfig, PowerPolicy};
use crate::types::TicketType;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub optimizer: OptimizerConfig,
    pub canonicalizer: CanonicalizerConfig,
    pub portfolio: PortfolioConfig,
    pub power: PowerPolicy,
    pub flex: FlexPolicy,
    pub staking: StakingConfig,
    pub guard_rail: GuardRailConfig,
    pub slates: Vec<SlateConfig>,
    /// JSON payout table; built-in defaults when unset or missing.
    pub payout_table_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CanonicalizerConfig {
    pub tolerance: f64,
}

impl Default for CanonicalizerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PortfolioConfig {
    pub target_slips: usize,
    pub ticket_types: Vec<TicketType>,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            target_slips: 10,
            ticket_types: TicketType::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StakingConfig {
    pub enabled: bool,
    #[serde(with = "rust_decimal::serde::float")]
    pub bankroll: Decimal,
    #[serde(flatten)]
    pub sizing: StakeConfig,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bankroll: dec!(1000),
            sizing: StakeConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GuardRailConfig {
    /// Warn when a slate produces fewer slips than this.
    pub min_slips: usize,
}

impl Default for GuardRailConfig {
    fn default() -> Self {
        Self { min_slips: 5 }
    }
}

/// One bet pool to optimize.
#[derive(Debug, Deserialize, Clone)]
pub struct SlateConfig {
    pub name: String,
    /// JSON array of bet records.
    pub input: String,
    /// Where the portfolio report is written.
    pub output: String,
    /// Overrides `portfolio.target_slips` for this slate.
    #[serde(default)]
    pub target_slips: Option<usize>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Optimizer settings with the top-level ticket policies folded in.
    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            power: self.power.clone(),
            flex: self.flex.clone(),
            ..self.optimizer.clone()
        }
    }
}
