//! Slate pipeline: canonicalize → floor → optimize → size.
//!
//! Instantiate once from the application config; `run` is pure with respect
//! to the pipeline and can be called from several threads at once.

use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::AppConfig;
use crate::filter::anomaly::LineCanonicalizer;
use crate::filter::BetFilter;
use crate::optimizer::stake::{total_stake, StakeSizer};
use crate::optimizer::SlipOptimizer;
use crate::payout::PayoutTable;
use crate::storage::PortfolioReport;
use crate::types::{Bet, TicketType};

pub struct SlatePipeline {
    filter: BetFilter,
    optimizer: SlipOptimizer,
    /// `None` when staking is disabled.
    sizer: Option<StakeSizer>,
    bankroll: Decimal,
    ticket_types: Vec<TicketType>,
    target_slips: usize,
}

impl SlatePipeline {
    pub fn new(
        filter: BetFilter,
        optimizer: SlipOptimizer,
        sizer: Option<StakeSizer>,
        bankroll: Decimal,
    ) -> Self {
        Self {
            filter,
            optimizer,
            sizer,
            bankroll,
            ticket_types: TicketType::ALL.to_vec(),
            target_slips: 10,
        }
    }

    /// Build every stage from config. Fails on any invalid setting.
    pub fn from_config(cfg: &AppConfig, payouts: PayoutTable) -> Result<Self> {
        let optimizer_config = cfg.optimizer_config();
        let filter = BetFilter::new(
            LineCanonicalizer::new(cfg.canonicalizer.tolerance)?,
            optimizer_config.min_confidence,
        )?;
        let optimizer = SlipOptimizer::new(optimizer_config, payouts)?;
        let sizer = if cfg.staking.enabled {
            Some(StakeSizer::new(cfg.staking.sizing.clone())?)
        } else {
            None
        };

        let mut pipeline = Self::new(filter, optimizer, sizer, cfg.staking.bankroll);
        pipeline.ticket_types = cfg.portfolio.ticket_types.clone();
        pipeline.target_slips = cfg.portfolio.target_slips;
        Ok(pipeline)
    }

    pub fn optimizer(&self) -> &SlipOptimizer {
        &self.optimizer
    }

    pub fn target_slips(&self) -> usize {
        self.target_slips
    }

    /// Run one slate end to end. `target_slips` overrides the configured
    /// portfolio size when given.
    pub fn run(&self, slate: &str, bets: &[Bet], target_slips: Option<usize>) -> PortfolioReport {
        let target = target_slips.unwrap_or(self.target_slips);
        let pool = self.filter.prepare(bets);
        let slips = self.optimizer.optimize(&pool.bets, target, &self.ticket_types);

        let stakes = match &self.sizer {
            Some(sizer) => sizer.size_portfolio(&slips, self.bankroll),
            None => Vec::new(),
        };

        info!(
            slate,
            bets = bets.len(),
            pool = pool.bets.len(),
            collapsed = pool.report.removed(),
            slips = slips.len(),
            staked = stakes.len(),
            total_stake = format!("${:.2}", total_stake(&stakes)),
            "Slate complete"
        );

        PortfolioReport {
            slate: slate.to_string(),
            generated_at: Utc::now(),
            bets_received: bets.len(),
            bets_in_pool: pool.bets.len(),
            filter_report: pool.report,
            slips,
            stakes,
        }
    }
}
