//! PropGrid: player-prop slip optimizer.
//!
//! Entry point. Loads configuration, initialises structured logging, then
//! optimizes every configured slate concurrently and writes one portfolio
//! report per slate.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use propgrid::config::{self, SlateConfig};
use propgrid::payout::PayoutTable;
use propgrid::pipeline::SlatePipeline;
use propgrid::storage::{self, PortfolioReport};

const DEFAULT_CONFIG: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("PROPGRID_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        slates = cfg.slates.len(),
        target_slips = cfg.portfolio.target_slips,
        ticket_types = ?cfg.portfolio.ticket_types,
        "PropGrid starting up"
    );

    if cfg.slates.is_empty() {
        warn!("No slates configured, nothing to do");
        return Ok(());
    }

    // -- Initialise components -------------------------------------------

    let payouts = PayoutTable::load_or_default(cfg.payout_table_path.as_deref())?;
    let pipeline = Arc::new(SlatePipeline::from_config(&cfg, payouts)?);
    let min_slips = cfg.guard_rail.min_slips;

    let search = pipeline.optimizer().config();
    info!(
        target_slips = pipeline.target_slips(),
        beam_width = search.beam_width,
        max_per_player = search.max_per_player,
        max_prop_exposure = ?search.max_prop_exposure,
        "Pipeline ready"
    );

    // -- Run slates ------------------------------------------------------

    let tasks = cfg.slates.iter().cloned().map(|slate| {
        let pipeline = Arc::clone(&pipeline);
        tokio::task::spawn_blocking(move || run_slate(&pipeline, &slate))
    });

    let mut failed = 0;
    for joined in futures::future::join_all(tasks).await {
        match joined {
            Ok(Ok(report)) => check_guard_rail(&report, min_slips),
            Ok(Err(e)) => {
                error!(error = %format!("{e:#}"), "Slate failed");
                failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Slate task panicked");
                failed += 1;
            }
        }
    }

    info!(
        slates = cfg.slates.len(),
        failed,
        "PropGrid finished"
    );

    if failed > 0 {
        anyhow::bail!("{failed} of {} slates failed", cfg.slates.len());
    }
    Ok(())
}

/// Load, optimize and save one slate.
fn run_slate(pipeline: &SlatePipeline, slate: &SlateConfig) -> Result<PortfolioReport> {
    let bets = storage::load_bets(&slate.input)
        .with_context(|| format!("Slate {}: failed to load bets", slate.name))?;

    let report = pipeline.run(&slate.name, &bets, slate.target_slips);
    for slip in &report.slips {
        info!(slate = %slate.name, slip_id = %slip.slip_id, "{slip}");
    }

    storage::save_report(&report, &slate.output)
        .with_context(|| format!("Slate {}: failed to save report", slate.name))?;
    Ok(report)
}

/// The optimizer returns whatever it found; too few slips is the caller's
/// concern.
fn check_guard_rail(report: &PortfolioReport, min_slips: usize) {
    if report.slips.len() < min_slips {
        warn!(
            slate = %report.slate,
            slips = report.slips.len(),
            min_slips,
            bets_in_pool = report.bets_in_pool,
            "Portfolio below guard rail"
        );
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("propgrid=info"));

    let json_logging = std::env::var("PROPGRID_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
