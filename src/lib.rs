//! PropGrid: player-prop slip optimizer.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod payout;
pub mod filter;
pub mod optimizer;
pub mod pipeline;
pub mod storage;
