//! SwingATR Core: domain types, ATR, extreme tracking, allocation bands, simulation.
//!
//! This crate contains the heart of the swing backtester:
//! - Domain types (bars, extremes, positions, portfolio, transactions)
//! - Rolling average true range over a fixed window
//! - ATR allocation bands measured from the most recent extreme
//! - Daily simulation state machine (mark-to-market, extreme update, rebalance)
//! - Price data providers (HTTP CSV download, local CSV) with bounded retry
//! - Pivot and trend-line detection for the setup scan

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod pivots;
pub mod strategy;
