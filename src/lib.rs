//! # WalletWatch
//! Wallet risk scoring, alert evaluation and an ephemeral TTL cache for
//! crypto portfolios.
//!
//! - [`analysis`]: portfolio and transaction risk scoring
//! - [`alerts`]: alert registry and the periodic evaluator
//! - [`cache`]: shared key/value store with per-key time-to-live
//! - [`provider`]: wallet/market data sources, plain and cached
//! - [`scheduler`]: cancellable periodic background tasks

pub use crate::utils::error::{Error, Result};

pub mod alerts;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod provider;
pub mod scheduler;
pub mod utils;
