//! HTTP service that scores transactions with a pre-trained fraud classifier
//! and records every scored transaction to PostgreSQL on a best-effort basis.

pub mod app;
pub mod classifier;
pub mod scoring;
pub mod transactions;

use scoring::service::ScoringService;

#[derive(Clone)]
pub struct AppState {
    pub scoring: ScoringService,
}
