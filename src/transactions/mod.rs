//! Persistence sink for scored transactions.

pub mod errors;
pub mod models;
pub mod service;
pub mod sink;
