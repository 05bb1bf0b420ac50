//! TrashValue backend: a waste recycling rewards service
//!
//! Users hand in weighed waste through dropoffs, earn points and balance
//! for completed ones, and move money in and out through a payment
//! gateway. The ledger lives in Postgres; every reward and fee is
//! recorded atomically with the state change that caused it.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod services;
