//! Campus-card spending report.
//!
//! Fetches a student's campus-card transaction history for four academic
//! years, caches the raw responses on disk, aggregates debit spending per
//! merchant and per year, and renders two PNG charts.

extern crate alloc;

pub mod aggregate;
pub mod cache;
pub mod chart;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
