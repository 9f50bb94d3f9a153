//! Fantasy Premier League player dashboard: scheduled ingestion of league
//! data into SQLite, plus the query surface the dashboard reads from.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod query;
pub mod types;
