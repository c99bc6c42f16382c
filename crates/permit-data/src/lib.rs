//! Data layer for permit application analysis.
//!
//! Reads the semicolon-separated operative and usage tables, extracts
//! per-application metrics, aggregates them per application and per user,
//! and writes the summary tables.

pub mod aggregator;
pub mod analysis;
pub mod extractor;
pub mod reader;
pub mod writer;
