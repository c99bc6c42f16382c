//! Domain model and analysis primitives for permit application usage data.
//!
//! Holds the typed records loaded from the operative and usage tables, the
//! event filter, the inactivity-gap session segmenter and the lead-time and
//! flow-efficiency calculations shared by the data layer.

pub mod calculations;
pub mod error;
pub mod filter;
pub mod models;
pub mod session;
pub mod settings;
pub mod time_utils;

pub use error::{AnalysisError, Result};
