use chrono::TimeDelta;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AnalysisError, Result};
use crate::models::Milestone;
use crate::session::DEFAULT_SESSION_THRESHOLD_MINUTES;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Usage and lead-time analysis of permit applications
#[derive(Parser, Debug, Clone)]
#[command(
    name = "permit-flow",
    about = "Usage and lead-time analysis of permit applications",
    version
)]
pub struct Settings {
    /// Input CSV file for operative data
    #[arg(long, visible_alias = "io")]
    pub input_file_operative: Option<PathBuf>,

    /// Input CSV file for usage data
    #[arg(long, visible_alias = "iu")]
    pub input_file_usage: PathBuf,

    /// Output CSV file for applications
    #[arg(long, visible_alias = "oa")]
    pub output_file_applications: Option<PathBuf>,

    /// Output CSV file for users
    #[arg(long, visible_alias = "ou")]
    pub output_file_users: Option<PathBuf>,

    /// Output JSON file for comments by applications
    #[arg(long, visible_alias = "oc")]
    pub output_file_comments: Option<PathBuf>,

    /// Inactivity gap (minutes) that ends a session
    #[arg(
        long,
        default_value_t = DEFAULT_SESSION_THRESHOLD_MINUTES,
        value_parser = clap::value_parser!(i64).range(1..=1440)
    )]
    pub session_threshold_minutes: i64,

    /// Milestone lead time is measured from
    #[arg(long, value_enum, default_value = "created")]
    pub lead_time_from: Milestone,

    /// Milestone lead time is measured to
    #[arg(long, value_enum, default_value = "verdict-given")]
    pub lead_time_till: Milestone,

    /// Extract per-application metrics on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (receives debug output in addition to the console)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Input and output locations named on the command line.
    pub fn analysis_paths(&self) -> AnalysisPaths {
        AnalysisPaths {
            operative: self.input_file_operative.clone(),
            usage: self.input_file_usage.clone(),
            applications_out: self.output_file_applications.clone(),
            users_out: self.output_file_users.clone(),
            comments_out: self.output_file_comments.clone(),
        }
    }

    /// Analysis knobs carried by these settings.
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            session_threshold_minutes: self.session_threshold_minutes,
            lead_time_from: self.lead_time_from,
            lead_time_till: self.lead_time_till,
            parallel: self.parallel,
        }
    }
}

// ── AnalysisPaths ──────────────────────────────────────────────────────────────

/// Files one run reads and writes. Outputs left as `None` are not written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPaths {
    pub operative: Option<PathBuf>,
    pub usage: PathBuf,
    pub applications_out: Option<PathBuf>,
    pub users_out: Option<PathBuf>,
    pub comments_out: Option<PathBuf>,
}

// ── AnalysisConfig ─────────────────────────────────────────────────────────────

/// Parameters of one analysis run, independent of where they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Gaps of this many minutes or more end a session.
    pub session_threshold_minutes: i64,
    pub lead_time_from: Milestone,
    pub lead_time_till: Milestone,
    /// Run per-entity extraction on the rayon pool.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            session_threshold_minutes: DEFAULT_SESSION_THRESHOLD_MINUTES,
            lead_time_from: Milestone::Created,
            lead_time_till: Milestone::VerdictGiven,
            parallel: false,
        }
    }
}

impl AnalysisConfig {
    pub fn session_threshold(&self) -> TimeDelta {
        TimeDelta::minutes(self.session_threshold_minutes)
    }

    /// Reject configurations no run can produce meaningful output for.
    pub fn validate(&self) -> Result<()> {
        if self.session_threshold_minutes <= 0 {
            return Err(AnalysisError::Config(format!(
                "session threshold must be positive, got {} minutes",
                self.session_threshold_minutes
            )));
        }
        if self.lead_time_from == self.lead_time_till {
            return Err(AnalysisError::Config(format!(
                "lead time needs two different milestones, got {} twice",
                self.lead_time_from.column_name()
            )));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
