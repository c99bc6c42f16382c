use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Event vocabulary ──────────────────────────────────────────────────────────

/// The role a user acted in when an event was logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Applicant,
    Authority,
    /// Any role outside the two the analysis distinguishes.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Applicant => "applicant",
            Role::Authority => "authority",
            Role::Other(s) => s,
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "applicant" => Role::Applicant,
            "authority" => Role::Authority,
            other => Role::Other(other.to_string()),
        }
    }
}

/// The kind of interaction an event records. Open set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    UpdateDoc,
    AddComment,
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::UpdateDoc => "update-doc",
            Action::AddComment => "add-comment",
            Action::Other(s) => s,
        }
    }
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "update-doc" => Action::UpdateDoc,
            "add-comment" => Action::AddComment,
            other => Action::Other(other.to_string()),
        }
    }
}

/// What an event acted upon. Open set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    Application,
    Document,
    Other(String),
}

impl Target {
    pub fn as_str(&self) -> &str {
        match self {
            Target::Application => "application",
            Target::Document => "document",
            Target::Other(s) => s,
        }
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        match s {
            "application" => Target::Application,
            "document" => Target::Document,
            other => Target::Other(other.to_string()),
        }
    }
}

macro_rules! string_conversions {
    ($($ty:ident),+) => {
        $(
            impl From<String> for $ty {
                fn from(s: String) -> Self {
                    $ty::from(s.as_str())
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.as_str().to_string()
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

string_conversions!(Role, Action, Target);

// ── UsageEvent ────────────────────────────────────────────────────────────────

/// One logged user interaction against a permit application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    /// Application the event belongs to (not unique across events).
    pub application_id: String,
    pub user_id: i64,
    pub municipality_id: i64,
    pub role: Role,
    pub action: Action,
    pub target: Target,
    /// Local wall-clock time the event was logged at.
    #[serde(rename = "datetime")]
    pub timestamp: NaiveDateTime,
}

// ── ApplicationRecord ─────────────────────────────────────────────────────────

/// Named milestone dates carried by every operative record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Milestone {
    Created,
    Submitted,
    Sent,
    VerdictGiven,
    Canceled,
}

impl Milestone {
    pub const ALL: [Milestone; 5] = [
        Milestone::Created,
        Milestone::Submitted,
        Milestone::Sent,
        Milestone::VerdictGiven,
        Milestone::Canceled,
    ];

    /// Header of the operative CSV column holding this milestone.
    pub fn column_name(self) -> &'static str {
        match self {
            Milestone::Created => "createdDate",
            Milestone::Submitted => "submittedDate",
            Milestone::Sent => "sentDate",
            Milestone::VerdictGiven => "verdictGivenDate",
            Milestone::Canceled => "canceledDate",
        }
    }
}

/// Static attributes of one permit application.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationRecord {
    pub application_id: String,
    pub created: Option<NaiveDateTime>,
    pub submitted: Option<NaiveDateTime>,
    pub sent: Option<NaiveDateTime>,
    pub verdict_given: Option<NaiveDateTime>,
    pub canceled: Option<NaiveDateTime>,
    /// Every cell of the source row, in source column order.
    pub cells: Vec<String>,
}

impl ApplicationRecord {
    pub fn milestone(&self, milestone: Milestone) -> Option<NaiveDateTime> {
        match milestone {
            Milestone::Created => self.created,
            Milestone::Submitted => self.submitted,
            Milestone::Sent => self.sent,
            Milestone::VerdictGiven => self.verdict_given,
            Milestone::Canceled => self.canceled,
        }
    }

    pub fn set_milestone(&mut self, milestone: Milestone, value: Option<NaiveDateTime>) {
        let slot = match milestone {
            Milestone::Created => &mut self.created,
            Milestone::Submitted => &mut self.submitted,
            Milestone::Sent => &mut self.sent,
            Milestone::VerdictGiven => &mut self.verdict_given,
            Milestone::Canceled => &mut self.canceled,
        };
        *slot = value;
    }
}

/// The operative table: header row plus one record per source row.
#[derive(Debug, Clone, Default)]
pub struct OperativeData {
    pub headers: Vec<String>,
    pub records: Vec<ApplicationRecord>,
}

impl OperativeData {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Derived summaries ─────────────────────────────────────────────────────────

/// Per-application behavioural metrics derived from its usage events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub application_id: String,
    /// Total number of usage events.
    pub n_events: usize,
    /// Distinct users acting on the application.
    pub n_users: usize,
    pub n_update_docs: usize,
    /// `add-comment` events targeting the application itself.
    pub n_application_comments: usize,
    pub n_application_comments_applicant: usize,
    pub n_application_comments_authority: usize,
    /// Active minutes across all events.
    pub session_length: i64,
    pub session_length_applicant: i64,
    pub session_length_authority: i64,
    /// Inclusive day count between the lead-time milestones.
    pub lead_time: Option<i64>,
    /// Percentage of lead-time days with at least one event.
    pub flow_efficiency: Option<i64>,
    pub n_users_applicant: usize,
    pub n_users_authority: usize,
}

/// Per-user counts of applications acted on, split by role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: i64,
    /// Distinct applications where the user acted as applicant.
    pub applicant_roles: usize,
    /// Distinct applications where the user acted as authority.
    pub authority_roles: usize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
