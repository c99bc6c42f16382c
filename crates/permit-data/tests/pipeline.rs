//! End-to-end runs of the analysis pipeline over CSV files on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use permit_core::settings::{AnalysisConfig, AnalysisPaths};
use permit_data::analysis::run_analysis;
use tempfile::TempDir;

// ── Fixture ───────────────────────────────────────────────────────────────────

const OPERATIVE: &[&str] = &[
    "applicationId;municipalityId;createdDate;submittedDate;sentDate;verdictGivenDate;canceledDate;state",
    "LP-B;91;2016-02-01;2016-02-02;;;;submitted",
    "LP-A;91;2016-01-01;2016-01-02;2016-01-03;2016-01-10;;verdictGiven",
    "LP-C;91;2016-03-01;;;;;draft",
];

const USAGE: &[&str] = &[
    "datetime;applicationId;userId;municipalityId;role;action;target",
    "2016-01-05 14:07:30;LP-A;1;91;applicant;add-comment;application",
    "2016-01-02 09:00:00;LP-A;1;91;applicant;update-doc;document",
    "2016-01-02 09:10:00;LP-A;1;91;applicant;add-comment;application",
    "2016-01-02 09:20:00;LP-A;2;91;authority;add-comment;application",
    "2016-01-02 10:00:00;LP-A;2;91;authority;add-comment;document",
    "2016-01-05 14:00:00;LP-A;2;91;authority;add-comment;application",
    "2016-01-05 14:09:00;LP-A;3;;applicant;update-doc;document",
    "2016-02-03 08:00:00;LP-B;3;91;applicant;update-doc;document",
    "2016-02-03 08:14:59;LP-B;3.0;91;applicant;update-doc;document",
    "2016-02-03 08:00:00;LP-X;4;91;authority;update-doc;document",
];

fn write_lines(path: &Path, lines: &[&str]) {
    let mut file = std::fs::File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
}

struct Fixture {
    _dir: TempDir,
    paths: AnalysisPaths,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let operative = dir.path().join("operative.csv");
    let usage = dir.path().join("usage.csv");
    write_lines(&operative, OPERATIVE);
    write_lines(&usage, USAGE);

    let paths = AnalysisPaths {
        operative: Some(operative),
        usage,
        applications_out: Some(dir.path().join("application-summary.csv")),
        users_out: Some(dir.path().join("user-summary.csv")),
        comments_out: Some(dir.path().join("comments-by-application.json")),
    };
    Fixture { _dir: dir, paths }
}

fn read(path: &Option<PathBuf>) -> String {
    std::fs::read_to_string(path.as_ref().unwrap()).unwrap()
}

// ── Synthetic pipeline ────────────────────────────────────────────────────────

#[test]
fn test_application_summary_file() {
    let fx = fixture();
    run_analysis(&fx.paths, &AnalysisConfig::default()).unwrap();

    let text = read(&fx.paths.applications_out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            ";applicationId;municipalityId;createdDate;submittedDate;sentDate;verdictGivenDate;canceledDate;state;\
             nEvents;nUsers;nUpdateDocs;nApplicationComments;nApplicationCommentsApplicant;\
             nApplicationCommentsAuthority;sessionLength;sessionLengthApplicant;sessionLengthAuthority;\
             leadTime;flowEfficiency;nUsersApplicant;nUsersAuthority",
            "0;LP-A;91;2016-01-01;2016-01-02;2016-01-03;2016-01-10;;verdictGiven;6;2;1;4;2;2;28;10;0;10;20;1;1",
            "1;LP-B;91;2016-02-01;2016-02-02;;;;submitted;2;1;2;0;0;0;15;15;0;;;1;0",
        ]
    );
}

#[test]
fn test_user_summary_file() {
    let fx = fixture();
    run_analysis(&fx.paths, &AnalysisConfig::default()).unwrap();

    assert_eq!(
        read(&fx.paths.users_out),
        ";userId;applicantRoles;authorityRoles\n0;1;1;0\n1;2;0;1\n2;3;1;0\n3;4;0;1\n"
    );
}

#[test]
fn test_comments_file_has_one_record_per_row() {
    let fx = fixture();
    run_analysis(&fx.paths, &AnalysisConfig::default()).unwrap();

    let value: serde_json::Value = serde_json::from_str(&read(&fx.paths.comments_out)).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["applicationId"], "LP-A");
    assert_eq!(records[0]["nApplicationComments"], 4);
    assert_eq!(records[1]["applicationId"], "LP-B");
    assert!(records[1]["leadTime"].is_null());
}

#[test]
fn test_metadata_counts() {
    let fx = fixture();
    let result = run_analysis(&fx.paths, &AnalysisConfig::default()).unwrap();
    let meta = &result.metadata;

    assert_eq!(meta.operative_records, 3);
    assert_eq!(meta.usage_events, 9);
    assert_eq!(meta.applications_summarized, 2);
    assert_eq!(meta.applications_skipped, 1);
    assert_eq!(meta.application_rows, 2);
    assert_eq!(meta.users_summarized, 4);
}

#[test]
fn test_parallel_run_writes_identical_files() {
    let sequential = fixture();
    let parallel = fixture();
    run_analysis(&sequential.paths, &AnalysisConfig::default()).unwrap();
    run_analysis(
        &parallel.paths,
        &AnalysisConfig {
            parallel: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(
        read(&sequential.paths.applications_out),
        read(&parallel.paths.applications_out)
    );
    assert_eq!(
        read(&sequential.paths.users_out),
        read(&parallel.paths.users_out)
    );
    assert_eq!(
        read(&sequential.paths.comments_out),
        read(&parallel.paths.comments_out)
    );
}

#[test]
fn test_without_operative_only_users_are_written() {
    let mut fx = fixture();
    fx.paths.operative = None;
    let result = run_analysis(&fx.paths, &AnalysisConfig::default()).unwrap();

    assert!(result.output.applications.is_none());
    assert!(!fx.paths.applications_out.as_ref().unwrap().exists());
    assert!(!fx.paths.comments_out.as_ref().unwrap().exists());
    assert_eq!(read(&fx.paths.users_out).lines().count(), 5);
}

#[test]
fn test_missing_usage_file_fails_fast() {
    let mut fx = fixture();
    fx.paths.usage = fx.paths.usage.with_file_name("absent.csv");
    assert!(run_analysis(&fx.paths, &AnalysisConfig::default()).is_err());
    assert!(!fx.paths.users_out.as_ref().unwrap().exists());
}

// ── Published Lupapiste sample ────────────────────────────────────────────────

fn sample_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-data")
        .join(name)
}

#[test]
#[ignore = "needs the published sample data under test-data/"]
fn test_published_sample_acceptance() {
    let dir = TempDir::new().unwrap();
    let paths = AnalysisPaths {
        operative: Some(sample_path("some-applications-operative-pub-20161031.csv")),
        usage: sample_path("some-lupapiste-usage-pub-20161031.csv"),
        applications_out: None,
        users_out: None,
        comments_out: Some(dir.path().join("comments.json")),
    };

    let result = run_analysis(&paths, &AnalysisConfig::default()).unwrap();
    assert_eq!(result.metadata.application_rows, 10);
    assert_eq!(result.output.users.len(), 71);

    let summaries = &result.output.applications.as_ref().unwrap().summaries;
    let app = summaries
        .iter()
        .find(|s| s.application_id == "LP-1001-219067")
        .unwrap();
    assert_eq!(app.n_events, 675);
    assert_eq!(app.n_application_comments, 16);
    assert_eq!(app.n_application_comments_applicant, 5);
    assert_eq!(app.n_application_comments_authority, 11);
    assert_eq!(app.session_length, 462);
    assert_eq!(app.session_length_applicant, 143);
    assert_eq!(app.session_length_authority, 279);
    assert_eq!(app.lead_time, Some(35));
    assert_eq!(app.flow_efficiency, Some(77));

    let comments: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("comments.json")).unwrap())
            .unwrap();
    assert_eq!(comments.as_array().unwrap().len(), 10);
}
