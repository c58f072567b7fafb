//! End-to-end tests: files in, cleaned files and reports out.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use reelclean::clean::history::{ALL_INCONSISTENCIES, INVALID_IDS, UNEXPECTED_DEVICES};
use reelclean::{
    CleanError, CleaningReport, MemoryStore, ObservationType, Pipeline, PipelineConfig,
    SqliteStore, TableStore, RATINGS_OUTPUT, SUBSCRIPTIONS_OUTPUT, USERS_OUTPUT,
};

/// Helper to write an input file into the temp dir.
fn write_input(dir: &TempDir, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write input");
    path
}

fn pipeline_into(dir: &TempDir) -> Pipeline {
    let config = PipelineConfig::default().with_output_dir(dir.path().join("out"));
    Pipeline::with_config(config).expect("default config is valid")
}

fn read_output(dir: &TempDir, name: &str) -> String {
    fs::read_to_string(dir.path().join("out").join(name)).expect("output missing")
}

// =============================================================================
// Users
// =============================================================================

#[test]
fn test_users_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "users.csv",
        "user_id,name,age,email,country\n\
         1,Ana,-5,ana@example.com,USA\n\
         2,Bo,30,,India\n\
         3,Cy,150,cy@example.co.uk,UK\n\
         4,Di,40,not-an-email,Canada\n\
         5,Ed,22,ed@example.com,Atlantis\n\
         5,Ed,22,ed@example.com,Atlantis\n",
    );

    let report = pipeline_into(&dir).clean_users(&input).unwrap();

    assert_eq!(
        read_output(&dir, USERS_OUTPUT),
        "user_id,name,age,email,country\n\
         1,Ana,30,ana@example.com,USA\n\
         2,Bo,30,unknown@example.com,India\n\
         3,Cy,30,cy@example.co.uk,UK\n"
    );
    assert_eq!(report.rows_in, 6);
    assert_eq!(report.rows_out, 3);
    assert_eq!(report.count(ObservationType::DuplicateRow), 1);
    assert!(report.audits.iter().any(|a| a.column == "email"));

    let saved = CleaningReport::load(dir.path().join("out").join("users_report.json")).unwrap();
    assert_eq!(saved.rows_out, 3);
    assert_eq!(saved.source.unwrap().file, "users.csv");
}

#[test]
fn test_users_latin1_input_is_written_as_utf8() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "users.csv",
        b"user_id,name,age,email,country\n1,Jos\xe9,30,jose@example.com,USA\n".to_vec(),
    );

    let report = pipeline_into(&dir).clean_users(&input).unwrap();

    assert!(read_output(&dir, USERS_OUTPUT).contains("José"));
    assert_eq!(report.source.unwrap().encoding, "latin-1");
}

#[test]
fn test_users_without_optional_columns() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "users.csv", "user_id,name\n1,Ana\n2,Bo\n");

    let report = pipeline_into(&dir).clean_users(&input).unwrap();

    assert_eq!(read_output(&dir, USERS_OUTPUT), "user_id,name\n1,Ana\n2,Bo\n");
    assert_eq!(report.with_severity(reelclean::Severity::Warning).count(), 3);
}

// =============================================================================
// Ratings
// =============================================================================

#[test]
fn test_ratings_latest_wins() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "ratings.csv",
        "user_id,movie_id,rating,timestamp\n\
         U1,M1,3,1\n\
         U1,M1,5,2\n\
         U2,M1,4,7\n\
         U2,M1,1,7\n\
         U3,M2,2,soon\n",
    );

    let report = pipeline_into(&dir).clean_ratings(&input, None, None).unwrap();

    assert_eq!(
        read_output(&dir, RATINGS_OUTPUT),
        "user_id,movie_id,rating,timestamp\n\
         U1,M1,5,2\n\
         U2,M1,1,7\n"
    );
    assert_eq!(report.count(ObservationType::UnparseableValue), 1);
    assert_eq!(report.count(ObservationType::ConflictResolved), 2);
}

#[test]
fn test_ratings_average_without_timestamps() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "ratings.csv",
        "user_id,movie_id,rating\nU1,M1,2\nU1,M1,4\nU1,M2,4.5\nU2,M1,7\n",
    );

    pipeline_into(&dir).clean_ratings(&input, None, None).unwrap();

    assert_eq!(
        read_output(&dir, RATINGS_OUTPUT),
        "user_id,movie_id,rating\nU1,M1,3.0\nU1,M2,4.5\n"
    );
}

#[test]
fn test_ratings_reference_checks() {
    let dir = TempDir::new().unwrap();
    let ratings = write_input(
        &dir,
        "ratings.csv",
        "user_id,movie_id,rating\n1,100,4\n2,100,3\n1,200,5\n",
    );
    let users = write_input(&dir, "users.csv", "user_id,age\n1.0,30\n");
    let movies = write_input(&dir, "movies.csv", "movie_id,title\n100,Heat\n");

    let report = pipeline_into(&dir)
        .clean_ratings(&ratings, Some(&users), Some(&movies))
        .unwrap();

    assert_eq!(read_output(&dir, RATINGS_OUTPUT), "user_id,movie_id,rating\n1,100,4\n");
    assert_eq!(report.count(ObservationType::UnknownReference), 2);
}

// =============================================================================
// Subscriptions
// =============================================================================

#[test]
fn test_subscriptions_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "subscriptions.csv",
        "user_id,plan,start_date,end_date,amount_paid\n\
         2,basic,2023-03-01,2023-03-31,9.99\n\
         1,basic,2023-01-01,2023-01-10,10\n\
         1,basic,2023-01-05,2023-01-15,5\n\
         1,basic,2023-02-01,2023-02-05,8\n\
         1,basic,2023-01-15,2023-01-20,2\n\
         3,basic,2023-05-01,2023-04-01,4\n\
         3,basic,someday,2023-04-01,4\n\
         3,basic,2023-01-01,2023-02-01,-1\n",
    );

    let report = pipeline_into(&dir).clean_subscriptions(&input).unwrap();

    assert_eq!(
        read_output(&dir, SUBSCRIPTIONS_OUTPUT),
        "user_id,plan,start_date,end_date,amount_paid\n\
         1,basic,2023-01-01,2023-01-20,17.0\n\
         1,basic,2023-02-01,2023-02-05,8\n\
         2,basic,2023-03-01,2023-03-31,9.99\n"
    );
    assert_eq!(report.count(ObservationType::InvertedInterval), 1);
    assert_eq!(report.count(ObservationType::UnparseableValue), 1);
    assert_eq!(report.count(ObservationType::OutOfRange), 1);
    assert_eq!(report.rows_out, 3);
}

#[test]
fn test_subscriptions_missing_required_column_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "subscriptions.csv", "user_id,end_date\n1,2023-01-01\n");

    let err = pipeline_into(&dir).clean_subscriptions(&input).unwrap_err();

    match err {
        CleanError::MissingColumns { dataset, columns } => {
            assert_eq!(dataset, "subscriptions");
            assert_eq!(columns, vec!["start_date"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("out").exists());
}

// =============================================================================
// Watch history
// =============================================================================

fn history_inputs(dir: &TempDir) -> (PathBuf, PathBuf) {
    let history = write_input(
        dir,
        "watch_history.csv",
        "user_id,movie_id,device,minutes\n\
         1,10,Laptop,30\n\
         2,10,VCR,45\n\
         7,11,Tablet,12\n\
         7,12,Toaster,5\n\
         2,13,,60\n",
    );
    let users = write_input(dir, "users.csv", "user_id,age\n1,20\n2,33\n");
    (history, users)
}

#[test]
fn test_history_with_sqlite_store() {
    let dir = TempDir::new().unwrap();
    let (history, users) = history_inputs(&dir);
    let mut store = SqliteStore::open(dir.path().join("watch_history.db")).unwrap();

    let findings = pipeline_into(&dir)
        .validate_history(&history, &users, &mut store)
        .unwrap();

    assert_eq!(findings.count(UNEXPECTED_DEVICES), 3);
    assert_eq!(findings.count(INVALID_IDS), 2);
    assert_eq!(findings.count(ALL_INCONSISTENCIES), 4);

    assert_eq!(
        read_output(&dir, "unexpected_devices.csv"),
        "user_id,movie_id,device,minutes\n\
         2,10,VCR,45\n\
         7,12,Toaster,5\n\
         2,13,Unknown,60\n"
    );

    // The store keeps the staged tables for inspection
    assert_eq!(store.query_all("users").unwrap().row_count(), 2);
}

#[test]
fn test_history_memory_and_sqlite_agree() {
    let dir = TempDir::new().unwrap();
    let (history, users) = history_inputs(&dir);
    let pipeline = pipeline_into(&dir);

    let mut memory = MemoryStore::new();
    let from_memory = pipeline.validate_history(&history, &users, &mut memory).unwrap();
    let mut sqlite = SqliteStore::in_memory().unwrap();
    let from_sqlite = pipeline.validate_history(&history, &users, &mut sqlite).unwrap();

    assert_eq!(from_memory.all_inconsistencies, from_sqlite.all_inconsistencies);
}

#[test]
fn test_history_custom_devices_from_toml() {
    let dir = TempDir::new().unwrap();
    let (history, users) = history_inputs(&dir);
    let config = PipelineConfig::from_toml(&format!(
        "output_dir = {:?}\n\
         [history]\n\
         devices = [\"Laptop\", \"Tablet\", \"VCR\", \"Toaster\", \"Unknown\"]\n",
        dir.path().join("out")
    ))
    .unwrap();

    let mut store = MemoryStore::new();
    let findings = Pipeline::with_config(config)
        .unwrap()
        .validate_history(&history, &users, &mut store)
        .unwrap();

    assert_eq!(findings.count(UNEXPECTED_DEVICES), 0);
    assert_eq!(findings.count(INVALID_IDS), 2);
    assert!(!dir.path().join("out").join("unexpected_devices.csv").exists());
}

#[test]
fn test_history_users_file_without_user_id() {
    let dir = TempDir::new().unwrap();
    let (history, _) = history_inputs(&dir);
    let users = write_input(&dir, "people.csv", "id,age\n1,20\n");

    let mut store = MemoryStore::new();
    let err = pipeline_into(&dir)
        .validate_history(&history, &users, &mut store)
        .unwrap_err();
    assert!(matches!(err, CleanError::MissingColumns { .. }));
}

// =============================================================================
// Input errors
// =============================================================================

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = pipeline_into(&dir)
        .clean_ratings(dir.path().join("nope.csv"), None, None)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "users.csv", "");
    let err = pipeline_into(&dir).clean_users(&input).unwrap_err();
    assert!(matches!(err, CleanError::EmptyData(_)));
}

#[test]
fn test_tab_delimited_input_writes_csv() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "ratings.tsv",
        "user_id\tmovie_id\trating\nU1\tM1\t4\n",
    );

    pipeline_into(&dir).clean_ratings(&input, None, None).unwrap();
    assert_eq!(read_output(&dir, RATINGS_OUTPUT), "user_id,movie_id,rating\nU1,M1,4\n");
}
