use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn unique_temp_db(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{now}.sqlite3"))
}

fn run_dk<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_dk"))
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("failed to execute dk binary: {err}"))
}

fn run_json<I, S>(args: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_dk(args);
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "dk command failed (status={}):\nstdout:\n{}\nstderr:\n{}",
            output.status, stdout, stderr
        );
    }
    parse_stdout(&output)
}

fn parse_stdout(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"))
}

fn as_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("missing string field `{key}` in payload: {value}"))
}

fn as_bool(value: &Value, key: &str) -> bool {
    value
        .get(key)
        .and_then(Value::as_bool)
        .unwrap_or_else(|| panic!("missing boolean field `{key}` in payload: {value}"))
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or_else(|| panic!("path should be valid UTF-8: {}", path.display()))
}

fn new_project_id() -> String {
    ulid::Ulid::new().to_string()
}

fn add_account(db: &Path, project_id: &str, domain: &str) -> Value {
    run_json([
        "--db",
        path_str(db),
        "account",
        "add",
        "--project-id",
        project_id,
        "--company-name",
        "Integration Fixture Corp",
        "--website-domain",
        domain,
    ])
}

// Test IDs: TCL-001
#[test]
fn db_migrate_then_schema_version_reports_latest() {
    let db = unique_temp_db("dk-cli-migrate");

    let migrated = run_json(["--db", path_str(&db), "db", "migrate"]);
    assert_eq!(as_str(&migrated, "contract_version"), "cli.v1");
    assert_eq!(migrated.get("up_to_date"), Some(&Value::Bool(true)));

    let status = run_json(["--db", path_str(&db), "db", "schema-version"]);
    assert_eq!(status.get("up_to_date"), Some(&Value::Bool(true)));
    assert_eq!(status.get("current_version"), status.get("target_version"));

    let _ = fs::remove_file(&db);
}

// Test IDs: TCL-002
#[test]
fn duplicate_accounts_are_flagged_by_check() {
    let db = unique_temp_db("dk-cli-dup");
    let project_id = new_project_id();

    let canonical = add_account(&db, &project_id, "cli-dup.example.com");
    let incoming = add_account(&db, &project_id, "cli-dup.example.com");
    let incoming_id = as_str(&incoming, "account_id").to_string();

    let checked =
        run_json(["--db", path_str(&db), "check", "account", "--account-id", &incoming_id]);
    assert_eq!(as_str(&checked, "contract_version"), "cli.v1");
    assert!(as_bool(&checked, "is_duplicate"));
    assert_eq!(as_str(&checked, "duplicate_match_case"), "WEBSITE_DOMAIN");
    assert_eq!(as_str(&checked, "label"), "duplicate");
    assert_eq!(checked.get("duplicate_of"), canonical.get("account_id"));

    // The flagged row must no longer be a candidate for later arrivals.
    let third = add_account(&db, &project_id, "cli-dup.example.com");
    let third_id = as_str(&third, "account_id").to_string();
    let checked = run_json(["--db", path_str(&db), "check", "account", "--account-id", &third_id]);
    assert_eq!(checked.get("duplicate_of"), canonical.get("account_id"));

    let _ = fs::remove_file(&db);
}

// Test IDs: TCL-003
#[test]
fn suppression_entry_outranks_duplicate_label() {
    let db = unique_temp_db("dk-cli-sup");
    let project_id = new_project_id();

    add_account(&db, &project_id, "cli-sup.example.com");
    let incoming = add_account(&db, &project_id, "cli-sup.example.com");
    let incoming_id = as_str(&incoming, "account_id").to_string();

    run_json([
        "--db",
        path_str(&db),
        "suppression",
        "account",
        "--project-id",
        &project_id,
        "--company-name",
        "Integration Fixture Corp",
        "--website-domain",
        "cli-sup.example.com",
    ]);

    let checked =
        run_json(["--db", path_str(&db), "check", "account", "--account-id", &incoming_id]);
    assert!(as_bool(&checked, "is_duplicate"));
    assert!(as_bool(&checked, "is_suppressed"));
    assert_eq!(as_str(&checked, "label"), "suppressed");
    assert_eq!(checked.get("duplicate_of"), Some(&Value::Null));

    let _ = fs::remove_file(&db);
}

// Test IDs: TCL-004
#[test]
fn missing_account_id_exits_nonzero_with_bad_id() {
    let db = unique_temp_db("dk-cli-badid");

    let output = run_dk(["--db", path_str(&db), "check", "account"]);
    assert!(!output.status.success(), "missing id must fail the command");
    let body = parse_stdout(&output);
    let error = match body.get("error") {
        Some(error) => error,
        None => panic!("expected an error envelope, got {body}"),
    };
    assert_eq!(as_str(error, "code"), "BAD_ID");
    assert_eq!(as_str(error, "message"), "account_id is required");

    let _ = fs::remove_file(&db);
}

// Test IDs: TCL-005
#[test]
fn unknown_account_id_reports_frozen_not_found_message() {
    let db = unique_temp_db("dk-cli-unknown");
    let unknown_id = ulid::Ulid::new().to_string();

    let output = run_dk(["--db", path_str(&db), "check", "account", "--account-id", &unknown_id]);
    assert!(!output.status.success());
    let body = parse_stdout(&output);
    let error = match body.get("error") {
        Some(error) => error,
        None => panic!("expected an error envelope, got {body}"),
    };
    assert_eq!(as_str(error, "code"), "BAD_ACCOUNT_ID");
    assert_eq!(
        as_str(error, "message"),
        format!("Could Not Find Account with ID: {unknown_id}, Account Reference Dose Not Exist")
    );

    let _ = fs::remove_file(&db);
}

// Test IDs: TCL-006
#[test]
fn contact_flow_defaults_to_inclusion() {
    let db = unique_temp_db("dk-cli-contact");
    let project_id = new_project_id();

    let contact = run_json([
        "--db",
        path_str(&db),
        "contact",
        "add",
        "--project-id",
        &project_id,
        "--full-name",
        "Integration Fixture Person",
        "--email",
        "solo@cli.example.com",
    ]);
    let contact_id = as_str(&contact, "contact_id").to_string();

    let checked =
        run_json(["--db", path_str(&db), "check", "contact", "--contact-id", &contact_id]);
    assert_eq!(as_str(&checked, "label"), "inclusion");
    assert!(!as_bool(&checked, "is_duplicate"));
    assert!(!as_bool(&checked, "is_suppressed"));
    assert_eq!(as_str(&checked, "duplicate_match_case"), "NONE");

    let listed = run_json(["--db", path_str(&db), "contact", "list"]);
    assert_eq!(listed.get("count"), Some(&Value::Number(1.into())));

    let _ = fs::remove_file(&db);
}

// Test IDs: TCL-007
#[test]
fn skip_flags_disable_check_legs() {
    let db = unique_temp_db("dk-cli-skip");
    let project_id = new_project_id();

    add_account(&db, &project_id, "cli-skip.example.com");
    let incoming = add_account(&db, &project_id, "cli-skip.example.com");
    let incoming_id = as_str(&incoming, "account_id").to_string();

    let checked = run_json([
        "--db",
        path_str(&db),
        "check",
        "account",
        "--account-id",
        &incoming_id,
        "--skip-duplicate",
        "--skip-suppression",
    ]);
    assert!(!as_bool(&checked, "is_duplicate"));
    assert!(!as_bool(&checked, "is_suppressed"));
    assert_eq!(checked.get("label"), Some(&Value::Null));
    assert_eq!(as_str(&checked, "duplicate_match_case"), "NONE");
    assert_eq!(as_str(&checked, "suppression_match_case"), "NONE");

    let _ = fs::remove_file(&db);
}
