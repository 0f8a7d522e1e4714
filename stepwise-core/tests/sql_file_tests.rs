//! Integration tests for directory-based SQL migrations
//!
//! Run with: cargo test --test sql_file_tests -- --nocapture

use std::fs;

use tempfile::TempDir;

use stepwise_core::config::Config;
use stepwise_core::{Migration, StepwiseContext, VersionStore, UserVersion};

fn context(temp_dir: &TempDir) -> StepwiseContext {
    let mut config = Config::default();
    config.database = temp_dir.path().join("data").join("app.db");
    config.migrations_dir = temp_dir.path().join("migrations");
    fs::create_dir_all(&config.migrations_dir).unwrap();
    StepwiseContext::open(config).expect("Failed to open context")
}

fn write_migration(ctx: &StepwiseContext, file: &str, body: &str) {
    fs::write(ctx.config.migrations_dir.join(file), body).unwrap();
}

#[test]
fn test_sql_directory_brings_database_up_to_date() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = context(&temp_dir);

    write_migration(
        &ctx,
        "people_001.sql",
        "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\n\
         -- stepwise:seed\n\
         INSERT INTO person (name) VALUES ('Ada');\n\
         INSERT INTO person (name) VALUES ('Grace');\n",
    );
    write_migration(
        &ctx,
        "person_email_002.sql",
        "ALTER TABLE person ADD COLUMN email TEXT;\n",
    );

    let outcome = ctx.runner().initialise().unwrap();
    assert_eq!(outcome.applied, vec![1, 2]);
    assert_eq!(outcome.versions(), (0, 2));

    let columns = ctx.runner().column_names("person").unwrap();
    assert_eq!(columns, vec!["id", "name", "email"]);

    let people: i64 = ctx
        .connection()
        .query_row("SELECT COUNT(*) FROM person", [], |r| r.get(0))
        .unwrap();
    assert_eq!(people, 2);
}

#[test]
fn test_new_file_is_picked_up_on_next_run() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = context(&temp_dir);

    write_migration(&ctx, "init_001.sql", "CREATE TABLE a (id INTEGER);\n");
    ctx.runner().initialise().unwrap();
    assert!(ctx.runner().pending().unwrap().is_empty());

    write_migration(&ctx, "more_002.sql", "CREATE TABLE b (id INTEGER);\n");
    let pending: Vec<u32> = ctx.runner().pending().unwrap().iter().map(|d| d.version()).collect();
    assert_eq!(pending, vec![2]);

    let outcome = ctx.runner().initialise().unwrap();
    assert_eq!(outcome.versions(), (1, 2));
}

#[test]
fn test_preserving_data_around_destructive_change() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = context(&temp_dir);

    write_migration(
        &ctx,
        "init_001.sql",
        "CREATE TABLE item (id INTEGER PRIMARY KEY, label TEXT, legacy TEXT);\n\
         -- stepwise:seed\n\
         INSERT INTO item (label, legacy) VALUES ('kept', 'x');\n",
    );
    write_migration(
        &ctx,
        "drop_legacy_002.sql",
        "-- stepwise:pre\n\
         CREATE TABLE item_backup AS SELECT id, label FROM item;\n\
         -- stepwise:migrate\n\
         DROP TABLE item;\n\
         CREATE TABLE item (id INTEGER PRIMARY KEY, label TEXT);\n\
         -- stepwise:post\n\
         INSERT INTO item (id, label) SELECT id, label FROM item_backup;\n\
         DROP TABLE item_backup;\n",
    );

    ctx.runner().initialise().unwrap();

    let runner = ctx.runner();
    assert_eq!(runner.column_names("item").unwrap(), vec!["id", "label"]);
    assert!(!runner.table_names().unwrap().contains("item_backup"));
    drop(runner);

    let label: String = ctx
        .connection()
        .query_row("SELECT label FROM item", [], |r| r.get(0))
        .unwrap();
    assert_eq!(label, "kept");
}

#[test]
fn test_broken_file_stops_the_run_at_its_version() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = context(&temp_dir);

    write_migration(&ctx, "init_001.sql", "CREATE TABLE a (id INTEGER);\n");
    // Valid syntax, fails at execution time
    write_migration(&ctx, "bad_002.sql", "INSERT INTO missing_table (id) VALUES (1);\n");
    write_migration(&ctx, "later_003.sql", "CREATE TABLE c (id INTEGER);\n");

    let err = ctx.runner().initialise().unwrap_err();
    assert_eq!(err.failed_migration(), Some("bad_002"));

    assert_eq!(UserVersion::new(ctx.connection()).current_version().unwrap(), 1);
    assert!(!ctx.runner().table_names().unwrap().contains("c"));
}

#[test]
fn test_context_explicit_units_follow_config() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = context(&temp_dir);
    ctx.config.dispose_after = false;

    let outcome = ctx
        .initialise_with(vec![Migration::new("Explicit001").unwrap().migrate(|db| {
            db.execute_batch("CREATE TABLE explicit (id INTEGER);")?;
            Ok(())
        })])
        .unwrap();
    assert_eq!(outcome.versions(), (0, 1));
    assert!(ctx.config.database.exists());
}
