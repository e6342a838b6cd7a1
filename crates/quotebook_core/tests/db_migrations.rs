use quotebook_core::db::migrations::latest_version;
use quotebook_core::db::{open_db, open_db_in_memory, DbError};
use quotebook_core::{RepoError, SqliteBookRepository, SqliteQuoteRepository};
use rusqlite::Connection;

const CATALOG_TABLES: [&str; 6] = [
    "author",
    "category",
    "book",
    "quote",
    "book_author",
    "book_category",
];

#[test]
fn open_db_in_memory_applies_catalog_schema() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in CATALOG_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn open_db_enables_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn reopening_file_database_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO author (name, created_at, updated_at) VALUES ('Ursula K. Le Guin', 1, 1);",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    let authors: i64 = second
        .query_row("SELECT COUNT(*) FROM author;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(authors, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn stores_reject_unmigrated_connections() {
    let raw = Connection::open_in_memory().unwrap();

    let err = SqliteBookRepository::try_new(&raw).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn stores_reject_connections_missing_tables() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE quote;").unwrap();

    let err = SqliteQuoteRepository::try_new(&conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("quote")));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing table `{table_name}`");
}
