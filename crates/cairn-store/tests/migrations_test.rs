// Integration tests for the migration framework

use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    let mut conn = setup_test_db();

    let result = cairn_store::migrations::apply_migrations(&mut conn);
    assert!(result.is_ok(), "Migrations should succeed: {:?}", result.err());

    let tables = get_table_names(&conn);
    for expected in [
        "schema_version",
        "objects",
        "versions",
        "tags",
        "tag_values",
        "object_tags",
        "objects_trash",
        "versions_trash",
        "object_tags_trash",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[test]
fn test_no_foreign_keys_declared() {
    let mut conn = setup_test_db();
    cairn_store::migrations::apply_migrations(&mut conn).unwrap();

    for table in ["tag_values", "object_tags", "versions"] {
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM pragma_foreign_key_list('{}')", table),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0, "{} should not declare foreign keys", table);
    }
}

#[test]
fn test_reapplying_records_once() {
    let mut conn = setup_test_db();
    cairn_store::migrations::apply_migrations(&mut conn).unwrap();
    cairn_store::migrations::apply_migrations(&mut conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
