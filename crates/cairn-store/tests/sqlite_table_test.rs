// Integration tests for the generic SQLite table adapter

use cairn_core::adapter::{Backend, PersistenceConnection, SortKey, TableRole};
use cairn_core::errors::RepoErrorKind;
use cairn_core::filter::{parse_filter, CompareOp, ExpressionFactory};
use cairn_core::model::{Object, ObjectTag, Tag, TagType, TagValue, Version};
use cairn_store::SqliteBackend;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

fn setup_db() -> (SqliteBackend, TempDir) {
    let dir = TempDir::new().unwrap();
    let backend = SqliteBackend::open(&dir.path().join("cairn.db")).unwrap();
    (backend, dir)
}

fn version(handle: i64, millis: i64, count: i32) -> Version {
    Version {
        handle,
        imported: Utc.timestamp_millis_opt(millis).unwrap(),
        length: 100 * i64::from(count),
        sha1sum: format!("sum{}", count),
        title: Some(format!("Take {}", count)),
        path: format!("a/b/c/take{}.bin", count),
        versioncount: count,
        ..Default::default()
    }
}

#[test]
fn test_insert_assigns_identity() {
    let (db, _dir) = setup_db();
    let objects = db.table::<Object>(TableRole::Live).unwrap();

    let mut first = Object::new(Utc.timestamp_millis_opt(1_000).unwrap());
    let mut second = Object::new(Utc.timestamp_millis_opt(2_000).unwrap());
    objects.insert(&mut first).unwrap();
    objects.insert(&mut second).unwrap();

    assert!(first.handle > 0);
    assert_eq!(second.handle, first.handle + 1);
    assert_eq!(objects.count(None).unwrap(), 2);
}

#[test]
fn test_round_trip_preserves_every_attribute() {
    let (db, _dir) = setup_db();
    let versions = db.table::<Version>(TableRole::Live).unwrap();

    let mut v = version(5, 1_704_449_400_123, 1);
    v.health.missing = true;
    v.health.linkcount = 2;
    v.health.lastseen = Some(Utc.timestamp_millis_opt(1_704_449_500_000).unwrap());
    v.health.message = Some("gone".into());
    versions.insert(&mut v.clone()).unwrap();

    let back = versions.select_all().unwrap();
    assert_eq!(back, vec![v]);
}

#[test]
fn test_insert_if_new_is_idempotent() {
    let (db, _dir) = setup_db();
    let tags = db.table::<Tag>(TableRole::Live).unwrap();

    assert!(tags.insert_if_new(&mut Tag::new("Genre", TagType::Category)).unwrap());
    assert!(!tags.insert_if_new(&mut Tag::new("Genre", TagType::Entity)).unwrap());

    let stored = tags.select_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tag_type, TagType::Category);
}

#[test]
fn test_update_and_delete_require_existing_row() {
    let (db, _dir) = setup_db();
    let versions = db.table::<Version>(TableRole::Live).unwrap();
    let values = db.table::<TagValue>(TableRole::Live).unwrap();

    let v = version(1, 1_000, 1);
    assert_eq!(versions.update(&v).unwrap_err().kind(), RepoErrorKind::Persistence);
    assert_eq!(versions.delete(&v).unwrap_err().kind(), RepoErrorKind::Persistence);
    assert!(values.update(&TagValue::new("Genre", "Comedy")).is_err());

    versions.insert(&mut v.clone()).unwrap();
    let mut changed = v.clone();
    changed.health.corrupt = true;
    versions.update(&changed).unwrap();
    assert!(versions.select_all().unwrap()[0].health.corrupt);
    versions.delete(&changed).unwrap();
    assert_eq!(versions.count(None).unwrap(), 0);
}

#[test]
fn test_select_with_filter_and_sort() {
    let (db, _dir) = setup_db();
    let versions = db.table::<Version>(TableRole::Live).unwrap();
    for (i, millis) in [3_000, 1_000, 2_000].iter().enumerate() {
        versions
            .insert(&mut version(9, *millis, i as i32 + 1))
            .unwrap();
    }
    versions.insert(&mut version(4, 5_000, 1)).unwrap();

    let f = ExpressionFactory::<Version>::new().unwrap();
    let only_nine = f.attr_eq("handle", f.long(9)).unwrap();
    let rows = versions
        .select(Some(&only_nine), &[SortKey::desc("imported")])
        .unwrap();
    let millis: Vec<_> = rows.iter().map(|v| v.imported.timestamp_millis()).collect();
    assert_eq!(millis, vec![3_000, 2_000, 1_000]);

    let filter = parse_filter(&f, "@title ~$ 'TAKE 2' or @length >= 300").unwrap();
    let rows = versions.select(Some(&filter), &[SortKey::asc("length")]).unwrap();
    let lengths: Vec<_> = rows.iter().map(|v| v.length).collect();
    assert_eq!(lengths, vec![200, 300]);
}

#[test]
fn test_instant_filters_compare_millis() {
    let (db, _dir) = setup_db();
    let versions = db.table::<Version>(TableRole::Live).unwrap();
    versions.insert(&mut version(1, 1_704_067_200_000, 1)).unwrap(); // 2024-01-01
    versions.insert(&mut version(2, 1_706_745_600_000, 1)).unwrap(); // 2024-02-01

    let f = ExpressionFactory::<Version>::new().unwrap();
    let after = f
        .compare(
            CompareOp::Gt,
            f.attribute("imported").unwrap(),
            f.string("2024-01-15T00:00:00Z"),
        )
        .unwrap();
    let rows = versions.select(Some(&after), &[]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].handle, 2);
}

#[test]
fn test_apply_selection_stops_early() {
    let (db, _dir) = setup_db();
    let values = db.table::<TagValue>(TableRole::Live).unwrap();
    for v in ["a", "b", "c", "d"] {
        values.insert(&mut TagValue::new("Letter", v)).unwrap();
    }

    let mut seen = Vec::new();
    let delivered = values
        .apply_selection(None, &[SortKey::asc("value")], None, &mut |row| {
            seen.push(row.value);
            Ok(seen.len() < 2)
        })
        .unwrap();
    assert_eq!(delivered, 2);
    assert_eq!(seen, vec!["a", "b"]);

    let limited = values
        .apply_selection(None, &[], Some(3), &mut |_| Ok(true))
        .unwrap();
    assert_eq!(limited, 3);
}

#[test]
fn test_unknown_sort_attribute() {
    let (db, _dir) = setup_db();
    let values = db.table::<TagValue>(TableRole::Live).unwrap();
    let err = values.select(None, &[SortKey::asc("colour")]).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::Expression);
}

#[test]
fn test_trash_tables() {
    let (db, _dir) = setup_db();
    let trash = db.table::<ObjectTag>(TableRole::Trash).unwrap();
    trash.insert(&mut ObjectTag::new(3, "Genre", "Comedy")).unwrap();
    assert_eq!(trash.count(None).unwrap(), 1);
    assert_eq!(
        db.table::<ObjectTag>(TableRole::Live).unwrap().count(None).unwrap(),
        0
    );

    let err = db.table::<Tag>(TableRole::Trash).err().unwrap();
    assert_eq!(err.kind(), RepoErrorKind::Configuration);
}

#[test]
fn test_transactions() {
    let (db, _dir) = setup_db();
    assert!(db.is_valid());
    assert!(!db.in_transaction());
    assert!(db.commit().is_err());

    db.start_transaction().unwrap();
    assert!(db.in_transaction());
    assert!(db.start_transaction().is_err());
    db.table::<Tag>(TableRole::Live)
        .unwrap()
        .insert(&mut Tag::new("Genre", TagType::Category))
        .unwrap();
    db.rollback().unwrap();
    assert_eq!(db.table::<Tag>(TableRole::Live).unwrap().count(None).unwrap(), 0);

    db.start_transaction().unwrap();
    db.table::<Tag>(TableRole::Live)
        .unwrap()
        .insert(&mut Tag::new("Genre", TagType::Category))
        .unwrap();
    db.commit().unwrap();
    assert_eq!(db.table::<Tag>(TableRole::Live).unwrap().count(None).unwrap(), 1);

    db.close().unwrap();
}
