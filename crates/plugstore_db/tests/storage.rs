//! On-disk layout, snapshot cursors and partial-failure listing.

use plugstore_db::fanout::{fanout, staging_path};
use plugstore_db::{impl_entity, Crud, Database, DbError, Listing, Pk, Transaction};
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    id: Pk,
    #[serde(rename = "Name")]
    name: Option<String>,
}

impl_entity!(Note);

#[test]
fn entries_land_in_fanned_out_files() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let key = Pk::from_tag("admin");

    let tx = db.partition("user").begin_write();
    tx.put_bytes(key, br#"{"login":"admin"}"#).unwrap();
    tx.commit().unwrap();

    let path = temp
        .path()
        .join("user")
        .join("61")
        .join("646d696e0000000000000000000000");
    assert_eq!(path, fanout(temp.path(), "user", &key));
    assert_eq!(fs::read(&path).unwrap(), br#"{"login":"admin"}"#);
    assert!(!staging_path(&path).exists());
    assert_eq!(db.partitions().unwrap(), vec!["user".to_string()]);
}

#[test]
fn reopening_sees_previous_writes() {
    let temp = tempdir().unwrap();
    let key = {
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("p").begin_write();
        let key = tx.next_key();
        tx.put_bytes(key, b"persisted").unwrap();
        tx.commit().unwrap();
        key
    };

    let db = Database::new(temp.path());
    let tx = db.partition("p").begin_read();
    assert_eq!(tx.get_bytes(key).unwrap(), b"persisted");
    tx.commit().unwrap();
}

#[test]
fn stale_staging_files_are_ignored() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let key = Pk::from_tag("k");

    let tx = db.partition("p").begin_write();
    tx.put_bytes(key, b"old").unwrap();
    tx.commit().unwrap();

    // what an interrupted put leaves behind
    let path = fanout(temp.path(), "p", &key);
    fs::write(staging_path(&path), b"half-writ").unwrap();

    let tx = db.partition("p").begin_read();
    assert_eq!(tx.get_bytes(key).unwrap(), b"old");
    let cursor = tx.get_all();
    assert_eq!(cursor.size(), 1);
    cursor.close();
    tx.commit().unwrap();
}

#[test]
fn cursor_is_a_snapshot() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let tx = db.partition("p").begin_write();
    let keys = [Pk::from_tag("a"), Pk::from_tag("b"), Pk::from_tag("c")];
    for key in keys {
        tx.put_bytes(key, b"x").unwrap();
    }

    let mut cursor = tx.get_all();
    tx.delete(Pk::from_tag("b")).unwrap();
    tx.put_bytes(Pk::from_tag("d"), b"late").unwrap();
    assert_eq!(cursor.size(), 3);

    let mut outcomes = Vec::new();
    while cursor.next() {
        outcomes.push((cursor.key().unwrap(), cursor.get_bytes()));
    }
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].0, keys[0]);
    assert!(outcomes[0].1.is_ok());
    assert!(matches!(
        &outcomes[1].1,
        Err(DbError::EntityNotFound { .. })
    ));
    assert!(outcomes[2].1.is_ok());
    assert!(matches!(cursor.err(), Some(DbError::EntityNotFound { .. })));
    cursor.close();
    tx.commit().unwrap();
}

#[test]
fn list_skips_one_corrupt_entry_out_of_five() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let crud = Crud::new(db.clone());

    for name in ["e", "c", "a", "d"] {
        let mut note = Note {
            id: Pk::NIL,
            name: Some(name.to_string()),
        };
        crud.create("note", &mut note).unwrap();
    }
    let corrupt = Pk::from_tag("corrupt");
    fs::create_dir_all(fanout(temp.path(), "note", &corrupt).parent().unwrap()).unwrap();
    fs::write(fanout(temp.path(), "note", &corrupt), b"\x00\x01 not json").unwrap();

    let listing: Listing<Note> = crud.list("note", "ORDER BY Name").unwrap();
    let names: Vec<_> = listing
        .items
        .iter()
        .map(|n| n.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "c", "d", "e"]);
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].key, Some(corrupt));
    assert!(matches!(listing.failures[0].error, DbError::Json(_)));
}

#[test]
fn nil_sorts_last_both_ways() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let crud = Crud::new(db);
    for name in [Some("b"), Some("a"), None] {
        let mut note = Note {
            id: Pk::NIL,
            name: name.map(str::to_string),
        };
        crud.create("note", &mut note).unwrap();
    }

    let names = |query: &str| -> Vec<Option<String>> {
        let listing: Listing<Note> = crud.list("note", query).unwrap();
        listing.into_items().into_iter().map(|n| n.name).collect()
    };
    assert_eq!(
        names("ORDER BY Name ASC"),
        vec![Some("a".into()), Some("b".into()), None]
    );
    assert_eq!(
        names("ORDER BY Name DESC"),
        vec![Some("b".into()), Some("a".into()), None]
    );
}

#[derive(Debug, Serialize, Deserialize)]
struct Ranked {
    id: Pk,
    #[serde(rename = "Rank")]
    rank: Option<String>,
}

impl_entity!(Ranked);

#[test]
fn list_orders_a_column_mixing_numbers_and_text() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let crud = Crud::new(db);
    crud.with_tx("item", true, |tx| {
        for i in 0..600usize {
            let n = (i * 7919) % 250;
            let rank = match i % 3 {
                0 => Some(n.to_string()),
                1 => Some(format!("{n}a")),
                _ => None,
            };
            crud.create_tx(tx, &mut Ranked { id: Pk::NIL, rank })?;
        }
        Ok(())
    })
    .unwrap();

    for (query, ascending) in [("ORDER BY Rank", true), ("ORDER BY Rank DESC", false)] {
        let listing: Listing<Ranked> = crud.list("item", query).unwrap();
        assert!(listing.is_complete());
        let ranks: Vec<Option<String>> = listing.into_items().into_iter().map(|r| r.rank).collect();
        assert_eq!(ranks.len(), 600);
        let present = ranks.iter().take_while(|r| r.is_some()).count();
        assert_eq!(present, 400);
        assert!(ranks[present..].iter().all(Option::is_none));
        // mixed column falls back to text order
        assert!(ranks[..present]
            .windows(2)
            .all(|w| if ascending { w[0] <= w[1] } else { w[0] >= w[1] }));
    }
}

#[test]
fn list_orders_an_all_numeric_column_by_value() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let crud = Crud::new(db);
    for rank in ["10", "2", "33"] {
        let mut row = Ranked {
            id: Pk::NIL,
            rank: Some(rank.to_string()),
        };
        crud.create("item", &mut row).unwrap();
    }

    let listing: Listing<Ranked> = crud.list("item", "ORDER BY Rank ASC").unwrap();
    let ranks: Vec<String> = listing.into_items().into_iter().filter_map(|r| r.rank).collect();
    assert_eq!(ranks, vec!["2", "10", "33"]);
}

#[test]
fn large_values_round_trip() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let payload: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();

    let tx = db.partition("blob").begin_write();
    let key = tx.next_key();
    let written = tx.put(key, &mut payload.as_slice()).unwrap();
    assert_eq!(written, payload.len() as u64);

    let mut out = Vec::new();
    assert_eq!(tx.get(key, &mut out).unwrap(), payload.len() as u64);
    assert_eq!(out, payload);
    tx.commit().unwrap();
}
