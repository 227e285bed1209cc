//! Locking behaviour across threads.

use plugstore_db::{Config, Database, DbError, Pk, Transaction};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn writer_excludes_readers() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let writing = Arc::new(AtomicBool::new(false));

    let tx = db.partition("user").begin_write();
    writing.store(true, Ordering::SeqCst);

    let reader = {
        let db = db.clone();
        let writing = Arc::clone(&writing);
        thread::spawn(move || {
            let tx = db.partition("user").begin_read();
            let seen_writer = writing.load(Ordering::SeqCst);
            let found = tx.has(Pk::from_tag("admin"));
            tx.commit().unwrap();
            (seen_writer, found)
        })
    };

    thread::sleep(Duration::from_millis(50));
    tx.put_bytes(Pk::from_tag("admin"), b"{}").unwrap();
    writing.store(false, Ordering::SeqCst);
    tx.commit().unwrap();

    let (seen_writer, found) = reader.join().unwrap();
    assert!(!seen_writer, "reader ran while the writer held the lock");
    assert!(found, "reader must see the committed write");
}

#[test]
fn readers_share_the_lock() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let tx = db.partition("user").begin_read();
                // deadlocks unless all four readers hold the lock together
                barrier.wait();
                tx.commit().unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn partitions_do_not_block_each_other() {
    let temp = tempdir().unwrap();
    let db = Database::open_with_config(
        temp.path(),
        Config::new().lock_timeout(Some(Duration::from_millis(200))),
    )
    .unwrap();

    let users = db.partition("user").begin_write();
    let groups = db.partition("group").try_begin(true).unwrap();
    groups.put_bytes(Pk::from_tag("admins"), b"{}").unwrap();
    groups.commit().unwrap();

    let blocked = db.partition("user").try_begin(false);
    assert!(matches!(blocked, Err(DbError::LockTimeout { .. })));
    users.commit().unwrap();
}

#[test]
fn dropped_transaction_releases_lock() {
    let temp = tempdir().unwrap();
    let db = Database::open_with_config(
        temp.path(),
        Config::new().lock_timeout(Some(Duration::from_millis(200))),
    )
    .unwrap();

    {
        let tx = db.partition("user").begin_write();
        tx.put_bytes(Pk::from_tag("a"), b"1").unwrap();
    }

    let tx = db.partition("user").try_begin(true).unwrap();
    assert_eq!(tx.get_bytes(Pk::from_tag("a")).unwrap(), b"1");
    tx.commit().unwrap();
}

#[test]
fn concurrent_next_key_is_unique() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = db.clone();
            thread::spawn(move || {
                let mut keys = Vec::with_capacity(PER_THREAD);
                for _ in 0..PER_THREAD {
                    let tx = db.partition("session").begin_write();
                    let key = tx.next_key();
                    tx.put_bytes(key, b"{}").unwrap();
                    tx.commit().unwrap();
                    keys.push(key);
                }
                keys
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for key in handle.join().unwrap() {
            assert!(!key.is_nil());
            assert!(all.insert(key), "duplicate key {key}");
        }
    }
    assert_eq!(all.len(), THREADS * PER_THREAD);

    let tx = db.partition("session").begin_read();
    assert_eq!(tx.get_all().size(), THREADS * PER_THREAD);
    tx.commit().unwrap();
}

#[test]
fn writers_serialize() {
    let temp = tempdir().unwrap();
    let db = Database::open(temp.path()).unwrap();
    let active = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = db.clone();
            let active = Arc::clone(&active);
            let overlaps = Arc::clone(&overlaps);
            thread::spawn(move || {
                for j in 0..20 {
                    let tx = db.partition("counter").begin(true);
                    if active.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tx.put_bytes(Pk::from_tag("slot"), format!("{i}:{j}").as_bytes())
                        .unwrap();
                    active.fetch_sub(1, Ordering::SeqCst);
                    tx.commit().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}
