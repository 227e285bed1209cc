//! JSON codec on top of a transaction.

use crate::codec::entity::Entity;
use crate::cursor::Cursor;
use crate::error::{DbError, DbResult};
use crate::pk::Pk;
use crate::query::{sort_rows, sort_value, Query};
use crate::transaction::Transaction;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::warn;

/// Stores and loads typed entities as JSON through a transaction.
///
/// The codec never touches the filesystem itself; it only uses the
/// transaction's byte-oriented operations and cursors.
pub struct JsonCodec<'tx, X: Transaction + ?Sized> {
    tx: &'tx X,
}

impl<'tx, X: Transaction + ?Sized> JsonCodec<'tx, X> {
    /// Wraps a transaction.
    pub fn new(tx: &'tx X) -> Self {
        Self { tx }
    }

    /// Serializes `obj` and stores it under `obj.id()`.
    ///
    /// Fails with [`DbError::ReadOnly`] on a read transaction.
    pub fn put<T: Entity + Serialize + ?Sized>(&self, obj: &T) -> DbResult<u64> {
        let key = obj.id();
        let bytes = serde_json::to_vec(obj).map_err(|e| self.noted(e.into()))?;
        self.tx.put_bytes(key, &bytes)
    }

    /// Loads the entity stored under `obj.id()` into `obj`.
    pub fn get<T: Entity + DeserializeOwned>(&self, obj: &mut T) -> DbResult<()> {
        *obj = self.load(obj.id())?;
        Ok(())
    }

    /// Loads the entity stored under `key`.
    pub fn load<T: Entity + DeserializeOwned>(&self, key: Pk) -> DbResult<T> {
        let bytes = self.tx.get_bytes(key)?;
        let mut obj: T = serde_json::from_slice(&bytes).map_err(|e| self.noted(e.into()))?;
        obj.set_id(key);
        Ok(obj)
    }

    /// Runs a query over the transaction's entries.
    ///
    /// Without ordering this is a plain [`Transaction::get_all`]. With
    /// ordering, every entry is read and decoded into memory, sorted, and
    /// returned as a cursor in sorted order. Entries that cannot be read or
    /// decoded are left out and reported by [`JsonCursor::skipped`].
    ///
    /// # Errors
    ///
    /// Fails for a malformed query string, or if an entry holds a value of
    /// the ordering field that cannot be compared.
    pub fn query(&self, query: &str) -> DbResult<JsonCursor<'tx>> {
        let query = Query::parse(query)?;
        self.query_with(&query)
    }

    /// Like [`JsonCodec::query`] with an already parsed query.
    pub fn query_with(&self, query: &Query) -> DbResult<JsonCursor<'tx>> {
        let mut cursor = self.tx.get_all();
        let Some(order) = query.ordering() else {
            return Ok(JsonCursor::new(cursor, Vec::new()));
        };

        let mut rows: Vec<(PathBuf, Option<String>)> = Vec::with_capacity(cursor.size());
        let mut skipped = Vec::new();
        while cursor.next() {
            let path = cursor.current()?.to_path_buf();
            let object = match cursor.scan::<Map<String, Value>>() {
                Ok(object) => object,
                Err(err) => {
                    warn!(partition = %self.tx.partition_name(), path = %path.display(), error = %err, "skipping entry");
                    skipped.push(Skipped {
                        key: cursor.key().ok(),
                        error: err,
                    });
                    continue;
                }
            };
            let value = sort_value(&object, &order.field)?;
            rows.push((path, value));
        }

        // stable, so equal values keep enumeration order
        sort_rows(&mut rows, order.direction);
        let files = rows.into_iter().map(|(path, _)| path).collect();
        Ok(JsonCursor::new(cursor.reordered(files), skipped))
    }

    fn noted(&self, err: DbError) -> DbError {
        self.tx.note_err(&err);
        err
    }
}

/// An entry left out of a sorted query.
#[derive(Debug, Clone)]
pub struct Skipped {
    /// The entry's key, if its path could be decoded.
    pub key: Option<Pk>,
    /// Why the entry was left out.
    pub error: DbError,
}

/// A cursor that decodes entries as JSON.
#[derive(Debug)]
pub struct JsonCursor<'tx> {
    cursor: Cursor<'tx>,
    skipped: Vec<Skipped>,
}

impl<'tx> JsonCursor<'tx> {
    fn new(cursor: Cursor<'tx>, skipped: Vec<Skipped>) -> Self {
        Self { cursor, skipped }
    }

    /// Advances to the next entry.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        self.cursor.next()
    }

    /// Decodes the current entry.
    pub fn read<T: DeserializeOwned>(&self) -> DbResult<T> {
        self.cursor.scan()
    }

    /// Decodes the current entry as an entity, restoring its key from the path.
    pub fn read_entity<T: Entity + DeserializeOwned>(&self) -> DbResult<T> {
        let key = self.cursor.key()?;
        let mut obj: T = self.cursor.scan()?;
        obj.set_id(key);
        Ok(obj)
    }

    /// Returns the key of the current entry.
    pub fn key(&self) -> DbResult<Pk> {
        self.cursor.key()
    }

    /// Number of entries in this cursor.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cursor.size()
    }

    /// Entries left out while sorting.
    #[must_use]
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// Returns the first error recorded by the owning transaction.
    pub fn err(&self) -> Option<DbError> {
        self.cursor.err()
    }

    /// Releases the cursor.
    pub fn close(self) {
        self.cursor.close();
    }

    /// Gives back the skipped entries, consuming the cursor.
    pub(crate) fn into_skipped(self) -> Vec<Skipped> {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct Item {
        id: Pk,
        #[serde(rename = "Name")]
        name: Option<String>,
        #[serde(rename = "Rank", default)]
        rank: Option<String>,
    }

    crate::impl_entity!(Item);

    fn item(tag: &str, name: Option<&str>) -> Item {
        Item {
            id: Pk::from_tag(tag),
            name: name.map(str::to_string),
            rank: None,
        }
    }

    fn names(cursor: &mut JsonCursor<'_>) -> Vec<Option<String>> {
        let mut out = Vec::new();
        while cursor.next() {
            out.push(cursor.read::<Item>().unwrap().name);
        }
        out
    }

    #[test]
    fn put_get_round_trip() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        let codec = JsonCodec::new(&tx);

        let stored = item("one", Some("first"));
        codec.put(&stored).unwrap();

        let mut loaded = Item {
            id: stored.id,
            ..Item::default()
        };
        codec.get(&mut loaded).unwrap();
        assert_eq!(loaded, stored);
        tx.commit().unwrap();
    }

    #[test]
    fn put_on_read_transaction_is_read_only() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin(false);
        let codec = JsonCodec::new(&tx);
        assert!(matches!(
            codec.put(&item("one", None)),
            Err(DbError::ReadOnly)
        ));
        tx.commit().unwrap();
    }

    #[test]
    fn get_missing_and_corrupt() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        let codec = JsonCodec::new(&tx);

        let mut missing = item("ghost", None);
        assert!(codec.get(&mut missing).unwrap_err().is_entity_not_found());
        assert!(tx.err().is_none());

        tx.put_bytes(Pk::from_tag("bad"), b"{not json").unwrap();
        let mut bad = item("bad", None);
        assert!(matches!(codec.get(&mut bad), Err(DbError::Json(_))));
        assert!(matches!(tx.err(), Some(DbError::Json(_))));
        tx.commit().unwrap();
    }

    #[test]
    fn ordering_puts_nil_last() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        let codec = JsonCodec::new(&tx);
        codec.put(&item("b", Some("b"))).unwrap();
        codec.put(&item("a", Some("a"))).unwrap();
        codec.put(&item("nil", None)).unwrap();

        let mut asc = codec.query("ORDER BY Name ASC").unwrap();
        assert_eq!(
            names(&mut asc),
            vec![Some("a".into()), Some("b".into()), None]
        );

        let mut desc = codec.query("ORDER BY Name DESC").unwrap();
        assert_eq!(
            names(&mut desc),
            vec![Some("b".into()), Some("a".into()), None]
        );
        tx.commit().unwrap();
    }

    #[test]
    fn ordering_numeric_strings() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        let codec = JsonCodec::new(&tx);
        for (tag, rank) in [("x", "10"), ("y", "2"), ("z", "33")] {
            let mut it = item(tag, None);
            it.rank = Some(rank.to_string());
            codec.put(&it).unwrap();
        }

        let mut cursor = codec.query("ORDER BY Rank").unwrap();
        let mut ranks = Vec::new();
        while cursor.next() {
            ranks.push(cursor.read::<Item>().unwrap().rank.unwrap());
        }
        assert_eq!(ranks, vec!["2", "10", "33"]);
        tx.commit().unwrap();
    }

    #[test]
    fn ordering_rejects_numbers() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        tx.put_bytes(Pk::from_tag("n"), br#"{"Rank": 3}"#).unwrap();
        let codec = JsonCodec::new(&tx);
        assert!(matches!(
            codec.query("ORDER BY Rank"),
            Err(DbError::UnsupportedSortValue { kind: "number", .. })
        ));
        tx.commit().unwrap();
    }

    #[test]
    fn ordering_skips_undecodable_entries() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        let codec = JsonCodec::new(&tx);
        codec.put(&item("a", Some("a"))).unwrap();
        tx.put_bytes(Pk::from_tag("broken"), b"[1,2").unwrap();

        let cursor = codec.query("ORDER BY Name").unwrap();
        assert_eq!(cursor.size(), 1);
        assert_eq!(cursor.skipped().len(), 1);
        assert_eq!(cursor.skipped()[0].key, Some(Pk::from_tag("broken")));
        cursor.close();
        tx.commit().unwrap();
    }

    #[test]
    fn unordered_query_is_get_all() {
        let temp = tempdir().unwrap();
        let db = Database::open(temp.path()).unwrap();
        let tx = db.partition("item").begin_write();
        let codec = JsonCodec::new(&tx);
        codec.put(&item("a", Some("a"))).unwrap();
        codec.put(&item("b", Some("b"))).unwrap();

        let mut cursor = codec.query("").unwrap();
        assert_eq!(cursor.size(), 2);
        assert!(cursor.next());
        let first: Item = cursor.read_entity().unwrap();
        assert_eq!(first.id, cursor.key().unwrap());
        cursor.close();
        tx.commit().unwrap();
    }
}
