//! Named cache partitions.
//!
//! A partition maps a [`RequestKey`] to a [`StoredResponse`]. Partitions are
//! created on first write (or explicitly via [`CacheDb::open_partition`]),
//! enumerated and pruned by activation, and never enforce a size or TTL limit
//! themselves.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row};

use super::connection::CacheDb;
use super::hash::RequestKey;
use super::response::StoredResponse;
use crate::Error;

/// Handle to one named partition.
#[derive(Debug, Clone)]
pub struct Partition {
    db: CacheDb,
    name: String,
}

/// Entry count of a partition, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
    pub name: String,
    pub entries: u64,
}

const ENTRY_COLUMNS: &str = "e.status, e.status_text, e.headers_json, e.body, e.stored_at";

struct RawEntry {
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            status: row.get(0)?,
            status_text: row.get(1)?,
            headers_json: row.get(2)?,
            body: row.get(3)?,
            stored_at: row.get(4)?,
        })
    }

    fn decode(self) -> Result<StoredResponse, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::Corrupt(format!("status {}", self.status)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        let stored_at = DateTime::parse_from_rfc3339(&self.stored_at)
            .map_err(|e| Error::Corrupt(format!("stored_at: {e}")))?
            .with_timezone(&Utc);

        Ok(StoredResponse { status, status_text: self.status_text, headers, body: Bytes::from(self.body), stored_at })
    }
}

fn insert_entry(
    conn: &rusqlite::Connection, partition: &str, key: &RequestKey, response: &StoredResponse,
) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&response.headers)?;
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![partition, Utc::now().to_rfc3339()],
    )?;
    conn.execute(
        "INSERT INTO entries (partition, key_hash, method, url, status, status_text, headers_json, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            key.hash(),
            &key.method,
            &key.url,
            response.status as i64,
            &response.status_text,
            headers_json,
            response.body.as_ref(),
            response.stored_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Return the named partition, creating it if absent. Idempotent.
    pub async fn open_partition(&self, name: &str) -> Result<Partition, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }

        let owned = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![owned, Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(self.partition(name))
    }

    /// Handle to a partition without touching storage. The partition row is
    /// created by the first write through it.
    pub fn partition(&self, name: &str) -> Partition {
        Partition { db: self.clone(), name: name.to_string() }
    }

    /// All partition names in creation order.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// All partitions with their entry counts, in creation order.
    pub async fn partition_infos(&self) -> Result<Vec<PartitionInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<PartitionInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT p.name, COUNT(e.key_hash)
                     FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                     GROUP BY p.name
                     ORDER BY p.rowid",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(PartitionInfo { name: row.get(0)?, entries: row.get::<_, i64>(1)? as u64 })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a whole partition and its entries.
    ///
    /// Returns true if the partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look the key up across every partition. The oldest partition holding
    /// the key wins.
    pub async fn match_any(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let key_hash = key.hash();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.key_hash = ?1 ORDER BY p.rowid LIMIT 1"
                );
                let raw = conn
                    .query_row(&sql, params![key_hash], RawEntry::from_row)
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::decode).transpose()
    }
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under the key, replacing any previous entry whole.
    pub async fn put(&self, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let name = self.name.clone();
        let key = key.clone();
        let response = response.clone();
        self.db
            .conn
            .call(move |conn| insert_entry(conn, &name, &key, &response))
            .await
            .map_err(Error::from)
    }

    /// Store every entry in one transaction. Either all entries land or none.
    pub async fn put_all(&self, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for (key, response) in &entries {
                    insert_entry(&tx, &name, key, response)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Partition-scoped lookup.
    pub async fn lookup(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let name = self.name.clone();
        let key_hash = key.hash();
        let raw = self
            .db
            .conn
            .call(move |conn| -> Result<Option<RawEntry>, Error> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries e WHERE e.partition = ?1 AND e.key_hash = ?2");
                let raw = conn
                    .query_row(&sql, params![name, key_hash], RawEntry::from_row)
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::decode).transpose()
    }

    /// Remove one entry. Returns true if it existed.
    pub async fn delete_entry(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.clone();
        let key_hash = key.hash();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key_hash = ?2",
                    params![name, key_hash],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Keys stored in this partition, ordered by URL.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt =
                    conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY url, method")?;
                let keys = stmt
                    .query_map(params![name], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn len(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// Cache a JSON document under a key, stamped with `X-Cached-At`.
    pub async fn put_json<T: Serialize>(&self, key: &RequestKey, value: &T) -> Result<(), Error> {
        let response = StoredResponse::json(value)?;
        self.put(key, &response).await
    }

    /// Read a JSON document cached with [`Partition::put_json`], together
    /// with its capture time.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &RequestKey) -> Result<Option<(T, DateTime<Utc>)>, Error> {
        let Some(response) = self.lookup(key).await? else {
            return Ok(None);
        };

        let value = serde_json::from_slice(&response.body)?;
        let cached_at = response.cached_at().unwrap_or(response.stored_at);
        Ok(Some((value, cached_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &'static str) -> StoredResponse {
        StoredResponse::new(
            200,
            "OK",
            vec![("Content-Type".into(), "text/plain".into())],
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("api-v1").await.unwrap();
        db.open_partition("api-v1").await.unwrap();
        assert_eq!(db.partition_names().await.unwrap(), vec!["api-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_rejects_empty_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_partition("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_partition_created_on_first_write() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.partition("image-v1");
        assert!(db.partition_names().await.unwrap().is_empty());

        partition
            .put(&RequestKey::get("https://cdn.example.com/a.png"), &response("a"))
            .await
            .unwrap();
        assert_eq!(db.partition_names().await.unwrap(), vec!["image-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.open_partition("api-v1").await.unwrap();
        let key = RequestKey::get("https://api.example.com/stories?page=1&size=10");

        partition.put(&key, &response("stories")).await.unwrap();

        let stored = partition.lookup(&key).await.unwrap().unwrap();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.body, Bytes::from_static(b"stories"));
        assert_eq!(stored.header("content-type"), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_put_replaces_whole_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.open_partition("api-v1").await.unwrap();
        let key = RequestKey::get("https://api.example.com/stories");

        partition.put(&key, &response("old")).await.unwrap();
        let replacement = StoredResponse::new(201, "Created", Vec::new(), Bytes::from_static(b"new"));
        partition.put(&key, &replacement).await.unwrap();

        let stored = partition.lookup(&key).await.unwrap().unwrap();
        assert_eq!(stored.status, 201);
        assert!(stored.headers.is_empty());
        assert_eq!(partition.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_partition_isolation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let api = db.open_partition("api-v1").await.unwrap();
        let image = db.open_partition("image-v1").await.unwrap();
        let key = RequestKey::get("https://shared.example.com/resource");

        api.put(&key, &response("from-api")).await.unwrap();
        image.put(&key, &response("from-image")).await.unwrap();

        assert_eq!(api.lookup(&key).await.unwrap().unwrap().body, Bytes::from_static(b"from-api"));
        assert_eq!(image.lookup(&key).await.unwrap().unwrap().body, Bytes::from_static(b"from-image"));

        // the oldest partition wins a global lookup
        assert_eq!(db.match_any(&key).await.unwrap().unwrap().body, Bytes::from_static(b"from-api"));
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.open_partition("api-v1").await.unwrap();
        assert!(partition.lookup(&RequestKey::get("https://nowhere.example/")).await.unwrap().is_none());
        assert!(db.match_any(&RequestKey::get("https://nowhere.example/")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_method_is_part_of_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.open_partition("api-v1").await.unwrap();
        partition
            .put(&RequestKey::get("https://api.example.com/stories"), &response("get"))
            .await
            .unwrap();

        let post = RequestKey::new("POST", "https://api.example.com/stories");
        assert!(partition.lookup(&post).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_partition_drops_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let api = db.open_partition("api-v1").await.unwrap();
        let key = RequestKey::get("https://api.example.com/stories");
        api.put(&key, &response("x")).await.unwrap();

        assert!(db.delete_partition("api-v1").await.unwrap());
        assert!(!db.delete_partition("api-v1").await.unwrap());
        assert!(db.partition_names().await.unwrap().is_empty());
        assert!(db.match_any(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_all_and_keys() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let shell = db.partition("app-shell-v1");
        let entries = vec![
            (RequestKey::get("http://localhost/index.html"), response("index")),
            (RequestKey::get("http://localhost/bundle.js"), response("bundle")),
        ];

        shell.put_all(entries).await.unwrap();

        let urls: Vec<String> = shell.keys().await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(urls, vec!["http://localhost/bundle.js".to_string(), "http://localhost/index.html".to_string()]);
        assert_eq!(shell.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let partition = db.open_partition("image-v1").await.unwrap();
        let key = RequestKey::get("https://cdn.example.com/a.png");
        partition.put(&key, &response("a")).await.unwrap();

        assert!(partition.delete_entry(&key).await.unwrap());
        assert!(!partition.delete_entry(&key).await.unwrap());
        assert!(partition.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_partition_infos() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("empty-v1").await.unwrap();
        let api = db.open_partition("api-v1").await.unwrap();
        api.put(&RequestKey::get("https://api.example.com/a"), &response("a"))
            .await
            .unwrap();

        let infos = db.partition_infos().await.unwrap();
        assert_eq!(
            infos,
            vec![
                PartitionInfo { name: "empty-v1".into(), entries: 0 },
                PartitionInfo { name: "api-v1".into(), entries: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_json_document_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let api = db.open_partition("api-v1").await.unwrap();
        let key = RequestKey::get("http://localhost/api/stories-cache");
        let data = serde_json::json!({ "listStory": [{ "id": "story-1" }] });

        api.put_json(&key, &data).await.unwrap();

        let (value, cached_at): (serde_json::Value, _) = api.get_json(&key).await.unwrap().unwrap();
        assert_eq!(value, data);
        assert!(cached_at <= Utc::now());
    }
}
