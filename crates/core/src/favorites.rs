//! Favorites store.
//!
//! Structured records keyed by story id, independent of the HTTP cache.
//! A story is favorited exactly when its record is present here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, types::Type};

use crate::Error;
use crate::cache::CacheDb;

/// A favorited story: a denormalized copy of the story plus when it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub photo_url: String,
    pub created_at: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub date_added: DateTime<Utc>,
}

const COLUMNS: &str = "story_id, name, description, photo_url, created_at, lat, lon, date_added";

// Fixed-width UTC timestamps sort lexically in time order, which the
// by-date-added index relies on.
fn encode_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<FavoriteStory> {
    let date_added: String = row.get(7)?;
    let date_added = DateTime::parse_from_rfc3339(&date_added)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(FavoriteStory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        photo_url: row.get(3)?,
        created_at: row.get(4)?,
        lat: row.get(5)?,
        lon: row.get(6)?,
        date_added,
    })
}

fn require_id(id: &str) -> Result<(), Error> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput("story id cannot be empty".into()));
    }
    Ok(())
}

/// Handle to the favorites store.
#[derive(Debug, Clone)]
pub struct Favorites {
    db: CacheDb,
}

impl CacheDb {
    pub fn favorites(&self) -> Favorites {
        Favorites { db: self.clone() }
    }
}

impl Favorites {
    /// Add or replace a favorite.
    pub async fn add(&self, story: &FavoriteStory) -> Result<(), Error> {
        require_id(&story.id)?;
        let story_id = story.id.clone();
        let story = story.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO favorites (story_id, name, description, photo_url, created_at, lat, lon, date_added)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(story_id) DO UPDATE SET
                        name = excluded.name,
                        description = excluded.description,
                        photo_url = excluded.photo_url,
                        created_at = excluded.created_at,
                        lat = excluded.lat,
                        lon = excluded.lon,
                        date_added = excluded.date_added",
                    params![
                        &story.id,
                        &story.name,
                        &story.description,
                        &story.photo_url,
                        &story.created_at,
                        story.lat,
                        story.lon,
                        encode_date(&story.date_added),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        tracing::debug!(%story_id, "favorite added");
        Ok(())
    }

    /// Remove a favorite. Returns true if it was present.
    pub async fn remove(&self, id: &str) -> Result<bool, Error> {
        require_id(id)?;
        let id = id.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM favorites WHERE story_id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// All favorites, most recently added first.
    pub async fn list(&self) -> Result<Vec<FavoriteStory>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Vec<FavoriteStory>, Error> {
                let sql = format!("SELECT {COLUMNS} FROM favorites ORDER BY date_added DESC, story_id ASC");
                let mut stmt = conn.prepare(&sql)?;
                let stories = stmt.query_map([], read_row)?.collect::<Result<Vec<_>, _>>()?;
                Ok(stories)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn get(&self, id: &str) -> Result<Option<FavoriteStory>, Error> {
        require_id(id)?;
        let id = id.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<FavoriteStory>, Error> {
                let sql = format!("SELECT {COLUMNS} FROM favorites WHERE story_id = ?1");
                Ok(conn.query_row(&sql, params![id], read_row).optional()?)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has(&self, id: &str) -> Result<bool, Error> {
        require_id(id)?;
        let id = id.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM favorites WHERE story_id = ?1)",
                    params![id],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove every favorite in one statement. Returns how many were removed.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.db
            .conn
            .call(|conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM favorites", [])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count(&self) -> Result<u64, Error> {
        self.db
            .conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
