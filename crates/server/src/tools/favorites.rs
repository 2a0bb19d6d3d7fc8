//! Favorite story MCP tools.
//!
//! Thin wrappers over the favorites store. Records are returned in their
//! camelCase wire form.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storyshell_core::{CacheDb, Error, FavoriteStory};

use super::json_result;

/// Parameters for the favorite_add tool: the story to save.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FavoriteAddParams {
    /// Story id.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_url: String,
    /// When the story was posted, as given by the story API.
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Parameters for tools addressing one story.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FavoriteIdParams {
    /// Story id.
    pub id: String,
}

/// Parameters for the favorite_count tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FavoriteCountParams {
    /// Also report whether this story is favorited.
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteOutput {
    pub favorite: FavoriteStory,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteListOutput {
    pub count: usize,
    pub favorites: Vec<FavoriteStory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRemoveOutput {
    pub id: String,
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteCountOutput {
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteClearOutput {
    pub removed: u64,
}

/// Implementation of the favorite_add tool.
pub async fn add_impl(db: &CacheDb, params: FavoriteAddParams) -> Result<CallToolResult, McpError> {
    let favorite = FavoriteStory {
        id: params.id,
        name: params.name,
        description: params.description,
        photo_url: params.photo_url,
        created_at: params.created_at,
        lat: params.lat,
        lon: params.lon,
        date_added: Utc::now(),
    };
    db.favorites().add(&favorite).await?;
    json_result(&FavoriteOutput { favorite })
}

/// Implementation of the favorite_remove tool.
pub async fn remove_impl(db: &CacheDb, params: FavoriteIdParams) -> Result<CallToolResult, McpError> {
    let removed = db.favorites().remove(&params.id).await?;
    json_result(&FavoriteRemoveOutput { id: params.id, removed })
}

/// Implementation of the favorite_get tool. A missing story is a
/// `CACHE_MISS` error.
pub async fn get_impl(db: &CacheDb, params: FavoriteIdParams) -> Result<CallToolResult, McpError> {
    let favorite = db
        .favorites()
        .get(&params.id)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("story {} is not a favorite", params.id)))?;
    json_result(&FavoriteOutput { favorite })
}

/// Implementation of the favorite_list tool, newest first.
pub async fn list_impl(db: &CacheDb) -> Result<CallToolResult, McpError> {
    let favorites = db.favorites().list().await?;
    json_result(&FavoriteListOutput { count: favorites.len(), favorites })
}

/// Implementation of the favorite_clear tool.
pub async fn clear_impl(db: &CacheDb) -> Result<CallToolResult, McpError> {
    let removed = db.favorites().clear().await?;
    json_result(&FavoriteClearOutput { removed })
}

/// Implementation of the favorite_count tool.
pub async fn count_impl(db: &CacheDb, params: FavoriteCountParams) -> Result<CallToolResult, McpError> {
    let favorites = db.favorites();
    let count = favorites.count().await?;
    let has = match params.id.as_deref() {
        Some(id) => Some(favorites.has(id).await?),
        None => None,
    };
    json_result(&FavoriteCountOutput { count, has })
}
