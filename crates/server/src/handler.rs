//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    cache,
    favorites::{self, FavoriteAddParams, FavoriteCountParams, FavoriteIdParams},
    lifecycle,
    stories_cache::{self, StoriesCachePutParams},
    worker_fetch::{WorkerFetchParams, fetch_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use storyshell_client::ServiceWorker;
use storyshell_core::CacheDb;

/// The main MCP server handler for storyshell.
#[derive(Clone)]
pub struct StoryShellServer {
    db: CacheDb,
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl StoryShellServer {
    /// Create a new server handler around an opened database and a worker.
    pub fn new(db: CacheDb, worker: Arc<ServiceWorker>) -> Self {
        Self { db, worker, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the worker. Returns status, headers, body text and whether the response came from the network, a cache partition, or was synthesized offline."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Precache the app-shell manifest. Fails without writing anything if any entry cannot be fetched.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.worker).await
    }

    #[tool(description = "Activate the installed worker: delete partitions from other versions and claim all clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.worker).await
    }

    #[tool(description = "List cache partitions with entry counts.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        cache::list_impl(&self.db, self.worker.partitions()).await
    }

    #[tool(description = "Delete one cache partition and all of its entries.")]
    async fn cache_clear(&self, params: Parameters<cache::CacheClearParams>) -> Result<CallToolResult, McpError> {
        cache::clear_impl(&self.db, params.0).await
    }

    #[tool(
        description = "Read one stored response by URL and method, from a named partition or from the first partition holding it."
    )]
    async fn cache_match(&self, params: Parameters<cache::CacheMatchParams>) -> Result<CallToolResult, McpError> {
        cache::match_impl(&self.db, &self.worker, params.0).await
    }

    #[tool(description = "Delete one entry from a cache partition. Reports whether the entry existed.")]
    async fn cache_delete_entry(
        &self, params: Parameters<cache::CacheDeleteEntryParams>,
    ) -> Result<CallToolResult, McpError> {
        cache::delete_entry_impl(&self.db, &self.worker, params.0).await
    }

    #[tool(description = "Cache a JSON story list in the API partition, stamped with its capture time.")]
    async fn stories_cache_put(&self, params: Parameters<StoriesCachePutParams>) -> Result<CallToolResult, McpError> {
        stories_cache::put_impl(&self.db, &self.worker, params.0).await
    }

    #[tool(description = "Read the cached JSON story list and its capture time. Reports found=false when nothing is cached.")]
    async fn stories_cache_get(&self) -> Result<CallToolResult, McpError> {
        stories_cache::get_impl(&self.db, &self.worker).await
    }

    #[tool(description = "Save a story as a favorite. Saving an existing id replaces it.")]
    async fn favorite_add(&self, params: Parameters<FavoriteAddParams>) -> Result<CallToolResult, McpError> {
        favorites::add_impl(&self.db, params.0).await
    }

    #[tool(description = "Remove a story from favorites.")]
    async fn favorite_remove(&self, params: Parameters<FavoriteIdParams>) -> Result<CallToolResult, McpError> {
        favorites::remove_impl(&self.db, params.0).await
    }

    #[tool(description = "Get one favorite story by id.")]
    async fn favorite_get(&self, params: Parameters<FavoriteIdParams>) -> Result<CallToolResult, McpError> {
        favorites::get_impl(&self.db, params.0).await
    }

    #[tool(description = "List favorite stories, most recently added first.")]
    async fn favorite_list(&self) -> Result<CallToolResult, McpError> {
        favorites::list_impl(&self.db).await
    }

    #[tool(description = "Remove all favorite stories.")]
    async fn favorite_clear(&self) -> Result<CallToolResult, McpError> {
        favorites::clear_impl(&self.db).await
    }

    #[tool(description = "Count favorite stories. Given an id, also report whether that story is a favorite.")]
    async fn favorite_count(&self, params: Parameters<FavoriteCountParams>) -> Result<CallToolResult, McpError> {
        favorites::count_impl(&self.db, params.0).await
    }
}

impl ServerHandler for StoryShellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "storyshell".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::offline_worker;

    #[tokio::test]
    async fn test_all_tools_registered() {
        let (db, worker) = offline_worker().await;
        let server = StoryShellServer::new(db, worker);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_clear",
                "cache_delete_entry",
                "cache_list",
                "cache_match",
                "favorite_add",
                "favorite_clear",
                "favorite_count",
                "favorite_get",
                "favorite_list",
                "favorite_remove",
                "stories_cache_get",
                "stories_cache_put",
                "worker_activate",
                "worker_fetch",
                "worker_install",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (db, worker) = offline_worker().await;
        let info = StoryShellServer::new(db, worker).get_info();
        assert_eq!(info.server_info.name, "storyshell");
    }
}
