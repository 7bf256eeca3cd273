//! MCP Server for book-search-mcp
//!
//! MCP Protocol (stdio) <-> application::SearchSession / LibraryService
//!
//! Two pages like the web client: search (open session) and saved books.
//! Tools: search_books, show_results, save_book, dismiss_error, saved_books,
//! remove_book, login, logout

use std::future::Future;
use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::application::auth::SessionAuth;
use crate::application::error::AppError;
use crate::application::library::LibraryService;
use crate::application::session::SearchSession;
use crate::application::view::LibraryView;
use crate::config::Config;
use crate::domain::error::DomainError;
use crate::domain::model::auth::AuthToken;
use crate::domain::model::id::BookId;
use crate::domain::repository::AuthGateway;
use crate::infra::google_books::GoogleBooksClient;
use crate::infra::graphql::GraphqlClient;
use crate::infra::json_store::JsonSavedIdCache;

type Session = SearchSession<GoogleBooksClient, GraphqlClient, JsonSavedIdCache>;

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverを起動する。終了時に検索セッションを閉じてキャッシュへ書き出す。
pub async fn run(config: Config) -> anyhow::Result<()> {
    let server = BookSearchServer::from_config(&config)?;
    tracing::info!(cache = %server.cache.path().display(), "starting book-search MCP server");

    let service = server.clone().serve(stdio()).await?;
    let waiting = async move {
        service
            .waiting()
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from)
    };

    serve_until(&server, waiting, shutdown_signal()).await
}

/// サービスの終了かシャットダウン要求のどちらかを待ち、検索セッションを閉じる。
async fn serve_until(
    server: &BookSearchServer,
    waiting: impl Future<Output = anyhow::Result<()>>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let result = tokio::select! {
        quit = waiting => quit,
        _ = shutdown => Ok(()),
    };

    server.leave_search().await;
    tracing::info!("server stopped");
    result
}

/// SIGINT/SIGTERMを待つ。シグナル終了でもセッションを閉じられるようにする。
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

// =============================================================================
// MCP Server
// =============================================================================

/// 表示中のページ。検索ページだけがセッションを保持する。
enum Page {
    Search(Session),
    Saved,
}

#[derive(Clone)]
struct BookSearchServer {
    catalog: GoogleBooksClient,
    persistence: GraphqlClient,
    cache: JsonSavedIdCache,
    auth: Arc<SessionAuth>,
    page: Arc<RwLock<Page>>,
    tool_router: ToolRouter<Self>,
}

impl BookSearchServer {
    fn from_config(config: &Config) -> anyhow::Result<Self> {
        let catalog = GoogleBooksClient::new(&config.catalog_url, config.request_timeout)?;
        let persistence = GraphqlClient::new(&config.graphql_url, config.request_timeout)?;
        let cache = JsonSavedIdCache::in_dir(&config.cache_dir);

        let auth = SessionAuth::new(config.token_ttl);
        if let Some(token) = &config.token {
            auth.login(AuthToken::new(token.clone()));
        }

        Ok(Self::new(catalog, persistence, cache, auth))
    }

    fn new(
        catalog: GoogleBooksClient,
        persistence: GraphqlClient,
        cache: JsonSavedIdCache,
        auth: SessionAuth,
    ) -> Self {
        let session = SearchSession::open(catalog.clone(), persistence.clone(), cache.clone());
        Self {
            catalog,
            persistence,
            cache,
            auth: Arc::new(auth),
            page: Arc::new(RwLock::new(Page::Search(session))),
            tool_router: Self::tool_router(),
        }
    }

    fn library(&self) -> LibraryService<GraphqlClient, JsonSavedIdCache> {
        LibraryService::new(self.persistence.clone(), self.cache.clone())
    }

    /// 検索ページに入る。保存済みページからの遷移ならキャッシュを読み直して新しいセッションを開く。
    async fn enter_search(&self) -> RwLockReadGuard<'_, Page> {
        let page = self.page.read().await;
        if matches!(*page, Page::Search(_)) {
            return page;
        }
        drop(page);

        let mut page = self.page.write().await;
        if !matches!(*page, Page::Search(_)) {
            *page = Page::Search(SearchSession::open(
                self.catalog.clone(),
                self.persistence.clone(),
                self.cache.clone(),
            ));
        }
        page.downgrade()
    }

    /// 検索ページを離れる。実行中の検索・保存の完了を待ってからセッションを閉じる。
    async fn leave_search(&self) {
        let mut page = self.page.write().await;
        if let Page::Search(session) = std::mem::replace(&mut *page, Page::Saved) {
            if let Err(e) = session.close() {
                tracing::warn!(error = %e, "closing search session failed");
            }
        }
    }

    fn to_mcp_error(e: AppError) -> McpError {
        McpError::internal_error(format!("{e}"), None)
    }

    fn render_search(&self, session: &Session) -> CallToolResult {
        let view = session.view(self.auth.as_ref());
        CallToolResult::success(vec![Content::text(view.render_markdown())])
    }
}

fn session_of(page: &Page) -> Result<&Session, McpError> {
    match page {
        Page::Search(session) => Ok(session),
        Page::Saved => Err(McpError::internal_error("search page is not open", None)),
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for BookSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "book-search-mcp".to_string(),
                title: Some("Book Search — search the catalog and save books".to_string()),
                description: Some(
                    "Search a book catalog and save results to your account. \
                     Flow: `search_books` → `save_book`."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Search for books and keep the ones you like.\n\
                 \n\
                 Tools: `search_books` → `save_book` (requires `login`). \
                 `saved_books` lists your account's books, `remove_book` deletes one."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn parse_book_id(s: &str) -> Result<BookId, McpError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(McpError::invalid_params("book_id must not be empty", None));
    }
    Ok(BookId::from(trimmed))
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpSearchRequest {
    #[schemars(description = "Free-text search query (title, author, keywords)")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookRequest {
    #[schemars(description = "Book ID as shown in the result cards (e.g. 'b1')")]
    pub book_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpLoginRequest {
    #[schemars(description = "Account email")]
    pub email: String,
    #[schemars(description = "Account password")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpEmptyRequest {}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl BookSearchServer {
    #[tool(
        name = "search_books",
        description = "Search the book catalog. Replaces the current results. An empty query does nothing.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = true
        )
    )]
    async fn search_books(
        &self,
        Parameters(req): Parameters<McpSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let page = self.enter_search().await;
        let session = session_of(&page)?;

        // 失敗してもエラーにせず、直前の結果をそのまま表示する
        if let Err(e) = session.search_for(req.query).await {
            if !e.is_precondition() {
                tracing::warn!(error = %e, "search suppressed");
            }
        }
        Ok(self.render_search(session))
    }

    #[tool(
        name = "show_results",
        description = "Show the current search results with save buttons.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn show_results(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let page = self.enter_search().await;
        let session = session_of(&page)?;
        Ok(self.render_search(session))
    }

    #[tool(
        name = "save_book",
        description = "Save a book from the current results to your account. Requires `login`. Books already saved cannot be saved again.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn save_book(
        &self,
        Parameters(req): Parameters<McpBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_book_id(&req.book_id)?;
        let page = self.enter_search().await;
        let session = session_of(&page)?;

        if let Err(blocked) = session.view(self.auth.as_ref()).save_gate(&id) {
            tracing::debug!(book_id = %id, reason = %blocked, "save blocked");
            return Ok(CallToolResult::success(vec![Content::text(
                blocked.to_string(),
            )]));
        }

        match session.save(&id, self.auth.as_ref()).await {
            Ok(_) => {}
            Err(AppError::Precondition(DomainError::NotAuthenticated)) => {
                return Ok(CallToolResult::success(vec![Content::text(
                    "Session expired. Log in with `login` to save books.",
                )]));
            }
            // 保存失敗はビューのインラインエラーとして表示される
            Err(e) => tracing::debug!(error = %e, "save did not complete"),
        }
        Ok(self.render_search(session))
    }

    #[tool(
        name = "dismiss_error",
        description = "Dismiss the inline error shown after a failed save.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn dismiss_error(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let page = self.enter_search().await;
        let session = session_of(&page)?;
        session.dismiss_error();
        Ok(self.render_search(session))
    }

    #[tool(
        name = "saved_books",
        description = "List the books saved to your account. Requires `login`.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = true
        )
    )]
    async fn saved_books(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.leave_search().await;

        match self.library().load(self.auth.as_ref()).await {
            Ok(library) => Ok(CallToolResult::success(vec![Content::text(
                LibraryView { library: &library }.render_markdown(),
            )])),
            Err(AppError::Precondition(DomainError::NotAuthenticated)) => {
                Ok(CallToolResult::success(vec![Content::text(
                    "Log in with `login` to see your saved books.",
                )]))
            }
            Err(e) => Err(Self::to_mcp_error(e)),
        }
    }

    #[tool(
        name = "remove_book",
        description = "Delete a book from your account's saved books. Requires `login`.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn remove_book(
        &self,
        Parameters(req): Parameters<McpBookRequest>,
    ) -> Result<CallToolResult, McpError> {
        let id = parse_book_id(&req.book_id)?;
        self.leave_search().await;

        match self.library().remove_book(&id, self.auth.as_ref()).await {
            Ok(library) => Ok(CallToolResult::success(vec![Content::text(
                LibraryView { library: &library }.render_markdown(),
            )])),
            Err(AppError::Precondition(DomainError::NotAuthenticated)) => {
                Ok(CallToolResult::success(vec![Content::text(
                    "Log in with `login` to manage your saved books.",
                )]))
            }
            Err(e) => Err(Self::to_mcp_error(e)),
        }
    }

    #[tool(
        name = "login",
        description = "Log in with email and password. Enables `save_book`, `saved_books` and `remove_book`.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    async fn login(
        &self,
        Parameters(req): Parameters<McpLoginRequest>,
    ) -> Result<CallToolResult, McpError> {
        let token = self
            .persistence
            .login(&req.email, &req.password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "login failed");
                Self::to_mcp_error(AppError::Remote(Box::new(e)))
            })?;
        self.auth.login(token);

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Logged in as {}.",
            req.email
        ))]))
    }

    #[tool(
        name = "logout",
        description = "Log out. Save buttons are hidden until the next `login`.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn logout(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.auth.logout();
        Ok(CallToolResult::success(vec![Content::text("Logged out.")]))
    }
}
