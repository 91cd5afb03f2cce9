/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tallybook_api::{app::{build_router, AppState}, config::Config};
/// use tallybook_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tallybook_shared::auth::middleware::jwt_auth_middleware;
use tallybook_shared::store::LedgerStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;

/// Shared application state
///
/// Cloned per request via Axum's `State` extractor. The store is held as
/// a trait object so router tests can substitute the in-memory backend.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub store: Arc<dyn LedgerStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn LedgerStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/                             # API v1 (versioned)
///     ├── /auth/                       # Authentication (public)
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── POST /refresh
///     ├── /teams                       # Team + membership management
///     ├── /books                       # Book lifecycle
///     ├── /accounts                    # Accounts and transactions
///     └── /categories                  # Category tree
/// ```
///
/// Everything outside `/health` and `/v1/auth` requires a Bearer token.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let team_routes = Router::new()
        .route("/", post(routes::teams::create_team))
        .route("/", get(routes::teams::list_teams))
        .route("/:id", get(routes::teams::get_team))
        .route("/:id", delete(routes::teams::soft_delete_team))
        .route("/:id/restore", post(routes::teams::restore_team))
        .route("/:id/purge", delete(routes::teams::purge_team))
        .route("/:id/members", get(routes::teams::list_members))
        .route("/:id/members", post(routes::teams::add_member))
        .route("/:id/members/:user_id", delete(routes::teams::remove_member))
        .route("/:id/members/:user_id", put(routes::teams::change_role))
        .route("/:id/books", post(routes::books::create_book))
        .route("/:id/books", get(routes::books::list_books));

    let book_routes = Router::new()
        .route("/:id", get(routes::books::get_book))
        .route("/:id", delete(routes::books::soft_delete_book))
        .route("/:id/restore", post(routes::books::restore_book))
        .route("/:id/purge", delete(routes::books::purge_book))
        .route("/:id/accounts", post(routes::ledger::create_account))
        .route("/:id/accounts", get(routes::ledger::list_accounts))
        .route("/:id/categories", post(routes::ledger::create_category))
        .route("/:id/categories", get(routes::ledger::list_categories));

    let account_routes = Router::new()
        .route("/:id/transactions", post(routes::ledger::create_transaction))
        .route("/:id/transactions", get(routes::ledger::list_transactions));

    let category_routes =
        Router::new().route("/:id/parent", put(routes::ledger::set_category_parent));

    let protected_routes = Router::new()
        .nest("/teams", team_routes)
        .nest("/books", book_routes)
        .nest("/accounts", account_routes)
        .nest("/categories", category_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new().nest("/auth", auth_routes).merge(protected_routes);

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Delegates to the shared [`jwt_auth_middleware`], converting its
/// refusals into the API error body.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    jwt_auth_middleware(state.jwt_secret().to_string(), req, next)
        .await
        .map_err(crate::error::ApiError::from)
}
