use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware::{from_fn, from_fn_with_state},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod password;
pub mod rating;
pub mod repository;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenService;
pub use config::AppConfig;
pub use password::PasswordManager;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document for every handler annotated with `#[utoipa::path]`, served
/// at `/api-docs/openapi.json` and browsable through `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register, handlers::auth::login_basic, handlers::auth::login_form,
        handlers::auth::logout,
        handlers::movies::list_movies, handlers::movies::top_movies,
        handlers::movies::movie_details, handlers::movies::search_movies,
        handlers::movies::post_review,
        handlers::account::get_account, handlers::account::update_account,
        handlers::admin::admin_list_movies, handlers::admin::create_movie,
        handlers::admin::admin_movie_details, handlers::admin::update_movie,
        handlers::admin::delete_movie, handlers::admin::recount_movie_rating,
        handlers::admin::delete_review, handlers::admin::list_users,
        handlers::admin::create_user, handlers::admin::toggle_admin,
        handlers::admin::toggle_ban, handlers::admin::delete_user
    ),
    components(
        schemas(
            dto::v1::RegisterRequest, dto::v1::UserRequest, dto::v1::AccountUpdateRequest,
            dto::v1::LoginRequest, dto::v1::TokenResponse, dto::v1::UserSummary,
            dto::v1::MovieRequest, dto::v1::MovieDto, dto::v1::ReviewRequest,
            dto::v1::ReviewDto, dto::v1::MovieDetails, error::ErrorBody, auth::Role,
        )
    ),
    tags(
        (name = "movie-catalog", description = "Movie catalog and review API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler and middleware. Cheap to
/// clone: the repository is behind an `Arc` and the rest is small immutable data.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
    /// Signs and verifies tokens with the configured key ring.
    pub tokens: TokenService,
    /// Password hashing and length policy.
    pub passwords: PasswordManager,
}

impl AppState {
    /// Builds the token and password services from `config`.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            tokens: TokenService::from_config(&config),
            passwords: PasswordManager::from_config(&config),
            repo,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles the route groups, attaches the access-control stages to the protected
/// ones and wraps everything in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        // authenticate → handler
        .merge(
            authenticated::authenticated_routes().route_layer(from_fn_with_state(
                state.clone(),
                middleware::authenticate,
            )),
        )
        // authenticate → require_admin → handler. The last layer added runs first.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(from_fn(middleware::require_admin))
                .route_layer(from_fn_with_state(
                    state.clone(),
                    middleware::authenticate,
                )),
        )
        .method_not_allowed_fallback(error::method_not_allowed_fallback)
        .fallback(error::not_found_fallback)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // Innermost, so a panicking handler still gets a request id and a trace line.
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span used by `TraceLayer`, tagged with the `x-request-id`
/// so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
