use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Everything here is read-only except registration
/// and login, which are how a client gets a token in the first place.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /registration
        // Creates a regular (non-admin, non-banned) account.
        .route("/registration", post(handlers::auth::register))
        // GET /loginPage   (Authorization: Basic)
        // POST /loginPage  (JSON or urlencoded body)
        // Both answer with a signed token.
        .route(
            "/loginPage",
            get(handlers::auth::login_basic).post(handlers::auth::login_form),
        )
        // GET /movies?page=N
        .route("/movies", get(handlers::movies::list_movies))
        // GET /movies/top
        .route("/movies/top", get(handlers::movies::top_movies))
        // GET /movies/{id}
        // The movie plus its reviews, newest first.
        .route("/movies/{id}", get(handlers::movies::movie_details))
        // GET /search?t=title&page=N
        .route("/search", get(handlers::movies::search_movies))
}
