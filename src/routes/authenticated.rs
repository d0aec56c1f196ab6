use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any signed-in, non-banned user. The `authenticate` layer applied in
/// `create_router` guarantees every handler here receives a `Principal`, and account
/// handlers only ever act on the principal's own record.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /account[?id=N]
        // PUT /account
        // Read or change the caller's own account. An update returns a fresh token.
        .route(
            "/account",
            get(handlers::account::get_account).put(handlers::account::update_account),
        )
        // POST /movies/{id}/reviews
        // Posts a review and recomputes the movie's rating.
        .route(
            "/movies/{id}/reviews",
            post(handlers::movies::post_review),
        )
        // POST /logout
        // Revokes the presented token.
        .route("/logout", post(handlers::auth::logout))
}
