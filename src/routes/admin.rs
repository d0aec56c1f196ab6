use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Catalog and user moderation. Nested under `/admin` and wrapped in both
/// `authenticate` and `require_admin`, so a non-admin principal gets 403 on every
/// route here before any handler runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/movies?page=N
        // POST /admin/movies
        .route(
            "/movies",
            get(handlers::admin::admin_list_movies).post(handlers::admin::create_movie),
        )
        // GET | PUT | DELETE /admin/movies/{id}
        .route(
            "/movies/{id}",
            get(handlers::admin::admin_movie_details)
                .put(handlers::admin::update_movie)
                .delete(handlers::admin::delete_movie),
        )
        // POST /admin/movies/{id}/rating
        // Forces a rating recount from the stored reviews.
        .route(
            "/movies/{id}/rating",
            post(handlers::admin::recount_movie_rating),
        )
        // DELETE /admin/reviews/{id}
        .route("/reviews/{id}", delete(handlers::admin::delete_review))
        // GET /admin/users?page=N&sort=prop[,asc|desc]
        // POST /admin/users
        .route(
            "/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        // DELETE /admin/users/{id}
        // Self-deletion is refused with 409.
        .route("/users/{id}", delete(handlers::admin::delete_user))
        // PUT /admin/users/{id}/admin
        // PUT /admin/users/{id}/ban
        // Toggles. An admin cannot target their own account.
        .route("/users/{id}/admin", put(handlers::admin::toggle_admin))
        .route("/users/{id}/ban", put(handlers::admin::toggle_ban))
}
