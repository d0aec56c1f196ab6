use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{Movie, MovieFields, NewReview, NewUser, Review, User},
    pagination::{PageRequest, UserSort},
    rating::aggregate_rating,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A uniqueness rule was violated. The message is user-facing.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract handlers and the auth middleware program against.
/// `PostgresRepository` backs the running service; `InMemoryRepository` backs tests.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum's
/// task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_login(&self, login: &str) -> RepoResult<Option<User>>;
    // Returns the requested slice plus the total number of users.
    async fn list_users(&self, page: PageRequest, sort: UserSort) -> RepoResult<(Vec<User>, i64)>;
    // Fails with `Conflict` when the login is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    // Writes every mutable column of `user`; `None` when the id does not exist.
    async fn update_user(&self, user: &User) -> RepoResult<Option<User>>;
    // Also removes the user's reviews.
    async fn delete_user(&self, id: i64) -> RepoResult<bool>;

    // --- Movies ---
    async fn list_movies(&self, page: PageRequest) -> RepoResult<(Vec<Movie>, i64)>;
    // Case-insensitive substring match on the title.
    async fn search_movies(&self, title: &str, page: PageRequest) -> RepoResult<(Vec<Movie>, i64)>;
    async fn top_rated_movies(&self, limit: i64) -> RepoResult<Vec<Movie>>;
    async fn get_movie(&self, id: i64) -> RepoResult<Option<Movie>>;
    // New movies start with a rating of 0.
    async fn create_movie(&self, fields: MovieFields) -> RepoResult<Movie>;
    async fn update_movie(&self, id: i64, fields: MovieFields) -> RepoResult<Option<Movie>>;
    async fn set_movie_rating(&self, id: i64, rating: f64) -> RepoResult<Option<Movie>>;
    // Also removes the movie's reviews.
    async fn delete_movie(&self, id: i64) -> RepoResult<bool>;

    // --- Reviews ---
    async fn create_review(&self, review: NewReview) -> RepoResult<Review>;
    async fn get_review(&self, id: i64) -> RepoResult<Option<Review>>;
    // Newest first, with `author_name` filled in.
    async fn reviews_for_movie(&self, movie_id: i64) -> RepoResult<Vec<Review>>;
    // Distinct ids of the movies a user has reviewed.
    async fn movie_ids_reviewed_by(&self, user_id: i64) -> RepoResult<Vec<i64>>;
    async fn delete_review(&self, id: i64) -> RepoResult<bool>;

    // --- Token revocation ---
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> RepoResult<()>;
    async fn is_token_revoked(&self, jti: Uuid) -> RepoResult<bool>;

    /// recount_rating
    ///
    /// Recomputes a movie's aggregate rating from all of its reviews and stores it.
    /// `None` when the movie does not exist.
    async fn recount_rating(&self, movie_id: i64) -> RepoResult<Option<Movie>> {
        let ratings: Vec<i32> = self
            .reviews_for_movie(movie_id)
            .await?
            .iter()
            .map(|review| review.rating)
            .collect();
        self.set_movie_rating(movie_id, aggregate_rating(&ratings))
            .await
    }
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
