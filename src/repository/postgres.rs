use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    models::{Movie, MovieFields, NewReview, NewUser, Review, User},
    pagination::{PageRequest, UserSort},
};

const USER_COLUMNS: &str = "id, name, login, password_hash, is_admin, is_banned";
const MOVIE_COLUMNS: &str =
    "id, title, director, release_date, poster_url, trailer_url, rating, description";
const REVIEW_COLUMNS: &str = "id, user_id, movie_id, post_date, title, review_text, rating";

const LOGIN_TAKEN: &str = "User with such login already exists";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are checked at
/// runtime; the schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a unique violation on `users.login` to the user-facing conflict.
fn login_conflict(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(LOGIN_TAKEN.to_string())
        }
        _ => RepositoryError::Database(err),
    }
}

/// Escapes LIKE wildcards so user input only ever matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// list_users
    ///
    /// The ORDER BY column comes from the `UserSortKey` whitelist, so pushing it as raw
    /// SQL is safe. `id` is always the tie-breaker to keep pages stable.
    async fn list_users(&self, page: PageRequest, sort: UserSort) -> RepoResult<(Vec<User>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users ORDER BY "));
        builder.push(sort.key.column());
        builder.push(if sort.descending { " DESC" } else { " ASC" });
        builder.push(", id ASC LIMIT ");
        builder.push_bind(page.size);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok((users, total))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, login, password_hash, is_admin, is_banned)
             VALUES ($1, $2, $3, $4, FALSE)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.name)
        .bind(user.login)
        .bind(user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(login_conflict)
    }

    async fn update_user(&self, user: &User) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET name = $2, login = $3, password_hash = $4, is_admin = $5, is_banned = $6
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.login)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.is_banned)
        .fetch_optional(&self.pool)
        .await
        .map_err(login_conflict)
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        // Reviews go with the user through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_movies(&self, page: PageRequest) -> RepoResult<(Vec<Movie>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok((movies, total))
    }

    async fn search_movies(&self, title: &str, page: PageRequest) -> RepoResult<(Vec<Movie>, i64)> {
        let pattern = like_pattern(title);
        let total: i64 =
            sqlx::query_scalar(r"SELECT COUNT(*) FROM movies WHERE title ILIKE $1 ESCAPE '\'")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;
        let movies = sqlx::query_as::<_, Movie>(&format!(
            r"SELECT {MOVIE_COLUMNS} FROM movies
              WHERE title ILIKE $1 ESCAPE '\'
              ORDER BY id ASC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok((movies, total))
    }

    async fn top_rated_movies(&self, limit: i64) -> RepoResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY rating DESC, id ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> RepoResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn create_movie(&self, fields: MovieFields) -> RepoResult<Movie> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "INSERT INTO movies (title, director, release_date, poster_url, trailer_url, rating, description)
             VALUES ($1, $2, $3, $4, $5, 0, $6)
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(fields.title)
        .bind(fields.director)
        .bind(fields.release_date)
        .bind(fields.poster_url)
        .bind(fields.trailer_url)
        .bind(fields.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn update_movie(&self, id: i64, fields: MovieFields) -> RepoResult<Option<Movie>> {
        // The rating is derived from reviews and is never overwritten here.
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies
             SET title = $2, director = $3, release_date = $4, poster_url = $5,
                 trailer_url = $6, description = $7
             WHERE id = $1
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(id)
        .bind(fields.title)
        .bind(fields.director)
        .bind(fields.release_date)
        .bind(fields.poster_url)
        .bind(fields.trailer_url)
        .bind(fields.description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn set_movie_rating(&self, id: i64, rating: f64) -> RepoResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "UPDATE movies SET rating = $2 WHERE id = $1 RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(id)
        .bind(rating)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn delete_movie(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_review(&self, review: NewReview) -> RepoResult<Review> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (user_id, movie_id, post_date, title, review_text, rating)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.user_id)
        .bind(review.movie_id)
        .bind(review.post_date)
        .bind(review.title)
        .bind(review.text)
        .bind(review.rating)
        .fetch_one(&self.pool)
        .await?;
        Ok(review)
    }

    async fn get_review(&self, id: i64) -> RepoResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    /// reviews_for_movie
    ///
    /// Joins `users` to attach the author's display name. Newest first; `id` breaks
    /// ties between reviews posted in the same instant.
    async fn reviews_for_movie(&self, movie_id: i64) -> RepoResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT r.id, r.user_id, r.movie_id, r.post_date, r.title, r.review_text, r.rating,
                   u.name AS author_name
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.movie_id = $1
            ORDER BY r.post_date DESC, r.id DESC
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn movie_ids_reviewed_by(&self, user_id: i64) -> RepoResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT DISTINCT movie_id FROM reviews WHERE user_id = $1 ORDER BY movie_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn delete_review(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// revoke_token
    ///
    /// Idempotent. Rows for tokens that have expired anyway are purged on the way.
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> RepoResult<bool> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("matrix"), "%matrix%");
        assert_eq!(like_pattern("100%_"), r"%100\%\_%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
