use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// --- Core Application Records (Mapped to Database) ---
//
// These structs mirror table rows and never leave the server as-is: handlers map
// them to the `dto::v1` contracts, which is where the password hash gets dropped.

/// User
///
/// Account record from the `users` table. `login` is the user's email and is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct User {
    pub id: i64,
    // Display name.
    pub name: String,
    pub login: String,
    // Argon2 PHC string (algorithm, salt and digest in one value).
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_banned: bool,
}

/// NewUser
///
/// Insert payload for `users`. The password must already be hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub name: String,
    pub login: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Movie
///
/// Catalog entry from the `movies` table. `rating` is derived from the movie's reviews.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub director: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub rating: f64,
    pub description: String,
}

/// MovieFields
///
/// Editable movie columns, shared by insert and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFields {
    pub title: String,
    pub director: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub description: String,
}

/// Review
///
/// A user's review of a movie from the `reviews` table, optionally enriched with the
/// author's display name (loaded via a JOIN on `users`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub post_date: DateTime<Utc>,
    pub title: String,
    #[sqlx(rename = "review_text")]
    pub text: String,
    pub rating: i32,
    #[sqlx(default)]
    pub author_name: Option<String>,
}

/// NewReview
#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub movie_id: i64,
    pub post_date: DateTime<Utc>,
    pub title: String,
    pub text: String,
    pub rating: i32,
}
