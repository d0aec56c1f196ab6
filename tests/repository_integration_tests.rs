//! Repository tests against a live PostgreSQL instance. They need `DATABASE_URL` and
//! are ignored by default: run them with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use movie_catalog::{
    models::{MovieFields, NewReview, NewUser, User},
    pagination::{PageRequest, UserSort},
    repository::{PostgresRepository, Repository, RepositoryError},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");
        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        PostgresRepository::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Creates a user with a unique login so tests can share one database.
async fn create_test_user(repo: &PostgresRepository, name: &str) -> User {
    repo.create_user(NewUser {
        name: name.to_string(),
        login: format!("{}-{}@test.com", name.to_lowercase(), Uuid::new_v4()),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        is_admin: false,
    })
    .await
    .expect("Failed to create test user")
}

fn movie(title: &str) -> MovieFields {
    MovieFields {
        title: title.to_string(),
        description: "Integration test movie".to_string(),
        ..MovieFields::default()
    }
}

fn review(user_id: i64, movie_id: i64, rating: i32) -> NewReview {
    NewReview {
        user_id,
        movie_id,
        post_date: Utc::now(),
        title: "Review".to_string(),
        text: "Text".to_string(),
        rating,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_login_is_a_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "Kane").await;

    let err = repo
        .create_user(NewUser {
            name: "Other".to_string(),
            login: user.login.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Conflict(_)));

    let found = repo.find_user_by_login(&user.login).await.unwrap();
    assert_eq!(found, Some(user.clone()));
    assert!(repo.delete_user(user.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn user_update_and_sorted_listing() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let mut user = create_test_user(&repo, "Parker").await;

    user.is_banned = true;
    user.name = "Dennis Parker".to_string();
    let updated = repo.update_user(&user).await.unwrap().unwrap();
    assert!(updated.is_banned);
    assert_eq!(updated.name, "Dennis Parker");

    let (users, total) = repo
        .list_users(PageRequest::new(Some(0), 1000), UserSort::parse(Some("banned,desc")))
        .await
        .unwrap();
    assert!(total >= 1);
    assert!(users[0].is_banned);

    repo.delete_user(user.id).await.unwrap();
    assert_eq!(repo.update_user(&user).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn reviews_drive_the_stored_rating() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo, "Brett").await;
    let film = repo.create_movie(movie("Alien")).await.unwrap();
    assert_eq!(film.rating, 0.0);

    for rating in [7, 8, 8] {
        repo.create_review(review(author.id, film.id, rating)).await.unwrap();
    }
    let recounted = repo.recount_rating(film.id).await.unwrap().unwrap();
    assert_eq!(recounted.rating, 7.7);

    let reviews = repo.reviews_for_movie(film.id).await.unwrap();
    assert_eq!(reviews.len(), 3);
    assert_eq!(reviews[0].author_name.as_deref(), Some("Brett"));
    assert_eq!(repo.movie_ids_reviewed_by(author.id).await.unwrap(), vec![film.id]);

    // Deleting the author cascades to their reviews.
    repo.delete_user(author.id).await.unwrap();
    assert!(repo.reviews_for_movie(film.id).await.unwrap().is_empty());
    let recounted = repo.recount_rating(film.id).await.unwrap().unwrap();
    assert_eq!(recounted.rating, 0.0);

    assert!(repo.delete_movie(film.id).await.unwrap());
    assert!(!repo.delete_movie(film.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn search_treats_wildcards_literally() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let marker = Uuid::new_v4().simple().to_string();
    let plain = repo.create_movie(movie(&format!("Plain {marker}"))).await.unwrap();
    let percent = repo
        .create_movie(movie(&format!("100% {marker}")))
        .await
        .unwrap();

    let (found, total) = repo
        .search_movies(&marker.to_uppercase(), PageRequest::new(Some(0), 10))
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(found.len(), 2);

    let (found, _) = repo
        .search_movies(&format!("% {marker}"), PageRequest::new(Some(0), 10))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, percent.id);

    repo.delete_movie(plain.id).await.unwrap();
    repo.delete_movie(percent.id).await.unwrap();
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn token_revocation_is_idempotent() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let jti = Uuid::new_v4();
    let expires_at = Utc::now() + Duration::hours(1);

    assert!(!repo.is_token_revoked(jti).await.unwrap());
    repo.revoke_token(jti, expires_at).await.unwrap();
    repo.revoke_token(jti, expires_at).await.unwrap();
    assert!(repo.is_token_revoked(jti).await.unwrap());
}
