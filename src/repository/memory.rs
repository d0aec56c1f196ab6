use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::{
    models::{Movie, MovieFields, NewReview, NewUser, Review, User},
    pagination::{PageRequest, UserSort, UserSortKey},
};

#[derive(Default)]
struct Store {
    users: BTreeMap<i64, User>,
    movies: BTreeMap<i64, Movie>,
    reviews: BTreeMap<i64, Review>,
    revoked: HashMap<Uuid, DateTime<Utc>>,
    next_user_id: i64,
    next_movie_id: i64,
    next_review_id: i64,
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory, used by the router tests.
/// `new_failing` builds one whose every call fails, to exercise the 500 path.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
    should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn store(&self) -> RepoResult<MutexGuard<'_, Store>> {
        if self.should_fail {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(
                "in-memory repository: failure requested".to_string(),
            )));
        }
        // A poisoned lock only means a test panicked mid-write; the data is still usable.
        Ok(self.store.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

fn slice<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .cloned()
        .collect()
}

fn compare_users(a: &User, b: &User, key: UserSortKey) -> Ordering {
    match key {
        UserSortKey::Id => a.id.cmp(&b.id),
        UserSortKey::Login => a.login.cmp(&b.login),
        UserSortKey::Username => a.name.cmp(&b.name),
        UserSortKey::Admin => a.is_admin.cmp(&b.is_admin),
        UserSortKey::Banned => a.is_banned.cmp(&b.is_banned),
    }
}

fn login_taken() -> RepositoryError {
    RepositoryError::Conflict("User with such login already exists".to_string())
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.store()?.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> RepoResult<Option<User>> {
        Ok(self
            .store()?
            .users
            .values()
            .find(|user| user.login == login)
            .cloned())
    }

    async fn list_users(&self, page: PageRequest, sort: UserSort) -> RepoResult<(Vec<User>, i64)> {
        let store = self.store()?;
        let mut users: Vec<User> = store.users.values().cloned().collect();
        users.sort_by(|a, b| {
            let primary = compare_users(a, b, sort.key);
            let primary = if sort.descending {
                primary.reverse()
            } else {
                primary
            };
            primary.then(a.id.cmp(&b.id))
        });
        Ok((slice(&users, page), users.len() as i64))
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store()?;
        if store.users.values().any(|u| u.login == user.login) {
            return Err(login_taken());
        }
        store.next_user_id += 1;
        let created = User {
            id: store.next_user_id,
            name: user.name,
            login: user.login,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            is_banned: false,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> RepoResult<Option<User>> {
        let mut store = self.store()?;
        if store
            .users
            .values()
            .any(|u| u.login == user.login && u.id != user.id)
        {
            return Err(login_taken());
        }
        match store.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store()?;
        let removed = store.users.remove(&id).is_some();
        if removed {
            store.reviews.retain(|_, review| review.user_id != id);
        }
        Ok(removed)
    }

    async fn list_movies(&self, page: PageRequest) -> RepoResult<(Vec<Movie>, i64)> {
        let store = self.store()?;
        let movies: Vec<Movie> = store.movies.values().cloned().collect();
        Ok((slice(&movies, page), movies.len() as i64))
    }

    async fn search_movies(&self, title: &str, page: PageRequest) -> RepoResult<(Vec<Movie>, i64)> {
        let needle = title.to_lowercase();
        let store = self.store()?;
        let movies: Vec<Movie> = store
            .movies
            .values()
            .filter(|movie| movie.title.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok((slice(&movies, page), movies.len() as i64))
    }

    async fn top_rated_movies(&self, limit: i64) -> RepoResult<Vec<Movie>> {
        let store = self.store()?;
        let mut movies: Vec<Movie> = store.movies.values().cloned().collect();
        movies.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.id.cmp(&b.id)));
        movies.truncate(limit.max(0) as usize);
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> RepoResult<Option<Movie>> {
        Ok(self.store()?.movies.get(&id).cloned())
    }

    async fn create_movie(&self, fields: MovieFields) -> RepoResult<Movie> {
        let mut store = self.store()?;
        store.next_movie_id += 1;
        let movie = Movie {
            id: store.next_movie_id,
            title: fields.title,
            director: fields.director,
            release_date: fields.release_date,
            poster_url: fields.poster_url,
            trailer_url: fields.trailer_url,
            rating: 0.0,
            description: fields.description,
        };
        store.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn update_movie(&self, id: i64, fields: MovieFields) -> RepoResult<Option<Movie>> {
        let mut store = self.store()?;
        Ok(store.movies.get_mut(&id).map(|movie| {
            movie.title = fields.title;
            movie.director = fields.director;
            movie.release_date = fields.release_date;
            movie.poster_url = fields.poster_url;
            movie.trailer_url = fields.trailer_url;
            movie.description = fields.description;
            movie.clone()
        }))
    }

    async fn set_movie_rating(&self, id: i64, rating: f64) -> RepoResult<Option<Movie>> {
        let mut store = self.store()?;
        Ok(store.movies.get_mut(&id).map(|movie| {
            movie.rating = rating;
            movie.clone()
        }))
    }

    async fn delete_movie(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store()?;
        let removed = store.movies.remove(&id).is_some();
        if removed {
            store.reviews.retain(|_, review| review.movie_id != id);
        }
        Ok(removed)
    }

    async fn create_review(&self, review: NewReview) -> RepoResult<Review> {
        let mut store = self.store()?;
        store.next_review_id += 1;
        let created = Review {
            id: store.next_review_id,
            user_id: review.user_id,
            movie_id: review.movie_id,
            post_date: review.post_date,
            title: review.title,
            text: review.text,
            rating: review.rating,
            author_name: None,
        };
        store.reviews.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_review(&self, id: i64) -> RepoResult<Option<Review>> {
        Ok(self.store()?.reviews.get(&id).cloned())
    }

    async fn reviews_for_movie(&self, movie_id: i64) -> RepoResult<Vec<Review>> {
        let store = self.store()?;
        let mut reviews: Vec<Review> = store
            .reviews
            .values()
            .filter(|review| review.movie_id == movie_id)
            .map(|review| Review {
                author_name: store.users.get(&review.user_id).map(|u| u.name.clone()),
                ..review.clone()
            })
            .collect();
        reviews.sort_by(|a, b| b.post_date.cmp(&a.post_date).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }

    async fn movie_ids_reviewed_by(&self, user_id: i64) -> RepoResult<Vec<i64>> {
        let store = self.store()?;
        let mut ids: Vec<i64> = store
            .reviews
            .values()
            .filter(|review| review.user_id == user_id)
            .map(|review| review.movie_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn delete_review(&self, id: i64) -> RepoResult<bool> {
        Ok(self.store()?.reviews.remove(&id).is_some())
    }

    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> RepoResult<()> {
        let mut store = self.store()?;
        let now = Utc::now();
        store.revoked.retain(|_, expiry| *expiry >= now);
        store.revoked.entry(jti).or_insert(expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> RepoResult<bool> {
        Ok(self.store()?.revoked.contains_key(&jti))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(login: &str) -> NewUser {
        NewUser {
            name: "Tester".to_string(),
            login: login.to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
        }
    }

    fn fields(title: &str) -> MovieFields {
        MovieFields {
            title: title.to_string(),
            description: "A description".to_string(),
            ..MovieFields::default()
        }
    }

    #[tokio::test]
    async fn duplicate_login_is_a_conflict() {
        let repo = InMemoryRepository::new();
        repo.create_user(new_user("a@example.com")).await.unwrap();
        let err = repo.create_user(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleting_a_user_removes_their_reviews() {
        let repo = InMemoryRepository::new();
        let user = repo.create_user(new_user("a@example.com")).await.unwrap();
        let movie = repo.create_movie(fields("Alien")).await.unwrap();
        repo.create_review(NewReview {
            user_id: user.id,
            movie_id: movie.id,
            post_date: Utc::now(),
            title: "Good".to_string(),
            text: "Scary".to_string(),
            rating: 8,
        })
        .await
        .unwrap();

        assert_eq!(repo.movie_ids_reviewed_by(user.id).await.unwrap(), vec![movie.id]);
        assert!(repo.delete_user(user.id).await.unwrap());
        assert!(repo.reviews_for_movie(movie.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recount_rating_uses_all_reviews() {
        let repo = InMemoryRepository::new();
        let user = repo.create_user(new_user("a@example.com")).await.unwrap();
        let movie = repo.create_movie(fields("Alien")).await.unwrap();
        for rating in [7, 8, 8] {
            repo.create_review(NewReview {
                user_id: user.id,
                movie_id: movie.id,
                post_date: Utc::now(),
                title: "t".to_string(),
                text: "x".to_string(),
                rating,
            })
            .await
            .unwrap();
        }
        let updated = repo.recount_rating(movie.id).await.unwrap().unwrap();
        assert_eq!(updated.rating, 7.7);
        assert!(repo.recount_rating(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let repo = InMemoryRepository::new();
        repo.create_movie(fields("The Matrix")).await.unwrap();
        repo.create_movie(fields("Alien")).await.unwrap();
        let (found, total) = repo
            .search_movies("matrix", PageRequest::new(None, 6))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(found[0].title, "The Matrix");
    }

    #[tokio::test]
    async fn revocation_is_idempotent() {
        let repo = InMemoryRepository::new();
        let jti = Uuid::new_v4();
        let expiry = Utc::now() + Duration::hours(1);
        repo.revoke_token(jti, expiry).await.unwrap();
        repo.revoke_token(jti, expiry).await.unwrap();
        assert!(repo.is_token_revoked(jti).await.unwrap());
        assert!(!repo.is_token_revoked(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn failing_repository_errors_on_every_call() {
        let repo = InMemoryRepository::new_failing();
        assert!(matches!(
            repo.get_movie(1).await,
            Err(RepositoryError::Database(_))
        ));
    }
}
