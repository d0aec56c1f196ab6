use axum::http::StatusCode;
use validator::Validate;

use crate::{
    AppState,
    dto::v1::{MovieDetails, ReviewDto},
    error::{ApiError, ApiResult, validation_messages},
    pagination::Page,
    password::PasswordError,
};

pub mod account;
pub mod admin;
pub mod auth;
pub mod movies;

// --- Page Sizes ---

pub const PUBLIC_MOVIES_PAGE_SIZE: i64 = 5;
pub const SEARCH_PAGE_SIZE: i64 = 6;
pub const ADMIN_PAGE_SIZE: i64 = 10;
pub const TOP_MOVIES_LIMIT: i64 = 10;

// --- Shared Handler Helpers ---

/// validate_request
///
/// Runs the payload's declarative rules and folds in the outcome of the password
/// policy check, so the client gets every problem in one response.
pub(crate) fn validate_request<T: Validate>(
    payload: &T,
    password_check: Result<(), PasswordError>,
) -> ApiResult<()> {
    let mut messages = match payload.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => validation_messages(&errors),
    };
    match password_check {
        Ok(()) => {}
        Err(PasswordError::Policy(message)) => messages.push(message),
        Err(other) => return Err(other.into()),
    }
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ApiError::with_messages(StatusCode::BAD_REQUEST, messages))
    }
}

/// Past-the-end pages are a 404 naming the last valid page.
pub(crate) fn ensure_page_exists<T>(page: Page<T>) -> ApiResult<Page<T>> {
    if page.is_past_last_page() {
        return Err(ApiError::not_found(format!(
            "Sorry, last page is {}",
            page.last_page()
        )));
    }
    Ok(page)
}

pub(crate) fn movie_not_found() -> ApiError {
    ApiError::not_found("Movie not found")
}

pub(crate) fn user_not_found() -> ApiError {
    ApiError::not_found("User not found")
}

/// Loads a movie and its reviews. Shared by the public and admin detail views.
pub(crate) async fn load_movie_details(state: &AppState, id: i64) -> ApiResult<MovieDetails> {
    let movie = state.repo.get_movie(id).await?.ok_or_else(movie_not_found)?;
    let reviews = state.repo.reviews_for_movie(id).await?;
    Ok(MovieDetails {
        movie: movie.into(),
        reviews: reviews.into_iter().map(ReviewDto::from).collect(),
    })
}
