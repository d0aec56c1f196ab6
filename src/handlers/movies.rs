use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use validator::Validate;

use super::{
    PUBLIC_MOVIES_PAGE_SIZE, SEARCH_PAGE_SIZE, TOP_MOVIES_LIMIT, ensure_page_exists,
    load_movie_details, movie_not_found,
};
use crate::{
    AppState,
    auth::Principal,
    dto::v1::{MovieDetails, MovieDto, PageQuery, ReviewDto, ReviewRequest, SearchQuery},
    error::{ApiResult, ErrorBody},
    extract::{ApiJson, ApiPath, ApiQuery},
    models::NewReview,
    pagination::{Page, PageRequest},
};

/// list_movies
///
/// [Public Route] The catalog, five movies per page in id order.
#[utoipa::path(
    get,
    path = "/movies",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of movies", body = Page<MovieDto>),
        (status = 404, description = "Page past the end", body = ErrorBody)
    )
)]
pub async fn list_movies(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<MovieDto>>> {
    let request = PageRequest::new(query.page, PUBLIC_MOVIES_PAGE_SIZE);
    let (movies, total) = state.repo.list_movies(request).await?;
    let page = ensure_page_exists(Page::new(movies, request, total))?;
    Ok(Json(page.map(MovieDto::from)))
}

/// top_movies
///
/// [Public Route] The ten best rated movies.
#[utoipa::path(
    get,
    path = "/movies/top",
    responses((status = 200, description = "Top rated movies", body = [MovieDto]))
)]
pub async fn top_movies(State(state): State<AppState>) -> ApiResult<Json<Vec<MovieDto>>> {
    let movies = state.repo.top_rated_movies(TOP_MOVIES_LIMIT).await?;
    Ok(Json(movies.into_iter().map(MovieDto::from).collect()))
}

/// movie_details
#[utoipa::path(
    get,
    path = "/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Movie with its reviews", body = MovieDetails),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn movie_details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MovieDetails>> {
    load_movie_details(&state, id).await.map(Json)
}

/// search_movies
///
/// [Public Route] Case-insensitive title search, six results per page. A blank search
/// term yields an empty page rather than the whole catalog.
#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching movies", body = Page<MovieDto>),
        (status = 404, description = "Page past the end", body = ErrorBody)
    )
)]
pub async fn search_movies(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<Page<MovieDto>>> {
    let request = PageRequest::new(query.page, SEARCH_PAGE_SIZE);
    let term = query.t.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Ok(Json(Page::empty(request)));
    }
    let (movies, total) = state.repo.search_movies(term, request).await?;
    let page = ensure_page_exists(Page::new(movies, request, total))?;
    Ok(Json(page.map(MovieDto::from)))
}

/// post_review
///
/// [Authenticated Route] Adds the caller's review to a movie and refreshes the movie's
/// aggregate rating.
#[utoipa::path(
    post,
    path = "/movies/{id}/reviews",
    params(("id" = i64, Path, description = "Movie ID")),
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Review posted", body = ReviewDto),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Movie not found", body = ErrorBody)
    )
)]
pub async fn post_review(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(movie_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewDto>)> {
    payload.validate()?;
    if state.repo.get_movie(movie_id).await?.is_none() {
        return Err(movie_not_found());
    }

    let mut review = state
        .repo
        .create_review(NewReview {
            user_id: principal.id,
            movie_id,
            post_date: Utc::now(),
            title: payload.title,
            text: payload.text,
            rating: payload.rating,
        })
        .await?;
    review.author_name = Some(principal.name.clone());

    if let Some(movie) = state.repo.recount_rating(movie_id).await? {
        tracing::debug!("movie {} rating is now {}", movie.id, movie.rating);
    }
    Ok((StatusCode::CREATED, Json(review.into())))
}
