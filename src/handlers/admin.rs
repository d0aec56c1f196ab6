use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use super::{
    ADMIN_PAGE_SIZE, ensure_page_exists, load_movie_details, movie_not_found, user_not_found,
};
use crate::{
    AppState,
    auth::Principal,
    dto::v1::{
        MovieDetails, MovieDto, MovieRequest, PageQuery, UserListQuery, UserRequest, UserSummary,
    },
    error::{ApiError, ApiResult, ErrorBody},
    extract::{ApiJson, ApiPath, ApiQuery},
    models::NewUser,
    pagination::{Page, PageRequest, UserSort},
};

// Every handler here sits behind `authenticate` and `require_admin`.

// --- Movies ---

/// admin_list_movies
#[utoipa::path(
    get,
    path = "/admin/movies",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of movies", body = Page<MovieDto>),
        (status = 403, description = "Access denied", body = ErrorBody),
        (status = 404, description = "Page past the end", body = ErrorBody)
    )
)]
pub async fn admin_list_movies(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Json<Page<MovieDto>>> {
    let request = PageRequest::new(query.page, ADMIN_PAGE_SIZE);
    let (movies, total) = state.repo.list_movies(request).await?;
    let page = ensure_page_exists(Page::new(movies, request, total))?;
    Ok(Json(page.map(MovieDto::from)))
}

/// create_movie
///
/// [Admin Route] Adds a movie to the catalog. Its rating starts at 0.
#[utoipa::path(
    post,
    path = "/admin/movies",
    request_body = MovieRequest,
    responses(
        (status = 201, description = "Created", body = MovieDto),
        (status = 400, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn create_movie(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<MovieRequest>,
) -> ApiResult<(StatusCode, Json<MovieDto>)> {
    payload.validate()?;
    let movie = state.repo.create_movie(payload.into()).await?;
    tracing::info!("created movie {} ({})", movie.id, movie.title);
    Ok((StatusCode::CREATED, Json(movie.into())))
}

/// admin_movie_details
#[utoipa::path(
    get,
    path = "/admin/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Movie with its reviews", body = MovieDetails),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn admin_movie_details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MovieDetails>> {
    load_movie_details(&state, id).await.map(Json)
}

/// update_movie
///
/// [Admin Route] Replaces a movie's editable fields. The rating is left alone.
#[utoipa::path(
    put,
    path = "/admin/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    request_body = MovieRequest,
    responses(
        (status = 200, description = "Updated", body = MovieDto),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_movie(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<MovieRequest>,
) -> ApiResult<Json<MovieDto>> {
    payload.validate()?;
    let movie = state
        .repo
        .update_movie(id, payload.into())
        .await?
        .ok_or_else(movie_not_found)?;
    tracing::info!("updated movie {}", movie.id);
    Ok(Json(movie.into()))
}

/// delete_movie
///
/// [Admin Route] Removes a movie and all of its reviews.
#[utoipa::path(
    delete,
    path = "/admin/movies/{id}",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_movie(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if !state.repo.delete_movie(id).await? {
        return Err(movie_not_found());
    }
    tracing::info!("deleted movie {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// recount_movie_rating
///
/// [Admin Route] Forces the aggregate rating to be recomputed from the reviews.
#[utoipa::path(
    post,
    path = "/admin/movies/{id}/rating",
    params(("id" = i64, Path, description = "Movie ID")),
    responses(
        (status = 200, description = "Rating recomputed", body = MovieDto),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn recount_movie_rating(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MovieDto>> {
    let movie = state
        .repo
        .recount_rating(id)
        .await?
        .ok_or_else(movie_not_found)?;
    Ok(Json(movie.into()))
}

// --- Reviews ---

/// delete_review
///
/// [Admin Route] Removes a review and refreshes the rating of the movie it belonged to.
#[utoipa::path(
    delete,
    path = "/admin/reviews/{id}",
    params(("id" = i64, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    let review = state
        .repo
        .get_review(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;
    if state.repo.delete_review(id).await? {
        state.repo.recount_rating(review.movie_id).await?;
        tracing::info!("deleted review {} of movie {}", id, review.movie_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- Users ---

/// list_users
///
/// [Admin Route] All accounts, ten per page, sortable by `sort=property[,asc|desc]`.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "One page of users", body = Page<UserSummary>),
        (status = 404, description = "Page past the end", body = ErrorBody)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Json<Page<UserSummary>>> {
    let request = PageRequest::new(query.page, ADMIN_PAGE_SIZE);
    let sort = UserSort::parse(query.sort.as_deref());
    let (users, total) = state.repo.list_users(request, sort).await?;
    let page = ensure_page_exists(Page::new(users, request, total))?;
    Ok(Json(page.map(UserSummary::from)))
}

/// create_user
///
/// [Admin Route] Creates an account, optionally with admin rights.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = UserRequest,
    responses(
        (status = 201, description = "Created", body = UserSummary),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Login already taken", body = ErrorBody)
    )
)]
pub async fn create_user(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserRequest>,
) -> ApiResult<(StatusCode, Json<UserSummary>)> {
    super::validate_request(&payload, state.passwords.check_policy(&payload.password))?;
    let user = state
        .repo
        .create_user(NewUser {
            name: payload.name.trim().to_string(),
            login: payload.login.trim().to_string(),
            password_hash: state.passwords.encode(&payload.password)?,
            is_admin: payload.admin,
        })
        .await?;
    tracing::info!(
        "admin {} created user {} (admin: {})",
        principal.id,
        user.id,
        user.is_admin
    );
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// toggle_admin
///
/// [Admin Route] Grants or withdraws admin rights. Admins cannot change their own.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/admin",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Toggled", body = UserSummary),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Own account", body = ErrorBody)
    )
)]
pub async fn toggle_admin(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserSummary>> {
    if id == principal.id {
        return Err(ApiError::conflict("Can't change your own admin state"));
    }
    let mut user = state.repo.get_user(id).await?.ok_or_else(user_not_found)?;
    user.is_admin = !user.is_admin;
    let user = state
        .repo
        .update_user(&user)
        .await?
        .ok_or_else(user_not_found)?;
    tracing::info!(
        "admin {} set admin={} for user {}",
        principal.id,
        user.is_admin,
        user.id
    );
    Ok(Json(user.into()))
}

/// toggle_ban
///
/// [Admin Route] Bans or unbans a user. A banned user's live tokens are revoked the next
/// time they are presented.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/ban",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Toggled", body = UserSummary),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Own account", body = ErrorBody)
    )
)]
pub async fn toggle_ban(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<UserSummary>> {
    if id == principal.id {
        return Err(ApiError::conflict("Can't ban yourself"));
    }
    let mut user = state.repo.get_user(id).await?.ok_or_else(user_not_found)?;
    user.is_banned = !user.is_banned;
    let user = state
        .repo
        .update_user(&user)
        .await?
        .ok_or_else(user_not_found)?;
    tracing::info!(
        "admin {} set banned={} for user {}",
        principal.id,
        user.is_banned,
        user.id
    );
    Ok(Json(user.into()))
}

/// delete_user
///
/// [Admin Route] Deletes an account together with its reviews, then refreshes the
/// ratings of every movie those reviews belonged to.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = ErrorBody),
        (status = 409, description = "Own account", body = ErrorBody)
    )
)]
pub async fn delete_user(
    principal: Principal,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if id == principal.id {
        return Err(ApiError::conflict("Can't delete yourself"));
    }
    let reviewed = state.repo.movie_ids_reviewed_by(id).await?;
    if !state.repo.delete_user(id).await? {
        return Err(user_not_found());
    }
    for movie_id in reviewed {
        state.repo.recount_rating(movie_id).await?;
    }
    tracing::info!("admin {} deleted user {}", principal.id, id);
    Ok(StatusCode::NO_CONTENT)
}
