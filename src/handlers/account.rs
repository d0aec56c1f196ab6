use axum::{Json, extract::State};

use super::user_not_found;
use crate::{
    AppState,
    auth::{AuthError, Principal},
    dto::v1::{AccountQuery, AccountUpdateRequest, TokenResponse, UserSummary},
    error::{ApiError, ApiResult, ErrorBody},
    extract::{ApiJson, ApiQuery},
};

/// get_account
///
/// [Authenticated Route] The caller's own account. An explicit `id` is accepted only
/// when it names the caller.
#[utoipa::path(
    get,
    path = "/account",
    params(AccountQuery),
    responses(
        (status = 200, description = "Own account", body = UserSummary),
        (status = 400, description = "Invalid id", body = ErrorBody),
        (status = 403, description = "Someone else's account", body = ErrorBody)
    )
)]
pub async fn get_account(
    principal: Principal,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AccountQuery>,
) -> ApiResult<Json<UserSummary>> {
    if let Some(id) = query.id {
        if id < 1 {
            let query = format!("id={id}");
            return Err(ApiError::bad_request("Invalid url param").with_query(Some(query.as_str())));
        }
        if id != principal.id {
            tracing::warn!("user {} asked for account {}", principal.id, id);
            return Err(AuthError::Forbidden.into());
        }
    }
    let user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user.into()))
}

/// update_account
///
/// [Authenticated Route] Changes the caller's name, login and optionally password.
/// The claims of the presented token are stale afterwards, so it is revoked and a
/// fresh token is returned in its place.
#[utoipa::path(
    put,
    path = "/account",
    request_body = AccountUpdateRequest,
    responses(
        (status = 200, description = "Updated, new token issued", body = TokenResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Login already taken", body = ErrorBody)
    )
)]
pub async fn update_account(
    principal: Principal,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AccountUpdateRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let change_password = !payload.password.is_empty();
    let password_check = if change_password {
        state.passwords.check_policy(&payload.password)
    } else {
        Ok(())
    };
    super::validate_request(&payload, password_check)?;

    let mut user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or_else(user_not_found)?;

    let login = payload.login.trim().to_string();
    if let Some(other) = state.repo.find_user_by_login(&login).await? {
        if other.id != user.id {
            return Err(ApiError::conflict("User with such login already exists"));
        }
    }

    user.name = payload.name.trim().to_string();
    user.login = login;
    if change_password {
        user.password_hash = state.passwords.encode(&payload.password)?;
    }
    let user = state
        .repo
        .update_user(&user)
        .await?
        .ok_or_else(user_not_found)?;

    state
        .repo
        .revoke_token(principal.token_id, principal.expires_at)
        .await?;
    let issued = state.tokens.issue(&user)?;
    tracing::info!("user {} updated their account", user.id);
    Ok(Json(issued.into()))
}
