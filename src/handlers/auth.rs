use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    auth::{Principal, basic_credentials, verify_credentials},
    dto::v1::{LoginRequest, RegisterRequest, TokenResponse, UserSummary},
    error::{ApiResult, ErrorBody},
    extract::{ApiJson, LoginForm},
    models::NewUser,
};

/// register
///
/// [Public Route] Creates a regular account. New users are never admins and never banned.
#[utoipa::path(
    post,
    path = "/registration",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserSummary),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Login already taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserSummary>)> {
    super::validate_request(&payload, state.passwords.check_policy(&payload.password))?;

    let user = state
        .repo
        .create_user(NewUser {
            name: payload.name.trim().to_string(),
            login: payload.login.trim().to_string(),
            password_hash: state.passwords.encode(&payload.password)?,
            is_admin: false,
        })
        .await?;

    tracing::info!("registered user {} ({})", user.id, user.login);
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login_basic
///
/// [Public Route] Exchanges `Authorization: Basic` credentials for a token.
#[utoipa::path(
    get,
    path = "/loginPage",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Wrong password or username", body = ErrorBody),
        (status = 403, description = "User is banned", body = ErrorBody)
    )
)]
pub async fn login_basic(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<TokenResponse>> {
    let (login, password) = basic_credentials(&headers)?;
    issue_for_credentials(&state, &login, &password).await
}

/// login_form
///
/// [Public Route] Same as `login_basic`, with the credentials in a JSON or form body.
#[utoipa::path(
    post,
    path = "/loginPage",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Wrong password or username", body = ErrorBody),
        (status = 403, description = "User is banned", body = ErrorBody)
    )
)]
pub async fn login_form(
    State(state): State<AppState>,
    LoginForm(credentials): LoginForm,
) -> ApiResult<Json<TokenResponse>> {
    issue_for_credentials(&state, &credentials.login, &credentials.password).await
}

async fn issue_for_credentials(
    state: &AppState,
    login: &str,
    password: &str,
) -> ApiResult<Json<TokenResponse>> {
    let user = match verify_credentials(state.repo.as_ref(), &state.passwords, login, password)
        .await
    {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!("login failed for {}: {}", login.trim(), err);
            return Err(err.into());
        }
    };
    let issued = state.tokens.issue(&user)?;
    tracing::debug!("issued token {} to user {}", issued.claims.jti, user.id);
    Ok(Json(issued.into()))
}

/// logout
///
/// [Authenticated Route] Revokes the token the request was made with.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn logout(
    principal: Principal,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    state
        .repo
        .revoke_token(principal.token_id, principal.expires_at)
        .await?;
    tracing::debug!("user {} logged out", principal.id);
    Ok(StatusCode::NO_CONTENT)
}
