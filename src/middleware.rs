use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    auth::{AuthError, Principal, Role, token_from_headers},
    error::ApiError,
};

// --- Request Pipeline Stages ---
//
// Protected routers stack these with `route_layer`: `authenticate` runs first and
// attaches the principal, `require_admin` then reads it. Handlers only ever see
// requests that made it through both.

/// authenticate
///
/// Resolves the request's token into a `Principal` and stores it in the request
/// extensions. Any failure ends the request here with the error envelope.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match resolve_principal(&state, request.headers()).await {
        Ok(principal) => principal,
        Err(err) => {
            tracing::warn!(
                "authentication rejected for {} {}: {}",
                request.method(),
                request.uri().path(),
                err
            );
            return Err(err.into());
        }
    };
    tracing::debug!("authenticated user {} ({})", principal.id, principal.login);
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Token → verified claims → principal. A banned user is detected from the claims
/// first and then from the stored record; either way the token is revoked so it
/// stays dead even if the ban is lifted before it expires. Roles are taken from the
/// stored record.
async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Result<Principal, AuthError> {
    let token = token_from_headers(headers)?;
    let claims = state.tokens.verify(token)?;

    if state.repo.is_token_revoked(claims.jti).await? {
        return Err(AuthError::Revoked);
    }

    let mut principal = Principal::from_claims(claims);
    if principal.banned {
        state
            .repo
            .revoke_token(principal.token_id, principal.expires_at)
            .await?;
        return Err(AuthError::Banned);
    }

    let user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or(AuthError::UnknownUser)?;
    if user.is_banned {
        tracing::info!("revoking token of user {} banned mid-session", user.id);
        state
            .repo
            .revoke_token(principal.token_id, principal.expires_at)
            .await?;
        return Err(AuthError::Banned);
    }

    // Admin rights follow the stored record, not the claims.
    let roles = Role::for_user(&user);
    if roles != principal.roles {
        tracing::info!("roles of user {} changed since the token was issued", user.id);
        principal.roles = roles;
    }

    Ok(principal)
}

/// require_admin
///
/// Role gate for the admin router. Must sit inside `authenticate`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let Some(principal) = request.extensions().get::<Principal>() else {
        return Err(AuthError::MissingToken.into());
    };
    if !principal.is_admin() {
        tracing::warn!(
            "user {} denied access to {}",
            principal.id,
            request.uri().path()
        );
        return Err(AuthError::Forbidden.into());
    }
    Ok(next.run(request).await)
}
