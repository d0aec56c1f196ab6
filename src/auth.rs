use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::{AppConfig, MAX_TOKEN_TTL_HOURS, SigningKeys},
    error::ApiError,
    models::User,
    password::PasswordManager,
    repository::{Repository, RepositoryError},
};

/// Custom token header accepted alongside `Authorization: Bearer`.
pub const REST_TOKEN_HEADER: &str = "sh-rest-token";

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No authorization token found in request")]
    MissingToken,
    #[error("Token either missing or invalid")]
    MalformedHeader,
    #[error("Login and password are required")]
    MissingCredentials,
    #[error("Token corrupted")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("Token revoked")]
    Revoked,
    #[error("User is banned")]
    Banned,
    #[error("User no longer exists")]
    UnknownUser,
    #[error("Access denied")]
    Forbidden,
    /// Login not found. Kept apart from `PasswordMismatch` for logging; the HTTP layer
    /// answers both the same way.
    #[error("user not found")]
    UserNotFound,
    #[error("password mismatch")]
    PasswordMismatch,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Role
///
/// Authority granted to a principal. Serialized with the `ROLE_` prefix inside tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn for_user(user: &User) -> Vec<Role> {
        if user.is_admin {
            vec![Role::Admin]
        } else {
            vec![Role::User]
        }
    }
}

/// Claims
///
/// Payload signed into every issued token. The signature covers the whole set, so the
/// principal can be rebuilt from it without trusting anything else the client sends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject: the user's login.
    pub sub: String,
    /// The user's numeric id.
    pub uid: i64,
    pub name: String,
    pub banned: bool,
    pub roles: Vec<Role>,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiration, seconds since the epoch. Checked with zero leeway.
    pub exp: i64,
    /// Token id, the handle used for server-side revocation.
    pub jti: Uuid,
}

/// Principal
///
/// The authenticated identity attached to a request by the `authenticate` middleware.
/// It lives in the request extensions for the rest of the request; handlers receive it
/// through the extractor below.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub login: String,
    pub name: String,
    pub roles: Vec<Role>,
    pub banned: bool,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn from_claims(claims: Claims) -> Self {
        Self {
            id: claims.uid,
            login: claims.sub,
            name: claims.name,
            roles: claims.roles,
            banned: claims.banned,
            token_id: claims.jti,
            expires_at: timestamp(claims.exp),
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the route sits behind the authenticate stage.
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

/// IssuedToken
///
/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.claims.exp)
    }
}

/// TokenService
///
/// Signs and verifies HS512 tokens against the configured key ring. New tokens are
/// signed with the active key and carry its `kid`; verification accepts the active key
/// and every previous key, and rejects tokens whose `kid` is missing or unknown.
#[derive(Clone)]
pub struct TokenService {
    keys: SigningKeys,
    ttl: Duration,
}

impl TokenService {
    pub fn new(keys: SigningKeys, ttl: Duration) -> Self {
        Self { keys, ttl }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.signing_keys.clone(),
            Duration::hours(config.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS)),
        )
    }

    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.issue_at(user, Utc::now())
    }

    /// Issues a token as if the current time were `issued_at`.
    pub fn issue_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let claims = Claims {
            sub: user.login.clone(),
            uid: user.id,
            name: user.name.clone(),
            banned: user.is_banned,
            roles: Role::for_user(user),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        self.sign(&claims).map(|token| IssuedToken { token, claims })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.keys.active.kid.clone());
        let key = EncodingKey::from_secret(self.keys.active.secret.as_bytes());
        encode(&header, claims, &key).map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks signature and expiration. Any failure rejects the token; there is no
    /// partially trusted outcome.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;
        let secret = std::iter::once(&self.keys.active)
            .chain(self.keys.previous.iter())
            .find(|key| key.kid == kid)
            .map(|key| key.secret.as_bytes())
            .ok_or(AuthError::InvalidToken)?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        match decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::InvalidToken),
            },
        }
    }
}

/// token_from_headers
///
/// Extracts the raw token from `Authorization: Bearer <token>` or, failing that, from
/// the `SH-Rest-Token` header.
pub fn token_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim()),
            _ => Err(AuthError::MalformedHeader),
        };
    }
    match headers.get(REST_TOKEN_HEADER) {
        Some(value) => {
            let token = value.to_str().map_err(|_| AuthError::MalformedHeader)?.trim();
            if token.is_empty() {
                Err(AuthError::MalformedHeader)
            } else {
                Ok(token)
            }
        }
        None => Err(AuthError::MissingToken),
    }
}

/// basic_credentials
///
/// Decodes `Authorization: Basic base64(login:password)`. The password may itself
/// contain colons; only the first one separates the two parts.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::MissingCredentials)?;
    let encoded = value
        .strip_prefix("Basic ")
        .ok_or(AuthError::MissingCredentials)?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(AuthError::MissingCredentials)?;
    let (login, password) = decoded
        .split_once(':')
        .ok_or(AuthError::MissingCredentials)?;
    Ok((login.to_string(), password.to_string()))
}

/// verify_credentials
///
/// Looks the login up and checks the password against the stored salted hash.
/// Banned users are refused here too, so they can never obtain a fresh token.
pub async fn verify_credentials(
    repo: &dyn Repository,
    passwords: &PasswordManager,
    login: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = repo
        .find_user_by_login(login.trim())
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if !passwords.matches(password, &user.password_hash) {
        return Err(AuthError::PasswordMismatch);
    }
    if user.is_banned {
        return Err(AuthError::Banned);
    }
    Ok(user)
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
