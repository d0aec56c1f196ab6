use axum::{
    Form, Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{FormRejection, JsonRejection},
    },
    http::{StatusCode, header, request::Parts},
};
use serde::de::DeserializeOwned;

use crate::{dto::v1::LoginRequest, error::ApiError};

// --- Extractor Wrappers ---
//
// Thin wrappers over axum's Json/Query/Path whose rejections render as the
// `ErrorBody` envelope instead of axum's plain-text defaults.

fn invalid_url_param(detail: String, query: Option<&str>) -> ApiError {
    tracing::warn!("rejected url parameter: {}", detail);
    ApiError::bad_request("Invalid url param")
        .with_detail(detail)
        .with_query(query)
}

fn unreadable_body(detail: String) -> ApiError {
    tracing::warn!("rejected request body: {}", detail);
    ApiError::bad_request("Failed to read data").with_detail(detail)
}

fn unsupported_media_type() -> ApiError {
    ApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type")
}

/// ApiJson
///
/// JSON body extractor. A missing or wrong content type is a 415, anything else that
/// stops the body from deserializing is a 400.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => Err(unsupported_media_type()),
            Err(rejection) => Err(unreadable_body(rejection.body_text())),
        }
    }
}

/// ApiQuery
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().map(str::to_string);
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| invalid_url_param(rejection.body_text(), query.as_deref()))
    }
}

/// ApiPath
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().map(str::to_string);
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| ApiPath(value))
            .map_err(|rejection| invalid_url_param(rejection.body_text(), query.as_deref()))
    }
}

/// LoginForm
///
/// Credentials posted to the login endpoint, either urlencoded or as JSON. The
/// content type decides which parser runs.
pub struct LoginForm(pub LoginRequest);

impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            match Form::<LoginRequest>::from_request(req, state).await {
                Ok(Form(credentials)) => Ok(LoginForm(credentials)),
                Err(FormRejection::InvalidFormContentType(_)) => Err(unsupported_media_type()),
                Err(rejection) => Err(unreadable_body(rejection.body_text())),
            }
        } else {
            ApiJson::<LoginRequest>::from_request(req, state)
                .await
                .map(|ApiJson(credentials)| LoginForm(credentials))
        }
    }
}
