//! Custom Axum extractors
//!
//! Rejections are turned into `ApiError` so malformed ids and bodies get
//! the same JSON error shape as everything else.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Extract and validate a numeric record id from the path
pub struct EntityId(pub i64);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest {
                message: "Invalid id".into(),
                details: e.body_text(),
            })?;

        let id = raw.parse::<i64>().map_err(|_| ApiError::BadRequest {
            message: "Invalid id".into(),
            details: format!("'{}' is not a valid id", raw),
        })?;

        Ok(Self(id))
    }
}

/// JSON body extractor that rejects with `ApiError`
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest {
                message: "Invalid request body".into(),
                details: rejection.body_text(),
            })?;

        Ok(Self(value))
    }
}
