//! Request extractors that reject through `AppError`.
//!
//! axum's own `Json`, `Path` and `Query` answer bad input with plain-text
//! bodies (and 422 for JSON that parses but does not fit the type). These
//! wrappers keep every rejection inside the response envelope.

use axum::{
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};

use crate::{error::AppError, validation::FieldError};

pub struct ApiJson<T>(pub T);

pub struct ApiPath<T>(pub T);

pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // well-formed JSON with a missing or mistyped field
            JsonRejection::JsonDataError(err) => {
                let message = err.body_text();
                AppError::Validation(vec![FieldError {
                    field: offending_field(&message).unwrap_or("body").to_string(),
                    message,
                }])
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Field named by serde in "missing field `x`" or "x: invalid type ..." messages.
fn offending_field(message: &str) -> Option<&str> {
    if let Some(start) = message.find("missing field `") {
        let rest = &message[start + "missing field `".len()..];
        return rest.split('`').next().filter(|f| !f.is_empty());
    }
    let (_, detail) = message.split_once("target type: ")?;
    let (path, _) = detail.split_once(": ")?;
    let field = path.rsplit('.').next()?;
    let is_ident = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_ident.then_some(field)
}

