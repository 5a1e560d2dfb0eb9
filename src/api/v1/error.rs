use crate::api::v1::handler::ApiResponse;
use crate::application_port::CoordError;
use serde::Serialize;
use std::convert::Infallible;
use tracing::warn;
use warp::http::StatusCode;
use warp::{reject, Rejection};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(fault) = err.find::<ApiFault>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            fault.code,
            fault.message.clone(),
        ));
        Ok(warp::reply::with_status(json, StatusCode::OK))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {:?}", err),
            }),
        });
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum ApiErrorCode {
    NotFound,
    Conflict,
    Forbidden,
    InvalidState,
    BadCursor,
    InternalError,
}

/// Rejection payload: a stable code plus the human-readable detail from
/// the service layer.
#[derive(Debug, Clone)]
pub struct ApiFault {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiFault {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn reject(code: ApiErrorCode, message: impl Into<String>) -> Rejection {
        reject::custom(Self::new(code, message))
    }
}

impl reject::Reject for ApiFault {}

impl From<CoordError> for ApiFault {
    fn from(error: CoordError) -> Self {
        let code = match &error {
            CoordError::NotFound => ApiErrorCode::NotFound,
            CoordError::Conflict(_) => ApiErrorCode::Conflict,
            CoordError::Forbidden(_) => ApiErrorCode::Forbidden,
            CoordError::InvalidState(_) => ApiErrorCode::InvalidState,
            CoordError::BadCursor => ApiErrorCode::BadCursor,
            CoordError::Store(e) => {
                warn!("store error surfaced to api: {e}");
                return ApiFault::new(ApiErrorCode::InternalError, "internal error");
            }
        };
        ApiFault::new(code, error.to_string())
    }
}
