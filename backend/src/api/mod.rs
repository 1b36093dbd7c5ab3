//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod admin;
mod auth;
mod content;

pub use admin::*;
pub use auth::*;
pub use content::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::PageType;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Page type from a path segment. Unknown pages are not found.
fn page_type(segment: &str) -> Result<PageType, AppError> {
    PageType::from_str(segment)
        .ok_or_else(|| AppError::NotFound(format!("Unknown page type {}", segment)))
}
