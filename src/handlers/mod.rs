pub mod activities;
pub mod api;
pub mod inventory;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde_json::json;

use crate::{
    error::InventoryError,
    services::InventoryService,
    store::DocumentStore,
};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InventoryService>,
    pub store: Arc<dyn DocumentStore>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(service: InventoryService, store: Arc<dyn DocumentStore>, jwt_secret: &str) -> Self {
        Self {
            service: Arc::new(service),
            store,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}

/// Error body returned by every action endpoint: `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Inventory(InventoryError),
    BadRequest(String),
}

impl From<InventoryError> for ApiError {
    fn from(e: InventoryError) -> Self {
        ApiError::Inventory(e)
    }
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Inventory(InventoryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Inventory(InventoryError::InvalidPrecondition(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Inventory(InventoryError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Inventory(InventoryError::Upstream(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Inventory(InventoryError::Upstream(e)) => {
                error!("document store failure: {}", e);
                "The inventory database is unavailable, please try again".to_string()
            }
            ApiError::Inventory(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn error_classes_map_to_distinct_statuses() {
        let not_found: ApiError = InventoryError::NotFound("item LAB-0001".into()).into();
        let precondition: ApiError = InventoryError::precondition("not requested").into();
        let conflict: ApiError = InventoryError::Conflict("item LAB-0001".into()).into();
        let upstream: ApiError = InventoryError::Upstream(StoreError::Missing("x".into())).into();

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(precondition.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
    }
}
