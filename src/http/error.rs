use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::CommerceError;

impl CommerceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::InsufficientStock { .. } | Self::SignatureMismatch => StatusCode::BAD_REQUEST,
            Self::ProductNotFound | Self::CartNotFound | Self::LineItemNotFound | Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::StockUpdate(_) | Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        json_error(status, self.to_string())
    }
}

impl From<JsonRejection> for CommerceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "success": false, "message": message.into() }))).into_response()
}
