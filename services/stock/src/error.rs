use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Stock service error variants.
///
/// The first four are terminal business outcomes of a consumption. Storage
/// failures are the only retryable class: the consumption protocol is
/// all-or-nothing, so a failed attempt left nothing behind.
#[derive(Debug, thiserror::Error)]
pub enum StockServiceError {
    #[error("key is invalid")]
    KeyInvalid,
    #[error("key has expired")]
    KeyExpired,
    #[error("key has already been used")]
    KeyAlreadyUsed,
    #[error("product is out of stock")]
    OutOfStock,
    #[error("product not found")]
    ProductNotFound,
    #[error("key not found")]
    KeyNotFound,
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("service temporarily unavailable, try again")]
    StorageTransactionFailed(#[from] anyhow::Error),
}

impl StockServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyInvalid => "KEY_INVALID",
            Self::KeyExpired => "KEY_EXPIRED",
            Self::KeyAlreadyUsed => "KEY_ALREADY_USED",
            Self::OutOfStock => "OUT_OF_STOCK",
            Self::ProductNotFound => "PRODUCT_NOT_FOUND",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::StorageTransactionFailed(_) => "STORAGE_TRANSACTION_FAILED",
        }
    }

    /// Whether a caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageTransactionFailed(_))
    }
}

impl IntoResponse for StockServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::KeyInvalid | Self::KeyExpired => StatusCode::UNAUTHORIZED,
            Self::KeyAlreadyUsed | Self::OutOfStock => StatusCode::CONFLICT,
            Self::ProductNotFound | Self::KeyNotFound => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::StorageTransactionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        // The chain stays in the logs; callers only see the generic message.
        if let Self::StorageTransactionFailed(ref e) = self {
            tracing::error!(error = ?e, kind = self.kind(), "storage transaction failed");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
