//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CommitError, UnavailableLine};
use domain::{CartError, DomainError, OrderError};
use inventory::LedgerError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Cart or order operation error.
    Domain(DomainError),
    /// Checkout error.
    Commit(CommitError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    unavailable: Option<Vec<UnavailableLine>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, unavailable) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Commit(err) => commit_error_to_response(err),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %message, "internal server error");
        }

        let body = ErrorBody {
            error: message,
            unavailable,
        };
        (status, axum::Json(body)).into_response()
    }
}

type Mapped = (StatusCode, String, Option<Vec<UnavailableLine>>);

fn domain_error_to_response(err: DomainError) -> Mapped {
    let message = err.to_string();
    match err {
        DomainError::Cart(CartError::InsufficientStock {
            sku,
            available,
            requested,
        }) => (
            StatusCode::CONFLICT,
            message,
            Some(vec![UnavailableLine {
                sku,
                name: None,
                available,
                requested,
            }]),
        ),
        DomainError::Cart(cart_err) => {
            let status = match cart_err {
                CartError::InvalidQuantity { .. }
                | CartError::QuantityOverflow { .. }
                | CartError::AmountOverflow
                | CartError::EmptyCart => StatusCode::BAD_REQUEST,
                CartError::LineNotFound { .. } | CartError::UnknownProduct { .. } => {
                    StatusCode::NOT_FOUND
                }
                CartError::InsufficientStock { .. } | CartError::ChangedDuringCheckout => {
                    StatusCode::CONFLICT
                }
            };
            (status, message, None)
        }
        DomainError::Order(order_err) => {
            let status = match order_err {
                OrderError::InvalidTransition { .. } | OrderError::AlreadyPlaced => {
                    StatusCode::CONFLICT
                }
                OrderError::InvalidQuantity { .. }
                | OrderError::InvalidPrice { .. }
                | OrderError::AmountOverflow
                | OrderError::NoLines => StatusCode::BAD_REQUEST,
            };
            (status, message, None)
        }
        DomainError::OrderNotFound(_) => (StatusCode::NOT_FOUND, message, None),
        // A buyer id that names some other stream.
        DomainError::StreamTypeMismatch { .. } => (StatusCode::BAD_REQUEST, message, None),
        DomainError::EventStore(ref e) if e.is_conflict() => (StatusCode::CONFLICT, message, None),
        DomainError::Ledger(LedgerError::InvalidQuantity { .. }) => {
            (StatusCode::BAD_REQUEST, message, None)
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, message, None),
    }
}

fn commit_error_to_response(err: CommitError) -> Mapped {
    let message = err.to_string();
    match err {
        CommitError::EmptyCart => (StatusCode::BAD_REQUEST, message, None),
        CommitError::Unavailable { lines } => (StatusCode::CONFLICT, message, Some(lines)),
        CommitError::CartChanged => (StatusCode::CONFLICT, message, None),
        CommitError::Domain(inner) => domain_error_to_response(inner),
        CommitError::Integrity(_) | CommitError::CompensationFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, message, None)
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CommitError> for ApiError {
    fn from(err: CommitError) -> Self {
        ApiError::Commit(err)
    }
}
