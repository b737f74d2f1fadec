//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::BuyerId;

use crate::error::ApiError;

/// Header carrying the authenticated buyer's id. Authentication itself
/// happens upstream of this service.
pub const BUYER_HEADER: &str = "x-buyer-id";

/// The buyer a request acts for, taken from [`BUYER_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct Buyer(pub BuyerId);

impl<S: Send + Sync> FromRequestParts<S> for Buyer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(BUYER_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing {BUYER_HEADER} header")))?;
        let value = value
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("Invalid {BUYER_HEADER} header")))?;
        let uuid = uuid::Uuid::parse_str(value.trim())
            .map_err(|e| ApiError::BadRequest(format!("Invalid {BUYER_HEADER} header: {e}")))?;
        Ok(Buyer(BuyerId::from_uuid(uuid)))
    }
}

/// Parses an id taken from a request path or body.
pub fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(value).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
