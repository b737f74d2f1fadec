//! Cart endpoints. Every route acts on the cart of the buyer named in the
//! `x-buyer-id` header.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{AddLine, CartView, ClearCart, RemoveLine, UpdateLine};
use event_store::EventStore;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::Buyer;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub sku: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: u32,
}

/// GET /cart: the buyer's cart priced at current catalog prices.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts().view(buyer_id).await?))
}

/// POST /cart/items: add units of a SKU, merging with an existing line.
#[tracing::instrument(skip(state, req), fields(sku = %req.sku, quantity = req.quantity))]
pub async fn add_line<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Json(req): Json<AddLineRequest>,
) -> Result<Json<CartView>, ApiError> {
    state
        .carts()
        .add_line(AddLine::new(buyer_id, req.sku, req.quantity))
        .await?;
    Ok(Json(state.carts().view(buyer_id).await?))
}

/// PUT /cart/items/{sku}: set the quantity of an existing line.
#[tracing::instrument(skip(state, req))]
pub async fn update_line<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(sku): Path<String>,
    Json(req): Json<UpdateLineRequest>,
) -> Result<Json<CartView>, ApiError> {
    state
        .carts()
        .update_line(UpdateLine::new(buyer_id, sku, req.quantity))
        .await?;
    Ok(Json(state.carts().view(buyer_id).await?))
}

/// DELETE /cart/items/{sku}
#[tracing::instrument(skip(state))]
pub async fn remove_line<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(sku): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    state
        .carts()
        .remove_line(RemoveLine::new(buyer_id, sku))
        .await?;
    Ok(Json(state.carts().view(buyer_id).await?))
}

/// DELETE /cart: drop every line.
#[tracing::instrument(skip(state))]
pub async fn clear<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
) -> Result<Json<CartView>, ApiError> {
    state.carts().clear(ClearCart::new(buyer_id)).await?;
    Ok(Json(CartView::empty(buyer_id)))
}
