//! Product availability lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{Money, Sku};
use event_store::EventStore;
use inventory::{Catalog, CatalogError, StockLedger};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProductResponse {
    pub sku: Sku,
    pub name: String,
    pub unit_price: Money,

    /// Advisory; a checkout may still find less.
    pub available: u32,
}

/// GET /products/{sku}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let sku = Sku::new(sku);
    let entry = state.catalog.lookup(&sku).await.map_err(|e| match e {
        CatalogError::UnknownSku(sku) => ApiError::NotFound(format!("Product {sku} not found")),
        other => ApiError::Domain(other.into()),
    })?;
    let available = state
        .ledger
        .peek(&sku)
        .await
        .map_err(|e| ApiError::Domain(e.into()))?;

    Ok(Json(ProductResponse {
        sku,
        name: entry.name,
        unit_price: entry.unit_price,
        available,
    }))
}
