//! Checkout and order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ContactId, Money, OrderId};
use domain::{CancelOrder, Order, OrderState, TransitionOrder};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::{Buyer, parse_uuid};
use crate::state::AppState;

const DEFAULT_CANCEL_REASON: &str = "canceled by buyer";

// -- Request types --

#[derive(Deserialize, Default)]
pub struct CommitRequest {
    pub contact_id: Option<String>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub to: OrderState,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: String,
    pub contact_id: Option<String>,
    pub state: OrderState,
    pub lines: Vec<OrderLineResponse>,
    pub total_quantity: u64,
    pub total_amount: Money,
    pub placed_at: Option<String>,
    pub cancellation: Option<CancellationResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub amount: Money,
}

#[derive(Serialize)]
pub struct CancellationResponse {
    pub from: OrderState,
    pub reason: String,
    pub canceled_by: Option<String>,
    pub canceled_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.order_id().map(|id| id.to_string()).unwrap_or_default(),
            buyer_id: order.buyer_id().map(|id| id.to_string()).unwrap_or_default(),
            contact_id: order.contact_id().map(|id| id.to_string()),
            state: order.state(),
            lines: order
                .lines()
                .iter()
                .map(|line| OrderLineResponse {
                    sku: line.sku.to_string(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    amount: line.amount(),
                })
                .collect(),
            total_quantity: order.total_quantity(),
            total_amount: order.total_amount(),
            placed_at: order.placed_at().map(|at| at.to_rfc3339()),
            cancellation: order.cancellation().map(|c| CancellationResponse {
                from: c.from,
                reason: c.reason.clone(),
                canceled_by: c.canceled_by.clone(),
                canceled_at: c.canceled_at.to_rfc3339(),
            }),
        }
    }
}

// -- Handlers --

/// POST /orders: commit the buyer's cart to a new order.
#[tracing::instrument(skip(state, req))]
pub async fn commit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    req: Option<Json<CommitRequest>>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Json(req) = req.unwrap_or_default();
    let contact_id = req
        .contact_id
        .as_deref()
        .map(|id| parse_uuid("contact_id", id).map(ContactId::from_uuid))
        .transpose()?;

    let order = state.coordinator.commit(buyer_id, contact_id).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /orders: the buyer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders().list_orders(buyer_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id}: one of the buyer's orders.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.orders().get_order_for(buyer_id, order_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/transition: move an order along fulfillment.
///
/// Operator-facing; not scoped to a buyer.
#[tracing::instrument(skip(state, req), fields(to = ?req.to))]
pub async fn transition<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state
        .orders()
        .transition(TransitionOrder::new(order_id, req.to))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/{id}/cancel: cancel one of the buyer's orders and put its
/// stock back.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Buyer(buyer_id): Buyer,
    Path(id): Path<String>,
    req: Option<Json<CancelRequest>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    // Ownership check; other buyers' orders look missing.
    state.orders().get_order_for(buyer_id, order_id).await?;

    let Json(req) = req.unwrap_or_default();
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());

    let order = state
        .orders()
        .cancel(CancelOrder::new(order_id, reason).by(buyer_id.to_string()))
        .await?;
    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    Ok(OrderId::from_uuid(parse_uuid("order id", id)?))
}
