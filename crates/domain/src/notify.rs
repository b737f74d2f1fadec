//! Outbound port for order state changes.
//!
//! The core reports what happened to an injected notifier; whatever fans it
//! out (email, webhooks, a message bus) lives outside.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::order::OrderState;

/// An order moved from one state to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderNotification {
    pub order_id: OrderId,
    pub buyer_id: BuyerId,
    pub from: OrderState,
    pub to: OrderState,
    pub at: DateTime<Utc>,
}

impl OrderNotification {
    pub fn new(order_id: OrderId, buyer_id: BuyerId, from: OrderState, to: OrderState) -> Self {
        Self {
            order_id,
            buyer_id,
            from,
            to,
            at: Utc::now(),
        }
    }
}

/// Receives order notifications after the change is durable.
///
/// Infallible from the core's point of view: delivery problems are the
/// notifier's to handle and never undo a committed change.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, notification: OrderNotification);
}

/// Logs every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl OrderNotifier for TracingNotifier {
    async fn notify(&self, notification: OrderNotification) {
        tracing::info!(
            order_id = %notification.order_id,
            buyer_id = %notification.buyer_id,
            from = %notification.from,
            to = %notification.to,
            "order state changed"
        );
    }
}

/// Records notifications in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    received: Arc<Mutex<Vec<OrderNotification>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub async fn notifications(&self) -> Vec<OrderNotification> {
        self.received.lock().await.clone()
    }

    pub async fn for_order(&self, order_id: OrderId) -> Vec<OrderNotification> {
        self.received
            .lock()
            .await
            .iter()
            .filter(|n| n.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderNotifier for InMemoryNotifier {
    async fn notify(&self, notification: OrderNotification) {
        self.received.lock().await.push(notification);
    }
}
