use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::gateway::ApiResponse;
use crate::models::order::Order;
use crate::models::stats::DeliveryStats;
use crate::services::{OrderService, ProfileService};
use crate::store::or_fallback;

#[derive(Default)]
struct OrdersState {
    pending: Vec<Order>,
    assigned: Vec<Order>,
    selected: Option<Order>,
    stats: Option<DeliveryStats>,
    loading: bool,
    pending_error: Option<String>,
    assigned_error: Option<String>,
    action_error: Option<String>,
}

/// Owns the pending/assigned lists, the selection and the stats snapshot.
///
/// Lists only change after the server confirms a transition; there is no
/// speculative mutation anywhere in this store. Error slots are per action
/// family and never cascade into each other.
pub struct OrderStore {
    orders: OrderService,
    profiles: ProfileService,
    state: RwLock<OrdersState>,
}

impl OrderStore {
    pub fn new(orders: OrderService, profiles: ProfileService) -> Self {
        Self {
            orders,
            profiles,
            state: RwLock::new(OrdersState::default()),
        }
    }

    /// Replaces the pending list wholesale with the server's result.
    pub async fn fetch_pending(&self) {
        {
            let mut state = self.write();
            state.pending_error = None;
            state.loading = true;
        }

        let response = self.orders.pending_orders().await;

        let mut state = self.write();
        state.loading = false;
        match response {
            ApiResponse::Success {
                data: Some(raw), ..
            } => {
                let orders = decode_orders(raw, "pending");
                debug!(count = orders.len(), "pending orders replaced");
                state.pending = orders;
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                state.pending = Vec::new();
                state.pending_error =
                    Some(or_fallback(message, "Failed to fetch pending orders"));
            }
        }
    }

    /// Replaces the assigned list wholesale with the server's result.
    pub async fn fetch_assigned(&self) {
        {
            let mut state = self.write();
            state.assigned_error = None;
            state.loading = true;
        }

        let response = self.orders.assigned_orders().await;

        let mut state = self.write();
        state.loading = false;
        match response {
            ApiResponse::Success {
                data: Some(raw), ..
            } => {
                let orders = decode_orders(raw, "assigned");
                debug!(count = orders.len(), "assigned orders replaced");
                state.assigned = orders;
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                state.assigned = Vec::new();
                state.assigned_error =
                    Some(or_fallback(message, "Failed to fetch assigned orders"));
            }
        }
    }

    /// Claims a pending order. On success the order leaves `pending` and the
    /// server-returned copy, not the locally cached one, joins `assigned`.
    pub async fn accept_order(&self, order_id: &str) -> bool {
        self.begin_action();

        let response = self.orders.accept(order_id).await;

        let mut state = self.write();
        state.loading = false;
        match response {
            ApiResponse::Success {
                data: Some(order), ..
            } => {
                state.pending.retain(|o| o.id != order_id);
                // Keyed by id so a duplicate confirmation converges instead
                // of duplicating the entry.
                state.assigned.retain(|o| o.id != order.id);
                state.assigned.push(order);
                info!(order_id, "order accepted");
                true
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                state.action_error = Some(or_fallback(message, "Failed to accept order"));
                false
            }
        }
    }

    pub async fn mark_out_for_delivery(&self, order_id: &str, notes: Option<&str>) -> bool {
        self.begin_action();

        let response = self.orders.mark_out_for_delivery(order_id, notes).await;

        let mut state = self.write();
        state.loading = false;
        match response {
            ApiResponse::Success {
                data: Some(updated),
                ..
            } => {
                if let Some(slot) = state.assigned.iter_mut().find(|o| o.id == order_id) {
                    *slot = updated.clone();
                }
                // Selection and list entry must never diverge for one id.
                if state.selected.as_ref().is_some_and(|o| o.id == order_id) {
                    state.selected = Some(updated);
                }
                info!(order_id, "order out for delivery");
                true
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                state.action_error = Some(or_fallback(
                    message,
                    "Failed to mark order as out for delivery",
                ));
                false
            }
        }
    }

    pub async fn mark_delivered(
        &self,
        order_id: &str,
        notes: Option<&str>,
        otp: Option<&str>,
    ) -> bool {
        self.begin_action();

        let response = self.orders.mark_delivered(order_id, notes, otp).await;

        let delivered = {
            let mut state = self.write();
            state.loading = false;
            match response {
                ApiResponse::Success { data: Some(_), .. } => {
                    state.assigned.retain(|o| o.id != order_id);
                    if state.selected.as_ref().is_some_and(|o| o.id == order_id) {
                        state.selected = None;
                    }
                    info!(order_id, "order delivered");
                    true
                }
                ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                    state.action_error =
                        Some(or_fallback(message, "Failed to mark order as delivered"));
                    false
                }
            }
        };

        if delivered {
            // The delivered count feeds the aggregates; refreshing the
            // snapshot is part of this transition, not optional plumbing.
            self.fetch_stats().await;
        }

        delivered
    }

    /// Stats failures are logged only; the stale snapshot stays.
    pub async fn fetch_stats(&self) {
        match self.profiles.stats().await {
            ApiResponse::Success {
                data: Some(stats), ..
            } => {
                self.write().stats = Some(stats);
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                warn!(error = %message, "failed to fetch stats");
            }
        }
    }

    /// Pending, assigned and stats, concurrently. Each fetch owns its own
    /// error slot, so a partial failure never blocks the other two.
    pub async fn refresh_all(&self) {
        futures::future::join3(
            self.fetch_pending(),
            self.fetch_assigned(),
            self.fetch_stats(),
        )
        .await;
    }

    pub fn select_order(&self, order: Option<Order>) {
        self.write().selected = order;
    }

    pub fn pending(&self) -> Vec<Order> {
        self.read().pending.clone()
    }

    pub fn assigned(&self) -> Vec<Order> {
        self.read().assigned.clone()
    }

    pub fn selected(&self) -> Option<Order> {
        self.read().selected.clone()
    }

    pub fn stats(&self) -> Option<DeliveryStats> {
        self.read().stats.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn pending_error(&self) -> Option<String> {
        self.read().pending_error.clone()
    }

    pub fn assigned_error(&self) -> Option<String> {
        self.read().assigned_error.clone()
    }

    pub fn action_error(&self) -> Option<String> {
        self.read().action_error.clone()
    }

    pub fn clear_errors(&self) {
        let mut state = self.write();
        state.pending_error = None;
        state.assigned_error = None;
        state.action_error = None;
    }

    fn begin_action(&self) {
        let mut state = self.write();
        state.action_error = None;
        state.loading = true;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, OrdersState> {
        self.state.read().expect("orders lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, OrdersState> {
        self.state.write().expect("orders lock poisoned")
    }
}

/// Entry-by-entry decode of a server list. An entry that fails to decode or
/// arrives without an id is dropped with a log line, never surfaced; one bad
/// entry must not take the whole list down.
fn decode_orders(raw: Vec<Value>, list: &str) -> Vec<Order> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<Order>(value) {
            Ok(order) if !order.id.is_empty() => Some(order),
            Ok(_) => {
                warn!(list, "dropping order entry without an id");
                None
            }
            Err(err) => {
                warn!(list, error = %err, "dropping malformed order entry");
                None
            }
        })
        .collect()
}
