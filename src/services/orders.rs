use std::sync::Arc;

use serde_json::{Value, json};

use crate::gateway::{ApiResponse, Gateway};
use crate::models::order::Order;

#[derive(Clone)]
pub struct OrderService {
    gateway: Arc<Gateway>,
}

impl OrderService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Lists arrive as raw values; the order store decides entry by entry
    /// what survives decoding.
    pub async fn pending_orders(&self) -> ApiResponse<Vec<Value>> {
        self.gateway.get("/orders/pending").await
    }

    pub async fn assigned_orders(&self) -> ApiResponse<Vec<Value>> {
        self.gateway.get("/orders/assigned").await
    }

    pub async fn accept(&self, order_id: &str) -> ApiResponse<Order> {
        self.gateway
            .post_empty(&format!("/orders/{order_id}/accept"))
            .await
    }

    pub async fn mark_out_for_delivery(
        &self,
        order_id: &str,
        notes: Option<&str>,
    ) -> ApiResponse<Order> {
        self.gateway
            .put(
                &format!("/orders/{order_id}/out-for-delivery"),
                &json!({ "notes": notes.unwrap_or("") }),
            )
            .await
    }

    /// The otp field is part of the fixed request shape; absence serializes
    /// as an empty string, never as an omitted key.
    pub async fn mark_delivered(
        &self,
        order_id: &str,
        notes: Option<&str>,
        otp: Option<&str>,
    ) -> ApiResponse<Order> {
        self.gateway
            .put(
                &format!("/orders/{order_id}/delivered"),
                &json!({
                    "notes": notes.unwrap_or(""),
                    "otp": otp.unwrap_or(""),
                }),
            )
            .await
    }

    /// Routed to the resource-scoped orders base, unlike every other order
    /// operation: the detail view must work for orders this courier has not
    /// claimed yet.
    pub async fn order_details(&self, order_id: &str) -> ApiResponse<Order> {
        self.gateway
            .get_resource(&format!("/orders/{order_id}"))
            .await
    }
}
