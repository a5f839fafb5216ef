use std::sync::Arc;

use serde_json::json;

use crate::gateway::{ApiResponse, Gateway};
use crate::models::courier::{Availability, Courier, CourierProfile, LocationRequest};
use crate::models::stats::DeliveryStats;

#[derive(Clone)]
pub struct ProfileService {
    gateway: Arc<Gateway>,
}

impl ProfileService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn profile(&self) -> ApiResponse<CourierProfile> {
        self.gateway.get("/me").await
    }

    pub async fn update_availability(&self, availability: Availability) -> ApiResponse<Courier> {
        self.gateway
            .put("/availability", &json!({ "availability": availability }))
            .await
    }

    /// Rejects out-of-range coordinates before anything touches the network;
    /// a bad fix must never reach the backend.
    pub async fn update_location(&self, latitude: f64, longitude: f64) -> ApiResponse<Courier> {
        if !(-90.0..=90.0).contains(&latitude) {
            return ApiResponse::failure("Invalid latitude. Must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return ApiResponse::failure("Invalid longitude. Must be between -180 and 180");
        }

        let body = LocationRequest {
            latitude,
            longitude,
        };
        self.gateway.put("/location", &body).await
    }

    pub async fn stats(&self) -> ApiResponse<DeliveryStats> {
        self.gateway.get("/stats").await
    }
}
