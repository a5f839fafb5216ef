use serde::{Deserialize, Serialize};

use crate::models::courier::{AccountStatus, Availability};

/// Read-only aggregate counters from `GET /stats`; refreshed after every
/// completed delivery.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    #[serde(default)]
    pub total_deliveries: u32,
    #[serde(default)]
    pub completed_deliveries: u32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub average_delivery_time: f64,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub status: AccountStatus,
}
