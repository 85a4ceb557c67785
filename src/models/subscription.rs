//! Subscription edge model.

use serde::{Deserialize, Serialize};

/// Directed edge: `subscriber_id` follows `channel_id`. This service only
/// reads these records for aggregation; creation and deletion belong to
/// the subscription service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// User doing the subscribing
    pub subscriber_id: String,
    /// User being subscribed to
    pub channel_id: String,
    pub created_at: String,
}
