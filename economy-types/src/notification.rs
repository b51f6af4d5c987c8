// SPDX-License-Identifier: Apache-2.0, MIT
use serde::{Deserialize, Serialize};

/// Structured notification emitted by the tick loop. Delivery is external
/// (out of core scope); this is the payload shape the sink receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub role: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: NotificationPriority,
    pub message: String,
    pub payload: serde_json::Value,
    pub dedup_key: String,
    pub dedup_window_seconds: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
    Critical,
}
