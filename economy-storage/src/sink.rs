// SPDX-License-Identifier: Apache-2.0, MIT
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use economy_types::Notification;
use parking_lot::Mutex;

/// Out-of-core delivery boundary (spec.md §6): the tick loop only needs to
/// hand a [`Notification`] to something that de-duplicates within
/// `dedup_window_seconds` and never blocks state writes on failure.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: Notification);
}

/// In-process de-duplication wrapper around any [`NotificationSink`].
/// Equivalent in effect to keying on `(dedup_key)` within `dedup_window`, as
/// the Go reference's `notifications.go` does at the database layer.
pub struct DedupingSink<S> {
    inner: S,
    last_sent: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl<S: NotificationSink> DedupingSink<S> {
    pub fn new(inner: S) -> Self {
        DedupingSink {
            inner,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    pub async fn send_at(&self, notification: Notification, now: DateTime<Utc>) {
        if notification.dedup_key.is_empty() {
            self.inner.send(notification).await;
            return;
        }

        let should_send = {
            let mut last_sent = self.last_sent.lock();
            let window = chrono::Duration::seconds(notification.dedup_window_seconds.max(0));
            match last_sent.get(&notification.dedup_key) {
                Some(last) if now - *last < window => false,
                _ => {
                    last_sent.insert(notification.dedup_key.clone(), now);
                    true
                }
            }
        };

        if should_send {
            self.inner.send(notification).await;
        }
    }
}

/// Logs notifications via `tracing` instead of delivering them anywhere;
/// useful as a default sink and in tests.
pub struct TracingNotificationSink;

#[async_trait::async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn send(&self, notification: Notification) {
        tracing::info!(
            role = %notification.role,
            category = %notification.category,
            kind = %notification.kind,
            message = %notification.message,
            "notification"
        );
    }
}
