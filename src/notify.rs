//! Notification sink
//!
//! User-facing diagnostics. Query failures surface here with a
//! human-readable message; everything else in the crate logs and degrades
//! to a no-op.

use crate::error::GridError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Error,
    Info,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub category: NotificationCategory,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(category: NotificationCategory, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationCategory::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationCategory::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationCategory::Success, message)
    }
}

/// Where user-facing notifications go
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default sink: forwards notifications to the tracing subscriber.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.category {
            NotificationCategory::Error => error!(id = %notification.id, "{}", notification.message),
            _ => info!(id = %notification.id, "{}", notification.message),
        }
    }
}

/// Extract the most useful message for a user: the database error detail if
/// there is one, then its message, then the plain display of the error.
pub fn human_message(error: &GridError) -> String {
    match error {
        GridError::Database(e) => match e.as_db_error() {
            Some(db) => db.detail().unwrap_or(db.message()).to_string(),
            None => e.to_string(),
        },
        GridError::QueryExecution(message) => message.clone(),
        other => other.to_string(),
    }
}
