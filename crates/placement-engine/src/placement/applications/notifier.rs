use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outbound e-mail hook. Callers never let a delivery failure abort their own operation.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Templated message addressed to one or more students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub template: String,
    pub subject: String,
    pub recipients: Vec<String>,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(template: &str, subject: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            template: template.to_string(),
            subject: subject.into(),
            recipients,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
