use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::PersonField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Contains,
}

/// Application filter on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub field: PersonField,
    pub operator: FilterOperator,
    pub value: String,
}

impl FieldFilter {
    pub fn contains(field: PersonField, value: impl Into<String>) -> Self {
        Self {
            field,
            operator: FilterOperator::Contains,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorter {
    pub field: PersonField,
    pub descending: bool,
}

/// Update group a change is submitted under. `Auto` changes are sent
/// immediately; `Named` changes wait for an explicit batch submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum UpdateGroup {
    Auto,
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSeverity {
    Information,
    Warning,
    Error,
}

/// Message pushed by the data service outside the request/response cycle of
/// a controller operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMessage {
    pub id: Uuid,
    pub severity: MessageSeverity,
    pub technical: bool,
    pub message: String,
    pub target: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceMessage {
    pub fn technical(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity: MessageSeverity::Error,
            technical: true,
            message: message.into(),
            target: None,
            created_at: Utc::now(),
        }
    }

    pub fn business(severity: MessageSeverity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            technical: false,
            message: message.into(),
            target: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Subscription filter on the message feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageFilter {
    pub technical_only: bool,
}

impl MessageFilter {
    pub fn technical() -> Self {
        Self {
            technical_only: true,
        }
    }

    pub fn matches(&self, message: &ServiceMessage) -> bool {
        !self.technical_only || message.technical
    }
}
