//! Types for outcome notification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while delivering an outcome event.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("Webhook request failed: {0}")]
    Transport(String),

    #[error("Webhook request timed out")]
    Timeout,

    #[error("Webhook answered HTTP {status}")]
    Rejected { status: u16 },
}

/// Terminal result of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    #[serde(rename = "move_complete")]
    Completed,
    #[serde(rename = "move_error")]
    Failed,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Completed => "move_complete",
            OutcomeKind::Failed => "move_error",
        }
    }
}

/// Event posted to the subscriber once per execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEvent {
    #[serde(rename = "type")]
    pub kind: OutcomeKind,
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl OutcomeEvent {
    pub fn completed(
        id: impl Into<String>,
        display_name: impl Into<String>,
        target_descriptor: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            kind: OutcomeKind::Completed,
            id: id.into(),
            display_name: display_name.into(),
            target_descriptor: Some(target_descriptor.into()),
            size: Some(size),
            error_message: None,
        }
    }

    pub fn failed(
        id: impl Into<String>,
        display_name: impl Into<String>,
        target_descriptor: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            kind: OutcomeKind::Failed,
            id: id.into(),
            display_name: display_name.into(),
            target_descriptor,
            size: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// How a notification attempt ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// No endpoint configured.
    Skipped,
}
