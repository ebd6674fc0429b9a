use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderId;
use crate::domain::request::ServiceRequestId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewRequest,
    QuoteSelected,
    QuoteRejected,
    RequestCancelled,
    QuoteCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewRequest => "new_request",
            Self::QuoteSelected => "quote_selected",
            Self::QuoteRejected => "quote_rejected",
            Self::RequestCancelled => "request_cancelled",
            Self::QuoteCancelled => "quote_cancelled",
        }
    }
}

/// Inbox entry for one provider about one request. Purely a read-model:
/// deleting or mutating it never affects request or quote state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderNotification {
    pub id: NotificationId,
    pub provider_id: ProviderId,
    pub request_id: ServiceRequestId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
