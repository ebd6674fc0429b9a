use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderId;
use crate::domain::service::ServiceId;
use crate::domain::UserId;
use crate::geo::GeoPoint;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Wire form, shared with the booking-management side ("In Progress"
    /// carries a space there).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// A provider holding a booking in one of these statuses is committed to
    /// a job and cannot take on another.
    pub fn occupies_provider(&self) -> bool {
        matches!(self, Self::Accepted | Self::InProgress)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }
}

/// The durable contract between requester and provider once a quote is
/// accepted. This workflow only ever creates bookings; the booking-management
/// side owns them afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub provider_id: ProviderId,
    /// The provider's account id, denormalized for chat/payment lookups.
    pub provider_user_id: UserId,
    pub service_id: ServiceId,
    pub status: BookingStatus,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub price: Decimal,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
    pub service_name: String,
    pub provider_name: String,
    pub has_payment: bool,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
