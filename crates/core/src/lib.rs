pub mod config;
pub mod domain;
pub mod errors;
pub mod geo;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, WorkflowConfig};
pub use domain::booking::{Booking, BookingId, BookingStatus, PaymentStatus};
pub use domain::notification::{NotificationId, NotificationKind, ProviderNotification};
pub use domain::provider::{Provider, ProviderId, VerificationStatus};
pub use domain::quote::{ProviderQuote, ProviderSnapshot, QuoteId, QuoteStatus};
pub use domain::request::{RequestStatus, ServiceRequest, ServiceRequestId, Urgency};
pub use domain::service::{Service, ServiceId};
pub use domain::wallet::{WalletDirection, WalletEntry, WalletEntryId, WalletError};
pub use domain::UserId;
pub use errors::{DomainError, Rejection};
pub use geo::GeoPoint;
