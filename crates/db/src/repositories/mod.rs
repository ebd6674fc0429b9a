use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use fixbid_core::domain::booking::{Booking, BookingId, BookingStatus};
use fixbid_core::domain::notification::{NotificationKind, ProviderNotification};
use fixbid_core::domain::provider::{Provider, ProviderId};
use fixbid_core::domain::quote::{ProviderQuote, QuoteId, QuoteStatus};
use fixbid_core::domain::request::{ServiceRequest, ServiceRequestId};
use fixbid_core::domain::service::Service;
use fixbid_core::domain::wallet::WalletEntry;
use fixbid_core::domain::UserId;

pub mod booking;
pub mod memory;
pub mod notification;
pub mod provider;
pub mod quote;
pub mod request;
pub mod service;
pub mod wallet;

pub use booking::SqlBookingRepository;
pub use memory::{
    InMemoryBookingRepository, InMemoryNotificationRepository, InMemoryProviderRepository,
    InMemoryQuoteRepository, InMemoryServiceCatalogRepository, InMemoryServiceRequestRepository,
    InMemoryWalletRepository,
};
pub use notification::SqlNotificationRepository;
pub use provider::SqlProviderRepository;
pub use quote::SqlQuoteRepository;
pub use request::SqlServiceRequestRepository;
pub use service::SqlServiceCatalogRepository;
pub use wallet::SqlWalletRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ServiceRequestRepository: Send + Sync {
    async fn create(&self, request: ServiceRequest) -> Result<(), RepositoryError>;

    async fn find_by_id(
        &self,
        id: &ServiceRequestId,
    ) -> Result<Option<ServiceRequest>, RepositoryError>;

    async fn list_for_user(
        &self,
        user: &UserId,
        limit: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, RepositoryError>;

    /// Requests still collecting quotes (`open` or `quotes_received`),
    /// newest first.
    async fn list_accepting_quotes(&self) -> Result<Vec<ServiceRequest>, RepositoryError>;

    /// Advances `open -> quotes_received`. A no-op when the request already
    /// left `open`, so concurrent first quotes cannot regress the status.
    async fn mark_quotes_received(&self, id: &ServiceRequestId) -> Result<(), RepositoryError>;

    /// Compare-and-swap to `quote_selected`, recording the winning quote and
    /// booking. Returns false when the request was no longer selectable
    /// (already selected, cancelled, or otherwise closed) — exactly one of
    /// two racing selection calls observes true.
    async fn select_for_booking(
        &self,
        id: &ServiceRequestId,
        quote: &QuoteId,
        booking: &BookingId,
    ) -> Result<bool, RepositoryError>;

    /// Compare-and-swap to `cancelled`. Returns false when the request is
    /// already in a status that forbids requester cancellation.
    async fn mark_cancelled(&self, id: &ServiceRequestId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn create(&self, quote: ProviderQuote) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<ProviderQuote>, RepositoryError>;

    /// The provider's non-cancelled quote on a request, if any. A withdrawn
    /// quote does not block a fresh submission.
    async fn find_active_for_provider(
        &self,
        request: &ServiceRequestId,
        provider: &ProviderId,
    ) -> Result<Option<ProviderQuote>, RepositoryError>;

    async fn list_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError>;

    async fn update_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<(), RepositoryError>;

    /// Rejects every still-submitted sibling of the winning quote and
    /// returns them (for loser notifications).
    async fn reject_other_submitted(
        &self,
        request: &ServiceRequestId,
        winner: &QuoteId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError>;

    /// Cancels every still-submitted quote on a cancelled request and
    /// returns them.
    async fn cancel_submitted_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: ProviderNotification) -> Result<(), RepositoryError>;

    async fn list_for_provider(
        &self,
        provider: &ProviderId,
        kinds: &[NotificationKind],
        limit: i64,
    ) -> Result<Vec<ProviderNotification>, RepositoryError>;

    async fn list_for_request(
        &self,
        request: &ServiceRequestId,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<ProviderNotification>, RepositoryError>;

    async fn mark_read(
        &self,
        provider: &ProviderId,
        request: &ServiceRequestId,
        kind: NotificationKind,
    ) -> Result<(), RepositoryError>;

    async fn delete_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<u64, RepositoryError>;

    async fn delete_for_request_except(
        &self,
        request: &ServiceRequestId,
        keep: &ProviderId,
    ) -> Result<u64, RepositoryError>;

    async fn delete_for_provider_request(
        &self,
        provider: &ProviderId,
        request: &ServiceRequestId,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProviderId) -> Result<Option<Provider>, RepositoryError>;

    async fn find_by_user(&self, user: &UserId) -> Result<Option<Provider>, RepositoryError>;

    async fn list_available(&self) -> Result<Vec<Provider>, RepositoryError>;

    async fn save(&self, provider: Provider) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, booking: Booking) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;

    /// A completed booking of this user whose payment has not succeeded.
    async fn find_unpaid_completed(
        &self,
        user: &UserId,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// Whether the provider holds any booking in one of the given statuses.
    async fn provider_has_booking_in(
        &self,
        provider: &ProviderId,
        statuses: &[BookingStatus],
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait ServiceCatalogRepository: Send + Sync {
    async fn find_by_category(&self, category: &str) -> Result<Option<Service>, RepositoryError>;

    async fn create(&self, service: Service) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn balance(&self, user: &UserId) -> Result<Decimal, RepositoryError>;

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WalletEntry>, RepositoryError>;

    /// Appends a ledger entry and moves the denormalized account balance to
    /// `entry.balance_after`.
    async fn record(&self, entry: WalletEntry) -> Result<(), RepositoryError>;

    async fn entries_for_user(&self, user: &UserId) -> Result<Vec<WalletEntry>, RepositoryError>;
}
