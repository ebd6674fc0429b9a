use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use fixbid_core::domain::booking::{Booking, BookingId, BookingStatus};
use fixbid_core::domain::notification::{NotificationKind, ProviderNotification};
use fixbid_core::domain::provider::{Provider, ProviderId};
use fixbid_core::domain::quote::{ProviderQuote, QuoteId, QuoteStatus};
use fixbid_core::domain::request::{RequestStatus, ServiceRequest, ServiceRequestId};
use fixbid_core::domain::service::Service;
use fixbid_core::domain::wallet::WalletEntry;
use fixbid_core::domain::UserId;

use super::{
    BookingRepository, NotificationRepository, ProviderRepository, QuoteRepository,
    RepositoryError, ServiceCatalogRepository, ServiceRequestRepository, WalletRepository,
};

#[derive(Default)]
pub struct InMemoryServiceRequestRepository {
    requests: RwLock<HashMap<String, ServiceRequest>>,
}

#[async_trait::async_trait]
impl ServiceRequestRepository for InMemoryServiceRequestRepository {
    async fn create(&self, request: ServiceRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ServiceRequestId,
    ) -> Result<Option<ServiceRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn list_for_user(
        &self,
        user: &UserId,
        limit: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<ServiceRequest> =
            requests.values().filter(|r| &r.requester == user).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            matching.truncate(limit.max(0) as usize);
        }
        Ok(matching)
    }

    async fn list_accepting_quotes(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<ServiceRequest> =
            requests.values().filter(|r| r.status.accepts_quotes()).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn mark_quotes_received(&self, id: &ServiceRequestId) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        if let Some(request) = requests.get_mut(&id.0) {
            if request.status == RequestStatus::Open {
                request.status = RequestStatus::QuotesReceived;
            }
        }
        Ok(())
    }

    async fn select_for_booking(
        &self,
        id: &ServiceRequestId,
        quote: &QuoteId,
        booking: &BookingId,
    ) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&id.0) else {
            return Ok(false);
        };

        if !request.status.accepts_quotes() || request.selected_quote.is_some() {
            return Ok(false);
        }

        request.status = RequestStatus::QuoteSelected;
        request.selected_quote = Some(quote.clone());
        request.final_booking = Some(booking.clone());
        Ok(true)
    }

    async fn mark_cancelled(&self, id: &ServiceRequestId) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        let Some(request) = requests.get_mut(&id.0) else {
            return Ok(false);
        };

        if matches!(
            request.status,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::QuoteSelected
        ) {
            return Ok(false);
        }

        request.status = RequestStatus::Cancelled;
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, ProviderQuote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn create(&self, quote: ProviderQuote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<ProviderQuote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn find_active_for_provider(
        &self,
        request: &ServiceRequestId,
        provider: &ProviderId,
    ) -> Result<Option<ProviderQuote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes
            .values()
            .find(|q| {
                &q.request_id == request
                    && &q.provider_id == provider
                    && q.status != QuoteStatus::Cancelled
            })
            .cloned())
    }

    async fn list_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut matching: Vec<ProviderQuote> =
            quotes.values().filter(|q| &q.request_id == request).cloned().collect();
        matching.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(matching)
    }

    async fn update_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        if let Some(quote) = quotes.get_mut(&id.0) {
            quote.status = status;
        }
        Ok(())
    }

    async fn reject_other_submitted(
        &self,
        request: &ServiceRequestId,
        winner: &QuoteId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let mut losers = Vec::new();

        for quote in quotes.values_mut() {
            if &quote.request_id == request
                && &quote.id != winner
                && quote.status == QuoteStatus::Submitted
            {
                losers.push(quote.clone());
                quote.status = QuoteStatus::Rejected;
            }
        }

        losers.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(losers)
    }

    async fn cancel_submitted_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let mut affected = Vec::new();

        for quote in quotes.values_mut() {
            if &quote.request_id == request && quote.status == QuoteStatus::Submitted {
                affected.push(quote.clone());
                quote.status = QuoteStatus::Cancelled;
            }
        }

        affected.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(affected)
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<ProviderNotification>>,
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: ProviderNotification) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        notifications.push(notification);
        Ok(())
    }

    async fn list_for_provider(
        &self,
        provider: &ProviderId,
        kinds: &[NotificationKind],
        limit: i64,
    ) -> Result<Vec<ProviderNotification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        let mut matching: Vec<ProviderNotification> = notifications
            .iter()
            .filter(|n| &n.provider_id == provider)
            .filter(|n| kinds.is_empty() || kinds.contains(&n.kind))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit.max(0) as usize);
        Ok(matching)
    }

    async fn list_for_request(
        &self,
        request: &ServiceRequestId,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<ProviderNotification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| &n.request_id == request)
            .filter(|n| kind.map(|k| n.kind == k).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn mark_read(
        &self,
        provider: &ProviderId,
        request: &ServiceRequestId,
        kind: NotificationKind,
    ) -> Result<(), RepositoryError> {
        let mut notifications = self.notifications.write().await;
        for notification in notifications.iter_mut() {
            if &notification.provider_id == provider
                && &notification.request_id == request
                && notification.kind == kind
            {
                notification.is_read = true;
                notification.read_at = Some(chrono::Utc::now());
            }
        }
        Ok(())
    }

    async fn delete_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| &n.request_id != request);
        Ok((before - notifications.len()) as u64)
    }

    async fn delete_for_request_except(
        &self,
        request: &ServiceRequestId,
        keep: &ProviderId,
    ) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| &n.request_id != request || &n.provider_id == keep);
        Ok((before - notifications.len()) as u64)
    }

    async fn delete_for_provider_request(
        &self,
        provider: &ProviderId,
        request: &ServiceRequestId,
    ) -> Result<u64, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| !(&n.provider_id == provider && &n.request_id == request));
        Ok((before - notifications.len()) as u64)
    }
}

#[derive(Default)]
pub struct InMemoryProviderRepository {
    providers: RwLock<HashMap<String, Provider>>,
}

#[async_trait::async_trait]
impl ProviderRepository for InMemoryProviderRepository {
    async fn find_by_id(&self, id: &ProviderId) -> Result<Option<Provider>, RepositoryError> {
        let providers = self.providers.read().await;
        Ok(providers.get(&id.0).cloned())
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Option<Provider>, RepositoryError> {
        let providers = self.providers.read().await;
        Ok(providers.values().find(|p| &p.user_id == user).cloned())
    }

    async fn list_available(&self) -> Result<Vec<Provider>, RepositoryError> {
        let providers = self.providers.read().await;
        let mut matching: Vec<Provider> =
            providers.values().filter(|p| p.availability).cloned().collect();
        matching.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matching)
    }

    async fn save(&self, provider: Provider) -> Result<(), RepositoryError> {
        let mut providers = self.providers.write().await;
        providers.insert(provider.id.0.clone(), provider);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<String, Booking>>,
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, booking: Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id.0.clone(), booking);
        Ok(())
    }

    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id.0).cloned())
    }

    async fn find_unpaid_completed(
        &self,
        user: &UserId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matching: Vec<&Booking> = bookings
            .values()
            .filter(|b| {
                &b.user_id == user
                    && b.status == BookingStatus::Completed
                    && b.payment_status != fixbid_core::domain::booking::PaymentStatus::Success
            })
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching.first().map(|b| (*b).clone()))
    }

    async fn provider_has_booking_in(
        &self,
        provider: &ProviderId,
        statuses: &[BookingStatus],
    ) -> Result<bool, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .any(|b| &b.provider_id == provider && statuses.contains(&b.status)))
    }
}

#[derive(Default)]
pub struct InMemoryServiceCatalogRepository {
    services: RwLock<HashMap<String, Service>>,
}

#[async_trait::async_trait]
impl ServiceCatalogRepository for InMemoryServiceCatalogRepository {
    async fn find_by_category(&self, category: &str) -> Result<Option<Service>, RepositoryError> {
        let services = self.services.read().await;
        Ok(services.values().find(|s| s.category == category).cloned())
    }

    async fn create(&self, service: Service) -> Result<(), RepositoryError> {
        let mut services = self.services.write().await;
        services.insert(service.id.0.clone(), service);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryWalletRepository {
    balances: RwLock<HashMap<String, Decimal>>,
    entries: RwLock<Vec<WalletEntry>>,
}

#[async_trait::async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn balance(&self, user: &UserId) -> Result<Decimal, RepositoryError> {
        let balances = self.balances.read().await;
        Ok(balances.get(&user.0).copied().unwrap_or(Decimal::ZERO))
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WalletEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.external_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn record(&self, entry: WalletEntry) -> Result<(), RepositoryError> {
        if let Some(ref reference) = entry.external_reference {
            if self.find_by_reference(reference).await?.is_some() {
                return Err(RepositoryError::Decode(format!(
                    "duplicate external reference `{reference}`"
                )));
            }
        }

        let mut balances = self.balances.write().await;
        let mut entries = self.entries.write().await;
        balances.insert(entry.user_id.0.clone(), entry.balance_after);
        entries.push(entry);
        Ok(())
    }

    async fn entries_for_user(&self, user: &UserId) -> Result<Vec<WalletEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<WalletEntry> =
            entries.iter().filter(|e| &e.user_id == user).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use fixbid_core::domain::booking::BookingId;
    use fixbid_core::domain::quote::QuoteId;
    use fixbid_core::domain::request::{RequestStatus, ServiceRequest, ServiceRequestId, Urgency};
    use fixbid_core::domain::UserId;
    use fixbid_core::geo::GeoPoint;

    use crate::repositories::ServiceRequestRepository;

    use super::InMemoryServiceRequestRepository;

    fn request(id: &str) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: ServiceRequestId(id.to_string()),
            requester: UserId("user-1".to_string()),
            category: "plumber".to_string(),
            title: "Bathroom Leak Repair".to_string(),
            description: "Water leaking from bathroom tap".to_string(),
            images: Vec::new(),
            voice_note_url: None,
            location: GeoPoint::new(28.6315, 77.2167),
            address: "Connaught Place, New Delhi".to_string(),
            urgency: Urgency::Emergency,
            preferred_date: None,
            preferred_time_slot: None,
            status: RequestStatus::Open,
            selected_quote: None,
            final_booking: None,
            created_at: now,
            quote_deadline: now + Duration::minutes(10),
            expires_at: now + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn selection_cas_matches_sql_semantics() {
        let repo = InMemoryServiceRequestRepository::default();
        let req = request("req-1");
        repo.create(req.clone()).await.expect("create");

        let first = repo
            .select_for_booking(&req.id, &QuoteId("q-1".into()), &BookingId("b-1".into()))
            .await
            .expect("cas");
        let second = repo
            .select_for_booking(&req.id, &QuoteId("q-2".into()), &BookingId("b-2".into()))
            .await
            .expect("cas");

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn cancellation_cas_refuses_selected_requests() {
        let repo = InMemoryServiceRequestRepository::default();
        let req = request("req-1");
        repo.create(req.clone()).await.expect("create");
        repo.select_for_booking(&req.id, &QuoteId("q-1".into()), &BookingId("b-1".into()))
            .await
            .expect("cas");

        assert!(!repo.mark_cancelled(&req.id).await.expect("cancel"));
    }
}
