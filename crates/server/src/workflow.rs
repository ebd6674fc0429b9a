//! The service-request quoting workflow: request creation and provider
//! fan-out, quote submission, quote selection into a booking, and the two
//! cancellation paths.
//!
//! Every operation returns a typed outcome; precondition failures are
//! `Rejection` values the HTTP layer maps to status codes, and push-bus
//! delivery is best-effort and never fails a write path.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use fixbid_bus::{
    publish_best_effort, NewQuoteReceived, NewServiceRequest, PushBus, PushEvent, QuoteCancelled,
    QuoteSelected, RequestAssignedToOther, RequestCancelled, Topic,
};
use fixbid_core::domain::booking::{Booking, BookingId, BookingStatus, PaymentStatus};
use fixbid_core::domain::notification::{NotificationId, NotificationKind, ProviderNotification};
use fixbid_core::domain::provider::Provider;
use fixbid_core::domain::quote::{ProviderQuote, QuoteId, QuoteStatus};
use fixbid_core::domain::request::{RequestStatus, ServiceRequest, ServiceRequestId, Urgency};
use fixbid_core::domain::service::{Service, ServiceId};
use fixbid_core::domain::UserId;
use fixbid_core::errors::Rejection;
use fixbid_core::geo::GeoPoint;
use fixbid_core::WorkflowConfig;
use fixbid_db::repositories::{
    BookingRepository, NotificationRepository, ProviderRepository, QuoteRepository,
    RepositoryError, ServiceCatalogRepository, ServiceRequestRepository,
};

/// Coordinates kept from the original deployment region, used when a caller
/// posts a request without usable coordinates.
const DEFAULT_LOCATION: GeoPoint = GeoPoint { lat: 28.6139, lon: 77.2090 };

const INBOX_LIMIT: i64 = 50;

pub struct RequestWorkflow {
    config: WorkflowConfig,
    requests: Arc<dyn ServiceRequestRepository>,
    quotes: Arc<dyn QuoteRepository>,
    notifications: Arc<dyn NotificationRepository>,
    providers: Arc<dyn ProviderRepository>,
    bookings: Arc<dyn BookingRepository>,
    services: Arc<dyn ServiceCatalogRepository>,
    bus: Arc<dyn PushBus>,
}

#[derive(Clone, Debug, Default)]
pub struct NewRequestInput {
    pub category: String,
    pub description: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub urgency: Option<Urgency>,
    pub preferred_date: Option<DateTime<Utc>>,
    pub preferred_time_slot: Option<String>,
    pub images: Vec<String>,
    pub voice_note_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewQuoteInput {
    pub price: Decimal,
    pub estimated_duration: String,
    pub notes: Option<String>,
    pub images: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct CreatedRequest {
    pub request: ServiceRequest,
    pub notified_providers: usize,
}

#[derive(Clone, Debug)]
pub struct SelectionOutcome {
    pub booking: Booking,
    pub rejected_quotes: usize,
}

/// One row of the provider's actionable feed, annotated with the provider's
/// own quote state so the client renders "already bid" without another call.
#[derive(Clone, Debug)]
pub struct FeedItem {
    pub request: ServiceRequest,
    pub distance_km: f64,
    pub has_quoted: bool,
    pub quote_status: Option<QuoteStatus>,
}

#[derive(Clone, Debug)]
pub struct RequestDetail {
    pub request: ServiceRequest,
    /// Populated only for the request owner.
    pub quotes: Vec<ProviderQuote>,
}

fn storage(error: RepositoryError) -> Rejection {
    error!(event_name = "workflow.storage_error", error = %error, "repository operation failed");
    Rejection::Storage(error.to_string())
}

fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn preview(description: &str) -> String {
    let truncated: String = description.chars().take(100).collect();
    format!("New service request near you: {truncated}...")
}

impl RequestWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WorkflowConfig,
        requests: Arc<dyn ServiceRequestRepository>,
        quotes: Arc<dyn QuoteRepository>,
        notifications: Arc<dyn NotificationRepository>,
        providers: Arc<dyn ProviderRepository>,
        bookings: Arc<dyn BookingRepository>,
        services: Arc<dyn ServiceCatalogRepository>,
        bus: Arc<dyn PushBus>,
    ) -> Self {
        Self { config, requests, quotes, notifications, providers, bookings, services, bus }
    }

    /// Creates a request in `open` and fans out to eligible providers.
    pub async fn create_request(
        &self,
        requester: &UserId,
        input: NewRequestInput,
    ) -> Result<CreatedRequest, Rejection> {
        let category = input.category.trim().to_lowercase();
        let description = input.description.trim().to_string();
        let address = input.address.trim().to_string();

        if category.is_empty() {
            return Err(Rejection::MissingField("service_type"));
        }
        if address.is_empty() {
            return Err(Rejection::MissingField("location"));
        }
        if description.is_empty() {
            return Err(Rejection::MissingField("work_description"));
        }

        // A requester with an unpaid completed job must settle it before
        // posting new work; the booking id lets the client prompt payment.
        if let Some(unpaid) =
            self.bookings.find_unpaid_completed(requester).await.map_err(storage)?
        {
            return Err(Rejection::UnpaidBooking { booking_id: unpaid.id });
        }

        let now = Utc::now();
        let request = ServiceRequest {
            id: ServiceRequestId(Uuid::new_v4().to_string()),
            requester: requester.clone(),
            title: format!("{} Service Request", title_case(&category)),
            category,
            description,
            images: input.images,
            voice_note_url: input.voice_note_url,
            location: input.location.unwrap_or(DEFAULT_LOCATION),
            address,
            urgency: input.urgency.unwrap_or(Urgency::Normal),
            preferred_date: input.preferred_date,
            preferred_time_slot: input.preferred_time_slot,
            status: RequestStatus::Open,
            selected_quote: None,
            final_booking: None,
            created_at: now,
            quote_deadline: now + Duration::minutes(self.config.quote_window_minutes),
            expires_at: now + Duration::days(self.config.request_expiry_days),
        };

        self.requests.create(request.clone()).await.map_err(storage)?;

        let notified_providers = self.fan_out(&request).await;

        info!(
            event_name = "workflow.request.created",
            request_id = %request.id,
            category = %request.category,
            notified_providers,
            "service request created"
        );

        Ok(CreatedRequest { request, notified_providers })
    }

    /// Notifies providers near the request, falling back to every available
    /// provider when the radius yields nobody. Over-notification is
    /// preferred to a request nobody sees. Best-effort throughout: no
    /// failure here aborts request creation.
    async fn fan_out(&self, request: &ServiceRequest) -> usize {
        let available = match self.providers.list_available().await {
            Ok(providers) => providers,
            Err(error) => {
                error!(
                    event_name = "workflow.fanout.pool_unavailable",
                    request_id = %request.id,
                    error = %error,
                    "could not load provider pool; skipping fan-out"
                );
                return 0;
            }
        };

        let nearby: Vec<&Provider> = available
            .iter()
            .filter(|provider| {
                provider
                    .location
                    .map(|at| at.distance_km(&request.location) <= self.config.fanout_radius_km)
                    .unwrap_or(false)
            })
            .collect();

        let recipients: Vec<&Provider> =
            if nearby.is_empty() { available.iter().collect() } else { nearby };

        let mut notified = 0usize;
        for provider in recipients {
            let notification = ProviderNotification {
                id: NotificationId(Uuid::new_v4().to_string()),
                provider_id: provider.id.clone(),
                request_id: request.id.clone(),
                kind: NotificationKind::NewRequest,
                title: format!("New {} Request", title_case(&request.category)),
                message: preview(&request.description),
                is_read: false,
                is_sent: true,
                created_at: Utc::now(),
                read_at: None,
            };

            if let Err(error) = self.notifications.create(notification).await {
                warn!(
                    event_name = "workflow.fanout.notification_failed",
                    request_id = %request.id,
                    provider_id = %provider.id,
                    error = %error,
                    "could not persist fan-out notification; continuing with remaining providers"
                );
                continue;
            }

            let distance = provider
                .location
                .map(|at| at.distance_km(&request.location))
                .unwrap_or(0.0);

            publish_best_effort(
                &self.bus,
                Topic::Provider(provider.id.clone()),
                PushEvent::NewServiceRequest(NewServiceRequest {
                    request_id: request.id.0.clone(),
                    service_category: request.category.clone(),
                    title: request.title.clone(),
                    description: request.description.clone(),
                    urgency: request.urgency.as_str().to_string(),
                    location: request.address.clone(),
                    distance,
                }),
            )
            .await;

            notified += 1;
        }

        notified
    }

    /// A provider attaches a priced bid to an open request.
    pub async fn submit_quote(
        &self,
        user: &UserId,
        request_id: &ServiceRequestId,
        input: NewQuoteInput,
    ) -> Result<ProviderQuote, Rejection> {
        let provider = self
            .providers
            .find_by_user(user)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("provider profile"))?;

        if !provider.is_verified() {
            return Err(Rejection::ProviderNotVerified);
        }

        let request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("service request"))?;

        if !request.status.accepts_quotes() {
            return Err(Rejection::RequestClosed { status: request.status });
        }

        if self
            .quotes
            .find_active_for_provider(request_id, &provider.id)
            .await
            .map_err(storage)?
            .is_some()
        {
            return Err(Rejection::DuplicateQuote);
        }

        // One active job at a time: an in-progress booking blocks new bids.
        if self
            .bookings
            .provider_has_booking_in(&provider.id, &[BookingStatus::InProgress])
            .await
            .map_err(storage)?
        {
            return Err(Rejection::ProviderBusy);
        }

        if Utc::now() > request.quote_deadline {
            return Err(Rejection::DeadlinePassed);
        }

        if input.price <= Decimal::ZERO {
            return Err(Rejection::NonPositivePrice);
        }

        let estimated_duration = input.estimated_duration.trim().to_string();
        if estimated_duration.is_empty() {
            return Err(Rejection::MissingDuration);
        }

        let quote = ProviderQuote {
            id: QuoteId(Uuid::new_v4().to_string()),
            request_id: request.id.clone(),
            provider_id: provider.id.clone(),
            price: input.price,
            currency: self.config.currency.clone(),
            estimated_duration,
            notes: input.notes,
            images: input.images,
            status: QuoteStatus::Submitted,
            submitted_at: Utc::now(),
            expires_at: Some(request.expires_at),
            snapshot: provider.snapshot(),
        };

        self.quotes.create(quote.clone()).await.map_err(storage)?;

        // The provider has acted on the fan-out notification.
        self.notifications
            .mark_read(&provider.id, request_id, NotificationKind::NewRequest)
            .await
            .map_err(storage)?;

        self.requests.mark_quotes_received(request_id).await.map_err(storage)?;

        publish_best_effort(
            &self.bus,
            Topic::User(request.requester.clone()),
            PushEvent::NewQuoteReceived(NewQuoteReceived {
                kind: "new_quote".to_string(),
                title: "New Quote Received".to_string(),
                message: format!("You received a new quote for \"{}\"", request.title),
                request_id: request.id.0.clone(),
                quote_id: quote.id.0.clone(),
            }),
        )
        .await;

        info!(
            event_name = "workflow.quote.submitted",
            request_id = %request.id,
            quote_id = %quote.id,
            provider_id = %provider.id,
            "quote submitted"
        );

        Ok(quote)
    }

    /// The requester picks one quote; the winner of the status
    /// compare-and-swap performs the remaining writes, so two racing
    /// selections cannot both produce a booking.
    pub async fn select_quote(
        &self,
        user: &UserId,
        request_id: &ServiceRequestId,
        quote_id: &QuoteId,
    ) -> Result<SelectionOutcome, Rejection> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("service request"))?;

        if &request.requester != user {
            return Err(Rejection::Forbidden);
        }

        let quote = self
            .quotes
            .find_by_id(quote_id)
            .await
            .map_err(storage)?
            .filter(|quote| &quote.request_id == request_id)
            .ok_or(Rejection::NotFound("quote"))?;

        if quote.status != QuoteStatus::Submitted {
            return Err(Rejection::QuoteUnavailable { status: quote.status });
        }

        let provider = self
            .providers
            .find_by_id(&quote.provider_id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("provider profile"))?;

        if !provider.is_verified() {
            return Err(Rejection::ProviderNotVerified);
        }

        // Busy-check across customers: a provider already committed to a job
        // cannot be double-booked.
        if self
            .bookings
            .provider_has_booking_in(
                &provider.id,
                &[BookingStatus::Accepted, BookingStatus::InProgress],
            )
            .await
            .map_err(storage)?
        {
            return Err(Rejection::ProviderBusy);
        }

        let service = match self
            .services
            .find_by_category(&request.category)
            .await
            .map_err(storage)?
        {
            Some(service) => service,
            None => {
                let service = Service {
                    id: ServiceId(Uuid::new_v4().to_string()),
                    name: format!("{} Service", title_case(&request.category)),
                    category: request.category.clone(),
                    base_price: quote.price,
                };
                self.services.create(service.clone()).await.map_err(storage)?;
                service
            }
        };

        // The CAS is the authorization step for everything below it.
        let booking_id = BookingId(Uuid::new_v4().to_string());
        let won = self
            .requests
            .select_for_booking(request_id, quote_id, &booking_id)
            .await
            .map_err(storage)?;
        if !won {
            return Err(Rejection::Conflict);
        }

        let booking = Booking {
            id: booking_id,
            user_id: request.requester.clone(),
            provider_id: provider.id.clone(),
            provider_user_id: provider.user_id.clone(),
            service_id: service.id.clone(),
            status: BookingStatus::Accepted,
            scheduled_time: request.preferred_date,
            price: quote.price,
            location: Some(request.location),
            notes: Some(request.description.clone()),
            service_name: service.name.clone(),
            provider_name: quote.snapshot.name.clone(),
            has_payment: false,
            payment_status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        self.bookings.create(booking.clone()).await.map_err(storage)?;

        self.quotes.update_status(quote_id, QuoteStatus::Selected).await.map_err(storage)?;
        let losers =
            self.quotes.reject_other_submitted(request_id, quote_id).await.map_err(storage)?;

        // Everyone who saw the fan-out, quoted or not; collected before the
        // notifications are pruned.
        let notified = self
            .notifications
            .list_for_request(request_id, Some(NotificationKind::NewRequest))
            .await
            .map_err(storage)?;

        self.notifications.delete_for_request(request_id).await.map_err(storage)?;

        self.notifications
            .create(ProviderNotification {
                id: NotificationId(Uuid::new_v4().to_string()),
                provider_id: provider.id.clone(),
                request_id: request.id.clone(),
                kind: NotificationKind::QuoteSelected,
                title: "Your Quote Was Selected!".to_string(),
                message: format!(
                    "Congratulations! Your quote for \"{}\" has been selected by the customer.",
                    request.title
                ),
                is_read: false,
                is_sent: true,
                created_at: Utc::now(),
                read_at: None,
            })
            .await
            .map_err(storage)?;

        let selected_event = QuoteSelected {
            request_id: request.id.0.clone(),
            booking_id: booking.id.0.clone(),
            provider_id: provider.id.0.clone(),
            message: "Your quote has been selected!".to_string(),
            title: request.title.clone(),
        };

        publish_best_effort(
            &self.bus,
            Topic::Provider(provider.id.clone()),
            PushEvent::QuoteSelected(selected_event.clone()),
        )
        .await;

        let mut passed_over: Vec<_> =
            notified.iter().map(|n| n.provider_id.clone()).collect();
        passed_over.extend(losers.iter().map(|q| q.provider_id.clone()));
        passed_over.sort_by(|a, b| a.0.cmp(&b.0));
        passed_over.dedup();

        for loser in passed_over.into_iter().filter(|id| id != &provider.id) {
            publish_best_effort(
                &self.bus,
                Topic::Provider(loser),
                PushEvent::RequestAssignedToOther(RequestAssignedToOther {
                    request_id: request.id.0.clone(),
                    message: "This service request has been assigned to another provider"
                        .to_string(),
                }),
            )
            .await;
        }

        // Pull the request down for providers who saw the fan-out but never
        // opened it; they hold no notification row, only the broadcast room.
        publish_best_effort(
            &self.bus,
            Topic::AllProviders,
            PushEvent::RequestCancelled(RequestCancelled {
                request_id: request.id.0.clone(),
                title: request.title.clone(),
                reason: "No longer available".to_string(),
            }),
        )
        .await;

        publish_best_effort(
            &self.bus,
            Topic::User(request.requester.clone()),
            PushEvent::QuoteSelected(selected_event),
        )
        .await;

        info!(
            event_name = "workflow.quote.selected",
            request_id = %request.id,
            quote_id = %quote.id,
            booking_id = %booking.id,
            rejected_quotes = losers.len(),
            "quote selected and booking created"
        );

        Ok(SelectionOutcome { booking, rejected_quotes: losers.len() })
    }

    /// Requester-level cancellation: affects every bidder and cleans up
    /// broadly.
    pub async fn cancel_request(
        &self,
        user: &UserId,
        request_id: &ServiceRequestId,
    ) -> Result<(), Rejection> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("service request"))?;

        if &request.requester != user {
            return Err(Rejection::Forbidden);
        }

        if matches!(
            request.status,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::QuoteSelected
        ) {
            return Err(Rejection::CancelNotAllowed { status: request.status });
        }

        if !self.requests.mark_cancelled(request_id).await.map_err(storage)? {
            return Err(Rejection::Conflict);
        }

        self.notifications.delete_for_request(request_id).await.map_err(storage)?;

        let cancelled_quotes =
            self.quotes.cancel_submitted_for_request(request_id).await.map_err(storage)?;

        for quote in &cancelled_quotes {
            self.notifications
                .create(ProviderNotification {
                    id: NotificationId(Uuid::new_v4().to_string()),
                    provider_id: quote.provider_id.clone(),
                    request_id: request.id.clone(),
                    kind: NotificationKind::RequestCancelled,
                    title: "Service Request Cancelled".to_string(),
                    message: format!(
                        "The service request \"{}\" has been cancelled by the customer.",
                        request.title
                    ),
                    is_read: false,
                    is_sent: true,
                    created_at: Utc::now(),
                    read_at: None,
                })
                .await
                .map_err(storage)?;

            publish_best_effort(
                &self.bus,
                Topic::Provider(quote.provider_id.clone()),
                PushEvent::RequestCancelled(RequestCancelled {
                    request_id: request.id.0.clone(),
                    title: request.title.clone(),
                    reason: "Cancelled by customer".to_string(),
                }),
            )
            .await;
        }

        publish_best_effort(
            &self.bus,
            Topic::AllProviders,
            PushEvent::RequestCancelled(RequestCancelled {
                request_id: request.id.0.clone(),
                title: request.title.clone(),
                reason: "Cancelled by customer".to_string(),
            }),
        )
        .await;

        publish_best_effort(
            &self.bus,
            Topic::User(request.requester.clone()),
            PushEvent::RequestCancelled(RequestCancelled {
                request_id: request.id.0.clone(),
                title: request.title.clone(),
                reason: "Cancelled by you".to_string(),
            }),
        )
        .await;

        info!(
            event_name = "workflow.request.cancelled",
            request_id = %request.id,
            cancelled_quotes = cancelled_quotes.len(),
            "service request cancelled"
        );

        Ok(())
    }

    /// Provider-level withdrawal: affects only that provider-requester pair.
    pub async fn withdraw_quote(
        &self,
        user: &UserId,
        request_id: &ServiceRequestId,
    ) -> Result<(), Rejection> {
        let provider = self
            .providers
            .find_by_user(user)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("provider profile"))?;

        let request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("service request"))?;

        let quote = self
            .quotes
            .find_active_for_provider(request_id, &provider.id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("quote"))?;

        if !quote.is_withdrawable() {
            return Err(Rejection::WithdrawNotAllowed { status: quote.status });
        }

        self.quotes.update_status(&quote.id, QuoteStatus::Cancelled).await.map_err(storage)?;

        // Only this provider's inbox entries; other bidders keep theirs.
        self.notifications
            .delete_for_provider_request(&provider.id, request_id)
            .await
            .map_err(storage)?;

        self.notifications
            .create(ProviderNotification {
                id: NotificationId(Uuid::new_v4().to_string()),
                provider_id: provider.id.clone(),
                request_id: request.id.clone(),
                kind: NotificationKind::QuoteCancelled,
                title: "Quote Withdrawn".to_string(),
                message: format!(
                    "Provider {} has withdrawn their quote for \"{}\".",
                    provider.name, request.title
                ),
                is_read: false,
                is_sent: true,
                created_at: Utc::now(),
                read_at: None,
            })
            .await
            .map_err(storage)?;

        publish_best_effort(
            &self.bus,
            Topic::User(request.requester.clone()),
            PushEvent::QuoteCancelled(QuoteCancelled {
                request_id: request.id.0.clone(),
                quote_id: quote.id.0.clone(),
                provider_name: provider.name.clone(),
                message: "Quote has been withdrawn".to_string(),
            }),
        )
        .await;

        info!(
            event_name = "workflow.quote.withdrawn",
            request_id = %request.id,
            quote_id = %quote.id,
            provider_id = %provider.id,
            "quote withdrawn"
        );

        Ok(())
    }

    /// Requests the provider may still act on, nearest first. Wider radius
    /// than the fan-out: browsing is cheap, push notifications are not.
    pub async fn provider_feed(&self, user: &UserId) -> Result<Vec<FeedItem>, Rejection> {
        let provider = self
            .providers
            .find_by_user(user)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("provider profile"))?;

        if provider.deposit_balance < self.config.min_deposit_balance {
            return Err(Rejection::DepositShortfall {
                required: self.config.min_deposit_balance,
                balance: provider.deposit_balance,
            });
        }

        let open_requests = self.requests.list_accepting_quotes().await.map_err(storage)?;

        let mut feed = Vec::new();
        for request in open_requests {
            let distance_km = match provider.location {
                Some(at) => {
                    let distance = at.distance_km(&request.location);
                    if distance > self.config.browse_radius_km {
                        continue;
                    }
                    (distance * 100.0).round() / 100.0
                }
                None => 0.0,
            };

            let own_quote = self
                .quotes
                .find_active_for_provider(&request.id, &provider.id)
                .await
                .map_err(storage)?;

            feed.push(FeedItem {
                request,
                distance_km,
                has_quoted: own_quote.is_some(),
                quote_status: own_quote.map(|q| q.status),
            });
        }

        feed.sort_by(|a, b| {
            a.distance_km.partial_cmp(&b.distance_km).unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(feed)
    }

    /// The provider's inbox: fresh opportunities and wins, newest first.
    pub async fn provider_inbox(
        &self,
        user: &UserId,
    ) -> Result<Vec<ProviderNotification>, Rejection> {
        let provider = self
            .providers
            .find_by_user(user)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("provider profile"))?;

        self.notifications
            .list_for_provider(
                &provider.id,
                &[NotificationKind::NewRequest, NotificationKind::QuoteSelected],
                INBOX_LIMIT,
            )
            .await
            .map_err(storage)
    }

    /// Request detail. Quotes are visible to the owner only; providers see
    /// the request itself (they need it to bid), everyone else is refused.
    pub async fn get_request(
        &self,
        user: &UserId,
        is_provider: bool,
        request_id: &ServiceRequestId,
    ) -> Result<RequestDetail, Rejection> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(storage)?
            .ok_or(Rejection::NotFound("service request"))?;

        let is_owner = &request.requester == user;
        if !is_owner && !is_provider {
            return Err(Rejection::Forbidden);
        }

        let quotes = if is_owner {
            self.quotes.list_for_request(request_id).await.map_err(storage)?
        } else {
            Vec::new()
        };

        Ok(RequestDetail { request, quotes })
    }

    /// The requester's own requests, newest first.
    pub async fn list_requests(
        &self,
        user: &UserId,
        limit: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, Rejection> {
        self.requests.list_for_user(user, limit).await.map_err(storage)
    }
}
