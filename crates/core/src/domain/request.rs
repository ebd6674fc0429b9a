use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::booking::BookingId;
use crate::domain::quote::QuoteId;
use crate::domain::UserId;
use crate::errors::DomainError;
use crate::geo::GeoPoint;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRequestId(pub String);

impl std::fmt::Display for ServiceRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    QuotesReceived,
    QuoteSelected,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses in which new quotes may still arrive.
    pub fn accepts_quotes(&self) -> bool {
        matches!(self, Self::Open | Self::QuotesReceived)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Emergency,
    Urgent,
    Normal,
    Flexible,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Urgent => "urgent",
            Self::Normal => "normal",
            Self::Flexible => "flexible",
        }
    }
}

/// A customer's posted job, open for provider quotes until its deadline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: ServiceRequestId,
    pub requester: UserId,
    pub category: String,
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
    pub voice_note_url: Option<String>,
    pub location: GeoPoint,
    pub address: String,
    pub urgency: Urgency,
    pub preferred_date: Option<DateTime<Utc>>,
    pub preferred_time_slot: Option<String>,
    pub status: RequestStatus,
    pub selected_quote: Option<QuoteId>,
    pub final_booking: Option<BookingId>,
    pub created_at: DateTime<Utc>,
    pub quote_deadline: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        matches!(
            (self.status, next),
            (Open, QuotesReceived)
                | (Open, QuoteSelected)
                | (QuotesReceived, QuoteSelected)
                | (QuoteSelected, InProgress)
                | (InProgress, Completed)
        ) || (next == Cancelled && !self.status.is_terminal())
    }

    pub fn transition_to(&mut self, next: RequestStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidRequestTransition { from: self.status, to: next })
    }

    /// Records the outcome of quote selection. `selected_quote` and
    /// `final_booking` are set together, exactly once.
    pub fn mark_selected(
        &mut self,
        quote_id: QuoteId,
        booking_id: BookingId,
    ) -> Result<(), DomainError> {
        if self.selected_quote.is_some() || self.final_booking.is_some() {
            return Err(DomainError::InvariantViolation(
                "request already carries a selected quote".to_owned(),
            ));
        }

        self.transition_to(RequestStatus::QuoteSelected)?;
        self.selected_quote = Some(quote_id);
        self.final_booking = Some(booking_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::domain::booking::BookingId;
    use crate::domain::quote::QuoteId;
    use crate::domain::UserId;
    use crate::geo::GeoPoint;

    use super::{RequestStatus, ServiceRequest, ServiceRequestId, Urgency};

    fn request(status: RequestStatus) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: ServiceRequestId("req-1".to_string()),
            requester: UserId("user-1".to_string()),
            category: "plumber".to_string(),
            title: "Plumber Service Request".to_string(),
            description: "Leaking tap in the bathroom".to_string(),
            images: Vec::new(),
            voice_note_url: None,
            location: GeoPoint::new(28.6315, 77.2167),
            address: "Connaught Place, New Delhi".to_string(),
            urgency: Urgency::Urgent,
            preferred_date: None,
            preferred_time_slot: None,
            status,
            selected_quote: None,
            final_booking: None,
            created_at: now,
            quote_deadline: now + Duration::minutes(10),
            expires_at: now + Duration::days(7),
        }
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        let mut req = request(RequestStatus::Open);
        req.transition_to(RequestStatus::QuotesReceived).expect("open -> quotes_received");
        req.transition_to(RequestStatus::QuoteSelected).expect("quotes_received -> quote_selected");
        req.transition_to(RequestStatus::InProgress).expect("quote_selected -> in_progress");
        req.transition_to(RequestStatus::Completed).expect("in_progress -> completed");
    }

    #[test]
    fn completed_request_cannot_reopen() {
        let mut req = request(RequestStatus::Completed);
        let error = req.transition_to(RequestStatus::Open).expect_err("completed is terminal");
        assert!(matches!(error, crate::errors::DomainError::InvalidRequestTransition { .. }));
    }

    #[test]
    fn cancellation_reaches_every_non_terminal_status() {
        for status in [
            RequestStatus::Open,
            RequestStatus::QuotesReceived,
            RequestStatus::QuoteSelected,
            RequestStatus::InProgress,
        ] {
            let mut req = request(status);
            req.transition_to(RequestStatus::Cancelled).expect("cancellable");
        }

        let mut req = request(RequestStatus::Cancelled);
        assert!(req.transition_to(RequestStatus::Cancelled).is_err());
    }

    #[test]
    fn mark_selected_sets_quote_and_booking_together() {
        let mut req = request(RequestStatus::QuotesReceived);
        req.mark_selected(QuoteId("q-1".to_string()), BookingId("b-1".to_string()))
            .expect("selection succeeds");

        assert_eq!(req.status, RequestStatus::QuoteSelected);
        assert_eq!(req.selected_quote, Some(QuoteId("q-1".to_string())));
        assert_eq!(req.final_booking, Some(BookingId("b-1".to_string())));
    }

    #[test]
    fn mark_selected_refuses_a_second_selection() {
        let mut req = request(RequestStatus::QuotesReceived);
        req.mark_selected(QuoteId("q-1".to_string()), BookingId("b-1".to_string()))
            .expect("first selection");

        let error = req
            .mark_selected(QuoteId("q-2".to_string()), BookingId("b-2".to_string()))
            .expect_err("second selection must fail");
        assert!(matches!(error, crate::errors::DomainError::InvariantViolation(_)));
    }
}
