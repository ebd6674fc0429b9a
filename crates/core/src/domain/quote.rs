use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::provider::ProviderId;
use crate::domain::request::ServiceRequestId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Submitted,
    Selected,
    Rejected,
    Expired,
    Cancelled,
}

/// Provider details captured when the quote was submitted. Deliberately not
/// refreshed afterwards: the requester compares quotes as they were bid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub name: String,
    pub rating: f64,
    pub phone: Option<String>,
}

/// One provider's priced bid against an open service request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderQuote {
    pub id: QuoteId,
    pub request_id: ServiceRequestId,
    pub provider_id: ProviderId,
    pub price: Decimal,
    pub currency: String,
    pub estimated_duration: String,
    pub notes: Option<String>,
    pub images: Vec<String>,
    pub status: QuoteStatus,
    pub submitted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub snapshot: ProviderSnapshot,
}

impl ProviderQuote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        use QuoteStatus::*;
        matches!(
            (self.status, next),
            (Submitted, Selected)
                | (Submitted, Rejected)
                | (Submitted, Expired)
                | (Submitted, Cancelled)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidQuoteTransition { from: self.status, to: next })
    }

    /// A provider may withdraw a quote until the requester has decided on it.
    pub fn is_withdrawable(&self) -> bool {
        !matches!(self.status, QuoteStatus::Selected | QuoteStatus::Rejected | QuoteStatus::Expired)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::provider::ProviderId;
    use crate::domain::request::ServiceRequestId;

    use super::{ProviderQuote, ProviderSnapshot, QuoteId, QuoteStatus};

    fn quote(status: QuoteStatus) -> ProviderQuote {
        ProviderQuote {
            id: QuoteId("q-1".to_string()),
            request_id: ServiceRequestId("req-1".to_string()),
            provider_id: ProviderId("prov-1".to_string()),
            price: Decimal::new(50_000, 2),
            currency: "INR".to_string(),
            estimated_duration: "2-3 hours".to_string(),
            notes: None,
            images: Vec::new(),
            status,
            submitted_at: Utc::now(),
            expires_at: None,
            snapshot: ProviderSnapshot {
                name: "Ravi Kumar".to_string(),
                rating: 4.8,
                phone: Some("+91-9876500000".to_string()),
            },
        }
    }

    #[test]
    fn submitted_quote_can_be_selected_or_rejected() {
        let mut winner = quote(QuoteStatus::Submitted);
        winner.transition_to(QuoteStatus::Selected).expect("submitted -> selected");

        let mut loser = quote(QuoteStatus::Submitted);
        loser.transition_to(QuoteStatus::Rejected).expect("submitted -> rejected");
    }

    #[test]
    fn decided_quotes_are_immutable() {
        for status in [QuoteStatus::Selected, QuoteStatus::Rejected, QuoteStatus::Cancelled] {
            let mut q = quote(status);
            assert!(q.transition_to(QuoteStatus::Selected).is_err());
            assert!(q.transition_to(QuoteStatus::Cancelled).is_err());
        }
    }

    #[test]
    fn withdrawal_window_closes_on_decision() {
        assert!(quote(QuoteStatus::Submitted).is_withdrawable());
        assert!(quote(QuoteStatus::Cancelled).is_withdrawable());
        assert!(!quote(QuoteStatus::Selected).is_withdrawable());
        assert!(!quote(QuoteStatus::Rejected).is_withdrawable());
        assert!(!quote(QuoteStatus::Expired).is_withdrawable());
    }
}
