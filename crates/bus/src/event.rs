use serde::Serialize;

/// Fan-out announcement of a fresh request to one provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewServiceRequest {
    pub request_id: String,
    pub service_category: String,
    pub title: String,
    pub description: String,
    pub urgency: String,
    pub location: String,
    /// Kilometers from the provider, 0 when the provider has no location.
    pub distance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewQuoteReceived {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub request_id: String,
    pub quote_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteSelected {
    pub request_id: String,
    pub booking_id: String,
    pub provider_id: String,
    pub message: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RequestAssignedToOther {
    pub request_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RequestCancelled {
    pub request_id: String,
    pub title: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuoteCancelled {
    pub request_id: String,
    pub quote_id: String,
    pub provider_name: String,
    pub message: String,
}

/// Every event this workflow pushes. Event names and payload field names are
/// part of the client contract; the structs above pin the fields and
/// `name()` pins the event string.
#[derive(Clone, Debug, PartialEq)]
pub enum PushEvent {
    NewServiceRequest(NewServiceRequest),
    NewQuoteReceived(NewQuoteReceived),
    QuoteSelected(QuoteSelected),
    RequestAssignedToOther(RequestAssignedToOther),
    RequestCancelled(RequestCancelled),
    QuoteCancelled(QuoteCancelled),
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewServiceRequest(_) => "new_service_request",
            Self::NewQuoteReceived(_) => "new_quote_received",
            Self::QuoteSelected(_) => "quote_selected",
            Self::RequestAssignedToOther(_) => "request_assigned_to_other",
            Self::RequestCancelled(_) => "request_cancelled",
            Self::QuoteCancelled(_) => "quote_cancelled",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        let result = match self {
            Self::NewServiceRequest(payload) => serde_json::to_value(payload),
            Self::NewQuoteReceived(payload) => serde_json::to_value(payload),
            Self::QuoteSelected(payload) => serde_json::to_value(payload),
            Self::RequestAssignedToOther(payload) => serde_json::to_value(payload),
            Self::RequestCancelled(payload) => serde_json::to_value(payload),
            Self::QuoteCancelled(payload) => serde_json::to_value(payload),
        };

        result.unwrap_or(serde_json::Value::Null)
    }
}
