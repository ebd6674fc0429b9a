use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::booking::BookingId;
use crate::domain::quote::QuoteStatus;
use crate::domain::request::RequestStatus;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid request transition from {from:?} to {to:?}")]
    InvalidRequestTransition { from: RequestStatus, to: RequestStatus },
    #[error("invalid quote transition from {from:?} to {to:?}")]
    InvalidQuoteTransition { from: QuoteStatus, to: QuoteStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Typed outcome of a workflow precondition failure. Every variant maps to a
/// stable machine-checkable `code()` the client branches on, and carries the
/// data the client needs to act (the unpaid booking, the shortfall amount).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("price must be greater than zero")]
    NonPositivePrice,
    #[error("estimated duration is required")]
    MissingDuration,
    #[error("caller identity is missing")]
    Unauthenticated,
    #[error("caller may not act on this resource")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("provider is not verified")]
    ProviderNotVerified,
    #[error("provider already has an active job")]
    ProviderBusy,
    #[error("a quote was already submitted for this request")]
    DuplicateQuote,
    #[error("the quote deadline has passed")]
    DeadlinePassed,
    #[error("request is no longer accepting quotes")]
    RequestClosed { status: RequestStatus },
    #[error("quote is no longer available")]
    QuoteUnavailable { status: QuoteStatus },
    #[error("request cannot be cancelled in its current status")]
    CancelNotAllowed { status: RequestStatus },
    #[error("quote cannot be withdrawn in its current status")]
    WithdrawNotAllowed { status: QuoteStatus },
    #[error("a completed booking is awaiting payment")]
    UnpaidBooking { booking_id: BookingId },
    #[error("deposit balance is below the required minimum")]
    DepositShortfall { required: Decimal, balance: Decimal },
    #[error("the request was updated concurrently")]
    Conflict,
    #[error("storage failure: {0}")]
    Storage(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::NonPositivePrice => "invalid_price",
            Self::MissingDuration => "missing_duration",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::ProviderNotVerified => "provider_not_verified",
            Self::ProviderBusy => "provider_busy",
            Self::DuplicateQuote => "duplicate_quote",
            Self::DeadlinePassed => "deadline_passed",
            Self::RequestClosed { .. } => "request_closed",
            Self::QuoteUnavailable { .. } => "quote_unavailable",
            Self::CancelNotAllowed { .. } => "cancel_not_allowed",
            Self::WithdrawNotAllowed { .. } => "withdraw_not_allowed",
            Self::UnpaidBooking { .. } => "unpaid_booking",
            Self::DepositShortfall { .. } => "deposit_shortfall",
            Self::Conflict => "conflict",
            Self::Storage(_) => "storage_failure",
            Self::Domain(_) => "invariant_violation",
        }
    }

    /// Message safe to surface to the caller. Infrastructure detail stays in
    /// the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Domain(_) => {
                "Something went wrong on our side. Please try again.".to_owned()
            }
            other => other.to_string(),
        }
    }
}
