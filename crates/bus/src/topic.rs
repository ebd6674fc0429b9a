use fixbid_core::{BookingId, ProviderId, UserId};

/// A named channel on the push bus. Connected clients subscribe to the
/// rendered channel string; the sum type exists so the rest of the codebase
/// can never misspell one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A specific provider's private channel.
    Provider(ProviderId),
    /// A specific requester's private channel.
    User(UserId),
    /// Per-booking chat/status channel.
    Booking(BookingId),
    /// Broadcast channel every provider client joins on connect.
    AllProviders,
}

impl Topic {
    /// Wire-level channel name. The exact strings are a compatibility
    /// contract with deployed clients.
    pub fn channel(&self) -> String {
        match self {
            Self::Provider(id) => format!("provider_{id}"),
            Self::User(id) => format!("user_{id}"),
            Self::Booking(id) => format!("booking_{id}"),
            Self::AllProviders => "all_providers".to_string(),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.channel())
    }
}
