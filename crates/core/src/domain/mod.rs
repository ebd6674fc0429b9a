use serde::{Deserialize, Serialize};

pub mod booking;
pub mod notification;
pub mod provider;
pub mod quote;
pub mod request;
pub mod service;
pub mod wallet;

/// Identity of an account in the external auth system. Requesters are
/// addressed by user id; providers additionally carry a profile id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
