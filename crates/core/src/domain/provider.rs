use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::ProviderSnapshot;
use crate::domain::UserId;
use crate::geo::GeoPoint;

/// Rating assumed for a provider who has not been rated yet.
pub const DEFAULT_PROVIDER_RATING: f64 = 5.0;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub String);

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

/// A service provider's profile. Owned by the account-management side of the
/// system; the quoting workflow only reads it for eligibility checks and
/// snapshot fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub name: String,
    pub phone: Option<String>,
    pub rating: Option<f64>,
    pub skills: Vec<String>,
    pub availability: bool,
    pub location: Option<GeoPoint>,
    pub verification: VerificationStatus,
    pub deposit_balance: Decimal,
}

impl Provider {
    pub fn is_verified(&self) -> bool {
        self.verification == VerificationStatus::Verified
    }

    /// Captures the fields a quote denormalizes at submission time.
    pub fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            name: self.name.clone(),
            rating: self.rating.unwrap_or(DEFAULT_PROVIDER_RATING),
            phone: self.phone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::UserId;
    use crate::geo::GeoPoint;

    use super::{Provider, ProviderId, VerificationStatus, DEFAULT_PROVIDER_RATING};

    fn provider() -> Provider {
        Provider {
            id: ProviderId("prov-1".to_string()),
            user_id: UserId("user-9".to_string()),
            name: "Ravi Kumar".to_string(),
            phone: None,
            rating: None,
            skills: vec!["plumber".to_string()],
            availability: true,
            location: Some(GeoPoint::new(28.6315, 77.2167)),
            verification: VerificationStatus::Pending,
            deposit_balance: Decimal::ZERO,
        }
    }

    #[test]
    fn only_verified_status_counts_as_verified() {
        let mut p = provider();
        assert!(!p.is_verified());

        p.verification = VerificationStatus::Verified;
        assert!(p.is_verified());

        p.verification = VerificationStatus::Rejected;
        assert!(!p.is_verified());
    }

    #[test]
    fn snapshot_defaults_missing_rating() {
        let snapshot = provider().snapshot();
        assert_eq!(snapshot.rating, DEFAULT_PROVIDER_RATING);
        assert_eq!(snapshot.name, "Ravi Kumar");
        assert_eq!(snapshot.phone, None);
    }
}
