use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

use fixbid_core::domain::provider::{Provider, ProviderId, VerificationStatus};
use fixbid_core::domain::UserId;
use fixbid_core::geo::GeoPoint;

use super::{ProviderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProviderRepository {
    pool: DbPool,
}

impl SqlProviderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn verification_as_str(status: &VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pending => "pending",
        VerificationStatus::Verified => "verified",
        VerificationStatus::Rejected => "rejected",
    }
}

fn parse_verification(s: &str) -> VerificationStatus {
    match s {
        "verified" => VerificationStatus::Verified,
        "rejected" => VerificationStatus::Rejected,
        _ => VerificationStatus::Pending,
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

const PROVIDER_COLUMNS: &str =
    "id, user_id, name, phone, rating, skills, availability, lat, lon, verification, \
     deposit_balance";

fn row_to_provider(row: &sqlx::sqlite::SqliteRow) -> Result<Provider, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let phone: Option<String> = row.try_get("phone").map_err(decode_err)?;
    let rating: Option<f64> = row.try_get("rating").map_err(decode_err)?;
    let skills_raw: String = row.try_get("skills").map_err(decode_err)?;
    let availability: bool = row.try_get("availability").map_err(decode_err)?;
    let lat: Option<f64> = row.try_get("lat").map_err(decode_err)?;
    let lon: Option<f64> = row.try_get("lon").map_err(decode_err)?;
    let verification: String = row.try_get("verification").map_err(decode_err)?;
    let deposit_raw: String = row.try_get("deposit_balance").map_err(decode_err)?;

    let deposit_balance = Decimal::from_str(&deposit_raw).map_err(|e| {
        RepositoryError::Decode(format!("invalid deposit balance `{deposit_raw}`: {e}"))
    })?;

    Ok(Provider {
        id: ProviderId(id),
        user_id: UserId(user_id),
        name,
        phone,
        rating,
        skills: serde_json::from_str(&skills_raw).unwrap_or_default(),
        availability,
        location: match (lat, lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        },
        verification: parse_verification(&verification),
        deposit_balance,
    })
}

#[async_trait::async_trait]
impl ProviderRepository for SqlProviderRepository {
    async fn find_by_id(&self, id: &ProviderId) -> Result<Option<Provider>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PROVIDER_COLUMNS} FROM provider WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_provider(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user: &UserId) -> Result<Option<Provider>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {PROVIDER_COLUMNS} FROM provider WHERE user_id = ?"))
                .bind(&user.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_provider(r)?)),
            None => Ok(None),
        }
    }

    async fn list_available(&self) -> Result<Vec<Provider>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM provider WHERE availability = 1"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_provider).collect()
    }

    async fn save(&self, provider: Provider) -> Result<(), RepositoryError> {
        let skills = serde_json::to_string(&provider.skills).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO provider (id, user_id, name, phone, rating, skills, availability, \
                 lat, lon, verification, deposit_balance) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 name = excluded.name, \
                 phone = excluded.phone, \
                 rating = excluded.rating, \
                 skills = excluded.skills, \
                 availability = excluded.availability, \
                 lat = excluded.lat, \
                 lon = excluded.lon, \
                 verification = excluded.verification, \
                 deposit_balance = excluded.deposit_balance",
        )
        .bind(&provider.id.0)
        .bind(&provider.user_id.0)
        .bind(&provider.name)
        .bind(&provider.phone)
        .bind(provider.rating)
        .bind(skills)
        .bind(provider.availability)
        .bind(provider.location.map(|p| p.lat))
        .bind(provider.location.map(|p| p.lon))
        .bind(verification_as_str(&provider.verification))
        .bind(provider.deposit_balance.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use fixbid_core::domain::provider::{Provider, ProviderId, VerificationStatus};
    use fixbid_core::domain::UserId;
    use fixbid_core::geo::GeoPoint;

    use crate::repositories::ProviderRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlProviderRepository;

    #[tokio::test]
    async fn save_and_lookup_by_user() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlProviderRepository::new(pool);

        let provider = Provider {
            id: ProviderId("prov-1".to_string()),
            user_id: UserId("user-9".to_string()),
            name: "Ravi Kumar".to_string(),
            phone: Some("+91-9876500000".to_string()),
            rating: Some(4.8),
            skills: vec!["plumber".to_string(), "electrician".to_string()],
            availability: true,
            location: Some(GeoPoint::new(28.6315, 77.2167)),
            verification: VerificationStatus::Verified,
            deposit_balance: Decimal::new(750, 0),
        };

        repo.save(provider.clone()).await.expect("save");
        let found = repo
            .find_by_user(&UserId("user-9".to_string()))
            .await
            .expect("find")
            .expect("present");

        assert_eq!(found, provider);
        assert_eq!(repo.list_available().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn unavailable_providers_are_excluded_from_the_pool() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlProviderRepository::new(pool);

        let mut provider = Provider {
            id: ProviderId("prov-1".to_string()),
            user_id: UserId("user-9".to_string()),
            name: "Ravi Kumar".to_string(),
            phone: None,
            rating: None,
            skills: Vec::new(),
            availability: false,
            location: None,
            verification: VerificationStatus::Pending,
            deposit_balance: Decimal::ZERO,
        };
        repo.save(provider.clone()).await.expect("save");
        assert!(repo.list_available().await.expect("list").is_empty());

        provider.availability = true;
        repo.save(provider).await.expect("update");
        assert_eq!(repo.list_available().await.expect("list").len(), 1);
    }
}
