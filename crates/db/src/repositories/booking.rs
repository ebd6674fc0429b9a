use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;

use fixbid_core::domain::booking::{Booking, BookingId, BookingStatus, PaymentStatus};
use fixbid_core::domain::provider::ProviderId;
use fixbid_core::domain::service::ServiceId;
use fixbid_core::domain::UserId;
use fixbid_core::geo::GeoPoint;

use super::{BookingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_booking_status(s: &str) -> BookingStatus {
    match s {
        "Accepted" => BookingStatus::Accepted,
        "Rejected" => BookingStatus::Rejected,
        "In Progress" => BookingStatus::InProgress,
        "Completed" => BookingStatus::Completed,
        "Cancelled" => BookingStatus::Cancelled,
        _ => BookingStatus::Pending,
    }
}

fn parse_payment_status(s: &str) -> PaymentStatus {
    match s {
        "Success" => PaymentStatus::Success,
        "Failed" => PaymentStatus::Failed,
        "Refunded" => PaymentStatus::Refunded,
        _ => PaymentStatus::Pending,
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

const BOOKING_COLUMNS: &str =
    "id, user_id, provider_id, provider_user_id, service_id, status, scheduled_time, price, \
     lat, lon, notes, service_name, provider_name, has_payment, payment_status, created_at";

fn row_to_booking(row: &sqlx::sqlite::SqliteRow) -> Result<Booking, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let provider_id: String = row.try_get("provider_id").map_err(decode_err)?;
    let provider_user_id: String = row.try_get("provider_user_id").map_err(decode_err)?;
    let service_id: String = row.try_get("service_id").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let scheduled_time: Option<String> = row.try_get("scheduled_time").map_err(decode_err)?;
    let price_raw: String = row.try_get("price").map_err(decode_err)?;
    let lat: Option<f64> = row.try_get("lat").map_err(decode_err)?;
    let lon: Option<f64> = row.try_get("lon").map_err(decode_err)?;
    let notes: Option<String> = row.try_get("notes").map_err(decode_err)?;
    let service_name: String = row.try_get("service_name").map_err(decode_err)?;
    let provider_name: String = row.try_get("provider_name").map_err(decode_err)?;
    let has_payment: bool = row.try_get("has_payment").map_err(decode_err)?;
    let payment_status: String = row.try_get("payment_status").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    let price = Decimal::from_str(&price_raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid price `{price_raw}`: {e}")))?;

    Ok(Booking {
        id: BookingId(id),
        user_id: UserId(user_id),
        provider_id: ProviderId(provider_id),
        provider_user_id: UserId(provider_user_id),
        service_id: ServiceId(service_id),
        status: parse_booking_status(&status),
        scheduled_time: scheduled_time
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        price,
        location: match (lat, lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        },
        notes,
        service_name,
        provider_name,
        has_payment,
        payment_status: parse_payment_status(&payment_status),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn create(&self, booking: Booking) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO booking (id, user_id, provider_id, provider_user_id, service_id, \
                 status, scheduled_time, price, lat, lon, notes, service_name, provider_name, \
                 has_payment, payment_status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&booking.id.0)
        .bind(&booking.user_id.0)
        .bind(&booking.provider_id.0)
        .bind(&booking.provider_user_id.0)
        .bind(&booking.service_id.0)
        .bind(booking.status.as_str())
        .bind(booking.scheduled_time.map(|dt| dt.to_rfc3339()))
        .bind(booking.price.to_string())
        .bind(booking.location.map(|p| p.lat))
        .bind(booking.location.map(|p| p.lon))
        .bind(&booking.notes)
        .bind(&booking.service_name)
        .bind(&booking.provider_name)
        .bind(booking.has_payment)
        .bind(booking.payment_status.as_str())
        .bind(booking.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_booking(r)?)),
            None => Ok(None),
        }
    }

    async fn find_unpaid_completed(
        &self,
        user: &UserId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM booking \
             WHERE user_id = ? AND status = 'Completed' AND payment_status != 'Success' \
             ORDER BY created_at LIMIT 1"
        ))
        .bind(&user.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_booking(r)?)),
            None => Ok(None),
        }
    }

    async fn provider_has_booking_in(
        &self,
        provider: &ProviderId,
        statuses: &[BookingStatus],
    ) -> Result<bool, RepositoryError> {
        if statuses.is_empty() {
            return Ok(false);
        }

        let mut builder =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM booking WHERE provider_id = ");
        builder.push_bind(&provider.0);
        builder.push(" AND status IN (");
        let mut separated = builder.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");

        let count: i64 = builder.build().fetch_one(&self.pool).await?.get("count");
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use fixbid_core::domain::booking::{Booking, BookingId, BookingStatus, PaymentStatus};
    use fixbid_core::domain::provider::ProviderId;
    use fixbid_core::domain::service::ServiceId;
    use fixbid_core::domain::UserId;

    use crate::repositories::BookingRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlBookingRepository;

    async fn repo() -> SqlBookingRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlBookingRepository::new(pool)
    }

    fn booking(id: &str, status: BookingStatus, payment: PaymentStatus) -> Booking {
        Booking {
            id: BookingId(id.to_string()),
            user_id: UserId("user-1".to_string()),
            provider_id: ProviderId("prov-1".to_string()),
            provider_user_id: UserId("user-9".to_string()),
            service_id: ServiceId("svc-1".to_string()),
            status,
            scheduled_time: None,
            price: Decimal::new(50_000, 2),
            location: None,
            notes: None,
            service_name: "Plumber Service".to_string(),
            provider_name: "Ravi Kumar".to_string(),
            has_payment: false,
            payment_status: payment,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unpaid_completed_booking_is_surfaced() {
        let repo = repo().await;
        repo.create(booking("b-1", BookingStatus::Completed, PaymentStatus::Pending))
            .await
            .expect("create");
        repo.create(booking("b-2", BookingStatus::Completed, PaymentStatus::Success))
            .await
            .expect("create");

        let unpaid = repo
            .find_unpaid_completed(&UserId("user-1".to_string()))
            .await
            .expect("query")
            .expect("present");
        assert_eq!(unpaid.id, BookingId("b-1".to_string()));
    }

    #[tokio::test]
    async fn busy_check_matches_only_the_given_statuses() {
        let repo = repo().await;
        repo.create(booking("b-1", BookingStatus::Completed, PaymentStatus::Success))
            .await
            .expect("create");
        repo.create(booking("b-2", BookingStatus::InProgress, PaymentStatus::Pending))
            .await
            .expect("create");

        let provider = ProviderId("prov-1".to_string());
        let busy = repo
            .provider_has_booking_in(&provider, &[BookingStatus::Accepted, BookingStatus::InProgress])
            .await
            .expect("query");
        assert!(busy);

        let pending_only = repo
            .provider_has_booking_in(&provider, &[BookingStatus::Pending])
            .await
            .expect("query");
        assert!(!pending_only);
    }
}
