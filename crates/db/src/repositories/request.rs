use chrono::{DateTime, Utc};
use sqlx::Row;

use fixbid_core::domain::booking::BookingId;
use fixbid_core::domain::quote::QuoteId;
use fixbid_core::domain::request::{RequestStatus, ServiceRequest, ServiceRequestId, Urgency};
use fixbid_core::domain::UserId;
use fixbid_core::geo::GeoPoint;

use super::{RepositoryError, ServiceRequestRepository};
use crate::DbPool;

pub struct SqlServiceRequestRepository {
    pool: DbPool,
}

impl SqlServiceRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn request_status_as_str(status: &RequestStatus) -> &'static str {
    match status {
        RequestStatus::Open => "open",
        RequestStatus::QuotesReceived => "quotes_received",
        RequestStatus::QuoteSelected => "quote_selected",
        RequestStatus::InProgress => "in_progress",
        RequestStatus::Completed => "completed",
        RequestStatus::Cancelled => "cancelled",
    }
}

fn parse_request_status(s: &str) -> RequestStatus {
    match s {
        "quotes_received" => RequestStatus::QuotesReceived,
        "quote_selected" => RequestStatus::QuoteSelected,
        "in_progress" => RequestStatus::InProgress,
        "completed" => RequestStatus::Completed,
        "cancelled" => RequestStatus::Cancelled,
        _ => RequestStatus::Open,
    }
}

fn parse_urgency(s: &str) -> Urgency {
    match s {
        "emergency" => Urgency::Emergency,
        "urgent" => Urgency::Urgent,
        "flexible" => Urgency::Flexible,
        _ => Urgency::Normal,
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

const REQUEST_COLUMNS: &str = "id, requester, category, title, description, images, \
     voice_note_url, lat, lon, address, urgency, preferred_date, preferred_time_slot, \
     status, selected_quote, final_booking, created_at, quote_deadline, expires_at";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let requester: String = row.try_get("requester").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let description: String = row.try_get("description").map_err(decode_err)?;
    let images_raw: String = row.try_get("images").map_err(decode_err)?;
    let voice_note_url: Option<String> = row.try_get("voice_note_url").map_err(decode_err)?;
    let lat: f64 = row.try_get("lat").map_err(decode_err)?;
    let lon: f64 = row.try_get("lon").map_err(decode_err)?;
    let address: String = row.try_get("address").map_err(decode_err)?;
    let urgency: String = row.try_get("urgency").map_err(decode_err)?;
    let preferred_date: Option<String> = row.try_get("preferred_date").map_err(decode_err)?;
    let preferred_time_slot: Option<String> =
        row.try_get("preferred_time_slot").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let selected_quote: Option<String> = row.try_get("selected_quote").map_err(decode_err)?;
    let final_booking: Option<String> = row.try_get("final_booking").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let quote_deadline: String = row.try_get("quote_deadline").map_err(decode_err)?;
    let expires_at: String = row.try_get("expires_at").map_err(decode_err)?;

    Ok(ServiceRequest {
        id: ServiceRequestId(id),
        requester: UserId(requester),
        category,
        title,
        description,
        images: serde_json::from_str(&images_raw).unwrap_or_default(),
        voice_note_url,
        location: GeoPoint::new(lat, lon),
        address,
        urgency: parse_urgency(&urgency),
        preferred_date: preferred_date
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        preferred_time_slot,
        status: parse_request_status(&status),
        selected_quote: selected_quote.map(QuoteId),
        final_booking: final_booking.map(BookingId),
        created_at: parse_timestamp(&created_at),
        quote_deadline: parse_timestamp(&quote_deadline),
        expires_at: parse_timestamp(&expires_at),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait::async_trait]
impl ServiceRequestRepository for SqlServiceRequestRepository {
    async fn create(&self, request: ServiceRequest) -> Result<(), RepositoryError> {
        let images = serde_json::to_string(&request.images).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO service_request (id, requester, category, title, description, images, \
                 voice_note_url, lat, lon, address, urgency, preferred_date, preferred_time_slot, \
                 status, selected_quote, final_booking, created_at, quote_deadline, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.requester.0)
        .bind(&request.category)
        .bind(&request.title)
        .bind(&request.description)
        .bind(images)
        .bind(&request.voice_note_url)
        .bind(request.location.lat)
        .bind(request.location.lon)
        .bind(&request.address)
        .bind(request.urgency.as_str())
        .bind(request.preferred_date.map(|dt| dt.to_rfc3339()))
        .bind(&request.preferred_time_slot)
        .bind(request_status_as_str(&request.status))
        .bind(request.selected_quote.as_ref().map(|q| q.0.clone()))
        .bind(request.final_booking.as_ref().map(|b| b.0.clone()))
        .bind(request.created_at.to_rfc3339())
        .bind(request.quote_deadline.to_rfc3339())
        .bind(request.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ServiceRequestId,
    ) -> Result<Option<ServiceRequest>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM service_request WHERE id = ?"))
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(
        &self,
        user: &UserId,
        limit: Option<i64>,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM service_request WHERE requester = ? \
             ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(&user.0)
        .bind(limit.unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect()
    }

    async fn list_accepting_quotes(&self) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM service_request \
             WHERE status IN ('open', 'quotes_received') ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect()
    }

    async fn mark_quotes_received(&self, id: &ServiceRequestId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE service_request SET status = 'quotes_received' \
             WHERE id = ? AND status = 'open'",
        )
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn select_for_booking(
        &self,
        id: &ServiceRequestId,
        quote: &QuoteId,
        booking: &BookingId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE service_request \
             SET status = 'quote_selected', selected_quote = ?, final_booking = ? \
             WHERE id = ? AND status IN ('open', 'quotes_received') AND selected_quote IS NULL",
        )
        .bind(&quote.0)
        .bind(&booking.0)
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_cancelled(&self, id: &ServiceRequestId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE service_request SET status = 'cancelled' \
             WHERE id = ? AND status NOT IN ('completed', 'cancelled', 'quote_selected')",
        )
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use fixbid_core::domain::booking::BookingId;
    use fixbid_core::domain::quote::QuoteId;
    use fixbid_core::domain::request::{RequestStatus, ServiceRequest, ServiceRequestId, Urgency};
    use fixbid_core::domain::UserId;
    use fixbid_core::geo::GeoPoint;

    use crate::repositories::ServiceRequestRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlServiceRequestRepository;

    async fn repo() -> SqlServiceRequestRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlServiceRequestRepository::new(pool)
    }

    fn request(id: &str) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: ServiceRequestId(id.to_string()),
            requester: UserId("user-1".to_string()),
            category: "plumber".to_string(),
            title: "Bathroom Leak Repair".to_string(),
            description: "Water leaking from bathroom tap".to_string(),
            images: vec!["/uploads/tap.jpg".to_string()],
            voice_note_url: None,
            location: GeoPoint::new(28.6315, 77.2167),
            address: "Connaught Place, New Delhi".to_string(),
            urgency: Urgency::Emergency,
            preferred_date: Some(now + Duration::hours(6)),
            preferred_time_slot: Some("afternoon".to_string()),
            status: RequestStatus::Open,
            selected_quote: None,
            final_booking: None,
            created_at: now,
            quote_deadline: now + Duration::minutes(10),
            expires_at: now + Duration::days(7),
        }
    }

    #[tokio::test]
    async fn create_and_find_round_trip() {
        let repo = repo().await;
        let req = request("req-1");

        repo.create(req.clone()).await.expect("create");
        let found = repo.find_by_id(&req.id).await.expect("find").expect("present");

        assert_eq!(found.id, req.id);
        assert_eq!(found.category, "plumber");
        assert_eq!(found.images, req.images);
        assert_eq!(found.urgency, Urgency::Emergency);
        assert_eq!(found.status, RequestStatus::Open);
    }

    #[tokio::test]
    async fn selection_cas_admits_exactly_one_winner() {
        let repo = repo().await;
        let req = request("req-1");
        repo.create(req.clone()).await.expect("create");

        let first = repo
            .select_for_booking(
                &req.id,
                &QuoteId("q-1".to_string()),
                &BookingId("b-1".to_string()),
            )
            .await
            .expect("first cas");
        let second = repo
            .select_for_booking(
                &req.id,
                &QuoteId("q-2".to_string()),
                &BookingId("b-2".to_string()),
            )
            .await
            .expect("second cas");

        assert!(first);
        assert!(!second);

        let found = repo.find_by_id(&req.id).await.expect("find").expect("present");
        assert_eq!(found.status, RequestStatus::QuoteSelected);
        assert_eq!(found.selected_quote, Some(QuoteId("q-1".to_string())));
        assert_eq!(found.final_booking, Some(BookingId("b-1".to_string())));
    }

    #[tokio::test]
    async fn cancellation_cas_rejects_selected_requests() {
        let repo = repo().await;
        let req = request("req-1");
        repo.create(req.clone()).await.expect("create");

        repo.select_for_booking(&req.id, &QuoteId("q-1".to_string()), &BookingId("b-1".to_string()))
            .await
            .expect("select");

        let cancelled = repo.mark_cancelled(&req.id).await.expect("cancel cas");
        assert!(!cancelled);
    }

    #[tokio::test]
    async fn mark_quotes_received_only_moves_open_requests() {
        let repo = repo().await;
        let req = request("req-1");
        repo.create(req.clone()).await.expect("create");

        repo.mark_quotes_received(&req.id).await.expect("first");
        repo.mark_quotes_received(&req.id).await.expect("second is a no-op");

        let found = repo.find_by_id(&req.id).await.expect("find").expect("present");
        assert_eq!(found.status, RequestStatus::QuotesReceived);
    }
}
