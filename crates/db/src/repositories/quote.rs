use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

use fixbid_core::domain::provider::ProviderId;
use fixbid_core::domain::quote::{ProviderQuote, ProviderSnapshot, QuoteId, QuoteStatus};
use fixbid_core::domain::request::ServiceRequestId;

use super::{QuoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn quote_status_as_str(status: &QuoteStatus) -> &'static str {
    match status {
        QuoteStatus::Submitted => "submitted",
        QuoteStatus::Selected => "selected",
        QuoteStatus::Rejected => "rejected",
        QuoteStatus::Expired => "expired",
        QuoteStatus::Cancelled => "cancelled",
    }
}

fn parse_quote_status(s: &str) -> QuoteStatus {
    match s {
        "selected" => QuoteStatus::Selected,
        "rejected" => QuoteStatus::Rejected,
        "expired" => QuoteStatus::Expired,
        "cancelled" => QuoteStatus::Cancelled,
        _ => QuoteStatus::Submitted,
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

const QUOTE_COLUMNS: &str = "id, request_id, provider_id, price, currency, estimated_duration, \
     notes, images, status, submitted_at, expires_at, provider_name, provider_rating, \
     provider_phone";

fn row_to_quote(row: &sqlx::sqlite::SqliteRow) -> Result<ProviderQuote, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let request_id: String = row.try_get("request_id").map_err(decode_err)?;
    let provider_id: String = row.try_get("provider_id").map_err(decode_err)?;
    let price_raw: String = row.try_get("price").map_err(decode_err)?;
    let currency: String = row.try_get("currency").map_err(decode_err)?;
    let estimated_duration: String = row.try_get("estimated_duration").map_err(decode_err)?;
    let notes: Option<String> = row.try_get("notes").map_err(decode_err)?;
    let images_raw: String = row.try_get("images").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let submitted_at: String = row.try_get("submitted_at").map_err(decode_err)?;
    let expires_at: Option<String> = row.try_get("expires_at").map_err(decode_err)?;
    let provider_name: String = row.try_get("provider_name").map_err(decode_err)?;
    let provider_rating: f64 = row.try_get("provider_rating").map_err(decode_err)?;
    let provider_phone: Option<String> = row.try_get("provider_phone").map_err(decode_err)?;

    let price = Decimal::from_str(&price_raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid price `{price_raw}`: {e}")))?;

    Ok(ProviderQuote {
        id: QuoteId(id),
        request_id: ServiceRequestId(request_id),
        provider_id: ProviderId(provider_id),
        price,
        currency,
        estimated_duration,
        notes,
        images: serde_json::from_str(&images_raw).unwrap_or_default(),
        status: parse_quote_status(&status),
        submitted_at: DateTime::parse_from_rfc3339(&submitted_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        expires_at: expires_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        snapshot: ProviderSnapshot {
            name: provider_name,
            rating: provider_rating,
            phone: provider_phone,
        },
    })
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn create(&self, quote: ProviderQuote) -> Result<(), RepositoryError> {
        let images = serde_json::to_string(&quote.images).unwrap_or_else(|_| "[]".to_string());

        sqlx::query(
            "INSERT INTO provider_quote (id, request_id, provider_id, price, currency, \
                 estimated_duration, notes, images, status, submitted_at, expires_at, \
                 provider_name, provider_rating, provider_phone) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&quote.id.0)
        .bind(&quote.request_id.0)
        .bind(&quote.provider_id.0)
        .bind(quote.price.to_string())
        .bind(&quote.currency)
        .bind(&quote.estimated_duration)
        .bind(&quote.notes)
        .bind(images)
        .bind(quote_status_as_str(&quote.status))
        .bind(quote.submitted_at.to_rfc3339())
        .bind(quote.expires_at.map(|dt| dt.to_rfc3339()))
        .bind(&quote.snapshot.name)
        .bind(quote.snapshot.rating)
        .bind(&quote.snapshot.phone)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<ProviderQuote>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {QUOTE_COLUMNS} FROM provider_quote WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_quote(r)?)),
            None => Ok(None),
        }
    }

    async fn find_active_for_provider(
        &self,
        request: &ServiceRequestId,
        provider: &ProviderId,
    ) -> Result<Option<ProviderQuote>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM provider_quote \
             WHERE request_id = ? AND provider_id = ? AND status != 'cancelled' LIMIT 1"
        ))
        .bind(&request.0)
        .bind(&provider.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_quote(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM provider_quote \
             WHERE request_id = ? ORDER BY submitted_at"
        ))
        .bind(&request.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_quote).collect()
    }

    async fn update_status(
        &self,
        id: &QuoteId,
        status: QuoteStatus,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE provider_quote SET status = ? WHERE id = ?")
            .bind(quote_status_as_str(&status))
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn reject_other_submitted(
        &self,
        request: &ServiceRequestId,
        winner: &QuoteId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM provider_quote \
             WHERE request_id = ? AND id != ? AND status = 'submitted'"
        ))
        .bind(&request.0)
        .bind(&winner.0)
        .fetch_all(&self.pool)
        .await?;

        let losers: Vec<ProviderQuote> =
            rows.iter().map(row_to_quote).collect::<Result<_, _>>()?;

        sqlx::query(
            "UPDATE provider_quote SET status = 'rejected' \
             WHERE request_id = ? AND id != ? AND status = 'submitted'",
        )
        .bind(&request.0)
        .bind(&winner.0)
        .execute(&self.pool)
        .await?;

        Ok(losers)
    }

    async fn cancel_submitted_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<Vec<ProviderQuote>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {QUOTE_COLUMNS} FROM provider_quote \
             WHERE request_id = ? AND status = 'submitted'"
        ))
        .bind(&request.0)
        .fetch_all(&self.pool)
        .await?;

        let affected: Vec<ProviderQuote> =
            rows.iter().map(row_to_quote).collect::<Result<_, _>>()?;

        sqlx::query(
            "UPDATE provider_quote SET status = 'cancelled' \
             WHERE request_id = ? AND status = 'submitted'",
        )
        .bind(&request.0)
        .execute(&self.pool)
        .await?;

        Ok(affected)
    }
}
