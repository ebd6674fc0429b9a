use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row};

use fixbid_core::domain::notification::{NotificationId, NotificationKind, ProviderNotification};
use fixbid_core::domain::provider::ProviderId;
use fixbid_core::domain::request::ServiceRequestId;

use super::{NotificationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_kind(s: &str) -> NotificationKind {
    match s {
        "quote_selected" => NotificationKind::QuoteSelected,
        "quote_rejected" => NotificationKind::QuoteRejected,
        "request_cancelled" => NotificationKind::RequestCancelled,
        "quote_cancelled" => NotificationKind::QuoteCancelled,
        _ => NotificationKind::NewRequest,
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

const NOTIFICATION_COLUMNS: &str =
    "id, provider_id, request_id, kind, title, message, is_read, is_sent, created_at, read_at";

fn row_to_notification(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProviderNotification, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let provider_id: String = row.try_get("provider_id").map_err(decode_err)?;
    let request_id: String = row.try_get("request_id").map_err(decode_err)?;
    let kind: String = row.try_get("kind").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let message: String = row.try_get("message").map_err(decode_err)?;
    let is_read: bool = row.try_get("is_read").map_err(decode_err)?;
    let is_sent: bool = row.try_get("is_sent").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;
    let read_at: Option<String> = row.try_get("read_at").map_err(decode_err)?;

    Ok(ProviderNotification {
        id: NotificationId(id),
        provider_id: ProviderId(provider_id),
        request_id: ServiceRequestId(request_id),
        kind: parse_kind(&kind),
        title,
        message,
        is_read,
        is_sent,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        read_at: read_at
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn create(&self, notification: ProviderNotification) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO provider_notification (id, provider_id, request_id, kind, title, \
                 message, is_read, is_sent, created_at, read_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id.0)
        .bind(&notification.provider_id.0)
        .bind(&notification.request_id.0)
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.is_sent)
        .bind(notification.created_at.to_rfc3339())
        .bind(notification.read_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_provider(
        &self,
        provider: &ProviderId,
        kinds: &[NotificationKind],
        limit: i64,
    ) -> Result<Vec<ProviderNotification>, RepositoryError> {
        let mut builder = QueryBuilder::new(format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM provider_notification WHERE provider_id = "
        ));
        builder.push_bind(&provider.0);

        if !kinds.is_empty() {
            builder.push(" AND kind IN (");
            let mut separated = builder.separated(", ");
            for kind in kinds {
                separated.push_bind(kind.as_str());
            }
            separated.push_unseparated(")");
        }

        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_notification).collect()
    }

    async fn list_for_request(
        &self,
        request: &ServiceRequestId,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<ProviderNotification>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = match kind {
            Some(kind) => {
                sqlx::query(&format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM provider_notification \
                     WHERE request_id = ? AND kind = ? ORDER BY created_at"
                ))
                .bind(&request.0)
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {NOTIFICATION_COLUMNS} FROM provider_notification \
                     WHERE request_id = ? ORDER BY created_at"
                ))
                .bind(&request.0)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(
        &self,
        provider: &ProviderId,
        request: &ServiceRequestId,
        kind: NotificationKind,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE provider_notification SET is_read = 1, read_at = ? \
             WHERE provider_id = ? AND request_id = ? AND kind = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&provider.0)
        .bind(&request.0)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_request(
        &self,
        request: &ServiceRequestId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM provider_notification WHERE request_id = ?")
            .bind(&request.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_for_request_except(
        &self,
        request: &ServiceRequestId,
        keep: &ProviderId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM provider_notification WHERE request_id = ? AND provider_id != ?",
        )
        .bind(&request.0)
        .bind(&keep.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_for_provider_request(
        &self,
        provider: &ProviderId,
        request: &ServiceRequestId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM provider_notification WHERE provider_id = ? AND request_id = ?",
        )
        .bind(&provider.0)
        .bind(&request.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use fixbid_core::domain::notification::{
        NotificationId, NotificationKind, ProviderNotification,
    };
    use fixbid_core::domain::provider::ProviderId;
    use fixbid_core::domain::request::ServiceRequestId;

    use crate::repositories::NotificationRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlNotificationRepository;

    async fn repo() -> SqlNotificationRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlNotificationRepository::new(pool)
    }

    fn notification(id: &str, provider: &str, kind: NotificationKind) -> ProviderNotification {
        ProviderNotification {
            id: NotificationId(id.to_string()),
            provider_id: ProviderId(provider.to_string()),
            request_id: ServiceRequestId("req-1".to_string()),
            kind,
            title: "New Plumber Request".to_string(),
            message: "New service request near you".to_string(),
            is_read: false,
            is_sent: true,
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[tokio::test]
    async fn inbox_filters_by_kind_and_orders_newest_first() {
        let repo = repo().await;
        repo.create(notification("n-1", "prov-1", NotificationKind::NewRequest))
            .await
            .expect("create");
        repo.create(notification("n-2", "prov-1", NotificationKind::RequestCancelled))
            .await
            .expect("create");

        let inbox = repo
            .list_for_provider(
                &ProviderId("prov-1".to_string()),
                &[NotificationKind::NewRequest, NotificationKind::QuoteSelected],
                50,
            )
            .await
            .expect("list");

        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::NewRequest);
    }

    #[tokio::test]
    async fn delete_except_spares_the_selected_provider() {
        let repo = repo().await;
        repo.create(notification("n-1", "prov-1", NotificationKind::NewRequest))
            .await
            .expect("create");
        repo.create(notification("n-2", "prov-2", NotificationKind::NewRequest))
            .await
            .expect("create");

        let deleted = repo
            .delete_for_request_except(
                &ServiceRequestId("req-1".to_string()),
                &ProviderId("prov-1".to_string()),
            )
            .await
            .expect("delete");

        assert_eq!(deleted, 1);
        let survivors = repo
            .list_for_request(&ServiceRequestId("req-1".to_string()), None)
            .await
            .expect("list");
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].provider_id, ProviderId("prov-1".to_string()));
    }

    #[tokio::test]
    async fn mark_read_sets_read_at() {
        let repo = repo().await;
        repo.create(notification("n-1", "prov-1", NotificationKind::NewRequest))
            .await
            .expect("create");

        repo.mark_read(
            &ProviderId("prov-1".to_string()),
            &ServiceRequestId("req-1".to_string()),
            NotificationKind::NewRequest,
        )
        .await
        .expect("mark read");

        let inbox = repo
            .list_for_provider(&ProviderId("prov-1".to_string()), &[], 50)
            .await
            .expect("list");
        assert!(inbox[0].is_read);
        assert!(inbox[0].read_at.is_some());
    }
}
