use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "provider",
        "service_request",
        "provider_quote",
        "provider_notification",
        "service",
        "booking",
        "wallet_account",
        "wallet_entry",
        "idx_provider_user_id",
        "idx_provider_availability",
        "idx_service_request_requester",
        "idx_service_request_category",
        "idx_service_request_status",
        "idx_service_request_created_at",
        "idx_provider_quote_request_id",
        "idx_provider_quote_provider_id",
        "idx_provider_quote_status",
        "idx_provider_quote_submitted_at",
        "idx_provider_notification_provider_id",
        "idx_provider_notification_request_id",
        "idx_provider_notification_is_read",
        "idx_provider_notification_created_at",
        "idx_service_category",
        "idx_booking_user_id",
        "idx_booking_provider_id",
        "idx_booking_status",
        "idx_wallet_entry_user_id",
        "idx_wallet_entry_created_at",
    ];

    #[tokio::test]
    async fn migrations_create_every_managed_object() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master \
                 WHERE type IN ('table', 'index') AND name = ?",
            )
            .bind(object)
            .fetch_one(&pool)
            .await
            .expect("query sqlite_master")
            .get::<i64, _>("count");

            assert_eq!(count, 1, "missing schema object `{object}`");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");
    }
}
