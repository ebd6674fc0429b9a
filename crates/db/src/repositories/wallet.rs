use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

use fixbid_core::domain::wallet::{WalletDirection, WalletEntry, WalletEntryId};
use fixbid_core::domain::UserId;

use super::{RepositoryError, WalletRepository};
use crate::DbPool;

pub struct SqlWalletRepository {
    pool: DbPool,
}

impl SqlWalletRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_direction(s: &str) -> WalletDirection {
    match s {
        "debit" => WalletDirection::Debit,
        _ => WalletDirection::Credit,
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn parse_amount(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid amount `{raw}`: {e}")))
}

const ENTRY_COLUMNS: &str =
    "id, user_id, amount, direction, source, description, balance_after, external_reference, \
     created_at";

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<WalletEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let user_id: String = row.try_get("user_id").map_err(decode_err)?;
    let amount_raw: String = row.try_get("amount").map_err(decode_err)?;
    let direction: String = row.try_get("direction").map_err(decode_err)?;
    let source: String = row.try_get("source").map_err(decode_err)?;
    let description: String = row.try_get("description").map_err(decode_err)?;
    let balance_after_raw: String = row.try_get("balance_after").map_err(decode_err)?;
    let external_reference: Option<String> =
        row.try_get("external_reference").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(WalletEntry {
        id: WalletEntryId(id),
        user_id: UserId(user_id),
        amount: parse_amount(&amount_raw)?,
        direction: parse_direction(&direction),
        source,
        description,
        balance_after: parse_amount(&balance_after_raw)?,
        external_reference,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait::async_trait]
impl WalletRepository for SqlWalletRepository {
    async fn balance(&self, user: &UserId) -> Result<Decimal, RepositoryError> {
        let row = sqlx::query("SELECT balance FROM wallet_account WHERE user_id = ?")
            .bind(&user.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => {
                let raw: String = r.try_get("balance").map_err(decode_err)?;
                parse_amount(&raw)
            }
            None => Ok(Decimal::ZERO),
        }
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<WalletEntry>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM wallet_entry WHERE external_reference = ?"
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_entry(r)?)),
            None => Ok(None),
        }
    }

    async fn record(&self, entry: WalletEntry) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO wallet_entry (id, user_id, amount, direction, source, description, \
                 balance_after, external_reference, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id.0)
        .bind(&entry.user_id.0)
        .bind(entry.amount.to_string())
        .bind(entry.direction.as_str())
        .bind(&entry.source)
        .bind(&entry.description)
        .bind(entry.balance_after.to_string())
        .bind(&entry.external_reference)
        .bind(entry.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO wallet_account (user_id, balance) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET balance = excluded.balance",
        )
        .bind(&entry.user_id.0)
        .bind(entry.balance_after.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn entries_for_user(&self, user: &UserId) -> Result<Vec<WalletEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM wallet_entry WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(&user.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use fixbid_core::domain::wallet::{WalletDirection, WalletEntry, WalletEntryId};
    use fixbid_core::domain::UserId;

    use crate::repositories::WalletRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlWalletRepository;

    fn entry(id: &str, balance_after: Decimal, reference: Option<&str>) -> WalletEntry {
        WalletEntry {
            id: WalletEntryId(id.to_string()),
            user_id: UserId("user-1".to_string()),
            amount: Decimal::new(25_000, 2),
            direction: WalletDirection::Credit,
            source: "topup".to_string(),
            description: "Wallet recharge".to_string(),
            balance_after,
            external_reference: reference.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn recording_moves_the_denormalized_balance() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlWalletRepository::new(pool);

        let user = UserId("user-1".to_string());
        assert_eq!(repo.balance(&user).await.expect("balance"), Decimal::ZERO);

        repo.record(entry("w-1", Decimal::new(25_000, 2), Some("pay_123")))
            .await
            .expect("record");

        assert_eq!(repo.balance(&user).await.expect("balance"), Decimal::new(25_000, 2));
        assert!(repo.find_by_reference("pay_123").await.expect("query").is_some());
        assert_eq!(repo.entries_for_user(&user).await.expect("entries").len(), 1);
    }

    #[tokio::test]
    async fn duplicate_external_reference_is_rejected_by_the_store() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlWalletRepository::new(pool);

        repo.record(entry("w-1", Decimal::new(25_000, 2), Some("pay_123")))
            .await
            .expect("record");
        let result = repo.record(entry("w-2", Decimal::new(50_000, 2), Some("pay_123"))).await;

        assert!(result.is_err());
    }
}
