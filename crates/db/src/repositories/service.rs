use rust_decimal::Decimal;
use sqlx::Row;
use std::str::FromStr;

use fixbid_core::domain::service::{Service, ServiceId};

use super::{RepositoryError, ServiceCatalogRepository};
use crate::DbPool;

pub struct SqlServiceCatalogRepository {
    pool: DbPool,
}

impl SqlServiceCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_service(row: &sqlx::sqlite::SqliteRow) -> Result<Service, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let name: String = row.try_get("name").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let base_price_raw: String = row.try_get("base_price").map_err(decode_err)?;

    let base_price = Decimal::from_str(&base_price_raw).map_err(|e| {
        RepositoryError::Decode(format!("invalid base price `{base_price_raw}`: {e}"))
    })?;

    Ok(Service { id: ServiceId(id), name, category, base_price })
}

#[async_trait::async_trait]
impl ServiceCatalogRepository for SqlServiceCatalogRepository {
    async fn find_by_category(&self, category: &str) -> Result<Option<Service>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, category, base_price FROM service WHERE category = ? LIMIT 1",
        )
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_service(r)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, service: Service) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO service (id, name, category, base_price) VALUES (?, ?, ?, ?)")
            .bind(&service.id.0)
            .bind(&service.name)
            .bind(&service.category)
            .bind(service.base_price.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use fixbid_core::domain::service::{Service, ServiceId};

    use crate::repositories::ServiceCatalogRepository;
    use crate::{connect_with_settings, migrations};

    use super::SqlServiceCatalogRepository;

    #[tokio::test]
    async fn category_lookup_round_trip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let repo = SqlServiceCatalogRepository::new(pool);

        assert!(repo.find_by_category("plumber").await.expect("query").is_none());

        let service = Service {
            id: ServiceId("svc-1".to_string()),
            name: "Plumber Service".to_string(),
            category: "plumber".to_string(),
            base_price: Decimal::new(50_000, 2),
        };
        repo.create(service.clone()).await.expect("create");

        let found = repo.find_by_category("plumber").await.expect("query").expect("present");
        assert_eq!(found, service);
    }
}
