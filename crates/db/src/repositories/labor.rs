use sqlx::{sqlite::SqliteRow, Row};

use devis_core::domain::labor::{Labor, LaborId};

use super::material::parse_decimal;
use super::{LaborRepository, RepositoryError};
use crate::DbPool;

pub struct SqlLaborRepository {
    pool: DbPool,
}

impl SqlLaborRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, name, trade, unit, price_lux, price_pt";

#[async_trait::async_trait]
impl LaborRepository for SqlLaborRepository {
    async fn list(&self) -> Result<Vec<Labor>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM labor ORDER BY name ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(labor_from_row).collect()
    }

    async fn find_by_id(&self, id: &LaborId) -> Result<Option<Labor>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM labor WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(labor_from_row).transpose()
    }

    async fn save(&self, labor: Labor) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO labor (id, name, trade, unit, price_lux, price_pt)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                trade = excluded.trade,
                unit = excluded.unit,
                price_lux = excluded.price_lux,
                price_pt = excluded.price_pt",
        )
        .bind(&labor.id.0)
        .bind(&labor.name)
        .bind(&labor.trade)
        .bind(&labor.unit)
        .bind(labor.price_lux.to_string())
        .bind(labor.price_pt.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &LaborId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM labor WHERE id = ?").bind(&id.0).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}

fn labor_from_row(row: SqliteRow) -> Result<Labor, RepositoryError> {
    Ok(Labor {
        id: LaborId(row.try_get("id")?),
        name: row.try_get("name")?,
        trade: row.try_get("trade")?,
        unit: row.try_get("unit")?,
        price_lux: parse_decimal("price_lux", row.try_get("price_lux")?)?,
        price_pt: parse_decimal("price_pt", row.try_get("price_pt")?)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use devis_core::domain::labor::{Labor, LaborId};

    use super::SqlLaborRepository;
    use crate::migrations;
    use crate::repositories::LaborRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    fn sample() -> Labor {
        Labor {
            id: LaborId("l-1".to_string()),
            name: "Pose carrelage".to_string(),
            trade: "Carreleur".to_string(),
            unit: "m²".to_string(),
            price_lux: dec!(45.00),
            price_pt: dec!(25.00),
        }
    }

    #[tokio::test]
    async fn sql_labor_repo_round_trip() {
        let repo = SqlLaborRepository::new(setup_pool().await);
        let labor = sample();

        repo.save(labor.clone()).await.expect("save");
        let found = repo.find_by_id(&labor.id).await.expect("find");

        assert_eq!(found, Some(labor));
    }

    #[tokio::test]
    async fn both_market_rates_survive_storage() {
        let repo = SqlLaborRepository::new(setup_pool().await);
        repo.save(sample()).await.expect("save");

        let found =
            repo.find_by_id(&LaborId("l-1".to_string())).await.expect("find").expect("exists");
        assert_eq!(found.price_lux, dec!(45.00));
        assert_eq!(found.price_pt, dec!(25.00));
    }

    #[tokio::test]
    async fn delete_removes_the_entry() {
        let repo = SqlLaborRepository::new(setup_pool().await);
        let labor = sample();
        repo.save(labor.clone()).await.expect("save");

        assert!(repo.delete(&labor.id).await.expect("delete"));
        assert!(repo.list().await.expect("list").is_empty());
    }
}
