use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use devis_core::domain::material::{Material, MaterialId};

use super::{MaterialRepository, RepositoryError};
use crate::DbPool;

pub struct SqlMaterialRepository {
    pool: DbPool,
}

impl SqlMaterialRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str =
    "id, name, category, unit, cost_price, sell_price, supplier, reference";

#[async_trait::async_trait]
impl MaterialRepository for SqlMaterialRepository {
    async fn list(&self) -> Result<Vec<Material>, RepositoryError> {
        let rows =
            sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM material ORDER BY name ASC"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(material_from_row).collect()
    }

    async fn find_by_id(&self, id: &MaterialId) -> Result<Option<Material>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM material WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(material_from_row).transpose()
    }

    async fn save(&self, material: Material) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO material (
                id, name, category, unit, cost_price, sell_price, supplier, reference
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                unit = excluded.unit,
                cost_price = excluded.cost_price,
                sell_price = excluded.sell_price,
                supplier = excluded.supplier,
                reference = excluded.reference",
        )
        .bind(&material.id.0)
        .bind(&material.name)
        .bind(&material.category)
        .bind(&material.unit)
        .bind(material.cost_price.to_string())
        .bind(material.sell_price.to_string())
        .bind(material.supplier.as_deref())
        .bind(material.reference.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &MaterialId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM material WHERE id = ?").bind(&id.0).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}

fn material_from_row(row: SqliteRow) -> Result<Material, RepositoryError> {
    Ok(Material {
        id: MaterialId(row.try_get("id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        unit: row.try_get("unit")?,
        cost_price: parse_decimal("cost_price", row.try_get("cost_price")?)?,
        sell_price: parse_decimal("sell_price", row.try_get("sell_price")?)?,
        supplier: row.try_get("supplier")?,
        reference: row.try_get("reference")?,
    })
}

pub(crate) fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    value.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}
