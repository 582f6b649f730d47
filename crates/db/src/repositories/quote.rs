use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use devis_core::domain::quote::{Quote, QuoteId, QuoteSection, QuoteStatus};

use super::material::parse_decimal;
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

const SELECT_COLUMNS: &str = "id, quote_number, client_name, client_email, client_phone, \
     client_address, status, notes, payment_conditions, validity_days, execution_timeframe, \
     discount_percentage, iva_rate, created_at, sections_json, total_materials, total_labor, \
     subtotal, discount_amount, iva_amount, total";

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn list(&self) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM quote ORDER BY created_at DESC, quote_number DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(quote_from_row).collect()
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM quote WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(quote_from_row).transpose()
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let sections_json = serde_json::to_string(&quote.sections)
            .map_err(|error| RepositoryError::Decode(format!("encode sections: {error}")))?;

        sqlx::query(
            "INSERT INTO quote (
                id, quote_number, client_name, client_email, client_phone, client_address,
                status, notes, payment_conditions, validity_days, execution_timeframe,
                discount_percentage, iva_rate, created_at, sections_json, total_materials,
                total_labor, subtotal, discount_amount, iva_amount, total
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                quote_number = excluded.quote_number,
                client_name = excluded.client_name,
                client_email = excluded.client_email,
                client_phone = excluded.client_phone,
                client_address = excluded.client_address,
                status = excluded.status,
                notes = excluded.notes,
                payment_conditions = excluded.payment_conditions,
                validity_days = excluded.validity_days,
                execution_timeframe = excluded.execution_timeframe,
                discount_percentage = excluded.discount_percentage,
                iva_rate = excluded.iva_rate,
                created_at = excluded.created_at,
                sections_json = excluded.sections_json,
                total_materials = excluded.total_materials,
                total_labor = excluded.total_labor,
                subtotal = excluded.subtotal,
                discount_amount = excluded.discount_amount,
                iva_amount = excluded.iva_amount,
                total = excluded.total",
        )
        .bind(&quote.id.0)
        .bind(&quote.quote_number)
        .bind(&quote.client_name)
        .bind(quote.client_email.as_deref())
        .bind(quote.client_phone.as_deref())
        .bind(&quote.client_address)
        .bind(quote.status.as_str())
        .bind(quote.notes.as_deref())
        .bind(quote.payment_conditions.as_deref())
        .bind(i64::from(quote.validity_days))
        .bind(quote.execution_timeframe.as_deref())
        .bind(quote.discount_percentage.to_string())
        .bind(quote.iva_rate.to_string())
        .bind(quote.created_at.to_rfc3339())
        .bind(sections_json)
        .bind(quote.total_materials.to_string())
        .bind(quote.total_labor.to_string())
        .bind(quote.subtotal.to_string())
        .bind(quote.discount_amount.to_string())
        .bind(quote.iva_amount.to_string())
        .bind(quote.total.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &QuoteId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM quote WHERE id = ?").bind(&id.0).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_quote_numbers(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT quote_number FROM quote").fetch_all(&self.pool).await?;

        Ok(rows.into_iter().map(|row| row.get::<String, _>("quote_number")).collect())
    }
}

fn quote_from_row(row: SqliteRow) -> Result<Quote, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = QuoteStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown quote status `{status_raw}`")))?;

    let sections_json = row.try_get::<String, _>("sections_json")?;
    let sections = serde_json::from_str::<Vec<QuoteSection>>(&sections_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid sections_json: {error}")))?;

    Ok(Quote {
        id: QuoteId(row.try_get("id")?),
        quote_number: row.try_get("quote_number")?,
        client_name: row.try_get("client_name")?,
        client_email: row.try_get("client_email")?,
        client_phone: row.try_get("client_phone")?,
        client_address: row.try_get("client_address")?,
        status,
        notes: row.try_get("notes")?,
        payment_conditions: row.try_get("payment_conditions")?,
        validity_days: parse_u32("validity_days", row.try_get("validity_days")?)?,
        execution_timeframe: row.try_get("execution_timeframe")?,
        discount_percentage: parse_decimal(
            "discount_percentage",
            row.try_get("discount_percentage")?,
        )?,
        iva_rate: parse_decimal("iva_rate", row.try_get("iva_rate")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        sections,
        total_materials: parse_decimal("total_materials", row.try_get("total_materials")?)?,
        total_labor: parse_decimal("total_labor", row.try_get("total_labor")?)?,
        subtotal: parse_decimal("subtotal", row.try_get("subtotal")?)?,
        discount_amount: parse_decimal("discount_amount", row.try_get("discount_amount")?)?,
        iva_amount: parse_decimal("iva_amount", row.try_get("iva_amount")?)?,
        total: parse_decimal("total", row.try_get("total")?)?,
    })
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use devis_core::domain::quote::{QuoteItem, QuoteSection, QuoteStatus};
    use devis_core::lifecycle::{self, QuoteDraft};

    use super::SqlQuoteRepository;
    use crate::migrations;
    use crate::repositories::QuoteRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    fn sample(number: &str) -> devis_core::domain::quote::Quote {
        let draft = QuoteDraft {
            client_name: "M. Dupont".to_string(),
            client_address: "12 rue des Artisans, Luxembourg".to_string(),
            ..QuoteDraft::default()
        };
        let mut quote =
            lifecycle::create(draft, number.to_string(), &lifecycle::QuoteDefaults::default())
                .expect("valid draft");
        let mut section = QuoteSection::new("Travaux".to_string());
        section.items.push(QuoteItem::manual(
            "Pose carrelage".to_string(),
            "m²".to_string(),
            dec!(10),
            dec!(45),
        ));
        quote.sections.push(section);
        quote.recompute();
        quote
    }

    #[tokio::test]
    async fn sql_quote_repo_round_trip() {
        let repo = SqlQuoteRepository::new(setup_pool().await);
        let quote = sample("Q-2026-001");

        repo.save(quote.clone()).await.expect("save");
        let found = repo.find_by_id(&quote.id).await.expect("find");

        assert_eq!(found, Some(quote));
    }

    #[tokio::test]
    async fn derived_amounts_survive_storage_exactly() {
        let repo = SqlQuoteRepository::new(setup_pool().await);
        let mut quote = sample("Q-2026-001");
        quote.set_discount_percentage(dec!(10)).expect("editable");
        repo.save(quote.clone()).await.expect("save");

        let found = repo.find_by_id(&quote.id).await.expect("find").expect("exists");
        assert_eq!(found.subtotal, dec!(450));
        assert_eq!(found.discount_amount, dec!(45));
        assert_eq!(found.iva_amount, dec!(68.85));
        assert_eq!(found.total, dec!(473.85));
    }

    #[tokio::test]
    async fn status_round_trips_through_text_column() {
        let repo = SqlQuoteRepository::new(setup_pool().await);
        let mut quote = sample("Q-2026-001");
        devis_core::lifecycle::mark_sent(&mut quote).expect("draft->sent");
        repo.save(quote.clone()).await.expect("save");

        let found = repo.find_by_id(&quote.id).await.expect("find").expect("exists");
        assert_eq!(found.status, QuoteStatus::Sent);
    }

    #[tokio::test]
    async fn quote_numbers_cover_every_stored_quote() {
        let repo = SqlQuoteRepository::new(setup_pool().await);
        repo.save(sample("Q-2026-001")).await.expect("save");
        repo.save(sample("Q-2026-002")).await.expect("save");

        let mut numbers = repo.list_quote_numbers().await.expect("numbers");
        numbers.sort();
        assert_eq!(numbers, vec!["Q-2026-001", "Q-2026-002"]);
    }

    #[tokio::test]
    async fn delete_removes_the_quote() {
        let repo = SqlQuoteRepository::new(setup_pool().await);
        let quote = sample("Q-2026-001");
        repo.save(quote.clone()).await.expect("save");

        assert!(repo.delete(&quote.id).await.expect("delete"));
        assert_eq!(repo.find_by_id(&quote.id).await.expect("find"), None);
    }
}
