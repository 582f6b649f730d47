use sqlx::{sqlite::SqliteRow, Row};

use devis_core::domain::quote::QuoteSection;
use devis_core::domain::template::{Template, TemplateId};

use super::{RepositoryError, TemplateRepository};
use crate::DbPool;

pub struct SqlTemplateRepository {
    pool: DbPool,
}

impl SqlTemplateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TemplateRepository for SqlTemplateRepository {
    async fn list(&self) -> Result<Vec<Template>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, is_system_template, sections_json
             FROM template
             ORDER BY is_system_template DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(template_from_row).collect()
    }

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, is_system_template, sections_json FROM template WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(template_from_row).transpose()
    }

    async fn save(&self, template: Template) -> Result<(), RepositoryError> {
        let sections_json = serde_json::to_string(&template.sections)
            .map_err(|error| RepositoryError::Decode(format!("encode sections: {error}")))?;

        sqlx::query(
            "INSERT INTO template (id, name, is_system_template, sections_json)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                is_system_template = excluded.is_system_template,
                sections_json = excluded.sections_json",
        )
        .bind(&template.id.0)
        .bind(&template.name)
        .bind(i64::from(template.is_system_template))
        .bind(sections_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &TemplateId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM template WHERE id = ?")
            .bind(&id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn template_from_row(row: SqliteRow) -> Result<Template, RepositoryError> {
    let sections_json = row.try_get::<String, _>("sections_json")?;
    let sections = serde_json::from_str::<Vec<QuoteSection>>(&sections_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid sections_json: {error}")))?;

    Ok(Template {
        id: TemplateId(row.try_get("id")?),
        name: row.try_get("name")?,
        is_system_template: row.try_get::<i64, _>("is_system_template")? != 0,
        sections,
    })
}
