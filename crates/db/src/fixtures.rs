use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_MATERIAL_COUNT: i64 = 12;
const SEED_LABOR_COUNT: i64 = 10;

/// System templates shipped with the seed catalog, with their section counts.
const SEED_TEMPLATES: &[(&str, &str, i64)] = &[
    ("seed-template-t1", "Salle de Bain / Casa de Banho", 6),
    ("seed-template-t2", "Peinture Appartement / Pintura Apartamento", 3),
    ("seed-template-t3", "Rénovation Cuisine / Renovação Cozinha", 5),
    ("seed-template-t4", "Sol Stratifié / Pavimento Flutuante", 3),
    ("seed-template-t5", "Étanchéité Terrasse / Impermeabilização Terraço", 3),
];

/// Starter catalog for a fresh installation: materials, labor rates, and the
/// built-in section templates.
pub struct SeedCatalog;

impl SeedCatalog {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_catalog.sql");

    /// Load the seed catalog. Replaces existing seed rows by primary key, so
    /// reloading is safe.
    pub async fn load(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedReport {
            materials: SEED_MATERIAL_COUNT as usize,
            labor_entries: SEED_LABOR_COUNT as usize,
            templates: SEED_TEMPLATES.len(),
        })
    }

    /// Load the seed catalog only when the catalog tables are empty, so a
    /// server restart never clobbers user edits to seeded rows.
    pub async fn load_if_empty(pool: &DbPool) -> Result<Option<SeedReport>, RepositoryError> {
        let material_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM material").fetch_one(pool).await?;
        let template_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM template").fetch_one(pool).await?;

        if material_count > 0 || template_count > 0 {
            return Ok(None);
        }

        Self::load(pool).await.map(Some)
    }

    /// Verify the seed contract: row counts and system template shapes.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let material_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM material WHERE id LIKE 'seed-material-%'")
                .fetch_one(pool)
                .await?;
        checks.push(("materials", material_count == SEED_MATERIAL_COUNT));

        let labor_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM labor WHERE id LIKE 'seed-labor-%'")
                .fetch_one(pool)
                .await?;
        checks.push(("labor-entries", labor_count == SEED_LABOR_COUNT));

        for (template_id, name, section_count) in SEED_TEMPLATES {
            let ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM template
                    WHERE id = ?1 AND name = ?2 AND is_system_template = 1
                      AND json_array_length(sections_json) = ?3
                 )",
            )
            .bind(template_id)
            .bind(name)
            .bind(section_count)
            .fetch_one(pool)
            .await?;
            checks.push((*template_id, ok == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug)]
pub struct SeedReport {
    pub materials: usize,
    pub labor_entries: usize,
    pub templates: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
