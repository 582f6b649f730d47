use std::collections::HashMap;

use tokio::sync::RwLock;

use devis_core::domain::labor::{Labor, LaborId};
use devis_core::domain::material::{Material, MaterialId};
use devis_core::domain::quote::{Quote, QuoteId};
use devis_core::domain::template::{Template, TemplateId};

use super::{
    LaborRepository, MaterialRepository, QuoteRepository, RepositoryError, TemplateRepository,
};

#[derive(Default)]
pub struct InMemoryMaterialRepository {
    materials: RwLock<HashMap<String, Material>>,
}

#[async_trait::async_trait]
impl MaterialRepository for InMemoryMaterialRepository {
    async fn list(&self) -> Result<Vec<Material>, RepositoryError> {
        let materials = self.materials.read().await;
        let mut all: Vec<Material> = materials.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn find_by_id(&self, id: &MaterialId) -> Result<Option<Material>, RepositoryError> {
        let materials = self.materials.read().await;
        Ok(materials.get(&id.0).cloned())
    }

    async fn save(&self, material: Material) -> Result<(), RepositoryError> {
        let mut materials = self.materials.write().await;
        materials.insert(material.id.0.clone(), material);
        Ok(())
    }

    async fn delete(&self, id: &MaterialId) -> Result<bool, RepositoryError> {
        let mut materials = self.materials.write().await;
        Ok(materials.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryLaborRepository {
    entries: RwLock<HashMap<String, Labor>>,
}

#[async_trait::async_trait]
impl LaborRepository for InMemoryLaborRepository {
    async fn list(&self) -> Result<Vec<Labor>, RepositoryError> {
        let entries = self.entries.read().await;
        let mut all: Vec<Labor> = entries.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn find_by_id(&self, id: &LaborId) -> Result<Option<Labor>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(&id.0).cloned())
    }

    async fn save(&self, labor: Labor) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        entries.insert(labor.id.0.clone(), labor);
        Ok(())
    }

    async fn delete(&self, id: &LaborId) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryTemplateRepository {
    templates: RwLock<HashMap<String, Template>>,
}

#[async_trait::async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn list(&self) -> Result<Vec<Template>, RepositoryError> {
        let templates = self.templates.read().await;
        let mut all: Vec<Template> = templates.values().cloned().collect();
        all.sort_by(|a, b| {
            b.is_system_template.cmp(&a.is_system_template).then_with(|| a.name.cmp(&b.name))
        });
        Ok(all)
    }

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError> {
        let templates = self.templates.read().await;
        Ok(templates.get(&id.0).cloned())
    }

    async fn save(&self, template: Template) -> Result<(), RepositoryError> {
        let mut templates = self.templates.write().await;
        templates.insert(template.id.0.clone(), template);
        Ok(())
    }

    async fn delete(&self, id: &TemplateId) -> Result<bool, RepositoryError> {
        let mut templates = self.templates.write().await;
        Ok(templates.remove(&id.0).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<String, Quote>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn list(&self) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut all: Vec<Quote> = quotes.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.quote_number.cmp(&a.quote_number))
        });
        Ok(all)
    }

    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(&id.0).cloned())
    }

    async fn save(&self, quote: Quote) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.0.clone(), quote);
        Ok(())
    }

    async fn delete(&self, id: &QuoteId) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        Ok(quotes.remove(&id.0).is_some())
    }

    async fn list_quote_numbers(&self) -> Result<Vec<String>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.values().map(|quote| quote.quote_number.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use devis_core::domain::labor::{Labor, LaborId};
    use devis_core::domain::material::{Material, MaterialId};
    use devis_core::lifecycle::{self, QuoteDraft};

    use crate::repositories::{
        InMemoryLaborRepository, InMemoryMaterialRepository, InMemoryQuoteRepository,
        LaborRepository, MaterialRepository, QuoteRepository,
    };

    #[tokio::test]
    async fn in_memory_material_repo_round_trip() {
        let repo = InMemoryMaterialRepository::default();
        let material = Material {
            id: MaterialId("m-1".to_string()),
            name: "Carrelage 60x60".to_string(),
            category: "Carrelage".to_string(),
            unit: "m²".to_string(),
            cost_price: dec!(18.50),
            sell_price: dec!(32.00),
            supplier: None,
            reference: None,
        };

        repo.save(material.clone()).await.expect("save");
        let found = repo.find_by_id(&material.id).await.expect("find");

        assert_eq!(found, Some(material.clone()));
        assert!(repo.delete(&material.id).await.expect("delete"));
        assert!(!repo.delete(&material.id).await.expect("second delete"));
    }

    #[tokio::test]
    async fn in_memory_labor_repo_round_trip() {
        let repo = InMemoryLaborRepository::default();
        let labor = Labor {
            id: LaborId("l-1".to_string()),
            name: "Pose carrelage".to_string(),
            trade: "Carreleur".to_string(),
            unit: "m²".to_string(),
            price_lux: dec!(45.00),
            price_pt: dec!(25.00),
        };

        repo.save(labor.clone()).await.expect("save");
        let found = repo.find_by_id(&labor.id).await.expect("find");

        assert_eq!(found, Some(labor));
    }

    #[tokio::test]
    async fn in_memory_quote_repo_lists_numbers() {
        let repo = InMemoryQuoteRepository::default();
        for number in ["Q-2026-001", "Q-2026-002"] {
            let draft = QuoteDraft {
                client_name: "M. Dupont".to_string(),
                ..QuoteDraft::default()
            };
            let quote =
                lifecycle::create(draft, number.to_string(), &lifecycle::QuoteDefaults::default())
                    .expect("valid draft");
            repo.save(quote).await.expect("save");
        }

        let mut numbers = repo.list_quote_numbers().await.expect("numbers");
        numbers.sort();
        assert_eq!(numbers, vec!["Q-2026-001", "Q-2026-002"]);
    }
}
