use async_trait::async_trait;
use thiserror::Error;

use devis_core::domain::labor::{Labor, LaborId};
use devis_core::domain::material::{Material, MaterialId};
use devis_core::domain::quote::{Quote, QuoteId};
use devis_core::domain::template::{Template, TemplateId};

pub mod labor;
pub mod material;
pub mod memory;
pub mod quote;
pub mod template;

pub use labor::SqlLaborRepository;
pub use material::SqlMaterialRepository;
pub use memory::{
    InMemoryLaborRepository, InMemoryMaterialRepository, InMemoryQuoteRepository,
    InMemoryTemplateRepository,
};
pub use quote::SqlQuoteRepository;
pub use template::SqlTemplateRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Material>, RepositoryError>;
    async fn find_by_id(&self, id: &MaterialId) -> Result<Option<Material>, RepositoryError>;
    async fn save(&self, material: Material) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &MaterialId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait LaborRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Labor>, RepositoryError>;
    async fn find_by_id(&self, id: &LaborId) -> Result<Option<Labor>, RepositoryError>;
    async fn save(&self, labor: Labor) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &LaborId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Template>, RepositoryError>;
    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>, RepositoryError>;
    async fn save(&self, template: Template) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &TemplateId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Quote>, RepositoryError>;
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;
    async fn save(&self, quote: Quote) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &QuoteId) -> Result<bool, RepositoryError>;
    /// All quote numbers ever issued, for deriving the next in the series.
    async fn list_quote_numbers(&self) -> Result<Vec<String>, RepositoryError>;
}
