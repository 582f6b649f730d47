pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod pricing;

pub use domain::labor::{Labor, LaborDraft, LaborId, Market};
pub use domain::material::{Material, MaterialDraft, MaterialId};
pub use domain::quote::{
    ItemId, ItemKind, Quote, QuoteId, QuoteItem, QuoteSection, QuoteStatus, SectionId,
};
pub use domain::template::{Template, TemplateId};
pub use errors::{ApplicationError, DomainError};
pub use pricing::{compute_totals, Totals};
