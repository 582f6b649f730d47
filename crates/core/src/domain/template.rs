use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteSection;
use crate::domain::{fresh_id, non_blank};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

/// Reusable section layout. System templates ship with the seed catalog and
/// are read-only; user templates are captured from existing quotes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub is_system_template: bool,
    pub sections: Vec<QuoteSection>,
}

impl Template {
    pub fn from_sections(name: String, sections: &[QuoteSection]) -> Result<Self, DomainError> {
        non_blank("name", &name)?;
        Ok(Self {
            id: TemplateId(fresh_id()),
            name,
            is_system_template: false,
            sections: sections.iter().map(QuoteSection::with_fresh_ids).collect(),
        })
    }

    pub fn ensure_mutable(&self) -> Result<(), DomainError> {
        if self.is_system_template {
            return Err(DomainError::SystemTemplateProtected);
        }
        Ok(())
    }

    /// Sections ready to append to a quote, each carrying fresh identities so
    /// repeated applications never collide.
    pub fn instantiate(&self) -> Vec<QuoteSection> {
        self.sections.iter().map(QuoteSection::with_fresh_ids).collect()
    }
}
