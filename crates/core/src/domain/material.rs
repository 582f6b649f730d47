use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{fresh_id, non_blank, non_negative};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub String);

/// Catalog entry for a purchasable material. `sell_price` is what lands on a
/// quote line; `cost_price` is kept for margin reporting only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    pub supplier: Option<String>,
    pub reference: Option<String>,
}

/// Client-supplied fields for creating or updating a catalog material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDraft {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub cost_price: Decimal,
    pub sell_price: Decimal,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

impl MaterialDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        non_blank("name", &self.name)?;
        non_blank("category", &self.category)?;
        non_blank("unit", &self.unit)?;
        non_negative("cost_price", self.cost_price)?;
        non_negative("sell_price", self.sell_price)?;
        Ok(())
    }

    pub fn build(self) -> Result<Material, DomainError> {
        self.validate()?;
        Ok(Material {
            id: MaterialId(fresh_id()),
            name: self.name,
            category: self.category,
            unit: self.unit,
            cost_price: self.cost_price,
            sell_price: self.sell_price,
            supplier: self.supplier,
            reference: self.reference,
        })
    }

    pub fn apply_to(self, material: &mut Material) -> Result<(), DomainError> {
        self.validate()?;
        material.name = self.name;
        material.category = self.category;
        material.unit = self.unit;
        material.cost_price = self.cost_price;
        material.sell_price = self.sell_price;
        material.supplier = self.supplier;
        material.reference = self.reference;
        Ok(())
    }
}
