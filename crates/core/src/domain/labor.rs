use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{fresh_id, non_blank, non_negative};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaborId(pub String);

/// Market a labor rate is priced for. Luxembourg and Portugal rates differ
/// enough that each labor entry carries both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Luxembourg,
    Portugal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Labor {
    pub id: LaborId,
    pub name: String,
    pub trade: String,
    pub unit: String,
    pub price_lux: Decimal,
    pub price_pt: Decimal,
}

impl Labor {
    pub fn rate_for(&self, market: Market) -> Decimal {
        match market {
            Market::Luxembourg => self.price_lux,
            Market::Portugal => self.price_pt,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaborDraft {
    pub name: String,
    pub trade: String,
    pub unit: String,
    pub price_lux: Decimal,
    pub price_pt: Decimal,
}

impl LaborDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        non_blank("name", &self.name)?;
        non_blank("trade", &self.trade)?;
        non_blank("unit", &self.unit)?;
        non_negative("price_lux", self.price_lux)?;
        non_negative("price_pt", self.price_pt)?;
        Ok(())
    }

    pub fn build(self) -> Result<Labor, DomainError> {
        self.validate()?;
        Ok(Labor {
            id: LaborId(fresh_id()),
            name: self.name,
            trade: self.trade,
            unit: self.unit,
            price_lux: self.price_lux,
            price_pt: self.price_pt,
        })
    }

    pub fn apply_to(self, labor: &mut Labor) -> Result<(), DomainError> {
        self.validate()?;
        labor.name = self.name;
        labor.trade = self.trade;
        labor.unit = self.unit;
        labor.price_lux = self.price_lux;
        labor.price_pt = self.price_pt;
        Ok(())
    }
}
