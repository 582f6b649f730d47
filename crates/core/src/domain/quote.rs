use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::labor::{Labor, Market};
use crate::domain::material::Material;
use crate::domain::{fresh_id, non_blank, non_negative, percentage, positive};
use crate::errors::DomainError;
use crate::pricing;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Where a quote line came from. Manual lines are free-form entries typed
/// directly by the user; they are priced into the labor bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Material,
    Labor,
    Manual,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: ItemId,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub kind: ItemKind,
}

impl QuoteItem {
    pub fn from_material(material: &Material, quantity: Decimal) -> Self {
        Self {
            id: ItemId(fresh_id()),
            description: material.name.clone(),
            unit: material.unit.clone(),
            quantity,
            unit_price: material.sell_price,
            total: quantity * material.sell_price,
            kind: ItemKind::Material,
        }
    }

    pub fn from_labor(labor: &Labor, market: Market, quantity: Decimal) -> Self {
        let rate = labor.rate_for(market);
        Self {
            id: ItemId(fresh_id()),
            description: labor.name.clone(),
            unit: labor.unit.clone(),
            quantity,
            unit_price: rate,
            total: quantity * rate,
            kind: ItemKind::Labor,
        }
    }

    pub fn manual(description: String, unit: String, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            id: ItemId(fresh_id()),
            description,
            unit,
            quantity,
            unit_price,
            total: quantity * unit_price,
            kind: ItemKind::Manual,
        }
    }

    pub fn with_fresh_id(&self) -> Self {
        let mut copy = self.clone();
        copy.id = ItemId(fresh_id());
        copy
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        non_blank("description", &self.description)?;
        non_negative("quantity", self.quantity)?;
        non_negative("unit_price", self.unit_price)?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSection {
    pub id: SectionId,
    pub name: String,
    pub items: Vec<QuoteItem>,
    pub subtotal: Decimal,
}

impl QuoteSection {
    pub fn new(name: String) -> Self {
        Self { id: SectionId(fresh_id()), name, items: Vec::new(), subtotal: Decimal::ZERO }
    }

    /// Deep copy with new identities for the section and every item in it.
    pub fn with_fresh_ids(&self) -> Self {
        Self {
            id: SectionId(fresh_id()),
            name: self.name.clone(),
            items: self.items.iter().map(QuoteItem::with_fresh_id).collect(),
            subtotal: self.subtotal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub quote_number: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_address: String,
    pub status: QuoteStatus,
    pub notes: Option<String>,
    pub payment_conditions: Option<String>,
    pub validity_days: u32,
    pub execution_timeframe: Option<String>,
    pub discount_percentage: Decimal,
    pub iva_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub sections: Vec<QuoteSection>,
    pub total_materials: Decimal,
    pub total_labor: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub iva_amount: Decimal,
    pub total: Decimal,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::Sent, QuoteStatus::Accepted)
                | (QuoteStatus::Sent, QuoteStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: QuoteStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidStatusTransition { from: self.status, to: next })
    }

    /// Content changes are allowed until the client has decided: draft and
    /// sent quotes can still be amended, accepted and rejected ones are
    /// frozen.
    pub fn is_editable(&self) -> bool {
        matches!(self.status, QuoteStatus::Draft | QuoteStatus::Sent)
    }

    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.is_editable() {
            return Ok(());
        }
        Err(DomainError::NotEditable(self.quote_number.clone()))
    }

    pub fn set_discount_percentage(&mut self, value: Decimal) -> Result<(), DomainError> {
        self.ensure_editable()?;
        percentage("discount_percentage", value)?;
        self.discount_percentage = value;
        self.recompute();
        Ok(())
    }

    pub fn set_iva_rate(&mut self, value: Decimal) -> Result<(), DomainError> {
        self.ensure_editable()?;
        percentage("iva_rate", value)?;
        self.iva_rate = value;
        self.recompute();
        Ok(())
    }

    pub fn set_validity_days(&mut self, value: u32) -> Result<(), DomainError> {
        self.ensure_editable()?;
        positive("validity_days", value)?;
        self.validity_days = value;
        Ok(())
    }

    /// Re-derives every stored amount from the line items. Idempotent.
    pub fn recompute(&mut self) {
        let totals =
            pricing::compute_totals(&mut self.sections, self.discount_percentage, self.iva_rate);
        self.total_materials = totals.total_materials;
        self.total_labor = totals.total_labor;
        self.subtotal = totals.subtotal;
        self.discount_amount = totals.discount_amount;
        self.iva_amount = totals.iva_amount;
        self.total = totals.total;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::errors::DomainError;

    use super::{
        ItemKind, Quote, QuoteId, QuoteItem, QuoteSection, QuoteStatus,
    };

    pub(crate) fn quote(status: QuoteStatus) -> Quote {
        Quote {
            id: QuoteId("q-1".to_string()),
            quote_number: "Q-2026-001".to_string(),
            client_name: "M. Dupont".to_string(),
            client_email: None,
            client_phone: None,
            client_address: "12 rue des Artisans, Luxembourg".to_string(),
            status,
            notes: None,
            payment_conditions: None,
            validity_days: 30,
            execution_timeframe: None,
            discount_percentage: Decimal::ZERO,
            iva_rate: Decimal::new(17, 0),
            created_at: Utc::now(),
            sections: Vec::new(),
            total_materials: Decimal::ZERO,
            total_labor: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            iva_amount: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    #[test]
    fn allows_draft_to_sent() {
        let mut quote = quote(QuoteStatus::Draft);
        quote.transition_to(QuoteStatus::Sent).expect("draft->sent");
        assert_eq!(quote.status, QuoteStatus::Sent);
    }

    #[test]
    fn allows_sent_to_accepted_and_rejected() {
        let mut accepted = quote(QuoteStatus::Sent);
        accepted.transition_to(QuoteStatus::Accepted).expect("sent->accepted");

        let mut rejected = quote(QuoteStatus::Sent);
        rejected.transition_to(QuoteStatus::Rejected).expect("sent->rejected");
    }

    #[test]
    fn blocks_draft_to_accepted() {
        let mut quote = quote(QuoteStatus::Draft);
        let error =
            quote.transition_to(QuoteStatus::Accepted).expect_err("draft->accepted should fail");
        assert_eq!(
            error,
            DomainError::InvalidStatusTransition {
                from: QuoteStatus::Draft,
                to: QuoteStatus::Accepted
            }
        );
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [QuoteStatus::Accepted, QuoteStatus::Rejected] {
            let quote = quote(terminal);
            for next in
                [QuoteStatus::Draft, QuoteStatus::Sent, QuoteStatus::Accepted, QuoteStatus::Rejected]
            {
                assert!(!quote.can_transition_to(next), "{terminal:?} -> {next:?} must be blocked");
            }
        }
    }

    #[test]
    fn terminal_quotes_are_frozen() {
        assert!(quote(QuoteStatus::Draft).ensure_editable().is_ok());
        assert!(quote(QuoteStatus::Sent).ensure_editable().is_ok());
        assert!(quote(QuoteStatus::Accepted).ensure_editable().is_err());
        assert!(quote(QuoteStatus::Rejected).ensure_editable().is_err());
    }

    #[test]
    fn fresh_id_copy_preserves_content() {
        let item = QuoteItem::manual(
            "Évacuation gravats".to_string(),
            "forfait".to_string(),
            Decimal::ONE,
            Decimal::new(350, 0),
        );
        let copy = item.with_fresh_id();

        assert_ne!(copy.id, item.id);
        assert_eq!(copy.description, item.description);
        assert_eq!(copy.total, item.total);
    }

    #[test]
    fn section_deep_copy_renames_every_item() {
        let mut section = QuoteSection::new("Démolition".to_string());
        section.items.push(QuoteItem::manual(
            "Dépose carrelage".to_string(),
            "m²".to_string(),
            Decimal::new(12, 0),
            Decimal::new(18, 0),
        ));
        section.items.push(QuoteItem::manual(
            "Évacuation".to_string(),
            "forfait".to_string(),
            Decimal::ONE,
            Decimal::new(350, 0),
        ));

        let copy = section.with_fresh_ids();

        assert_ne!(copy.id, section.id);
        for (new_item, old_item) in copy.items.iter().zip(&section.items) {
            assert_ne!(new_item.id, old_item.id);
            assert_eq!(new_item.description, old_item.description);
        }
    }

    #[test]
    fn manual_item_lands_in_manual_kind() {
        let item = QuoteItem::manual(
            "Nettoyage chantier".to_string(),
            "forfait".to_string(),
            Decimal::ONE,
            Decimal::new(150, 0),
        );
        assert_eq!(item.kind, ItemKind::Manual);
        assert_eq!(item.total, Decimal::new(150, 0));
    }

    #[test]
    fn discount_rejects_out_of_range_values() {
        let mut quote = quote(QuoteStatus::Draft);
        assert!(quote.set_discount_percentage(Decimal::new(150, 0)).is_err());
        assert!(quote.set_discount_percentage(Decimal::new(-5, 0)).is_err());
        assert!(quote.set_discount_percentage(Decimal::new(10, 0)).is_ok());
    }

    #[test]
    fn validity_window_must_be_positive() {
        let mut quote = quote(QuoteStatus::Draft);
        assert!(matches!(
            quote.set_validity_days(0),
            Err(DomainError::Validation(_))
        ));
        assert!(quote.set_validity_days(45).is_ok());
        assert_eq!(quote.validity_days, 45);
    }

    #[test]
    fn accepted_quote_refuses_discount_change() {
        let mut quote = quote(QuoteStatus::Accepted);
        assert!(matches!(
            quote.set_discount_percentage(Decimal::TEN),
            Err(DomainError::NotEditable(_))
        ));
    }
}
