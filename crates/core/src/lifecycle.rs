//! Quote lifecycle operations.
//!
//! Everything that creates a quote or moves it between states lives here, so
//! callers never mutate `status` or identity fields directly.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CompanyConfig;
use crate::domain::quote::{Quote, QuoteId, QuoteSection, QuoteStatus};
use crate::domain::template::Template;
use crate::domain::{fresh_id, non_blank, percentage, positive};
use crate::errors::DomainError;

/// Default validity window printed on new quotes, in days.
pub const DEFAULT_VALIDITY_DAYS: u32 = 30;

/// Luxembourg standard VAT rate applied to new quotes.
pub fn default_iva_rate() -> Decimal {
    Decimal::new(17, 0)
}

/// House defaults stamped onto a draft when the client left a field blank.
/// Sourced from the `[company]` configuration section at the API boundary.
#[derive(Clone, Debug)]
pub struct QuoteDefaults {
    pub iva_rate: Decimal,
    pub validity_days: u32,
    pub payment_conditions: Option<String>,
}

impl Default for QuoteDefaults {
    fn default() -> Self {
        Self {
            iva_rate: default_iva_rate(),
            validity_days: DEFAULT_VALIDITY_DAYS,
            payment_conditions: None,
        }
    }
}

impl From<&CompanyConfig> for QuoteDefaults {
    fn from(company: &CompanyConfig) -> Self {
        Self {
            iva_rate: company.default_iva,
            validity_days: company.default_validity_days,
            payment_conditions: company.default_payment_conditions.clone(),
        }
    }
}

/// Client-supplied fields for opening a new draft quote.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub client_address: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_conditions: Option<String>,
    #[serde(default)]
    pub validity_days: Option<u32>,
    #[serde(default)]
    pub execution_timeframe: Option<String>,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub iva_rate: Option<Decimal>,
}

/// Next quote number in the `Q-YYYY-NNN` series for the current year.
///
/// Numbers from other years are ignored; malformed numbers in storage are
/// skipped rather than failing the whole operation.
pub fn next_quote_number(existing: &[String], now: DateTime<Utc>) -> String {
    let year = now.year();
    let prefix = format!("Q-{year}-");
    let highest = existing
        .iter()
        .filter_map(|number| number.strip_prefix(&prefix))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("Q-{year}-{:03}", highest + 1)
}

/// Opens a new draft quote with derived amounts zeroed.
pub fn create(
    draft: QuoteDraft,
    quote_number: String,
    defaults: &QuoteDefaults,
) -> Result<Quote, DomainError> {
    if let Some(discount) = draft.discount_percentage {
        percentage("discount_percentage", discount)?;
    }
    if let Some(iva) = draft.iva_rate {
        percentage("iva_rate", iva)?;
    }
    if let Some(days) = draft.validity_days {
        positive("validity_days", days)?;
    }

    let mut quote = Quote {
        id: QuoteId(fresh_id()),
        quote_number,
        client_name: draft.client_name,
        client_email: draft.client_email,
        client_phone: draft.client_phone,
        client_address: draft.client_address,
        status: QuoteStatus::Draft,
        notes: draft.notes,
        payment_conditions: draft
            .payment_conditions
            .or_else(|| defaults.payment_conditions.clone()),
        validity_days: draft.validity_days.unwrap_or(defaults.validity_days),
        execution_timeframe: draft.execution_timeframe,
        discount_percentage: draft.discount_percentage.unwrap_or(Decimal::ZERO),
        iva_rate: draft.iva_rate.unwrap_or(defaults.iva_rate),
        created_at: Utc::now(),
        sections: Vec::new(),
        total_materials: Decimal::ZERO,
        total_labor: Decimal::ZERO,
        subtotal: Decimal::ZERO,
        discount_amount: Decimal::ZERO,
        iva_amount: Decimal::ZERO,
        total: Decimal::ZERO,
    };
    quote.recompute();
    Ok(quote)
}

/// Draft -> Sent. A quote cannot go out without a named client.
pub fn mark_sent(quote: &mut Quote) -> Result<(), DomainError> {
    non_blank("client_name", &quote.client_name)?;
    quote.transition_to(QuoteStatus::Sent)
}

/// Sent -> Accepted.
pub fn accept(quote: &mut Quote) -> Result<(), DomainError> {
    quote.transition_to(QuoteStatus::Accepted)
}

/// Sent -> Rejected.
pub fn reject(quote: &mut Quote) -> Result<(), DomainError> {
    quote.transition_to(QuoteStatus::Rejected)
}

/// Independent copy of a quote: new identity down to every item, back in
/// Draft regardless of the source status, stamped with a new number.
pub fn duplicate(source: &Quote, quote_number: String) -> Quote {
    let mut copy = source.clone();
    copy.id = QuoteId(fresh_id());
    copy.quote_number = quote_number;
    copy.status = QuoteStatus::Draft;
    copy.created_at = Utc::now();
    copy.sections = source.sections.iter().map(QuoteSection::with_fresh_ids).collect();
    copy.recompute();
    copy
}

/// Appends the template's sections to the quote. Existing sections are kept.
pub fn apply_template(quote: &mut Quote, template: &Template) -> Result<(), DomainError> {
    quote.ensure_editable()?;
    quote.sections.extend(template.instantiate());
    quote.recompute();
    Ok(())
}

/// Captures the quote's current section layout as a user template.
pub fn save_as_template(quote: &Quote, name: String) -> Result<Template, DomainError> {
    Template::from_sections(name, &quote.sections)
}
