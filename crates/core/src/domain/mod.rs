pub mod labor;
pub mod material;
pub mod quote;
pub mod template;

use rust_decimal::Decimal;

use crate::errors::DomainError;

pub(crate) fn fresh_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub(crate) fn non_blank(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}

pub(crate) fn non_negative(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::Validation(format!("{field} must not be negative")));
    }
    Ok(())
}

pub(crate) fn positive(field: &str, value: u32) -> Result<(), DomainError> {
    if value == 0 {
        return Err(DomainError::Validation(format!("{field} must be greater than zero")));
    }
    Ok(())
}

pub(crate) fn percentage(field: &str, value: Decimal) -> Result<(), DomainError> {
    non_negative(field, value)?;
    if value > Decimal::ONE_HUNDRED {
        return Err(DomainError::Validation(format!("{field} must not exceed 100")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{fresh_id, non_blank, non_negative, percentage, positive};

    #[test]
    fn fresh_ids_are_simple_uuids() {
        let id = fresh_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(non_blank("client_name", "  ").is_err());
        assert!(non_blank("client_name", "Dupont").is_ok());
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(non_negative("quantity", Decimal::new(-1, 0)).is_err());
        assert!(non_negative("quantity", Decimal::ZERO).is_ok());
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(positive("validity_days", 0).is_err());
        assert!(positive("validity_days", 30).is_ok());
    }

    #[test]
    fn percentages_are_bounded() {
        assert!(percentage("discount_percentage", Decimal::new(101, 0)).is_err());
        assert!(percentage("discount_percentage", Decimal::ONE_HUNDRED).is_ok());
    }
}
