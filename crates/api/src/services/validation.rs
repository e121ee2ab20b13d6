//! Input checks shared by the services.

use crate::services::ServiceError;

/// Largest quantity a single cart or order line may carry.
pub const MAX_LINE_QUANTITY: i64 = 1_000;

/// Rejects line quantities outside `1..=MAX_LINE_QUANTITY`.
///
/// # Errors
///
/// Returns `ServiceError::Validation` when out of range.
pub fn check_quantity(quantity: i64) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::validation("Valid quantity required"));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(quantity_limit());
    }
    Ok(())
}

pub(crate) fn quantity_limit() -> ServiceError {
    ServiceError::validation(format!("Quantity cannot exceed {MAX_LINE_QUANTITY}"))
}

/// Whether `raw` is an Indian mobile number: ten digits starting 6-9,
/// optionally prefixed by `+91`, `91` or `0`.
#[must_use]
pub fn is_indian_mobile(raw: &str) -> bool {
    let raw = raw.trim();
    let number = raw
        .strip_prefix("+91")
        .or_else(|| (raw.len() == 12).then(|| raw.strip_prefix("91")).flatten())
        .or_else(|| (raw.len() == 11).then(|| raw.strip_prefix('0')).flatten())
        .unwrap_or(raw);

    number.len() == 10
        && number.bytes().all(|b| b.is_ascii_digit())
        && matches!(number.as_bytes().first(), Some(b'6'..=b'9'))
}

/// Whether `raw` is a six-digit postal code.
#[must_use]
pub fn is_pincode(raw: &str) -> bool {
    let raw = raw.trim();
    raw.len() == 6 && raw.bytes().all(|b| b.is_ascii_digit())
}

/// Trimmed value, or `None` when blank.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indian_mobile_prefixes() {
        assert!(is_indian_mobile("9876543210"));
        assert!(is_indian_mobile("+919876543210"));
        assert!(is_indian_mobile("919876543210"));
        assert!(is_indian_mobile("09876543210"));
        assert!(is_indian_mobile(" 6300012345 "));
    }

    #[test]
    fn test_indian_mobile_rejects() {
        assert!(!is_indian_mobile("5876543210"));
        assert!(!is_indian_mobile("987654321"));
        assert!(!is_indian_mobile("98765432100"));
        assert!(!is_indian_mobile("98765-43210"));
        assert!(!is_indian_mobile(""));
    }

    #[test]
    fn test_pincode() {
        assert!(is_pincode("524001"));
        assert!(!is_pincode("52400"));
        assert!(!is_pincode("52400a"));
    }

    #[test]
    fn test_check_quantity_bounds() {
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(
            check_quantity(0),
            Err(ServiceError::Validation(ref m)) if m == "Valid quantity required"
        ));
        assert!(matches!(
            check_quantity(100_000_000_000_000),
            Err(ServiceError::Validation(ref m)) if m == "Quantity cannot exceed 1000"
        ));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Ravi ")), Some("Ravi".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
