//! # Validation Module
//!
//! Form rules for payment evidence and cancellation requests.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end                                                     │
//! │  └── Field masks, immediate feedback                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Every rule, evaluated in a fixed order, first failure wins.        │
//! │      A form that fails here never produces a request.                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                       │
//! │  └── Duplicate references, amounts vs. plan, business rules             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use chrono::Utc;
//! use cuota_core::money::Currency;
//! use cuota_core::types::PaymentMethod;
//! use cuota_core::validation::{validate_payment_form, PaymentForm};
//!
//! let form = PaymentForm {
//!     method: PaymentMethod::Cash,
//!     receipt_image: Some(vec![0xFF, 0xD8]),
//!     ..PaymentForm::new(PaymentMethod::Cash, Currency::Usd)
//! };
//! assert!(validate_payment_form(&form, Utc::now()).is_ok());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::banks;
use crate::error::ValidationError;
use crate::money::{Currency, Money};
use crate::types::{CancellationRequest, IdPrefix, PaymentEvidence, PaymentMethod, SaleId};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Cancellation reason length, in characters.
pub const REASON_MIN_CHARS: usize = 10;
pub const REASON_MAX_CHARS: usize = 500;

// =============================================================================
// Payment Form
// =============================================================================

/// Raw payment form contents, exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentForm {
    pub method: PaymentMethod,
    pub bank_code: Option<String>,
    pub reference: String,
    /// Deposited amount as typed, e.g. `"1,250.00"`.
    pub amount: String,
    pub currency: Currency,
    #[serde(skip)]
    pub receipt_image: Option<Vec<u8>>,
}

impl PaymentForm {
    /// An empty form for the given method and currency.
    pub fn new(method: PaymentMethod, currency: Currency) -> Self {
        PaymentForm {
            method,
            bank_code: None,
            reference: String::new(),
            amount: String::new(),
            currency,
            receipt_image: None,
        }
    }
}

/// Validates a payment form and turns it into submittable evidence.
///
/// ## Rule Order (first failure wins)
/// 1. Non-cash: reference, then amount, then bank must be filled in
/// 2. Every method: a receipt image is attached
/// 3. Non-cash: the amount parses as `digits[.d[d]]` after stripping `,`
///
/// Cash skips rules 1 and 3 entirely; its reference, bank and amount are
/// dropped from the evidence.
pub fn validate_payment_form(
    form: &PaymentForm,
    submitted_at: DateTime<Utc>,
) -> ValidationResult<PaymentEvidence> {
    let cash = form.method.is_cash();
    let bank_code = form
        .bank_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());

    if !cash {
        if form.reference.trim().is_empty() {
            return Err(ValidationError::required("reference number"));
        }
        if form.amount.trim().is_empty() {
            return Err(ValidationError::required("deposited amount"));
        }
        if bank_code.is_none() {
            return Err(ValidationError::select("bank"));
        }
    }

    let receipt = match &form.receipt_image {
        Some(bytes) if !bytes.is_empty() => bytes.clone(),
        _ => return Err(ValidationError::MissingReceipt { cash }),
    };

    if cash {
        return Ok(PaymentEvidence {
            method: form.method,
            bank_code: None,
            reference_number: None,
            declared_amount: None,
            currency: form.currency,
            receipt_image: receipt,
            submitted_at,
        });
    }

    let amount = validate_amount_input(&form.amount)?;

    Ok(PaymentEvidence {
        method: form.method,
        bank_code: bank_code.map(str::to_string),
        reference_number: Some(form.reference.trim().to_string()),
        declared_amount: Some(amount),
        currency: form.currency,
        receipt_image: receipt,
        submitted_at,
    })
}

/// Validates a typed amount: thousand separators allowed, at most two
/// decimals, greater than zero.
///
/// ```rust
/// use cuota_core::validation::validate_amount_input;
///
/// assert_eq!(validate_amount_input("1,250.00").unwrap().cents(), 125000);
/// assert!(validate_amount_input("10.999").is_err());
/// ```
pub fn validate_amount_input(input: &str) -> ValidationResult<Money> {
    let amount = Money::parse_amount(input).ok_or_else(|| {
        ValidationError::format("deposited amount", "use numbers with up to two decimals, e.g. 1,250.00")
    })?;

    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "deposited amount".to_string(),
        });
    }

    Ok(amount)
}

// =============================================================================
// Cancellation Form
// =============================================================================

/// Raw cancellation form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationForm {
    pub reason: String,
    pub refund_phone: String,
    pub refund_bank_code: Option<String>,
    pub id_prefix: Option<IdPrefix>,
    pub id_number: String,
}

/// Validates a cancellation form into a request for `sale_id`.
///
/// ## Rule Order
/// reason → refund phone → refund bank → id type → id number
pub fn validate_cancellation_form(
    sale_id: SaleId,
    form: &CancellationForm,
) -> ValidationResult<CancellationRequest> {
    let reason = validate_reason(&form.reason)?;
    let refund_phone = validate_refund_phone(&form.refund_phone)?;

    let bank_code = form
        .refund_bank_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ValidationError::select("bank"))?;
    let bank = banks::find(bank_code).ok_or_else(|| ValidationError::NotAllowed {
        field: "bank".to_string(),
        allowed: banks::REFUND_BANKS.iter().map(|b| b.code.to_string()).collect(),
    })?;

    let id_prefix = form
        .id_prefix
        .ok_or_else(|| ValidationError::select("id type (V, E or J)"))?;
    let id_number = validate_id_number(&form.id_number)?;

    Ok(CancellationRequest {
        sale_id,
        reason,
        refund_phone,
        refund_bank_code: bank.code.to_string(),
        id_prefix,
        id_number,
    })
}

/// Cancellation reason: 10 to 500 characters after trimming.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();
    let chars = reason.chars().count();

    if chars == 0 {
        return Err(ValidationError::required("cancellation reason"));
    }
    if chars < REASON_MIN_CHARS {
        return Err(ValidationError::TooShort {
            field: "cancellation reason".to_string(),
            min: REASON_MIN_CHARS,
        });
    }
    if chars > REASON_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: "cancellation reason".to_string(),
            max: REASON_MAX_CHARS,
        });
    }

    Ok(reason.to_string())
}

/// Refund phone: digits only, 10 or 11 of them.
pub fn validate_refund_phone(phone: &str) -> ValidationResult<String> {
    digits_between(phone, "refund phone", 10, 11)
}

/// National id number: digits only, 7 to 9 of them.
pub fn validate_id_number(id: &str) -> ValidationResult<String> {
    digits_between(id, "id number", 7, 9)
}

fn digits_between(value: &str, field: &str, min: usize, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::format(field, "digits only"));
    }
    if !(min..=max).contains(&value.len()) {
        return Err(ValidationError::OutOfRange {
            field: format!("{} length", field),
            min: min as i64,
            max: max as i64,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_form() -> PaymentForm {
        PaymentForm {
            method: PaymentMethod::MobileTransfer,
            bank_code: Some("0134".to_string()),
            reference: "00123456".to_string(),
            amount: "1,250.00".to_string(),
            currency: Currency::Bs,
            receipt_image: Some(vec![1, 2, 3]),
        }
    }

    fn cancel_form() -> CancellationForm {
        CancellationForm {
            reason: "Ya no necesito el producto".to_string(),
            refund_phone: "04141234567".to_string(),
            refund_bank_code: Some("0102".to_string()),
            id_prefix: Some(IdPrefix::V),
            id_number: "12345678".to_string(),
        }
    }

    #[test]
    fn test_valid_transfer() {
        let evidence = validate_payment_form(&transfer_form(), Utc::now()).unwrap();
        assert_eq!(evidence.declared_amount, Some(Money::from_cents(125000)));
        assert_eq!(evidence.bank_code.as_deref(), Some("0134"));
        assert_eq!(evidence.reference_number.as_deref(), Some("00123456"));
    }

    #[test]
    fn test_payment_rule_order() {
        let mut form = transfer_form();
        form.reference.clear();
        form.amount.clear();
        form.bank_code = None;
        form.receipt_image = None;
        assert_eq!(
            validate_payment_form(&form, Utc::now()).unwrap_err(),
            ValidationError::required("reference number")
        );

        form.reference = "1".to_string();
        assert_eq!(
            validate_payment_form(&form, Utc::now()).unwrap_err(),
            ValidationError::required("deposited amount")
        );

        form.amount = "abc".to_string();
        assert_eq!(
            validate_payment_form(&form, Utc::now()).unwrap_err(),
            ValidationError::select("bank")
        );

        // Receipt is checked before the amount format
        form.bank_code = Some("0105".to_string());
        assert_eq!(
            validate_payment_form(&form, Utc::now()).unwrap_err(),
            ValidationError::MissingReceipt { cash: false }
        );

        form.receipt_image = Some(vec![9]);
        assert!(matches!(
            validate_payment_form(&form, Utc::now()).unwrap_err(),
            ValidationError::InvalidFormat { .. }
        ));
    }

    #[test]
    fn test_cash_skips_reference_bank_and_amount() {
        let form = PaymentForm {
            receipt_image: Some(vec![0xFF]),
            ..PaymentForm::new(PaymentMethod::Cash, Currency::Usd)
        };
        let evidence = validate_payment_form(&form, Utc::now()).unwrap();
        assert!(evidence.reference_number.is_none());
        assert!(evidence.bank_code.is_none());
        assert!(evidence.declared_amount.is_none());
    }

    #[test]
    fn test_cash_still_requires_receipt() {
        let form = PaymentForm::new(PaymentMethod::Cash, Currency::Usd);
        assert_eq!(
            validate_payment_form(&form, Utc::now()).unwrap_err(),
            ValidationError::MissingReceipt { cash: true }
        );

        let form = PaymentForm {
            receipt_image: Some(Vec::new()),
            ..PaymentForm::new(PaymentMethod::Cash, Currency::Usd)
        };
        assert!(validate_payment_form(&form, Utc::now()).is_err());
    }

    #[test]
    fn test_amount_format() {
        assert_eq!(validate_amount_input("35").unwrap().cents(), 3500);
        assert_eq!(validate_amount_input("1,000,000.5").unwrap().cents(), 100_000_050);
        assert!(validate_amount_input("10.999").is_err());
        assert!(validate_amount_input("1O.00").is_err());
        assert!(matches!(
            validate_amount_input("0.00").unwrap_err(),
            ValidationError::MustBePositive { .. }
        ));
    }

    #[test]
    fn test_reason_length_boundary() {
        assert!(validate_reason(&"a".repeat(9)).is_err());
        assert!(validate_reason(&"a".repeat(10)).is_ok());
        assert!(validate_reason(&"a".repeat(500)).is_ok());
        assert!(validate_reason(&"a".repeat(501)).is_err());
        // Counted in characters, not bytes
        assert!(validate_reason(&"ñ".repeat(10)).is_ok());
        assert!(validate_reason("   corto   ").is_err());
    }

    #[test]
    fn test_id_number_boundary() {
        assert!(validate_id_number("123456").is_err());
        assert!(validate_id_number("1234567").is_ok());
        assert!(validate_id_number("123456789").is_ok());
        assert!(validate_id_number("1234567890").is_err());
        assert!(validate_id_number("12.345.678").is_err());
    }

    #[test]
    fn test_refund_phone() {
        assert!(validate_refund_phone("0414123456").is_ok());
        assert!(validate_refund_phone("04141234567").is_ok());
        assert!(validate_refund_phone("041412345").is_err());
        assert!(validate_refund_phone("0414-123-4567").is_err());
    }

    #[test]
    fn test_valid_cancellation() {
        let request = validate_cancellation_form(42, &cancel_form()).unwrap();
        assert_eq!(request.sale_id, 42);
        assert_eq!(request.refund_bank_code, "0102");
        assert_eq!(request.id_prefix, IdPrefix::V);
    }

    #[test]
    fn test_cancellation_requires_listed_bank_and_prefix() {
        let mut form = cancel_form();
        form.refund_bank_code = None;
        assert_eq!(
            validate_cancellation_form(1, &form).unwrap_err(),
            ValidationError::select("bank")
        );

        form.refund_bank_code = Some("9999".to_string());
        assert!(matches!(
            validate_cancellation_form(1, &form).unwrap_err(),
            ValidationError::NotAllowed { .. }
        ));

        form.refund_bank_code = Some("0134".to_string());
        form.id_prefix = None;
        assert!(matches!(
            validate_cancellation_form(1, &form).unwrap_err(),
            ValidationError::Selection { .. }
        ));
    }
}
