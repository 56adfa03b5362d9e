//! # Money Module
//!
//! Monetary values, currencies and exchange-rate math.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The backend sends prices as JSON floats:                               │
//! │    19.99 * 3 = 59.97000000000001  ❌ WRONG on a receipt                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Floats are rounded to cents ONCE, at the boundary                    │
//! │    1999 cents × 3 = 5997 cents  → "$59.97"                              │
//! │                                                                         │
//! │  The same holds for bolivares: Bs amounts are céntimos (i64).           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cuota_core::money::{Currency, ExchangeRate, Money};
//!
//! let due = Money::from_cents(1000); // $10.00
//! let rate = ExchangeRate::FALLBACK; // 50 Bs per USD
//! let in_bs = rate.usd_to_bs(due);
//! assert_eq!(in_bs.format(Currency::Bs), "Bs. 500.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents / céntimos).
///
/// `Money` carries no currency of its own. Pair it with a [`Currency`]
/// when rendering or sending it to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use cuota_core::money::Money;
    ///
    /// let price = Money::from_cents(1999);
    /// assert_eq!(price.cents(), 1999);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds a wire-format decimal (e.g. `19.99` from JSON) to cents.
    ///
    /// ## When To Use
    /// Only at the boundary where the backend hands us floats. Non-finite
    /// input (NaN, infinity) becomes zero.
    ///
    /// ```rust
    /// use cuota_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(19.99).cents(), 1999);
    /// assert_eq!(Money::from_decimal(0.1 + 0.2).cents(), 30);
    /// assert_eq!(Money::from_decimal(f64::NAN).cents(), 0);
    /// ```
    pub fn from_decimal(value: f64) -> Self {
        if !value.is_finite() {
            return Money::zero();
        }
        Money((value * 100.0).round() as i64)
    }

    /// Returns the value as a wire-format decimal (for request bodies).
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars / bolivares) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Clamps negative values to zero (prices are never negative).
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart line: Widget $19.99
    /// Quantity: 3
    ///      │
    ///      ▼
    /// multiply_quantity(3) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: $59.97
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Renders the amount for display in the given currency.
    ///
    /// ```rust
    /// use cuota_core::money::{Currency, Money};
    ///
    /// assert_eq!(Money::from_cents(123456).format(Currency::Usd), "$1,234.56");
    /// assert_eq!(Money::from_cents(50000).format(Currency::Bs), "Bs. 500.00");
    /// assert_eq!(Money::from_cents(-550).format(Currency::Usd), "-$5.50");
    /// ```
    pub fn format(&self, currency: Currency) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}{}.{:02}",
            sign,
            currency.symbol(),
            group_thousands(self.dollars().unsigned_abs()),
            self.cents_part()
        )
    }

    /// Parses user-typed amounts such as `"1,250.00"` or `"35.5"`.
    ///
    /// ## Rules
    /// - Thousand separators (`,`) are stripped first
    /// - Then the text must be digits, optionally followed by `.` and
    ///   one or two decimal digits
    /// - Anything else (letters, several dots, three decimals) is rejected
    ///
    /// ```rust
    /// use cuota_core::money::Money;
    ///
    /// assert_eq!(Money::parse_amount("1,250.00"), Some(Money::from_cents(125000)));
    /// assert_eq!(Money::parse_amount("35.5"), Some(Money::from_cents(3550)));
    /// assert_eq!(Money::parse_amount("12.345"), None);
    /// assert_eq!(Money::parse_amount("abc"), None);
    /// ```
    pub fn parse_amount(input: &str) -> Option<Money> {
        let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
        let (whole, fraction) = match cleaned.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (cleaned.as_str(), None),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let minor = match fraction {
            None => 0,
            Some(f) if (1..=2).contains(&f.len()) && f.chars().all(|c| c.is_ascii_digit()) => {
                let value: i64 = f.parse().ok()?;
                if f.len() == 1 {
                    value * 10
                } else {
                    value
                }
            }
            Some(_) => return None,
        };

        let major: i64 = whole.parse().ok()?;
        major
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(minor))
            .map(Money)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering in USD. Use [`Money::format`] for UI text.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.dollars().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// Currency a payment is declared in.
///
/// Every plan is denominated in USD; bolivares are a display and
/// payment currency computed from the day's exchange rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Currency {
    /// Venezuelan bolivares.
    #[default]
    #[serde(rename = "BS", alias = "bs", alias = "VES")]
    Bs,
    /// US dollars.
    #[serde(rename = "USD", alias = "usd")]
    Usd,
}

impl Currency {
    /// Display prefix.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Currency::Bs => "Bs. ",
            Currency::Usd => "$",
        }
    }

    /// Wire code sent to the backend.
    pub const fn code(&self) -> &'static str {
        match self {
            Currency::Bs => "BS",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bs" | "ves" | "bolivares" | "bs." => Ok(Currency::Bs),
            "usd" | "$" | "dolares" => Ok(Currency::Usd),
            _ => Err(ValidationError::NotAllowed {
                field: "currency".to_string(),
                allowed: vec!["BS".to_string(), "USD".to_string()],
            }),
        }
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Bolivares per US dollar, stored in ten-thousandths.
///
/// ## Why Fixed Point?
/// Same reasoning as [`Money`]: 36.5721 Bs/USD is kept as `365_721`
/// so conversions are integer math with one explicit rounding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRate(i64);

impl ExchangeRate {
    const SCALE: i64 = 10_000;

    /// Rate used when the backend cannot quote one (degraded mode).
    pub const FALLBACK: ExchangeRate = ExchangeRate(50 * Self::SCALE);

    /// Creates a rate from a decimal quote. Returns `None` for unusable
    /// quotes (zero, negative, NaN).
    ///
    /// ```rust
    /// use cuota_core::money::ExchangeRate;
    ///
    /// assert!(ExchangeRate::from_decimal(36.5).is_some());
    /// assert!(ExchangeRate::from_decimal(0.0).is_none());
    /// assert!(ExchangeRate::from_decimal(-1.0).is_none());
    /// ```
    pub fn from_decimal(rate: f64) -> Option<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let scaled = (rate * Self::SCALE as f64).round() as i64;
        (scaled > 0).then_some(ExchangeRate(scaled))
    }

    /// Rate as a decimal (display and request bodies).
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    /// Converts a USD amount to bolivares, rounding half up to the céntimo.
    ///
    /// ```rust
    /// use cuota_core::money::{ExchangeRate, Money};
    ///
    /// let rate = ExchangeRate::from_decimal(36.55).unwrap();
    /// // $10.00 × 36.55 = Bs. 365.50
    /// assert_eq!(rate.usd_to_bs(Money::from_cents(1000)).cents(), 36550);
    /// ```
    pub fn usd_to_bs(&self, usd: Money) -> Money {
        // i128 keeps large amounts from overflowing before the division
        let scaled = usd.cents() as i128 * self.0 as i128;
        let half = Self::SCALE as i128 / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / Self::SCALE as i128
        } else {
            (scaled - half) / Self::SCALE as i128
        };
        Money::from_cents(rounded as i64)
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate::FALLBACK
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} Bs/USD", self.to_decimal())
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%), e.g. a cancellation penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a decimal value (35.0 = 35%).
    pub fn from_percentage(pct: f64) -> Self {
        if !pct.is_finite() || pct <= 0.0 {
            return Percent(0);
        }
        Percent((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1999);
        assert_eq!(money.cents(), 1999);
        assert_eq!(money.dollars(), 19);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_decimal_rounds_once() {
        assert_eq!(Money::from_decimal(19.99).cents(), 1999);
        assert_eq!(Money::from_decimal(65.47).cents(), 6547);
        assert_eq!(Money::from_decimal(-5.5).cents(), -550);
        assert_eq!(Money::from_decimal(f64::INFINITY).cents(), 0);
    }

    #[test]
    fn test_line_total_has_no_float_drift() {
        let price = Money::from_decimal(19.99);
        assert_eq!(price.multiply_quantity(3).cents(), 5997);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_format_groups_thousands() {
        assert_eq!(Money::from_cents(100).format(Currency::Usd), "$1.00");
        assert_eq!(Money::from_cents(100_000_00).format(Currency::Usd), "$100,000.00");
        assert_eq!(Money::from_cents(1_234_567_89).format(Currency::Bs), "Bs. 1,234,567.89");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(Money::parse_amount("500"), Some(Money::from_cents(50000)));
        assert_eq!(Money::parse_amount(" 1,234.56 "), Some(Money::from_cents(123456)));
        assert_eq!(Money::parse_amount("0.05"), Some(Money::from_cents(5)));

        assert_eq!(Money::parse_amount(""), None);
        assert_eq!(Money::parse_amount("."), None);
        assert_eq!(Money::parse_amount("10."), None);
        assert_eq!(Money::parse_amount(".50"), None);
        assert_eq!(Money::parse_amount("1.2.3"), None);
        assert_eq!(Money::parse_amount("-5.00"), None);
        assert_eq!(Money::parse_amount("5,00.001"), None);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_fallback_rate_conversion() {
        let bs = ExchangeRate::FALLBACK.usd_to_bs(Money::from_cents(1000));
        assert_eq!(bs.cents(), 50000);
    }

    #[test]
    fn test_rate_rounding() {
        let rate = ExchangeRate::from_decimal(36.5721).unwrap();
        // 0.01 USD × 36.5721 = 0.365721 Bs → 0.37 Bs
        assert_eq!(rate.usd_to_bs(Money::from_cents(1)).cents(), 37);
        assert!((rate.to_decimal() - 36.5721).abs() < 1e-9);
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!("bs".parse::<Currency>().unwrap(), Currency::Bs);
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert!("eur".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_wire_codes() {
        assert_eq!(serde_json::to_string(&Currency::Bs).unwrap(), "\"BS\"");
        assert_eq!(serde_json::from_str::<Currency>("\"USD\"").unwrap(), Currency::Usd);
    }

    #[test]
    fn test_percent() {
        let p = Percent::from_percentage(35.0);
        assert_eq!(p.bps(), 3500);
        assert!((p.percentage() - 35.0).abs() < 0.001);
        assert_eq!(Percent::from_percentage(f64::NAN).bps(), 0);
    }
}
