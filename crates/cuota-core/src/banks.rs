//! Venezuelan bank reference list.
//!
//! Used by the refund form (the bank must be one of these) and as the
//! offline fallback for the payment form's bank picker.

use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Bank {
    pub code: &'static str,
    pub name: &'static str,
}

/// Banks accepted for refunds, by SUDEBAN code.
pub const REFUND_BANKS: &[Bank] = &[
    Bank { code: "0102", name: "Banco de Venezuela" },
    Bank { code: "0104", name: "Venezolano de Crédito" },
    Bank { code: "0105", name: "Mercantil" },
    Bank { code: "0108", name: "Provincial" },
    Bank { code: "0114", name: "Bancaribe" },
    Bank { code: "0115", name: "Exterior" },
    Bank { code: "0134", name: "Banesco" },
    Bank { code: "0151", name: "BFC Banco Fondo Común" },
    Bank { code: "0156", name: "100% Banco" },
    Bank { code: "0163", name: "Banco del Tesoro" },
    Bank { code: "0166", name: "Banco Agrícola de Venezuela" },
    Bank { code: "0171", name: "Banco Activo" },
    Bank { code: "0172", name: "Bancamiga" },
    Bank { code: "0174", name: "Banplus" },
    Bank { code: "0175", name: "Banco Bicentenario" },
    Bank { code: "0191", name: "BNC Banco Nacional de Crédito" },
];

/// Looks up a bank by its four-digit code.
pub fn find(code: &str) -> Option<&'static Bank> {
    let code = code.trim();
    REFUND_BANKS.iter().find(|bank| bank.code == code)
}
