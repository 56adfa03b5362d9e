//! # Status Module
//!
//! The single mapping from free-text server statuses to closed enums.
//!
//! ## Why One Table?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The backend sends statuses as Spanish free text with loose casing:    │
//! │                                                                         │
//! │    "Orden Confirmada"   "en_proceso"   "ATRASADA"   "En revisión"       │
//! │                                                                         │
//! │  Every status-dependent decision reads the SAME enum:                   │
//! │                                                                         │
//! │    raw ──► normalize() ──► SaleStatus ──┬──► tier()      (colors)       │
//! │                                         ├──► label()     (UI text)      │
//! │                                         └──► can_cancel()               │
//! │                                                                         │
//! │    raw ──► normalize() ──► QuotaStatus ─────► is_payable()              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown strings map to `Unrecognized` instead of failing: the backend
//! vocabulary grows without client releases.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::PaymentInstallment;

// =============================================================================
// Normalization
// =============================================================================

/// Canonical form used for table lookups.
///
/// Lowercases, strips Spanish accents, treats `_` and `-` as spaces and
/// collapses runs of whitespace.
///
/// ```rust
/// use cuota_core::status::normalize;
///
/// assert_eq!(normalize("  Orden_Confirmada "), "orden confirmada");
/// assert_eq!(normalize("En revisión"), "en revision");
/// ```
pub fn normalize(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            '_' | '-' => ' ',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle status of a sale (order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case", from = "String")]
#[ts(export)]
pub enum SaleStatus {
    /// Sale row exists, nothing paid yet.
    Pending,
    /// Initial payment submitted, order placed with the store.
    Ordered,
    /// Confirmed by operations, awaiting delivery ("Por entregar").
    Confirmed,
    /// Shipping or otherwise in progress.
    InProcess,
    /// Delivered to the customer.
    Delivered,
    /// Customer asked to cancel, refund under review.
    CancellationRequested,
    /// Canceled.
    Canceled,
    /// A status string this client does not know yet.
    Unrecognized,
}

const SALE_STATUS_TABLE: &[(&str, SaleStatus)] = &[
    ("pending", SaleStatus::Pending),
    ("pendiente", SaleStatus::Pending),
    ("por pagar", SaleStatus::Pending),
    ("esperando pago", SaleStatus::Pending),
    ("ordered", SaleStatus::Ordered),
    ("ordenado", SaleStatus::Ordered),
    ("orden realizada", SaleStatus::Ordered),
    ("pedido realizado", SaleStatus::Ordered),
    ("confirmed", SaleStatus::Confirmed),
    ("confirmada", SaleStatus::Confirmed),
    ("orden confirmada", SaleStatus::Confirmed),
    ("por entregar", SaleStatus::Confirmed),
    ("in process", SaleStatus::InProcess),
    ("processing", SaleStatus::InProcess),
    ("en proceso", SaleStatus::InProcess),
    ("procesando", SaleStatus::InProcess),
    ("en transito", SaleStatus::InProcess),
    ("enviado", SaleStatus::InProcess),
    ("delivered", SaleStatus::Delivered),
    ("entregado", SaleStatus::Delivered),
    ("entregada", SaleStatus::Delivered),
    ("completada", SaleStatus::Delivered),
    ("cancellation requested", SaleStatus::CancellationRequested),
    ("cancelacion solicitada", SaleStatus::CancellationRequested),
    ("solicitud de cancelacion", SaleStatus::CancellationRequested),
    ("en cancelacion", SaleStatus::CancellationRequested),
    ("canceled", SaleStatus::Canceled),
    ("cancelled", SaleStatus::Canceled),
    ("cancelada", SaleStatus::Canceled),
    ("cancelado", SaleStatus::Canceled),
    ("anulada", SaleStatus::Canceled),
];

impl SaleStatus {
    /// Maps a raw server string through the status table.
    ///
    /// ```rust
    /// use cuota_core::status::SaleStatus;
    ///
    /// assert_eq!(SaleStatus::from_raw("Orden Confirmada"), SaleStatus::Confirmed);
    /// assert_eq!(SaleStatus::from_raw("en_proceso"), SaleStatus::InProcess);
    /// assert_eq!(SaleStatus::from_raw("???"), SaleStatus::Unrecognized);
    /// ```
    pub fn from_raw(raw: &str) -> Self {
        let key = normalize(raw);
        SALE_STATUS_TABLE
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, status)| *status)
            .unwrap_or(SaleStatus::Unrecognized)
    }

    /// Severity tier driving the badge colors.
    pub const fn tier(&self) -> StatusTier {
        match self {
            SaleStatus::Delivered => StatusTier::Success,
            SaleStatus::Confirmed | SaleStatus::InProcess => StatusTier::Processing,
            SaleStatus::Pending
            | SaleStatus::Ordered
            | SaleStatus::CancellationRequested
            | SaleStatus::Unrecognized => StatusTier::Pending,
            SaleStatus::Canceled => StatusTier::Canceled,
        }
    }

    /// Human label. Confirmed orders read "Por entregar".
    pub const fn label(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "Pendiente",
            SaleStatus::Ordered => "Orden realizada",
            SaleStatus::Confirmed => "Por entregar",
            SaleStatus::InProcess => "En proceso",
            SaleStatus::Delivered => "Entregado",
            SaleStatus::CancellationRequested => "Cancelación solicitada",
            SaleStatus::Canceled => "Cancelado",
            SaleStatus::Unrecognized => "Desconocido",
        }
    }

    /// Whether the customer may request cancellation.
    ///
    /// Only confirmed (to be delivered) and in-process orders qualify.
    pub const fn can_cancel(&self) -> bool {
        matches!(self, SaleStatus::Confirmed | SaleStatus::InProcess)
    }
}

impl From<String> for SaleStatus {
    fn from(raw: String) -> Self {
        SaleStatus::from_raw(&raw)
    }
}

// =============================================================================
// Status Tier
// =============================================================================

/// Display severity shared by order list, order detail and timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum StatusTier {
    Success,
    Processing,
    Pending,
    Canceled,
}

impl StatusTier {
    /// Gradient color pair (start, end) for the status badge.
    pub const fn colors(&self) -> (&'static str, &'static str) {
        match self {
            StatusTier::Success => ("#10B981", "#059669"),
            StatusTier::Processing => ("#3B82F6", "#2563EB"),
            StatusTier::Pending => ("#F59E0B", "#D97706"),
            StatusTier::Canceled => ("#EF4444", "#DC2626"),
        }
    }
}

impl std::str::FromStr for StatusTier {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "success" => Ok(StatusTier::Success),
            "processing" => Ok(StatusTier::Processing),
            "pending" => Ok(StatusTier::Pending),
            "canceled" | "cancelled" => Ok(StatusTier::Canceled),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: ["success", "processing", "pending", "canceled"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Everything the UI needs to draw a status badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusDisplay {
    pub status: SaleStatus,
    pub tier: StatusTier,
    pub label: String,
    pub color_from: String,
    pub color_to: String,
}

impl StatusDisplay {
    /// Builds the badge for a raw server status. Unknown statuses keep the
    /// server's own text as their label.
    pub fn for_raw(raw: &str) -> Self {
        let status = SaleStatus::from_raw(raw);
        let tier = status.tier();
        let (from, to) = tier.colors();
        let label = match status {
            SaleStatus::Unrecognized if !raw.trim().is_empty() => raw.trim().to_string(),
            _ => status.label().to_string(),
        };

        StatusDisplay {
            status,
            tier,
            label,
            color_from: from.to_string(),
            color_to: to.to_string(),
        }
    }
}

// =============================================================================
// Quota Status
// =============================================================================

/// Status of one scheduled installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case", from = "String")]
#[ts(export)]
pub enum QuotaStatus {
    Pending,
    Overdue,
    Paid,
    UnderReview,
    Rejected,
    CriticalDelinquency,
    Unrecognized,
}

const QUOTA_STATUS_TABLE: &[(&str, QuotaStatus)] = &[
    ("pending", QuotaStatus::Pending),
    ("pendiente", QuotaStatus::Pending),
    ("overdue", QuotaStatus::Overdue),
    ("late", QuotaStatus::Overdue),
    ("atrasada", QuotaStatus::Overdue),
    ("atrasado", QuotaStatus::Overdue),
    ("vencida", QuotaStatus::Overdue),
    ("paid", QuotaStatus::Paid),
    ("pagada", QuotaStatus::Paid),
    ("pagado", QuotaStatus::Paid),
    ("aprobada", QuotaStatus::Paid),
    ("under review", QuotaStatus::UnderReview),
    ("underreview", QuotaStatus::UnderReview),
    ("en revision", QuotaStatus::UnderReview),
    ("por verificar", QuotaStatus::UnderReview),
    ("rejected", QuotaStatus::Rejected),
    ("rechazada", QuotaStatus::Rejected),
    ("rechazado", QuotaStatus::Rejected),
    ("critical delinquency", QuotaStatus::CriticalDelinquency),
    ("criticaldelinquency", QuotaStatus::CriticalDelinquency),
    ("morosidad critica", QuotaStatus::CriticalDelinquency),
    ("mora critica", QuotaStatus::CriticalDelinquency),
];

impl QuotaStatus {
    /// Maps a raw server string through the quota table.
    pub fn from_raw(raw: &str) -> Self {
        let key = normalize(raw);
        QUOTA_STATUS_TABLE
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, status)| *status)
            .unwrap_or(QuotaStatus::Unrecognized)
    }

    /// Statuses that can receive a payment.
    pub const fn is_payable(&self) -> bool {
        matches!(
            self,
            QuotaStatus::Pending | QuotaStatus::Overdue | QuotaStatus::CriticalDelinquency
        )
    }

    pub const fn label(&self) -> &'static str {
        match self {
            QuotaStatus::Pending => "Pendiente",
            QuotaStatus::Overdue => "Atrasada",
            QuotaStatus::Paid => "Pagada",
            QuotaStatus::UnderReview => "En revisión",
            QuotaStatus::Rejected => "Rechazada",
            QuotaStatus::CriticalDelinquency => "Morosidad crítica",
            QuotaStatus::Unrecognized => "Desconocido",
        }
    }
}

impl From<String> for QuotaStatus {
    fn from(raw: String) -> Self {
        QuotaStatus::from_raw(&raw)
    }
}

// =============================================================================
// Next Payable Quota
// =============================================================================

/// Index of the quota that currently accepts a payment.
///
/// ## Rule
/// The payable quota with the lowest `sequence_number`, regardless of the
/// slice order. Paid, under-review and rejected quotas are skipped.
///
/// ```text
/// sequence:  1      2      3         4        5
/// status:    paid   paid   overdue   pending  paid
///                          ▲
///                          └── next payable (index 2)
/// ```
pub fn next_payable_index(quotas: &[PaymentInstallment]) -> Option<usize> {
    quotas
        .iter()
        .enumerate()
        .filter(|(_, q)| q.status.is_payable())
        .min_by_key(|(_, q)| q.sequence_number)
        .map(|(index, _)| index)
}

// =============================================================================
// Unit Tests
// =============================================================================
