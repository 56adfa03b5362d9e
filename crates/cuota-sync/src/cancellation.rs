//! # Cancellation Flow
//!
//! Cancelling an order and showing the refund the server computed.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──open(sale)──► FormOpen ──submit──► Validating ──► Submitting    │
//! │          │                ▲                    │               │        │
//! │          │                │                    ▼               ▼        │
//! │   not cancellable         └──── submit ──── Error(msg)   Success(refund)│
//! │   → InvalidSaleStatus          (form kept)                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Penalties are never computed here; the breakdown is rendered as received.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use cuota_core::error::CoreError;
use cuota_core::types::{RefundBreakdown, Sale, SaleId};
use cuota_core::validation::{validate_cancellation_form, CancellationForm};
use cuota_ledger::LedgerClient;

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum CancellationPhase {
    Idle,
    FormOpen,
    Validating,
    Submitting,
    Success(RefundBreakdown),
    Error(String),
}

pub struct CancellationFlow {
    ledger: Arc<dyn LedgerClient>,
    sale_id: Option<SaleId>,
    phase: CancellationPhase,
    form: CancellationForm,
}

impl CancellationFlow {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        CancellationFlow {
            ledger,
            sale_id: None,
            phase: CancellationPhase::Idle,
            form: CancellationForm::default(),
        }
    }

    pub fn phase(&self) -> &CancellationPhase {
        &self.phase
    }

    pub fn form(&self) -> &CancellationForm {
        &self.form
    }

    /// Form contents; edits are kept across failed submissions.
    pub fn form_mut(&mut self) -> &mut CancellationForm {
        &mut self.form
    }

    /// Opens the form for `sale` if its status still allows cancelling.
    pub fn open(&mut self, sale: &Sale) -> SyncResult<()> {
        if !sale.can_cancel() {
            return Err(CoreError::InvalidSaleStatus {
                sale_id: sale.id,
                current_status: sale.status.label().to_string(),
            }
            .into());
        }
        if self.sale_id != Some(sale.id) {
            self.form = CancellationForm::default();
        }
        self.sale_id = Some(sale.id);
        self.phase = CancellationPhase::FormOpen;
        Ok(())
    }

    /// Validates the form and submits the cancellation.
    ///
    /// Validation and server failures move to `Error(message)` with the
    /// form untouched, so the user can correct and submit again.
    pub async fn submit(&mut self) -> SyncResult<RefundBreakdown> {
        let sale_id = match (&self.phase, self.sale_id) {
            (CancellationPhase::FormOpen | CancellationPhase::Error(_), Some(id)) => id,
            _ => return Err(SyncError::InvalidState("cancellation form is not open".into())),
        };

        self.phase = CancellationPhase::Validating;
        let request = match validate_cancellation_form(sale_id, &self.form) {
            Ok(request) => request,
            Err(e) => {
                self.phase = CancellationPhase::Error(e.to_string());
                return Err(e.into());
            }
        };

        self.phase = CancellationPhase::Submitting;
        match self.ledger.cancel_order(&request).await {
            Ok(refund) => {
                info!(
                    sale_id,
                    net_refund_usd = %refund.net_refund_usd,
                    late_quotas = refund.late_quota_count,
                    "Order cancelled"
                );
                self.phase = CancellationPhase::Success(refund.clone());
                Ok(refund)
            }
            Err(e) => {
                let err = SyncError::from(e);
                warn!(sale_id, error = %err, "Cancellation failed");
                self.phase = CancellationPhase::Error(err.user_message());
                Err(err)
            }
        }
    }

    /// Closes the form. The typed data is dropped after a success.
    pub fn close(&mut self) {
        if matches!(self.phase, CancellationPhase::Success(_)) {
            self.form = CancellationForm::default();
            self.sale_id = None;
        }
        self.phase = CancellationPhase::Idle;
    }
}
