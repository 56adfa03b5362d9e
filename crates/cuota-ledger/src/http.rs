//! # HTTP Ledger Client
//!
//! `LedgerClient` over Supabase Edge Functions.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  operation ──► call(function, body)                                     │
//! │                  │                                                      │
//! │                  ├─ session.bearer()   (Err(Auth) if signed out)        │
//! │                  ├─ POST {functions_url}{function}                      │
//! │                  │    Authorization: Bearer <token>                     │
//! │                  │    apikey: <anon key>                                │
//! │                  └─ decode_envelope(status, body)                       │
//! │                          │                                              │
//! │                          ▼                                              │
//! │          { success: true, data }   → Ok(data)                           │
//! │          { success: false, error } → Rejected / Auth                    │
//! │          401 / 403                 → Auth                               │
//! │          5xx without message       → Network                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use cuota_core::coerce::{self, Loose};
use cuota_core::money::{Currency, ExchangeRate};
use cuota_core::types::{
    CancellationRequest, CartItem, DeliveryTarget, NewShippingAddress, PurchaseConditions,
    RefundBreakdown, Sale, SaleId, ShippingAddress,
};

use crate::client::LedgerClient;
use crate::config::ClientConfig;
use crate::endpoints;
use crate::error::{LedgerError, LedgerResult};
use crate::session::Session;
use crate::wire::{
    self, AddCartItemsRequest, AmountDue, AmountDueRequest, CartItemPayload,
    DeliveryTargetRequest, InitialPaymentRequest, Locations, Notification, NotificationRef,
    OrderDetailBundle, PaymentMethodsCatalog, PurchaseConditionsRequest, QuotaPaymentRequest,
    RemoveCartItemRequest, SaleRef, ServerCart, SubmissionReceipt, UpdateCartItemRequest,
};

/// Error codes the backend uses for session problems.
const AUTH_CODES: &[&str] = &["AUTH_ERROR", "UNAUTHORIZED", "INVALID_TOKEN", "JWT_EXPIRED"];

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: Client,
    functions_url: Url,
    anon_key: String,
    session: Session,
}

impl HttpLedgerClient {
    /// Builds a client for the configured backend.
    ///
    /// The session is shared: signing out through any clone affects the
    /// next call made here.
    pub fn new(config: &ClientConfig, session: Session) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LedgerError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(HttpLedgerClient {
            client,
            functions_url: config.functions_url()?,
            anon_key: config.backend.anon_key.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Invokes one Edge Function and unwraps its envelope.
    async fn call<B: Serialize + ?Sized>(&self, function: &str, body: &B) -> LedgerResult<Value> {
        let token = self.session.bearer().await?;
        let url = self.functions_url.join(function)?;
        let started = Instant::now();

        let mut request = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(body);
        if !self.anon_key.is_empty() {
            if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
                request = request.header("apikey", key);
            }
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        debug!(
            function,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Edge function call"
        );

        decode_envelope(status, &text).map_err(|e| {
            warn!(function, status, error = %e, "Edge function failed");
            e
        })
    }

    async fn call_empty(&self, function: &str) -> LedgerResult<Value> {
        self.call(function, &json!({})).await
    }
}

// =============================================================================
// Envelope Decoding
// =============================================================================

/// Turns a raw response into the `data` payload or a categorized error.
///
/// Accepts `{success, data, error}` envelopes, where `error` may be a string
/// or `{code, message}`, and plain JSON bodies without a `success` key.
pub fn decode_envelope(status: u16, body: &str) -> LedgerResult<Value> {
    if status == 401 || status == 403 {
        return Err(LedgerError::Auth(
            envelope_message(body).unwrap_or_else(|| format!("HTTP {}", status)),
        ));
    }

    let ok_status = (200..300).contains(&status);
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) if ok_status => return Err(LedgerError::InvalidResponse(e.to_string())),
        Err(_) => return Err(LedgerError::Network(format!("HTTP {}", status))),
    };

    match value.get("success").and_then(Value::as_bool) {
        Some(false) => Err(rejection(&value)),
        _ if !ok_status => {
            let message = error_message(&value);
            if status >= 500 && message.is_none() {
                Err(LedgerError::Network(format!("HTTP {}", status)))
            } else if is_auth_code(&value) {
                Err(LedgerError::Auth(message.unwrap_or_default()))
            } else {
                Err(LedgerError::Rejected { message })
            }
        }
        Some(true) => Ok(value.get("data").cloned().unwrap_or(Value::Null)),
        None => Ok(value),
    }
}

fn rejection(value: &Value) -> LedgerError {
    let message = error_message(value);
    if is_auth_code(value) {
        LedgerError::Auth(message.unwrap_or_else(|| "session rejected".into()))
    } else {
        LedgerError::Rejected { message }
    }
}

fn error_message(value: &Value) -> Option<String> {
    let v = Loose::new(value);
    match v.field(&["error"]) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(error) if error.is_object() => Loose::new(error).string(&["message", "msg"]),
        _ => v.string(&["message", "msg"]),
    }
}

fn error_code(value: &Value) -> Option<String> {
    let v = Loose::new(value);
    v.object(&["error"])
        .and_then(|e| e.string(&["code"]))
        .or_else(|| v.string(&["code", "error_code"]))
}

fn is_auth_code(value: &Value) -> bool {
    if let Some(code) = error_code(value) {
        if AUTH_CODES.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
            return true;
        }
    }
    error_message(value)
        .map(|m| m.to_lowercase().contains("jwt expired"))
        .unwrap_or(false)
}

fn envelope_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| error_message(&v))
}

// =============================================================================
// LedgerClient Implementation
// =============================================================================

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn fetch_cart(&self) -> LedgerResult<ServerCart> {
        let data = self.call_empty(endpoints::CART_GET).await?;
        Ok(ServerCart::from_value(&data))
    }

    async fn fetch_cart_totals(&self) -> LedgerResult<ServerCart> {
        let data = self.call_empty(endpoints::CART_TOTALS).await?;
        Ok(ServerCart::from_value(&data))
    }

    async fn add_cart_items(&self, items: &[CartItem]) -> LedgerResult<()> {
        let request = AddCartItemsRequest {
            items: items.iter().map(CartItemPayload::from).collect(),
        };
        self.call(endpoints::CART_ADD_ITEMS, &request).await?;
        Ok(())
    }

    async fn update_cart_item(&self, item_id: &str, quantity: i64) -> LedgerResult<()> {
        let request = UpdateCartItemRequest {
            item_id: item_id.to_string(),
            quantity,
        };
        self.call(endpoints::CART_UPDATE_ITEM, &request).await?;
        Ok(())
    }

    async fn remove_cart_item(&self, item_id: &str) -> LedgerResult<()> {
        let request = RemoveCartItemRequest {
            item_id: item_id.to_string(),
        };
        self.call(endpoints::CART_REMOVE_ITEM, &request).await?;
        Ok(())
    }

    async fn clear_cart(&self) -> LedgerResult<()> {
        self.call_empty(endpoints::CART_CLEAR).await?;
        Ok(())
    }

    async fn addresses(&self) -> LedgerResult<Vec<ShippingAddress>> {
        let data = self.call_empty(endpoints::ADDRESSES_LIST).await?;
        let rows = match data.as_array() {
            Some(rows) => rows.as_slice(),
            None => Loose::new(&data).array(&["addresses", "direcciones"]),
        };
        Ok(rows.iter().filter_map(coerce::shipping_address).collect())
    }

    async fn add_address(&self, address: &NewShippingAddress) -> LedgerResult<ShippingAddress> {
        let data = self.call(endpoints::ADDRESSES_ADD, address).await?;
        let row = Loose::new(&data)
            .field(&["address", "direccion"])
            .unwrap_or(&data);
        coerce::shipping_address(row)
            .ok_or_else(|| LedgerError::InvalidResponse("address without id".into()))
    }

    async fn set_delivery_target(&self, target: &DeliveryTarget) -> LedgerResult<()> {
        let request = DeliveryTargetRequest::from(target);
        self.call(endpoints::CART_SET_SHIPPING, &request).await?;
        Ok(())
    }

    async fn locations(&self) -> LedgerResult<Locations> {
        let data = self.call_empty(endpoints::LOCATIONS_GET).await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn purchase_conditions(
        &self,
        sale_id: SaleId,
        is_lump_sum: bool,
    ) -> LedgerResult<PurchaseConditions> {
        let request = PurchaseConditionsRequest {
            sale_id,
            is_lump_sum,
        };
        let data = self.call(endpoints::PURCHASE_CONDITIONS, &request).await?;
        Ok(coerce::purchase_conditions(sale_id, is_lump_sum, &data))
    }

    async fn amount_due(&self, request: &AmountDueRequest) -> LedgerResult<AmountDue> {
        let function = if request.is_quota() {
            endpoints::QUOTA_AMOUNT
        } else {
            endpoints::INITIAL_AMOUNT
        };
        let data = self.call(function, request).await?;
        Ok(AmountDue::from_value(&data, request.currency))
    }

    async fn exchange_rate(&self) -> LedgerResult<Option<ExchangeRate>> {
        let data = self.call_empty(endpoints::EXCHANGE_RATE).await?;
        Ok(wire::exchange_rate_from_value(&data))
    }

    async fn payment_methods(&self, currency: Currency) -> LedgerResult<PaymentMethodsCatalog> {
        let data = self
            .call(endpoints::PAYMENT_METHODS, &json!({ "currency": currency }))
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    async fn submit_initial_payment(
        &self,
        request: &InitialPaymentRequest,
    ) -> LedgerResult<SubmissionReceipt> {
        let data = self.call(endpoints::SUBMIT_INITIAL_PAYMENT, request).await?;
        Ok(SubmissionReceipt::from_value(&data))
    }

    async fn submit_quota_payment(
        &self,
        request: &QuotaPaymentRequest,
    ) -> LedgerResult<SubmissionReceipt> {
        let data = self.call(endpoints::SUBMIT_QUOTA_PAYMENT, request).await?;
        Ok(SubmissionReceipt::from_value(&data))
    }

    async fn orders(&self) -> LedgerResult<Vec<Sale>> {
        let data = self.call_empty(endpoints::ORDERS_LIST).await?;
        Ok(wire::orders_from_value(&data))
    }

    async fn order_detail(&self, sale_id: SaleId) -> LedgerResult<OrderDetailBundle> {
        let data = self
            .call(endpoints::ORDER_DETAIL, &SaleRef { sale_id })
            .await?;
        Ok(OrderDetailBundle::from_value(&data))
    }

    async fn cancel_order(&self, request: &CancellationRequest) -> LedgerResult<RefundBreakdown> {
        let data = self.call(endpoints::CANCEL_ORDER, request).await?;
        let breakdown = Loose::new(&data)
            .field(&["refund", "breakdown", "reembolso"])
            .unwrap_or(&data);
        Ok(coerce::refund_breakdown(breakdown))
    }

    async fn unread_notifications(&self) -> LedgerResult<u32> {
        let data = self.call_empty(endpoints::NOTIFICATIONS_UNREAD).await?;
        let count = data
            .as_i64()
            .or_else(|| Loose::new(&data).int(&["count", "unread", "unread_count"]))
            .unwrap_or(0);
        Ok(count.max(0) as u32)
    }

    async fn notifications(&self) -> LedgerResult<Vec<Notification>> {
        let data = self.call_empty(endpoints::NOTIFICATIONS_LIST).await?;
        let rows = match data.as_array() {
            Some(rows) => rows.as_slice(),
            None => Loose::new(&data).array(&["notifications", "items"]),
        };
        Ok(rows.iter().filter_map(Notification::from_value).collect())
    }

    async fn mark_notification_read(&self, notification_id: &str) -> LedgerResult<()> {
        let request = NotificationRef {
            notification_id: notification_id.to_string(),
        };
        self.call(endpoints::NOTIFICATIONS_MARK_READ, &request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionToken;

    #[test]
    fn test_success_envelope() {
        let data = decode_envelope(200, r#"{"success":true,"data":{"rate":36.5}}"#).unwrap();
        assert_eq!(data["rate"], 36.5);

        let empty = decode_envelope(200, r#"{"success":true}"#).unwrap();
        assert!(empty.is_null());

        let bare = decode_envelope(200, r#"[1,2,3]"#).unwrap();
        assert_eq!(bare.as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_rejection_messages() {
        let plain = decode_envelope(200, r#"{"success":false,"error":"Pago duplicado"}"#);
        assert_eq!(
            plain,
            Err(LedgerError::Rejected {
                message: Some("Pago duplicado".into())
            })
        );

        let nested = decode_envelope(
            400,
            r#"{"success":false,"error":{"code":"BUSINESS_RULE","message":"Sin crédito"}}"#,
        );
        assert_eq!(nested.unwrap_err().server_message(), Some("Sin crédito"));

        let silent = decode_envelope(200, r#"{"success":false}"#);
        assert_eq!(silent, Err(LedgerError::Rejected { message: None }));
    }

    #[test]
    fn test_auth_detection() {
        assert!(decode_envelope(401, "").unwrap_err().is_auth());
        assert!(decode_envelope(403, r#"{"error":"forbidden"}"#).unwrap_err().is_auth());
        assert!(
            decode_envelope(200, r#"{"success":false,"error":{"code":"AUTH_ERROR"}}"#)
                .unwrap_err()
                .is_auth()
        );
        assert!(
            decode_envelope(400, r#"{"success":false,"error":"JWT expired"}"#)
                .unwrap_err()
                .is_auth()
        );
    }

    #[test]
    fn test_transport_failures() {
        assert_eq!(
            decode_envelope(502, "<html>Bad Gateway</html>"),
            Err(LedgerError::Network("HTTP 502".into()))
        );
        assert_eq!(
            decode_envelope(500, r#"{}"#),
            Err(LedgerError::Network("HTTP 500".into()))
        );
        assert!(matches!(
            decode_envelope(200, "not json"),
            Err(LedgerError::InvalidResponse(_))
        ));
        assert!(decode_envelope(503, "").unwrap_err().is_retryable());
    }

    #[test]
    fn test_client_error_with_message_is_rejection() {
        let err = decode_envelope(422, r#"{"message":"Dirección inválida"}"#).unwrap_err();
        assert_eq!(err.server_message(), Some("Dirección inválida"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_signed_out_call_fails_before_network() {
        let client = HttpLedgerClient::new(&ClientConfig::default(), Session::new()).unwrap();
        let err = client.fetch_cart().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_session_is_shared_with_client() {
        let session = Session::new();
        let client = HttpLedgerClient::new(&ClientConfig::default(), session.clone()).unwrap();
        session.sign_in(SessionToken::new("abc")).await;
        assert!(client.session().is_authenticated().await);
    }
}
