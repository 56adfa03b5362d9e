//! Edge Function names, one per backend capability.
//!
//! Every call is `POST {base}/functions/v1/{name}` with a JSON body.

// Cart
pub const CART_GET: &str = "cart-get";
pub const CART_ADD_ITEMS: &str = "cart-add-items";
pub const CART_UPDATE_ITEM: &str = "cart-update-item";
pub const CART_REMOVE_ITEM: &str = "cart-remove-item";
pub const CART_CLEAR: &str = "cart-clear";
pub const CART_TOTALS: &str = "cart-totals";

// Delivery
pub const ADDRESSES_LIST: &str = "addresses-list";
pub const ADDRESSES_ADD: &str = "addresses-add";
pub const CART_SET_SHIPPING: &str = "cart-set-shipping";
pub const LOCATIONS_GET: &str = "locations-get";

// Payment plan
pub const PURCHASE_CONDITIONS: &str = "calculate-purchase-conditions";
pub const INITIAL_AMOUNT: &str = "get-initial-amount";
pub const QUOTA_AMOUNT: &str = "get-quota-amount";
pub const EXCHANGE_RATE: &str = "get-exchange-rate";
pub const PAYMENT_METHODS: &str = "get-payment-methods";

// Payment submission
pub const SUBMIT_INITIAL_PAYMENT: &str = "submit-initial-payment";
pub const SUBMIT_QUOTA_PAYMENT: &str = "submit-quota-payment";

// Orders
pub const ORDERS_LIST: &str = "orders-list";
pub const ORDER_DETAIL: &str = "order-detail";
pub const CANCEL_ORDER: &str = "cancel-order";

// Notifications
pub const NOTIFICATIONS_UNREAD: &str = "notifications-unread-count";
pub const NOTIFICATIONS_LIST: &str = "notifications-list";
pub const NOTIFICATIONS_MARK_READ: &str = "notifications-mark-read";
