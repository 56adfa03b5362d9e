//! # Commands Module
//!
//! Every operation the front end can invoke, grouped by screen.
//!
//! ## Command Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Commands                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐         │
//! │  │      cart       │  │    checkout     │  │    payment      │         │
//! │  │                 │  │                 │  │                 │         │
//! │  │ get_cart        │  │ list_addresses  │  │ open_initial_   │         │
//! │  │ add_to_cart     │  │ add_address     │  │   payment       │         │
//! │  │ add_products    │  │ select_address  │  │ open_quota_     │         │
//! │  │ update_quantity │  │ select_office   │  │   payment       │         │
//! │  │ remove_item     │  │ switch_delivery │  │ switch_currency │         │
//! │  │ clear_cart      │  │ choose_modality │  │ payment_options │         │
//! │  │ refresh_cart    │  │ place_order     │  │ exchange_rate   │         │
//! │  │ sync_cart       │  │ locations       │  │ submit_payment  │         │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘         │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │     orders      │  │    account      │                              │
//! │  │                 │  │                 │                              │
//! │  │ list_orders     │  │ sign_in         │                              │
//! │  │ get_order       │  │ sign_out        │                              │
//! │  │ open_/submit_/  │  │ unread_count    │                              │
//! │  │ close_          │  │ list_/mark_     │                              │
//! │  │  cancellation   │  │  notifications  │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take `&Storefront`, return `Result<T, ApiError>` for anything
//! that can fail, and route every engine result through
//! [`Storefront::observe`](crate::state::Storefront::observe).

pub mod account;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payment;
