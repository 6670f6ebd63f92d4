//! Studio Nullbyte Core - Shared types library.
//!
//! This crate provides common types used across all Studio Nullbyte components:
//! - `storefront` - Public storefront and admin panel (BFF over Supabase)
//! - `cli` - Command-line tools for account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure arithmetic - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, roles and statuses
//! - [`checkout`] - Cart totals (tax, shipping) and customer info validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod types;

pub use checkout::{CheckoutError, CheckoutSummary, CustomerInfo, PricedLine};
pub use types::*;
