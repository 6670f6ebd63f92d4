//! Business logic for the storefront.
//!
//! # Services
//!
//! - [`catalog`] - Public product and category reads, contact form
//! - [`cart`] - Session cart
//! - [`admin`] - Admin panel CRUD with audit logging
//!
//! Services take the visitor's [`Datastore`](crate::supabase::Datastore)
//! (and session, for the cart) as arguments; they hold no state of their
//! own.

pub mod admin;
pub mod cart;
pub mod catalog;
