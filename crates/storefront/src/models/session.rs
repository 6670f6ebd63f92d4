//! Session keys.
//!
//! Everything the server remembers about a browser lives under one of these
//! keys in the tower session.

/// Key for the visitor id that selects the visitor's auth context.
pub const VISITOR_ID: &str = "visitor_id";

/// Key for the cart contents.
pub const CART: &str = "cart";

/// Key for a flash message shown on the next page render.
pub const FLASH: &str = "flash";
