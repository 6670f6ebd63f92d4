//! `products` and `categories` rows.

use chrono::{DateTime, Utc};
use nullbyte_core::{CategoryId, Price, ProductId};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// Columns selected for product listings, embedding the category.
pub const PRODUCT_COLUMNS: &str = "*,category:categories(name,slug)";

/// Embedded `categories(name, slug)` on a product row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category: Option<CategorySummary>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub featured: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }
}

/// A new product as submitted from the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Partial product update; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A new category; stored active with a slug derived from the name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategoryInput {
    /// The row written to `categories`.
    #[must_use]
    pub fn to_row(&self) -> serde_json::Value {
        let name = self.name.trim();
        serde_json::json!({
            "name": name,
            "slug": slugify(name),
            "description": self.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
            "is_active": true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Lowercase ASCII alphanumerics joined by single hyphens.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_row_with_embedded_category() {
        let product: Product = serde_json::from_value(json!({
            "id": "5d0c9a3e-1b1e-4f7e-8c9a-2e1f0a3b4c5d",
            "title": "Notion Dashboard",
            "description": null,
            "price": 29.99,
            "category_id": null,
            "category": { "name": "Notion", "slug": "notion" },
            "tags": null,
            "featured": true,
            "active": false,
            "created_at": "2024-05-02T08:30:00+00:00"
        }))
        .unwrap();

        assert_eq!(product.price.to_string(), "$29.99");
        assert_eq!(product.category_name(), Some("Notion"));
        assert!(product.tags.is_empty());
        assert!(product.featured);
        assert!(!product.active);
    }

    #[test]
    fn test_product_input_defaults_to_active() {
        let input: ProductInput =
            serde_json::from_value(json!({ "title": "Kit", "price": "12.00" })).unwrap();
        assert!(input.active);
        assert!(!input.featured);
    }

    #[test]
    fn test_product_update_serializes_only_set_fields() {
        let update = ProductUpdate {
            active: Some(false),
            ..ProductUpdate::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "active": false }));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Web Templates"), "web-templates");
        assert_eq!(slugify("  AI & ML  Prompts!"), "ai-ml-prompts");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_category_input_row() {
        let input = CategoryInput {
            name: " Notion Kits ".to_owned(),
            description: Some("  ".to_owned()),
        };
        assert_eq!(
            input.to_row(),
            json!({
                "name": "Notion Kits",
                "slug": "notion-kits",
                "description": null,
                "is_active": true
            })
        );
    }
}
