//! Product catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, ProductImageId, VariantId};

/// Maximum number of images a product may carry.
pub const MAX_PRODUCT_IMAGES: usize = 3;

/// A catalog product.
///
/// `stock_quantity` is tracked independently from the variants' stock; the
/// two pools are never reconciled automatically. See
/// [`Product::stock_discrepancy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub compare_at_price: Option<Decimal>,
    pub sku: String,
    pub stock_quantity: i64,
    #[serde(default)]
    pub reserved_quantity: i64,
    #[serde(default)]
    pub low_stock_threshold: i64,
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The primary image, falling back to the first by display order.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|image| image.is_primary)
            .or_else(|| self.images.iter().min_by_key(|image| image.display_order))
    }

    /// Variants that are neither deleted nor deactivated.
    pub fn live_variants(&self) -> impl Iterator<Item = &ProductVariant> {
        self.variants
            .iter()
            .filter(|variant| variant.is_active && !variant.is_deleted)
    }

    /// Sum of stock across live variants.
    #[must_use]
    pub fn variant_stock_total(&self) -> i64 {
        self.live_variants().map(|variant| variant.stock_quantity).sum()
    }

    /// Product-level stock minus the live variants' stock.
    ///
    /// `None` when the product has no live variants (nothing to compare).
    #[must_use]
    pub fn stock_discrepancy(&self) -> Option<i64> {
        if self.live_variants().next().is_none() {
            return None;
        }
        Some(self.stock_quantity - self.variant_stock_total())
    }

    /// Whether product-level stock is at or below the low-stock threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= self.low_stock_threshold
    }

    /// Whether the product has no stock left.
    #[must_use]
    pub const fn is_out_of_stock(&self) -> bool {
        self.stock_quantity <= 0
    }
}

/// An image attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: ProductImageId,
    pub image_url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i32,
}

/// A purchasable color/size configuration of a product.
///
/// The SKU is generated by the backend and never assigned client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: VariantId,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub price: Option<Decimal>,
    pub stock_quantity: i64,
    #[serde(default)]
    pub reserved_quantity: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

const fn default_true() -> bool {
    true
}

impl ProductVariant {
    /// Descriptor used on order lines and in lists ("Noir - 42").
    #[must_use]
    pub fn descriptor(&self) -> String {
        match (self.color.as_deref(), self.size.as_deref()) {
            (Some(color), Some(size)) => format!("{color} - {size}"),
            (Some(only), None) | (None, Some(only)) => only.to_string(),
            (None, None) => self.name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(stock: i64, variants: &[(i64, bool)]) -> Product {
        let variants: Vec<serde_json::Value> = variants
            .iter()
            .enumerate()
            .map(|(i, (stock, active))| {
                serde_json::json!({
                    "id": format!("v-{i}"),
                    "name": "Variante",
                    "sku": format!("SKU-{i}"),
                    "color": "Noir",
                    "size": "42",
                    "stockQuantity": stock,
                    "isActive": active,
                })
            })
            .collect();

        serde_json::from_value(serde_json::json!({
            "id": "p-1",
            "name": "Classic High Top",
            "slug": "classic-high-top",
            "price": "75000.00",
            "compareAtPrice": null,
            "sku": "CHT",
            "stockQuantity": stock,
            "lowStockThreshold": 5,
            "isActive": true,
            "images": [
                {"id": "img-2", "imageUrl": "https://cdn/2.jpg", "displayOrder": 2},
                {"id": "img-1", "imageUrl": "https://cdn/1.jpg", "displayOrder": 1}
            ],
            "variants": variants,
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-02T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_stock_pools_are_reported_not_reconciled() {
        let product = product(10, &[(3, true), (4, true), (50, false)]);
        assert_eq!(product.stock_quantity, 10);
        assert_eq!(product.variant_stock_total(), 7);
        assert_eq!(product.stock_discrepancy(), Some(3));
    }

    #[test]
    fn test_no_discrepancy_without_live_variants() {
        assert_eq!(product(10, &[]).stock_discrepancy(), None);
        assert_eq!(product(10, &[(2, false)]).stock_discrepancy(), None);
    }

    #[test]
    fn test_primary_image_falls_back_to_display_order() {
        let product = product(1, &[]);
        assert_eq!(product.primary_image().unwrap().id.as_str(), "img-1");
    }

    #[test]
    fn test_stock_levels() {
        assert!(product(3, &[]).is_low_stock());
        assert!(!product(30, &[]).is_low_stock());
        assert!(product(0, &[]).is_out_of_stock());
    }

    #[test]
    fn test_variant_descriptor() {
        let product = product(1, &[(1, true)]);
        assert_eq!(product.variants[0].descriptor(), "Noir - 42");
    }
}
