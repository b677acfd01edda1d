//! Product and variant endpoints.
//!
//! Product creation and update are sent as `multipart/form-data` because
//! they carry image files; variants are plain JSON.

use comptoir_core::{
    ListMeta, MAX_PRODUCT_IMAGES, Product, ProductId, ProductImageId, ProductVariant, VariantId,
};
use reqwest::multipart::{Form, Part};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use super::{ApiClient, segment};
use crate::error::ApiError;

/// Query parameters of the product list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductList {
    pub items: Vec<Product>,
    pub meta: Option<ListMeta>,
}

/// An image file to upload.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    fn into_part(self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|e| ApiError::InvalidInput(format!("Invalid image type: {e}")))
    }
}

/// Fields of a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub short_description: String,
    pub price: Decimal,
    pub stock_quantity: i64,
    pub images: Vec<ImageUpload>,
}

impl NewProduct {
    /// Check the product before sending it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` on an empty name, a negative price
    /// or stock, or more than [`MAX_PRODUCT_IMAGES`] images.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::InvalidInput("Le nom du produit est requis".to_string()));
        }
        check_price(self.price)?;
        check_stock(self.stock_quantity)?;
        check_image_count(self.images.len())
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new()
            .text("name", self.name)
            .text("shortDescription", self.short_description)
            .text("price", self.price.to_string())
            .text("stockQuantity", self.stock_quantity.to_string());
        for image in self.images {
            form = form.part("images", image.into_part()?);
        }
        Ok(form)
    }
}

/// Partial product update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub short_description: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i64>,
    pub new_images: Vec<ImageUpload>,
    pub images_to_delete: Vec<ProductImageId>,
}

impl ProductUpdate {
    /// Check the update before sending it.
    ///
    /// With `current_images` known, the image total after the update must
    /// stay within [`MAX_PRODUCT_IMAGES`]; otherwise only the uploads are
    /// counted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` when a field is out of range.
    pub fn validate(&self, current_images: Option<usize>) -> Result<(), ApiError> {
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ApiError::InvalidInput("Le nom du produit est requis".to_string()));
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(stock) = self.stock_quantity {
            check_stock(stock)?;
        }
        let remaining = current_images
            .map_or(0, |current| current.saturating_sub(self.images_to_delete.len()));
        check_image_count(remaining + self.new_images.len())
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        if let Some(name) = self.name {
            form = form.text("name", name);
        }
        if let Some(short_description) = self.short_description {
            form = form.text("shortDescription", short_description);
        }
        if let Some(price) = self.price {
            form = form.text("price", price.to_string());
        }
        if let Some(stock) = self.stock_quantity {
            form = form.text("stockQuantity", stock.to_string());
        }
        for image in self.new_images {
            form = form.part("newImages", image.into_part()?);
        }
        if !self.images_to_delete.is_empty() {
            let ids = serde_json::to_string(&self.images_to_delete)
                .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
            form = form.text("imagesToDelete", ids);
        }
        Ok(form)
    }
}

/// A new variant. The SKU is assigned by the backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    #[serde(skip)]
    pub product_id: ProductId,
    pub name: String,
    pub size: String,
    pub color: String,
    pub stock_quantity: i64,
}

/// Partial variant update.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_quantity: Option<i64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::str_option"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

fn check_price(price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() {
        return Err(ApiError::InvalidInput("Le prix ne peut pas être négatif".to_string()));
    }
    Ok(())
}

fn check_stock(stock: i64) -> Result<(), ApiError> {
    if stock < 0 {
        return Err(ApiError::InvalidInput("Le stock ne peut pas être négatif".to_string()));
    }
    Ok(())
}

fn check_image_count(count: usize) -> Result<(), ApiError> {
    if count > MAX_PRODUCT_IMAGES {
        return Err(ApiError::InvalidInput(format!(
            "Un produit ne peut pas avoir plus de {MAX_PRODUCT_IMAGES} images"
        )));
    }
    Ok(())
}

impl ApiClient {
    /// List products.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductsQuery) -> Result<ProductList, ApiError> {
        let mut url = self.endpoint("products")?;
        if query.page.is_some() || query.limit.is_some() || query.search.is_some() {
            let mut pairs = url.query_pairs_mut();
            if let Some(page) = query.page {
                pairs.append_pair("page", &page.to_string());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
        }

        let envelope = self.get_envelope::<Vec<Product>>(url).await?;
        Ok(ProductList {
            items: envelope.data.unwrap_or_default(),
            meta: envelope.meta,
        })
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let url = self.endpoint(&format!("products/{}", segment(id.as_str())))?;
        self.get(url).await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if validation fails, or the
    /// backend's error.
    #[instrument(skip(self, product), fields(name = %product.name, images = product.images.len()))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, ApiError> {
        product.validate()?;
        let url = self.endpoint("products")?;
        self.post_form(url, product.into_form()?).await
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` if validation fails, or the
    /// backend's error.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ApiError> {
        update.validate(None)?;
        let url = self.endpoint(&format!("products/{}", segment(id.as_str())))?;
        self.patch_form(url, update.into_form()?).await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("products/{}", segment(id.as_str())))?;
        self.delete(url).await
    }

    /// Add a variant to a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` on negative stock, or the backend's
    /// error.
    #[instrument(skip(self, variant), fields(product_id = %variant.product_id))]
    pub async fn add_variant(&self, variant: &NewVariant) -> Result<ProductVariant, ApiError> {
        check_stock(variant.stock_quantity)?;
        let url = self.endpoint(&format!(
            "product-variants/{}/variants",
            segment(variant.product_id.as_str())
        ))?;
        self.post(url, variant).await
    }

    /// Update a variant.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` on negative stock or price, or the
    /// backend's error.
    #[instrument(skip(self, update), fields(variant_id = %id))]
    pub async fn update_variant(
        &self,
        id: &VariantId,
        update: &VariantUpdate,
    ) -> Result<ProductVariant, ApiError> {
        if let Some(stock) = update.stock_quantity {
            check_stock(stock)?;
        }
        if let Some(price) = update.price {
            check_price(price)?;
        }
        let url = self.endpoint(&format!("product-variants/{}", segment(id.as_str())))?;
        self.patch(url, update).await
    }

    /// Delete a variant.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(variant_id = %id))]
    pub async fn delete_variant(&self, id: &VariantId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("product-variants/{}", segment(id.as_str())))?;
        self.delete(url).await
    }
}
