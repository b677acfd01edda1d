//! Product catalog management.
//!
//! Reads go through the shared [`QueryCache`] (`products` and `dashboard`
//! families). Every successful write invalidates both families, since stock
//! changes show up in the statistics too.

use std::future::Future;
use std::sync::Arc;

use comptoir_core::{DashboardStats, Product, ProductId, ProductStats, ProductVariant, VariantId};
use tracing::{debug, instrument};

use crate::api::{
    ApiClient, NewProduct, NewVariant, ProductList, ProductUpdate, ProductsQuery, VariantUpdate,
};
use crate::cache::{CacheKey, CacheValue, QueryCache, QueryFamily};
use crate::error::ApiError;
use crate::notify::Notifier;

/// Product calls the catalog needs.
pub trait CatalogBackend: Send + Sync + 'static {
    fn list_products(
        &self,
        query: &ProductsQuery,
    ) -> impl Future<Output = Result<ProductList, ApiError>> + Send;

    fn get_product(&self, id: &ProductId) -> impl Future<Output = Result<Product, ApiError>> + Send;

    fn create_product(
        &self,
        product: NewProduct,
    ) -> impl Future<Output = Result<Product, ApiError>> + Send;

    fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> impl Future<Output = Result<Product, ApiError>> + Send;

    fn delete_product(&self, id: &ProductId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn add_variant(
        &self,
        variant: &NewVariant,
    ) -> impl Future<Output = Result<ProductVariant, ApiError>> + Send;

    fn update_variant(
        &self,
        id: &VariantId,
        update: &VariantUpdate,
    ) -> impl Future<Output = Result<ProductVariant, ApiError>> + Send;

    fn delete_variant(&self, id: &VariantId) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn overview_stats(&self) -> impl Future<Output = Result<DashboardStats, ApiError>> + Send;

    fn product_stats(&self) -> impl Future<Output = Result<ProductStats, ApiError>> + Send;
}

impl CatalogBackend for ApiClient {
    async fn list_products(&self, query: &ProductsQuery) -> Result<ProductList, ApiError> {
        Self::list_products(self, query).await
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        Self::get_product(self, id).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, ApiError> {
        Self::create_product(self, product).await
    }

    async fn update_product(
        &self,
        id: &ProductId,
        update: ProductUpdate,
    ) -> Result<Product, ApiError> {
        Self::update_product(self, id, update).await
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), ApiError> {
        Self::delete_product(self, id).await
    }

    async fn add_variant(&self, variant: &NewVariant) -> Result<ProductVariant, ApiError> {
        Self::add_variant(self, variant).await
    }

    async fn update_variant(
        &self,
        id: &VariantId,
        update: &VariantUpdate,
    ) -> Result<ProductVariant, ApiError> {
        Self::update_variant(self, id, update).await
    }

    async fn delete_variant(&self, id: &VariantId) -> Result<(), ApiError> {
        Self::delete_variant(self, id).await
    }

    async fn overview_stats(&self) -> Result<DashboardStats, ApiError> {
        Self::overview_stats(self).await
    }

    async fn product_stats(&self) -> Result<ProductStats, ApiError> {
        Self::product_stats(self).await
    }
}

/// Outcome messages of one kind of write.
struct Messages {
    operation: &'static str,
    success: &'static str,
    failure: &'static str,
}

const CREATE_PRODUCT: Messages = Messages {
    operation: "create_product",
    success: "Produit créé avec succès",
    failure: "Erreur lors de la création du produit",
};
const UPDATE_PRODUCT: Messages = Messages {
    operation: "update_product",
    success: "Produit modifié avec succès",
    failure: "Erreur lors de la modification",
};
const DELETE_PRODUCT: Messages = Messages {
    operation: "delete_product",
    success: "Produit supprimé avec succès",
    failure: "Erreur lors de la suppression",
};
const ADD_VARIANT: Messages = Messages {
    operation: "add_variant",
    success: "Variante ajoutée avec succès",
    failure: "Erreur lors de l'ajout de la variante",
};
const UPDATE_VARIANT: Messages = Messages {
    operation: "update_variant",
    success: "Variante modifiée avec succès",
    failure: "Erreur lors de la modification",
};
const DELETE_VARIANT: Messages = Messages {
    operation: "delete_variant",
    success: "Variante supprimée avec succès",
    failure: "Erreur lors de la suppression",
};

/// Message shown for a failed write: the backend's own message when it
/// gave one, the generic text otherwise.
fn failure_message(error: &ApiError, fallback: &str) -> String {
    match error {
        ApiError::Rejected { message, .. }
        | ApiError::NotFound(message)
        | ApiError::Forbidden(message)
        | ApiError::InvalidInput(message)
            if !message.is_empty() =>
        {
            message.clone()
        }
        _ => fallback.to_string(),
    }
}

async fn reported<T>(
    call: impl Future<Output = Result<T, ApiError>>,
    operation: &str,
) -> Result<T, ApiError> {
    call.await.inspect_err(|e| e.report(operation))
}

/// Cached catalog reads and notified writes.
pub struct ProductCatalog<B> {
    inner: Arc<CatalogInner<B>>,
}

impl<B> Clone for ProductCatalog<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CatalogInner<B> {
    backend: B,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
}

impl<B: CatalogBackend> ProductCatalog<B> {
    #[must_use]
    pub fn new(backend: B, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                backend,
                cache,
                notifier,
            }),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Product list for `query`, cached per query.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ProductsQuery) -> Result<Arc<ProductList>, ApiError> {
        let key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(list)) = self.inner.cache.get_fresh(&key).await {
            return Ok(list);
        }

        let ticket = self.inner.cache.begin_fetch(QueryFamily::Products);
        let list = Arc::new(reported(self.inner.backend.list_products(query), "list_products").await?);
        self.inner
            .cache
            .complete_fetch(ticket, key, CacheValue::Products(Arc::clone(&list)))
            .await;
        Ok(list)
    }

    /// A single product, cached.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId) -> Result<Arc<Product>, ApiError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get_fresh(&key).await {
            return Ok(product);
        }

        let ticket = self.inner.cache.begin_fetch(QueryFamily::Products);
        let product = Arc::new(reported(self.inner.backend.get_product(id), "get_product").await?);
        self.inner
            .cache
            .complete_fetch(ticket, key, CacheValue::Product(Arc::clone(&product)))
            .await;
        Ok(product)
    }

    /// Store overview statistics, cached.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn overview(&self) -> Result<Arc<DashboardStats>, ApiError> {
        if let Some(CacheValue::Overview(stats)) =
            self.inner.cache.get_fresh(&CacheKey::Overview).await
        {
            return Ok(stats);
        }

        let ticket = self.inner.cache.begin_fetch(QueryFamily::Dashboard);
        let stats = Arc::new(reported(self.inner.backend.overview_stats(), "overview_stats").await?);
        self.inner
            .cache
            .complete_fetch(ticket, CacheKey::Overview, CacheValue::Overview(Arc::clone(&stats)))
            .await;
        Ok(stats)
    }

    /// Catalog statistics, cached.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn product_stats(&self) -> Result<Arc<ProductStats>, ApiError> {
        if let Some(CacheValue::ProductStats(stats)) =
            self.inner.cache.get_fresh(&CacheKey::ProductStats).await
        {
            return Ok(stats);
        }

        let ticket = self.inner.cache.begin_fetch(QueryFamily::Dashboard);
        let stats = Arc::new(reported(self.inner.backend.product_stats(), "product_stats").await?);
        self.inner
            .cache
            .complete_fetch(
                ticket,
                CacheKey::ProductStats,
                CacheValue::ProductStats(Arc::clone(&stats)),
            )
            .await;
        Ok(stats)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` without calling the backend if the
    /// product is invalid, otherwise the backend error.
    pub async fn create(&self, product: NewProduct) -> Result<Product, ApiError> {
        if let Err(e) = product.validate() {
            return Err(self.refuse(e, &CREATE_PRODUCT));
        }
        self.write(self.inner.backend.create_product(product), &CREATE_PRODUCT)
            .await
    }

    /// Update a product.
    ///
    /// When the product is cached, the image total after the update is
    /// checked against the limit before sending.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` without calling the backend if the
    /// update is invalid, otherwise the backend error.
    pub async fn update(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, ApiError> {
        let current_images = match self.inner.cache.get(&CacheKey::Product(id.clone())).await {
            Some(CacheValue::Product(product)) => Some(product.images.len()),
            _ => None,
        };
        if let Err(e) = update.validate(current_images) {
            return Err(self.refuse(e, &UPDATE_PRODUCT));
        }
        self.write(self.inner.backend.update_product(id, update), &UPDATE_PRODUCT)
            .await
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn delete(&self, id: &ProductId) -> Result<(), ApiError> {
        self.write(self.inner.backend.delete_product(id), &DELETE_PRODUCT)
            .await?;
        self.inner.cache.remove(&CacheKey::Product(id.clone())).await;
        Ok(())
    }

    /// Add a variant. Its SKU is assigned by the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn add_variant(&self, variant: &NewVariant) -> Result<ProductVariant, ApiError> {
        self.write(self.inner.backend.add_variant(variant), &ADD_VARIANT)
            .await
    }

    /// Update a variant.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn update_variant(
        &self,
        id: &VariantId,
        update: &VariantUpdate,
    ) -> Result<ProductVariant, ApiError> {
        self.write(self.inner.backend.update_variant(id, update), &UPDATE_VARIANT)
            .await
    }

    /// Delete a variant.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn delete_variant(&self, id: &VariantId) -> Result<(), ApiError> {
        self.write(self.inner.backend.delete_variant(id), &DELETE_VARIANT)
            .await
    }

    async fn write<T>(
        &self,
        call: impl Future<Output = Result<T, ApiError>>,
        messages: &Messages,
    ) -> Result<T, ApiError> {
        match call.await {
            Ok(value) => {
                debug!(operation = messages.operation, "Catalog write succeeded");
                self.inner.cache.invalidate(QueryFamily::Products);
                self.inner.cache.invalidate(QueryFamily::Dashboard);
                self.inner.notifier.success(messages.success);
                Ok(value)
            }
            Err(e) => Err(self.refuse(e, messages)),
        }
    }

    fn refuse(&self, error: ApiError, messages: &Messages) -> ApiError {
        self.inner
            .notifier
            .failure(&failure_message(&error, messages.failure), &error);
        error.report_mutation(messages.operation);
        error
    }
}

impl<B> std::fmt::Debug for ProductCatalog<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCatalog")
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}
