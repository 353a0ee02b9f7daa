//! Product directory trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Physical dimensions of a product, used to build the shipping parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    /// Unit for length/width/height, e.g. `"in"`.
    pub distance_unit: String,
    /// Unit for weight, e.g. `"lb"`.
    pub mass_unit: String,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            length: 0.0,
            width: 0.0,
            height: 0.0,
            weight: 0.0,
            distance_unit: "in".to_string(),
            mass_unit: "lb".to_string(),
        }
    }
}

/// A listed product with everything the event enrichment needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    /// The renter: the user who owns the product and rents it out.
    pub owner_id: UserId,
    pub price: Money,
    pub image_url: String,
    pub available: bool,
    pub dimensions: Dimensions,
}

/// Trait for product lookups and availability updates.
#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Fetches full product attributes by ID.
    async fn get_product(&self, product_id: ProductId) -> Result<Product, DirectoryError>;

    /// Marks a product unavailable for further rentals.
    async fn mark_unavailable(&self, product_id: ProductId) -> Result<(), DirectoryError>;
}

#[derive(Debug, Default)]
struct InMemoryProductState {
    products: HashMap<ProductId, Product>,
    fail_on_get: bool,
}

/// In-memory product directory for standalone mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductDirectory {
    state: Arc<RwLock<InMemoryProductState>>,
}

impl InMemoryProductDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists a product.
    pub fn insert(&self, product: Product) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product.product_id, product);
    }

    /// Configures the directory to fail lookups.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// Returns a product's availability flag, if listed.
    pub fn is_available(&self, product_id: ProductId) -> Option<bool> {
        self.state
            .read()
            .unwrap()
            .products
            .get(&product_id)
            .map(|p| p.available)
    }
}

#[async_trait]
impl ProductDirectory for InMemoryProductDirectory {
    async fn get_product(&self, product_id: ProductId) -> Result<Product, DirectoryError> {
        let state = self.state.read().unwrap();
        if state.fail_on_get {
            return Err(DirectoryError::Unavailable(
                "product directory offline".to_string(),
            ));
        }
        state
            .products
            .get(&product_id)
            .cloned()
            .ok_or(DirectoryError::ProductNotFound(product_id))
    }

    async fn mark_unavailable(&self, product_id: ProductId) -> Result<(), DirectoryError> {
        let mut state = self.state.write().unwrap();
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(DirectoryError::ProductNotFound(product_id))?;
        product.available = false;
        Ok(())
    }
}
