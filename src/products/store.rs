//! In-memory product storage.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::products::types::{NewProduct, Product};
use crate::sources::Clock;

/// Products in insertion order.
#[derive(Debug)]
pub struct ProductStore {
    products: RwLock<Vec<Product>>,
    clock: Arc<dyn Clock>,
}

impl ProductStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            products: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Store a new product with a fresh `p_` id and identical timestamps.
    pub fn create(&self, new: NewProduct) -> Product {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        let now = self.timestamp();
        let product = Product {
            id: format!("p_{}", &uuid[..8]),
            name: new.name,
            kind: new.kind,
            brand: new.brand,
            price: new.price,
            extra: new.extra,
            created_at: now.clone(),
            updated_at: now,
        };

        self.products
            .write()
            .expect("product store lock poisoned")
            .push(product.clone());
        product
    }

    pub fn get(&self, id: &str) -> Option<Product> {
        self.products
            .read()
            .expect("product store lock poisoned")
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn list(&self) -> Vec<Product> {
        self.products.read().expect("product store lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.products.read().expect("product store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn timestamp(&self) -> String {
        i64::try_from(self.clock.now_ms())
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}
