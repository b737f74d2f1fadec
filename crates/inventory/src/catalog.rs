//! Read-only catalog port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, Sku};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::CatalogError;

/// A seller's offering as delivered by price-list ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOffering {
    pub sku: Sku,
    pub name: String,
    pub unit_price: Money,
    pub available_quantity: u32,
}

impl ProductOffering {
    pub fn new(
        sku: impl Into<Sku>,
        name: impl Into<String>,
        unit_price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            unit_price,
            available_quantity,
        }
    }
}

/// Name and current price of a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub unit_price: Money,
}

/// Prices and display names, owned outside the core.
///
/// Never authoritative for stock; that is the ledger's job.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn lookup_price(&self, sku: &Sku) -> Result<Money, CatalogError>;

    async fn lookup_display_name(&self, sku: &Sku) -> Result<String, CatalogError>;

    /// Name and price in one call.
    async fn lookup(&self, sku: &Sku) -> Result<CatalogEntry, CatalogError> {
        Ok(CatalogEntry {
            name: self.lookup_display_name(sku).await?,
            unit_price: self.lookup_price(sku).await?,
        })
    }
}

/// Catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Arc<RwLock<HashMap<Sku, CatalogEntry>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from offerings. Offerings with a non-positive price
    /// are rejected.
    pub fn from_offerings<'a>(
        offerings: impl IntoIterator<Item = &'a ProductOffering>,
    ) -> Result<Self, CatalogError> {
        let mut entries = HashMap::new();
        for offering in offerings {
            check_price(&offering.sku, offering.unit_price)?;
            entries.insert(
                offering.sku.clone(),
                CatalogEntry {
                    name: offering.name.clone(),
                    unit_price: offering.unit_price,
                },
            );
        }
        Ok(Self {
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    /// Inserts or replaces an entry.
    pub async fn upsert(
        &self,
        sku: impl Into<Sku>,
        name: impl Into<String>,
        unit_price: Money,
    ) -> Result<(), CatalogError> {
        let sku = sku.into();
        check_price(&sku, unit_price)?;
        self.entries.write().await.insert(
            sku,
            CatalogEntry {
                name: name.into(),
                unit_price,
            },
        );
        Ok(())
    }

    /// Changes the price of an existing entry.
    pub async fn set_price(&self, sku: &Sku, unit_price: Money) -> Result<(), CatalogError> {
        check_price(sku, unit_price)?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(sku)
            .ok_or_else(|| CatalogError::UnknownSku(sku.clone()))?;
        entry.unit_price = unit_price;
        Ok(())
    }

    /// Removes an entry, returning it if present.
    pub async fn remove(&self, sku: &Sku) -> Option<CatalogEntry> {
        self.entries.write().await.remove(sku)
    }

    /// All entries, sorted by SKU.
    pub async fn entries(&self) -> Vec<(Sku, CatalogEntry)> {
        let mut all: Vec<_> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(sku, entry)| (sku.clone(), entry.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

fn check_price(sku: &Sku, price: Money) -> Result<(), CatalogError> {
    if price.is_positive() {
        Ok(())
    } else {
        Err(CatalogError::InvalidPrice {
            sku: sku.clone(),
            price,
        })
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn lookup_price(&self, sku: &Sku) -> Result<Money, CatalogError> {
        self.entries
            .read()
            .await
            .get(sku)
            .map(|e| e.unit_price)
            .ok_or_else(|| CatalogError::UnknownSku(sku.clone()))
    }

    async fn lookup_display_name(&self, sku: &Sku) -> Result<String, CatalogError> {
        self.entries
            .read()
            .await
            .get(sku)
            .map(|e| e.name.clone())
            .ok_or_else(|| CatalogError::UnknownSku(sku.clone()))
    }

    async fn lookup(&self, sku: &Sku) -> Result<CatalogEntry, CatalogError> {
        self.entries
            .read()
            .await
            .get(sku)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownSku(sku.clone()))
    }
}
