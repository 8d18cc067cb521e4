//! Read path over the local mirror
//!
//! Listings and single-breed lookups go through the cache first and fall
//! back to the record store on a miss. Nothing here invalidates the cache;
//! entries age out after their TTL, so a reader can see data up to one TTL
//! older than the store.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::MemoryCache;
use crate::config::CatalogConfig;
use crate::database::RecordStore;
use crate::error::DbError;
use crate::models::{Breed, BreedPage};

/// Values the catalog keeps in its cache
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    /// One listing page
    Page(Vec<Breed>),
    /// One breed looked up by key
    Breed(Breed),
}

/// Cached, paginated view of the record store
pub struct BreedCatalog<S> {
    store: Arc<S>,
    cache: Arc<MemoryCache<CatalogEntry>>,
    page_size: u32,
    listing_ttl: Duration,
    record_ttl: Duration,
}

impl<S: RecordStore> BreedCatalog<S> {
    pub fn new(store: Arc<S>, cache: Arc<MemoryCache<CatalogEntry>>, config: &CatalogConfig) -> Self {
        Self {
            store,
            cache,
            page_size: config.page_size.max(1),
            listing_ttl: Duration::from_secs(config.listing_cache_ttl_secs),
            record_ttl: Duration::from_secs(config.record_cache_ttl_secs),
        }
    }

    /// Get one listing page; pages below 1 are served as page 1
    ///
    /// Empty pages are never cached.
    pub async fn get_page(&self, page: u32) -> Result<BreedPage, DbError> {
        let page = page.max(1);
        let key = page_key(page);

        let (breeds, cached) = match self.cache.get(&key).await {
            Some(CatalogEntry::Page(breeds)) => {
                debug!(page, "Listing served from cache");
                (breeds, true)
            }
            _ => {
                let offset = u64::from(page - 1) * u64::from(self.page_size);
                let breeds = self.store.list_page(offset, self.page_size).await?;
                // Pages past the end are not cached
                if !breeds.is_empty() {
                    self.cache
                        .set(key, CatalogEntry::Page(breeds.clone()), Some(self.listing_ttl))
                        .await;
                }
                (breeds, false)
            }
        };

        let total_breeds = self.store.count().await?;

        Ok(BreedPage {
            breeds,
            page,
            cached,
            total_breeds,
            total_pages: total_breeds.div_ceil(u64::from(self.page_size)),
        })
    }

    /// Look up one breed by name
    ///
    /// Only hits are cached, so a breed added by a later pass shows up on
    /// the next lookup.
    pub async fn find(&self, breed: &str) -> Result<Option<Breed>, DbError> {
        let key = breed_key(breed);

        if let Some(CatalogEntry::Breed(found)) = self.cache.get(&key).await {
            debug!(breed = %breed, "Breed served from cache");
            return Ok(Some(found));
        }

        let found = self.store.find_by_key(breed).await?;
        if let Some(found) = &found {
            self.cache
                .set(key, CatalogEntry::Breed(found.clone()), Some(self.record_ttl))
                .await;
        }

        Ok(found)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }
}

fn page_key(page: u32) -> String {
    format!("breeds_page_{}", page)
}

fn breed_key(breed: &str) -> String {
    format!("breed_{}", breed)
}
