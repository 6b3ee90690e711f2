//! Process-local address store.
//!
//! Used when no database URL is configured, and as the storage fake in tests.

use crate::domain::model::{AddressRecord, Page, PageRequest, SortDirection, SortField};
use crate::domain::ports::{AddressStore, Clock, SystemClock};
use crate::utils::error::{CepError, Result};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<i64, AddressRecord>,
    next_id: i64,
}

#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn page_where<F>(&self, page: &PageRequest, predicate: F) -> Page<AddressRecord>
    where
        F: Fn(&AddressRecord) -> bool,
    {
        let inner = self.inner.read().await;
        let mut matched: Vec<&AddressRecord> =
            inner.rows.values().filter(|r| predicate(r)).collect();
        matched.sort_by(|a, b| compare(a, b, page.sort, page.direction));

        let total = matched.len() as u64;
        let content = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .cloned()
            .collect();
        Page::new(content, page, total)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(a: &AddressRecord, b: &AddressRecord, field: SortField, dir: SortDirection) -> Ordering {
    let primary = match field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::PostalCode => a.postal_code.cmp(&b.postal_code),
        SortField::Street => a.street.cmp(&b.street),
        SortField::Neighborhood => a.neighborhood.cmp(&b.neighborhood),
        SortField::City => a.city.cmp(&b.city),
        SortField::StateCode => a.state_code.cmp(&b.state_code),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    };
    let primary = match dir {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };
    // 相同排序鍵時以 id 遞增，確保分頁穩定
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl AddressStore for InMemoryStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<AddressRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .find(|r| r.postal_code == code)
            .cloned())
    }

    async fn exists_by_code(&self, code: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.rows.values().any(|r| r.postal_code == code))
    }

    async fn exists_by_code_excluding_id(&self, code: &str, exclude_id: i64) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .any(|r| r.postal_code == code && r.id != Some(exclude_id)))
    }

    async fn search_by_street_fragment(
        &self,
        fragment: &str,
        page: &PageRequest,
    ) -> Result<Page<AddressRecord>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .page_where(page, |r| r.street.to_lowercase().contains(&needle))
            .await)
    }

    async fn search_by_city(&self, city: &str, page: &PageRequest) -> Result<Page<AddressRecord>> {
        let needle = city.to_lowercase();
        Ok(self
            .page_where(page, |r| r.city.to_lowercase() == needle)
            .await)
    }

    async fn list_all(&self, page: &PageRequest) -> Result<Page<AddressRecord>> {
        Ok(self.page_where(page, |_| true).await)
    }

    async fn save(&self, mut record: AddressRecord) -> Result<AddressRecord> {
        let mut inner = self.inner.write().await;
        let now = self.clock.now();

        let duplicate = inner
            .rows
            .values()
            .any(|r| r.postal_code == record.postal_code && r.id != record.id);
        if duplicate {
            return Err(CepError::DuplicateKey {
                postal_code: record.postal_code,
            });
        }

        match record.id {
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                record.id = Some(id);
                record.created_at = Some(now);
                record.updated_at = None;
                inner.rows.insert(id, record.clone());
            }
            Some(id) => {
                let created_at = match inner.rows.get(&id) {
                    Some(existing) => existing.created_at,
                    None => {
                        return Err(CepError::not_found(format!(
                            "No stored address with id {}",
                            id
                        )))
                    }
                };
                record.created_at = created_at;
                record.updated_at = Some(now);
                inner.rows.insert(id, record.clone());
            }
        }

        Ok(record)
    }

    async fn delete(&self, record: &AddressRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        let removed = record.id.and_then(|id| inner.rows.remove(&id));
        if removed.is_none() {
            return Err(CepError::not_found(format!(
                "No stored address for postal code {}",
                record.postal_code
            )));
        }
        Ok(())
    }
}
