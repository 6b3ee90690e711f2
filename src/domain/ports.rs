use crate::domain::model::{AddressRecord, OriginLookupResult, Page, PageRequest};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 地址資料的儲存介面
///
/// `save` 負責時間戳記：新增時設定 `created_at`、`updated_at` 為 `None`；
/// 之後每次儲存都保留原本的 `created_at` 並更新 `updated_at`。
/// 重複的 CEP 一律回傳 `CepError::DuplicateKey`。
#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> Result<Option<AddressRecord>>;

    async fn exists_by_code(&self, code: &str) -> Result<bool>;

    async fn exists_by_code_excluding_id(&self, code: &str, exclude_id: i64) -> Result<bool>;

    async fn search_by_street_fragment(
        &self,
        fragment: &str,
        page: &PageRequest,
    ) -> Result<Page<AddressRecord>>;

    async fn search_by_city(&self, city: &str, page: &PageRequest) -> Result<Page<AddressRecord>>;

    async fn list_all(&self, page: &PageRequest) -> Result<Page<AddressRecord>>;

    async fn save(&self, record: AddressRecord) -> Result<AddressRecord>;

    async fn delete(&self, record: &AddressRecord) -> Result<()>;
}

/// 外部 CEP 查詢服務
///
/// 只發出一次請求；所有傳輸錯誤都在實作內部吸收，轉成 `Unresolved`。
#[async_trait]
pub trait OriginClient: Send + Sync {
    async fn lookup(&self, code: &str) -> OriginLookupResult;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
