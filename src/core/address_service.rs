use crate::domain::model::{
    AddressInput, AddressRecord, OriginAddress, OriginLookupResult, Page, PageRequest,
};
use crate::domain::ports::{AddressStore, OriginClient};
use crate::utils::error::{CepError, Result};
use crate::utils::validation::{
    is_postal_code, is_state_code, strip_postal_code, validate_postal_code, Validate,
};
use std::sync::Arc;

/// 地址查詢服務
///
/// 本地資料庫永遠優先；只有本地查無資料時才會呼叫外部 CEP 服務，
/// 並把結果寫回資料庫。
pub struct AddressService {
    store: Arc<dyn AddressStore>,
    origin: Arc<dyn OriginClient>,
}

impl AddressService {
    pub fn new(store: Arc<dyn AddressStore>, origin: Arc<dyn OriginClient>) -> Self {
        Self { store, origin }
    }

    /// 依 CEP 查詢地址，必要時向外部服務查詢並儲存
    pub async fn resolve(&self, code: &str) -> Result<AddressRecord> {
        validate_postal_code("postal_code", code)?;
        tracing::info!("Resolving address for postal code {}", code);

        if let Some(record) = self.store.find_by_code(code).await? {
            tracing::debug!("Postal code {} served from local store", code);
            return Ok(record);
        }

        tracing::info!(
            "Postal code {} not found locally, querying origin provider",
            code
        );
        let address = match self.origin.lookup(code).await {
            OriginLookupResult::Resolved(address) => address,
            OriginLookupResult::Unresolved(reason) => {
                tracing::debug!("Origin could not resolve {} ({:?})", code, reason);
                return Err(address_not_found(code));
            }
        };

        let Some(record) = map_origin_address(code, address) else {
            tracing::warn!("Origin returned an unusable address for {}", code);
            return Err(address_not_found(code));
        };

        match self.store.save(record).await {
            Ok(saved) => {
                tracing::info!(
                    "Stored address for {} from origin. ID: {:?}",
                    code,
                    saved.id
                );
                Ok(saved)
            }
            Err(CepError::DuplicateKey { postal_code }) => {
                // 另一個請求已經先寫入同一個 CEP，改讀取既有資料
                tracing::info!(
                    "Postal code {} was stored concurrently, reading existing record",
                    postal_code
                );
                match self.store.find_by_code(&postal_code).await? {
                    Some(existing) => Ok(existing),
                    None => Err(CepError::DuplicateKey { postal_code }),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, input: AddressInput) -> Result<AddressRecord> {
        input.validate()?;
        tracing::info!("Creating address with postal code {}", input.postal_code);

        if self.store.exists_by_code(&input.postal_code).await? {
            return Err(CepError::conflict(format!(
                "Postal code already registered: {}",
                input.postal_code
            )));
        }

        let saved = self
            .store
            .save(AddressRecord::from_input(input))
            .await
            .map_err(duplicate_as_conflict)?;

        tracing::info!("Address created. ID: {:?}", saved.id);
        Ok(saved)
    }

    /// 整筆覆寫既有地址；若 CEP 變更，新 CEP 不可與其他紀錄重複
    pub async fn update(&self, code: &str, input: AddressInput) -> Result<AddressRecord> {
        validate_postal_code("postal_code", code)?;
        input.validate()?;
        tracing::info!("Updating address with postal code {}", code);

        let mut record = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| address_not_found(code))?;

        if input.postal_code != code {
            let id = record.id.ok_or_else(|| CepError::Storage {
                message: format!("Stored address {} has no id", code),
            })?;
            if self
                .store
                .exists_by_code_excluding_id(&input.postal_code, id)
                .await?
            {
                return Err(CepError::conflict(format!(
                    "New postal code already registered: {}",
                    input.postal_code
                )));
            }
        }

        record.replace_fields(input);
        let saved = self
            .store
            .save(record)
            .await
            .map_err(duplicate_as_conflict)?;

        tracing::info!("Address updated. ID: {:?}", saved.id);
        Ok(saved)
    }

    pub async fn delete(&self, code: &str) -> Result<()> {
        validate_postal_code("postal_code", code)?;
        tracing::info!("Deleting address with postal code {}", code);

        let record = self
            .store
            .find_by_code(code)
            .await?
            .ok_or_else(|| address_not_found(code))?;

        self.store.delete(&record).await?;
        tracing::info!("Address deleted. Postal code: {}", code);
        Ok(())
    }

    pub async fn list_all(&self, page: &PageRequest) -> Result<Page<AddressRecord>> {
        page.validate()?;
        tracing::info!("Listing addresses (page {}, size {})", page.page, page.size);
        self.store.list_all(page).await
    }

    pub async fn search_by_street(
        &self,
        fragment: &str,
        page: &PageRequest,
    ) -> Result<Page<AddressRecord>> {
        if fragment.trim().is_empty() {
            return Err(CepError::validation("street", "search term is required"));
        }
        page.validate()?;
        tracing::info!("Searching addresses with street containing: {}", fragment);
        self.store.search_by_street_fragment(fragment, page).await
    }

    pub async fn search_by_city(
        &self,
        city: &str,
        page: &PageRequest,
    ) -> Result<Page<AddressRecord>> {
        if city.trim().is_empty() {
            return Err(CepError::validation("city", "search term is required"));
        }
        page.validate()?;
        tracing::info!("Searching addresses in city: {}", city);
        self.store.search_by_city(city, page).await
    }
}

fn address_not_found(code: &str) -> CepError {
    CepError::not_found(format!("Address not found for postal code {}", code))
}

fn duplicate_as_conflict(err: CepError) -> CepError {
    match err {
        CepError::DuplicateKey { postal_code } => {
            CepError::conflict(format!("Postal code already registered: {}", postal_code))
        }
        other => other,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 將外部回應轉成尚未儲存的紀錄
///
/// 回應的 CEP 去掉格式符號後必須等於查詢的 CEP，UF 必須是兩個大寫字母，
/// 否則視為無法解析。
fn map_origin_address(code: &str, address: OriginAddress) -> Option<AddressRecord> {
    let postal_code = address
        .cep
        .as_deref()
        .map(strip_postal_code)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| code.to_string());
    if postal_code != code || !is_postal_code(&postal_code) {
        return None;
    }

    let state_code = address.uf.unwrap_or_default();
    if !is_state_code(&state_code) {
        return None;
    }

    Some(AddressRecord {
        id: None,
        postal_code,
        street: address.logradouro.unwrap_or_default(),
        complement: non_empty(address.complemento),
        neighborhood: address.bairro.unwrap_or_default(),
        city: address.localidade.unwrap_or_default(),
        state_code,
        region_code: non_empty(address.ibge),
        tax_region_code: non_empty(address.gia),
        area_code: non_empty(address.ddd),
        finance_region_code: non_empty(address.siafi),
        created_at: None,
        updated_at: None,
    })
}
