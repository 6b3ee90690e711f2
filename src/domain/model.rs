use crate::utils::error::{CepError, Result};
use crate::utils::validation::{
    validate_optional_digits, validate_optional_text, validate_postal_code,
    validate_required_text, validate_state_code, Validate,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 已儲存的地址資料，以 CEP 為自然鍵
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: Option<i64>,
    pub postal_code: String,
    pub street: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state_code: String,
    pub region_code: Option<String>,
    pub tax_region_code: Option<String>,
    pub area_code: Option<String>,
    pub finance_region_code: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AddressRecord {
    /// 尚未儲存的新紀錄 (id 與時間戳記由 store 指派)
    pub fn from_input(input: AddressInput) -> Self {
        Self {
            id: None,
            postal_code: input.postal_code,
            street: input.street,
            complement: input.complement,
            neighborhood: input.neighborhood,
            city: input.city,
            state_code: input.state_code,
            region_code: input.region_code,
            tax_region_code: input.tax_region_code,
            area_code: input.area_code,
            finance_region_code: input.finance_region_code,
            created_at: None,
            updated_at: None,
        }
    }

    /// 整筆覆寫 (不是 patch)，保留 id 與 created_at
    pub fn replace_fields(&mut self, input: AddressInput) {
        self.postal_code = input.postal_code;
        self.street = input.street;
        self.complement = input.complement;
        self.neighborhood = input.neighborhood;
        self.city = input.city;
        self.state_code = input.state_code;
        self.region_code = input.region_code;
        self.tax_region_code = input.tax_region_code;
        self.area_code = input.area_code;
        self.finance_region_code = input.finance_region_code;
    }
}

/// 新增 / 更新時的輸入資料
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInput {
    pub postal_code: String,
    pub street: String,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state_code: String,
    #[serde(default)]
    pub region_code: Option<String>,
    #[serde(default)]
    pub tax_region_code: Option<String>,
    #[serde(default)]
    pub area_code: Option<String>,
    #[serde(default)]
    pub finance_region_code: Option<String>,
}

impl Validate for AddressInput {
    fn validate(&self) -> Result<()> {
        validate_postal_code("postal_code", &self.postal_code)?;
        validate_required_text("street", &self.street, 255)?;
        validate_optional_text("complement", self.complement.as_deref(), 100)?;
        validate_required_text("neighborhood", &self.neighborhood, 100)?;
        validate_required_text("city", &self.city, 100)?;
        validate_state_code("state_code", &self.state_code)?;
        validate_optional_digits("region_code", self.region_code.as_deref(), 20)?;
        validate_optional_digits("tax_region_code", self.tax_region_code.as_deref(), 20)?;
        validate_optional_digits("area_code", self.area_code.as_deref(), 3)?;
        validate_optional_digits(
            "finance_region_code",
            self.finance_region_code.as_deref(),
            10,
        )?;
        Ok(())
    }
}

/// ViaCEP 回傳的地址欄位
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OriginAddress {
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub complemento: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub localidade: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
    #[serde(default)]
    pub ibge: Option<String>,
    #[serde(default)]
    pub gia: Option<String>,
    #[serde(default)]
    pub ddd: Option<String>,
    #[serde(default)]
    pub siafi: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// 提供者明確回覆查無此 CEP
    NotFound,
    /// 逾時、連線失敗、非 2xx 或回應格式錯誤
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginLookupResult {
    Resolved(OriginAddress),
    Unresolved(UnresolvedReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    PostalCode,
    #[default]
    Street,
    Neighborhood,
    City,
    StateCode,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::PostalCode => "postal_code",
            SortField::Street => "street",
            SortField::Neighborhood => "neighborhood",
            SortField::City => "city",
            SortField::StateCode => "state_code",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for SortField {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "id" => Ok(SortField::Id),
            "postal_code" => Ok(SortField::PostalCode),
            "street" => Ok(SortField::Street),
            "neighborhood" => Ok(SortField::Neighborhood),
            "city" => Ok(SortField::City),
            "state_code" => Ok(SortField::StateCode),
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            other => Err(CepError::validation(
                "sort",
                format!("unsupported sort field '{}'", other),
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn new(page: u32, size: u32, sort: SortField) -> Self {
        Self {
            page,
            size,
            sort,
            direction: SortDirection::Asc,
        }
    }

    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Desc;
        self
    }

    /// 解析 "field" 或 "field,desc" 格式的排序參數
    pub fn parse_sort(value: &str) -> Result<(SortField, SortDirection)> {
        let mut parts = value.splitn(2, ',');
        let field = parts.next().unwrap_or_default().trim().parse::<SortField>()?;
        let direction = match parts.next().map(|d| d.trim().to_ascii_lowercase()) {
            None => SortDirection::Asc,
            Some(d) if d == "asc" => SortDirection::Asc,
            Some(d) if d == "desc" => SortDirection::Desc,
            Some(d) => {
                return Err(CepError::validation(
                    "sort",
                    format!("unsupported sort direction '{}'", d),
                ))
            }
        };
        Ok((field, direction))
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE, SortField::default())
    }
}

impl Validate for PageRequest {
    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(CepError::validation("size", "must be greater than zero"));
        }
        if self.size > MAX_PAGE_SIZE {
            return Err(CepError::validation(
                "size",
                format!("must be at most {}", MAX_PAGE_SIZE),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }
}
