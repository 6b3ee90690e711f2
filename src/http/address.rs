//! Address REST routes.
//!
//! Handlers only translate HTTP into [`AddressService`] calls; every business
//! rule lives in the service.

use crate::core::AddressService;
use crate::domain::model::{
    AddressInput, AddressRecord, Page, PageRequest, SortField, DEFAULT_PAGE_SIZE,
};
use crate::utils::error::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AddressService>,
}

impl AppState {
    pub fn new(service: Arc<AddressService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreetParams {
    #[serde(default)]
    pub street: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CityParams {
    #[serde(default)]
    pub city: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

fn page_request(page: Option<u32>, size: Option<u32>, sort: Option<&str>) -> Result<PageRequest> {
    let (sort, direction) = match sort {
        Some(value) if !value.trim().is_empty() => PageRequest::parse_sort(value)?,
        _ => (SortField::default(), Default::default()),
    };
    Ok(PageRequest {
        page: page.unwrap_or(0),
        size: size.unwrap_or(DEFAULT_PAGE_SIZE),
        sort,
        direction,
    })
}

/// GET /api/addresses/cep/:code
pub async fn resolve_address(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<AddressRecord>> {
    let record = state.service.resolve(&code).await?;
    Ok(Json(record))
}

/// GET /api/addresses
pub async fn list_addresses(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<AddressRecord>>> {
    let request = page_request(params.page, params.size, params.sort.as_deref())?;
    let page = state.service.list_all(&request).await?;
    Ok(Json(page))
}

/// GET /api/addresses/street?street=
pub async fn search_by_street(
    State(state): State<AppState>,
    Query(params): Query<StreetParams>,
) -> Result<Json<Page<AddressRecord>>> {
    let request = page_request(params.page, params.size, params.sort.as_deref())?;
    let page = state
        .service
        .search_by_street(&params.street, &request)
        .await?;
    Ok(Json(page))
}

/// GET /api/addresses/city?city=
pub async fn search_by_city(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> Result<Json<Page<AddressRecord>>> {
    let request = page_request(params.page, params.size, params.sort.as_deref())?;
    let page = state.service.search_by_city(&params.city, &request).await?;
    Ok(Json(page))
}

/// POST /api/addresses
pub async fn create_address(
    State(state): State<AppState>,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<AddressRecord>)> {
    let record = state.service.create(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/addresses/:code
pub async fn update_address(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(input): Json<AddressInput>,
) -> Result<Json<AddressRecord>> {
    let record = state.service.update(&code, input).await?;
    Ok(Json(record))
}

/// DELETE /api/addresses/:code
pub async fn delete_address(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    state.service.delete(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}
