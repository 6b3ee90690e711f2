use cep_service::domain::model::SortField;
use cep_service::{
    AddressInput, AddressService, CepError, PageRequest, SqliteStore, ViaCepClient, ViaCepConfig,
};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn service_at(db_url: &str, server: &MockServer) -> AddressService {
    let store = SqliteStore::connect(db_url, 2).await.unwrap();
    let origin = ViaCepClient::new(ViaCepConfig {
        base_url: server.url("/ws"),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    AddressService::new(Arc::new(store), Arc::new(origin))
}

fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("addresses.db").display())
}

fn input(code: &str, street: &str, city: &str) -> AddressInput {
    AddressInput {
        postal_code: code.to_string(),
        street: street.to_string(),
        complement: None,
        neighborhood: "Centro".to_string(),
        city: city.to_string(),
        state_code: "RJ".to_string(),
        region_code: None,
        tax_region_code: None,
        area_code: Some("21".to_string()),
        finance_region_code: None,
    }
}

#[tokio::test]
async fn test_resolved_address_survives_restart() {
    let server = MockServer::start_async().await;
    let viacep = server
        .mock_async(|when, then| {
            when.method(GET).path("/ws/20040020/json");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "cep": "20040-020",
                    "logradouro": "Praça Pio X",
                    "complemento": "",
                    "bairro": "Centro",
                    "localidade": "Rio de Janeiro",
                    "uf": "RJ",
                    "ibge": "3304557",
                    "gia": "",
                    "ddd": "21",
                    "siafi": "6001"
                }));
        })
        .await;
    let dir = TempDir::new().unwrap();
    let url = sqlite_url(&dir);

    let first = {
        let service = service_at(&url, &server).await;
        service.resolve("20040020").await.unwrap()
    };
    assert_eq!(first.city, "Rio de Janeiro");
    assert_eq!(first.complement, None);
    assert_eq!(first.tax_region_code, None);
    assert_eq!(first.region_code.as_deref(), Some("3304557"));

    // 重新連線後由資料庫回應，不再呼叫 ViaCEP
    let service = service_at(&url, &server).await;
    let again = service.resolve("20040020").await.unwrap();

    assert_eq!(again.id, first.id);
    assert_eq!(again.street, "Praça Pio X");
    viacep.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_crud_and_search_over_sqlite() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().unwrap();
    let service = service_at(&sqlite_url(&dir), &server).await;

    service
        .create(input("20040020", "Praça Pio X", "Rio de Janeiro"))
        .await
        .unwrap();
    service
        .create(input("20031050", "Avenida Presidente Wilson", "Rio de Janeiro"))
        .await
        .unwrap();
    service
        .create(input("24020005", "Rua da Conceição", "Niterói"))
        .await
        .unwrap();

    let duplicate = service
        .create(input("24020005", "Rua da Conceição", "Niterói"))
        .await;
    assert!(matches!(duplicate, Err(CepError::Conflict { .. })));

    let by_city = service
        .search_by_city("RIO DE JANEIRO", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_city.total_elements, 2);
    assert_eq!(by_city.content[0].street, "Avenida Presidente Wilson");

    let by_street = service
        .search_by_street("conceição", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_street.total_elements, 1);
    assert_eq!(by_street.content[0].city, "Niterói");

    let page = service
        .list_all(&PageRequest::new(1, 2, SortField::PostalCode))
        .await
        .unwrap();
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.content[0].postal_code, "24020005");

    let updated = service
        .update("24020005", input("24020010", "Rua da Conceição", "Niterói"))
        .await
        .unwrap();
    assert_eq!(updated.postal_code, "24020010");
    assert!(updated.updated_at.is_some());

    service.delete("24020010").await.unwrap();
    let missing = service.delete("24020010").await;
    assert!(matches!(missing, Err(CepError::NotFound { .. })));
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let server = MockServer::start_async().await;
    let service = service_at("sqlite::memory:", &server).await;

    service
        .create(input("20040020", "Praça Pio X", "Rio de Janeiro"))
        .await
        .unwrap();

    let result = service
        .search_by_street("%", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(result.total_elements, 0);
    assert!(result.content.is_empty());
}

#[tokio::test]
async fn test_search_keeps_surrounding_spaces() {
    let server = MockServer::start_async().await;
    let service = service_at("sqlite::memory:", &server).await;

    service
        .create(input("13010001", "Ruas Novas", "Campinas"))
        .await
        .unwrap();

    let by_street = service
        .search_by_street("Rua ", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_street.total_elements, 0);

    let by_city = service
        .search_by_city(" campinas ", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_city.total_elements, 0);

    let by_city = service
        .search_by_city("CAMPINAS", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_city.total_elements, 1);
}
