use crate::domain::model::{OriginAddress, OriginLookupResult, UnresolvedReason};
use crate::domain::ports::OriginClient;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

pub const DEFAULT_VIACEP_URL: &str = "https://viacep.com.br/ws";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ViaCepConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ViaCepConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VIACEP_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// ViaCEP 回應，`erro` 可能是布林值或字串 "true"
#[derive(Debug, Deserialize)]
struct ViaCepPayload {
    #[serde(flatten)]
    address: OriginAddress,
    #[serde(default, deserialize_with = "deserialize_erro")]
    erro: bool,
}

fn deserialize_erro<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s.eq_ignore_ascii_case("true"),
    })
}

pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

impl ViaCepClient {
    pub fn new(config: ViaCepConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn lookup_url(&self, code: &str) -> String {
        format!("{}/{}/json", self.base_url, code)
    }
}

#[async_trait]
impl OriginClient for ViaCepClient {
    async fn lookup(&self, code: &str) -> OriginLookupResult {
        let url = self.lookup_url(code);
        tracing::debug!("Making ViaCEP request to: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("ViaCEP request failed for {}: {}", code, e);
                return OriginLookupResult::Unresolved(UnresolvedReason::Unavailable);
            }
        };

        let status = response.status();
        tracing::debug!("ViaCEP response status: {}", status);

        if status == StatusCode::BAD_REQUEST {
            // ViaCEP 對格式錯誤的 CEP 回 400
            tracing::info!("ViaCEP rejected postal code {}", code);
            return OriginLookupResult::Unresolved(UnresolvedReason::NotFound);
        }
        if !status.is_success() {
            tracing::warn!("ViaCEP returned {} for {}", status, code);
            return OriginLookupResult::Unresolved(UnresolvedReason::Unavailable);
        }

        match response.json::<ViaCepPayload>().await {
            Ok(payload) if payload.erro => {
                tracing::info!("ViaCEP has no address for {}", code);
                OriginLookupResult::Unresolved(UnresolvedReason::NotFound)
            }
            Ok(payload) => OriginLookupResult::Resolved(payload.address),
            Err(e) => {
                tracing::warn!("ViaCEP returned a malformed body for {}: {}", code, e);
                OriginLookupResult::Unresolved(UnresolvedReason::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> ViaCepClient {
        ViaCepClient::new(ViaCepConfig {
            base_url: server.url("/ws"),
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_resolves_address() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01310100/json");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(serde_json::json!({
                        "cep": "01310-100",
                        "logradouro": "Avenida Paulista",
                        "complemento": "de 612 a 1510 - lado par",
                        "bairro": "Bela Vista",
                        "localidade": "São Paulo",
                        "uf": "SP",
                        "estado": "São Paulo",
                        "ibge": "3550308",
                        "gia": "1004",
                        "ddd": "11",
                        "siafi": "7107"
                    }));
            })
            .await;

        let result = client_for(&server).lookup("01310100").await;

        api_mock.assert_async().await;
        match result {
            OriginLookupResult::Resolved(address) => {
                assert_eq!(address.cep.as_deref(), Some("01310-100"));
                assert_eq!(address.localidade.as_deref(), Some("São Paulo"));
                assert_eq!(address.uf.as_deref(), Some("SP"));
                assert_eq!(address.siafi.as_deref(), Some("7107"));
            }
            other => panic!("expected a resolved address, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_erro_flag_means_not_found() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/00000000/json");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(serde_json::json!({"erro": true}));
            })
            .await;

        let result = client_for(&server).lookup("00000000").await;

        api_mock.assert_async().await;
        assert_eq!(
            result,
            OriginLookupResult::Unresolved(UnresolvedReason::NotFound)
        );
    }

    #[tokio::test]
    async fn test_erro_flag_as_string() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/99999999/json");
                then.status(200)
                    .header("Content-Type", "application/json")
                    .json_body(serde_json::json!({"erro": "true"}));
            })
            .await;

        let result = client_for(&server).lookup("99999999").await;
        assert_eq!(
            result,
            OriginLookupResult::Unresolved(UnresolvedReason::NotFound)
        );
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01310100/json");
                then.status(500);
            })
            .await;

        let result = client_for(&server).lookup("01310100").await;

        // 只呼叫一次，不重試
        api_mock.assert_hits_async(1).await;
        assert_eq!(
            result,
            OriginLookupResult::Unresolved(UnresolvedReason::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ws/01310100/json");
                then.status(200)
                    .header("Content-Type", "text/html")
                    .body("<html>maintenance</html>");
            })
            .await;

        let result = client_for(&server).lookup("01310100").await;
        assert_eq!(
            result,
            OriginLookupResult::Unresolved(UnresolvedReason::Unavailable)
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        // 沒有服務在監聽的埠
        let client = ViaCepClient::new(ViaCepConfig {
            base_url: "http://127.0.0.1:9/ws".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        let result = client.lookup("01310100").await;
        assert_eq!(
            result,
            OriginLookupResult::Unresolved(UnresolvedReason::Unavailable)
        );
    }

    #[test]
    fn test_lookup_url_trims_trailing_slash() {
        let client = ViaCepClient::new(ViaCepConfig {
            base_url: "https://viacep.com.br/ws/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.lookup_url("01310100"),
            "https://viacep.com.br/ws/01310100/json"
        );
    }
}
