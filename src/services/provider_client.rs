use crate::error::ProviderError;
use crate::models::charge::{ChargePayload, Environment};
use crate::models::provider::{CobResponse, QrCodeResponse, TokenResponse};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }
}

/// One environment/header combination the orchestrator can try.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: &'static str,
    pub tag: Environment,
    pub base_url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub credentials: Credentials,
}

/// The three outbound calls against one environment. A trait seam so the
/// orchestrator and token manager can be exercised without a network.
#[async_trait]
pub trait PixProvider: Send + Sync {
    fn strategy_name(&self) -> &'static str;
    fn environment(&self) -> Environment;
    /// Token-cache key for this credential set + environment.
    fn cache_key(&self) -> String;
    async fn create_token(&self) -> Result<TokenResponse, ProviderError>;
    async fn create_charge(
        &self,
        txid: &str,
        payload: &ChargePayload,
        bearer: &str,
    ) -> Result<CobResponse, ProviderError>;
    async fn fetch_qr_code(
        &self,
        txid: &str,
        loc_id: Option<u64>,
        bearer: &str,
    ) -> Result<QrCodeResponse, ProviderError>;
}

pub struct ProviderClient {
    client: Client,
    strategy: Strategy,
}

impl ProviderClient {
    pub fn new(strategy: Strategy) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &strategy.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                headers.insert(name, value);
            }
        }
        let client = Client::builder()
            .timeout(strategy.timeout)
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, strategy }
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PixProvider for ProviderClient {
    fn strategy_name(&self) -> &'static str {
        self.strategy.name
    }

    fn environment(&self) -> Environment {
        self.strategy.tag
    }

    fn cache_key(&self) -> String {
        let raw = format!(
            "{}:{}:{}",
            self.strategy.credentials.client_id,
            self.strategy.credentials.client_secret,
            self.strategy.base_url
        );
        hex::encode(Sha256::digest(raw.as_bytes()))
    }

    async fn create_token(&self) -> Result<TokenResponse, ProviderError> {
        let url = format!("{}/oauth/token", self.strategy.base_url);
        debug!(strategy = self.strategy.name, "requesting access token");
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.strategy.credentials.basic_auth_header())
            .json(&serde_json::json!({ "grant_type": "client_credentials" }))
            .send()
            .await?;
        let response = Self::checked(response).await?;
        Ok(response.json().await?)
    }

    async fn create_charge(
        &self,
        txid: &str,
        payload: &ChargePayload,
        bearer: &str,
    ) -> Result<CobResponse, ProviderError> {
        let url = format!("{}/v2/cob/{}", self.strategy.base_url, txid);
        debug!(strategy = self.strategy.name, txid, "creating cob");
        let response = self
            .client
            .put(&url)
            .bearer_auth(bearer)
            .json(payload)
            .send()
            .await?;
        let response = Self::checked(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_qr_code(
        &self,
        txid: &str,
        loc_id: Option<u64>,
        bearer: &str,
    ) -> Result<QrCodeResponse, ProviderError> {
        let url = match loc_id {
            Some(id) => format!("{}/v2/loc/{}/qrcode", self.strategy.base_url, id),
            None => format!("{}/v2/cob/{}/qrcode", self.strategy.base_url, txid),
        };
        debug!(strategy = self.strategy.name, txid, "fetching qrcode");
        let response = self.client.get(&url).bearer_auth(bearer).send().await?;
        let response = Self::checked(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        };
        // base64("id:secret")
        assert_eq!(creds.basic_auth_header(), "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn test_cache_key_differs_per_base_url() {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
        };
        let mk = |base_url: &str| {
            ProviderClient::new(Strategy {
                name: "primary",
                tag: Environment::Sandbox,
                base_url: base_url.to_string(),
                headers: Vec::new(),
                timeout: Duration::from_secs(5),
                credentials: creds.clone(),
            })
        };
        let a = mk("https://pix-h.example.com").cache_key();
        let b = mk("https://pix.example.com").cache_key();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
