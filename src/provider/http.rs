//! REST client for a wallet/market data API.
//!
//! Endpoints (relative to `base_url`):
//! - `GET /wallets/{address}/balances`
//! - `GET /wallets/{address}/transactions?limit=&offset=`
//! - `GET /tokens/{symbol}/price`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::WalletDataProvider;
use crate::utils::error::{Error, Result};
use crate::utils::types::{TokenHolding, TokenPrice, Transaction};

#[derive(Clone)]
pub struct HttpDataProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDataProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConnectionError(format!("build http client: {}", e)))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let mut req = self.client.get(self.url(path)).query(query);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::ConnectionError(format!("GET {}: {}", path, e)))?;

        match resp.status() {
            | StatusCode::OK => resp
                .json::<T>()
                .await
                .map_err(|e| Error::DataError(format!("decode {}: {}", path, e))),
            | StatusCode::NOT_FOUND => Err(Error::NotFound(path.to_string())),
            | status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::ConnectionError(format!("GET {} returned {}: {}", path, status, body)))
            }
        }
    }
}

#[async_trait]
impl WalletDataProvider for HttpDataProvider {
    async fn get_token_balances(&self, address: &str) -> Result<Vec<TokenHolding>> {
        self.get_json(&format!("/wallets/{}/balances", address), &[]).await
    }

    async fn get_transactions(&self, address: &str, limit: usize, offset: usize) -> Result<Vec<Transaction>> {
        self.get_json(
            &format!("/wallets/{}/transactions", address),
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    async fn get_token_price(&self, symbol: &str) -> Result<TokenPrice> {
        self.get_json(&format!("/tokens/{}/price", symbol.to_uppercase()), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let provider = HttpDataProvider::new("https://api.example.com/v1/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.url("/tokens/ETH/price"), "https://api.example.com/v1/tokens/ETH/price");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_connection_error() {
        let provider = HttpDataProvider::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
        let err = provider.get_token_price("ETH").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionError(_)));
    }
}
