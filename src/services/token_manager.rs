use crate::error::{AttemptError, AuthError, ProviderError};
use crate::services::provider_client::PixProvider;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// OAuth2 token cache, keyed by credential-set hash. Each key has its own
/// async mutex so a refresh for one credential set is mutually exclusive:
/// concurrent callers inside one validity window trigger exactly one
/// outbound token request, and a cache hit performs zero I/O.
pub struct TokenManager {
    slots: DashMap<String, Arc<Mutex<Option<CachedToken>>>>,
    safety_margin: Duration,
}

impl TokenManager {
    pub fn new(safety_margin: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            safety_margin,
        }
    }

    fn slot(&self, key: &str) -> Arc<Mutex<Option<CachedToken>>> {
        self.slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Returns a bearer token for the provider's credential set, refreshing
    /// only when missing, expired, or inside the safety margin.
    pub async fn bearer_for(&self, provider: &dyn PixProvider) -> Result<String, AttemptError> {
        let slot = self.slot(&provider.cache_key());
        let mut guard = slot.lock().await;

        if let Some(token) = guard.as_ref() {
            if Instant::now() + self.safety_margin < token.expires_at {
                debug!(strategy = provider.strategy_name(), "token cache hit");
                return Ok(token.value.clone());
            }
        }

        let response = provider.create_token().await.map_err(|err| match err {
            ProviderError::Http { status: 401, .. } => AttemptError::Auth(AuthError { status: 401 }),
            ProviderError::Http { status: 403, .. } => AttemptError::Auth(AuthError { status: 403 }),
            other => AttemptError::Provider(other),
        })?;

        info!(
            strategy = provider.strategy_name(),
            expires_in = response.expires_in,
            "acquired new access token"
        );
        let value = response.access_token.clone();
        *guard = Some(CachedToken {
            value: response.access_token,
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(value)
    }

    /// Drops any cached token for the key; the next call refreshes.
    pub fn invalidate(&self, key: &str) {
        self.slots.remove(key);
    }

    /// Unconditionally fetches a fresh token for the provider.
    pub async fn refresh(&self, provider: &dyn PixProvider) -> Result<String, AttemptError> {
        self.invalidate(&provider.cache_key());
        self.bearer_for(provider).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::charge::{ChargePayload, Environment};
    use crate::models::provider::{CobResponse, QrCodeResponse, TokenResponse};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeTokenSource {
        calls: AtomicU32,
        expires_in: u64,
        reject_status: Option<u16>,
    }

    impl FakeTokenSource {
        fn new(expires_in: u64) -> Self {
            Self {
                calls: AtomicU32::new(0),
                expires_in,
                reject_status: None,
            }
        }

        fn rejecting(status: u16) -> Self {
            Self {
                calls: AtomicU32::new(0),
                expires_in: 3600,
                reject_status: Some(status),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PixProvider for FakeTokenSource {
        fn strategy_name(&self) -> &'static str {
            "fake"
        }

        fn environment(&self) -> Environment {
            Environment::Sandbox
        }

        fn cache_key(&self) -> String {
            "fake-key".to_string()
        }

        async fn create_token(&self) -> Result<TokenResponse, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(status) = self.reject_status {
                return Err(ProviderError::Http {
                    status,
                    body: "invalid_client".to_string(),
                });
            }
            Ok(TokenResponse {
                access_token: format!("token-{n}"),
                token_type: "Bearer".to_string(),
                expires_in: self.expires_in,
            })
        }

        async fn create_charge(
            &self,
            _txid: &str,
            _payload: &ChargePayload,
            _bearer: &str,
        ) -> Result<CobResponse, ProviderError> {
            unimplemented!("token tests never create charges")
        }

        async fn fetch_qr_code(
            &self,
            _txid: &str,
            _loc_id: Option<u64>,
            _bearer: &str,
        ) -> Result<QrCodeResponse, ProviderError> {
            unimplemented!("token tests never fetch QR codes")
        }
    }

    #[tokio::test]
    async fn test_cache_hit_performs_no_io() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let source = FakeTokenSource::new(3600);

        let first = manager.bearer_for(&source).await.unwrap();
        let second = manager.bearer_for(&source).await.unwrap();

        assert_eq!(first, "token-1");
        assert_eq!(second, "token-1");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_margin_forces_refresh() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let source = FakeTokenSource::new(300);

        assert_eq!(manager.bearer_for(&source).await.unwrap(), "token-1");

        // Still comfortably inside the validity window.
        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(manager.bearer_for(&source).await.unwrap(), "token-1");

        // Now inside the 60s safety margin of the 300s lifetime.
        tokio::time::advance(Duration::from_secs(150)).await;
        assert_eq!(manager.bearer_for(&source).await.unwrap(), "token-2");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_request() {
        let manager = Arc::new(TokenManager::new(Duration::from_secs(60)));
        let source = Arc::new(FakeTokenSource::new(3600));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let source = source.clone();
            handles.push(tokio::spawn(async move {
                manager.bearer_for(source.as_ref()).await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), "token-1");
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejection_maps_to_auth_error_and_is_not_cached() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let source = FakeTokenSource::rejecting(401);

        for _ in 0..2 {
            let err = manager.bearer_for(&source).await.unwrap_err();
            assert!(matches!(err, AttemptError::Auth(AuthError { status: 401 })));
        }
        // Both calls hit the provider; failures are never cached.
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let manager = TokenManager::new(Duration::from_secs(60));
        let source = FakeTokenSource::new(3600);

        assert_eq!(manager.bearer_for(&source).await.unwrap(), "token-1");
        manager.invalidate(&source.cache_key());
        assert_eq!(manager.bearer_for(&source).await.unwrap(), "token-2");
        assert_eq!(manager.refresh(&source).await.unwrap(), "token-3");
        assert_eq!(source.calls(), 3);
    }
}
