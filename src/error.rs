use thiserror::Error;

/// Malformed caller input. The only failure kind that reaches the
/// charge-creation caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Provider rejected the credentials (401/403 on the token endpoint).
#[derive(Debug, Clone, Error)]
#[error("credentials rejected by provider (HTTP {status})")]
pub struct AuthError {
    pub status: u16,
}

/// A failed outbound call. The orchestrator only needs to know the attempt
/// failed, not to distinguish further.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}")]
    Http { status: u16, body: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Http { .. } => "http",
            ProviderError::Transport(_) => "transport",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            ProviderError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ProviderError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => ProviderError::Transport(err.to_string()),
        }
    }
}

/// Failure of a single strategy attempt. Absorbed by the orchestrator,
/// never surfaced to the charge-creation caller.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AttemptError {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Auth(_) => "auth",
            AttemptError::Provider(e) => e.kind(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            AttemptError::Auth(e) => Some(e.status),
            AttemptError::Provider(e) => e.status_code(),
        }
    }
}

/// What charge creation can surface: bad input, or a fatal internal failure
/// (mock/CRC generation, persistence). Provider outages never appear here.
#[derive(Debug, Error)]
pub enum CreateChargeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Webhook intake failures. Replays are not errors; they resolve to a
/// silent-success outcome instead.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),
    #[error("unknown charge {txid}")]
    UnknownCharge { txid: String },
    #[error("settlement of {txid} would produce a negative net amount ({net_cents} cents)")]
    NegativeNet { txid: String, net_cents: i64 },
    #[error("storage error: {0}")]
    Storage(String),
}
