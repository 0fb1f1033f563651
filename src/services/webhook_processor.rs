use crate::error::WebhookError;
use crate::models::charge::{ChargeStatus, Environment};
use crate::models::settlement::{
    status_from_evento, FinancialSettings, LedgerEntry, WebhookEvent, WebhookPayload,
};
use crate::storage::{ChargeStore, SettlementStore, StoreError};
use crate::utils::money;
use chrono::Utc;
use dashmap::DashMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Outcome of applying one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Charge marked paid; seller credited with this net amount.
    Settled { net_cents: u64 },
    /// Non-paid terminal transition (expired/cancelled).
    StatusUpdated,
    /// Replay of an event already applied; nothing was mutated.
    AlreadyProcessed,
}

/// Validates, deduplicates, and settles payment-confirmation events.
/// Settlement runs under a per-txid lock because webhook delivery is
/// at-least-once: two near-simultaneous deliveries of the same event must
/// not both pass the replay check.
pub struct WebhookProcessor {
    charges: Arc<dyn ChargeStore>,
    settlements: Arc<dyn SettlementStore>,
    settings: FinancialSettings,
    secret: String,
    mode: Environment,
    txid_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WebhookProcessor {
    pub fn new(
        charges: Arc<dyn ChargeStore>,
        settlements: Arc<dyn SettlementStore>,
        settings: FinancialSettings,
        secret: String,
        mode: Environment,
    ) -> Self {
        Self {
            charges,
            settlements,
            settings,
            secret,
            mode,
            txid_locks: DashMap::new(),
        }
    }

    /// HMAC-SHA256 over the raw body, hex-encoded in the header. Fails
    /// closed in production; outside production a missing signature is
    /// tolerated, but a present-and-wrong one is still rejected.
    pub fn validate_signature(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        let signature = match signature {
            Some(s) if !s.trim().is_empty() => s.trim(),
            _ => return self.mode != Environment::Production,
        };
        let Ok(given) = hex::decode(signature) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(raw_body);
        mac.verify_slice(&given).is_ok()
    }

    /// Parses `{evento, cobranca: {txid, valor: {original}}}`.
    pub fn parse_payload(raw_body: &[u8]) -> Result<WebhookEvent, WebhookError> {
        let payload: WebhookPayload = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        let status = status_from_evento(&payload.evento).ok_or_else(|| {
            WebhookError::MalformedPayload(format!("unknown evento '{}'", payload.evento))
        })?;
        let amount_cents = money::parse_amount(&payload.cobranca.valor.original)
            .map_err(|e| WebhookError::MalformedPayload(e.to_string()))?;
        Ok(WebhookEvent {
            txid: payload.cobranca.txid,
            status,
            amount_cents,
        })
    }

    /// Full intake path used by the HTTP handler: signature, parse, apply.
    pub async fn process(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<SettlementOutcome, WebhookError> {
        if !self.validate_signature(raw_body, signature) {
            warn!("rejected webhook with missing or invalid signature");
            return Err(WebhookError::InvalidSignature);
        }
        let event = Self::parse_payload(raw_body)?;
        self.apply(&event.txid, event.status).await
    }

    /// Settles one status transition, exactly once per terminal value.
    pub async fn apply(
        &self,
        txid: &str,
        status: ChargeStatus,
    ) -> Result<SettlementOutcome, WebhookError> {
        let lock = self
            .txid_locks
            .entry(txid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.apply_locked(txid, status).await
        };
        drop(lock);
        // Lock entries only linger while another delivery is waiting on
        // them; otherwise the map would grow with every txid ever seen.
        self.txid_locks
            .remove_if(txid, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn apply_locked(
        &self,
        txid: &str,
        status: ChargeStatus,
    ) -> Result<SettlementOutcome, WebhookError> {
        let charge = self
            .charges
            .get(txid)
            .await
            .ok_or_else(|| WebhookError::UnknownCharge {
                txid: txid.to_string(),
            })?;

        if charge.status == status {
            info!(txid = %txid, status = %status, "webhook replay, already processed");
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        if status != ChargeStatus::Paid {
            self.charges
                .update_status(txid, status)
                .await
                .map_err(|e| WebhookError::Storage(e.to_string()))?;
            info!(txid = %txid, status = %status, "charge status updated");
            return Ok(SettlementOutcome::StatusUpdated);
        }

        let gross = charge.amount_cents;
        let fee = money::calculate_fee(
            gross,
            self.settings.retention_percentage,
            self.settings.fixed_fee_cents,
        );
        if fee > gross {
            // Price below the configured fees: a configuration/data error,
            // reported instead of clamped.
            error!(
                txid = %txid,
                gross_cents = gross,
                fee_cents = fee,
                "settlement would produce a negative net amount"
            );
            return Err(WebhookError::NegativeNet {
                txid: txid.to_string(),
                net_cents: gross as i64 - fee as i64,
            });
        }
        let net = gross - fee;

        let entry = LedgerEntry {
            sale_id: txid.to_string(),
            gross_cents: gross,
            fee_percentage: self.settings.retention_percentage,
            fee_fixed_cents: self.settings.fixed_fee_cents,
            net_cents: net,
            created_at: Utc::now(),
        };
        match self.settlements.settle(&charge, entry).await {
            Ok(()) => {
                info!(
                    txid = %txid,
                    seller = %charge.seller_id,
                    gross_cents = gross,
                    net_cents = net,
                    "charge settled"
                );
                Ok(SettlementOutcome::Settled { net_cents: net })
            }
            // Lost a race against another replica of the same event.
            Err(StoreError::AlreadySettled(_)) => Ok(SettlementOutcome::AlreadyProcessed),
            Err(e) => Err(WebhookError::Storage(e.to_string())),
        }
    }
}
