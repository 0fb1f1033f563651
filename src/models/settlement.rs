use crate::models::charge::{ChargeStatus, Valor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only record of one settled charge. Exactly one entry exists per
/// successfully settled charge.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub sale_id: String,
    pub gross_cents: u64,
    pub fee_percentage: f64,
    pub fee_fixed_cents: u64,
    pub net_cents: u64,
    pub created_at: DateTime<Utc>,
}

/// Invariant: `available_cents` equals the cumulative sum of applied
/// `LedgerEntry::net_cents` (withdrawals are out of scope here).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SellerBalance {
    pub available_cents: u64,
    pub total_received_cents: u64,
    pub total_sales: u64,
}

/// Per-product sales counters, credited in the same atomic unit as the
/// seller balance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductStats {
    pub sales_count: u64,
    pub revenue_cents: u64,
}

/// Process-wide fee configuration; read-only at settlement time.
#[derive(Debug, Clone)]
pub struct FinancialSettings {
    pub retention_percentage: f64,
    pub fixed_fee_cents: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookCobranca {
    pub txid: String,
    pub valor: Valor,
}

/// Raw webhook body: `{evento, cobranca: {txid, valor: {original}}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub evento: String,
    pub cobranca: WebhookCobranca,
}

/// Parsed and normalized webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub txid: String,
    pub status: ChargeStatus,
    pub amount_cents: u64,
}

/// Maps provider event names onto charge statuses. Unknown events are
/// rejected at parse time rather than guessed at.
pub fn status_from_evento(evento: &str) -> Option<ChargeStatus> {
    match evento {
        "cobranca_paga" | "PIX_RECEBIDO" | "CONCLUIDA" | "PAID" => Some(ChargeStatus::Paid),
        "cobranca_expirada" | "EXPIRED" => Some(ChargeStatus::Expired),
        "cobranca_cancelada" | "REMOVIDA_PELO_USUARIO_RECEBEDOR" | "CANCELLED" => {
            Some(ChargeStatus::Cancelled)
        }
        _ => None,
    }
}
