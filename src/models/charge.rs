use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargeStatus {
    Active,
    Paid,
    Expired,
    Cancelled,
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChargeStatus::Active => "ACTIVE",
            ChargeStatus::Paid => "PAID",
            ChargeStatus::Expired => "EXPIRED",
            ChargeStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
    Mock,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
            Environment::Mock => "mock",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payer {
    pub name: String,
    /// Digits only (CPF or CNPJ); punctuation is stripped by the builder.
    pub document: String,
}

/// A charge as persisted. Created once by the orchestrator; the status is
/// transitioned afterwards only by the webhook processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub txid: String,
    pub amount_cents: u64,
    pub payer: Payer,
    pub description: String,
    pub status: ChargeStatus,
    pub environment: Environment,
    pub seller_id: String,
    pub product_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

fn default_expiration_seconds() -> u32 {
    3600
}

/// Raw charge-creation input as received from the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewChargeRequest {
    pub amount: String,
    pub payer_name: String,
    pub payer_document: String,
    pub description: String,
    #[serde(default = "default_expiration_seconds")]
    pub expiration_seconds: u32,
    pub seller_id: String,
    pub product_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendario {
    pub expiracao: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Devedor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    pub nome: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valor {
    pub original: String,
}

/// Validated provider payload for `PUT /v2/cob/{txid}`. Never built
/// partially; the builder either returns a complete payload or a
/// `ValidationError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargePayload {
    pub calendario: Calendario,
    pub devedor: Devedor,
    pub valor: Valor,
    pub chave: String,
    #[serde(rename = "solicitacaoPagador")]
    pub solicitacao_pagador: String,
    #[serde(skip)]
    pub amount_cents: u64,
}

/// Result returned verbatim to the charge-creation caller.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeResult {
    pub success: bool,
    pub mock: bool,
    pub environment: Environment,
    pub data: ChargeData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeData {
    pub txid: String,
    /// Base64 QR image when the provider supplied one; mock charges render
    /// client-side from the copy-paste code.
    #[serde(rename = "qrCode")]
    pub qr_code: Option<String>,
    #[serde(rename = "copyPasteCode")]
    pub copy_paste_code: String,
    pub valor: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}
