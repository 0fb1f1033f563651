use crate::error::{AttemptError, CreateChargeError};
use crate::models::charge::{
    Charge, ChargeData, ChargePayload, ChargeResult, ChargeStatus, Environment, NewChargeRequest,
    Payer,
};
use crate::models::provider::QrCodeResponse;
use crate::pix::{emv, txid};
use crate::services::charge_builder::ChargeBuilder;
use crate::services::provider_client::PixProvider;
use crate::services::token_manager::TokenManager;
use crate::storage::ChargeStore;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct MerchantInfo {
    pub pix_key: String,
    pub name: String,
    pub city: String,
}

/// Sequences the configured strategies and falls back to a locally
/// generated BR-Code when every one of them fails. The end user always gets
/// a render-ready payment artifact; only malformed input surfaces as an
/// error. Each failed attempt is logged with its strategy identity and
/// failure kind so provider outages stay distinguishable from bugs.
pub struct ChargeOrchestrator {
    providers: Vec<Arc<dyn PixProvider>>,
    tokens: Arc<TokenManager>,
    builder: ChargeBuilder,
    charges: Arc<dyn ChargeStore>,
    merchant: MerchantInfo,
}

impl ChargeOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn PixProvider>>,
        tokens: Arc<TokenManager>,
        builder: ChargeBuilder,
        charges: Arc<dyn ChargeStore>,
        merchant: MerchantInfo,
    ) -> Self {
        Self {
            providers,
            tokens,
            builder,
            charges,
            merchant,
        }
    }

    pub async fn create_charge(
        &self,
        request: &NewChargeRequest,
    ) -> Result<ChargeResult, CreateChargeError> {
        let payload = self.builder.build(request)?;
        let txid = txid::generate();
        let expires_at = Utc::now() + Duration::seconds(i64::from(payload.calendario.expiracao));

        // Strategies run strictly in sequence: one txid is never in flight
        // against two environments at once.
        for provider in &self.providers {
            match self.attempt(provider.as_ref(), &txid, &payload).await {
                Ok(qr) => {
                    if !emv::validate_code(&qr.qrcode) {
                        warn!(
                            strategy = provider.strategy_name(),
                            txid = %txid,
                            "provider returned a BR-Code with an invalid CRC16"
                        );
                    }
                    let environment = provider.environment();
                    self.persist(request, &payload, &txid, environment, expires_at)
                        .await?;
                    info!(
                        strategy = provider.strategy_name(),
                        environment = %environment,
                        txid = %txid,
                        "charge created"
                    );
                    return Ok(ChargeResult {
                        success: true,
                        mock: false,
                        environment,
                        data: ChargeData {
                            txid,
                            qr_code: qr.imagem_qrcode,
                            copy_paste_code: qr.qrcode,
                            valor: payload.valor.original.clone(),
                            expires_at,
                        },
                    });
                }
                Err(err) => {
                    warn!(
                        strategy = provider.strategy_name(),
                        kind = err.kind(),
                        status = err.status_code(),
                        txid = %txid,
                        "strategy failed: {err}"
                    );
                }
            }
        }

        // Every strategy failed; synthesize a scannable code locally.
        let code = emv::build_static_code(
            &self.merchant.pix_key,
            &self.merchant.name,
            &self.merchant.city,
            payload.amount_cents,
            &txid,
        )
        .map_err(|e| {
            error!(txid = %txid, "mock BR-Code generation failed: {e}");
            CreateChargeError::Internal(e.to_string())
        })?;
        debug_assert!(emv::validate_code(&code));

        self.persist(request, &payload, &txid, Environment::Mock, expires_at)
            .await?;
        info!(txid = %txid, "all strategies failed, served mock charge");
        Ok(ChargeResult {
            success: true,
            mock: true,
            environment: Environment::Mock,
            data: ChargeData {
                txid,
                qr_code: None,
                copy_paste_code: code,
                valor: payload.valor.original.clone(),
                expires_at,
            },
        })
    }

    /// All three calls must succeed, in order, for a strategy to count.
    async fn attempt(
        &self,
        provider: &dyn PixProvider,
        txid: &str,
        payload: &ChargePayload,
    ) -> Result<QrCodeResponse, AttemptError> {
        let bearer = self.tokens.bearer_for(provider).await?;
        let cob = provider.create_charge(txid, payload, &bearer).await?;
        let qr = provider
            .fetch_qr_code(txid, cob.loc.map(|l| l.id), &bearer)
            .await?;
        Ok(qr)
    }

    async fn persist(
        &self,
        request: &NewChargeRequest,
        payload: &ChargePayload,
        txid: &str,
        environment: Environment,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<(), CreateChargeError> {
        let document = payload
            .devedor
            .cpf
            .clone()
            .or_else(|| payload.devedor.cnpj.clone())
            .unwrap_or_default();
        let charge = Charge {
            txid: txid.to_string(),
            amount_cents: payload.amount_cents,
            payer: Payer {
                name: payload.devedor.nome.clone(),
                document,
            },
            description: payload.solicitacao_pagador.clone(),
            status: ChargeStatus::Active,
            environment,
            seller_id: request.seller_id.clone(),
            product_id: request.product_id.clone(),
            expires_at,
            created_at: Utc::now(),
        };
        self.charges.insert(charge).await.map_err(|e| {
            error!(txid, "failed to persist charge: {e}");
            CreateChargeError::Internal(e.to_string())
        })
    }
}
