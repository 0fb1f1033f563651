use crate::error::ValidationError;
use crate::models::charge::{Calendario, ChargePayload, Devedor, NewChargeRequest, Valor};
use crate::models::settlement::FinancialSettings;
use crate::utils::money;

const MAX_DESCRIPTION_LEN: usize = 140;
const MAX_PAYER_NAME_LEN: usize = 100;
const MIN_EXPIRATION_SECS: u32 = 60;
const MAX_EXPIRATION_SECS: u32 = 7 * 24 * 3600;

/// Validates raw input and assembles the provider payload. Either the whole
/// payload builds or a `ValidationError` comes back; nothing partial.
pub struct ChargeBuilder {
    pix_key: String,
    settings: FinancialSettings,
}

impl ChargeBuilder {
    pub fn new(pix_key: String, settings: FinancialSettings) -> Self {
        Self { pix_key, settings }
    }

    pub fn build(&self, request: &NewChargeRequest) -> Result<ChargePayload, ValidationError> {
        let amount_cents = money::parse_amount(&request.amount)?;
        if amount_cents == 0 {
            return Err(ValidationError::new("amount", "amount must be positive"));
        }

        // A charge whose net would not be positive under the configured fees
        // is a data error; reject it here instead of at settlement time.
        let fee = money::calculate_fee(
            amount_cents,
            self.settings.retention_percentage,
            self.settings.fixed_fee_cents,
        );
        if fee >= amount_cents {
            return Err(ValidationError::new(
                "amount",
                format!(
                    "amount {} does not cover the {} fee",
                    money::format_cents(amount_cents),
                    money::format_cents(fee)
                ),
            ));
        }

        let name = request.payer_name.trim();
        if name.is_empty() {
            return Err(ValidationError::new("payer_name", "payer name is empty"));
        }
        if name.chars().count() > MAX_PAYER_NAME_LEN {
            return Err(ValidationError::new(
                "payer_name",
                format!("payer name exceeds {MAX_PAYER_NAME_LEN} characters"),
            ));
        }

        let document: String = request
            .payer_document
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        let devedor = match document.len() {
            11 => Devedor {
                cpf: Some(document),
                cnpj: None,
                nome: name.to_string(),
            },
            14 => Devedor {
                cpf: None,
                cnpj: Some(document),
                nome: name.to_string(),
            },
            len => {
                return Err(ValidationError::new(
                    "payer_document",
                    format!("document has {len} digits, expected 11 (CPF) or 14 (CNPJ)"),
                ))
            }
        };

        let description = request.description.trim();
        if description.is_empty() {
            return Err(ValidationError::new("description", "description is empty"));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::new(
                "description",
                format!("description exceeds {MAX_DESCRIPTION_LEN} characters"),
            ));
        }

        if !(MIN_EXPIRATION_SECS..=MAX_EXPIRATION_SECS).contains(&request.expiration_seconds) {
            return Err(ValidationError::new(
                "expiration_seconds",
                format!(
                    "expiration must be between {MIN_EXPIRATION_SECS} and {MAX_EXPIRATION_SECS} seconds"
                ),
            ));
        }

        Ok(ChargePayload {
            calendario: Calendario {
                expiracao: request.expiration_seconds,
            },
            devedor,
            valor: Valor {
                original: money::format_cents(amount_cents),
            },
            chave: self.pix_key.clone(),
            solicitacao_pagador: description.to_string(),
            amount_cents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ChargeBuilder {
        ChargeBuilder::new(
            "pagamentos@example.com".to_string(),
            FinancialSettings {
                retention_percentage: 10.0,
                fixed_fee_cents: 199,
            },
        )
    }

    fn request(amount: &str, document: &str) -> NewChargeRequest {
        NewChargeRequest {
            amount: amount.to_string(),
            payer_name: "João Silva".to_string(),
            payer_document: document.to_string(),
            description: "Pedido 42".to_string(),
            expiration_seconds: 3600,
            seller_id: "seller-1".to_string(),
            product_id: "product-1".to_string(),
        }
    }

    #[test]
    fn test_build_normalizes_amount_and_document() {
        let payload = builder().build(&request("67.90", "123.456.789-01")).unwrap();
        assert_eq!(payload.valor.original, "67.90");
        assert_eq!(payload.devedor.cpf.as_deref(), Some("12345678901"));
        assert_eq!(payload.devedor.cnpj, None);
        assert_eq!(payload.devedor.nome, "João Silva");
        assert_eq!(payload.amount_cents, 6790);
        assert_eq!(payload.chave, "pagamentos@example.com");
        assert_eq!(payload.solicitacao_pagador, "Pedido 42");
    }

    #[test]
    fn test_build_accepts_cnpj() {
        let payload = builder()
            .build(&request("100.00", "12.345.678/0001-95"))
            .unwrap();
        assert_eq!(payload.devedor.cnpj.as_deref(), Some("12345678000195"));
        assert_eq!(payload.devedor.cpf, None);
    }

    #[test]
    fn test_build_rejects_bad_amounts() {
        assert_eq!(builder().build(&request("0", "12345678901")).unwrap_err().field, "amount");
        assert_eq!(
            builder().build(&request("1.999", "12345678901")).unwrap_err().field,
            "amount"
        );
        assert_eq!(
            builder().build(&request("abc", "12345678901")).unwrap_err().field,
            "amount"
        );
    }

    #[test]
    fn test_build_rejects_amount_below_fees() {
        // fee on 2.00 = 0.20 + 1.99 = 2.19 > 2.00
        let err = builder().build(&request("2.00", "12345678901")).unwrap_err();
        assert_eq!(err.field, "amount");
        assert!(err.reason.contains("fee"));
    }

    #[test]
    fn test_build_rejects_bad_document() {
        let err = builder().build(&request("67.90", "1234")).unwrap_err();
        assert_eq!(err.field, "payer_document");
    }

    #[test]
    fn test_build_rejects_empty_fields() {
        let mut req = request("67.90", "12345678901");
        req.payer_name = "   ".to_string();
        assert_eq!(builder().build(&req).unwrap_err().field, "payer_name");

        let mut req = request("67.90", "12345678901");
        req.description = String::new();
        assert_eq!(builder().build(&req).unwrap_err().field, "description");

        let mut req = request("67.90", "12345678901");
        req.description = "x".repeat(141);
        assert_eq!(builder().build(&req).unwrap_err().field, "description");
    }

    #[test]
    fn test_build_rejects_bad_expiration() {
        let mut req = request("67.90", "12345678901");
        req.expiration_seconds = 10;
        assert_eq!(builder().build(&req).unwrap_err().field, "expiration_seconds");
    }
}
