pub mod charge;
pub mod provider;
pub mod settlement;

pub use charge::{Charge, ChargePayload, ChargeResult, ChargeStatus, Environment, NewChargeRequest};
pub use settlement::{FinancialSettings, LedgerEntry, ProductStats, SellerBalance};
