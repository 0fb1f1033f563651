pub mod charge_builder;
pub mod orchestrator;
pub mod provider_client;
pub mod token_manager;
pub mod webhook_processor;

pub use charge_builder::ChargeBuilder;
pub use orchestrator::{ChargeOrchestrator, MerchantInfo};
pub use provider_client::{PixProvider, ProviderClient, Strategy};
pub use token_manager::TokenManager;
pub use webhook_processor::{SettlementOutcome, WebhookProcessor};
