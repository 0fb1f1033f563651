pub mod charges;
pub mod webhooks;

use crate::services::{ChargeOrchestrator, WebhookProcessor};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChargeOrchestrator>,
    pub webhooks: Arc<WebhookProcessor>,
}
