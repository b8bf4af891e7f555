//! Per-transaction CORS state

use super::{CorsConfig, DeliveryMode};
use crate::Method;
use corsgate_origin::AllowList;
use std::sync::Arc;

/// State handed from the request phase to the response phase
///
/// Only created for requests that carry a non-empty `Origin`.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub origin: String,
    pub method: Method,
    pub allowed_methods: String,
    pub allowed_origins: Arc<AllowList>,
    pub allowed_headers: String,
    /// How preflight headers reach the client for this transaction
    pub delivery: DeliveryMode,
}

impl TransactionContext {
    /// Capture the request origin together with the policy configuration
    pub fn capture(
        origin: impl Into<String>,
        method: Method,
        config: &CorsConfig,
        delivery: DeliveryMode,
    ) -> Self {
        Self {
            origin: origin.into(),
            method,
            allowed_methods: config.methods().to_string(),
            allowed_origins: Arc::clone(config.allow_list()),
            allowed_headers: config.headers().to_string(),
            delivery,
        }
    }
}
