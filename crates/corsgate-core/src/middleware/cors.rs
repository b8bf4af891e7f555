//! CORS middleware
//!
//! Adapts [`CorsPolicy`] to the [`Middleware`] phases. The transaction
//! context travels in the request's extensions, so it lives exactly as
//! long as the request.

use super::Middleware;
use crate::cors::{CorsConfig, CorsPolicy, DeliveryMode, RequestPhase, TransactionContext};
use crate::{Request, Response};

/// CORS middleware
pub struct Cors {
    policy: CorsPolicy,
    delivery: DeliveryMode,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self {
            policy: CorsPolicy::new(config),
            delivery: DeliveryMode::Immediate,
        }
    }

    /// Allow all origins, methods and headers
    pub fn permissive() -> Self {
        Self::new(CorsConfig::default())
    }

    /// Never answer preflights directly; forward them and decorate the
    /// backend response instead
    pub fn deferred(mut self) -> Self {
        self.delivery = DeliveryMode::Deferred;
        self
    }
}

impl Middleware for Cors {
    fn before(&self, req: &mut Request) -> Option<Response> {
        match self.policy.on_request(req, self.delivery) {
            RequestPhase::Skip => None,
            RequestPhase::Proceed(ctx) => {
                req.extensions.insert(ctx);
                None
            }
            RequestPhase::Reply(res) => Some(res),
        }
    }

    fn after(&self, req: &Request, res: &mut Response) {
        self.policy
            .on_response(req.extensions.get::<TransactionContext>(), res);
    }
}
