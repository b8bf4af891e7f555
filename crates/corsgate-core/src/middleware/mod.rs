//! Middleware
//!
//! Hosts drive middleware in two phases around the backend round-trip.

pub mod cors;

// Re-exports for convenience
pub use cors::Cors;

use crate::{Request, Response};

/// Middleware trait - process request/response
pub trait Middleware: Send + Sync {
    /// Process request before the backend, optionally answering it directly
    fn before(&self, req: &mut Request) -> Option<Response>;

    /// Process the response on its way to the client
    fn after(&self, req: &Request, res: &mut Response);
}

/// Middleware chain
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Builder-style `add`
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    /// Run before middlewares, return early response if any
    pub fn run_before(&self, req: &mut Request) -> Option<Response> {
        for m in &self.middlewares {
            if let Some(res) = m.before(req) {
                return Some(res);
            }
        }
        None
    }

    /// Run after middlewares in reverse order
    pub fn run_after(&self, req: &Request, res: &mut Response) {
        for m in self.middlewares.iter().rev() {
            m.after(req, res);
        }
    }

    /// Run both phases around a synchronous backend
    ///
    /// `backend` is skipped when a middleware answers early. `after` runs
    /// for every response either way.
    pub fn handle<F>(&self, req: &mut Request, backend: F) -> Response
    where
        F: FnOnce(&Request) -> Response,
    {
        let mut res = match self.run_before(req) {
            Some(res) => res,
            None => backend(&*req),
        };
        self.run_after(req, &mut res);
        res
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}
