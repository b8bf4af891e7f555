//! CORS configuration
//!
//! The three comma-delimited lists supplied when the policy is
//! registered. `*` allows everything for any of them.

use crate::{Error, Result};
use corsgate_origin::AllowList;
use std::sync::Arc;

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed methods, sent verbatim in preflight responses
    methods: String,
    /// Allowed origins as configured
    origins: String,
    /// Allowed headers, sent verbatim in preflight responses
    headers: String,
    /// `origins`, compiled once and shared by every transaction
    allow_list: Arc<AllowList>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            methods: "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS".to_string(),
            origins: "*".to_string(),
            headers: "*".to_string(),
            allow_list: Arc::new(AllowList::parse("*")),
        }
    }
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from positional registration arguments: methods, origins, headers
    ///
    /// # Example
    /// ```
    /// use corsgate_core::CorsConfig;
    ///
    /// let config = CorsConfig::from_args(&["GET,POST", "example.com", "*"]).unwrap();
    /// assert_eq!(config.methods(), "GET,POST");
    /// assert!(CorsConfig::from_args(&["GET"]).is_err());
    /// ```
    pub fn from_args(args: &[&str]) -> Result<Self> {
        match args {
            [methods, origins, headers] => Ok(Self::new()
                .allow_methods(*methods)
                .allow_origins(*origins)
                .allow_headers(*headers)),
            _ => Err(Error::Config(format!(
                "expected 3 arguments (methods, origins, headers), got {}",
                args.len()
            ))),
        }
    }

    pub fn allow_methods(mut self, methods: impl Into<String>) -> Self {
        self.methods = methods.into();
        self
    }

    pub fn allow_origins(mut self, origins: impl Into<String>) -> Self {
        self.origins = origins.into();
        self.allow_list = Arc::new(AllowList::parse(&self.origins));
        self
    }

    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn methods(&self) -> &str {
        &self.methods
    }

    pub fn origins(&self) -> &str {
        &self.origins
    }

    pub fn headers(&self) -> &str {
        &self.headers
    }

    /// Compiled origin allow-list
    pub fn allow_list(&self) -> &Arc<AllowList> {
        &self.allow_list
    }
}
