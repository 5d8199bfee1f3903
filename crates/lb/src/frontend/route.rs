use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::backend::Backend;

/// Sends requests whose host and path match to `backend`.
///
/// Patterns are unanchored regular expressions. A missing pattern matches
/// anything. Hosts are compared lower-cased and without port.
#[derive(Debug, Clone)]
pub struct Route {
    host: Option<Regex>,
    path: Option<Regex>,
    backend: Arc<dyn Backend>,
}

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("invalid host pattern {pattern:?}: {source}")]
    InvalidHost { pattern: String, source: regex::Error },

    #[error("invalid path pattern {pattern:?}: {source}")]
    InvalidPath { pattern: String, source: regex::Error },
}

impl Route {
    pub fn new(host: Option<&str>, path: Option<&str>, backend: Arc<dyn Backend>) -> Result<Self, RouteError> {
        let host = host
            .map(|pattern| Regex::new(pattern).map_err(|source| RouteError::InvalidHost { pattern: pattern.to_owned(), source }))
            .transpose()?;
        let path = path
            .map(|pattern| Regex::new(pattern).map_err(|source| RouteError::InvalidPath { pattern: pattern.to_owned(), source }))
            .transpose()?;
        Ok(Self { host, path, backend })
    }

    pub fn from_regex(host: Option<Regex>, path: Option<Regex>, backend: Arc<dyn Backend>) -> Self {
        Self { host, path, backend }
    }

    #[inline]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// `host` is the request host without port, already lower-cased.
    pub fn matches(&self, host: Option<&str>, path: &str) -> bool {
        let host_matches = match (&self.host, host) {
            (None, _) => true,
            (Some(pattern), Some(host)) => pattern.is_match(host),
            (Some(_), None) => false,
        };
        host_matches && self.path.as_ref().is_none_or(|pattern| pattern.is_match(path))
    }
}
