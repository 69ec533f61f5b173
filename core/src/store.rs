//! Registry of endpoints sharing one default configuration and transport.
//!
//! # Design
//! `ApiStore` hands out independent `Query` values: each receives a clone of
//! the store's configuration, so configuring one query never leaks into the
//! next. Endpoints are keyed by `EndpointDescriptor::key`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Configuration;
use crate::endpoint::EndpointDescriptor;
use crate::http::Transport;
use crate::query::Query;

pub struct ApiStore {
    configuration: Configuration,
    endpoints: HashMap<String, EndpointDescriptor>,
    transport: Arc<dyn Transport>,
}

impl ApiStore {
    pub fn new(configuration: Configuration, transport: Arc<dyn Transport>) -> Self {
        Self {
            configuration,
            endpoints: HashMap::new(),
            transport,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Defaults applied to every query created afterwards.
    pub fn configuration_mut(&mut self) -> &mut Configuration {
        &mut self.configuration
    }

    /// Register `endpoint`, replacing any endpoint with the same key. Returns
    /// the key.
    pub fn set_endpoint(&mut self, endpoint: EndpointDescriptor) -> String {
        let key = endpoint.key();
        self.endpoints.insert(key.clone(), endpoint);
        key
    }

    pub fn endpoint(&self, key: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.get(key)
    }

    /// A fresh query for the endpoint registered under `key`.
    pub fn create_query(&self, key: &str) -> Option<Query> {
        let endpoint = self.endpoints.get(key)?.clone();
        Some(Query::new(
            self.configuration.clone(),
            endpoint,
            Arc::clone(&self.transport),
        ))
    }
}

impl fmt::Debug for ApiStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiStore")
            .field("configuration", &self.configuration)
            .field("endpoints", &self.endpoints.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
