use std::sync::Arc;

use common::EndpointId;
use serde::Serialize;

/// One (host, port) polling target. Endpoints are minted by the registry the
/// first time a (host, application) pair is observed active and never
/// mutated afterwards; everything else refers to them by their unique id, so
/// id equality is object identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    id: EndpointId,
    host_name: String,
    port: u16,
}

impl Endpoint {
    pub(crate) fn new(host_name: impl Into<String>, port: u16) -> Arc<Self> {
        Arc::new(Self {
            id: EndpointId::next(),
            host_name: host_name.into(),
            port,
        })
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
