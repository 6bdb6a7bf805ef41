use std::net::SocketAddrV4;
use thiserror::Error;

use crate::config::RoutingProtocol;
use crate::node::NodeId;

/// Raised while turning user input into an [`ExperimentConfig`](crate::ExperimentConfig).
/// Nothing has been built yet when one of these surfaces.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("No such protocol: {0}")]
    UnknownProtocol(String),

    #[error("invalid value for `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

impl ConfigurationError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// Raised while building the topology, before the clock starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("node {node} already has an endpoint bound to {address}")]
    DuplicateBinding { node: NodeId, address: SocketAddrV4 },

    #[error("topology has {nodes} nodes but {sinks} sinks need at least {required}")]
    TopologyTooSmall {
        nodes: usize,
        sinks: usize,
        required: usize,
    },

    #[error("node {node} already runs {installed}, refusing to install {requested}")]
    ConflictingRoutingStack {
        node: NodeId,
        installed: RoutingProtocol,
        requested: RoutingProtocol,
    },

    #[error("node {0} finished the build phase without a routing capability")]
    MissingRoutingCapability(NodeId),

    #[error("node {0} has no assigned address")]
    NoAddress(NodeId),

    #[error("address pool {base}/24 cannot number {nodes} nodes")]
    AddressPoolExhausted { base: std::net::Ipv4Addr, nodes: usize },
}
