use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::config::RoutingProtocol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WifiStandard {
    Ieee80211b,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MacType {
    Adhoc,
}

/// The wireless interface installed on every node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WifiDevice {
    pub standard: WifiStandard,
    pub mac: MacType,
    pub phy_mode: String,
    pub tx_power_start: f64,
    pub tx_power_end: f64,
}

/// How a routing stack obtains routes, as far as the channel needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteDiscovery {
    /// Routes exist before the first data packet.
    Proactive,
    /// The first packet towards a destination waits for discovery.
    OnDemand { setup_delay: Duration },
}

/// What a routing installer leaves behind on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingCapability {
    pub protocol: RoutingProtocol,
    pub discovery: RouteDiscovery,
    /// Priority inside an IPv4 list-routing table; `None` when the protocol
    /// sits beside the stack rather than inside it (DSR).
    pub list_priority: Option<i16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub device: Option<WifiDevice>,
    pub internet_stack: bool,
    pub routing: Option<RoutingCapability>,
    pub address: Option<Ipv4Addr>,
}

impl Node {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            device: None,
            internet_stack: false,
            routing: None,
            address: None,
        }
    }

    pub fn can_route(&self) -> bool {
        self.internet_stack && self.routing.is_some()
    }
}

/// Ordered, fixed-membership set of mobile nodes.
///
/// Nodes `[0, S)` are sinks and `[S, 2S)` are senders for a sink count `S`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSet {
    nodes: Vec<Node>,
}

impl NodeSet {
    pub fn create(count: usize) -> Self {
        Self {
            nodes: (0..count).map(|i| Node::new(NodeId(i as u32))).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn sinks(&self, sinks: usize) -> &[Node] {
        &self.nodes[..sinks.min(self.nodes.len())]
    }

    pub fn senders(&self, sinks: usize) -> &[Node] {
        let start = sinks.min(self.nodes.len());
        let end = (2 * sinks).min(self.nodes.len());
        &self.nodes[start..end]
    }

    pub fn by_address(&self, address: Ipv4Addr) -> Option<&Node> {
        self.nodes.iter().find(|n| n.address == Some(address))
    }
}
