use manet_lab_abstract::{RouteDiscovery, RoutingCapability, RoutingProtocol};
use std::time::Duration;

/// Something that can leave a routing capability on a node.
pub trait RoutingHelper {
    fn protocol(&self) -> RoutingProtocol;

    fn discovery(&self) -> RouteDiscovery;

    fn capability(&self, list_priority: Option<i16>) -> RoutingCapability {
        RoutingCapability {
            protocol: self.protocol(),
            discovery: self.discovery(),
            list_priority,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OlsrHelper;

impl RoutingHelper for OlsrHelper {
    fn protocol(&self) -> RoutingProtocol {
        RoutingProtocol::Olsr
    }

    fn discovery(&self) -> RouteDiscovery {
        RouteDiscovery::Proactive
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DsdvHelper;

impl RoutingHelper for DsdvHelper {
    fn protocol(&self) -> RoutingProtocol {
        RoutingProtocol::Dsdv
    }

    fn discovery(&self) -> RouteDiscovery {
        RouteDiscovery::Proactive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AodvHelper {
    pub discovery_delay: Duration,
}

impl RoutingHelper for AodvHelper {
    fn protocol(&self) -> RoutingProtocol {
        RoutingProtocol::Aodv
    }

    fn discovery(&self) -> RouteDiscovery {
        RouteDiscovery::OnDemand {
            setup_delay: self.discovery_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsrHelper {
    pub discovery_delay: Duration,
}

impl RoutingHelper for DsrHelper {
    fn protocol(&self) -> RoutingProtocol {
        RoutingProtocol::Dsr
    }

    fn discovery(&self) -> RouteDiscovery {
        RouteDiscovery::OnDemand {
            setup_delay: self.discovery_delay,
        }
    }
}

/// A helper wrapped for insertion into the IPv4 list-routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRouted<H> {
    pub helper: H,
    pub priority: i16,
}

impl<H: RoutingHelper> ListRouted<H> {
    pub fn new(helper: H) -> Self {
        Self {
            helper,
            priority: LIST_ROUTING_PRIORITY,
        }
    }

    pub fn capability(&self) -> RoutingCapability {
        self.helper.capability(Some(self.priority))
    }
}

pub const LIST_ROUTING_PRIORITY: i16 = 100;
