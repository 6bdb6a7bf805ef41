mod builtin;

use manet_lab_abstract::{Node, NodeSet, RoutingCapability, RoutingProtocol, SetupError};
use std::time::Duration;
use tracing::{debug, info};

pub use builtin::{
    AodvHelper, DsdvHelper, DsrHelper, LIST_ROUTING_PRIORITY, ListRouted, OlsrHelper,
    RoutingHelper,
};

/// The routing stack to put on every node. Exactly one variant is ever
/// installed per experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStack {
    Olsr(ListRouted<OlsrHelper>),
    Aodv(ListRouted<AodvHelper>),
    Dsdv(ListRouted<DsdvHelper>),
    /// DSR is not a list-routing entry: the internet stack goes in first,
    /// then DSR is layered beside it.
    Dsr(DsrHelper),
}

impl RoutingStack {
    /// Map a protocol identifier to its installation procedure.
    /// `discovery_delay` only matters for the on-demand protocols.
    pub fn select(protocol: RoutingProtocol, discovery_delay: Duration) -> Self {
        match protocol {
            RoutingProtocol::Olsr => RoutingStack::Olsr(ListRouted::new(OlsrHelper)),
            RoutingProtocol::Aodv => {
                RoutingStack::Aodv(ListRouted::new(AodvHelper { discovery_delay }))
            }
            RoutingProtocol::Dsdv => RoutingStack::Dsdv(ListRouted::new(DsdvHelper)),
            RoutingProtocol::Dsr => RoutingStack::Dsr(DsrHelper { discovery_delay }),
        }
    }

    pub fn protocol(&self) -> RoutingProtocol {
        match self {
            RoutingStack::Olsr(_) => RoutingProtocol::Olsr,
            RoutingStack::Aodv(_) => RoutingProtocol::Aodv,
            RoutingStack::Dsdv(_) => RoutingProtocol::Dsdv,
            RoutingStack::Dsr(_) => RoutingProtocol::Dsr,
        }
    }

    pub fn capability(&self) -> RoutingCapability {
        match self {
            RoutingStack::Olsr(list) => list.capability(),
            RoutingStack::Aodv(list) => list.capability(),
            RoutingStack::Dsdv(list) => list.capability(),
            RoutingStack::Dsr(dsr) => dsr.capability(None),
        }
    }

    /// Install this stack on every node, then check that none was missed.
    ///
    /// Installing the same stack twice is a no-op. Installing a different one
    /// over an existing stack fails.
    pub fn install(&self, nodes: &mut NodeSet) -> Result<(), SetupError> {
        let capability = self.capability();
        for node in nodes.iter() {
            check_existing(node, &capability)?;
        }

        match self {
            RoutingStack::Olsr(_) | RoutingStack::Aodv(_) | RoutingStack::Dsdv(_) => {
                for node in nodes.iter_mut() {
                    install_internet_stack(node);
                    node.routing = Some(capability);
                }
            }
            RoutingStack::Dsr(_) => {
                for node in nodes.iter_mut() {
                    install_internet_stack(node);
                }
                for node in nodes.iter_mut() {
                    node.routing = Some(capability);
                }
            }
        }

        if let Some(node) = nodes.iter().find(|n| !n.can_route()) {
            return Err(SetupError::MissingRoutingCapability(node.id));
        }

        info!(
            "Installed {} on {} nodes ({:?})",
            self.protocol(),
            nodes.len(),
            capability.discovery
        );
        Ok(())
    }
}

fn install_internet_stack(node: &mut Node) {
    node.internet_stack = true;
}

fn check_existing(node: &Node, capability: &RoutingCapability) -> Result<(), SetupError> {
    match &node.routing {
        Some(existing) if existing.protocol != capability.protocol => {
            Err(SetupError::ConflictingRoutingStack {
                node: node.id,
                installed: existing.protocol,
                requested: capability.protocol,
            })
        }
        Some(_) => {
            debug!("Node {} already runs {}", node.id, capability.protocol);
            Ok(())
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_lab_abstract::{NodeId, RouteDiscovery};

    const DELAY: Duration = Duration::from_millis(50);

    #[test]
    fn every_protocol_reaches_every_node() {
        for protocol in RoutingProtocol::ALL {
            let mut nodes = NodeSet::create(6);
            let stack = RoutingStack::select(protocol, DELAY);
            assert_eq!(stack.protocol(), protocol);

            stack.install(&mut nodes).unwrap();

            for node in nodes.iter() {
                assert!(node.can_route());
                assert_eq!(node.routing.map(|r| r.protocol), Some(protocol));
            }
        }
    }

    #[test]
    fn list_protocols_use_priority_100_and_dsr_does_not() {
        for protocol in [RoutingProtocol::Olsr, RoutingProtocol::Aodv, RoutingProtocol::Dsdv] {
            let cap = RoutingStack::select(protocol, DELAY).capability();
            assert_eq!(cap.list_priority, Some(100));
        }
        let dsr = RoutingStack::select(RoutingProtocol::Dsr, DELAY).capability();
        assert_eq!(dsr.list_priority, None);
    }

    #[test]
    fn on_demand_protocols_carry_discovery_delay() {
        let aodv = RoutingStack::select(RoutingProtocol::Aodv, DELAY).capability();
        assert_eq!(
            aodv.discovery,
            RouteDiscovery::OnDemand { setup_delay: DELAY }
        );
        let olsr = RoutingStack::select(RoutingProtocol::Olsr, DELAY).capability();
        assert_eq!(olsr.discovery, RouteDiscovery::Proactive);
    }

    #[test]
    fn reinstalling_the_same_stack_is_idempotent() {
        let mut nodes = NodeSet::create(3);
        let stack = RoutingStack::select(RoutingProtocol::Dsdv, DELAY);
        stack.install(&mut nodes).unwrap();
        stack.install(&mut nodes).unwrap();
        assert!(nodes.iter().all(|n| n.routing == Some(stack.capability())));
    }

    #[test]
    fn installing_a_second_protocol_fails_without_touching_nodes() {
        let mut nodes = NodeSet::create(3);
        RoutingStack::select(RoutingProtocol::Olsr, DELAY)
            .install(&mut nodes)
            .unwrap();

        let err = RoutingStack::select(RoutingProtocol::Aodv, DELAY)
            .install(&mut nodes)
            .unwrap_err();
        assert_eq!(
            err,
            SetupError::ConflictingRoutingStack {
                node: NodeId(0),
                installed: RoutingProtocol::Olsr,
                requested: RoutingProtocol::Aodv,
            }
        );
        assert!(
            nodes
                .iter()
                .all(|n| n.routing.map(|r| r.protocol) == Some(RoutingProtocol::Olsr))
        );
    }
}
