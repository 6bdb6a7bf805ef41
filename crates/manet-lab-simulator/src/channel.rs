use manet_lab_abstract::{ChannelConfig, Node, NodeId, RouteDiscovery};
use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Sender or destination has no routing capability, or the destination
    /// address belongs to no node.
    NoRoute,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    Deliver { delay: Duration },
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub transmitted: u64,
    /// Reached the destination node.
    pub delivered: u64,
    pub dropped_no_route: u64,
    pub dropped_loss: u64,
    /// Arrived, but nothing was listening on the destination port.
    pub dropped_unbound: u64,
}

/// End-to-end stand-in for the radio, MAC and multi-hop forwarding.
pub struct WirelessChannel {
    config: ChannelConfig,
    rng: StdRng,
    discovered: HashSet<(NodeId, NodeId)>,
    stats: ChannelStats,
}

impl WirelessChannel {
    pub fn new(config: ChannelConfig, rng: StdRng) -> Self {
        Self {
            config,
            rng,
            discovered: HashSet::new(),
            stats: ChannelStats::default(),
        }
    }

    /// Decide the fate of one packet from `from` to `to`.
    pub fn transmit(&mut self, from: &Node, to: Option<&Node>) -> Transmission {
        self.stats.transmitted += 1;

        let (routing, to) = match (from.routing, to) {
            (Some(routing), Some(to)) if from.can_route() && to.can_route() => (routing, to),
            _ => {
                debug!("No route from node {}", from.id);
                self.stats.dropped_no_route += 1;
                return Transmission::Dropped(DropReason::NoRoute);
            }
        };

        // 1. Check Loss
        if self.rng.random::<f64>() < self.config.loss_rate {
            debug!("Packet {} -> {} lost in channel", from.id, to.id);
            self.stats.dropped_loss += 1;
            return Transmission::Dropped(DropReason::Loss);
        }

        // 2. Calculate Latency
        let latency = self
            .rng
            .random_range(self.config.min_latency..=self.config.max_latency);
        let mut delay = Duration::from_millis(latency);

        // 3. First packet of an on-demand pair waits for discovery
        if let RouteDiscovery::OnDemand { setup_delay } = routing.discovery {
            if self.discovered.insert((from.id, to.id)) {
                debug!("Route discovery {} -> {} ({:?})", from.id, to.id, setup_delay);
                delay += setup_delay;
            }
        }

        self.stats.delivered += 1;
        Transmission::Deliver { delay }
    }

    pub fn record_unbound(&mut self) {
        self.stats.dropped_unbound += 1;
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }
}
