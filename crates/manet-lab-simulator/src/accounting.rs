use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;

/// Receive totals since the last throughput sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccountingWindow {
    pub bytes: u64,
    pub packets: u64,
}

impl AccountingWindow {
    pub fn record(&mut self, size: usize) {
        self.bytes += size as u64;
        self.packets += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0 && self.packets == 0
    }
}

/// Drains endpoints into the shared accounting window.
///
/// Only ever called from clock callbacks, so the window has a single writer
/// at any moment and the sampler's reset can never interleave with a write.
#[derive(Debug, Default)]
pub struct ReceiveAccountant {
    window: AccountingWindow,
    total_bytes: u64,
    total_packets: u64,
}

impl ReceiveAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume everything buffered on `endpoint`. Returns the number of
    /// packets drained.
    pub fn on_deliver(&mut self, endpoint: &mut Endpoint, now: Duration) -> usize {
        if !endpoint.is_open() {
            warn!(
                "Delivery on closed endpoint {:?} (node {}) at {:?}",
                endpoint.id(),
                endpoint.node(),
                now
            );
            return 0;
        }

        let mut drained = 0;
        while let Some(datagram) = endpoint.recv_from() {
            let size = datagram.packet.size();
            self.window.record(size);
            self.total_bytes += size as u64;
            self.total_packets += 1;
            drained += 1;
            debug!(
                "{} {} received one packet from {}",
                now.as_secs_f64(),
                endpoint.node(),
                datagram.from.ip()
            );
        }
        drained
    }

    pub fn window(&self) -> &AccountingWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut AccountingWindow {
        &mut self.window
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn total_packets(&self) -> u64 {
        self.total_packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::EndpointRegistry;
    use manet_lab_abstract::{Datagram, NodeId, Packet};
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn registry_with_endpoint() -> (EndpointRegistry, crate::endpoint::EndpointId) {
        let mut registry = EndpointRegistry::new(9);
        let id = registry
            .create_endpoint(Ipv4Addr::new(10, 1, 1, 1), NodeId(0))
            .unwrap();
        (registry, id)
    }

    fn push(registry: &mut EndpointRegistry, id: crate::endpoint::EndpointId, size: usize) {
        let to = registry.get(id).unwrap().local();
        registry.enqueue(
            id,
            Datagram {
                from: SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 20), 49153),
                to,
                packet: Packet::zeroed(0, size, Duration::ZERO),
            },
        );
    }

    #[test]
    fn one_delivery_drains_every_buffered_packet() {
        let (mut registry, id) = registry_with_endpoint();
        push(&mut registry, id, 64);
        push(&mut registry, id, 64);
        push(&mut registry, id, 100);

        let mut accountant = ReceiveAccountant::new();
        let drained = accountant.on_deliver(registry.get_mut(id).unwrap(), Duration::ZERO);

        assert_eq!(drained, 3);
        assert_eq!(
            *accountant.window(),
            AccountingWindow {
                bytes: 228,
                packets: 3
            }
        );
        assert_eq!(registry.get(id).unwrap().buffered(), 0);
    }

    #[test]
    fn window_grows_monotonically_between_resets() {
        let (mut registry, id) = registry_with_endpoint();
        let mut accountant = ReceiveAccountant::new();
        let mut last = *accountant.window();

        for size in [64, 1, 500, 64] {
            push(&mut registry, id, size);
            accountant.on_deliver(registry.get_mut(id).unwrap(), Duration::ZERO);
            let now = *accountant.window();
            assert!(now.bytes >= last.bytes && now.packets >= last.packets);
            last = now;
        }
        assert_eq!(accountant.total_packets(), 4);
        assert_eq!(accountant.total_bytes(), 629);
    }

    #[test]
    fn empty_endpoint_leaves_window_untouched() {
        let (mut registry, id) = registry_with_endpoint();
        let mut accountant = ReceiveAccountant::new();
        assert_eq!(
            accountant.on_deliver(registry.get_mut(id).unwrap(), Duration::ZERO),
            0
        );
        assert!(accountant.window().is_empty());
    }

    #[test]
    fn closed_endpoint_is_not_counted() {
        let (mut registry, id) = registry_with_endpoint();
        push(&mut registry, id, 64);
        registry.close_all();

        let mut accountant = ReceiveAccountant::new();
        assert_eq!(
            accountant.on_deliver(registry.get_mut(id).unwrap(), Duration::ZERO),
            0
        );
        assert!(accountant.window().is_empty());
    }
}
