use manet_lab_abstract::{Datagram, NodeId, SetupError};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EndpointId(pub usize);

/// A bound UDP receive socket on one sink node.
#[derive(Debug)]
pub struct Endpoint {
    id: EndpointId,
    node: NodeId,
    local: SocketAddrV4,
    rx_queue: VecDeque<Datagram>,
    open: bool,
    notify_pending: bool,
}

/// Outcome of buffering an inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The queue was idle: a delivery notification must be scheduled.
    Notify,
    /// A notification is already pending and will drain this datagram too.
    Buffered,
    Closed,
}

impl Endpoint {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn local(&self) -> SocketAddrV4 {
        self.local
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn buffered(&self) -> usize {
        self.rx_queue.len()
    }

    /// Take the oldest buffered datagram, if any. Draining the queue
    /// re-enables notification for the next arrival.
    pub fn recv_from(&mut self) -> Option<Datagram> {
        let datagram = self.rx_queue.pop_front();
        if self.rx_queue.is_empty() {
            self.notify_pending = false;
        }
        datagram
    }
}

/// Owns every receive endpoint for the run. Deliveries to any of them end up
/// in the [`ReceiveAccountant`](crate::accounting::ReceiveAccountant).
#[derive(Debug)]
pub struct EndpointRegistry {
    port: u16,
    endpoints: Vec<Endpoint>,
    bindings: HashMap<SocketAddrV4, EndpointId>,
}

impl EndpointRegistry {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            endpoints: Vec::new(),
            bindings: HashMap::new(),
        }
    }

    /// Bind a fresh endpoint to `address` on `node` at the registry port.
    pub fn create_endpoint(
        &mut self,
        address: Ipv4Addr,
        node: NodeId,
    ) -> Result<EndpointId, SetupError> {
        let local = SocketAddrV4::new(address, self.port);
        if let Some(existing) = self.bindings.get(&local) {
            let owner = self.endpoints[existing.0].node;
            return Err(SetupError::DuplicateBinding {
                node: owner,
                address: local,
            });
        }

        let id = EndpointId(self.endpoints.len());
        self.endpoints.push(Endpoint {
            id,
            node,
            local,
            rx_queue: VecDeque::new(),
            open: true,
            notify_pending: false,
        });
        self.bindings.insert(local, id);
        debug!("Endpoint {:?} bound to {} on node {}", id, local, node);
        Ok(id)
    }

    /// Endpoint listening on `to`, if one is bound.
    pub fn lookup(&self, to: SocketAddrV4) -> Option<EndpointId> {
        self.bindings.get(&to).copied()
    }

    pub fn get(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(id.0)
    }

    pub fn get_mut(&mut self, id: EndpointId) -> Option<&mut Endpoint> {
        self.endpoints.get_mut(id.0)
    }

    pub fn enqueue(&mut self, id: EndpointId, datagram: Datagram) -> Enqueued {
        match self.endpoints.get_mut(id.0) {
            Some(endpoint) if endpoint.open => {
                endpoint.rx_queue.push_back(datagram);
                if endpoint.notify_pending {
                    Enqueued::Buffered
                } else {
                    endpoint.notify_pending = true;
                    Enqueued::Notify
                }
            }
            _ => Enqueued::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter()
    }

    /// Close every endpoint and drop whatever is still buffered.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for endpoint in self.endpoints.iter_mut().filter(|e| e.open) {
            endpoint.open = false;
            endpoint.rx_queue.clear();
            endpoint.notify_pending = false;
            closed += 1;
        }
        closed
    }
}
