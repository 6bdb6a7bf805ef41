use bytes::Bytes;
use serde::Serialize;
use std::net::SocketAddrV4;
use std::time::Duration;

/// Application payload as it travels through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub uid: u64,
    pub payload: Bytes,
    /// Simulated time the sender handed the packet to the network.
    pub sent_at: Duration,
}

impl Packet {
    pub fn new(uid: u64, payload: Bytes, sent_at: Duration) -> Self {
        Self {
            uid,
            payload,
            sent_at,
        }
    }

    /// A packet of `size` zero bytes, like the on/off generator produces.
    pub fn zeroed(uid: u64, size: usize, sent_at: Duration) -> Self {
        Self::new(uid, Bytes::from(vec![0u8; size]), sent_at)
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// A UDP datagram: packet plus the addressing the flow classifier keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub from: SocketAddrV4,
    pub to: SocketAddrV4,
    pub packet: Packet,
}

/// Five-tuple identifying a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FiveTuple {
    pub source: SocketAddrV4,
    pub destination: SocketAddrV4,
    pub protocol: u8,
}

impl FiveTuple {
    pub const UDP: u8 = 17;
}

impl Datagram {
    pub fn five_tuple(&self) -> FiveTuple {
        FiveTuple {
            source: self.from,
            destination: self.to,
            protocol: FiveTuple::UDP,
        }
    }
}
