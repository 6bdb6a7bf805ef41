pub mod config;
pub mod error;
pub mod node;
pub mod packet;
pub mod scenario;

pub use config::{
    ChannelConfig, ExperimentConfig, MAX_TOTAL_TIME, MobilityConfig, RoutingProtocol, START_WINDOW,
};
pub use error::{ConfigurationError, SetupError};
pub use node::{
    MacType, Node, NodeId, NodeSet, RouteDiscovery, RoutingCapability, WifiDevice,
    WifiStandard,
};
pub use packet::{Datagram, FiveTuple, Packet};
pub use scenario::ExperimentSettings;
