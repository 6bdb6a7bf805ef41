use manet_lab_abstract::{NodeId, NodeSet, START_WINDOW, SetupError};
use rand::Rng;
use serde::Serialize;
use std::net::SocketAddrV4;
use std::time::Duration;

use crate::endpoint::EndpointRegistry;

/// Source port every sender's socket ends up on.
pub const EPHEMERAL_PORT: u16 = 49153;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FlowId(pub usize);

/// One sender streaming to one sink endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficFlow {
    pub id: FlowId,
    pub sender: NodeId,
    pub source: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub start: Duration,
    pub stop: Duration,
}

/// Pairs sender `i` with sink endpoint `i` and jitters each start time
/// independently inside `[start, start + START_WINDOW)`.
#[derive(Debug, Clone)]
pub struct TrafficPlanBuilder {
    start: Duration,
    stop: Duration,
}

impl TrafficPlanBuilder {
    pub fn new(start: Duration, stop: Duration) -> Self {
        Self { start, stop }
    }

    /// Whole nanoseconds, so a draw can never land on the window's end.
    fn draw_start<R: Rng>(&self, rng: &mut R) -> Duration {
        let window = u64::try_from(START_WINDOW.as_nanos()).unwrap_or(u64::MAX);
        self.start
            .saturating_add(Duration::from_nanos(rng.random_range(0..window)))
    }

    pub fn build<R: Rng>(
        &self,
        nodes: &NodeSet,
        sinks: usize,
        endpoints: &EndpointRegistry,
        rng: &mut R,
    ) -> Result<Vec<TrafficFlow>, SetupError> {
        nodes
            .senders(sinks)
            .iter()
            .zip(endpoints.iter())
            .enumerate()
            .map(|(i, (sender, endpoint))| -> Result<TrafficFlow, SetupError> {
                let address = sender.address.ok_or(SetupError::NoAddress(sender.id))?;
                Ok(TrafficFlow {
                    id: FlowId(i),
                    sender: sender.id,
                    source: SocketAddrV4::new(address, EPHEMERAL_PORT),
                    remote: endpoint.local(),
                    start: self.draw_start(rng),
                    stop: self.stop,
                })
            })
            .collect()
    }
}

/// Constant-bit-rate source that is always "on" between start and stop.
#[derive(Debug, Clone)]
pub struct OnOffApplication {
    pub flow: TrafficFlow,
    packet_size: usize,
    interval: Duration,
    running: bool,
    packets_sent: u64,
}

impl OnOffApplication {
    /// `interval` comes from [`ExperimentConfig::send_interval`], which
    /// never yields zero.
    ///
    /// [`ExperimentConfig::send_interval`]: manet_lab_abstract::ExperimentConfig::send_interval
    pub fn new(flow: TrafficFlow, packet_size: usize, interval: Duration) -> Self {
        Self {
            flow,
            packet_size,
            interval,
            running: false,
            packets_sent: 0,
        }
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    /// Gap between consecutive packets.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether a send due at `now` should go out.
    pub fn should_send(&self, now: Duration) -> bool {
        self.running && now < self.flow.stop
    }

    pub fn record_sent(&mut self) {
        self.packets_sent += 1;
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::assign_addresses;
    use manet_lab_abstract::ExperimentConfig;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::net::Ipv4Addr;

    fn setup(nodes: usize, sinks: usize) -> (NodeSet, EndpointRegistry) {
        let mut set = NodeSet::create(nodes);
        assign_addresses(&mut set, Ipv4Addr::new(10, 1, 1, 0)).unwrap();
        let mut registry = EndpointRegistry::new(9);
        for sink in set.sinks(sinks) {
            registry
                .create_endpoint(sink.address.unwrap(), sink.id)
                .unwrap();
        }
        (set, registry)
    }

    #[test]
    fn sender_i_targets_sink_i() {
        let (nodes, registry) = setup(12, 5);
        let mut rng = StdRng::seed_from_u64(0);
        let flows = TrafficPlanBuilder::new(Duration::from_secs(100), Duration::from_secs(200))
            .build(&nodes, 5, &registry, &mut rng)
            .unwrap();

        assert_eq!(flows.len(), 5);
        for (i, flow) in flows.iter().enumerate() {
            assert_eq!(flow.sender, NodeId((5 + i) as u32));
            assert_eq!(
                flow.remote,
                SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, i as u8 + 1), 9)
            );
            assert_eq!(flow.source.port(), EPHEMERAL_PORT);
        }
    }

    #[test]
    fn start_times_stay_in_window_and_stop_is_shared() {
        let (nodes, registry) = setup(50, 10);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let flows = TrafficPlanBuilder::new(Duration::from_secs(100), Duration::from_secs(200))
                .build(&nodes, 10, &registry, &mut rng)
                .unwrap();
            for flow in &flows {
                assert!(flow.start >= Duration::from_secs(100));
                assert!(flow.start < Duration::from_secs(101));
                assert_eq!(flow.stop, Duration::from_secs(200));
            }
        }
    }

    #[test]
    fn starts_are_drawn_independently() {
        let (nodes, registry) = setup(50, 10);
        let mut rng = StdRng::seed_from_u64(11);
        let flows = TrafficPlanBuilder::new(Duration::from_secs(100), Duration::from_secs(200))
            .build(&nodes, 10, &registry, &mut rng)
            .unwrap();
        let first = flows[0].start;
        assert!(flows.iter().any(|f| f.start != first));
    }

    #[test]
    fn unnumbered_sender_is_a_setup_error() {
        let nodes = NodeSet::create(4);
        let mut registry = EndpointRegistry::new(9);
        registry
            .create_endpoint(Ipv4Addr::new(10, 1, 1, 1), NodeId(0))
            .unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let err = TrafficPlanBuilder::new(Duration::from_secs(1), Duration::from_secs(2))
            .build(&nodes, 1, &registry, &mut rng)
            .unwrap_err();
        assert_eq!(err, SetupError::NoAddress(NodeId(1)));
    }

    #[test]
    fn on_off_interval_matches_rate() {
        let (nodes, registry) = setup(2, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let flow = TrafficPlanBuilder::new(Duration::from_secs(1), Duration::from_secs(5))
            .build(&nodes, 1, &registry, &mut rng)
            .unwrap()
            .remove(0);
        let config = ExperimentConfig::default();
        let mut app = OnOffApplication::new(flow, 64, config.send_interval().unwrap());
        assert_eq!(app.interval(), Duration::from_millis(250));

        assert!(!app.should_send(Duration::from_secs(2)));
        app.start();
        assert!(app.should_send(Duration::from_secs(2)));
        assert!(!app.should_send(Duration::from_secs(5)));
        app.stop();
        assert!(!app.should_send(Duration::from_secs(3)));
    }
}
