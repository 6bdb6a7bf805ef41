use manet_lab_abstract::{
    Datagram, ExperimentConfig, ExperimentSettings, NodeSet, Packet, SetupError,
};
use manet_lab_routing::RoutingStack;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::accounting::ReceiveAccountant;
use crate::channel::{Transmission, WirelessChannel};
use crate::endpoint::{EndpointId, EndpointRegistry, Enqueued};
use crate::engine::EventClock;
use crate::error::ExperimentError;
use crate::flowmon::FlowMonitor;
use crate::mobility::{MobilityTrace, RandomWaypoint};
use crate::result_log::ResultLog;
use crate::sampler::ThroughputSampler;
use crate::topology;
use crate::trace::{ExperimentReport, FlowSummary, write_json};
use crate::traffic::{FlowId, OnOffApplication, TrafficPlanBuilder};

// Offsets so each consumer of randomness gets its own stream from one seed.
const CHANNEL_STREAM: u64 = 1;
const MOBILITY_STREAM: u64 = 2;

#[derive(Debug)]
enum ExperimentEvent {
    AppStart(FlowId),
    AppSend(FlowId),
    AppStop(FlowId),
    Arrival(Datagram),
    Deliver(EndpointId),
    SamplerTick,
}

/// One routing-comparison run: build, run for the configured time, finalize.
pub struct Experiment {
    config: ExperimentConfig,
    clock: EventClock<ExperimentEvent>,
    stop_time: Duration,
    nodes: NodeSet,
    routing: RoutingStack,
    mobility: MobilityTrace,
    endpoints: EndpointRegistry,
    accountant: ReceiveAccountant,
    sampler: ThroughputSampler,
    result_log: ResultLog,
    channel: WirelessChannel,
    apps: Vec<OnOffApplication>,
    flow_monitor: Option<FlowMonitor>,
    next_uid: u64,
}

impl Experiment {
    /// Resolve `settings` against the defaults, then build.
    pub fn from_settings(settings: ExperimentSettings) -> Result<Self, ExperimentError> {
        let config = settings.into_config()?;
        Self::build(config)
    }

    /// Everything up to, but not including, starting the clock. Nothing is
    /// scheduled unless every step succeeds.
    pub fn build(config: ExperimentConfig) -> Result<Self, ExperimentError> {
        config.validate()?;
        let stop_time = config.run_length()?;
        let sample_period = config.sample_period()?;
        let send_interval = config.send_interval()?;
        info!(
            "Building {} experiment: {} nodes, {} sinks, {}s",
            config.protocol, config.nodes, config.sinks, config.total_time
        );

        let result_log = ResultLog::create(&config.csv_file_name)?;

        let mut nodes = topology::create_nodes(&config)?;
        topology::install_wifi(&mut nodes, &config);
        let mut mobility_rng = StdRng::seed_from_u64(config.seed.wrapping_add(MOBILITY_STREAM));
        let mobility = RandomWaypoint::new(config.mobility.clone()).install(
            &nodes,
            config.total_time,
            &mut mobility_rng,
        );

        let routing = RoutingStack::select(
            config.protocol,
            Duration::from_millis(config.channel.route_discovery_ms),
        );
        routing.install(&mut nodes)?;
        topology::assign_addresses(&mut nodes, config.address_base)?;

        let mut endpoints = EndpointRegistry::new(config.port);
        for sink in nodes.sinks(config.sinks) {
            let address = sink.address.ok_or(SetupError::NoAddress(sink.id))?;
            endpoints.create_endpoint(address, sink.id)?;
        }

        let mut plan_rng = StdRng::seed_from_u64(config.seed);
        let flows = TrafficPlanBuilder::new(config.traffic_start()?, stop_time).build(
            &nodes,
            config.sinks,
            &endpoints,
            &mut plan_rng,
        )?;

        let mut clock = EventClock::new();
        let apps: Vec<_> = flows
            .into_iter()
            .map(|flow| {
                debug!(
                    "Flow {:?}: {} -> {} from {:?} to {:?}",
                    flow.id, flow.source, flow.remote, flow.start, flow.stop
                );
                clock.schedule_at(flow.start, ExperimentEvent::AppStart(flow.id));
                clock.schedule_at(flow.stop, ExperimentEvent::AppStop(flow.id));
                OnOffApplication::new(flow, config.packet_size, send_interval)
            })
            .collect();

        let flow_monitor = config.flow_monitor.then(FlowMonitor::new);

        let sampler = ThroughputSampler::new(
            sample_period,
            config.sinks,
            config.protocol,
            config.tx_power,
        );
        clock.schedule_at(sampler.first_wake(), ExperimentEvent::SamplerTick);

        let channel = WirelessChannel::new(
            config.channel.clone(),
            StdRng::seed_from_u64(config.seed.wrapping_add(CHANNEL_STREAM)),
        );

        info!(
            "Built {} endpoints and {} flows",
            endpoints.len(),
            apps.len()
        );

        Ok(Self {
            config,
            clock,
            stop_time,
            nodes,
            routing,
            mobility,
            endpoints,
            accountant: ReceiveAccountant::new(),
            sampler,
            result_log,
            channel,
            apps,
            flow_monitor,
            next_uid: 0,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn routing(&self) -> &RoutingStack {
        &self.routing
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    pub fn apps(&self) -> &[OnOffApplication] {
        &self.apps
    }

    pub fn accountant(&self) -> &ReceiveAccountant {
        &self.accountant
    }

    pub fn result_log(&self) -> &ResultLog {
        &self.result_log
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn stop_time(&self) -> Duration {
        self.stop_time
    }

    /// Run every event due at or before `until`, capped at the stop time.
    pub fn advance_to(&mut self, until: Duration) -> Result<(), ExperimentError> {
        let until = until.min(self.stop_time);
        while let Some(event) = self.clock.next_until(until) {
            self.dispatch(event)?;
        }
        Ok(())
    }

    pub fn run(mut self) -> Result<ExperimentReport, ExperimentError> {
        info!("Starting simulation loop...");
        self.advance_to(self.stop_time)?;
        info!("Simulation complete.");
        self.finalize()
    }

    /// Write optional artifacts, then tear down: pending events are dropped
    /// unexecuted and endpoints close.
    pub fn finalize(mut self) -> Result<ExperimentReport, ExperimentError> {
        let flow_monitor_file = match &self.flow_monitor {
            Some(monitor) => {
                monitor.snapshot().write_to(&self.config.flowmon_file)?;
                info!(
                    "Flow monitor snapshot ({} flows) written to {}",
                    monitor.flow_count(),
                    self.config.flowmon_file.display()
                );
                Some(self.config.flowmon_file.clone())
            }
            None => None,
        };

        let mobility_trace_file = if self.config.trace_mobility {
            write_json(&self.config.mobility_trace_file, &self.mobility)?;
            info!(
                "Mobility trace written to {}",
                self.config.mobility_trace_file.display()
            );
            Some(self.config.mobility_trace_file.clone())
        } else {
            None
        };

        let events_discarded = self.clock.destroy();
        let closed = self.endpoints.close_all();
        info!(
            "Discarded {} pending events, closed {} endpoints",
            events_discarded, closed
        );

        Ok(ExperimentReport {
            duration: self.clock.now().as_secs_f64(),
            rows_written: self.result_log.rows(),
            total_bytes_received: self.accountant.total_bytes(),
            total_packets_received: self.accountant.total_packets(),
            endpoints: self.endpoints.len(),
            flows: self
                .apps
                .iter()
                .map(|app| FlowSummary {
                    sender: app.flow.sender,
                    source: app.flow.source,
                    remote: app.flow.remote,
                    start: app.flow.start.as_secs_f64(),
                    stop: app.flow.stop.as_secs_f64(),
                    packets_sent: app.packets_sent(),
                })
                .collect(),
            events_executed: self.clock.executed(),
            events_discarded,
            channel: self.channel.stats(),
            flow_monitor_file,
            mobility_trace_file,
            config: self.config,
        })
    }

    fn dispatch(&mut self, event: ExperimentEvent) -> Result<(), ExperimentError> {
        let now = self.clock.now();
        match event {
            ExperimentEvent::AppStart(id) => {
                let app = &mut self.apps[id.0];
                app.start();
                self.clock
                    .schedule(app.interval(), ExperimentEvent::AppSend(id));
            }
            ExperimentEvent::AppSend(id) => self.send(id, now),
            ExperimentEvent::AppStop(id) => self.apps[id.0].stop(),
            ExperimentEvent::Arrival(datagram) => self.arrive(datagram, now),
            ExperimentEvent::Deliver(endpoint) => {
                if let Some(endpoint) = self.endpoints.get_mut(endpoint) {
                    self.accountant.on_deliver(endpoint, now);
                }
            }
            ExperimentEvent::SamplerTick => {
                let tick = self.sampler.tick(now, self.accountant.window_mut());
                self.result_log.append(&tick.sample)?;
                self.clock
                    .schedule_at(tick.next_wake, ExperimentEvent::SamplerTick);
            }
        }
        Ok(())
    }

    fn send(&mut self, id: FlowId, now: Duration) {
        let app = &mut self.apps[id.0];
        if !app.should_send(now) {
            return;
        }

        let datagram = Datagram {
            from: app.flow.source,
            to: app.flow.remote,
            packet: Packet::zeroed(self.next_uid, app.packet_size(), now),
        };
        self.next_uid += 1;
        app.record_sent();
        let sender = app.flow.sender;
        self.clock
            .schedule(app.interval(), ExperimentEvent::AppSend(id));

        if let Some(monitor) = &mut self.flow_monitor {
            monitor.record_tx(&datagram, now);
        }

        let Some(from) = self.nodes.get(sender) else {
            warn!("Flow {:?} sends from unknown node {}", id, sender);
            return;
        };
        let to = self.nodes.by_address(*datagram.to.ip());
        match self.channel.transmit(from, to) {
            Transmission::Deliver { delay } => {
                self.clock
                    .schedule(delay, ExperimentEvent::Arrival(datagram));
            }
            Transmission::Dropped(reason) => {
                debug!("Packet {} dropped: {:?}", datagram.packet.uid, reason);
            }
        }
    }

    fn arrive(&mut self, datagram: Datagram, now: Duration) {
        let Some(endpoint) = self.endpoints.lookup(datagram.to) else {
            debug!("No endpoint bound to {}, dropping", datagram.to);
            self.channel.record_unbound();
            return;
        };

        if let Some(monitor) = &mut self.flow_monitor {
            monitor.record_rx(&datagram, now);
        }

        match self.endpoints.enqueue(endpoint, datagram) {
            Enqueued::Notify => {
                self.clock
                    .schedule(Duration::ZERO, ExperimentEvent::Deliver(endpoint));
            }
            Enqueued::Buffered => {}
            Enqueued::Closed => warn!("Arrival for closed endpoint {:?}", endpoint),
        }
    }
}
