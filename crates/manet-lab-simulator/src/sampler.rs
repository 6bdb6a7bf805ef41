use manet_lab_abstract::RoutingProtocol;
use serde::Serialize;
use std::time::Duration;

use crate::accounting::AccountingWindow;

/// One row of the result log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputSample {
    /// Simulated seconds at which the sample was taken.
    pub time: f64,
    pub kbps: f64,
    pub packets: u64,
    pub sinks: usize,
    pub protocol: RoutingProtocol,
    pub tx_power: f64,
}

/// What one tick produces: the record to append and when to wake again.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub sample: ThroughputSample,
    pub next_wake: Duration,
}

/// Periodic throughput sampler.
///
/// Armed at time zero, first fires one interval later, and re-arms on every
/// tick without ever checking for an end time: it stops only because the
/// clock stops running events.
#[derive(Debug, Clone)]
pub struct ThroughputSampler {
    interval: Duration,
    sinks: usize,
    protocol: RoutingProtocol,
    tx_power: f64,
    ticks: u64,
}

impl ThroughputSampler {
    pub fn new(interval: Duration, sinks: usize, protocol: RoutingProtocol, tx_power: f64) -> Self {
        Self {
            interval,
            sinks,
            protocol,
            tx_power,
            ticks: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wake time when armed at zero.
    pub fn first_wake(&self) -> Duration {
        self.interval
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Turn the window into a sample and reset it.
    pub fn tick(&mut self, now: Duration, window: &mut AccountingWindow) -> Tick {
        let bytes = std::mem::take(&mut window.bytes);
        let kbps = (bytes as f64 * 8.0) / 1000.0;
        let packets = std::mem::take(&mut window.packets);
        self.ticks += 1;

        Tick {
            sample: ThroughputSample {
                time: now.as_secs_f64(),
                kbps,
                packets,
                sinks: self.sinks,
                protocol: self.protocol,
                tx_power: self.tx_power,
            },
            next_wake: now + self.interval,
        }
    }
}
