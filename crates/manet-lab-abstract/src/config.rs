use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

/// The closed set of routing stacks an experiment can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoutingProtocol {
    Olsr,
    Aodv,
    Dsdv,
    Dsr,
}

impl RoutingProtocol {
    pub const ALL: [RoutingProtocol; 4] = [
        RoutingProtocol::Olsr,
        RoutingProtocol::Aodv,
        RoutingProtocol::Dsdv,
        RoutingProtocol::Dsr,
    ];

    /// Name as it appears in the `RoutingProtocol` column of the result log.
    pub fn name(&self) -> &'static str {
        match self {
            RoutingProtocol::Olsr => "OLSR",
            RoutingProtocol::Aodv => "AODV",
            RoutingProtocol::Dsdv => "DSDV",
            RoutingProtocol::Dsr => "DSR",
        }
    }
}

impl fmt::Display for RoutingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoutingProtocol {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoutingProtocol::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| ConfigurationError::UnknownProtocol(s.to_string()))
    }
}

/// Width of the window flow start times are drawn from.
pub const START_WINDOW: Duration = Duration::from_secs(1);

/// Longest run the harness accepts, one simulated day. Mobility is generated
/// up front for the whole run.
pub const MAX_TOTAL_TIME: f64 = 86_400.0;

/// Seconds as a `Duration`, or `None` when negative, non-finite or too large.
fn seconds(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value).ok()
}

/// Opaque PHY/MAC stand-in: every hop is lossy with a bounded latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub loss_rate: f64,
    /// Milliseconds.
    pub min_latency: u64,
    /// Milliseconds.
    pub max_latency: u64,
    /// Extra delay paid once per source/destination pair by on-demand protocols.
    pub route_discovery_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            min_latency: 2,
            max_latency: 20,
            route_discovery_ms: 50,
        }
    }
}

/// Random-waypoint parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilityConfig {
    pub area_width: f64,
    pub area_height: f64,
    pub max_speed: f64,
    pub pause: f64,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            area_width: 300.0,
            area_height: 1500.0,
            max_speed: 20.0,
            pause: 0.0,
        }
    }
}

/// Everything a run needs. Built once from defaults, an optional file and the
/// command line, then never mutated.
///
/// All times are in simulated seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub csv_file_name: PathBuf,
    pub nodes: usize,
    pub sinks: usize,
    pub protocol: RoutingProtocol,
    /// dBm, applied as both start and end transmit power.
    pub tx_power: f64,
    pub trace_mobility: bool,
    pub flow_monitor: bool,

    pub total_time: f64,
    pub sample_interval: f64,
    /// Flows start uniformly in `[start_time, start_time + 1)`.
    pub start_time: f64,

    pub port: u16,
    pub packet_size: usize,
    pub data_rate_bps: u64,
    pub phy_mode: String,
    pub address_base: Ipv4Addr,
    pub seed: u64,

    pub flowmon_file: PathBuf,
    pub mobility_trace_file: PathBuf,

    pub channel: ChannelConfig,
    pub mobility: MobilityConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            csv_file_name: PathBuf::from("manet-routing.output.DSDV.csv"),
            nodes: 50,
            sinks: 10,
            protocol: RoutingProtocol::Dsdv,
            tx_power: 7.5,
            trace_mobility: true,
            flow_monitor: true,
            total_time: 200.0,
            sample_interval: 1.0,
            start_time: 100.0,
            port: 9,
            packet_size: 64,
            data_rate_bps: 2048,
            phy_mode: "DsssRate11Mbps".to_string(),
            address_base: Ipv4Addr::new(10, 1, 1, 0),
            seed: 0,
            flowmon_file: PathBuf::from("manet-routing-compare.flowmon"),
            mobility_trace_file: PathBuf::from("manet-routing-compare.mobility.json"),
            channel: ChannelConfig::default(),
            mobility: MobilityConfig::default(),
        }
    }
}

impl ExperimentConfig {
    /// Simulated time at which the clock stops.
    pub fn run_length(&self) -> Result<Duration, ConfigurationError> {
        match seconds(self.total_time) {
            Some(t) if self.total_time <= MAX_TOTAL_TIME => Ok(t),
            _ => Err(ConfigurationError::invalid(
                "total_time",
                format!(
                    "must lie in [0, {MAX_TOTAL_TIME}] seconds, got {}",
                    self.total_time
                ),
            )),
        }
    }

    /// Gap between throughput samples; never zero.
    pub fn sample_period(&self) -> Result<Duration, ConfigurationError> {
        match seconds(self.sample_interval) {
            Some(period) if !period.is_zero() => Ok(period),
            _ => Err(ConfigurationError::invalid(
                "sample_interval",
                format!(
                    "must be at least one nanosecond, got {}",
                    self.sample_interval
                ),
            )),
        }
    }

    /// Earliest flow start. The whole start window must be representable.
    pub fn traffic_start(&self) -> Result<Duration, ConfigurationError> {
        seconds(self.start_time)
            .filter(|start| start.checked_add(START_WINDOW).is_some())
            .ok_or_else(|| {
                ConfigurationError::invalid(
                    "start_time",
                    format!("must be a non-negative number of seconds, got {}", self.start_time),
                )
            })
    }

    /// Gap between two packets of one flow at `data_rate_bps`; never zero.
    pub fn send_interval(&self) -> Result<Duration, ConfigurationError> {
        if self.data_rate_bps == 0 {
            return Err(ConfigurationError::invalid("data_rate_bps", "must be non-zero"));
        }
        let bits = u64::try_from(self.packet_size)
            .ok()
            .and_then(|bytes| bytes.checked_mul(8))
            .filter(|bits| *bits > 0)
            .ok_or_else(|| {
                ConfigurationError::invalid(
                    "packet_size",
                    format!("must be non-zero and fit in 64 bits, got {}", self.packet_size),
                )
            })?;
        match seconds(bits as f64 / self.data_rate_bps as f64) {
            Some(gap) if !gap.is_zero() => Ok(gap),
            _ => Err(ConfigurationError::invalid(
                "data_rate_bps",
                format!(
                    "{} bit/s gives no usable gap between {}-byte packets",
                    self.data_rate_bps, self.packet_size
                ),
            )),
        }
    }

    /// Reject numeric settings the harness cannot run with. Topology-size
    /// checks belong to the build phase and are not done here.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.sample_period()?;
        self.run_length()?;
        self.traffic_start()?;
        self.send_interval()?;
        if !self.tx_power.is_finite() {
            return Err(ConfigurationError::invalid("tx_power", "must be finite"));
        }
        if !(0.0..=1.0).contains(&self.channel.loss_rate) {
            return Err(ConfigurationError::invalid(
                "channel.loss_rate",
                format!("must lie in [0, 1], got {}", self.channel.loss_rate),
            ));
        }
        if self.channel.min_latency > self.channel.max_latency {
            return Err(ConfigurationError::invalid(
                "channel.min_latency",
                format!(
                    "{} exceeds max_latency {}",
                    self.channel.min_latency, self.channel.max_latency
                ),
            ));
        }
        let m = &self.mobility;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !(positive(m.area_width) && positive(m.area_height)) {
            return Err(ConfigurationError::invalid(
                "mobility.area",
                format!(
                    "width and height must be positive and finite, got {} x {}",
                    m.area_width, m.area_height
                ),
            ));
        }
        if !m.max_speed.is_finite() || m.max_speed < 0.0 || !m.pause.is_finite() || m.pause < 0.0
        {
            return Err(ConfigurationError::invalid(
                "mobility",
                "speed and pause must be non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_names_round_trip() {
        for protocol in RoutingProtocol::ALL {
            assert_eq!(protocol.name().parse::<RoutingProtocol>(), Ok(protocol));
        }
    }

    #[test]
    fn unknown_protocol_names_the_value() {
        let err = "BOGUS".parse::<RoutingProtocol>().unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownProtocol("BOGUS".into()));
        assert_eq!(err.to_string(), "No such protocol: BOGUS");
    }

    #[test]
    fn protocol_parsing_is_case_sensitive() {
        assert!("aodv".parse::<RoutingProtocol>().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ExperimentConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ExperimentConfig {
            sample_interval: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidArgument {
                name: "sample_interval",
                ..
            })
        ));
    }

    #[test]
    fn inverted_latency_range_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.channel.min_latency = 30;
        config.channel.max_latency = 10;
        assert!(config.validate().is_err());
    }

    fn rejected_as(config: ExperimentConfig, field: &str) {
        match config.validate() {
            Err(ConfigurationError::InvalidArgument { name, .. }) => assert_eq!(name, field),
            other => panic!("expected {field} to be rejected, got {other:?}"),
        }
    }

    #[test]
    fn sub_nanosecond_interval_is_rejected() {
        rejected_as(
            ExperimentConfig {
                sample_interval: 1e-12,
                ..Default::default()
            },
            "sample_interval",
        );
    }

    #[test]
    fn one_nanosecond_interval_is_accepted() {
        let config = ExperimentConfig {
            sample_interval: 1e-9,
            ..Default::default()
        };
        assert_eq!(config.sample_period(), Ok(Duration::from_nanos(1)));
    }

    #[test]
    fn rate_too_high_for_a_nonzero_send_gap_is_rejected() {
        rejected_as(
            ExperimentConfig {
                data_rate_bps: 10_000_000_000_000,
                ..Default::default()
            },
            "data_rate_bps",
        );
    }

    #[test]
    fn oversized_packets_are_rejected_instead_of_overflowing() {
        rejected_as(
            ExperimentConfig {
                packet_size: usize::MAX,
                ..Default::default()
            },
            "packet_size",
        );
    }

    #[test]
    fn default_send_gap_is_a_quarter_second() {
        assert_eq!(
            ExperimentConfig::default().send_interval(),
            Ok(Duration::from_millis(250))
        );
    }

    #[test]
    fn times_beyond_duration_range_are_rejected() {
        rejected_as(
            ExperimentConfig {
                total_time: 1e20,
                ..Default::default()
            },
            "total_time",
        );
        rejected_as(
            ExperimentConfig {
                start_time: 1e20,
                ..Default::default()
            },
            "start_time",
        );
        rejected_as(
            ExperimentConfig {
                start_time: f64::INFINITY,
                ..Default::default()
            },
            "start_time",
        );
    }

    #[test]
    fn run_length_is_capped_at_one_day() {
        rejected_as(
            ExperimentConfig {
                total_time: MAX_TOTAL_TIME + 1.0,
                ..Default::default()
            },
            "total_time",
        );
        let config = ExperimentConfig {
            total_time: MAX_TOTAL_TIME,
            ..Default::default()
        };
        assert_eq!(config.run_length(), Ok(Duration::from_secs(86_400)));
    }

    #[test]
    fn infinite_mobility_area_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.mobility.area_width = f64::INFINITY;
        rejected_as(config, "mobility.area");

        let mut config = ExperimentConfig::default();
        config.mobility.area_height = f64::NAN;
        rejected_as(config, "mobility.area");
    }
}
