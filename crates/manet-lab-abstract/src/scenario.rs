use serde::Deserialize;
use std::path::PathBuf;

use crate::config::{ExperimentConfig, RoutingProtocol};
use crate::error::ConfigurationError;

/// A partial configuration, as read from a TOML file or collected from the
/// command line. Unset fields keep whatever the base config holds.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ExperimentSettings {
    pub csv_file_name: Option<PathBuf>,
    pub nodes: Option<usize>,
    pub sinks: Option<usize>,
    /// Kept as text so an unknown value is reported as a configuration error
    /// naming it, not as a parse failure of the whole file.
    pub protocol: Option<String>,
    pub tx_power: Option<f64>,
    pub trace_mobility: Option<bool>,
    pub flow_monitor: Option<bool>,
    pub total_time: Option<f64>,
    pub sample_interval: Option<f64>,
    pub start_time: Option<f64>,
    pub packet_size: Option<usize>,
    pub data_rate_bps: Option<u64>,
    pub seed: Option<u64>,
    pub flowmon_file: Option<PathBuf>,
    pub mobility_trace_file: Option<PathBuf>,
    #[serde(default)]
    pub channel: ChannelSettings,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ChannelSettings {
    pub loss_rate: Option<f64>,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
    pub route_discovery_ms: Option<u64>,
}

impl ExperimentSettings {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: ExperimentSettings) -> ExperimentSettings {
        ExperimentSettings {
            csv_file_name: other.csv_file_name.or(self.csv_file_name),
            nodes: other.nodes.or(self.nodes),
            sinks: other.sinks.or(self.sinks),
            protocol: other.protocol.or(self.protocol),
            tx_power: other.tx_power.or(self.tx_power),
            trace_mobility: other.trace_mobility.or(self.trace_mobility),
            flow_monitor: other.flow_monitor.or(self.flow_monitor),
            total_time: other.total_time.or(self.total_time),
            sample_interval: other.sample_interval.or(self.sample_interval),
            start_time: other.start_time.or(self.start_time),
            packet_size: other.packet_size.or(self.packet_size),
            data_rate_bps: other.data_rate_bps.or(self.data_rate_bps),
            seed: other.seed.or(self.seed),
            flowmon_file: other.flowmon_file.or(self.flowmon_file),
            mobility_trace_file: other.mobility_trace_file.or(self.mobility_trace_file),
            channel: ChannelSettings {
                loss_rate: other.channel.loss_rate.or(self.channel.loss_rate),
                min_latency: other.channel.min_latency.or(self.channel.min_latency),
                max_latency: other.channel.max_latency.or(self.channel.max_latency),
                route_discovery_ms: other
                    .channel
                    .route_discovery_ms
                    .or(self.channel.route_discovery_ms),
            },
        }
    }

    pub fn apply_to(&self, config: &mut ExperimentConfig) -> Result<(), ConfigurationError> {
        if let Some(name) = &self.protocol {
            config.protocol = name.parse::<RoutingProtocol>()?;
        }
        if let Some(v) = &self.csv_file_name {
            config.csv_file_name = v.clone();
        }
        if let Some(v) = self.nodes {
            config.nodes = v;
        }
        if let Some(v) = self.sinks {
            config.sinks = v;
        }
        if let Some(v) = self.tx_power {
            config.tx_power = v;
        }
        if let Some(v) = self.trace_mobility {
            config.trace_mobility = v;
        }
        if let Some(v) = self.flow_monitor {
            config.flow_monitor = v;
        }
        if let Some(v) = self.total_time {
            config.total_time = v;
        }
        if let Some(v) = self.sample_interval {
            config.sample_interval = v;
        }
        if let Some(v) = self.start_time {
            config.start_time = v;
        }
        if let Some(v) = self.packet_size {
            config.packet_size = v;
        }
        if let Some(v) = self.data_rate_bps {
            config.data_rate_bps = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = &self.flowmon_file {
            config.flowmon_file = v.clone();
        }
        if let Some(v) = &self.mobility_trace_file {
            config.mobility_trace_file = v.clone();
        }
        if let Some(v) = self.channel.loss_rate {
            config.channel.loss_rate = v;
        }
        if let Some(v) = self.channel.min_latency {
            config.channel.min_latency = v;
        }
        if let Some(v) = self.channel.max_latency {
            config.channel.max_latency = v;
        }
        if let Some(v) = self.channel.route_discovery_ms {
            config.channel.route_discovery_ms = v;
        }
        Ok(())
    }

    /// Defaults plus this overlay, validated.
    pub fn into_config(self) -> Result<ExperimentConfig, ConfigurationError> {
        let mut config = ExperimentConfig::default();
        self.apply_to(&mut config)?;
        config.validate()?;
        Ok(config)
    }
}
