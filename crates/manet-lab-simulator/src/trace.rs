use manet_lab_abstract::{ExperimentConfig, NodeId};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddrV4;
use std::path::{Path, PathBuf};

use crate::channel::ChannelStats;
use crate::error::ExperimentError;

#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub sender: NodeId,
    pub source: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub start: f64,
    pub stop: f64,
    pub packets_sent: u64,
}

/// What a finished run leaves behind besides the result log.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub config: ExperimentConfig,
    /// Simulated seconds.
    pub duration: f64,
    pub rows_written: u64,
    pub total_bytes_received: u64,
    pub total_packets_received: u64,
    pub endpoints: usize,
    pub flows: Vec<FlowSummary>,
    pub events_executed: u64,
    pub events_discarded: usize,
    pub channel: ChannelStats,
    pub flow_monitor_file: Option<PathBuf>,
    pub mobility_trace_file: Option<PathBuf>,
}

impl ExperimentReport {
    pub fn write_to(&self, path: &Path) -> Result<(), ExperimentError> {
        write_json(path, self)
    }
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExperimentError> {
    let io_err = |source| ExperimentError::Artifact {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| ExperimentError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_err)
}
