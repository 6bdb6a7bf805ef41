use manet_lab_abstract::{Datagram, FiveTuple};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::error::ExperimentError;
use crate::trace::write_json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStats {
    pub flow_id: u32,
    pub time_first_tx_packet: Option<f64>,
    pub time_first_rx_packet: Option<f64>,
    pub time_last_tx_packet: Option<f64>,
    pub time_last_rx_packet: Option<f64>,
    /// Seconds, summed over received packets.
    pub delay_sum: f64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierEntry {
    pub flow_id: u32,
    pub source_address: Ipv4Addr,
    pub destination_address: Ipv4Addr,
    pub protocol: u8,
    pub source_port: u16,
    pub destination_port: u16,
}

/// End-of-run flow statistics, as written to the flow-monitor file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlowMonitorSnapshot {
    pub flow_stats: Vec<FlowStats>,
    pub ipv4_flow_classifier: Vec<ClassifierEntry>,
}

impl FlowMonitorSnapshot {
    pub fn write_to(&self, path: &Path) -> Result<(), ExperimentError> {
        write_json(path, self)
    }

    pub fn read_from(path: &Path) -> Result<Self, ExperimentError> {
        let file = File::open(path).map_err(|source| ExperimentError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ExperimentError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn or_dash(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}s"))
}

impl fmt::Display for FlowMonitorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Flow Stats:")?;
        for flow in &self.flow_stats {
            writeln!(f)?;
            writeln!(f, "Flow ID: {}", flow.flow_id)?;
            writeln!(f, "Time First Tx Packet: {}", or_dash(flow.time_first_tx_packet))?;
            writeln!(f, "Time First Rx Packet: {}", or_dash(flow.time_first_rx_packet))?;
            writeln!(f, "Time Last Tx Packet: {}", or_dash(flow.time_last_tx_packet))?;
            writeln!(f, "Time Last Rx Packet: {}", or_dash(flow.time_last_rx_packet))?;
            writeln!(f, "Transmitted Packets: {}", flow.tx_packets)?;
            writeln!(f, "Received Packets: {}", flow.rx_packets)?;
            writeln!(f, "Lost Packets: {}", flow.lost_packets)?;
        }

        writeln!(f)?;
        writeln!(f, "IPv4 Flow Classifier:")?;
        for entry in &self.ipv4_flow_classifier {
            writeln!(f)?;
            writeln!(f, "Flow ID: {}", entry.flow_id)?;
            writeln!(f, "Source Address: {}", entry.source_address)?;
            writeln!(f, "Destination Address: {}", entry.destination_address)?;
            writeln!(f, "Protocol: {}", entry.protocol)?;
        }
        Ok(())
    }
}

/// Per-flow packet accounting keyed on the five-tuple. Flow ids are handed
/// out from 1 in order of first transmission.
#[derive(Debug, Default)]
pub struct FlowMonitor {
    ids: HashMap<FiveTuple, usize>,
    flows: Vec<(FiveTuple, FlowStats)>,
}

impl FlowMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn classify(&mut self, datagram: &Datagram) -> &mut FlowStats {
        let tuple = datagram.five_tuple();
        let next = self.flows.len();
        let index = *self.ids.entry(tuple).or_insert(next);
        if index == next {
            self.flows.push((
                tuple,
                FlowStats {
                    flow_id: next as u32 + 1,
                    ..Default::default()
                },
            ));
        }
        &mut self.flows[index].1
    }

    pub fn record_tx(&mut self, datagram: &Datagram, now: Duration) {
        let t = now.as_secs_f64();
        let size = datagram.packet.size() as u64;
        let stats = self.classify(datagram);
        stats.time_first_tx_packet.get_or_insert(t);
        stats.time_last_tx_packet = Some(t);
        stats.tx_packets += 1;
        stats.tx_bytes += size;
    }

    pub fn record_rx(&mut self, datagram: &Datagram, now: Duration) {
        let t = now.as_secs_f64();
        let size = datagram.packet.size() as u64;
        let delay = now.saturating_sub(datagram.packet.sent_at).as_secs_f64();
        let stats = self.classify(datagram);
        stats.time_first_rx_packet.get_or_insert(t);
        stats.time_last_rx_packet = Some(t);
        stats.rx_packets += 1;
        stats.rx_bytes += size;
        stats.delay_sum += delay;
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Packets still unreceived when the snapshot is taken count as lost.
    pub fn snapshot(&self) -> FlowMonitorSnapshot {
        let mut snapshot = FlowMonitorSnapshot::default();
        for (tuple, stats) in &self.flows {
            let mut stats = stats.clone();
            stats.lost_packets = stats.tx_packets.saturating_sub(stats.rx_packets);
            snapshot.ipv4_flow_classifier.push(ClassifierEntry {
                flow_id: stats.flow_id,
                source_address: *tuple.source.ip(),
                destination_address: *tuple.destination.ip(),
                protocol: tuple.protocol,
                source_port: tuple.source.port(),
                destination_port: tuple.destination.port(),
            });
            snapshot.flow_stats.push(stats);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_lab_abstract::Packet;
    use std::net::SocketAddrV4;

    fn datagram(src_last: u8, uid: u64, sent_at: Duration) -> Datagram {
        Datagram {
            from: SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, src_last), 49153),
            to: SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, 1), 9),
            packet: Packet::zeroed(uid, 64, sent_at),
        }
    }

    #[test]
    fn flows_are_numbered_from_one_by_first_sight() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(&datagram(12, 0, Duration::ZERO), Duration::ZERO);
        monitor.record_tx(&datagram(11, 1, Duration::ZERO), Duration::ZERO);
        monitor.record_tx(&datagram(12, 2, Duration::ZERO), Duration::ZERO);

        let snapshot = monitor.snapshot();
        assert_eq!(monitor.flow_count(), 2);
        assert_eq!(snapshot.flow_stats[0].flow_id, 1);
        assert_eq!(snapshot.flow_stats[0].tx_packets, 2);
        assert_eq!(
            snapshot.ipv4_flow_classifier[1].source_address,
            Ipv4Addr::new(10, 1, 1, 11)
        );
        assert_eq!(snapshot.ipv4_flow_classifier[1].protocol, 17);
    }

    #[test]
    fn rx_tracks_delay_and_unreceived_packets_are_lost() {
        let mut monitor = FlowMonitor::new();
        let sent = Duration::from_secs(100);
        let a = datagram(12, 0, sent);
        let b = datagram(12, 1, sent);
        monitor.record_tx(&a, sent);
        monitor.record_tx(&b, sent);
        monitor.record_rx(&a, sent + Duration::from_millis(20));

        let stats = &monitor.snapshot().flow_stats[0];
        assert_eq!(stats.rx_packets, 1);
        assert_eq!(stats.lost_packets, 1);
        assert_eq!(stats.time_first_tx_packet, Some(100.0));
        assert!((stats.time_first_rx_packet.unwrap() - 100.02).abs() < 1e-9);
        assert!((stats.delay_sum - 0.02).abs() < 1e-9);
    }

    #[test]
    fn snapshot_file_reads_back() {
        let mut monitor = FlowMonitor::new();
        let d = datagram(12, 0, Duration::ZERO);
        monitor.record_tx(&d, Duration::ZERO);
        monitor.record_rx(&d, Duration::from_millis(5));

        let path = std::env::temp_dir().join(format!(
            "manet-lab-flowmon-{}.flowmon",
            std::process::id()
        ));
        let snapshot = monitor.snapshot();
        snapshot.write_to(&path).unwrap();
        let read = FlowMonitorSnapshot::read_from(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(read.ipv4_flow_classifier, snapshot.ipv4_flow_classifier);
        assert_eq!(read.flow_stats[0].rx_packets, 1);
        assert!((read.flow_stats[0].delay_sum - 0.005).abs() < 1e-9);
        let text = read.to_string();
        assert!(text.starts_with("Flow Stats:"));
        assert!(text.contains("Lost Packets: 0"));
        assert!(text.contains("Destination Address: 10.1.1.1"));
    }

    #[test]
    fn missing_snapshot_is_an_artifact_error() {
        let err = FlowMonitorSnapshot::read_from(Path::new("/nonexistent/x.flowmon")).unwrap_err();
        assert!(matches!(err, ExperimentError::Artifact { .. }));
    }
}
