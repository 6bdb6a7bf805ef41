use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::sampler::ThroughputSample;

pub const HEADER: [&str; 6] = [
    "SimulationSecond",
    "ReceiveRate",
    "PacketsReceived",
    "NumberOfSinks",
    "RoutingProtocol",
    "TransmissionPower",
];

/// The CSV throughput log. The header is written once on creation, and
/// every sample is a separate append that reaches the file before
/// [`append`](ResultLog::append) returns.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    rows: u64,
}

impl ResultLog {
    /// Truncate `path` and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(HEADER)?;
        writer.flush()?;
        info!("Result log {} created", path.display());
        Ok(Self { path, rows: 0 })
    }

    pub fn append(&mut self, sample: &ThroughputSample) -> Result<(), csv::Error> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(&[
            sample.time.to_string(),
            sample.kbps.to_string(),
            sample.packets.to_string(),
            sample.sinks.to_string(),
            sample.protocol.name().to_string(),
            sample.tx_power.to_string(),
        ])?;
        writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_lab_abstract::RoutingProtocol;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "manet-lab-result-log-{}-{}.csv",
            name,
            std::process::id()
        ))
    }

    fn sample(time: f64, kbps: f64) -> ThroughputSample {
        ThroughputSample {
            time,
            kbps,
            packets: 3,
            sinks: 10,
            protocol: RoutingProtocol::Dsdv,
            tx_power: 7.5,
        }
    }

    #[test]
    fn header_then_appended_rows() {
        let path = temp_path("rows");
        let mut log = ResultLog::create(&path).unwrap();
        log.append(&sample(1.0, 1.536)).unwrap();
        log.append(&sample(2.0, 0.0)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "SimulationSecond,ReceiveRate,PacketsReceived,NumberOfSinks,RoutingProtocol,TransmissionPower",
                "1,1.536,3,10,DSDV,7.5",
                "2,0,3,10,DSDV,7.5",
            ]
        );
        assert_eq!(log.rows(), 2);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn create_truncates_a_previous_run() {
        let path = temp_path("truncate");
        let mut log = ResultLog::create(&path).unwrap();
        log.append(&sample(1.0, 5.0)).unwrap();

        ResultLog::create(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rows_are_on_disk_before_the_log_is_dropped() {
        let path = temp_path("durable");
        let mut log = ResultLog::create(&path).unwrap();
        log.append(&sample(1.0, 5.0)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
        drop(log);
        fs::remove_file(&path).unwrap();
    }
}
