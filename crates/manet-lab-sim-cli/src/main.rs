use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use manet_lab_abstract::ExperimentSettings;
use manet_lab_simulator::{Experiment, ExperimentReport, FlowMonitorSnapshot};

#[derive(Parser, Debug)]
#[command(author, version, about = "MANET routing protocol comparison harness")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one experiment and write the throughput CSV.
    Run(RunArgs),
    /// Print the per-flow statistics stored in a flow monitor file.
    ReadFlowmon {
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Load settings from a TOML file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the CSV file for the throughput log.
    #[arg(long)]
    csv_file_name: Option<PathBuf>,

    /// Routing protocol: OLSR, AODV, DSDV or DSR.
    #[arg(long)]
    protocol: Option<String>,

    /// Write the node movements to the mobility trace file.
    #[arg(long)]
    trace_mobility: Option<bool>,

    /// Collect per-flow statistics and write them at the end of the run.
    #[arg(long)]
    flow_monitor: Option<bool>,

    #[arg(long)]
    nodes: Option<usize>,
    #[arg(long)]
    sinks: Option<usize>,

    /// Simulated seconds.
    #[arg(long)]
    total_time: Option<f64>,
    #[arg(long)]
    sample_interval: Option<f64>,
    #[arg(long)]
    start_time: Option<f64>,

    /// dBm.
    #[arg(long)]
    tx_power: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON summary of the finished run.
    #[arg(long)]
    report_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    match cli.command {
        Command::Run(args) => run(args),
        Command::ReadFlowmon { file } => read_flowmon(&file),
    }
}

fn run(args: RunArgs) -> Result<()> {
    info!("manet-lab-sim-cli starting…");

    let base = match &args.config {
        Some(path) => load_settings(path)?,
        None => ExperimentSettings::default(),
    };
    let settings = base.merge(args.overrides());

    let experiment =
        Experiment::from_settings(settings).context("Failed to set up the experiment")?;
    let csv = experiment.result_log().path().to_path_buf();
    let report = experiment.run().context("Experiment failed")?;

    print_summary(&report, &csv);

    if let Some(path) = &args.report_out {
        report
            .write_to(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }
    Ok(())
}

impl RunArgs {
    fn overrides(&self) -> ExperimentSettings {
        ExperimentSettings {
            csv_file_name: self.csv_file_name.clone(),
            nodes: self.nodes,
            sinks: self.sinks,
            protocol: self.protocol.clone(),
            tx_power: self.tx_power,
            trace_mobility: self.trace_mobility,
            flow_monitor: self.flow_monitor,
            total_time: self.total_time,
            sample_interval: self.sample_interval,
            start_time: self.start_time,
            seed: self.seed,
            ..Default::default()
        }
    }
}

fn load_settings(path: &Path) -> Result<ExperimentSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings: ExperimentSettings =
        toml::from_str(&content).context("Failed to parse settings file")?;
    Ok(settings)
}

fn print_summary(report: &ExperimentReport, csv: &Path) {
    info!("--- Experiment Summary ---");
    info!(
        "Protocol {} with {} sinks over {}s",
        report.config.protocol, report.endpoints, report.duration
    );
    info!("{} rows written to {}", report.rows_written, csv.display());
    info!(
        "Received {} packets ({} bytes)",
        report.total_packets_received, report.total_bytes_received
    );
    info!(
        "Channel: {} transmitted, {} lost, {} unroutable, {} unbound",
        report.channel.transmitted,
        report.channel.dropped_loss,
        report.channel.dropped_no_route,
        report.channel.dropped_unbound
    );
    info!(
        "Events: {} executed, {} discarded at teardown",
        report.events_executed, report.events_discarded
    );
}

fn read_flowmon(path: &Path) -> Result<()> {
    let snapshot = FlowMonitorSnapshot::read_from(path)
        .with_context(|| format!("Failed to load flow monitor file {}", path.display()))?;
    print!("{snapshot}");
    Ok(())
}
