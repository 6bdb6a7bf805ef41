pub mod accounting;
pub mod channel;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod experiment;
pub mod flowmon;
pub mod mobility;
pub mod result_log;
pub mod sampler;
pub mod topology;
pub mod trace;
pub mod traffic;

pub use engine::EventClock;
pub use error::ExperimentError;
pub use experiment::Experiment;
pub use flowmon::FlowMonitorSnapshot;
pub use trace::ExperimentReport;
