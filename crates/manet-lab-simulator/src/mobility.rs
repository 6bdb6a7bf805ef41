use manet_lab_abstract::{MobilityConfig, NodeId, NodeSet};
use rand::Rng;
use serde::Serialize;
use tracing::warn;

/// Upper bound on the waypoints kept per node, pauses included.
pub const MAX_WAYPOINTS: usize = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeTrack {
    pub node: NodeId,
    pub waypoints: Vec<Waypoint>,
}

/// Every node's movement for the whole run, written out when mobility
/// tracing is on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MobilityTrace {
    pub tracks: Vec<NodeTrack>,
}

/// Random waypoint inside a rectangle: pick a point, travel there at a
/// uniform random speed, pause, repeat.
#[derive(Debug, Clone)]
pub struct RandomWaypoint {
    config: MobilityConfig,
}

impl RandomWaypoint {
    pub fn new(config: MobilityConfig) -> Self {
        Self { config }
    }

    pub fn install<R: Rng>(&self, nodes: &NodeSet, horizon: f64, rng: &mut R) -> MobilityTrace {
        let trace = MobilityTrace {
            tracks: nodes
                .iter()
                .map(|node| NodeTrack {
                    node: node.id,
                    waypoints: self.walk(horizon, rng),
                })
                .collect(),
        };
        let truncated = trace
            .tracks
            .iter()
            .filter(|t| {
                t.waypoints.len() + 2 > MAX_WAYPOINTS
                    && t.waypoints.last().is_some_and(|w| w.time < horizon)
            })
            .count();
        if truncated > 0 {
            warn!(
                "{} of {} mobility tracks stop at {} waypoints before {}s",
                truncated,
                trace.tracks.len(),
                MAX_WAYPOINTS,
                horizon
            );
        }
        trace
    }

    fn random_point<R: Rng>(&self, rng: &mut R) -> (f64, f64) {
        (
            rng.random_range(0.0..=self.config.area_width),
            rng.random_range(0.0..=self.config.area_height),
        )
    }

    fn walk<R: Rng>(&self, horizon: f64, rng: &mut R) -> Vec<Waypoint> {
        let (mut x, mut y) = self.random_point(rng);
        let mut time = 0.0;
        let mut waypoints = vec![Waypoint { time, x, y }];

        while time < horizon && waypoints.len() + 2 <= MAX_WAYPOINTS {
            let (dx, dy) = self.random_point(rng);
            let speed = rng.random_range(0.0..=self.config.max_speed);
            if speed <= f64::EPSILON {
                // Parked for the rest of the run.
                break;
            }
            let distance = ((dx - x).powi(2) + (dy - y).powi(2)).sqrt();
            time += distance / speed;
            x = dx;
            y = dy;
            waypoints.push(Waypoint { time, x, y });

            if self.config.pause > 0.0 {
                time += self.config.pause;
                waypoints.push(Waypoint { time, x, y });
            }
        }
        waypoints
    }
}
