//! Standalone intersection simulation module
//!
//! This module contains the simulation core: vehicle agents, the signal
//! controller and the environment loop. It has no rendering or I/O
//! dependencies, so any front end can drive it and consume its metrics.

mod arrivals;
mod config;
mod environment;
mod metrics;
mod scenarios;
mod signal;
mod types;
mod vehicle;

pub use arrivals::ArrivalProcess;
pub use config::{
    AdaptiveConfig, ConfigurationError, ControllerConfig, FixedTimeConfig, GeometryParams,
    ScenarioConfig, StrategyKind, VehicleParams,
};
pub use environment::{IntersectionEnvironment, Snapshot, VehicleSnapshot};
pub use metrics::{
    ApproachMetrics, MetricsAccumulator, PendingVehicles, ScenarioMetrics, TickMetrics,
};
pub use scenarios::{
    ScenarioKind, ScenarioResults, ScenarioRunner, ADAPTIVE_MAX_GREEN, ADAPTIVE_MIN_GREEN,
    ADAPTIVE_STARVATION_THRESHOLD, CLEARANCE_TICKS, DEFAULT_TICKS,
};
pub use signal::{ApproachDemand, Demand, PhaseState, SignalController};
pub use types::{
    Approach, ApproachMap, Phase, VehicleId, DEFAULT_APPROACH_LENGTH, DEFAULT_DECELERATION,
    DEFAULT_DETECTION_RANGE, DEFAULT_INTERSECTION_WIDTH, DEFAULT_MAX_ACCELERATION,
    DEFAULT_MAX_VELOCITY, DEFAULT_MIN_GAP, WAIT_VELOCITY_FRACTION,
};
pub use vehicle::{braking_distance, stopping_speed, Leader, VehicleAgent};
