//! Scenario configuration and validation
//!
//! Everything a run needs is described by a [`ScenarioConfig`]. Invalid
//! values are rejected when the environment or controller is built, never
//! mid-run.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::arrivals::ArrivalProcess;
use super::types::{
    Approach, ApproachMap, Phase, DEFAULT_APPROACH_LENGTH, DEFAULT_DECELERATION,
    DEFAULT_DETECTION_RANGE, DEFAULT_INTERSECTION_WIDTH, DEFAULT_MAX_ACCELERATION,
    DEFAULT_MAX_VELOCITY, DEFAULT_MIN_GAP, WAIT_VELOCITY_FRACTION,
};

/// Errors raised while validating a scenario
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Signal plan has no phases")]
    EmptyPlan,

    #[error("Phase {index} grants green to no approach")]
    EmptyPhase { index: usize },

    #[error("Approach {approach} appears in more than one phase")]
    DuplicateApproach { approach: Approach },

    #[error("{field} must be at least one tick")]
    ZeroDuration { field: &'static str },

    #[error("Minimum green {min_green} exceeds maximum green {max_green}")]
    MinGreenExceedsMax { min_green: u64, max_green: u64 },

    #[error("Starvation threshold {threshold} is shorter than the {required} ticks minimum green and clearance already take")]
    StarvationThresholdTooShort { threshold: u64, required: u64 },

    #[error("Unknown strategy '{0}' (expected 'fixed' or 'adaptive')")]
    UnknownStrategy(String),

    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error("A scenario named '{0}' was already added")]
    DuplicateScenario(String),

    #[error("{field} must be a positive finite number, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{vehicles_per_hour} vehicles per hour is more than one arrival per {seconds_per_tick}s tick")]
    RateTooHigh {
        vehicles_per_hour: f64,
        seconds_per_tick: f64,
    },

    #[error("Invalid arrival process on {approach}: {reason}")]
    InvalidArrivals { approach: Approach, reason: String },

    #[error("Approach {approach} has arrivals but no phase serves it")]
    UnservedApproach { approach: Approach },
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::NonPositive { field, value })
    }
}

fn require_ticks(field: &'static str, value: u64) -> Result<(), ConfigurationError> {
    if value == 0 {
        return Err(ConfigurationError::ZeroDuration { field });
    }
    Ok(())
}

/// Kinematic limits shared by every vehicle in a scenario
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleParams {
    pub max_velocity: f64,
    pub max_acceleration: f64,
    /// Braking rate used when anticipating a stop line or a leader
    pub deceleration: f64,
    /// Minimum distance between a vehicle and its leader
    pub min_gap: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            max_velocity: DEFAULT_MAX_VELOCITY,
            max_acceleration: DEFAULT_MAX_ACCELERATION,
            deceleration: DEFAULT_DECELERATION,
            min_gap: DEFAULT_MIN_GAP,
        }
    }
}

impl VehicleParams {
    /// Velocity below which a vehicle is considered waiting
    pub fn wait_velocity(&self) -> f64 {
        WAIT_VELOCITY_FRACTION * self.max_velocity
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_positive("max_velocity", self.max_velocity)?;
        require_positive("max_acceleration", self.max_acceleration)?;
        require_positive("deceleration", self.deceleration)?;
        require_positive("min_gap", self.min_gap)
    }
}

/// Lane and intersection dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryParams {
    /// Distance from where vehicles enter to the stop line
    pub approach_length: f64,
    /// Distance from the stop line to the far boundary
    pub intersection_width: f64,
    /// Vehicles this close to the stop line count as detected demand
    pub detection_range: f64,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            approach_length: DEFAULT_APPROACH_LENGTH,
            intersection_width: DEFAULT_INTERSECTION_WIDTH,
            detection_range: DEFAULT_DETECTION_RANGE,
        }
    }
}

impl GeometryParams {
    pub fn validate(&self, vehicle: &VehicleParams) -> Result<(), ConfigurationError> {
        require_positive("approach_length", self.approach_length)?;
        require_positive("intersection_width", self.intersection_width)?;
        require_positive("detection_range", self.detection_range)?;
        // At least one vehicle has to fit between the entry and the stop line
        if self.approach_length <= vehicle.min_gap {
            return Err(ConfigurationError::NonPositive {
                field: "approach_length - min_gap",
                value: self.approach_length - vehicle.min_gap,
            });
        }
        Ok(())
    }
}

/// Fixed-time plan: each phase stays green for its own duration, in order
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimeConfig {
    pub plan: Vec<(Phase, u64)>,
    pub clearance_ticks: u64,
}

impl FixedTimeConfig {
    /// Two-phase north-south / east-west plan
    pub fn two_phase(north_south_green: u64, east_west_green: u64, clearance_ticks: u64) -> Self {
        Self {
            plan: vec![
                (Phase::north_south(), north_south_green),
                (Phase::east_west(), east_west_green),
            ],
            clearance_ticks,
        }
    }

    pub fn cycle_length(&self) -> u64 {
        self.plan
            .iter()
            .fold(0u64, |total, (_, green)| {
                total
                    .saturating_add(*green)
                    .saturating_add(self.clearance_ticks)
            })
    }
}

/// Demand-responsive plan
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveConfig {
    pub phases: Vec<Phase>,
    pub min_green: u64,
    pub max_green: u64,
    /// Longest a queued vehicle on a red approach may be kept waiting
    pub starvation_threshold: u64,
    pub clearance_ticks: u64,
}

impl AdaptiveConfig {
    /// Two-phase north-south / east-west plan
    pub fn two_phase(
        min_green: u64,
        max_green: u64,
        starvation_threshold: u64,
        clearance_ticks: u64,
    ) -> Self {
        Self {
            phases: vec![Phase::north_south(), Phase::east_west()],
            min_green,
            max_green,
            starvation_threshold,
            clearance_ticks,
        }
    }
}

/// Which control strategy a controller runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Fixed,
    Adaptive,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Fixed, StrategyKind::Adaptive];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Fixed => "fixed",
            StrategyKind::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "fixed-time" | "time_cycle" => Ok(StrategyKind::Fixed),
            "adaptive" | "detection_cycle" => Ok(StrategyKind::Adaptive),
            _ => Err(ConfigurationError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Signal controller configuration, bound to one strategy
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerConfig {
    Fixed(FixedTimeConfig),
    Adaptive(AdaptiveConfig),
}

impl ControllerConfig {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ControllerConfig::Fixed(_) => StrategyKind::Fixed,
            ControllerConfig::Adaptive(_) => StrategyKind::Adaptive,
        }
    }

    /// Phases in cyclic order
    pub fn phases(&self) -> Vec<Phase> {
        match self {
            ControllerConfig::Fixed(config) => {
                config.plan.iter().map(|(phase, _)| phase.clone()).collect()
            }
            ControllerConfig::Adaptive(config) => config.phases.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_phases(&self.phases())?;
        match self {
            ControllerConfig::Fixed(config) => {
                for (_, green) in &config.plan {
                    require_ticks("green duration", *green)?;
                }
                require_ticks("clearance_ticks", config.clearance_ticks)
            }
            ControllerConfig::Adaptive(config) => {
                require_ticks("min_green", config.min_green)?;
                require_ticks("max_green", config.max_green)?;
                require_ticks("clearance_ticks", config.clearance_ticks)?;
                require_ticks("starvation_threshold", config.starvation_threshold)?;
                if config.min_green > config.max_green {
                    return Err(ConfigurationError::MinGreenExceedsMax {
                        min_green: config.min_green,
                        max_green: config.max_green,
                    });
                }
                // A vehicle that stops as its phase ends sits through clearance,
                // the other phase's minimum green and a second clearance.
                let required = config
                    .clearance_ticks
                    .checked_mul(2)
                    .and_then(|clearance| clearance.checked_add(config.min_green))
                    .unwrap_or(u64::MAX);
                if config.starvation_threshold < required {
                    return Err(ConfigurationError::StarvationThresholdTooShort {
                        threshold: config.starvation_threshold,
                        required,
                    });
                }
                Ok(())
            }
        }
    }
}

fn validate_phases(phases: &[Phase]) -> Result<(), ConfigurationError> {
    if phases.is_empty() {
        return Err(ConfigurationError::EmptyPlan);
    }
    let mut seen = ApproachMap::splat(false);
    for (index, phase) in phases.iter().enumerate() {
        if phase.is_empty() {
            return Err(ConfigurationError::EmptyPhase { index });
        }
        for &approach in phase.approaches() {
            if seen[approach] {
                return Err(ConfigurationError::DuplicateApproach { approach });
            }
            seen[approach] = true;
        }
    }
    Ok(())
}

/// Everything needed to build one intersection run
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub name: String,
    pub arrivals: ApproachMap<ArrivalProcess>,
    pub controller: ControllerConfig,
    /// Number of ticks `run_to_completion` executes
    pub ticks: u64,
    /// Seed for the arrival generator; OS entropy when absent
    pub seed: Option<u64>,
    /// Stop generating arrivals after this many vehicles
    pub max_vehicles: Option<usize>,
    pub vehicle: VehicleParams,
    pub geometry: GeometryParams,
}

impl ScenarioConfig {
    pub fn new(
        name: impl Into<String>,
        arrivals: ApproachMap<ArrivalProcess>,
        controller: ControllerConfig,
        ticks: u64,
    ) -> Self {
        Self {
            name: name.into(),
            arrivals,
            controller,
            ticks,
            seed: None,
            max_vehicles: None,
            vehicle: VehicleParams::default(),
            geometry: GeometryParams::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_vehicles(mut self, max_vehicles: usize) -> Self {
        self.max_vehicles = Some(max_vehicles);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.vehicle.validate()?;
        self.geometry.validate(&self.vehicle)?;
        self.controller.validate()?;

        let phases = self.controller.phases();
        for (approach, process) in self.arrivals.iter() {
            process.validate(approach)?;
            let served = phases.iter().any(|phase| phase.contains(approach));
            if !process.is_silent() && !served {
                return Err(ConfigurationError::UnservedApproach { approach });
            }
        }
        Ok(())
    }
}
