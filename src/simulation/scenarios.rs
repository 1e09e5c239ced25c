//! Preset demand scenarios and a runner that compares strategies
//!
//! Presets use evenly spaced arrivals with per-approach offsets by default so
//! comparisons do not depend on the random stream; Bernoulli arrivals with
//! the same mean rate are available for seeded stochastic runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::thread;

use super::arrivals::ArrivalProcess;
use super::config::{
    AdaptiveConfig, ConfigurationError, ControllerConfig, FixedTimeConfig, ScenarioConfig,
    StrategyKind,
};
use super::environment::IntersectionEnvironment;
use super::metrics::ScenarioMetrics;
use super::types::{Approach, ApproachMap};

/// Default run length for presets
pub const DEFAULT_TICKS: u64 = 2000;

/// All-red interval between greens
pub const CLEARANCE_TICKS: u64 = 3;

/// Adaptive parameters shared by every preset
pub const ADAPTIVE_MIN_GREEN: u64 = 8;
pub const ADAPTIVE_MAX_GREEN: u64 = 40;
pub const ADAPTIVE_STARVATION_THRESHOLD: u64 = 30;

/// Named demand pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScenarioKind {
    /// One vehicle per approach every 20 ticks
    Light,
    /// One vehicle per approach every 8 ticks
    Moderate,
    /// One vehicle per approach every 3 ticks, beyond capacity
    RushHour,
    /// North-south five times as busy as east-west
    Asymmetric,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 4] = [
        ScenarioKind::Light,
        ScenarioKind::Moderate,
        ScenarioKind::RushHour,
        ScenarioKind::Asymmetric,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioKind::Light => "light",
            ScenarioKind::Moderate => "moderate",
            ScenarioKind::RushHour => "rush-hour",
            ScenarioKind::Asymmetric => "asymmetric",
        }
    }

    /// (ticks between arrivals, first arrival tick) per approach
    fn spacing(self) -> ApproachMap<(u64, u64)> {
        let spacing = |north, east, south, west| {
            ApproachMap::from_fn(|approach| match approach {
                Approach::North => north,
                Approach::East => east,
                Approach::South => south,
                Approach::West => west,
            })
        };
        match self {
            ScenarioKind::Light => spacing((20, 0), (20, 5), (20, 10), (20, 15)),
            ScenarioKind::Moderate => spacing((8, 0), (8, 2), (8, 4), (8, 6)),
            ScenarioKind::RushHour => spacing((3, 0), (3, 2), (3, 1), (3, 0)),
            ScenarioKind::Asymmetric => spacing((4, 0), (20, 5), (4, 2), (20, 15)),
        }
    }

    /// Evenly spaced arrivals
    pub fn interval_arrivals(self) -> ApproachMap<ArrivalProcess> {
        self.spacing()
            .map(|_, &(every, offset)| ArrivalProcess::interval(every, offset))
    }

    /// Random arrivals with the same mean rate
    pub fn random_arrivals(self) -> ApproachMap<ArrivalProcess> {
        self.spacing()
            .map(|_, &(every, _)| ArrivalProcess::bernoulli(1.0 / every as f64))
    }

    /// Fixed-time plan, split in proportion to the preset's demand
    pub fn fixed_plan(self) -> FixedTimeConfig {
        match self {
            ScenarioKind::Asymmetric => FixedTimeConfig::two_phase(45, 15, CLEARANCE_TICKS),
            _ => FixedTimeConfig::two_phase(30, 30, CLEARANCE_TICKS),
        }
    }

    pub fn adaptive_plan(self) -> AdaptiveConfig {
        AdaptiveConfig::two_phase(
            ADAPTIVE_MIN_GREEN,
            ADAPTIVE_MAX_GREEN,
            ADAPTIVE_STARVATION_THRESHOLD,
            CLEARANCE_TICKS,
        )
    }

    pub fn controller(self, strategy: StrategyKind) -> ControllerConfig {
        match strategy {
            StrategyKind::Fixed => ControllerConfig::Fixed(self.fixed_plan()),
            StrategyKind::Adaptive => ControllerConfig::Adaptive(self.adaptive_plan()),
        }
    }

    /// Deterministic preset named `<scenario>/<strategy>`
    pub fn config(self, strategy: StrategyKind, ticks: u64) -> ScenarioConfig {
        ScenarioConfig::new(
            format!("{}/{}", self.as_str(), strategy),
            self.interval_arrivals(),
            self.controller(strategy),
            ticks,
        )
        .with_seed(0)
    }

    /// Seeded preset with random arrivals
    pub fn random_config(self, strategy: StrategyKind, ticks: u64, seed: u64) -> ScenarioConfig {
        ScenarioConfig::new(
            format!("{}/{}", self.as_str(), strategy),
            self.random_arrivals(),
            self.controller(strategy),
            ticks,
        )
        .with_seed(seed)
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ScenarioKind::Light),
            "moderate" => Ok(ScenarioKind::Moderate),
            "rush-hour" | "rush_hour" | "rush" => Ok(ScenarioKind::RushHour),
            "asymmetric" | "asym" => Ok(ScenarioKind::Asymmetric),
            _ => Err(ConfigurationError::UnknownScenario(s.to_string())),
        }
    }
}

/// Outcome of every scenario a runner executed, keyed by scenario name
pub type ScenarioResults = BTreeMap<String, Result<ScenarioMetrics, ConfigurationError>>;

/// Runs a batch of independent scenarios to completion
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    scenarios: Vec<ScenarioConfig>,
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both strategies for each of `kinds`; repeated kinds run once
    pub fn comparing(kinds: &[ScenarioKind], ticks: u64) -> Self {
        let mut runner = Self::new();
        for &kind in kinds {
            for strategy in StrategyKind::ALL {
                let config = kind.config(strategy, ticks);
                if !runner.contains(&config.name) {
                    runner.scenarios.push(config);
                }
            }
        }
        runner
    }

    /// Queue a scenario. Results are keyed by name, so names must be unique.
    pub fn add(&mut self, config: ScenarioConfig) -> Result<&mut Self, ConfigurationError> {
        if self.contains(&config.name) {
            return Err(ConfigurationError::DuplicateScenario(config.name));
        }
        self.scenarios.push(config);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.iter().any(|config| config.name == name)
    }

    pub fn scenarios(&self) -> &[ScenarioConfig] {
        &self.scenarios
    }

    /// Run every scenario one after another
    pub fn run(&self) -> ScenarioResults {
        self.scenarios
            .iter()
            .map(|config| (config.name.clone(), run_scenario(config)))
            .collect()
    }

    /// Run every scenario on its own thread
    pub fn run_parallel(&self) -> ScenarioResults {
        thread::scope(|scope| {
            let handles: Vec<_> = self
                .scenarios
                .iter()
                .map(|config| (config.name.clone(), scope.spawn(move || run_scenario(config))))
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = match handle.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    };
                    (name, result)
                })
                .collect()
        })
    }
}

fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioMetrics, ConfigurationError> {
    let mut environment = IntersectionEnvironment::new(config.clone())?;
    Ok(environment.run_to_completion())
}
