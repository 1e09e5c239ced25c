//! Vehicle arrival processes
//!
//! Each approach draws its arrivals independently. Random processes only use
//! the generator handed in by the environment, so a seeded run always
//! produces the same arrival sequence.

use rand::Rng;

use super::config::ConfigurationError;
use super::types::Approach;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// How vehicles arrive on one approach
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ArrivalProcess {
    /// No traffic on this approach
    #[default]
    None,
    /// At most one arrival per tick with the given probability
    Bernoulli { probability: f64 },
    /// One arrival at every tick congruent to `offset` modulo `every`
    Interval { every: u64, offset: u64 },
}

impl ArrivalProcess {
    pub fn bernoulli(probability: f64) -> Self {
        ArrivalProcess::Bernoulli { probability }
    }

    pub fn interval(every: u64, offset: u64) -> Self {
        ArrivalProcess::Interval { every, offset }
    }

    /// Bernoulli arrivals matching a target flow in vehicles per hour
    pub fn from_vehicles_per_hour(
        vehicles_per_hour: f64,
        seconds_per_tick: f64,
    ) -> Result<Self, ConfigurationError> {
        if !(seconds_per_tick.is_finite() && seconds_per_tick > 0.0) {
            return Err(ConfigurationError::NonPositive {
                field: "seconds_per_tick",
                value: seconds_per_tick,
            });
        }
        if !(vehicles_per_hour.is_finite() && vehicles_per_hour >= 0.0) {
            return Err(ConfigurationError::NonPositive {
                field: "vehicles_per_hour",
                value: vehicles_per_hour,
            });
        }
        let probability = vehicles_per_hour * seconds_per_tick / SECONDS_PER_HOUR;
        if probability > 1.0 {
            return Err(ConfigurationError::RateTooHigh {
                vehicles_per_hour,
                seconds_per_tick,
            });
        }
        Ok(ArrivalProcess::Bernoulli { probability })
    }

    /// Whether this process can never produce a vehicle
    pub fn is_silent(&self) -> bool {
        match *self {
            ArrivalProcess::None => true,
            ArrivalProcess::Bernoulli { probability } => probability <= 0.0,
            ArrivalProcess::Interval { .. } => false,
        }
    }

    /// Long-run mean arrivals per tick
    pub fn expected_rate(&self) -> f64 {
        match *self {
            ArrivalProcess::None => 0.0,
            ArrivalProcess::Bernoulli { probability } => probability,
            ArrivalProcess::Interval { every, .. } => 1.0 / every as f64,
        }
    }

    /// Whether a vehicle arrives at `tick`
    ///
    /// Bernoulli processes draw from `rng` on every call, arrival or not.
    pub fn arrives<R: Rng + ?Sized>(&self, tick: u64, rng: &mut R) -> bool {
        match *self {
            ArrivalProcess::None => false,
            ArrivalProcess::Bernoulli { probability } => rng.random_bool(probability),
            ArrivalProcess::Interval { every, offset } => tick % every == offset % every,
        }
    }

    pub fn validate(&self, approach: Approach) -> Result<(), ConfigurationError> {
        match *self {
            ArrivalProcess::None => Ok(()),
            ArrivalProcess::Bernoulli { probability } => {
                if probability.is_finite() && (0.0..=1.0).contains(&probability) {
                    Ok(())
                } else {
                    Err(ConfigurationError::InvalidArrivals {
                        approach,
                        reason: format!("probability {} is outside [0, 1]", probability),
                    })
                }
            }
            ArrivalProcess::Interval { every, .. } => {
                if every == 0 {
                    Err(ConfigurationError::InvalidArrivals {
                        approach,
                        reason: "interval must be at least one tick".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}
