//! Signal controller state machine
//!
//! One controller drives the whole intersection. It is green for exactly one
//! phase at a time, and every change of green goes through a clearance
//! interval in which no approach may enter.

use log::debug;

use super::config::{
    AdaptiveConfig, ConfigurationError, ControllerConfig, FixedTimeConfig, StrategyKind,
};
use super::types::{Approach, ApproachMap, Phase};

/// Observed demand on one approach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApproachDemand {
    /// Vehicles stopped behind the stop line, including any held at the entry
    pub queue_length: usize,
    /// Vehicles inside the detector range or stopped anywhere before the line
    pub detected: usize,
    /// Longest current stop among the queued vehicles
    pub max_wait: u64,
}

/// Demand for every approach at one tick
pub type Demand = ApproachMap<ApproachDemand>;

/// The signal state active during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Green for the phase at this index of the plan
    Green(usize),
    /// All red, with the phase that gets green next
    Clearance { next: usize },
}

impl PhaseState {
    pub fn green_phase(&self) -> Option<usize> {
        match *self {
            PhaseState::Green(index) => Some(index),
            PhaseState::Clearance { .. } => None,
        }
    }

    pub fn is_clearance(&self) -> bool {
        matches!(self, PhaseState::Clearance { .. })
    }
}

/// Switching rules of the adaptive strategy
#[derive(Debug, Clone, PartialEq)]
struct AdaptiveRules {
    min_green: u64,
    max_green: u64,
    starvation_threshold: u64,
}

#[derive(Debug, Clone, PartialEq)]
enum Strategy {
    Fixed { greens: Vec<u64> },
    Adaptive(AdaptiveRules),
}

/// Traffic signal for the intersection
#[derive(Debug, Clone, PartialEq)]
pub struct SignalController {
    phases: Vec<Phase>,
    strategy: Strategy,
    clearance_ticks: u64,
    state: PhaseState,
    /// Ticks the current state has been active, including the current one
    elapsed: u64,
}

impl SignalController {
    pub fn new(config: &ControllerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let (strategy, clearance_ticks) = match config {
            ControllerConfig::Fixed(fixed) => (
                Strategy::Fixed {
                    greens: fixed.plan.iter().map(|(_, green)| *green).collect(),
                },
                fixed.clearance_ticks,
            ),
            ControllerConfig::Adaptive(adaptive) => (
                Strategy::Adaptive(AdaptiveRules {
                    min_green: adaptive.min_green,
                    max_green: adaptive.max_green,
                    starvation_threshold: adaptive.starvation_threshold,
                }),
                adaptive.clearance_ticks,
            ),
        };
        Ok(Self {
            phases: config.phases(),
            strategy,
            clearance_ticks,
            state: PhaseState::Green(0),
            elapsed: 0,
        })
    }

    pub fn fixed(config: FixedTimeConfig) -> Result<Self, ConfigurationError> {
        Self::new(&ControllerConfig::Fixed(config))
    }

    pub fn adaptive(config: AdaptiveConfig) -> Result<Self, ConfigurationError> {
        Self::new(&ControllerConfig::Adaptive(config))
    }

    pub fn kind(&self) -> StrategyKind {
        match self.strategy {
            Strategy::Fixed { .. } => StrategyKind::Fixed,
            Strategy::Adaptive(_) => StrategyKind::Adaptive,
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    /// Ticks the current state has been active
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn clearance_ticks(&self) -> u64 {
        self.clearance_ticks
    }

    /// Whether `approach` has right of way in the current state
    pub fn is_green(&self, approach: Approach) -> bool {
        match self.state {
            PhaseState::Green(index) => self.phases[index].contains(approach),
            PhaseState::Clearance { .. } => false,
        }
    }

    pub fn green_approaches(&self) -> ApproachMap<bool> {
        ApproachMap::from_fn(|approach| self.is_green(approach))
    }

    /// Advance the phase clock by one tick and return the state for it.
    ///
    /// The fixed-time strategy ignores `demand`.
    pub fn tick(&mut self, demand: &Demand) -> PhaseState {
        if let Some(next) = self.transition(demand) {
            debug!(
                "Signal {}: {:?} -> {:?} after {} ticks",
                self.kind(),
                self.state,
                next,
                self.elapsed
            );
            self.state = next;
            self.elapsed = 0;
        }
        self.elapsed += 1;
        self.state
    }

    fn transition(&self, demand: &Demand) -> Option<PhaseState> {
        match self.state {
            PhaseState::Clearance { next } => {
                (self.elapsed >= self.clearance_ticks).then_some(PhaseState::Green(next))
            }
            PhaseState::Green(current) => {
                let next = match &self.strategy {
                    Strategy::Fixed { greens } => (self.elapsed >= greens[current])
                        .then_some((current + 1) % self.phases.len()),
                    Strategy::Adaptive(rules) => self.adaptive_switch(rules, current, demand),
                };
                next.map(|next| PhaseState::Clearance { next })
            }
        }
    }

    /// Decide whether the adaptive strategy leaves green for `current`, and
    /// for which phase.
    fn adaptive_switch(
        &self,
        rules: &AdaptiveRules,
        current: usize,
        demand: &Demand,
    ) -> Option<usize> {
        if self.elapsed < rules.min_green {
            return None;
        }
        let phase = &self.phases[current];

        let starved = demand.iter().any(|(approach, d)| {
            !phase.contains(approach)
                && d.queue_length > 0
                && d.max_wait.saturating_add(self.clearance_ticks) >= rules.starvation_threshold
        });
        let maxed_out = self.elapsed >= rules.max_green;
        let green_detected: usize = phase
            .approaches()
            .iter()
            .map(|&approach| demand[approach].detected)
            .sum();
        let conflicting_detected = demand
            .iter()
            .any(|(approach, d)| !phase.contains(approach) && d.detected > 0);
        let gapped_out = green_detected == 0 && conflicting_detected;

        (starved || maxed_out || gapped_out).then(|| self.most_urgent_phase(current, demand))
    }

    /// The conflicting phase with the longest queued wait, then the most
    /// detected vehicles. Ties go to the earliest phase in cyclic order.
    fn most_urgent_phase(&self, current: usize, demand: &Demand) -> usize {
        let count = self.phases.len();
        let mut best: Option<((u64, usize), usize)> = None;
        for offset in 1..count {
            let index = (current + offset) % count;
            let approaches = self.phases[index].approaches();
            let max_wait = approaches
                .iter()
                .map(|&approach| demand[approach])
                .filter(|d| d.queue_length > 0)
                .map(|d| d.max_wait)
                .max()
                .unwrap_or(0);
            let detected: usize = approaches
                .iter()
                .map(|&approach| demand[approach].detected)
                .sum();
            let urgency = (max_wait, detected);
            if best.is_none_or(|(best_urgency, _)| urgency > best_urgency) {
                best = Some((urgency, index));
            }
        }
        best.map(|(_, index)| index)
            .unwrap_or((current + 1) % count)
    }
}
