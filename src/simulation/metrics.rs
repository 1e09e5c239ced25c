//! Per-tick and per-run performance metrics
//!
//! The environment folds every tick and every departing vehicle into a
//! [`MetricsAccumulator`]; [`ScenarioMetrics`] is the immutable summary
//! handed back to whoever runs the scenario.

use std::fmt;

use super::signal::PhaseState;
use super::types::{Approach, ApproachMap};
use super::vehicle::VehicleAgent;

/// What happened during a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickMetrics {
    pub tick: u64,
    pub phase: PhaseState,
    pub green: ApproachMap<bool>,
    /// Queue lengths observed before vehicles moved
    pub queue_lengths: ApproachMap<usize>,
    pub arrivals: ApproachMap<usize>,
    pub departures: ApproachMap<usize>,
}

impl TickMetrics {
    pub fn total_queue_length(&self) -> usize {
        self.queue_lengths.values().sum()
    }

    pub fn total_departures(&self) -> usize {
        self.departures.values().sum()
    }
}

/// Summary for one approach
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ApproachMetrics {
    pub arrived: usize,
    pub served: usize,
    pub total_wait: u64,
    pub average_wait: f64,
    /// Longest single stop of any served vehicle
    pub max_wait: u64,
    pub average_queue_length: f64,
}

/// Vehicles still inside a run when it is summarised
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingVehicles {
    /// In a lane or held at an entry
    pub count: usize,
    /// Waiting ticks accumulated so far, held time included
    pub wait: u64,
    /// Lane vehicles below the waiting velocity
    pub stopped: usize,
    /// Lane vehicles at or above it
    pub moving: usize,
}

/// Summary of a whole run
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioMetrics {
    pub ticks: u64,
    pub vehicles_arrived: usize,
    /// Vehicles that entered a lane
    pub vehicles_spawned: usize,
    /// Vehicles that cleared the intersection
    pub vehicles_served: usize,
    /// Vehicles still in a lane or held at an entry when the run ended
    pub vehicles_pending: usize,
    /// Mean waiting ticks per served vehicle, zero when none were served
    pub average_wait: f64,
    /// Waiting ticks of served vehicles plus those still pending
    pub total_wait_including_pending: u64,
    /// Lane vehicles stopped when the summary was taken
    pub vehicles_stopped: usize,
    /// Lane vehicles moving when the summary was taken
    pub vehicles_moving: usize,
    pub average_transit: f64,
    /// Mean over ticks of the summed queue lengths
    pub average_queue_length: f64,
    /// Served vehicles per tick
    pub throughput: f64,
    /// Longest single stop on any approach
    pub max_wait: u64,
    pub approaches: ApproachMap<ApproachMetrics>,
}

impl ScenarioMetrics {
    /// Percentage by which this run's average wait undercuts `baseline`'s
    pub fn wait_improvement_over(&self, baseline: &ScenarioMetrics) -> f64 {
        if baseline.average_wait == 0.0 {
            return 0.0;
        }
        (baseline.average_wait - self.average_wait) / baseline.average_wait * 100.0
    }
}

impl fmt::Display for ScenarioMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(
            f,
            "Vehicles: arrived={}, spawned={}, served={}, pending={}",
            self.vehicles_arrived, self.vehicles_spawned, self.vehicles_served, self.vehicles_pending
        )?;
        writeln!(f, "Average wait: {:.2} ticks", self.average_wait)?;
        writeln!(
            f,
            "Total wait including pending: {} ticks ({} stopped, {} moving)",
            self.total_wait_including_pending, self.vehicles_stopped, self.vehicles_moving
        )?;
        writeln!(f, "Average transit: {:.2} ticks", self.average_transit)?;
        writeln!(f, "Average queue length: {:.2}", self.average_queue_length)?;
        writeln!(f, "Throughput: {:.3} vehicles/tick", self.throughput)?;
        writeln!(f, "Max wait: {} ticks", self.max_wait)?;
        for (approach, metrics) in self.approaches.iter() {
            writeln!(
                f,
                "  {:>5}: served={}, avg wait={:.2}, max wait={}, avg queue={:.2}",
                approach.to_string(),
                metrics.served,
                metrics.average_wait,
                metrics.max_wait,
                metrics.average_queue_length
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ApproachTotals {
    arrived: usize,
    served: usize,
    total_wait: u64,
    total_transit: u64,
    max_wait: u64,
    queue_ticks: u64,
}

/// Running totals, only ever increased during a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsAccumulator {
    ticks: u64,
    spawned: usize,
    approaches: ApproachMap<ApproachTotals>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&mut self, tick: &TickMetrics) {
        self.ticks += 1;
        for (approach, totals) in self.approaches.iter_mut() {
            totals.queue_ticks += tick.queue_lengths[approach] as u64;
            totals.arrived += tick.arrivals[approach];
        }
    }

    pub fn record_spawn(&mut self) {
        self.spawned += 1;
    }

    pub fn record_departure(&mut self, vehicle: &VehicleAgent) {
        let totals = &mut self.approaches[vehicle.approach];
        totals.served += 1;
        totals.total_wait += vehicle.wait_ticks;
        totals.total_transit += vehicle.transit_ticks().unwrap_or(0);
        totals.max_wait = totals.max_wait.max(vehicle.longest_stop);
    }

    pub fn served(&self, approach: Approach) -> usize {
        self.approaches[approach].served
    }

    pub fn total_served(&self) -> usize {
        self.approaches.values().map(|t| t.served).sum()
    }

    pub fn summarize(&self, pending: PendingVehicles) -> ScenarioMetrics {
        let ratio = |numerator: f64, denominator: f64| {
            if denominator > 0.0 {
                numerator / denominator
            } else {
                0.0
            }
        };
        let ticks = self.ticks as f64;

        let approaches = self.approaches.map(|_, totals| ApproachMetrics {
            arrived: totals.arrived,
            served: totals.served,
            total_wait: totals.total_wait,
            average_wait: ratio(totals.total_wait as f64, totals.served as f64),
            max_wait: totals.max_wait,
            average_queue_length: ratio(totals.queue_ticks as f64, ticks),
        });

        let served = self.total_served();
        let total_wait: u64 = self.approaches.values().map(|t| t.total_wait).sum();
        let total_transit: u64 = self.approaches.values().map(|t| t.total_transit).sum();
        let queue_ticks: u64 = self.approaches.values().map(|t| t.queue_ticks).sum();

        ScenarioMetrics {
            ticks: self.ticks,
            vehicles_arrived: self.approaches.values().map(|t| t.arrived).sum(),
            vehicles_spawned: self.spawned,
            vehicles_served: served,
            vehicles_pending: pending.count,
            average_wait: ratio(total_wait as f64, served as f64),
            total_wait_including_pending: total_wait + pending.wait,
            vehicles_stopped: pending.stopped,
            vehicles_moving: pending.moving,
            average_transit: ratio(total_transit as f64, served as f64),
            average_queue_length: ratio(queue_ticks as f64, ticks),
            throughput: ratio(served as f64, ticks),
            max_wait: self.approaches.values().map(|t| t.max_wait).max().unwrap_or(0),
            approaches,
        }
    }
}
