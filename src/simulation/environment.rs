//! The intersection environment that ties everything together
//!
//! Owns one lane per approach, the signal controller, the arrival processes
//! and the random generator, and advances them in a fixed order every tick.

use std::collections::VecDeque;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::{ConfigurationError, ScenarioConfig};
use super::metrics::{MetricsAccumulator, PendingVehicles, ScenarioMetrics, TickMetrics};
use super::signal::{ApproachDemand, Demand, PhaseState, SignalController};
use super::types::{Approach, ApproachMap, VehicleId};
use super::vehicle::{Leader, VehicleAgent};

/// Read-only view of one vehicle for renderers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub approach: Approach,
    pub position: f64,
    pub velocity: f64,
}

/// Read-only view of the whole intersection after a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tick: u64,
    pub phase: PhaseState,
    pub green: ApproachMap<bool>,
    pub vehicles: Vec<VehicleSnapshot>,
    /// Arrivals held outside each approach because its entry is occupied
    pub held: ApproachMap<usize>,
    /// Lane vehicles below the waiting velocity
    pub stopped: usize,
    pub moving: usize,
}

/// A single signalized intersection under one scenario
pub struct IntersectionEnvironment {
    config: ScenarioConfig,
    controller: SignalController,
    /// Vehicles per approach, front-most first
    lanes: ApproachMap<Vec<VehicleAgent>>,
    /// Arrival ticks of vehicles waiting to enter each lane
    backlog: ApproachMap<VecDeque<u64>>,
    rng: StdRng,
    /// Generator state at construction, restored by `reset`
    initial_rng: StdRng,
    tick: u64,
    next_id: usize,
    arrived: usize,
    metrics: MetricsAccumulator,
}

impl IntersectionEnvironment {
    /// Build an environment, seeding its generator from the configuration
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigurationError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                warn!(
                    "Scenario '{}' has no seed; arrivals will not be reproducible",
                    config.name
                );
                StdRng::from_os_rng()
            }
        };
        Self::with_rng(config, rng)
    }

    /// Build an environment that draws arrivals from `rng`
    pub fn with_rng(config: ScenarioConfig, rng: StdRng) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let controller = SignalController::new(&config.controller)?;
        Ok(Self {
            config,
            controller,
            lanes: ApproachMap::default(),
            backlog: ApproachMap::default(),
            initial_rng: rng.clone(),
            rng,
            tick: 0,
            next_id: 0,
            arrived: 0,
            metrics: MetricsAccumulator::new(),
        })
    }

    /// Start the run over with the same configuration and generator state.
    ///
    /// An injected or OS-seeded generator replays the same arrivals too.
    pub fn reset(&mut self) -> Result<(), ConfigurationError> {
        *self = Self::with_rng(self.config.clone(), self.initial_rng.clone())?;
        Ok(())
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase(&self) -> PhaseState {
        self.controller.state()
    }

    pub fn controller(&self) -> &SignalController {
        &self.controller
    }

    pub fn lane(&self, approach: Approach) -> &[VehicleAgent] {
        &self.lanes[approach]
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &VehicleAgent> {
        self.lanes.values().flat_map(|lane| lane.iter())
    }

    pub fn vehicle_count(&self) -> usize {
        self.lanes.values().map(Vec::len).sum()
    }

    /// Arrivals still held at each lane entry
    pub fn held(&self) -> ApproachMap<usize> {
        self.backlog.map(|_, held| held.len())
    }

    pub fn is_finished(&self) -> bool {
        self.tick >= self.config.ticks
    }

    pub fn snapshot(&self) -> Snapshot {
        let pending = self.pending();
        Snapshot {
            tick: self.tick,
            phase: self.controller.state(),
            green: self.controller.green_approaches(),
            vehicles: self
                .vehicles()
                .map(|vehicle| VehicleSnapshot {
                    id: vehicle.id,
                    approach: vehicle.approach,
                    position: vehicle.position(),
                    velocity: vehicle.velocity,
                })
                .collect(),
            held: self.held(),
            stopped: pending.stopped,
            moving: pending.moving,
        }
    }

    /// Vehicles not yet served, with the waiting they have done so far
    pub fn pending(&self) -> PendingVehicles {
        let stopped = self.vehicles().filter(|v| v.is_waiting()).count();
        let lane_wait: u64 = self.vehicles().map(|v| v.wait_ticks).sum();
        let held_wait: u64 = self
            .backlog
            .values()
            .flatten()
            .map(|&arrival| self.tick.saturating_sub(arrival))
            .sum();
        PendingVehicles {
            count: self.vehicle_count() + self.held().values().sum::<usize>(),
            wait: lane_wait + held_wait,
            stopped,
            moving: self.vehicle_count() - stopped,
        }
    }

    /// Summary of the run so far
    pub fn metrics(&self) -> ScenarioMetrics {
        self.metrics.summarize(self.pending())
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self) -> TickMetrics {
        let tick = self.tick;

        let arrivals = self.spawn_arrivals(tick);

        let demand = self.observe_demand(tick);
        let phase = self.controller.tick(&demand);
        let green = self.controller.green_approaches();

        // Front to back, so every follower reacts to its leader's new state
        for (approach, lane) in self.lanes.iter_mut() {
            let mut leader: Option<Leader> = None;
            for vehicle in lane.iter_mut() {
                vehicle.advance(tick, green[approach], leader);
                leader = Some(vehicle.as_leader());
            }
        }

        let departures = self.remove_departed();

        let tick_metrics = TickMetrics {
            tick,
            phase,
            green,
            queue_lengths: demand.map(|_, d| d.queue_length),
            arrivals,
            departures,
        };
        self.metrics.record_tick(&tick_metrics);
        self.tick += 1;
        tick_metrics
    }

    /// Step `num_ticks` times and summarise everything run so far
    pub fn run(&mut self, num_ticks: u64) -> ScenarioMetrics {
        for _ in 0..num_ticks {
            self.step();
        }
        let metrics = self.metrics();
        info!(
            "Scenario '{}' ({}) after {} ticks: served={}, avg wait={:.2}, throughput={:.3}",
            self.config.name,
            self.controller.kind(),
            metrics.ticks,
            metrics.vehicles_served,
            metrics.average_wait,
            metrics.throughput
        );
        let held: usize = self.held().values().sum();
        if held > 0 {
            warn!(
                "Scenario '{}' ended with {} arrivals held outside full lanes",
                self.config.name, held
            );
        }
        metrics
    }

    /// Run until the configured tick count is reached
    pub fn run_to_completion(&mut self) -> ScenarioMetrics {
        let remaining = self.config.ticks.saturating_sub(self.tick);
        self.run(remaining)
    }

    fn arrivals_open(&self) -> bool {
        self.config
            .max_vehicles
            .is_none_or(|max_vehicles| self.arrived < max_vehicles)
    }

    /// Draw arrivals per approach and admit held vehicles whose lane entry
    /// has room. At most one vehicle enters a lane per tick.
    fn spawn_arrivals(&mut self, tick: u64) -> ApproachMap<usize> {
        let mut arrivals = ApproachMap::splat(0);
        let params = self.config.vehicle;
        let entry = self.config.geometry.approach_length;
        let exit_distance = self.config.geometry.intersection_width;

        for approach in Approach::ALL {
            if self.arrivals_open()
                && self.config.arrivals[approach].arrives(tick, &mut self.rng)
            {
                self.backlog[approach].push_back(tick);
                self.arrived += 1;
                arrivals[approach] += 1;
            }

            let Some(&arrival_tick) = self.backlog[approach].front() else {
                continue;
            };
            let tail = self.lanes[approach].last().map(VehicleAgent::as_leader);
            let Some(speed) = VehicleAgent::entry_speed(&params, entry, tail) else {
                debug!(
                    "Entry on {} blocked at tick {}, {} arrivals held",
                    approach,
                    tick,
                    self.backlog[approach].len()
                );
                continue;
            };

            self.backlog[approach].pop_front();
            let id = VehicleId(self.next_id);
            self.next_id += 1;
            self.lanes[approach].push(VehicleAgent::new(
                id,
                approach,
                entry,
                speed,
                params,
                arrival_tick,
                tick,
                exit_distance,
            ));
            self.metrics.record_spawn();
        }
        arrivals
    }

    fn observe_demand(&self, tick: u64) -> Demand {
        let detection_range = self.config.geometry.detection_range;
        ApproachMap::from_fn(|approach| {
            let lane = &self.lanes[approach];
            let held = &self.backlog[approach];

            let queued = lane.iter().filter(|v| v.is_queued());
            let detected = lane
                .iter()
                .filter(|v| {
                    v.is_before_stop_line() && (v.position() <= detection_range || v.is_waiting())
                })
                .count();
            let max_wait = queued
                .clone()
                .map(|v| v.stop_streak)
                .chain(held.front().map(|&arrival| tick - arrival))
                .max()
                .unwrap_or(0);

            ApproachDemand {
                queue_length: queued.count() + held.len(),
                detected: detected + held.len(),
                max_wait,
            }
        })
    }

    /// Drop vehicles past the far boundary, folding them into the metrics.
    ///
    /// Lanes never reorder, so departed vehicles are always at the front.
    fn remove_departed(&mut self) -> ApproachMap<usize> {
        let mut departures = ApproachMap::splat(0);
        for (approach, lane) in self.lanes.iter_mut() {
            debug_assert!(
                lane.is_sorted_by_key(|v| v.position),
                "{} lane out of order",
                approach
            );
            let departed = lane.iter().take_while(|v| v.has_departed()).count();
            for vehicle in lane.drain(..departed) {
                self.metrics.record_departure(&vehicle);
            }
            departures[approach] = departed;
        }
        departures
    }
}
