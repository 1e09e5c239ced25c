//! Vehicle agent and car-following logic
//!
//! Positions are distances to the stop line: they shrink while a vehicle
//! approaches, reach zero at the line and go negative inside the
//! intersection. Kinematics are linear: speed changes by at most the
//! acceleration per tick, braking is planned with a constant deceleration,
//! and a hard clamp keeps a vehicle from passing a red stop line or closing
//! inside the minimum gap.

use ordered_float::OrderedFloat;

use super::config::VehicleParams;
use super::types::{Approach, VehicleId};

/// Largest speed from which a vehicle can still stop within `distance`,
/// counting this tick's travel and braking by `deceleration` afterwards.
///
/// Solves `v + (v - b) + (v - 2b) + ... <= distance` and never exceeds
/// `distance` itself, so a vehicle obeying it lands exactly on its limit.
pub fn stopping_speed(distance: f64, deceleration: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let steps = ((1.0 + 8.0 * distance / deceleration).sqrt() - 1.0) / 2.0;
    distance.min(deceleration * steps)
}

/// Distance covered after the current tick while braking from `velocity`
pub fn braking_distance(velocity: f64, deceleration: f64) -> f64 {
    (velocity * (velocity / deceleration - 1.0) / 2.0).max(0.0)
}

/// State of the vehicle directly ahead, already updated for this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leader {
    pub position: f64,
    pub velocity: f64,
}

/// A single car on one approach
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleAgent {
    pub id: VehicleId,
    pub approach: Approach,
    pub position: OrderedFloat<f64>,
    pub velocity: f64,
    pub params: VehicleParams,
    /// Tick the vehicle's demand arrived, which may precede lane entry
    pub spawn_tick: u64,
    /// First tick the vehicle was past the stop line
    pub stop_line_tick: Option<u64>,
    /// Tick the vehicle cleared the far boundary
    pub departure_tick: Option<u64>,
    /// Ticks spent below the waiting velocity
    pub wait_ticks: u64,
    /// Length of the current run of waiting ticks
    pub stop_streak: u64,
    /// Longest single run of waiting ticks
    pub longest_stop: u64,
    exit_distance: f64,
}

impl VehicleAgent {
    /// Create a vehicle entering its lane at `position`.
    ///
    /// A vehicle whose arrival was held outside a full lane starts with the
    /// ticks it already spent waiting.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: VehicleId,
        approach: Approach,
        position: f64,
        velocity: f64,
        params: VehicleParams,
        arrival_tick: u64,
        entry_tick: u64,
        exit_distance: f64,
    ) -> Self {
        let held = entry_tick.saturating_sub(arrival_tick);
        Self {
            id,
            approach,
            position: OrderedFloat(position),
            velocity: velocity.clamp(0.0, params.max_velocity),
            params,
            spawn_tick: arrival_tick,
            stop_line_tick: None,
            departure_tick: None,
            wait_ticks: held,
            stop_streak: held,
            longest_stop: held,
            exit_distance,
        }
    }

    pub fn position(&self) -> f64 {
        self.position.into_inner()
    }

    pub fn as_leader(&self) -> Leader {
        Leader {
            position: self.position(),
            velocity: self.velocity,
        }
    }

    /// Still before (or on) the stop line
    pub fn is_before_stop_line(&self) -> bool {
        self.position() >= 0.0
    }

    pub fn is_waiting(&self) -> bool {
        self.velocity < self.params.wait_velocity()
    }

    /// Stopped behind the stop line
    pub fn is_queued(&self) -> bool {
        self.is_before_stop_line() && self.is_waiting()
    }

    pub fn has_departed(&self) -> bool {
        self.departure_tick.is_some()
    }

    /// Ticks between arrival and departure
    pub fn transit_ticks(&self) -> Option<u64> {
        self.departure_tick
            .map(|departed| departed.saturating_sub(self.spawn_tick) + 1)
    }

    /// Speed a vehicle may enter with when `tail` is the last vehicle in the
    /// lane, or `None` when the entry is still blocked.
    pub fn entry_speed(params: &VehicleParams, entry: f64, tail: Option<Leader>) -> Option<f64> {
        let Some(tail) = tail else {
            return Some(params.max_velocity);
        };
        let gap = entry - tail.position - params.min_gap;
        if gap < 0.0 {
            return None;
        }
        let anticipated = stopping_speed(
            gap + braking_distance(tail.velocity, params.deceleration),
            params.deceleration,
        );
        Some(params.max_velocity.min(gap).min(anticipated))
    }

    /// Advance one tick.
    ///
    /// `green` tells whether this vehicle's approach has right of way; the
    /// leader must already have been advanced for this tick.
    pub fn advance(&mut self, tick: u64, green: bool, leader: Option<Leader>) {
        let params = self.params;
        let position = self.position();

        let mut velocity = (self.velocity + params.max_acceleration).min(params.max_velocity);

        if !green && position >= 0.0 {
            velocity = velocity.min(stopping_speed(position, params.deceleration));
        }

        if let Some(leader) = leader {
            let gap = position - leader.position - params.min_gap;
            let anticipated = stopping_speed(
                gap + braking_distance(leader.velocity, params.deceleration),
                params.deceleration,
            );
            velocity = velocity.min(gap.max(0.0)).min(anticipated);
        }

        let velocity = velocity.max(0.0);
        self.velocity = velocity;
        self.position = OrderedFloat(position - velocity);

        if self.is_waiting() {
            self.wait_ticks += 1;
            self.stop_streak += 1;
            self.longest_stop = self.longest_stop.max(self.stop_streak);
        } else {
            self.stop_streak = 0;
        }

        if self.stop_line_tick.is_none() && self.position() < 0.0 {
            self.stop_line_tick = Some(tick);
        }
        if self.departure_tick.is_none() && self.position() <= -self.exit_distance {
            self.departure_tick = Some(tick);
        }
    }
}
