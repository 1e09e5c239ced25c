//! Car-following and stop-line behaviour of a single vehicle agent

use intersection_sim::simulation::{
    braking_distance, stopping_speed, Approach, Leader, VehicleAgent, VehicleId, VehicleParams,
};

const EXIT: f64 = 4.0;

fn vehicle(position: f64, velocity: f64) -> VehicleAgent {
    VehicleAgent::new(
        VehicleId(0),
        Approach::North,
        position,
        velocity,
        VehicleParams::default(),
        0,
        0,
        EXIT,
    )
}

#[test]
fn test_stopping_speed_lands_on_limit() {
    assert_eq!(stopping_speed(0.0, 0.5), 0.0);
    assert_eq!(stopping_speed(-3.0, 0.5), 0.0);
    // 1.0 + 0.5 = 1.5: brake from 1.0 in two ticks
    assert!((stopping_speed(1.5, 0.5) - 1.0).abs() < 1e-12);
    // Short distances are covered in one tick and no further
    assert_eq!(stopping_speed(0.3, 0.5), 0.3);
}

#[test]
fn test_braking_distance() {
    assert!((braking_distance(1.0, 0.5) - 0.5).abs() < 1e-12);
    assert_eq!(braking_distance(0.2, 0.5), 0.0);
    assert_eq!(braking_distance(0.0, 0.5), 0.0);
}

#[test]
fn test_free_vehicle_accelerates_to_max_velocity() {
    let params = VehicleParams::default();
    let mut car = vehicle(40.0, 0.0);

    car.advance(0, true, None);
    assert!((car.velocity - params.max_acceleration).abs() < 1e-12);
    assert!((car.position() - (40.0 - params.max_acceleration)).abs() < 1e-12);

    for tick in 1..10 {
        car.advance(tick, true, None);
    }
    assert_eq!(car.velocity, params.max_velocity);
    assert_eq!(car.wait_ticks, 0, "a vehicle pulling away is never waiting");
}

#[test]
fn test_red_light_stops_exactly_at_line() {
    let mut car = vehicle(10.0, 1.0);
    let mut last_position = car.position();

    for tick in 0..30 {
        car.advance(tick, false, None);
        assert!(car.position() >= 0.0, "vehicle overshot the stop line on red");
        assert!(car.position() <= last_position, "vehicle moved backwards");
        last_position = car.position();
    }

    assert!(car.position().abs() < 1e-9);
    assert_eq!(car.velocity, 0.0);
    assert!(car.is_queued());
    assert!(car.stop_line_tick.is_none());
    assert_eq!(car.stop_streak, car.wait_ticks);
}

#[test]
fn test_clamped_stop_when_light_turns_red_at_the_line() {
    // Too close to brake comfortably: the clamp puts it on the line
    let mut car = vehicle(0.3, 1.0);
    car.advance(0, false, None);
    assert_eq!(car.position(), 0.0);
    assert_eq!(car.velocity, 0.3);

    car.advance(1, false, None);
    assert_eq!(car.position(), 0.0);
    assert_eq!(car.velocity, 0.0);
}

#[test]
fn test_follower_keeps_minimum_gap() {
    let params = VehicleParams::default();
    let mut leader = vehicle(0.0, 0.0);
    let mut follower = vehicle(10.0, 1.0);

    for tick in 0..40 {
        leader.advance(tick, false, None);
        follower.advance(tick, false, Some(leader.as_leader()));
        let gap = follower.position() - leader.position();
        assert!(gap >= params.min_gap - 1e-9, "gap {} below minimum", gap);
    }
    assert!((follower.position() - params.min_gap).abs() < 1e-9);
    assert_eq!(follower.velocity, 0.0);
}

#[test]
fn test_follower_never_faster_than_gap_allows() {
    let params = VehicleParams::default();
    let mut follower = vehicle(5.0, 1.0);
    let leader = Leader {
        position: 5.0 - params.min_gap - 0.2,
        velocity: 0.0,
    };
    follower.advance(0, true, Some(leader));
    assert!(follower.velocity <= 0.2 + 1e-12);
    assert!(follower.position() - leader.position >= params.min_gap - 1e-9);
}

#[test]
fn test_crossing_records_stop_line_and_departure() {
    let mut car = vehicle(1.0, 1.0);
    let mut departed_at = None;
    for tick in 0..10 {
        car.advance(tick, true, None);
        if car.has_departed() && departed_at.is_none() {
            departed_at = Some(tick);
        }
    }
    assert_eq!(car.stop_line_tick, Some(1));
    assert_eq!(car.departure_tick, Some(4));
    assert_eq!(departed_at, Some(4));
    assert_eq!(car.transit_ticks(), Some(5));
    assert_eq!(car.wait_ticks, 0);
}

#[test]
fn test_vehicle_past_line_ignores_red() {
    let mut car = vehicle(-0.5, 1.0);
    car.advance(0, false, None);
    assert_eq!(car.position(), -1.5);
    assert_eq!(car.velocity, 1.0);
}

#[test]
fn test_held_arrival_starts_with_wait() {
    let car = VehicleAgent::new(
        VehicleId(7),
        Approach::East,
        40.0,
        0.0,
        VehicleParams::default(),
        10,
        14,
        EXIT,
    );
    assert_eq!(car.spawn_tick, 10);
    assert_eq!(car.wait_ticks, 4);
    assert_eq!(car.longest_stop, 4);
}

#[test]
fn test_entry_speed() {
    let params = VehicleParams::default();
    assert_eq!(
        VehicleAgent::entry_speed(&params, 40.0, None),
        Some(params.max_velocity)
    );
    let blocking = Leader {
        position: 39.0,
        velocity: 0.0,
    };
    assert_eq!(VehicleAgent::entry_speed(&params, 40.0, Some(blocking)), None);
    let close = Leader {
        position: 38.0,
        velocity: 0.0,
    };
    let speed = VehicleAgent::entry_speed(&params, 40.0, Some(close)).unwrap();
    assert!(speed <= 0.5 + 1e-12);
}
