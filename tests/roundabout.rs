use junction_sim::{
    config::{RoundaboutLayout, SimulationConfig, VehicleParams},
    control::{Control, ControlKind, RightOfWay, Roundabout, ENTRY_CONFIRMATION_MS},
    geometry::{distance, Direction, Point},
    simulation::{advance_vehicles, Neighbors, Vehicle, VehicleId, VehicleState},
};

const TICK_MS: f32 = 25.0;

fn vehicle_at(id: u64, x: f32, y: f32) -> Vehicle {
    Vehicle::new(
        VehicleId(id),
        vec![Point::new(x, y), Point::new(0.0, 0.0)],
        Direction::North,
        Direction::South,
        2.0,
        &VehicleParams::default(),
    )
}

fn radius(point: &Point) -> f32 {
    distance(point, &Point::origin())
}

#[test]
fn test_entrant_waits_for_gap_then_confirms() {
    let mut roundabout = Roundabout::new(&RoundaboutLayout::default());

    let mut circulating = vec![vehicle_at(2, 5.0, -64.0)];
    circulating[0].circulating = true;
    assert!(roundabout.register(circulating[0].id));

    let mut candidate = vehicle_at(1, 11.0, -78.0);

    // Conflict persists: held every tick with the timer reset
    for _ in 0..3 {
        let neighbors = Neighbors::of(&circulating);
        assert!(roundabout.has_conflicting_vehicle(&candidate, &neighbors));
        assert!(!roundabout.can_proceed(&mut candidate, &neighbors, TICK_MS));
        assert_eq!(candidate.state, VehicleState::Waiting);
        assert_eq!(candidate.commit_timer, 0.0);
        assert!(!roundabout.is_registered(candidate.id));
    }

    // Gap opens
    circulating[0].position = Point::new(60.0, 0.0);
    let neighbors = Neighbors::of(&circulating);
    assert!(!roundabout.has_conflicting_vehicle(&candidate, &neighbors));

    // Confirming: free to roll, not yet registered
    assert!(roundabout.can_proceed(&mut candidate, &neighbors, TICK_MS));
    assert_eq!(candidate.commit_timer, TICK_MS);
    assert_eq!(candidate.state, VehicleState::Driving);
    assert!(!roundabout.is_registered(candidate.id));
    assert!(!candidate.circulating);

    assert!(roundabout.can_proceed(&mut candidate, &neighbors, TICK_MS));
    assert!(candidate.commit_timer >= ENTRY_CONFIRMATION_MS);
    assert!(roundabout.is_registered(candidate.id));
    assert!(candidate.circulating);
    assert!(candidate.committed);
    assert_eq!(candidate.state, VehicleState::InControlledZone);
    assert_eq!(roundabout.circulating_count(), 2);
}

#[test]
fn test_conflict_resets_partial_confirmation() {
    let mut roundabout = Roundabout::new(&RoundaboutLayout::default());
    let mut candidate = vehicle_at(1, 11.0, -78.0);

    let mut others = vec![vehicle_at(2, 60.0, 0.0)];
    others[0].circulating = true;
    roundabout.register(others[0].id);

    assert!(roundabout.can_proceed(&mut candidate, &Neighbors::of(&others), 40.0));
    assert_eq!(candidate.commit_timer, 40.0);

    others[0].position = Point::new(5.0, -64.0);
    assert!(!roundabout.can_proceed(&mut candidate, &Neighbors::of(&others), 40.0));
    assert_eq!(candidate.commit_timer, 0.0);
}

#[test]
fn test_ring_traffic_near_the_merge_blocks_entry() {
    let mut roundabout = Roundabout::new(&RoundaboutLayout::default());
    let candidate = vehicle_at(1, 11.0, -78.0);

    // On the outer lane just upstream of where the entrant joins it
    let mut ring = vec![vehicle_at(2, 0.0, -60.0)];
    ring[0].circulating = true;
    roundabout.register(ring[0].id);
    assert!(distance(&candidate.position, &ring[0].position) > 18.0);
    assert!(roundabout.has_conflicting_vehicle(&candidate, &Neighbors::of(&ring)));

    // Already outside the ring on the neighbouring exit lane
    ring[0].position = Point::new(-11.0, -76.0);
    assert!(!roundabout.has_conflicting_vehicle(&candidate, &Neighbors::of(&ring)));

    // Far round the ring
    ring[0].position = Point::new(-60.0, 0.0);
    assert!(!roundabout.has_conflicting_vehicle(&candidate, &Neighbors::of(&ring)));
}

#[test]
fn test_lone_vehicle_crosses_without_waiting() {
    let mut control = Control::new(ControlKind::Roundabout, &SimulationConfig::default());

    for exit in [Direction::East, Direction::South, Direction::West] {
        let path = control.generate_path(Direction::North, exit);
        let mut vehicles = vec![Vehicle::new(
            VehicleId(1),
            path,
            Direction::North,
            exit,
            2.0,
            &VehicleParams::default(),
        )];

        let mut registered = false;
        for _ in 0..1_000 {
            advance_vehicles(&mut vehicles, 16.0, &mut control);
            registered |= vehicles[0].circulating;
            if vehicles[0].completed {
                break;
            }
        }

        assert!(vehicles[0].completed, "north -> {:?} stuck at {:?}", exit, vehicles[0].position);
        assert!(registered);
        assert_eq!(vehicles[0].wait_time, 0.0);
        assert_eq!(control.as_roundabout().map(|r| r.circulating_count()), Some(0));
    }
}

#[test]
fn test_unregistered_vehicles_do_not_conflict() {
    let roundabout = Roundabout::new(&RoundaboutLayout::default());
    let candidate = vehicle_at(1, 11.0, -78.0);

    // Close by, but neither registered nor circulating
    let others = vec![vehicle_at(2, 5.0, -64.0)];
    assert!(!roundabout.has_conflicting_vehicle(&candidate, &Neighbors::of(&others)));
}

#[test]
fn test_circulating_vehicle_unregisters_on_exit() {
    let mut roundabout = Roundabout::new(&RoundaboutLayout::default());
    let neighbors = Neighbors::of(&[]);

    let mut vehicle = vehicle_at(1, 0.0, -60.0);
    assert!(roundabout.can_proceed(&mut vehicle, &neighbors, TICK_MS));
    assert!(vehicle.circulating);
    assert!(roundabout.is_registered(vehicle.id));

    // Still inside the exit margin
    vehicle.position = Point::new(0.0, 74.0);
    assert!(roundabout.can_proceed(&mut vehicle, &neighbors, TICK_MS));
    assert!(roundabout.is_registered(vehicle.id));

    vehicle.position = Point::new(11.0, 84.0);
    assert!(roundabout.can_proceed(&mut vehicle, &neighbors, TICK_MS));
    assert!(!roundabout.is_registered(vehicle.id));
    assert!(!vehicle.circulating);
    assert_eq!(vehicle.state, VehicleState::Driving);

    // Back inside the yield band, but already through the ring
    vehicle.position = Point::new(11.0, 78.0);
    assert!(roundabout.can_proceed(&mut vehicle, &neighbors, TICK_MS));
    assert!(!roundabout.is_registered(vehicle.id));
    assert_eq!(roundabout.circulating_count(), 0);
}

#[test]
fn test_release_departed_sweeps_registry() {
    let mut roundabout = Roundabout::new(&RoundaboutLayout::default());

    let mut vehicles = vec![vehicle_at(1, 0.0, -90.0), vehicle_at(2, 40.0, 0.0)];
    for vehicle in vehicles.iter_mut() {
        vehicle.circulating = true;
        roundabout.register(vehicle.id);
    }

    roundabout.release_departed(&mut vehicles);

    assert!(!roundabout.is_registered(VehicleId(1)));
    assert!(!vehicles[0].circulating);
    assert!(roundabout.is_registered(VehicleId(2)));
    assert!(vehicles[1].circulating);

    roundabout.release(&mut vehicles[1]);
    assert_eq!(roundabout.circulating_count(), 0);
}

#[test]
fn test_registry_holds_each_id_once() {
    let mut roundabout = Roundabout::new(&RoundaboutLayout::default());

    assert!(roundabout.register(VehicleId(7)));
    assert!(!roundabout.register(VehicleId(7)));
    assert_eq!(roundabout.circulating_count(), 1);

    assert!(roundabout.unregister(VehicleId(7)));
    assert!(!roundabout.unregister(VehicleId(7)));
    assert!(!roundabout.unregister(VehicleId(99)));
    assert_eq!(roundabout.circulating_ids().count(), 0);
}

#[test]
fn test_exit_numbers_run_clockwise() {
    assert_eq!(Roundabout::exit_number(Direction::North, Direction::East), 1);
    assert_eq!(Roundabout::exit_number(Direction::North, Direction::South), 2);
    assert_eq!(Roundabout::exit_number(Direction::North, Direction::West), 3);
    assert_eq!(Roundabout::exit_number(Direction::North, Direction::North), 4);
    assert_eq!(Roundabout::exit_number(Direction::West, Direction::North), 1);
    assert_eq!(Roundabout::exit_number(Direction::South, Direction::East), 3);
}

#[test]
fn test_first_exit_uses_outer_lane() {
    let roundabout = Roundabout::new(&RoundaboutLayout::default());
    let path = roundabout.generate_path(Direction::North, Direction::East);

    assert!((path[0] - Point::new(11.0, -150.0)).norm() < 1e-3);
    assert!((path[1] - Point::new(11.0, -78.0)).norm() < 1e-3);

    let ring = &path[2..path.len() - 2];
    assert!(ring.len() >= 3);
    for point in ring {
        assert!((radius(point) - 60.0).abs() < 1e-3);
    }
    // Joins and leaves the ring where the arm lanes meet it
    let along = (60.0f32.powi(2) - 11.0f32.powi(2)).sqrt();
    assert!((ring[0] - Point::new(11.0, -along)).norm() < 1e-3);
    assert!((ring[ring.len() - 1] - Point::new(along, -11.0)).norm() < 1e-3);

    assert!((path[path.len() - 2] - Point::new(78.0, -11.0)).norm() < 1e-3);
    assert!((path[path.len() - 1] - Point::new(150.0, -11.0)).norm() < 1e-3);
}

#[test]
fn test_longer_trips_change_lanes_before_exit() {
    let roundabout = Roundabout::new(&RoundaboutLayout::default());

    for entry in Direction::ALL {
        for offset in 2..=4 {
            let exit = entry.clockwise(offset);
            let path = roundabout.generate_path(entry, exit);
            let ring = &path[2..path.len() - 2];

            // Inner lane first, outer lane at the end, never back
            assert!((radius(&ring[0]) - 40.0).abs() < 1e-3, "{:?} -> {:?}", entry, exit);
            assert!((radius(&ring[ring.len() - 1]) - 60.0).abs() < 1e-3);
            let switch = ring
                .iter()
                .position(|p| (radius(p) - 60.0).abs() < 1e-3)
                .unwrap_or(ring.len());
            assert!(ring[..switch].iter().all(|p| (radius(p) - 40.0).abs() < 1e-3));
            assert!(ring[switch..].iter().all(|p| (radius(p) - 60.0).abs() < 1e-3));

            // Clockwise progression, less than half a turn per segment
            for pair in ring.windows(2) {
                let (a, b) = (pair[0].coords, pair[1].coords);
                let cross = a.x * b.y - a.y * b.x;
                assert!(cross > 0.0, "{:?} -> {:?}: {:?}", entry, exit, pair);
            }

            let last = path[path.len() - 1];
            assert!((last.coords.dot(&exit.arm()) - 150.0).abs() < 1e-3);
            assert!((last.coords.dot(&exit.lane_side()) + 11.0).abs() < 1e-3);
        }
    }
}
