use pasture_core::{
    ControlCommand, PastureConfig, Position, Tick, WorldState, apply_control_command, distance,
};
use std::time::Duration;

fn empty_field_config() -> PastureConfig {
    PastureConfig {
        wolf_count: 0,
        sheep_count: 0,
        forage_rate: 0.0,
        rng_seed: Some(0x5EED),
        ..PastureConfig::default()
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[test]
fn world_populates_from_config() {
    let config = PastureConfig {
        wolf_count: 4,
        sheep_count: 7,
        rng_seed: Some(42),
        ..PastureConfig::default()
    };
    let world = WorldState::new(config.clone()).expect("world");

    assert_eq!(world.wolves().len(), 4);
    assert_eq!(world.sheep().len(), 7);
    assert_eq!(world.dogs().len(), 1);
    assert!(world.forage().is_empty());
    assert_eq!(world.tick(), Tick::zero());
    assert!(!world.is_running());

    let home = config.home();
    let dog = world.dogs().values().next().expect("dog");
    assert_eq!(dog.body.position, home);
    assert!(!dog.returning_home);

    let field = config.field_size;
    for wolf in world.wolves().values() {
        assert!((0.0..=field).contains(&wolf.body.position.x));
        assert!((0.0..=field).contains(&wolf.body.position.y));
    }
}

#[test]
fn seeded_worlds_advance_identically() {
    let config = PastureConfig {
        wolf_count: 5,
        sheep_count: 10,
        forage_rate: 0.5,
        rng_seed: Some(0xDEADBEEF),
        ..PastureConfig::default()
    };
    let mut world_a = WorldState::new(config.clone()).expect("world_a");
    let mut world_b = WorldState::new(config).expect("world_b");

    for frame in 0..32u64 {
        world_a.step_at(millis(frame * 16));
        world_b.step_at(millis(frame * 16));
    }

    assert_eq!(world_a.tick(), Tick(32));
    assert_eq!(world_a.snapshot(), world_b.snapshot());
}

#[test]
fn caught_sheep_is_removed_without_acting() {
    let mut world = WorldState::new(empty_field_config()).expect("world");
    world.spawn_wolf(Position::new(100.0, 100.0));
    world.spawn_sheep(Position::new(105.0, 100.0));
    world.spawn_sheep(Position::new(200.0, 200.0));

    let events = world.step_at(millis(16));
    assert_eq!(events.sheep_eaten, 1);
    assert_eq!(world.sheep().len(), 1);
    let survivor = world.sheep().values().next().expect("survivor");
    assert!(distance(survivor.body.position, Position::new(200.0, 200.0)) < 1.0);

    // The next tick's snapshot no longer contains the eaten sheep.
    assert_eq!(world.snapshot().sheep.len(), 1);
}

#[test]
fn forage_spawn_is_a_per_tick_bernoulli_trial() {
    let mut always = WorldState::new(PastureConfig {
        forage_rate: 1.0,
        ..empty_field_config()
    })
    .expect("world");
    for frame in 0..20u64 {
        let events = always.step_at(millis(frame * 16));
        assert!(events.forage_spawned.is_some());
    }
    assert_eq!(always.forage().len(), 20);

    let mut never = WorldState::new(empty_field_config()).expect("world");
    for frame in 0..20u64 {
        let events = never.step_at(millis(frame * 16));
        assert!(events.forage_spawned.is_none());
    }
    assert!(never.forage().is_empty());
}

#[test]
fn grazed_forage_is_removed() {
    let mut world = WorldState::new(empty_field_config()).expect("world");
    world.spawn_sheep(Position::new(50.0, 50.0));
    world.spawn_forage(Position::new(55.0, 50.0));
    world.spawn_forage(Position::new(400.0, 400.0));

    let events = world.step_at(millis(16));
    assert_eq!(events.forage_grazed, 1);
    assert_eq!(world.forage().len(), 1);
}

#[test]
fn sheep_closes_in_on_visible_forage() {
    let mut world = WorldState::new(PastureConfig {
        sheep_view_radius: 200.0,
        ..empty_field_config()
    })
    .expect("world");
    let id = world.spawn_sheep(Position::new(0.0, 0.0));
    world.spawn_forage(Position::new(100.0, 100.0));

    let target = Position::new(100.0, 100.0);
    let before = distance(world.sheep()[id].body.position, target);
    world.step_at(millis(16));
    let after = distance(world.sheep()[id].body.position, target);
    assert!(after < before);
}

#[test]
fn dog_without_wolves_stays_at_home() {
    let mut world = WorldState::new(empty_field_config()).expect("world");
    let home = world.config().home();

    for frame in 0..10u64 {
        world.step_at(millis(frame * 16));
        let dog = world.dogs().values().next().expect("dog");
        assert!(distance(dog.body.position, home) < world.config().capture_radius);
        assert!(!dog.returning_home);
    }
}

#[test]
fn timeout_recalls_dog_from_a_chase() {
    let mut world = WorldState::new(empty_field_config()).expect("world");
    world.spawn_wolf(Position::new(0.0, 300.0));
    let dog_id = world.dogs().keys().next().expect("dog id");
    world.dogs_mut()[dog_id].body.position = Position::new(100.0, 300.0);
    let home = world.config().home();

    // Within the grace period the dog chases the wolf (heading -x).
    let events = world.step_at(millis(100));
    assert!(!events.dog_recalled);
    assert!(world.dogs()[dog_id].body.velocity.vx < 0.0);
    assert!(!world.dogs()[dog_id].returning_home);

    // Past the 5 s timeout the recall overrides the chase (heading +x).
    let events = world.step_at(millis(5_100));
    assert!(events.dog_recalled);
    assert!(world.dogs()[dog_id].returning_home);
    assert!(world.dogs()[dog_id].body.velocity.vx > 0.0);

    // The flag holds on subsequent ticks while the dog is still out.
    world.step_at(millis(5_200));
    assert!(world.dogs()[dog_id].returning_home);

    // Reaching home clears the flag and re-anchors the timer.
    world.dogs_mut()[dog_id].body.position = Position::new(home.x - 5.0, home.y);
    world.step_at(millis(5_300));
    assert!(!world.dogs()[dog_id].returning_home);
    assert_eq!(world.last_home_touch(), millis(5_300));

    // With the timer fresh, the dog is free to chase again.
    world.dogs_mut()[dog_id].body.position = Position::new(100.0, 300.0);
    world.step_at(millis(5_400));
    assert!(world.dogs()[dog_id].body.velocity.vx < 0.0);
    assert!(!world.dogs()[dog_id].returning_home);
}

#[test]
fn wolf_keeps_clear_of_the_dog() {
    let mut world = WorldState::new(empty_field_config()).expect("world");
    let wolf_id = world.spawn_wolf(Position::new(330.0, 300.0));
    // The dog sits at home (300, 300), well inside the wolf's view radius.

    world.step_at(millis(16));
    let wolf = &world.wolves()[wolf_id];
    let dog = world.dogs().values().next().expect("dog");
    let away_x = wolf.body.position.x - dog.body.position.x;
    let away_y = wolf.body.position.y - dog.body.position.y;
    let dot = wolf.body.velocity.vx * away_x + wolf.body.velocity.vy * away_y;
    assert!(dot > 0.0);
}

#[test]
fn positions_stay_inside_the_field() {
    let config = PastureConfig {
        wolf_count: 6,
        sheep_count: 12,
        forage_rate: 0.2,
        wolf_speed: 25.0,
        sheep_speed: 25.0,
        dog_speed: 25.0,
        rng_seed: Some(99),
        ..PastureConfig::default()
    };
    let field = config.field_size;
    let mut world = WorldState::new(config).expect("world");

    for frame in 0..200u64 {
        world.step_at(millis(frame * 16));
    }
    let snapshot = world.snapshot();
    for view in snapshot
        .wolves
        .iter()
        .map(|v| v.position)
        .chain(snapshot.sheep.iter().map(|v| v.position))
        .chain(snapshot.dogs.iter().map(|v| v.position))
    {
        assert!((0.0..=field).contains(&view.x), "x out of field: {view:?}");
        assert!((0.0..=field).contains(&view.y), "y out of field: {view:?}");
    }
}

#[test]
fn speed_edits_apply_without_repopulation() {
    let mut world = WorldState::new(PastureConfig {
        wolf_count: 2,
        rng_seed: Some(7),
        ..PastureConfig::default()
    })
    .expect("world");
    let ids: Vec<_> = world.wolves().keys().collect();

    apply_control_command(&mut world, ControlCommand::SetWolfSpeed(0.2)).expect("command");
    assert_eq!(world.config().wolf_speed, 0.2);
    // Same wolves survive the edit; the new speed lands on the next tick.
    for id in &ids {
        assert!(world.wolves().contains_key(*id));
    }
    world.step_at(millis(16));
    for id in &ids {
        assert_eq!(world.wolves()[*id].body.speed, 0.2);
    }
}

#[test]
fn count_edits_rebuild_the_population() {
    let mut world = WorldState::new(PastureConfig {
        wolf_count: 2,
        sheep_count: 3,
        rng_seed: Some(7),
        ..PastureConfig::default()
    })
    .expect("world");
    world.spawn_forage(Position::new(10.0, 10.0));

    apply_control_command(&mut world, ControlCommand::SetSheepCount(9)).expect("command");
    assert_eq!(world.sheep().len(), 9);
    assert_eq!(world.wolves().len(), 2);
    assert!(world.forage().is_empty());
}

#[test]
fn invalid_control_values_are_rejected_atomically() {
    let mut world = WorldState::new(PastureConfig::default()).expect("world");
    let before = world.config().clone();

    assert!(apply_control_command(&mut world, ControlCommand::SetForageRate(2.0)).is_err());
    assert!(apply_control_command(&mut world, ControlCommand::SetWolfViewRadius(-1.0)).is_err());
    assert!(apply_control_command(&mut world, ControlCommand::SetDogSpeed(f32::NAN)).is_err());
    assert_eq!(world.config(), &before);
}

#[test]
fn reset_stops_the_run_and_rebuilds() {
    let mut world = WorldState::new(PastureConfig {
        rng_seed: Some(3),
        ..PastureConfig::default()
    })
    .expect("world");
    world.set_running(true);
    world.step_at(millis(16));
    world.spawn_forage(Position::new(10.0, 10.0));

    apply_control_command(&mut world, ControlCommand::Reset).expect("command");
    assert!(!world.is_running());
    assert!(world.forage().is_empty());
    assert_eq!(world.dogs().len(), 1);
}

#[test]
fn starting_a_run_reanchors_the_recall_timer() {
    let mut world = WorldState::new(empty_field_config()).expect("world");
    world.spawn_wolf(Position::new(0.0, 0.0));
    let dog_id = world.dogs().keys().next().expect("dog id");

    // Last home touch lands at 2 s; then the dog is moved out on a chase.
    world.step_at(millis(2_000));
    world.dogs_mut()[dog_id].body.position = Position::new(200.0, 200.0);
    world.step_at(millis(6_000));
    assert_eq!(world.last_home_touch(), millis(2_000));

    // Starting at clock 6 s re-anchors the window, so a tick at 10 s still
    // chases; without the re-anchor 8 s away from home would have recalled.
    world.set_running(true);
    assert_eq!(world.last_home_touch(), millis(6_000));
    world.dogs_mut()[dog_id].body.position = Position::new(200.0, 200.0);
    let events = world.step_at(millis(10_000));
    assert!(!events.dog_recalled);
    assert!(!world.dogs()[dog_id].returning_home);
}

#[test]
fn history_is_bounded_and_ordered() {
    let mut world = WorldState::new(PastureConfig {
        history_capacity: 8,
        ..empty_field_config()
    })
    .expect("world");

    for frame in 0..20u64 {
        world.step_at(millis(frame * 16));
    }
    let summaries: Vec<_> = world.history().collect();
    assert_eq!(summaries.len(), 8);
    assert_eq!(summaries.first().expect("first").tick, Tick(13));
    assert_eq!(summaries.last().expect("last").tick, Tick(20));
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut world = WorldState::new(PastureConfig {
        wolf_count: 2,
        sheep_count: 2,
        rng_seed: Some(11),
        ..PastureConfig::default()
    })
    .expect("world");
    world.spawn_forage(Position::new(120.0, 80.0));
    world.step_at(millis(16));

    let snapshot = world.snapshot();
    let json = serde_json::to_string(&snapshot).expect("serialize");
    let restored: pasture_core::WorldSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(snapshot, restored);
    assert_eq!(restored.wolf_view_radius, world.config().wolf_view_radius);
}
