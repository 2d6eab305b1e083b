//! Core world model for the pasture predator-prey simulation.
//!
//! Wolves hunt sheep and flee the guard dog, sheep graze on stochastically
//! spawning forage and flee wolves, and the guard dog chases wolves until a
//! timer recalls it to its home point. All behavior runs inside a synchronous
//! tick pipeline owned by [`WorldState`]; rendering, parameter UI, and frame
//! scheduling live outside this crate and talk to it through
//! [`WorldSnapshot`], [`ControlCommand`], and the run flag.

use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use thiserror::Error;

new_key_type! {
    /// Stable handle for wolves backed by a generational slot map.
    pub struct WolfId;
    /// Stable handle for sheep.
    pub struct SheepId;
    /// Stable handle for guard dogs.
    pub struct DogId;
    /// Stable handle for forage items.
    pub struct FoodId;
}

/// Display tint applied to wolves.
pub const WOLF_COLOR: [f32; 3] = [0.80, 0.10, 0.10];
/// Display tint applied to sheep.
pub const SHEEP_COLOR: [f32; 3] = [0.95, 0.95, 0.95];
/// Display tint applied to the guard dog.
pub const DOG_COLOR: [f32; 3] = [0.55, 0.35, 0.15];
/// Display tint applied to forage.
pub const FORAGE_COLOR: [f32; 3] = [0.10, 0.60, 0.20];

/// Axis-aligned 2D position inside the field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Heading stored as a unit-length direction vector. Decision rules rewrite
/// it; integration scales it by the agent's speed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    /// Construct a new velocity vector.
    #[must_use]
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(a: Position, b: Position) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Anything with a queryable position inside the field.
pub trait Located {
    fn position(&self) -> Position;
}

impl Located for Position {
    fn position(&self) -> Position {
        *self
    }
}

/// Return the candidate closest to `origin`, or `None` when the set is
/// empty. Ties resolve to the first minimal element in scan order.
pub fn closest_of<'a, T, I>(origin: Position, candidates: I) -> Option<&'a T>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    candidates
        .into_iter()
        .min_by_key(|candidate| OrderedFloat(distance(origin, candidate.position())))
}

/// As [`closest_of`], but candidates at distance >= `radius` are excluded.
pub fn closest_within<'a, T, I>(origin: Position, candidates: I, radius: f32) -> Option<&'a T>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    candidates
        .into_iter()
        .filter(|candidate| distance(origin, candidate.position()) < radius)
        .min_by_key(|candidate| OrderedFloat(distance(origin, candidate.position())))
}

/// State shared by every mobile agent kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentBody {
    pub position: Position,
    pub velocity: Velocity,
    pub speed: f32,
    pub color: [f32; 3],
}

impl AgentBody {
    /// Construct a body with the provided heading and per-kind color.
    #[must_use]
    pub const fn new(position: Position, velocity: Velocity, speed: f32, color: [f32; 3]) -> Self {
        Self {
            position,
            velocity,
            speed,
            color,
        }
    }

    /// Point the heading directly at `target`. A degenerate zero-length
    /// direction leaves the previous heading untouched instead of producing
    /// NaN components.
    pub fn steer_toward(&mut self, target: Position) {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let magnitude = dx.hypot(dy);
        if magnitude <= f32::EPSILON {
            return;
        }
        self.velocity = Velocity::new(dx / magnitude, dy / magnitude);
    }

    /// Point the heading directly away from `threat`, with the same
    /// degenerate-vector guard as [`AgentBody::steer_toward`].
    pub fn steer_away(&mut self, threat: Position) {
        let dx = self.position.x - threat.x;
        let dy = self.position.y - threat.y;
        let magnitude = dx.hypot(dy);
        if magnitude <= f32::EPSILON {
            return;
        }
        self.velocity = Velocity::new(dx / magnitude, dy / magnitude);
    }

    /// Advance the position by `velocity * speed`. Each axis that would leave
    /// `[0, field_size]` has its heading component reflected and the
    /// coordinate clamped back into range; the axes are handled
    /// independently.
    pub fn integrate(&mut self, field_size: f32) {
        self.position.x += self.velocity.vx * self.speed;
        self.position.y += self.velocity.vy * self.speed;
        if self.position.x < 0.0 || self.position.x > field_size {
            self.velocity.vx = -self.velocity.vx;
            self.position.x = self.position.x.clamp(0.0, field_size);
        }
        if self.position.y < 0.0 || self.position.y > field_size {
            self.velocity.vy = -self.velocity.vy;
            self.position.y = self.position.y.clamp(0.0, field_size);
        }
    }
}

impl Located for AgentBody {
    fn position(&self) -> Position {
        self.position
    }
}

/// Predator. Hunts sheep unless the guard dog is close enough to scare it
/// off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Wolf {
    pub body: AgentBody,
}

impl Wolf {
    /// Construct a wolf at `position` with the given initial heading.
    #[must_use]
    pub const fn new(position: Position, speed: f32, heading: Velocity) -> Self {
        Self {
            body: AgentBody::new(position, heading, speed, WOLF_COLOR),
        }
    }

    /// One decision step. Fleeing the closest dog takes priority whenever
    /// that dog is under `view_radius` away (the dog search itself is
    /// unfiltered); otherwise pursue the closest sheep within the view
    /// radius. With neither visible the previous heading is kept.
    pub fn hunt(&mut self, sheep: &[Position], dogs: &[Position], view_radius: f32) {
        if let Some(dog) = closest_of(self.body.position, dogs) {
            if distance(self.body.position, *dog) < view_radius {
                self.body.steer_away(*dog);
                return;
            }
        }
        if let Some(target) = closest_within(self.body.position, sheep, view_radius) {
            self.body.steer_toward(*target);
        }
    }
}

/// Prey. Flees nearby wolves as a group, otherwise seeks forage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sheep {
    pub body: AgentBody,
}

impl Sheep {
    /// Construct a sheep at `position` with the given initial heading.
    #[must_use]
    pub const fn new(position: Position, speed: f32, heading: Velocity) -> Self {
        Self {
            body: AgentBody::new(position, heading, speed, SHEEP_COLOR),
        }
    }

    /// One decision step. When any wolf is under `view_radius` away the
    /// sheep flees the centroid of every nearby wolf, which smooths the
    /// escape direction compared to fleeing a single predator. Otherwise it
    /// seeks the closest forage within the view radius. The sheep always
    /// integrates movement at the end, even when no new heading was chosen.
    pub fn graze(&mut self, forage: &[Position], wolves: &[Position], view_radius: f32, field_size: f32) {
        let nearby: Vec<Position> = wolves
            .iter()
            .copied()
            .filter(|wolf| distance(self.body.position, *wolf) < view_radius)
            .collect();
        if !nearby.is_empty() {
            let inverse = 1.0 / nearby.len() as f32;
            let centroid = Position::new(
                nearby.iter().map(|p| p.x).sum::<f32>() * inverse,
                nearby.iter().map(|p| p.y).sum::<f32>() * inverse,
            );
            self.body.steer_away(centroid);
        } else if let Some(target) = closest_within(self.body.position, forage, view_radius) {
            self.body.steer_toward(*target);
        }
        self.body.integrate(field_size);
    }
}

/// Guardian. Chases wolves anywhere on the field and periodically returns to
/// its home point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GuardDog {
    pub body: AgentBody,
    /// True while executing a forced return-to-home maneuver. Cleared the
    /// moment the dog's distance to home drops under the capture radius.
    pub returning_home: bool,
}

impl GuardDog {
    /// Construct a dog at `position` with the given initial heading.
    #[must_use]
    pub const fn new(position: Position, speed: f32, heading: Velocity) -> Self {
        Self {
            body: AgentBody::new(position, heading, speed, DOG_COLOR),
            returning_home: false,
        }
    }

    /// One decision step. The dog sees wolves globally, with no radius
    /// filter. A dog mid-return never interrupts the maneuver to chase, and
    /// with no wolves on the field it heads home on its own.
    pub fn patrol(&mut self, wolves: &[Position], home: Position, capture_radius: f32) {
        if self.returning_home {
            self.return_home(home, capture_radius);
            return;
        }
        match closest_of(self.body.position, wolves) {
            Some(wolf) => self.body.steer_toward(*wolf),
            None => self.return_home(home, capture_radius),
        }
    }

    /// Steer toward home and raise the returning flag until arrival, defined
    /// as distance to home under the capture radius.
    pub fn return_home(&mut self, home: Position, capture_radius: f32) {
        self.returning_home = true;
        self.body.steer_toward(home);
        if distance(self.body.position, home) < capture_radius {
            self.returning_home = false;
        }
    }
}

/// A forage item. Spawned stochastically, consumed when a sheep reaches it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Forage {
    pub position: Position,
    pub color: [f32; 3],
}

impl Forage {
    /// Construct a forage item at `position`.
    #[must_use]
    pub const fn new(position: Position) -> Self {
        Self {
            position,
            color: FORAGE_COLOR,
        }
    }
}

impl Located for Forage {
    fn position(&self) -> Position {
        self.position
    }
}

/// Errors that can occur when constructing or reconfiguring world state.
#[derive(Debug, Error)]
pub enum WorldStateError {
    /// Indicates an invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Tunable parameters for a pasture world. Speeds, view radii, and the
/// forage rate are read fresh every tick, so in-place edits take effect
/// immediately; count changes require a repopulation by convention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PastureConfig {
    /// Side length of the square field in world units.
    pub field_size: f32,
    /// Distance under which one entity reaches or consumes another.
    pub capture_radius: f32,
    /// Number of wolves created on (re)population.
    pub wolf_count: usize,
    /// Number of sheep created on (re)population.
    pub sheep_count: usize,
    /// Per-tick Bernoulli probability of one forage item spawning.
    pub forage_rate: f64,
    /// Wolf movement speed in world units per tick.
    pub wolf_speed: f32,
    /// Sheep movement speed in world units per tick.
    pub sheep_speed: f32,
    /// Guard dog movement speed in world units per tick.
    pub dog_speed: f32,
    /// Distance at which wolves notice sheep and the dog.
    pub wolf_view_radius: f32,
    /// Distance at which sheep notice wolves and forage.
    pub sheep_view_radius: f32,
    /// Time away from home after which the dog is forcibly recalled.
    pub dog_return_after: Duration,
    /// Optional RNG seed for reproducible worlds.
    pub rng_seed: Option<u64>,
    /// Maximum number of recent tick summaries retained in-memory.
    pub history_capacity: usize,
}

impl Default for PastureConfig {
    fn default() -> Self {
        Self {
            field_size: 600.0,
            capture_radius: 10.0,
            wolf_count: 3,
            sheep_count: 1,
            forage_rate: 0.005,
            wolf_speed: 0.6,
            sheep_speed: 0.5,
            dog_speed: 0.7,
            wolf_view_radius: 100.0,
            sheep_view_radius: 70.0,
            dog_return_after: Duration::from_millis(5_000),
            rng_seed: None,
            history_capacity: 256,
        }
    }
}

impl PastureConfig {
    /// The dog's home point, fixed at the field center.
    #[must_use]
    pub fn home(&self) -> Position {
        Position::new(self.field_size * 0.5, self.field_size * 0.5)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), WorldStateError> {
        if !self.field_size.is_finite() || self.field_size <= 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "field_size must be positive and finite",
            ));
        }
        if !self.capture_radius.is_finite() || self.capture_radius <= 0.0 {
            return Err(WorldStateError::InvalidConfig(
                "capture_radius must be positive and finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.forage_rate) {
            return Err(WorldStateError::InvalidConfig(
                "forage_rate must be a probability in [0, 1]",
            ));
        }
        for speed in [self.wolf_speed, self.sheep_speed, self.dog_speed] {
            if !speed.is_finite() || speed < 0.0 {
                return Err(WorldStateError::InvalidConfig(
                    "agent speeds must be non-negative and finite",
                ));
            }
        }
        for radius in [self.wolf_view_radius, self.sheep_view_radius] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(WorldStateError::InvalidConfig(
                    "view radii must be positive and finite",
                ));
            }
        }
        if self.history_capacity == 0 {
            return Err(WorldStateError::InvalidConfig(
                "history_capacity must be non-zero",
            ));
        }
        Ok(())
    }

    /// Returns the configured RNG, seeding from entropy if no seed is set.
    fn seeded_rng(&self) -> SmallRng {
        match self.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::seed_from_u64(rand::random()),
        }
    }
}

/// High level simulation clock (ticks processed since boot).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tick(pub u64);

impl Tick {
    /// Returns the next sequential tick.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Resets the tick counter back to zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

/// Events emitted after processing a world tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TickEvents {
    pub tick: Tick,
    /// Sheep caught by wolves this tick.
    pub sheep_eaten: usize,
    /// Forage items consumed by sheep this tick.
    pub forage_grazed: usize,
    /// Forage item spawned by this tick's Bernoulli trial, if any.
    pub forage_spawned: Option<FoodId>,
    /// Whether the home-return timeout fired for the dog this tick.
    pub dog_recalled: bool,
}

/// Population counts and removals recorded once per tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: Tick,
    pub wolves: usize,
    pub sheep: usize,
    pub dogs: usize,
    pub forage: usize,
    pub sheep_eaten: usize,
    pub forage_grazed: usize,
}

/// Position and color of one entity as exposed to the render layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AgentView<Id> {
    pub id: Id,
    pub position: Position,
    pub color: [f32; 3],
}

/// Render view of a guard dog, including its return state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DogView {
    pub id: DogId,
    pub position: Position,
    pub color: [f32; 3],
    pub returning_home: bool,
}

/// Full per-tick state handed to the render layer: everything needed to draw
/// agent markers and the translucent view-radius overlays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub tick: Tick,
    pub field_size: f32,
    pub wolf_view_radius: f32,
    pub sheep_view_radius: f32,
    pub home: Position,
    pub wolves: Vec<AgentView<WolfId>>,
    pub sheep: Vec<AgentView<SheepId>>,
    pub dogs: Vec<DogView>,
    pub forage: Vec<AgentView<FoodId>>,
}

/// Aggregate world state driving the simulation.
///
/// All entity collections are owned here; decision rules receive read-only
/// position snapshots taken at the start of the tick and mutate only the
/// agent they are attached to, which is why the tick pipeline needs no
/// synchronization.
#[derive(Debug)]
pub struct WorldState {
    config: PastureConfig,
    tick: Tick,
    rng: SmallRng,
    running: bool,
    wolves: SlotMap<WolfId, Wolf>,
    sheep: SlotMap<SheepId, Sheep>,
    dogs: SlotMap<DogId, GuardDog>,
    forage: SlotMap<FoodId, Forage>,
    /// Simulation clock as of the most recent tick.
    clock: Duration,
    /// Clock reading when a dog last touched home (or the population was
    /// last created, or the run was last started).
    last_home_touch: Duration,
    started_at: Instant,
    history: VecDeque<TickSummary>,
}

impl WorldState {
    /// Instantiate a world and populate it from the supplied configuration.
    pub fn new(config: PastureConfig) -> Result<Self, WorldStateError> {
        config.validate()?;
        let rng = config.seeded_rng();
        let history_capacity = config.history_capacity;
        let mut world = Self {
            config,
            tick: Tick::zero(),
            rng,
            running: false,
            wolves: SlotMap::with_key(),
            sheep: SlotMap::with_key(),
            dogs: SlotMap::with_key(),
            forage: SlotMap::with_key(),
            clock: Duration::ZERO,
            last_home_touch: Duration::ZERO,
            started_at: Instant::now(),
            history: VecDeque::with_capacity(history_capacity),
        };
        world.repopulate();
        Ok(world)
    }

    /// Destroy the current population and rebuild it from the current
    /// configuration: wolves and sheep at uniform random positions, one dog
    /// at home, no forage. Also re-anchors the dog's home-touch timer.
    pub fn repopulate(&mut self) {
        self.wolves.clear();
        self.sheep.clear();
        self.dogs.clear();
        self.forage.clear();
        for _ in 0..self.config.wolf_count {
            let position = self.random_position();
            self.spawn_wolf(position);
        }
        for _ in 0..self.config.sheep_count {
            let position = self.random_position();
            self.spawn_sheep(position);
        }
        let home = self.config.home();
        self.spawn_dog(home);
        self.last_home_touch = self.clock;
    }

    /// Insert a wolf at `position` with a random initial heading.
    pub fn spawn_wolf(&mut self, position: Position) -> WolfId {
        let heading = self.random_heading();
        self.wolves
            .insert(Wolf::new(position, self.config.wolf_speed, heading))
    }

    /// Insert a sheep at `position` with a random initial heading.
    pub fn spawn_sheep(&mut self, position: Position) -> SheepId {
        let heading = self.random_heading();
        self.sheep
            .insert(Sheep::new(position, self.config.sheep_speed, heading))
    }

    /// Insert a guard dog at `position` with a random initial heading.
    pub fn spawn_dog(&mut self, position: Position) -> DogId {
        let heading = self.random_heading();
        self.dogs
            .insert(GuardDog::new(position, self.config.dog_speed, heading))
    }

    /// Insert a forage item at `position`.
    pub fn spawn_forage(&mut self, position: Position) -> FoodId {
        self.forage.insert(Forage::new(position))
    }

    fn random_position(&mut self) -> Position {
        let extent = self.config.field_size;
        Position::new(
            self.rng.random_range(0.0..extent),
            self.rng.random_range(0.0..extent),
        )
    }

    fn random_heading(&mut self) -> Velocity {
        let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
        Velocity::new(angle.cos(), angle.sin())
    }

    /// Execute one simulation tick against the wall clock anchored at world
    /// creation. Harnesses that control time themselves (tests, fixed-step
    /// drivers) should call [`WorldState::step_at`] instead.
    pub fn step(&mut self) -> TickEvents {
        let now = self.started_at.elapsed();
        self.step_at(now)
    }

    /// Execute one simulation tick at the explicit clock reading `now`.
    ///
    /// Stages run in the fixed order wolves, sheep, forage, dog. Every
    /// decision rule reads the position snapshots taken here, at the start
    /// of the tick, so no agent observes another agent's same-tick movement.
    pub fn step_at(&mut self, now: Duration) -> TickEvents {
        self.clock = now;
        let wolf_snapshot: Vec<Position> = self.wolves.values().map(|w| w.body.position).collect();
        let sheep_snapshot: Vec<Position> = self.sheep.values().map(|s| s.body.position).collect();
        let forage_snapshot: Vec<Position> = self.forage.values().map(|f| f.position).collect();
        let dog_snapshot: Vec<Position> = self.dogs.values().map(|d| d.body.position).collect();

        self.stage_wolves(&sheep_snapshot, &dog_snapshot);
        let sheep_eaten = self.stage_sheep(&wolf_snapshot, &forage_snapshot);
        let (forage_grazed, forage_spawned) = self.stage_forage(&sheep_snapshot);
        let dog_recalled = self.stage_dogs(&wolf_snapshot, now);

        self.tick = self.tick.next();
        let summary = TickSummary {
            tick: self.tick,
            wolves: self.wolves.len(),
            sheep: self.sheep.len(),
            dogs: self.dogs.len(),
            forage: self.forage.len(),
            sheep_eaten,
            forage_grazed,
        };
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(summary);

        TickEvents {
            tick: self.tick,
            sheep_eaten,
            forage_grazed,
            forage_spawned,
            dog_recalled,
        }
    }

    fn stage_wolves(&mut self, sheep_snapshot: &[Position], dog_snapshot: &[Position]) {
        let speed = self.config.wolf_speed;
        let view_radius = self.config.wolf_view_radius;
        let field_size = self.config.field_size;
        for wolf in self.wolves.values_mut() {
            wolf.body.speed = speed;
            wolf.hunt(sheep_snapshot, dog_snapshot, view_radius);
            wolf.body.integrate(field_size);
        }
    }

    fn stage_sheep(&mut self, wolf_snapshot: &[Position], forage_snapshot: &[Position]) -> usize {
        let capture_radius = self.config.capture_radius;
        let before = self.sheep.len();
        // A sheep caught this tick neither decides nor moves.
        self.sheep.retain(|_, sheep| {
            !wolf_snapshot
                .iter()
                .any(|wolf| distance(sheep.body.position, *wolf) < capture_radius)
        });
        let eaten = before - self.sheep.len();

        let speed = self.config.sheep_speed;
        let view_radius = self.config.sheep_view_radius;
        let field_size = self.config.field_size;
        for sheep in self.sheep.values_mut() {
            sheep.body.speed = speed;
            sheep.graze(forage_snapshot, wolf_snapshot, view_radius, field_size);
        }
        eaten
    }

    fn stage_forage(&mut self, sheep_snapshot: &[Position]) -> (usize, Option<FoodId>) {
        let capture_radius = self.config.capture_radius;
        let before = self.forage.len();
        self.forage.retain(|_, item| {
            !sheep_snapshot
                .iter()
                .any(|sheep| distance(item.position, *sheep) < capture_radius)
        });
        let grazed = before - self.forage.len();

        let spawned = if self.rng.random_bool(self.config.forage_rate) {
            let position = self.random_position();
            Some(self.spawn_forage(position))
        } else {
            None
        };
        (grazed, spawned)
    }

    fn stage_dogs(&mut self, wolf_snapshot: &[Position], now: Duration) -> bool {
        let speed = self.config.dog_speed;
        let capture_radius = self.config.capture_radius;
        let field_size = self.config.field_size;
        let home = self.config.home();
        let return_after = self.config.dog_return_after;
        let mut recalled = false;
        for dog in self.dogs.values_mut() {
            dog.body.speed = speed;
            dog.patrol(wolf_snapshot, home, capture_radius);
            if distance(dog.body.position, home) < capture_radius {
                self.last_home_touch = now;
                dog.returning_home = false;
            }
            // The timeout overrides whatever patrol decided this tick.
            if now.saturating_sub(self.last_home_touch) >= return_after {
                dog.return_home(home, capture_radius);
                recalled = true;
            }
            dog.body.integrate(field_size);
        }
        recalled
    }

    /// Returns an immutable reference to configuration.
    #[must_use]
    pub fn config(&self) -> &PastureConfig {
        &self.config
    }

    /// Mutable access to the configuration (for hot edits).
    #[must_use]
    pub fn config_mut(&mut self) -> &mut PastureConfig {
        &mut self.config
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    /// Whether the external harness should keep scheduling ticks.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Toggle the run flag. Starting re-anchors the dog's home-touch timer
    /// so a paused stretch does not count toward the recall timeout.
    pub fn set_running(&mut self, running: bool) {
        if running && !self.running {
            self.last_home_touch = self.clock;
        }
        self.running = running;
    }

    /// Resets the tick counter and simulation clock (useful for restarts).
    pub fn reset_time(&mut self) {
        self.tick = Tick::zero();
        self.clock = Duration::ZERO;
        self.last_home_touch = Duration::ZERO;
        self.started_at = Instant::now();
    }

    /// Simulation clock as of the most recent tick.
    #[must_use]
    pub const fn clock(&self) -> Duration {
        self.clock
    }

    /// Clock reading of the last home touch or timer re-anchor.
    #[must_use]
    pub const fn last_home_touch(&self) -> Duration {
        self.last_home_touch
    }

    /// Borrow the world RNG mutably for deterministic sampling.
    #[must_use]
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Read-only access to the wolf collection.
    #[must_use]
    pub fn wolves(&self) -> &SlotMap<WolfId, Wolf> {
        &self.wolves
    }

    /// Mutable access to the wolf collection.
    #[must_use]
    pub fn wolves_mut(&mut self) -> &mut SlotMap<WolfId, Wolf> {
        &mut self.wolves
    }

    /// Read-only access to the sheep collection.
    #[must_use]
    pub fn sheep(&self) -> &SlotMap<SheepId, Sheep> {
        &self.sheep
    }

    /// Mutable access to the sheep collection.
    #[must_use]
    pub fn sheep_mut(&mut self) -> &mut SlotMap<SheepId, Sheep> {
        &mut self.sheep
    }

    /// Read-only access to the dog collection.
    #[must_use]
    pub fn dogs(&self) -> &SlotMap<DogId, GuardDog> {
        &self.dogs
    }

    /// Mutable access to the dog collection.
    #[must_use]
    pub fn dogs_mut(&mut self) -> &mut SlotMap<DogId, GuardDog> {
        &mut self.dogs
    }

    /// Read-only access to the forage collection.
    #[must_use]
    pub fn forage(&self) -> &SlotMap<FoodId, Forage> {
        &self.forage
    }

    /// Mutable access to the forage collection.
    #[must_use]
    pub fn forage_mut(&mut self) -> &mut SlotMap<FoodId, Forage> {
        &mut self.forage
    }

    /// Iterate over retained tick summaries, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &TickSummary> {
        self.history.iter()
    }

    /// Produce the render-layer view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            field_size: self.config.field_size,
            wolf_view_radius: self.config.wolf_view_radius,
            sheep_view_radius: self.config.sheep_view_radius,
            home: self.config.home(),
            wolves: self
                .wolves
                .iter()
                .map(|(id, wolf)| AgentView {
                    id,
                    position: wolf.body.position,
                    color: wolf.body.color,
                })
                .collect(),
            sheep: self
                .sheep
                .iter()
                .map(|(id, sheep)| AgentView {
                    id,
                    position: sheep.body.position,
                    color: sheep.body.color,
                })
                .collect(),
            dogs: self
                .dogs
                .iter()
                .map(|(id, dog)| DogView {
                    id,
                    position: dog.body.position,
                    color: dog.body.color,
                    returning_home: dog.returning_home,
                })
                .collect(),
            forage: self
                .forage
                .iter()
                .map(|(id, item)| AgentView {
                    id,
                    position: item.position,
                    color: item.color,
                })
                .collect(),
        }
    }
}

/// Parameter and lifecycle updates arriving from the control layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ControlCommand {
    SetWolfSpeed(f32),
    SetSheepSpeed(f32),
    SetDogSpeed(f32),
    SetWolfViewRadius(f32),
    SetSheepViewRadius(f32),
    SetWolfCount(usize),
    SetSheepCount(usize),
    SetForageRate(f64),
    SetRunning(bool),
    Reset,
}

/// Apply a control command to the world. Speed and view-radius edits take
/// effect on the next tick; count and rate edits rebuild the population, as
/// do explicit resets. Values are validated before anything is committed.
pub fn apply_control_command(
    world: &mut WorldState,
    command: ControlCommand,
) -> Result<(), WorldStateError> {
    let mut config = world.config.clone();
    let repopulate = match command {
        ControlCommand::SetWolfSpeed(speed) => {
            config.wolf_speed = speed;
            false
        }
        ControlCommand::SetSheepSpeed(speed) => {
            config.sheep_speed = speed;
            false
        }
        ControlCommand::SetDogSpeed(speed) => {
            config.dog_speed = speed;
            false
        }
        ControlCommand::SetWolfViewRadius(radius) => {
            config.wolf_view_radius = radius;
            false
        }
        ControlCommand::SetSheepViewRadius(radius) => {
            config.sheep_view_radius = radius;
            false
        }
        ControlCommand::SetWolfCount(count) => {
            config.wolf_count = count;
            true
        }
        ControlCommand::SetSheepCount(count) => {
            config.sheep_count = count;
            true
        }
        ControlCommand::SetForageRate(rate) => {
            config.forage_rate = rate;
            true
        }
        ControlCommand::SetRunning(running) => {
            world.set_running(running);
            return Ok(());
        }
        ControlCommand::Reset => {
            world.set_running(false);
            world.repopulate();
            return Ok(());
        }
    };
    config.validate()?;
    world.config = config;
    if repopulate {
        world.repopulate();
    }
    Ok(())
}
