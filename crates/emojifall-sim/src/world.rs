//! The shared gravity world all dropped emoji fall into.
//!
//! One [`SimulationWorld`] exists per viewing session. It owns every live
//! [`EmojiBody`] plus the static boundary geometry (ground, two walls,
//! optional center obstacle), installed once at construction and never
//! removed. Stepping integrates gravity and resolves collisions; it never
//! removes bodies -- removal happens only through [`remove_body`] (driven
//! by the per-body lifetime timer) or the [`expire_bodies`] sweep.
//!
//! [`remove_body`]: SimulationWorld::remove_body
//! [`expire_bodies`]: SimulationWorld::expire_bodies

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::body::{BodyId, BodySnapshot, EmojiBody, StaticBody, StaticKind};
use crate::config::WorldConfig;
use crate::error::SimError;
use crate::vec2::Vec2;

/// Half thickness of the boundary rectangles, in pixels.
const BOUNDARY_HALF_THICKNESS: f64 = 5.0;

/// Horizontal spawn impulse range, pixels per second.
const SPAWN_IMPULSE_X: f64 = 40.0;

/// Maximum upward spawn impulse, pixels per second.
const SPAWN_IMPULSE_UP: f64 = 150.0;

/// Spin applied to ground contacts per resolution, as a velocity fraction.
const GROUND_SPIN_DAMPING: f64 = 0.9;

/// The simulation world: dynamic emoji bodies plus immovable geometry.
pub struct SimulationWorld {
    config: WorldConfig,
    statics: Vec<StaticBody>,
    bodies: BTreeMap<BodyId, EmojiBody>,
    next_body: u64,
    rng: StdRng,
}

impl core::fmt::Debug for SimulationWorld {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationWorld")
            .field("bodies", &self.bodies.len())
            .field("statics", &self.statics.len())
            .finish()
    }
}

impl SimulationWorld {
    /// Create a world with ground and wall geometry installed.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for non-positive dimensions,
    /// a non-positive body radius, a zero lifetime, or a restitution
    /// outside `[0, 1]`.
    pub fn new(config: WorldConfig) -> Result<Self, SimError> {
        if !(config.width > 0.0 && config.height > 0.0) {
            return Err(SimError::InvalidConfig {
                reason: "world dimensions must be positive".to_owned(),
            });
        }
        if !(config.body_radius > 0.0) {
            return Err(SimError::InvalidConfig {
                reason: "body radius must be positive".to_owned(),
            });
        }
        if config.body_radius * 2.0 >= config.width {
            return Err(SimError::InvalidConfig {
                reason: "world must be wider than one body".to_owned(),
            });
        }
        if config.body_ttl_seconds == 0 {
            return Err(SimError::InvalidConfig {
                reason: "body lifetime must be at least one second".to_owned(),
            });
        }
        if !(0.0..=1.0).contains(&config.restitution) {
            return Err(SimError::InvalidConfig {
                reason: "restitution must be between 0 and 1".to_owned(),
            });
        }

        let (width, height) = (config.width, config.height);
        let statics = vec![
            StaticBody {
                kind: StaticKind::Ground,
                center: Vec2::new(width / 2.0, height),
                half_extents: Vec2::new(width / 2.0, BOUNDARY_HALF_THICKNESS),
            },
            StaticBody {
                kind: StaticKind::LeftWall,
                center: Vec2::new(0.0, height / 2.0),
                half_extents: Vec2::new(BOUNDARY_HALF_THICKNESS, height / 2.0),
            },
            StaticBody {
                kind: StaticKind::RightWall,
                center: Vec2::new(width, height / 2.0),
                half_extents: Vec2::new(BOUNDARY_HALF_THICKNESS, height / 2.0),
            },
        ];

        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        Ok(Self {
            config,
            statics,
            bodies: BTreeMap::new(),
            next_body: 0,
            rng,
        })
    }

    /// Install a static obstacle of the given size at world center.
    ///
    /// The installation projects a QR code onto this spot; bodies bounce
    /// off it but it never moves or collides dynamically.
    #[must_use]
    pub fn with_center_obstacle(mut self, width: f64, height: f64) -> Self {
        self.statics.push(StaticBody {
            kind: StaticKind::Obstacle,
            center: Vec2::new(self.config.width / 2.0, self.config.height / 2.0),
            half_extents: Vec2::new(width / 2.0, height / 2.0),
        });
        self
    }

    /// The configuration this world was built with.
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The static geometry, in installation order.
    pub fn statics(&self) -> &[StaticBody] {
        &self.statics
    }

    /// Number of live dynamic bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Iterate the live dynamic bodies in id order.
    pub fn bodies(&self) -> impl Iterator<Item = &EmojiBody> {
        self.bodies.values()
    }

    /// Whether the given body is still in the world.
    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Clone out a render snapshot of every live body.
    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        self.bodies
            .values()
            .map(|body| BodySnapshot {
                id: body.id,
                emoji: body.emoji.clone(),
                position: body.position,
                angle: body.angle,
            })
            .collect()
    }

    /// Drop a new emoji body into the world.
    ///
    /// The body spawns above the visible area at a pseudo-random
    /// horizontal position with a small random rotation, spin, and
    /// upward impulse. Returns the id the caller needs to schedule the
    /// body's removal.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::BlankEmoji`] if `emoji` is empty or
    /// whitespace-only.
    pub fn spawn_emoji(&mut self, emoji: &str) -> Result<BodyId, SimError> {
        if emoji.trim().is_empty() {
            return Err(SimError::BlankEmoji);
        }

        let id = BodyId(self.next_body);
        // Ids are never reused; u64 outlives any conceivable session.
        self.next_body = self.next_body.saturating_add(1);

        let radius = self.config.body_radius;
        let x = self
            .rng
            .random_range(0.0..self.config.width)
            .clamp(radius, self.config.width - radius);
        let angle = self.rng.random_range(-core::f64::consts::PI..core::f64::consts::PI);
        let angular_velocity = self.rng.random_range(-1.0..1.0);
        let velocity = Vec2::new(
            self.rng.random_range(-SPAWN_IMPULSE_X..SPAWN_IMPULSE_X),
            self.rng.random_range(-SPAWN_IMPULSE_UP..0.0),
        );

        debug!(body = %id, emoji, x, "emoji spawned");

        self.bodies.insert(
            id,
            EmojiBody {
                id,
                emoji: emoji.to_owned(),
                position: Vec2::new(x, self.config.spawn_height),
                velocity,
                angle,
                angular_velocity,
                radius,
                spawned_at: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Remove a body from the world. Returns whether it was present.
    ///
    /// Idempotent: a removal timer firing after the body is already gone
    /// is a no-op.
    pub fn remove_body(&mut self, id: BodyId) -> bool {
        let removed = self.bodies.remove(&id).is_some();
        if removed {
            debug!(body = %id, "body removed");
        }
        removed
    }

    /// Sweep out every body older than the configured lifetime.
    ///
    /// Backstop for stalled removal timers; returns the number removed.
    pub fn expire_bodies(&mut self, now: Instant) -> usize {
        let ttl = self.config.body_ttl();
        let before = self.bodies.len();
        self.bodies
            .retain(|_, body| now.duration_since(body.spawned_at) < ttl);
        before.saturating_sub(self.bodies.len())
    }

    /// Advance the simulation by `dt`.
    ///
    /// Integrates gravity and air drag, advances rotation, resolves
    /// collisions against the static geometry and between bodies. Never
    /// removes a body.
    pub fn step(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }

        self.integrate(dt);
        self.resolve_static_collisions();
        self.resolve_body_collisions();
    }

    /// Gravity, air drag, and position/rotation integration.
    // Vec2 arithmetic is pure f64 and cannot overflow-panic.
    #[allow(clippy::arithmetic_side_effects)]
    fn integrate(&mut self, dt: f64) {
        let gravity = self.config.gravity;
        let air_keep = (1.0 - self.config.friction_air).clamp(0.0, 1.0);

        for body in self.bodies.values_mut() {
            body.velocity.y += gravity * dt;
            body.velocity = body.velocity * air_keep;
            body.position += body.velocity * dt;
            body.angle += body.angular_velocity * dt;
        }
    }

    /// Push bodies out of the ground, walls, and obstacle, reflecting
    /// velocity with restitution and damping tangential motion.
    // Vec2 arithmetic is pure f64 and cannot overflow-panic.
    #[allow(clippy::arithmetic_side_effects)]
    fn resolve_static_collisions(&mut self) {
        let restitution = self.config.restitution;
        let friction_keep = (1.0 - self.config.friction).clamp(0.0, 1.0);

        for body in self.bodies.values_mut() {
            for collider in &self.statics {
                let closest = collider.closest_point(body.position);
                let delta = body.position - closest;
                let distance = delta.length();
                if distance >= body.radius {
                    continue;
                }

                // A center inside the rectangle has no usable normal;
                // push straight up, the dominant escape direction under
                // gravity.
                let normal = if distance > 1e-9 {
                    delta.normalized()
                } else {
                    Vec2::new(0.0, -1.0)
                };

                let penetration = body.radius - distance;
                body.position += normal * penetration;

                let normal_speed = body.velocity.dot(normal);
                if normal_speed < 0.0 {
                    let tangent = body.velocity - normal * normal_speed;
                    body.velocity = tangent * friction_keep - normal * (normal_speed * restitution);
                    if collider.kind == StaticKind::Ground {
                        body.angular_velocity *= GROUND_SPIN_DAMPING;
                    }
                }
            }
        }
    }

    /// Separate overlapping bodies and exchange a restitution impulse.
    ///
    /// Computed from an immutable snapshot and applied afterwards so the
    /// body map is never mutated while the pair loop iterates it.
    // Vec2 arithmetic is pure f64 and cannot overflow-panic.
    #[allow(clippy::arithmetic_side_effects)]
    fn resolve_body_collisions(&mut self) {
        let restitution = self.config.restitution;
        let snapshot: Vec<(BodyId, Vec2, Vec2, f64)> = self
            .bodies
            .values()
            .map(|body| (body.id, body.position, body.velocity, body.radius))
            .collect();

        let mut adjustments: BTreeMap<BodyId, (Vec2, Vec2)> = BTreeMap::new();

        for (index, &(id_a, pos_a, vel_a, radius_a)) in snapshot.iter().enumerate() {
            for &(id_b, pos_b, vel_b, radius_b) in snapshot.iter().skip(index.saturating_add(1)) {
                let min_distance = radius_a + radius_b;
                let delta = pos_b - pos_a;
                let distance = delta.length();
                if distance >= min_distance {
                    continue;
                }

                // Coincident centers get a deterministic horizontal nudge.
                let normal = if distance > 1e-9 {
                    delta.normalized()
                } else {
                    Vec2::new(1.0, 0.0)
                };

                let overlap = min_distance - distance;
                let push = normal * (overlap / 2.0);
                let relative_speed = (vel_b - vel_a).dot(normal);
                let impulse = if relative_speed < 0.0 {
                    normal * ((-(1.0 + restitution) * relative_speed) / 2.0)
                } else {
                    Vec2::ZERO
                };

                let entry_a = adjustments.entry(id_a).or_insert((Vec2::ZERO, Vec2::ZERO));
                entry_a.0 += push * -1.0;
                entry_a.1 += impulse * -1.0;
                let entry_b = adjustments.entry(id_b).or_insert((Vec2::ZERO, Vec2::ZERO));
                entry_b.0 += push;
                entry_b.1 += impulse;
            }
        }

        for (id, (position_delta, velocity_delta)) in adjustments {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.position += position_delta;
                body.velocity += velocity_delta;
            }
        }
    }
}
