//! Steering kinematics: force-based seek/arrive plus neighbor separation.
//!
//! Plans guarantee graph-level exclusivity only; in continuous space two
//! agents can still brush past each other between nodes.  The separation
//! force is the second line of defense — a weighted repulsion from nearby
//! agents blended into every steering output.

use agv_core::{AgentId, Vec2};

/// Distance at which arrival behavior starts decelerating.
pub const ARRIVE_SLOW_RADIUS: f32 = 100.0;

/// Velocity below this is snapped to zero when damping.
const REST_SPEED: f32 = 0.05;

// ── Neighbor view ─────────────────────────────────────────────────────────────

/// Read-only view of another agent, captured once per tick by the fleet so
/// every controller steers against the same snapshot.
#[derive(Copy, Clone, Debug)]
pub struct Neighbor {
    pub id: AgentId,
    pub pos: Vec2,
    pub vel: Vec2,
}

// ── Body ──────────────────────────────────────────────────────────────────────

/// Point-mass kinematics for one agent.
///
/// Forces accumulate via [`apply_force`](Self::apply_force) and take effect
/// at [`integrate`](Self::integrate): velocity gains the accumulated
/// acceleration, is capped at `max_speed`, and moves the position.
#[derive(Clone, Debug)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    acc: Vec2,
    pub max_speed: f32,
    pub max_force: f32,
}

impl Body {
    pub fn new(pos: Vec2, max_speed: f32, max_force: f32) -> Self {
        Self { pos, vel: Vec2::ZERO, acc: Vec2::ZERO, max_speed, max_force }
    }

    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acc += force;
    }

    /// Apply accumulated forces and advance one tick.
    pub fn integrate(&mut self) {
        self.vel = (self.vel + self.acc).clamp_length(self.max_speed);
        self.pos += self.vel;
        self.acc = Vec2::ZERO;
    }

    /// Stop dead: zero velocity and pending forces.
    pub fn halt(&mut self) {
        self.vel = Vec2::ZERO;
        self.acc = Vec2::ZERO;
    }

    /// Scale velocity down (emergency braking keeps some momentum).
    pub fn brake(&mut self, factor: f32) {
        self.vel = self.vel * factor;
    }

    /// Bleed off residual drift while holding position.
    pub fn damp(&mut self, factor: f32) {
        self.vel = self.vel * factor;
        if self.vel.length() < REST_SPEED {
            self.vel = Vec2::ZERO;
        }
    }

    // ── Steering behaviors ────────────────────────────────────────────────

    /// Steer at full speed toward `target`.
    pub fn seek(&self, target: Vec2) -> Vec2 {
        self.steer(target, false)
    }

    /// Steer toward `target`, decelerating inside [`ARRIVE_SLOW_RADIUS`].
    pub fn arrive(&self, target: Vec2) -> Vec2 {
        self.steer(target, true)
    }

    fn steer(&self, target: Vec2, arrival: bool) -> Vec2 {
        let offset = target - self.pos;
        let mut desired_speed = self.max_speed;
        if arrival {
            let distance = offset.length();
            if distance < ARRIVE_SLOW_RADIUS {
                desired_speed = self.max_speed * (distance / ARRIVE_SLOW_RADIUS);
            }
        }
        let desired = offset.with_length(desired_speed);
        (desired - self.vel).clamp_length(self.max_force)
    }

    /// Repulsion from every neighbor closer than `radius`, weighted by
    /// inverse distance.
    pub fn separate(&self, own: AgentId, neighbors: &[Neighbor], radius: f32) -> Vec2 {
        let mut steer = Vec2::ZERO;
        let mut count = 0u32;

        for other in neighbors {
            if other.id == own {
                continue;
            }
            let d = self.pos.distance(other.pos);
            if d > 0.0 && d < radius {
                steer += (self.pos - other.pos).normalized() * (1.0 / d);
                count += 1;
            }
        }

        if count > 0 {
            steer = steer * (1.0 / count as f32);
            steer = steer.with_length(self.max_speed);
            steer = (steer - self.vel).clamp_length(self.max_force);
        }
        steer
    }
}
