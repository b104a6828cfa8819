use crate::config::Tunables;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub x: f32,
    pub y: f32,
    pub velocity: f32,
    pub alive: bool,
    /// Height at the last flap; renderers use it to tilt the sprite.
    pub flap_origin_y: f32,
    gravity: f32,
    terminal_velocity: f32,
    flap_impulse: f32,
}

impl PhysicsBody {
    pub fn new(x: f32, y: f32, tunables: &Tunables) -> Self {
        Self {
            x,
            y,
            velocity: tunables.initial_velocity,
            alive: true,
            flap_origin_y: y,
            gravity: tunables.gravity,
            terminal_velocity: tunables.terminal_velocity,
            flap_impulse: tunables.flap_impulse,
        }
    }

    /// Body at the configured spawn point.
    pub fn spawn(tunables: &Tunables) -> Self {
        Self::new(tunables.body_x, tunables.body_y, tunables)
    }

    pub fn apply_gravity(&mut self) {
        self.velocity = (self.velocity + self.gravity).min(self.terminal_velocity);
        self.y += self.velocity;
    }

    pub fn flap(&mut self) {
        self.velocity = self.flap_impulse;
        self.flap_origin_y = self.y;
    }

    pub fn terminal_velocity(&self) -> f32 {
        self.terminal_velocity
    }

    pub fn out_of_bounds(&self, field_height: f32) -> bool {
        self.y < 0.0 || self.y > field_height
    }
}

/// Pure form of [`PhysicsBody::apply_gravity`].
pub fn with_gravity(mut body: PhysicsBody) -> PhysicsBody {
    body.apply_gravity();
    body
}

/// Pure form of [`PhysicsBody::flap`].
pub fn with_flap(mut body: PhysicsBody) -> PhysicsBody {
    body.flap();
    body
}
