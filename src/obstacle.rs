use crate::config::Tunables;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A pipe pair: a top segment ending at `gap_center` and a bottom segment
/// starting `gap_height` below it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    gap_center: i32,
    gap_height: i32,
    segment_height: i32,
    width: u32,
    velocity: f32,
    pub passed: bool,
}

impl Obstacle {
    /// New obstacle at `x` with a gap center drawn from the configured range.
    pub fn spawn<R: Rng>(x: f32, rng: &mut R, tunables: &Tunables) -> Self {
        let gap_center = rng.gen_range(tunables.gap_center_min..tunables.gap_center_max);
        Self::with_gap(x, gap_center, tunables)
    }

    pub fn with_gap(x: f32, gap_center: i32, tunables: &Tunables) -> Self {
        Self {
            x,
            gap_center,
            gap_height: tunables.gap_height,
            segment_height: tunables.segment_height as i32,
            width: tunables.obstacle_width,
            velocity: tunables.obstacle_velocity,
            passed: false,
        }
    }

    pub fn update(&mut self) {
        self.x -= self.velocity;
    }

    /// Returns true only on the tick the obstacle first falls behind `body_x`.
    pub fn mark_passed_if(&mut self, body_x: f32) -> bool {
        if !self.passed && body_x > self.x {
            self.passed = true;
            return true;
        }
        false
    }

    pub fn gap_center(&self) -> i32 {
        self.gap_center
    }

    /// Lower edge of the top segment.
    pub fn gap_top(&self) -> i32 {
        self.gap_center
    }

    /// Upper edge of the bottom segment.
    pub fn gap_bottom(&self) -> i32 {
        self.gap_center + self.gap_height
    }

    /// y of the top segment sprite's upper-left corner.
    pub fn top_segment_y(&self) -> i32 {
        self.gap_center - self.segment_height
    }

    pub fn bottom_segment_y(&self) -> i32 {
        self.gap_bottom()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn trailing_edge(&self) -> f32 {
        self.x + self.width as f32
    }

    pub fn off_screen(&self) -> bool {
        self.trailing_edge() < 0.0
    }
}
