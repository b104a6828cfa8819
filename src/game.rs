use crate::body::PhysicsBody;
use crate::config::Tunables;
use crate::mask::{SpriteMasks, overlaps};
use crate::snapshot::{BodyView, Snapshot};
use crate::stream::ObstacleStream;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Turns a held button into one flap per press.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputLatch {
    held: bool,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only on the tick the button goes down.
    pub fn poll(&mut self, pressed: bool) -> bool {
        let fire = pressed && !self.held;
        self.held = pressed;
        fire
    }
}

/// Single-player game driven by a flap input instead of a decision network.
pub struct Game {
    pub body: PhysicsBody,
    pub stream: ObstacleStream,
    pub alive: bool,
    pub score: u64,
    pub pause: bool,
    pub ticks: u64,
    tunables: Tunables,
    masks: SpriteMasks,
    rng: SmallRng,
}

impl Game {
    pub fn new(tunables: Tunables, seed: u64) -> Self {
        let masks = SpriteMasks::standard(&tunables);
        let mut rng = SmallRng::seed_from_u64(seed);
        let stream = ObstacleStream::new(&tunables, &mut rng);
        Self {
            body: PhysicsBody::spawn(&tunables),
            stream,
            alive: true,
            score: 0,
            pause: false,
            ticks: 0,
            tunables,
            masks,
            rng,
        }
    }

    /// Returns true if an obstacle was passed on this step.
    pub fn step(&mut self, flap: bool) -> bool {
        if !self.alive || self.pause {
            return false;
        }
        self.ticks += 1;

        if flap {
            self.body.flap();
        }
        self.body.apply_gravity();

        let hit = self
            .stream
            .obstacles()
            .iter()
            .any(|o| overlaps(&self.body, o, &self.masks));
        if hit || self.body.out_of_bounds(self.tunables.field_height) {
            self.body.alive = false;
            self.alive = false;
            return false;
        }

        let passed = self.stream.step(&[self.body.x], &self.tunables, &mut self.rng);
        self.score += passed as u64;
        passed > 0
    }

    pub fn snapshot(&self) -> Snapshot {
        let bodies = if self.alive {
            vec![BodyView {
                id: 0,
                x: self.body.x,
                y: self.body.y,
                velocity: self.body.velocity,
            }]
        } else {
            Vec::new()
        };
        Snapshot {
            generation: 0,
            tick: self.ticks,
            score: self.score,
            obstacles: Snapshot::obstacle_views(&self.stream),
            bodies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_fires_on_rising_edge_only() {
        let mut latch = InputLatch::new();
        let fired: Vec<bool> = [false, true, true, true, false, true]
            .into_iter()
            .map(|p| latch.poll(p))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true]);
    }

    #[test]
    fn paused_game_does_not_advance() {
        let mut game = Game::new(Tunables::default(), 5);
        game.pause = true;
        assert!(!game.step(true));
        assert_eq!(game.ticks, 0);
        assert_eq!(game.body.y, 300.0);
    }

    #[test]
    fn falling_without_input_ends_the_game() {
        let mut game = Game::new(Tunables::default(), 5);
        let mut steps = 0;
        while game.alive && steps < 1_000 {
            game.step(false);
            steps += 1;
        }
        assert!(!game.alive);
        assert_eq!(game.score, 0);
    }
}
