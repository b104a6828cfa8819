use crate::config::Tunables;
use crate::obstacle::Obstacle;
use rand::Rng;

/// Obstacles in creation order. The newest obstacle is never evicted, so the
/// stream is never empty once built.
#[derive(Debug, Clone)]
pub struct ObstacleStream {
    obstacles: Vec<Obstacle>,
    field_width: f32,
    spawn_trigger_distance: f32,
    spawned: u64,
}

impl ObstacleStream {
    pub fn new<R: Rng>(tunables: &Tunables, rng: &mut R) -> Self {
        let first = Obstacle::spawn(tunables.field_width, rng, tunables);
        Self::with_obstacles(tunables, vec![first])
    }

    /// Stream seeded with hand-placed obstacles, oldest first.
    pub fn with_obstacles(tunables: &Tunables, obstacles: Vec<Obstacle>) -> Self {
        assert!(!obstacles.is_empty(), "an obstacle stream needs at least one obstacle");
        Self {
            spawned: obstacles.len() as u64,
            obstacles,
            field_width: tunables.field_width,
            spawn_trigger_distance: tunables.spawn_trigger_distance,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Total obstacles ever created, evicted ones included.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// One tick: mark passes, advance, spawn, then evict. Returns how many
    /// obstacles became passed during this tick.
    pub fn step<R: Rng>(&mut self, bodies_x: &[f32], tunables: &Tunables, rng: &mut R) -> usize {
        let mut newly_passed = 0;
        for obstacle in &mut self.obstacles {
            // all bodies share one anchor, but any of them crossing counts once
            if bodies_x.iter().any(|&x| obstacle.mark_passed_if(x)) {
                newly_passed += 1;
            }
            obstacle.update();
        }
        self.maybe_spawn(tunables, rng);
        self.evict();
        newly_passed
    }

    pub fn maybe_spawn<R: Rng>(&mut self, tunables: &Tunables, rng: &mut R) -> bool {
        let Some(newest) = self.obstacles.last() else {
            return false;
        };
        if newest.x < self.field_width - self.spawn_trigger_distance {
            self.obstacles
                .push(Obstacle::spawn(self.field_width, rng, tunables));
            self.spawned += 1;
            log::trace!("obstacle #{} spawned", self.spawned);
            return true;
        }
        false
    }

    pub fn evict(&mut self) {
        self.obstacles.retain(|o| !o.off_screen());
    }

    /// Nearest obstacle whose trailing edge is not yet behind `body_x`; the
    /// newest one if every obstacle is behind.
    pub fn active_for(&self, body_x: f32) -> &Obstacle {
        self.obstacles
            .iter()
            .find(|o| body_x <= o.trailing_edge())
            .or_else(|| self.obstacles.last())
            .expect("obstacle stream is never empty")
    }
}
