//! Population fitness evaluation.
//!
//! The evolution engine calls [`PopulationEvaluator::evaluate`] once per
//! generation with one [`Entrant`] per genome. Every entrant gets its own body;
//! all of them fly through one shared obstacle stream until none is left.

use crate::body::PhysicsBody;
use crate::config::Tunables;
use crate::mask::{SpriteMasks, overlaps};
use crate::obstacle::Obstacle;
use crate::snapshot::{BodyView, FrameObserver, NoopObserver, Snapshot};
use crate::stream::ObstacleStream;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub type AgentId = u64;

/// Decision network inputs: height and distance to both gap edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub y: f32,
    pub to_gap_top: f32,
    pub to_gap_bottom: f32,
}

impl Observation {
    pub fn new(body: &PhysicsBody, obstacle: &Obstacle) -> Self {
        Self {
            y: body.y,
            to_gap_top: (body.y - obstacle.gap_top() as f32).abs(),
            to_gap_bottom: (body.y - obstacle.gap_bottom() as f32).abs(),
        }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.y, self.to_gap_top, self.to_gap_bottom]
    }
}

/// Maps an observation to a flap signal. Outputs above the decision threshold flap.
pub trait Policy {
    fn activate(&mut self, observation: &Observation) -> f32;
}

impl<F: FnMut(&Observation) -> f32> Policy for F {
    fn activate(&mut self, observation: &Observation) -> f32 {
        self(observation)
    }
}

/// One genome's stake in a generation: its fitness slot and its policy.
pub struct Entrant<'a> {
    pub id: AgentId,
    pub fitness: &'a mut f64,
    pub policy: &'a mut dyn Policy,
}

impl<'a> Entrant<'a> {
    pub fn new(id: AgentId, fitness: &'a mut f64, policy: &'a mut dyn Policy) -> Self {
        Self {
            id,
            fitness,
            policy,
        }
    }
}

struct Agent<'a> {
    id: AgentId,
    body: PhysicsBody,
    fitness: &'a mut f64,
    policy: &'a mut dyn Policy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Running,
    GenerationComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    OutOfBounds,
    Collision,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Death {
    pub id: AgentId,
    pub tick: u64,
    pub cause: DeathCause,
    pub fitness: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub phase: Phase,
    pub deaths: Vec<Death>,
    /// Obstacles that became passed this tick.
    pub passed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: u64,
    pub population: usize,
    pub ticks: u64,
    pub score: u64,
    /// Agents still alive when a tick limit ended the generation.
    pub survivors: usize,
    pub best: Option<AgentId>,
    pub best_fitness: f64,
}

/// One generation's tick loop. Built by [`PopulationEvaluator::begin`] or
/// directly with a hand-placed obstacle stream.
pub struct Generation<'a> {
    number: u64,
    tunables: Tunables,
    masks: SpriteMasks,
    rng: SmallRng,
    stream: ObstacleStream,
    agents: Vec<Agent<'a>>,
    population: usize,
    tick: u64,
    score: u64,
    phase: Phase,
    best: Option<(AgentId, f64)>,
}

impl<'a> Generation<'a> {
    pub fn new(
        number: u64,
        tunables: Tunables,
        masks: SpriteMasks,
        seed: u64,
        entrants: impl IntoIterator<Item = Entrant<'a>>,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let stream = ObstacleStream::new(&tunables, &mut rng);
        Self::assemble(number, tunables, masks, rng, stream, entrants)
    }

    pub fn with_stream(
        number: u64,
        tunables: Tunables,
        masks: SpriteMasks,
        seed: u64,
        stream: ObstacleStream,
        entrants: impl IntoIterator<Item = Entrant<'a>>,
    ) -> Self {
        let rng = SmallRng::seed_from_u64(seed);
        Self::assemble(number, tunables, masks, rng, stream, entrants)
    }

    fn assemble(
        number: u64,
        tunables: Tunables,
        masks: SpriteMasks,
        rng: SmallRng,
        stream: ObstacleStream,
        entrants: impl IntoIterator<Item = Entrant<'a>>,
    ) -> Self {
        let agents: Vec<Agent<'a>> = entrants
            .into_iter()
            .map(|entrant| {
                *entrant.fitness = 0.0;
                Agent {
                    id: entrant.id,
                    body: PhysicsBody::spawn(&tunables),
                    fitness: entrant.fitness,
                    policy: entrant.policy,
                }
            })
            .collect();
        let phase = if agents.is_empty() {
            Phase::GenerationComplete
        } else {
            Phase::Running
        };
        Self {
            number,
            population: agents.len(),
            tunables,
            masks,
            rng,
            stream,
            agents,
            tick: 0,
            score: 0,
            phase,
            best: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn alive(&self) -> usize {
        self.agents.len()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn stream(&self) -> &ObstacleStream {
        &self.stream
    }

    pub fn bodies(&self) -> impl Iterator<Item = (AgentId, &PhysicsBody)> {
        self.agents.iter().map(|a| (a.id, &a.body))
    }

    /// Current fitness of every alive agent, in population order.
    pub fn fitness(&self) -> impl Iterator<Item = (AgentId, f64)> {
        self.agents.iter().map(|a| (a.id, *a.fitness))
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.number,
            tick: self.tick,
            score: self.score,
            obstacles: Snapshot::obstacle_views(&self.stream),
            bodies: self
                .agents
                .iter()
                .map(|a| BodyView {
                    id: a.id,
                    x: a.body.x,
                    y: a.body.y,
                    velocity: a.body.velocity,
                })
                .collect(),
        }
    }

    fn record_final(&mut self, id: AgentId, fitness: f64) {
        if self.best.is_none_or(|(_, best)| fitness > best) {
            self.best = Some((id, fitness));
        }
    }

    /// Advances every alive agent and the obstacle stream by one tick.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase == Phase::GenerationComplete {
            return TickOutcome {
                tick: self.tick,
                phase: self.phase,
                deaths: Vec::new(),
                passed: 0,
            };
        }
        self.tick += 1;

        let t = &self.tunables;
        let mut deaths = Vec::new();
        for agent in self.agents.iter_mut() {
            let obstacle = self.stream.active_for(agent.body.x);
            let observation = Observation::new(&agent.body, obstacle);
            if agent.policy.activate(&observation) > t.decision_threshold {
                agent.body.flap();
            }
            agent.body.apply_gravity();
            *agent.fitness += t.survival_bonus;

            let cause = if agent.body.out_of_bounds(t.field_height) {
                Some(DeathCause::OutOfBounds)
            } else if self
                .stream
                .obstacles()
                .iter()
                .any(|o| overlaps(&agent.body, o, &self.masks))
            {
                Some(DeathCause::Collision)
            } else {
                None
            };
            if let Some(cause) = cause {
                *agent.fitness -= t.death_penalty;
                agent.body.alive = false;
                log::trace!("agent {} died at tick {} ({:?})", agent.id, self.tick, cause);
                deaths.push(Death {
                    id: agent.id,
                    tick: self.tick,
                    cause,
                    fitness: *agent.fitness,
                });
            }
        }
        self.agents.retain(|a| a.body.alive);
        for death in &deaths {
            self.record_final(death.id, death.fitness);
        }

        let bodies_x: Vec<f32> = self.agents.iter().map(|a| a.body.x).collect();
        let passed = self.stream.step(&bodies_x, &self.tunables, &mut self.rng);
        if passed > 0 {
            self.score += passed as u64;
            let bonus = self.tunables.pass_bonus * passed as f64;
            for agent in self.agents.iter_mut() {
                *agent.fitness += bonus;
            }
        }

        let limit_hit = self.tunables.tick_limit.is_some_and(|limit| self.tick >= limit);
        if self.agents.is_empty() || limit_hit {
            self.phase = Phase::GenerationComplete;
        }
        TickOutcome {
            tick: self.tick,
            phase: self.phase,
            deaths,
            passed,
        }
    }

    /// Ticks until the generation completes, showing every frame to `observer`.
    pub fn run(mut self, observer: &mut dyn FrameObserver) -> GenerationReport {
        while self.phase == Phase::Running {
            self.tick();
            observer.observe(&self.snapshot());
        }
        self.finish()
    }

    fn finish(mut self) -> GenerationReport {
        let survivors: Vec<(AgentId, f64)> =
            self.agents.iter().map(|a| (a.id, *a.fitness)).collect();
        for (id, fitness) in &survivors {
            self.record_final(*id, *fitness);
        }
        let report = GenerationReport {
            generation: self.number,
            population: self.population,
            ticks: self.tick,
            score: self.score,
            survivors: survivors.len(),
            best: self.best.map(|(id, _)| id),
            best_fitness: self.best.map_or(0.0, |(_, f)| f),
        };
        log::debug!(
            "generation {} complete: {} ticks, score {}, best fitness {:.2}",
            report.generation,
            report.ticks,
            report.score,
            report.best_fitness
        );
        report
    }
}

/// Runs generations for an external evolution engine. Owns the tunables,
/// collision masks and the generation counter.
pub struct PopulationEvaluator {
    tunables: Tunables,
    masks: SpriteMasks,
    rng: SmallRng,
    generation: u64,
}

impl PopulationEvaluator {
    pub fn new(tunables: Tunables, seed: u64) -> Self {
        let masks = SpriteMasks::standard(&tunables);
        Self::with_masks(tunables, masks, seed)
    }

    pub fn with_masks(tunables: Tunables, masks: SpriteMasks, seed: u64) -> Self {
        Self {
            tunables,
            masks,
            rng: SmallRng::seed_from_u64(seed),
            generation: 0,
        }
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// Generations evaluated so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts the next generation without running it.
    pub fn begin<'a>(&mut self, entrants: impl IntoIterator<Item = Entrant<'a>>) -> Generation<'a> {
        self.generation += 1;
        let seed = self.rng.r#gen::<u64>();
        Generation::new(
            self.generation,
            self.tunables.clone(),
            self.masks.clone(),
            seed,
            entrants,
        )
    }

    pub fn evaluate<'a>(&mut self, entrants: impl IntoIterator<Item = Entrant<'a>>) -> GenerationReport {
        self.evaluate_observed(entrants, &mut NoopObserver)
    }

    pub fn evaluate_observed<'a>(
        &mut self,
        entrants: impl IntoIterator<Item = Entrant<'a>>,
        observer: &mut dyn FrameObserver,
    ) -> GenerationReport {
        self.begin(entrants).run(observer)
    }
}
