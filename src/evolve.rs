//! Fixed-topology neuroevolution driving the population evaluator.
//!
//! Each genome is the weight vector of a 3-H-1 tanh network. Reproduction
//! keeps the fittest genomes and fills the rest of the population with
//! mutated copies of the top parents.

use crate::config::ConfigError;
use crate::evaluator::{Entrant, GenerationReport, Observation, Policy, PopulationEvaluator};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const INPUTS: usize = 3;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode genome: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode genome: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("genome has {actual} weights, expected {expected} for {hidden} hidden units")]
    Shape {
        hidden: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub hidden: usize,
    /// Genomes copied unchanged into the next generation.
    pub elites: usize,
    /// Share of the ranked population allowed to parent children.
    pub parent_fraction: f32,
    /// Chance that any single weight is perturbed.
    pub mutation_rate: f32,
    pub mutation_sigma: f32,
    pub init_range: f32,
    /// Observations are divided by this before entering the network.
    pub input_scale: f32,
    pub generations: u64,
    /// Stop early once a generation's best fitness reaches this.
    pub fitness_threshold: Option<f64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            hidden: 4,
            elites: 2,
            parent_fraction: 0.2,
            mutation_rate: 0.8,
            mutation_sigma: 0.25,
            init_range: 1.0,
            input_scale: 600.0,
            generations: 20,
            fitness_threshold: Some(100.0),
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::Invalid("population_size must be at least 1"));
        }
        if self.hidden == 0 {
            return Err(ConfigError::Invalid("hidden must be at least 1"));
        }
        if self.elites > self.population_size {
            return Err(ConfigError::Invalid("elites cannot exceed population_size"));
        }
        if !(self.parent_fraction > 0.0 && self.parent_fraction <= 1.0) {
            return Err(ConfigError::Invalid("parent_fraction must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::Invalid("mutation_rate must be in [0, 1]"));
        }
        if self.mutation_sigma < 0.0 || self.init_range <= 0.0 || self.input_scale <= 0.0 {
            return Err(ConfigError::Invalid(
                "mutation_sigma, init_range and input_scale must be positive",
            ));
        }
        Ok(())
    }
}

pub fn weight_count(hidden: usize) -> usize {
    hidden * (INPUTS + 1) + hidden + 1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    pub hidden: usize,
    pub weights: Vec<f32>,
    pub fitness: f64,
}

impl Genome {
    pub fn random<R: Rng>(id: u64, hidden: usize, range: f32, rng: &mut R) -> Self {
        let weights = (0..weight_count(hidden))
            .map(|_| rng.gen_range(-range..range))
            .collect();
        Self {
            id,
            hidden,
            weights,
            fitness: 0.0,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError> {
        let bytes = std::fs::read(path)?;
        let (genome, _): (Genome, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())?;
        let expected = weight_count(genome.hidden);
        if genome.weights.len() != expected {
            return Err(CheckpointError::Shape {
                hidden: genome.hidden,
                expected,
                actual: genome.weights.len(),
            });
        }
        Ok(genome)
    }
}

/// Feed-forward decision network built from a genome.
#[derive(Debug, Clone)]
pub struct Network {
    hidden: usize,
    weights: Vec<f32>,
    input_scale: f32,
    activations: Vec<f32>,
}

impl Network {
    pub fn new(genome: &Genome, input_scale: f32) -> Self {
        Self {
            hidden: genome.hidden,
            weights: genome.weights.clone(),
            input_scale,
            activations: vec![0.0; genome.hidden],
        }
    }

    pub fn forward(&mut self, inputs: [f32; INPUTS]) -> f32 {
        let stride = INPUTS + 1;
        for h in 0..self.hidden {
            let w = &self.weights[h * stride..(h + 1) * stride];
            let mut sum = w[INPUTS];
            for (i, x) in inputs.iter().enumerate() {
                sum += w[i] * x / self.input_scale;
            }
            self.activations[h] = sum.tanh();
        }
        let out = &self.weights[self.hidden * stride..];
        let mut sum = out[self.hidden];
        for (h, a) in self.activations.iter().enumerate() {
            sum += out[h] * a;
        }
        sum.tanh()
    }
}

impl Policy for Network {
    fn activate(&mut self, observation: &Observation) -> f32 {
        self.forward(observation.as_array())
    }
}

fn mutate_genome<R: Rng>(genome: &mut Genome, rng: &mut R, rate: f32, sigma: f32) {
    if sigma == 0.0 {
        return;
    }
    for w in genome.weights.iter_mut() {
        if rng.gen_range(0.0..1.0) < rate {
            *w += rng.gen_range(-sigma..sigma);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generations: u64,
    pub best_fitness: f64,
    pub best_score: u64,
    pub solved: bool,
}

pub struct Trainer {
    config: EvolutionConfig,
    population: Vec<Genome>,
    generation: u64,
    next_id: u64,
    epoch_best: Vec<f64>,
    best_score: u64,
    champion: Option<Genome>,
    rng: SmallRng,
}

impl Trainer {
    pub fn new(config: EvolutionConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = SmallRng::seed_from_u64(seed);
        let population: Vec<Genome> = (0..config.population_size as u64)
            .map(|id| Genome::random(id, config.hidden, config.init_range, &mut rng))
            .collect();
        Ok(Self {
            next_id: population.len() as u64,
            population,
            config,
            generation: 0,
            epoch_best: Vec::new(),
            best_score: 0,
            champion: None,
            rng,
        })
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Best fitness of every evaluated generation, oldest first.
    pub fn epoch_best(&self) -> &[f64] {
        &self.epoch_best
    }

    pub fn champion(&self) -> Option<&Genome> {
        self.champion.as_ref()
    }

    /// Scores the current population with one evaluator generation.
    pub fn evaluate(&mut self, evaluator: &mut PopulationEvaluator) -> GenerationReport {
        let mut networks: Vec<Network> = self
            .population
            .iter()
            .map(|g| Network::new(g, self.config.input_scale))
            .collect();
        let entrants = self
            .population
            .iter_mut()
            .zip(networks.iter_mut())
            .map(|(genome, network)| Entrant::new(genome.id, &mut genome.fitness, network));
        let report = evaluator.evaluate(entrants);

        self.generation += 1;
        self.best_score = self.best_score.max(report.score);
        if let Some(best) = self
            .population
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
        {
            self.epoch_best.push(best.fitness);
            if self
                .champion
                .as_ref()
                .is_none_or(|c| best.fitness > c.fitness)
            {
                self.champion = Some(best.clone());
            }
        }
        report
    }

    /// Replaces the population with elites plus mutated children of the top parents.
    pub fn reproduce(&mut self) {
        let mut ranked: Vec<usize> = (0..self.population.len()).collect();
        ranked.sort_by(|&a, &b| {
            self.population[b]
                .fitness
                .total_cmp(&self.population[a].fitness)
        });

        let size = self.config.population_size;
        let parents = ((size as f32 * self.config.parent_fraction).ceil() as usize).clamp(1, size);
        let mut next: Vec<Genome> = Vec::with_capacity(size);
        for &i in ranked.iter().take(self.config.elites) {
            let mut elite = self.population[i].clone();
            elite.fitness = 0.0;
            next.push(elite);
        }
        while next.len() < size {
            let parent = &self.population[ranked[self.rng.gen_range(0..parents)]];
            let mut child = parent.clone();
            child.id = self.next_id;
            child.fitness = 0.0;
            self.next_id += 1;
            mutate_genome(
                &mut child,
                &mut self.rng,
                self.config.mutation_rate,
                self.config.mutation_sigma,
            );
            next.push(child);
        }
        self.population = next;
    }

    /// Evaluates up to `generations` generations, reproducing between them.
    /// Stops early once the fitness threshold is reached.
    pub fn run(
        &mut self,
        evaluator: &mut PopulationEvaluator,
        generations: u64,
        mut on_generation: impl FnMut(&GenerationReport),
    ) -> RunSummary {
        let mut solved = false;
        for remaining in (0..generations).rev() {
            let report = self.evaluate(evaluator);
            log::info!(
                "generation {}: best fitness {:.2}, score {}, {} ticks",
                report.generation,
                report.best_fitness,
                report.score,
                report.ticks
            );
            on_generation(&report);
            if self
                .config
                .fitness_threshold
                .is_some_and(|threshold| report.best_fitness >= threshold)
            {
                log::info!("fitness threshold reached in generation {}", report.generation);
                solved = true;
                break;
            }
            if remaining > 0 {
                self.reproduce();
            }
        }
        RunSummary {
            generations: self.generation,
            best_fitness: self.champion.as_ref().map_or(0.0, |c| c.fitness),
            best_score: self.best_score,
            solved,
        }
    }
}
