//! Headless flappy-bird simulation with a population fitness evaluator for
//! neuroevolution.

pub mod body;
pub mod config;
pub mod evaluator;
pub mod evolve;
pub mod game;
pub mod mask;
pub mod obstacle;
pub mod snapshot;
pub mod stream;

pub use body::PhysicsBody;
pub use config::{ConfigError, Tunables};
pub use evaluator::{
    AgentId, Entrant, Generation, GenerationReport, Observation, Phase, Policy, PopulationEvaluator,
};
pub use evolve::{EvolutionConfig, Genome, Network, Trainer};
pub use game::{Game, InputLatch};
pub use mask::{Mask, SpriteMasks};
pub use obstacle::Obstacle;
pub use snapshot::{FrameObserver, JsonLinesRecorder, Snapshot};
pub use stream::ObstacleStream;
