use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use flappy_neuro::evolve::RunSummary;
use flappy_neuro::{
    Entrant, EvolutionConfig, Game, Genome, InputLatch, JsonLinesRecorder, Network,
    PopulationEvaluator, Trainer, Tunables,
};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Generations never end on their own once an agent learns to fly forever.
const TRAIN_TICK_LIMIT: u64 = 20_000;

#[derive(Parser)]
#[command(name = "flappy-neuro")]
#[command(version)]
#[command(about = "Headless flappy-bird simulation trained by neuroevolution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write default tunables and evolution settings
    Init {
        #[arg(long, default_value = "tunables.json")]
        tunables: PathBuf,
        #[arg(long, default_value = "evolution.json")]
        evolution: PathBuf,
    },

    /// Evolve a population and optionally save the champion genome
    Train {
        #[command(flatten)]
        common: CommonArgs,
        /// Overrides the configured generation count
        #[arg(short, long)]
        generations: Option<u64>,
        /// Champion checkpoint (bincode)
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Train once per seed in parallel and compare the runs
    Sweep {
        #[command(flatten)]
        common: CommonArgs,
        /// Number of seeds, counting up from --seed
        #[arg(long, default_value = "8")]
        runs: u64,
        #[arg(short, long)]
        generations: Option<u64>,
    },

    /// Fly a saved genome alone for one generation
    Watch {
        genome: PathBuf,
        #[command(flatten)]
        common: CommonArgs,
        /// Write every frame as JSON lines
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Replay a tape of button states, one character per tick ('1' or '#' is pressed)
    Play {
        tape: String,
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(clap::Args, Clone)]
struct CommonArgs {
    /// Tunables file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Evolution settings file (JSON)
    #[arg(short, long)]
    evolution: Option<PathBuf>,
    #[arg(long, default_value = "0")]
    seed: u64,
    /// Caps ticks per generation
    #[arg(long)]
    tick_limit: Option<u64>,
}

impl CommonArgs {
    fn tunables(&self) -> Result<Tunables> {
        let mut tunables = match &self.config {
            Some(path) => Tunables::from_file(path)
                .with_context(|| format!("loading tunables from {}", path.display()))?,
            None => Tunables::default(),
        };
        if let Some(limit) = self.tick_limit {
            tunables.tick_limit = Some(limit);
        }
        tunables.validate().context("invalid tunables")?;
        Ok(tunables)
    }

    fn evolution(&self) -> Result<EvolutionConfig> {
        let config = match &self.evolution {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => EvolutionConfig::default(),
        };
        config.validate().context("invalid evolution settings")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init {
            tunables,
            evolution,
        } => init(&tunables, &evolution),
        Commands::Train {
            common,
            generations,
            save,
        } => train(&common, generations, save.as_deref()),
        Commands::Sweep {
            common,
            runs,
            generations,
        } => sweep(&common, runs, generations),
        Commands::Watch {
            genome,
            common,
            trace,
        } => watch(&genome, &common, trace.as_deref()),
        Commands::Play { tape, common } => play(&tape, &common),
    }
}

fn init(tunables: &Path, evolution: &Path) -> Result<()> {
    Tunables::default()
        .save(tunables)
        .with_context(|| format!("writing {}", tunables.display()))?;
    let json = serde_json::to_string_pretty(&EvolutionConfig::default())?;
    std::fs::write(evolution, json).with_context(|| format!("writing {}", evolution.display()))?;
    log::info!("wrote {} and {}", tunables.display(), evolution.display());
    Ok(())
}

fn training_tunables(common: &CommonArgs) -> Result<Tunables> {
    let mut tunables = common.tunables()?;
    if tunables.tick_limit.is_none() {
        log::info!("no tick limit configured, capping generations at {TRAIN_TICK_LIMIT} ticks");
        tunables.tick_limit = Some(TRAIN_TICK_LIMIT);
    }
    Ok(tunables)
}

fn run_training(
    tunables: Tunables,
    evolution: EvolutionConfig,
    seed: u64,
    generations: u64,
) -> Result<(Trainer, RunSummary)> {
    let mut trainer = Trainer::new(evolution, seed).context("building trainer")?;
    let mut evaluator = PopulationEvaluator::new(tunables, seed);
    let summary = trainer.run(&mut evaluator, generations, |_| {});
    Ok((trainer, summary))
}

fn train(common: &CommonArgs, generations: Option<u64>, save: Option<&Path>) -> Result<()> {
    let tunables = training_tunables(common)?;
    let evolution = common.evolution()?;
    let generations = generations.unwrap_or(evolution.generations);

    let start = Instant::now();
    let (trainer, summary) = run_training(tunables, evolution, common.seed, generations)?;
    log::info!(
        "trained {} generations in {:.1}s: best fitness {:.2}, best score {}{}",
        summary.generations,
        start.elapsed().as_secs_f64(),
        summary.best_fitness,
        summary.best_score,
        if summary.solved { " (threshold reached)" } else { "" }
    );

    if let Some(path) = save {
        let Some(champion) = trainer.champion() else {
            bail!("no generation was evaluated, nothing to save");
        };
        champion
            .save(path)
            .with_context(|| format!("saving champion to {}", path.display()))?;
        log::info!("champion {} saved to {}", champion.id, path.display());
    }
    Ok(())
}

fn sweep(common: &CommonArgs, runs: u64, generations: Option<u64>) -> Result<()> {
    let tunables = training_tunables(common)?;
    let evolution = common.evolution()?;
    let generations = generations.unwrap_or(evolution.generations);

    let results: Vec<(u64, RunSummary)> = (common.seed..common.seed + runs)
        .into_par_iter()
        .map(|seed| {
            run_training(tunables.clone(), evolution.clone(), seed, generations)
                .map(|(_, summary)| (seed, summary))
        })
        .collect::<Result<_>>()?;

    for (seed, summary) in &results {
        println!(
            "seed {:>4}  generations {:>3}  best fitness {:>9.2}  best score {:>4}  solved {}",
            seed, summary.generations, summary.best_fitness, summary.best_score, summary.solved
        );
    }
    let solved = results.iter().filter(|(_, s)| s.solved).count();
    println!("{solved}/{} runs reached the fitness threshold", results.len());
    Ok(())
}

fn watch(genome_path: &Path, common: &CommonArgs, trace: Option<&Path>) -> Result<()> {
    let tunables = training_tunables(common)?;
    let evolution = common.evolution()?;
    let mut genome = Genome::load(genome_path)
        .with_context(|| format!("loading genome from {}", genome_path.display()))?;
    let mut network = Network::new(&genome, evolution.input_scale);
    let mut evaluator = PopulationEvaluator::new(tunables, common.seed);
    let entrants = vec![Entrant::new(genome.id, &mut genome.fitness, &mut network)];

    let report = match trace {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut recorder = JsonLinesRecorder::new(BufWriter::new(file));
            let report = evaluator.evaluate_observed(entrants, &mut recorder);
            let frames = recorder.frames();
            recorder
                .finish()
                .with_context(|| format!("writing trace {}", path.display()))?;
            log::info!("{frames} frames written to {}", path.display());
            report
        }
        None => evaluator.evaluate(entrants),
    };
    println!(
        "genome {} flew {} ticks, score {}, fitness {:.2}",
        genome.id, report.ticks, report.score, genome.fitness
    );
    Ok(())
}

fn play(tape: &str, common: &CommonArgs) -> Result<()> {
    let tunables = common.tunables()?;
    let mut game = Game::new(tunables, common.seed);
    let mut latch = InputLatch::new();
    for (i, c) in tape.chars().enumerate() {
        let pressed = match c {
            '1' | '#' => true,
            '0' | '.' => false,
            other => bail!("unexpected tape character {other:?} at position {i}"),
        };
        if game.step(latch.poll(pressed)) {
            log::debug!("passed obstacle at tick {}", game.ticks);
        }
        if !game.alive {
            break;
        }
    }
    println!(
        "{} after {} ticks, score {}",
        if game.alive { "alive" } else { "crashed" },
        game.ticks,
        game.score
    );
    Ok(())
}
