use flappy_neuro::config::Tunables;
use flappy_neuro::evaluator::{
    DeathCause, Entrant, Generation, Observation, Phase, PopulationEvaluator,
};
use flappy_neuro::mask::SpriteMasks;
use flappy_neuro::obstacle::Obstacle;
use flappy_neuro::snapshot::{JsonLinesRecorder, Snapshot};
use flappy_neuro::stream::ObstacleStream;

fn never(_: &Observation) -> f32 {
    0.0
}

fn generation_with<'a>(
    tunables: &Tunables,
    obstacles: Vec<Obstacle>,
    entrants: Vec<Entrant<'a>>,
) -> Generation<'a> {
    let stream = ObstacleStream::with_obstacles(tunables, obstacles);
    Generation::with_stream(
        1,
        tunables.clone(),
        SpriteMasks::standard(tunables),
        77,
        stream,
        entrants,
    )
}

#[test]
fn test_pass_bonus_goes_to_every_alive_agent() {
    let t = Tunables::default();
    let mut fitness = [0.0f64; 3];
    let mut policies = [never, never, never];
    let entrants: Vec<Entrant> = fitness
        .iter_mut()
        .zip(policies.iter_mut())
        .enumerate()
        .map(|(i, (f, p))| Entrant::new(i as u64, f, p))
        .collect();
    let mut generation =
        generation_with(&t, vec![Obstacle::with_gap(101.0, 200, &t)], entrants);

    let first = generation.tick();
    assert_eq!(first.passed, 0);
    assert!(first.deaths.is_empty());
    let before: f64 = generation.fitness().map(|(_, f)| f).sum();
    assert!((before - 0.3).abs() < 1e-9);

    let second = generation.tick();
    assert_eq!(second.passed, 1);
    assert_eq!(generation.score(), 1);
    let after: f64 = generation.fitness().map(|(_, f)| f).sum();
    assert!((after - before - (3.0 * 0.1 + 3.0 * 5.0)).abs() < 1e-9);
    for (_, f) in generation.fitness() {
        assert!((f - 5.2).abs() < 1e-9);
    }

    // the obstacle never pays out twice
    let third = generation.tick();
    assert_eq!(third.passed, 0);
    assert_eq!(generation.score(), 1);
}

#[test]
fn test_collision_removes_only_the_colliding_agent() {
    let t = Tunables::default();
    let mut grounded = 0.0f64;
    let mut climber = 0.0f64;
    let mut stay = never;
    let mut flapped = false;
    let mut flap_once = |_: &Observation| -> f32 {
        if flapped {
            0.0
        } else {
            flapped = true;
            1.0
        }
    };
    let entrants = vec![
        Entrant::new(0, &mut grounded, &mut stay),
        Entrant::new(1, &mut climber, &mut flap_once),
    ];
    // gap 240..455 sits around the first body; the second climbs into the top pipe
    let mut generation =
        generation_with(&t, vec![Obstacle::with_gap(100.0, 240, &t)], entrants);

    for tick in 1..=4 {
        let outcome = generation.tick();
        assert!(outcome.deaths.is_empty(), "unexpected death on tick {tick}");
        assert_eq!(generation.alive(), 2);
    }

    let fifth = generation.tick();
    assert_eq!(fifth.tick, 5);
    assert_eq!(generation.alive(), 1);
    assert_eq!(fifth.deaths.len(), 1);
    let death = fifth.deaths[0];
    assert_eq!(death.id, 1);
    assert_eq!(death.cause, DeathCause::Collision);
    // five survival ticks, one pass bonus on tick 2, one penalty
    assert!((death.fitness - 4.5).abs() < 1e-9);
    assert_eq!(fifth.phase, Phase::Running);

    let survivors: Vec<(u64, f64)> = generation.fitness().collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].0, 0);
    assert!((survivors[0].1 - 5.5).abs() < 1e-9);

    drop(generation);
    assert!((grounded - 5.5).abs() < 1e-9);
    assert!((climber - 4.5).abs() < 1e-9);
}

#[test]
fn test_simultaneous_deaths_are_not_skipped() {
    // flapping from y = 10 leaves the field on the first tick, gliding does not
    let t = Tunables {
        body_y: 10.0,
        ..Tunables::default()
    };
    let flaps = [true, false, true, true, false];
    let mut fitness = [0.0f64; 5];
    let mut policies: Vec<_> = flaps
        .iter()
        .map(|&flap| move |_: &Observation| if flap { 1.0f32 } else { 0.0 })
        .collect();
    let entrants: Vec<Entrant> = fitness
        .iter_mut()
        .zip(policies.iter_mut())
        .enumerate()
        .map(|(i, (f, p))| Entrant::new(i as u64, f, p))
        .collect();
    let mut generation = generation_with(&t, vec![Obstacle::with_gap(800.0, 200, &t)], entrants);

    let outcome = generation.tick();
    let dead: Vec<u64> = outcome.deaths.iter().map(|d| d.id).collect();
    assert_eq!(dead, vec![0, 2, 3]);
    assert!(outcome.deaths.iter().all(|d| d.cause == DeathCause::OutOfBounds));
    let alive: Vec<u64> = generation.bodies().map(|(id, _)| id).collect();
    assert_eq!(alive, vec![1, 4]);

    drop(generation);
    let penalized = fitness.iter().filter(|&&f| f < 0.0).count();
    assert_eq!(penalized, 3);
}

#[test]
fn test_generation_runs_to_extinction() {
    let mut fitness = [0.0f64; 4];
    let mut policies = [never, never, never, never];
    let entrants: Vec<Entrant> = fitness
        .iter_mut()
        .zip(policies.iter_mut())
        .enumerate()
        .map(|(i, (f, p))| Entrant::new(i as u64, f, p))
        .collect();
    let mut evaluator = PopulationEvaluator::new(Tunables::default(), 3);
    let report = evaluator.evaluate(entrants);
    assert_eq!(report.population, 4);
    assert_eq!(report.survivors, 0);
    assert!(report.ticks > 0);
    assert_eq!(report.score, 0);
    // identical bodies die together; the first one is reported as best
    assert_eq!(report.best, Some(0));
    assert!(fitness.iter().all(|&f| (f - report.best_fitness).abs() < 1e-9));
}

#[test]
fn test_same_seed_same_generation() {
    let run = |seed: u64| {
        let mut fitness = [0.0f64; 2];
        // flap whenever the body is far from the gap's upper edge
        let mut hover = |o: &Observation| if o.to_gap_top > 60.0 { 1.0f32 } else { 0.0 };
        let mut glide = never;
        let mut evaluator = PopulationEvaluator::new(
            Tunables {
                tick_limit: Some(3_000),
                ..Tunables::default()
            },
            seed,
        );
        let [a, b] = &mut fitness;
        let report = evaluator.evaluate(vec![
            Entrant::new(0, a, &mut hover),
            Entrant::new(1, b, &mut glide),
        ]);
        (report, fitness)
    };
    assert_eq!(run(11), run(11));
}

#[test]
fn test_recorder_writes_one_line_per_tick() {
    let t = Tunables {
        tick_limit: Some(5),
        ..Tunables::default()
    };
    let mut fitness = 0.0;
    let mut glide = never;
    let mut evaluator = PopulationEvaluator::new(t, 1);
    let mut recorder = JsonLinesRecorder::new(Vec::new());
    let report = evaluator.evaluate_observed(
        vec![Entrant::new(0, &mut fitness, &mut glide)],
        &mut recorder,
    );
    assert_eq!(report.ticks, 5);
    assert_eq!(recorder.frames(), 5);

    let bytes = recorder.finish().unwrap();
    let frames: Vec<Snapshot> = String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[4].tick, 5);
    assert_eq!(frames[0].generation, 1);
    assert_eq!(frames[0].bodies.len(), 1);
    assert!(!frames[0].obstacles.is_empty());
}
