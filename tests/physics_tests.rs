use flappy_neuro::body::{PhysicsBody, with_gravity};
use flappy_neuro::config::Tunables;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_velocity_never_exceeds_terminal() {
    let t = Tunables::default();
    let mut rng = SmallRng::seed_from_u64(42);
    let mut body = PhysicsBody::spawn(&t);
    for _ in 0..5_000 {
        if rng.gen_range(0..10) == 0 {
            body.flap();
        }
        body.apply_gravity();
        assert!(
            body.velocity <= t.terminal_velocity,
            "velocity {} above terminal",
            body.velocity
        );
    }
}

#[test]
fn test_free_fall_matches_closed_form() {
    let t = Tunables::default();
    let mut body = PhysicsBody::spawn(&t);
    assert_eq!(body.y, 300.0);
    for _ in 0..20 {
        body = with_gravity(body);
    }
    // v_k = -5 + 0.8k stays below 15 for k <= 20
    let n = 20.0f32;
    let expected = 300.0 + n * -5.0 + 0.8 * n * (n + 1.0) / 2.0;
    assert!((body.y - expected).abs() < 1e-2, "y = {}, expected {}", body.y, expected);
    assert!((expected - 368.0).abs() < 1e-3);
}

#[test]
fn test_velocity_clamps_at_terminal() {
    let t = Tunables::default();
    let mut body = PhysicsBody::spawn(&t);
    for _ in 0..40 {
        body.apply_gravity();
    }
    assert_eq!(body.velocity, 15.0);
    let before = body.y;
    body.apply_gravity();
    assert_eq!(body.velocity, 15.0);
    assert!((body.y - before - 15.0).abs() < 1e-3);
}

#[test]
fn test_flap_is_observable_after_gravity() {
    let t = Tunables::default();
    let mut body = PhysicsBody::spawn(&t);
    body.velocity = t.terminal_velocity;
    body.flap();
    body.apply_gravity();
    assert!(body.velocity < 0.0);
    assert!(body.y < 300.0);
}
