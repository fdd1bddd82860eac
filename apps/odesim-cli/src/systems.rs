//! Built-in example systems.

use std::f64::consts::PI;

use odesim_core::{Func, Real, State, func};

const G: Real = 9.8;

/// A named ODE system with its initial conditions and default timespan.
pub struct System {
    pub name: &'static str,
    pub description: &'static str,
    pub x0: Vec<(&'static str, Real)>,
    pub diffs: Vec<(&'static str, Func)>,
    pub t_end: Real,
    pub steps: usize,
}

pub const NAMES: [&str; 4] = ["pendulum", "double-pendulum", "stiff-decay", "robertson"];

pub fn lookup(name: &str) -> Option<System> {
    match name {
        "pendulum" => Some(pendulum()),
        "double-pendulum" => Some(double_pendulum()),
        "stiff-decay" => Some(stiff_decay()),
        "robertson" => Some(robertson()),
        _ => None,
    }
}

fn pendulum() -> System {
    const L: Real = 1.0;
    System {
        name: "pendulum",
        description: "simple pendulum, 1 m arm released at 20 degrees",
        x0: vec![("theta", 20.0 * PI / 180.0), ("theta-dot", 0.0)],
        diffs: vec![
            ("theta", func(|s: &State| s.x("theta-dot"))),
            ("theta-dot", func(|s: &State| -G / L * s.x("theta").sin())),
        ],
        t_end: 8.0,
        steps: 100,
    }
}

/// Hamiltonian form with generalised momenta `mom1`, `mom2`.
fn double_pendulum() -> System {
    const L1: Real = 1.0;
    const L2: Real = 1.0;
    const M1: Real = 1.0;
    const M2: Real = 1.0;

    fn parts(s: &State) -> (Real, Real, Real, Real) {
        let delta = s.x("theta1") - s.x("theta2");
        let denom = M1 + M2 * delta.sin().powi(2);
        (s.x("mom1"), s.x("mom2"), delta, denom)
    }
    fn coupling(s: &State) -> Real {
        let (p1, p2, delta, denom) = parts(s);
        let c1 = p1 * p2 * delta.sin() / (L1 * L2 * denom);
        let c2 = (L2 * L2 * M2 * p1 * p1 + L1 * L1 * (M1 + M2) * p2 * p2
            - L1 * L2 * M2 * p1 * p2 * delta.cos())
            * (2.0 * delta).sin()
            / (2.0 * (L1 * L2 * denom).powi(2));
        c2 - c1
    }

    System {
        name: "double-pendulum",
        description: "double pendulum, both arms released at 20 degrees",
        x0: vec![
            ("theta1", 20.0 * PI / 180.0),
            ("mom1", 0.0),
            ("theta2", 20.0 * PI / 180.0),
            ("mom2", 0.0),
        ],
        diffs: vec![
            (
                "theta1",
                func(|s: &State| {
                    let (p1, p2, delta, denom) = parts(s);
                    (L2 * p1 - L1 * p2 * delta.cos()) / (L1 * L1 * L2 * denom)
                }),
            ),
            (
                "theta2",
                func(|s: &State| {
                    let (p1, p2, delta, denom) = parts(s);
                    (L1 * (M1 + M2) * p2 - L2 * M2 * p1 * delta.cos()) / (L1 * L2 * L2 * M2 * denom)
                }),
            ),
            (
                "mom1",
                func(|s: &State| -(M1 + M2) * G * L1 * s.x("theta1").sin() + coupling(s)),
            ),
            (
                "mom2",
                func(|s: &State| -M2 * G * L2 * s.x("theta2").sin() - coupling(s)),
            ),
        ],
        t_end: 8.0,
        steps: 100,
    }
}

fn stiff_decay() -> System {
    System {
        name: "stiff-decay",
        description: "y' = -15 y, stiff for explicit solvers at coarse steps",
        x0: vec![("y", 1.0)],
        diffs: vec![("y", func(|s: &State| -15.0 * s.x("y")))],
        t_end: 1.0,
        steps: 50,
    }
}

fn robertson() -> System {
    System {
        name: "robertson",
        description: "Robertson chemical kinetics, a classic stiff benchmark",
        x0: vec![("y1", 1.0), ("y2", 0.0), ("y3", 0.0)],
        diffs: vec![
            (
                "y1",
                func(|s: &State| -0.04 * s.x("y1") + 1e4 * s.x("y2") * s.x("y3")),
            ),
            (
                "y2",
                func(|s: &State| {
                    0.04 * s.x("y1") - 1e4 * s.x("y2") * s.x("y3") - 3e7 * s.x("y2").powi(2)
                }),
            ),
            ("y3", func(|s: &State| 3e7 * s.x("y2").powi(2))),
        ],
        t_end: 600.0,
        steps: 1200,
    }
}
