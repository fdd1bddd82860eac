//! Verification, run-state transitions, result access and logging.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use odesim_sim::{
    Config, IntegratorType, ResultsLogger, SimError, Simulation, State, Status, func, load_json,
    load_yaml,
};

/// Identity derivative for `x` and a constant input `u`.
fn working_sim() -> Simulation {
    let mut sim = Simulation::new();
    sim.set_diff_from_map([("x", func(|_: &State| 1.0))]);
    sim.set_x0_from_map([("x", 1.0)]);
    sim.set_input_from_map([("u", func(|_: &State| 1.0))]);
    sim.set_timespan(0.0, 1.0, 10).unwrap();
    sim
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn working_sim_completes() {
    let mut sim = working_sim();
    sim.begin().unwrap();
    assert_eq!(sim.status(), Status::Completed);
    assert_eq!(sim.current_time(), 1.0);
    assert_eq!(sim.steps_taken(), 10);
}

#[test]
fn rerun_is_rejected() {
    let mut sim = working_sim();
    sim.begin().unwrap();
    assert!(matches!(sim.begin(), Err(SimError::AlreadyExecuted)));
}

#[test]
fn faulted_run_cannot_restart() {
    let mut sim = Simulation::new();
    sim.set_timespan(0.0, 1.0, 10).unwrap();
    sim.set_x0_from_map([("y", 1.0)]);
    sim.set_diff_from_map([("z", func(|_: &State| 1.0))]);
    assert!(matches!(sim.begin(), Err(SimError::Inconsistent { .. })));
    assert_eq!(sim.status(), Status::Faulted);

    // repairing the equations does not revive the run
    sim.set_diff_from_map([("y", func(|_: &State| 1.0))]);
    assert!(matches!(sim.begin(), Err(SimError::AlreadyExecuted)));
    assert_eq!(sim.status(), Status::Faulted);
    assert_eq!(sim.steps_taken(), 0);
    assert!(matches!(sim.results("y"), Err(SimError::NotCompleted)));
}

#[test]
fn missing_timespan_is_rejected() {
    let mut sim = Simulation::new();
    sim.set_diff_from_map([("x", func(|_: &State| 1.0))]);
    sim.set_x0_from_map([("x", 1.0)]);
    assert!(matches!(sim.begin(), Err(SimError::NotReady { .. })));
    assert_eq!(sim.status(), Status::Faulted);
}

#[test]
fn bad_timespans_are_rejected() {
    let mut sim = Simulation::new();
    assert!(matches!(sim.set_timespan(1.0, 0.0, 10), Err(SimError::Timespan { .. })));
    assert!(sim.set_timespan(0.0, 1.0, 0).is_err());
    assert!(sim.set_timespan(20.0, 20.0, 10).is_err());
    assert!(sim.timespan().is_none());
}

#[test]
fn mismatched_equations_are_rejected() {
    let id = || func(|_: &State| 1.0);
    let cases: Vec<(Vec<(&str, _)>, Vec<(&str, f64)>)> = vec![
        (vec![("x", id()), ("y", id())], vec![("u", 1.0)]),
        (vec![("x", id())], vec![("y", 1.0)]),
        (vec![("x", id())], vec![]),
        (vec![], vec![("y", 1.0)]),
    ];
    for (diffs, x0) in cases {
        let mut sim = Simulation::new();
        sim.set_timespan(0.0, 1.0, 10).unwrap();
        sim.set_diff_from_map(diffs);
        sim.set_x0_from_map(x0);
        assert!(sim.begin().is_err());
        assert_eq!(sim.status(), Status::Faulted);
    }
}

#[test]
fn inconsistency_names_first_symbol_and_count() {
    let mut sim = Simulation::new();
    sim.set_timespan(0.0, 1.0, 10).unwrap();
    sim.set_x0_from_map([("a", 1.0)]);
    sim.set_diff_from_map([
        ("a", func(|_: &State| 1.0)),
        ("b", func(|_: &State| 1.0)),
        ("c", func(|_: &State| 1.0)),
    ]);
    match sim.begin().unwrap_err() {
        SimError::Inconsistent { first, others, .. } => {
            assert_eq!(first.as_str(), "b");
            assert_eq!(others, 1);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn unset_solver_is_rejected() {
    let mut sim = working_sim();
    sim.config_mut().algorithm.solver = None;
    assert!(matches!(sim.begin(), Err(SimError::NotReady { .. })));
}

#[test]
fn empty_domain_is_rejected() {
    let mut sim = working_sim();
    sim.config_mut().domain = "".into();
    assert!(matches!(sim.begin(), Err(SimError::Config(_))));
}

#[test]
fn zero_algorithm_steps_is_rejected() {
    let mut sim = working_sim();
    sim.config_mut().algorithm.steps = 0;
    assert!(matches!(sim.begin(), Err(SimError::Config(_))));
}

#[test]
fn results_cover_domain_state_and_inputs() {
    let mut sim = working_sim();
    sim.begin().unwrap();
    assert_eq!(sim.results("u").unwrap().len(), 11);
    assert_eq!(sim.results("x").unwrap().len(), 11);
    assert!((sim.results("x").unwrap()[10] - 2.0).abs() < 1e-12);
    assert!(matches!(
        sim.results("unknown"),
        Err(SimError::SymbolNotFound { .. })
    ));
}

#[test]
fn custom_domain_name() {
    let mut sim = working_sim();
    sim.config_mut().domain = "t".into();
    sim.begin().unwrap();
    assert_eq!(sim.results("t").unwrap().len(), 11);
    assert!(sim.results("time").is_err());
}

#[test]
fn states_before_run_are_unavailable() {
    let sim = working_sim();
    assert!(matches!(sim.states(), Err(SimError::NotCompleted)));
    assert!(sim.for_each_state(|_| {}).is_err());
}

#[test]
fn states_match_results() {
    let mut sim = working_sim();
    sim.begin().unwrap();
    let time = sim.results("time").unwrap();
    let states = sim.states().unwrap();
    assert_eq!(time.len(), states.len());

    let mut visited = 0;
    sim.for_each_state(|s| {
        assert_eq!(s.time(), time[visited]);
        assert_eq!(s.x_vector(), states[visited].x_vector());
        visited += 1;
    })
    .unwrap();
    assert_eq!(visited, states.len());
}

#[test]
fn symbols_sorted_unless_disabled() {
    let mut sim = Simulation::new();
    sim.set_x0_from_map([("b", 1.0), ("a", 2.0)]);
    sim.set_diff_from_map([("a", func(|_: &State| 0.0)), ("b", func(|_: &State| 0.0))]);
    sim.set_timespan(0.0, 1.0, 2).unwrap();
    sim.begin().unwrap();
    let names: Vec<&str> = sim.states().unwrap()[0]
        .x_symbols()
        .iter()
        .map(|s| s.as_str())
        .collect();
    assert_eq!(names, ["a", "b"]);

    let mut sim = Simulation::new();
    sim.config_mut().symbols.no_ordering = true;
    sim.set_x0_from_map([("b", 1.0), ("a", 2.0)]);
    sim.set_diff_from_map([("a", func(|_: &State| 0.0)), ("b", func(|_: &State| 0.0))]);
    sim.set_timespan(0.0, 1.0, 2).unwrap();
    sim.begin().unwrap();
    let names: Vec<&str> = sim.states().unwrap()[0]
        .x_symbols()
        .iter()
        .map(|s| s.as_str())
        .collect();
    assert_eq!(names, ["b", "a"]);
}

#[test]
fn nan_derivative_faults_mid_run() {
    let mut sim = Simulation::new();
    sim.set_x0_from_map([("x", 1.0)]);
    sim.set_diff_from_map([(
        "x",
        func(|s: &State| if s.time() > 0.45 { f64::NAN } else { 1.0 }),
    )]);
    sim.set_timespan(0.0, 1.0, 10).unwrap();
    sim.set_solver(IntegratorType::Rk4);
    assert!(matches!(sim.begin(), Err(SimError::Solver(_))));
    assert_eq!(sim.status(), Status::Faulted);
    assert!((sim.current_time() - 0.4).abs() < 1e-12);
}

#[test]
fn logger_writes_parseable_table() {
    let buffer = SharedBuffer::default();
    let mut sim = Simulation::new();
    sim.config_mut().log.format_len = 6;
    sim.set_diff_from_map([
        ("y", func(|_: &State| 0.1)),
        ("x", func(|_: &State| 0.1)),
    ]);
    sim.set_x0_from_map([("y", 0.0), ("x", 1.0)]);
    sim.set_timespan(0.0, 1.0, 10).unwrap();
    sim.set_logger(ResultsLogger::new(buffer.clone()));
    sim.begin().unwrap();

    let text = buffer.text();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').map(str::trim).collect();
    assert_eq!(header, ["time", "x", "y"]);

    let rows: Vec<Vec<f64>> = lines
        .map(|line| {
            line.split(',')
                .map(|v| v.trim().parse::<f64>().unwrap())
                .collect()
        })
        .collect();
    assert_eq!(rows.len(), 11);
    assert!(rows.iter().all(|r| r.len() == 3));
    assert_eq!(rows[0], [0.0, 1.0, 0.0]);
    assert!((rows[10][1] - 1.1).abs() < 1e-12);
}

#[test]
fn config_files_load() {
    let dir = std::env::temp_dir().join(format!("odesim_config_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let yaml = dir.join("sim.yaml");
    std::fs::write(
        &yaml,
        "domain: t\nalgorithm:\n  solver: newton_raphson\n  iteration_max: 25\nlog:\n  separator: \";\"\n",
    )
    .unwrap();
    let config = load_yaml(&yaml).unwrap();
    assert_eq!(config.domain.as_str(), "t");
    assert_eq!(config.algorithm.solver, Some(IntegratorType::NewtonRaphson));
    assert_eq!(config.algorithm.iteration_max, Some(25));
    assert_eq!(config.log.separator, ";");

    let json = dir.join("sim.json");
    std::fs::write(&json, r#"{"algorithm": {"steps": 0}}"#).unwrap();
    assert!(matches!(load_json(&json), Err(SimError::Config(_))));

    assert!(matches!(load_yaml(&dir.join("missing.yaml")), Err(SimError::Io(_))));

    let mut sim = Simulation::with_config(config);
    sim.set_diff_from_map([("x", func(|s: &State| -s.x("x")))]);
    sim.set_x0_from_map([("x", 1.0)]);
    sim.set_timespan(0.0, 1.0, 10).unwrap();
    sim.begin().unwrap();
    assert_eq!(sim.results("t").unwrap().len(), 11);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn default_config_round_trips_through_yaml() {
    let config = Config::default();
    let text = config.to_yaml().unwrap();
    assert_eq!(Config::from_yaml_str(&text).unwrap(), config);
}
