//! The simulation driver.
//!
//! A [`Simulation`] owns the configuration, the initial state, the derivative
//! and input function maps, the solver and the event handlers. [`Simulation::begin`]
//! verifies that these fit together, then advances the state one domain step
//! at a time until the end of the timespan or an end event. Every accepted
//! sub-state is appended to the result history.

use std::sync::Arc;
use std::time::Duration;

use odesim_core::{Diffs, Func, FuncMap, Real, Space, State, Symbol};
use odesim_solver::{Integrator, SolverError, StepInput};
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{SimError, SimResult};
use crate::events::{Event, EventHandler, EventRecord, HandlerSlot};
use crate::logger::{LogOptions, ResultsLogger};
use crate::timespan::Timespan;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    NotStarted,
    Running,
    Completed,
    Faulted,
}

pub struct Simulation {
    config: Config,
    timespan: Option<Timespan>,
    state: State,
    diff_map: FuncMap,
    input_map: FuncMap,
    diffs: Diffs,
    solver: Option<Box<dyn Integrator>>,
    handlers: Vec<HandlerSlot>,
    logger: Option<ResultsLogger>,

    status: Status,
    results: Vec<State>,
    events: Vec<EventRecord>,
    steps_taken: usize,
    span_step: usize,
    sub_steps: usize,
    rejected: usize,
    tolerance_exceeded: bool,
    stop_requested: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            timespan: None,
            state: State::new(),
            diff_map: FuncMap::new(),
            input_map: FuncMap::new(),
            diffs: Diffs::default(),
            solver: None,
            handlers: Vec::new(),
            logger: None,
            status: Status::NotStarted,
            results: Vec::new(),
            events: Vec::new(),
            steps_taken: 0,
            span_step: 0,
            sub_steps: 1,
            rejected: 0,
            tolerance_exceeded: false,
            stop_requested: false,
        }
    }

    // ---- setup ----

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn set_timespan(&mut self, start: Real, end: Real, steps: usize) -> SimResult<()> {
        self.timespan = Some(Timespan::new(start, end, steps)?);
        Ok(())
    }

    /// Replaces the initial X variables.
    pub fn set_x0_from_map<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = (S, Real)>,
        S: Into<Symbol>,
    {
        self.state = State::from_x_map(values);
    }

    /// Replaces the derivative functions, keyed by the X symbol they drive.
    pub fn set_diff_from_map<I, S>(&mut self, funcs: I)
    where
        I: IntoIterator<Item = (S, Func)>,
        S: Into<Symbol>,
    {
        self.diff_map = funcs.into_iter().map(|(s, f)| (s.into(), f)).collect();
    }

    /// Replaces the input functions, keyed by the U symbol they compute.
    pub fn set_input_from_map<I, S>(&mut self, funcs: I)
    where
        I: IntoIterator<Item = (S, Func)>,
        S: Into<Symbol>,
    {
        self.input_map = funcs.into_iter().map(|(s, f)| (s.into(), f)).collect();
    }

    /// Overrides the solver named in the configuration.
    pub fn set_solver<I: Integrator + 'static>(&mut self, solver: I) {
        self.solver = Some(Box::new(solver));
    }

    /// Attaches a results logger. Logging options come from `config.log`.
    pub fn set_logger(&mut self, logger: ResultsLogger) {
        self.logger = Some(logger);
    }

    pub fn add_event_handlers<I>(&mut self, handlers: I) -> SimResult<()>
    where
        I: IntoIterator<Item = Box<dyn EventHandler>>,
    {
        let before = self.handlers.len();
        self.handlers
            .extend(handlers.into_iter().map(HandlerSlot::Active));
        if self.handlers.len() == before {
            return Err(SimError::InvalidArg {
                what: "at least one event handler is required",
            });
        }
        Ok(())
    }

    pub fn add_event_handler<H: EventHandler + 'static>(&mut self, handler: H) {
        self.handlers.push(HandlerSlot::Active(Box::new(handler)));
    }

    // ---- inspection ----

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn timespan(&self) -> Option<&Timespan> {
        self.timespan.as_ref()
    }

    /// Number of intervals in the current timespan.
    pub fn len(&self) -> usize {
        self.timespan.map_or(0, |ts| ts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nominal step length of the current timespan.
    pub fn dt(&self) -> Option<Real> {
        self.timespan.map(|ts| ts.dt())
    }

    pub fn current_time(&self) -> Real {
        self.state.time()
    }

    /// Newest state (the initial state before the run).
    pub fn current_state(&self) -> &State {
        &self.state
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn rejected_sub_steps(&self) -> usize {
        self.rejected
    }

    /// `true` if the latest domain step accepted a sub-step whose error
    /// estimate exceeded the tolerance.
    pub fn last_step_exceeded_tolerance(&self) -> bool {
        self.tolerance_exceeded
    }

    /// Events applied so far, in order.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn states(&self) -> SimResult<&[State]> {
        self.ensure_completed()?;
        Ok(&self.results)
    }

    pub fn for_each_state<F: FnMut(&State)>(&self, f: F) -> SimResult<()> {
        self.ensure_completed()?;
        self.results.iter().for_each(f);
        Ok(())
    }

    /// Time series of `symbol`: the domain, an X variable or a U variable.
    pub fn results(&self, symbol: &str) -> SimResult<Vec<Real>> {
        self.ensure_completed()?;
        if symbol == self.config.domain.as_str() {
            return Ok(self.results.iter().map(State::time).collect());
        }
        let first = self.results.first().ok_or(SimError::NotCompleted)?;
        if first.has_x(symbol) {
            return Ok(self
                .results
                .iter()
                .map(|s| s.try_x(symbol).unwrap_or(Real::NAN))
                .collect());
        }
        if first.has_u(symbol) {
            return Ok(self
                .results
                .iter()
                .map(|s| s.try_u(symbol).unwrap_or(Real::NAN))
                .collect());
        }
        Err(SimError::SymbolNotFound {
            symbol: symbol.to_string(),
        })
    }

    fn ensure_completed(&self) -> SimResult<()> {
        if self.status == Status::Completed {
            Ok(())
        } else {
            Err(SimError::NotCompleted)
        }
    }

    // ---- run ----

    /// Runs the simulation to completion.
    ///
    /// Fails unless the simulation is `NotStarted`; a `Faulted` run stays
    /// faulted. Any error leaves the simulation `Faulted` with the history
    /// accumulated so far.
    pub fn begin(&mut self) -> SimResult<()> {
        if self.status != Status::NotStarted || !self.results.is_empty() {
            return Err(SimError::AlreadyExecuted);
        }
        self.status = Status::Running;
        let outcome = self.run();
        match &outcome {
            Ok(()) => {
                self.status = Status::Completed;
                info!(
                    steps = self.steps_taken,
                    states = self.results.len(),
                    events = self.events.len(),
                    rejected = self.rejected,
                    t = self.state.time(),
                    "simulation completed"
                );
            }
            Err(e) => {
                self.status = Status::Faulted;
                error!(error = %e, t = self.state.time(), "simulation failed");
            }
        }

        let flushed = match self.logger.as_mut() {
            Some(logger) => logger.flush(),
            None => Ok(()),
        };
        match (outcome, flushed) {
            (Err(e), Err(io)) => {
                warn!(error = %io, "could not flush results log");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(io)) => Err(SimError::Io(io)),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn run(&mut self) -> SimResult<()> {
        let solver = match self.solver.take() {
            Some(solver) => solver,
            None => match self.config.algorithm.solver {
                Some(kind) => Box::new(kind) as Box<dyn Integrator>,
                None => {
                    return Err(SimError::NotReady {
                        what: "no solver selected",
                    });
                }
            },
        };
        let outcome = self.drive(solver.as_ref());
        self.solver = Some(solver);
        outcome
    }

    fn drive(&mut self, solver: &dyn Integrator) -> SimResult<()> {
        self.prepare(solver)?;
        while self.is_running() {
            self.step(solver)?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        !self.stop_requested
            && self
                .timespan
                .is_some_and(|ts| ts.is_running(self.state.time()))
    }

    fn prepare(&mut self, solver: &dyn Integrator) -> SimResult<()> {
        self.config.validate()?;
        let timespan = self.timespan.ok_or(SimError::NotReady {
            what: "timespan is not set",
        })?;
        if self.state.is_empty() {
            return Err(SimError::NotReady {
                what: "initial state has no X variables",
            });
        }

        if !self.config.symbols.no_ordering {
            self.state = self.state.sorted();
        }
        self.state.set_time(timespan.start());
        apply_inputs(&self.input_map, &mut self.state);
        self.check_consistency()?;
        self.diffs = Diffs::aligned(&self.diff_map, &self.state)?;

        self.sub_steps = self.config.algorithm.steps.max(1);
        self.span_step = 0;
        self.stop_requested = false;

        let algorithm = &self.config.algorithm;
        if solver.name() == "newton_raphson"
            && (algorithm.error.max.is_none() || algorithm.iteration_max.is_none())
        {
            info!(
                tolerance = algorithm.newton_tolerance(),
                iterations = algorithm.newton_iterations(),
                "newton_raphson defaults applied"
            );
        }
        info!(
            solver = solver.name(),
            start = timespan.start(),
            end = timespan.end(),
            steps = timespan.len(),
            dt = timespan.dt(),
            "simulation started"
        );

        if self.logger.is_none() && self.config.log.results {
            self.logger = Some(ResultsLogger::stdout());
        }
        if let Some(logger) = self.logger.as_mut() {
            logger.set_options(LogOptions::from(&self.config.log));
            logger.header(self.config.domain.as_str(), &self.state);
            logger.row(&self.state);
        }
        self.results.push(self.state.clone());
        Ok(())
    }

    /// Derivative symbols must match the X symbols exactly, and input
    /// symbols must all be present in U.
    fn check_consistency(&self) -> SimResult<()> {
        let wanted: Vec<Symbol> = self.diff_map.keys().cloned().collect();
        let probe = self.state.consistency_x(&wanted);
        let mut missing: Vec<Symbol> = wanted
            .iter()
            .zip(&probe)
            .filter(|(_, v)| v.is_nan())
            .map(|(s, _)| s.clone())
            .collect();
        missing.extend(
            self.state
                .x_symbols()
                .iter()
                .filter(|s| !self.diff_map.contains_key(*s))
                .cloned(),
        );
        inconsistency(Space::X, missing)?;

        // advisory: `apply_inputs` has already written every input symbol into U
        let wanted: Vec<Symbol> = self.input_map.keys().cloned().collect();
        let probe = self.state.consistency_u(&wanted);
        let missing = wanted
            .into_iter()
            .zip(probe)
            .filter(|(_, v)| v.is_nan())
            .map(|(s, _)| s)
            .collect();
        inconsistency(Space::U, missing)
    }

    fn step(&mut self, solver: &dyn Integrator) -> SimResult<()> {
        let timespan = self.timespan.ok_or(SimError::NotReady {
            what: "timespan is not set",
        })?;
        let t_next = timespan.time_at(self.span_step + 1);
        let dt = t_next - self.state.time();

        let output = solver.advance(&StepInput {
            state: &self.state,
            diffs: &self.diffs,
            dt,
            sub_steps: self.sub_steps,
            config: &self.config.algorithm,
        })?;
        self.sub_steps = output.next_steps.max(1);
        self.rejected += output.rejected;
        self.tolerance_exceeded = output.tolerance_exceeded;

        let mut produced: Vec<State> = output.states.into_iter().skip(1).collect();
        let Some(last) = produced.last_mut() else {
            return Err(SolverError::Numeric {
                what: format!("{} produced no states at t = {}", solver.name(), self.state.time()),
            }
            .into());
        };
        last.set_time(t_next);
        for state in &mut produced {
            apply_inputs(&self.input_map, state);
        }
        if let Some(logger) = self.logger.as_mut() {
            logger.rows(&produced);
        }
        if let Some(last) = produced.last() {
            self.state = last.clone();
        }
        self.results.extend(produced);

        self.span_step += 1;
        self.steps_taken += 1;
        trace!(
            step = self.steps_taken,
            t = self.state.time(),
            sub_steps = self.sub_steps,
            "domain step"
        );

        let delay = self.config.behaviour.delay_ms;
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        Ok(())
    }

    // ---- events ----

    fn handle_events(&mut self) -> SimResult<()> {
        if self.handlers.is_empty() {
            return Ok(());
        }
        let mut handlers = std::mem::take(&mut self.handlers);
        let outcome = self.dispatch(&mut handlers);
        handlers.retain(HandlerSlot::is_active);
        self.handlers = handlers;
        outcome
    }

    fn dispatch(&mut self, handlers: &mut [HandlerSlot]) -> SimResult<()> {
        for slot in handlers.iter_mut() {
            let HandlerSlot::Active(handler) = slot else {
                continue;
            };
            match handler.evaluate(&self.state) {
                Event::None => {}
                Event::Remove => {
                    debug!(label = handler.label(), "event handler removed");
                    *slot = HandlerSlot::Retired;
                }
                event => {
                    let label = handler.label().to_string();
                    let persistent = handler.persistent();
                    self.apply_event(&label, event)?;
                    if !persistent {
                        *slot = HandlerSlot::Retired;
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_event(&mut self, label: &str, event: Event) -> SimResult<()> {
        let kind = event.kind();
        match event {
            Event::None | Event::Remove => return Ok(()),
            Event::Marker => {}
            Event::EndSimulation => self.stop_requested = true,
            Event::StepLength(h) => self.change_step_length(label, h)?,
            Event::Behaviour(map) => self.change_behaviour(label, map)?,
        }
        info!(label, kind, t = self.state.time(), "event applied");
        self.events.push(EventRecord {
            label: label.to_string(),
            kind,
            state: self.state.clone(),
        });
        Ok(())
    }

    fn change_step_length(&mut self, label: &str, h: Real) -> SimResult<()> {
        if !(h.is_finite() && h > 0.0) {
            return Err(SimError::InvalidEvent {
                label: label.to_string(),
                what: format!("step length must be positive and finite, got {h}"),
            });
        }
        if !self.is_running() {
            return Ok(());
        }
        let Some(current) = self.timespan else {
            return Ok(());
        };
        self.timespan = Some(Timespan::resume(self.state.time(), current.end(), h)?);
        self.span_step = 0;
        Ok(())
    }

    /// Replaces derivative or input functions. All targets are checked
    /// before any is replaced.
    fn change_behaviour(&mut self, label: &str, map: FuncMap) -> SimResult<()> {
        if let Some(symbol) = map
            .keys()
            .find(|s| !self.diff_map.contains_key(*s) && !self.input_map.contains_key(*s))
        {
            return Err(SimError::EventTarget {
                label: label.to_string(),
                symbol: symbol.clone(),
            });
        }
        for (symbol, f) in map {
            if self.diff_map.contains_key(&symbol) {
                if let Some(slot) = self.state.x_index().get(&symbol) {
                    self.diffs.replace(slot, Arc::clone(&f));
                }
                self.diff_map.insert(symbol, f);
            } else {
                self.input_map.insert(symbol, f);
            }
        }
        Ok(())
    }
}

/// Evaluates the input functions on `state` in symbol order. Later inputs
/// see the values written by earlier ones.
fn apply_inputs(inputs: &FuncMap, state: &mut State) {
    for (symbol, f) in inputs {
        let value = f.evaluate(state);
        state.u_equal(symbol.clone(), value);
    }
}

fn inconsistency(space: Space, missing: Vec<Symbol>) -> SimResult<()> {
    let mut missing = missing.into_iter();
    match missing.next() {
        None => Ok(()),
        Some(first) => Err(SimError::Inconsistent {
            space,
            first,
            others: missing.count(),
        }),
    }
}
