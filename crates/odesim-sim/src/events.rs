//! Event handlers evaluated after every domain step.
//!
//! A handler inspects the newest state and returns an [`Event`]. Handlers
//! that fire are retired unless they are persistent; a handler returning
//! [`Event::Remove`] retires itself without recording anything.

use std::fmt;

use odesim_core::{FuncMap, Real, State};

/// Action requested by a handler.
#[derive(Clone, Default)]
pub enum Event {
    /// Nothing happens; the handler stays active.
    #[default]
    None,
    /// Retire the handler silently.
    Remove,
    /// Stop after the current step.
    EndSimulation,
    /// Record the label and state without changing the run.
    Marker,
    /// Replace derivative and/or input functions by symbol.
    Behaviour(FuncMap),
    /// Change the nominal domain step length from the current time on.
    StepLength(Real),
}

impl Event {
    pub fn is_none(&self) -> bool {
        matches!(self, Event::None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::None => "none",
            Event::Remove => "remove",
            Event::EndSimulation => "end_simulation",
            Event::Marker => "marker",
            Event::Behaviour(_) => "behaviour",
            Event::StepLength(_) => "step_length",
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Behaviour(map) => f
                .debug_tuple("Behaviour")
                .field(&map.keys().collect::<Vec<_>>())
                .finish(),
            Event::StepLength(h) => f.debug_tuple("StepLength").field(h).finish(),
            other => f.write_str(match other {
                Event::None => "None",
                Event::Remove => "Remove",
                Event::EndSimulation => "EndSimulation",
                _ => "Marker",
            }),
        }
    }
}

pub trait EventHandler: Send {
    /// Decides what happens given the newest state.
    fn evaluate(&mut self, state: &State) -> Event;

    fn label(&self) -> &str;

    /// Persistent handlers stay active after firing.
    fn persistent(&self) -> bool {
        false
    }
}

/// Handler built from a closure.
pub struct FnHandler<F> {
    label: String,
    f: F,
    persistent: bool,
}

impl<F> FnHandler<F>
where
    F: FnMut(&State) -> Event + Send,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
            persistent: false,
        }
    }

    /// Keeps the handler active after it fires.
    pub fn repeating(mut self) -> Self {
        self.persistent = true;
        self
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: FnMut(&State) -> Event + Send,
{
    fn evaluate(&mut self, state: &State) -> Event {
        (self.f)(state)
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn persistent(&self) -> bool {
        self.persistent
    }
}

/// An applied event: the handler label and the state it fired on.
#[derive(Clone, Debug)]
pub struct EventRecord {
    pub label: String,
    pub kind: &'static str,
    pub state: State,
}

pub(crate) enum HandlerSlot {
    Active(Box<dyn EventHandler>),
    Retired,
}

impl HandlerSlot {
    pub(crate) fn is_active(&self) -> bool {
        matches!(self, HandlerSlot::Active(_))
    }
}
