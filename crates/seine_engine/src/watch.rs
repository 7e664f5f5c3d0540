//! Observer hooks for engine events.
//!
//! An engine notifies every registered [`Watcher`] synchronously. Events
//! borrow engine state, so watchers that keep anything must copy it out.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use seine_foundation::Fact;

use crate::activation::Activation;
use crate::agenda::Agenda;

/// CLIPS-style watch categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchCategory {
    /// Fact commits and retractions.
    Facts,
    /// Rule firings.
    Rules,
    /// Agenda contents after each step.
    Agenda,
    /// Activations entering or leaving the agenda.
    Activations,
    /// Engine lifecycle (reset, halt).
    Engine,
}

impl WatchCategory {
    /// Every category.
    pub const ALL: [Self; 5] = [
        Self::Facts,
        Self::Rules,
        Self::Agenda,
        Self::Activations,
        Self::Engine,
    ];

    /// Category name as used by `watch` commands.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Facts => "facts",
            Self::Rules => "rules",
            Self::Agenda => "agenda",
            Self::Activations => "activations",
            Self::Engine => "engine",
        }
    }
}

impl fmt::Display for WatchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Something that happened inside an engine.
#[derive(Clone, Copy, Debug)]
pub enum WatchEvent<'a> {
    /// A fact was committed.
    FactDeclared {
        /// The committed fact.
        fact: &'a Arc<Fact>,
        /// The activation whose action declared it.
        source: Option<&'a Activation>,
    },
    /// A fact was removed.
    FactRetracted {
        /// The removed fact.
        fact: &'a Arc<Fact>,
    },
    /// An activation entered the agenda.
    ActivationAdded(&'a Activation),
    /// An activation left the agenda without firing.
    ActivationRemoved(&'a Activation),
    /// Agenda contents after a step.
    Agenda {
        /// Step number within the current run (0 outside `run`).
        step: usize,
        /// The agenda.
        agenda: &'a Agenda,
    },
    /// An activation is about to fire.
    Fired {
        /// One-based firing count within the current run.
        count: usize,
        /// The activation.
        activation: &'a Activation,
    },
    /// The engine was reset.
    Reset,
    /// `halt` was requested.
    Halted,
}

impl WatchEvent<'_> {
    /// Returns the category of this event.
    #[must_use]
    pub fn category(&self) -> WatchCategory {
        match self {
            Self::FactDeclared { .. } | Self::FactRetracted { .. } => WatchCategory::Facts,
            Self::ActivationAdded(_) | Self::ActivationRemoved(_) => WatchCategory::Activations,
            Self::Agenda { .. } => WatchCategory::Agenda,
            Self::Fired { .. } => WatchCategory::Rules,
            Self::Reset | Self::Halted => WatchCategory::Engine,
        }
    }
}

impl fmt::Display for WatchEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FactDeclared { fact, .. } => write!(f, "==> {fact} {fact:?}"),
            Self::FactRetracted { fact } => write!(f, "<== {fact} {fact:?}"),
            Self::ActivationAdded(act) => write!(f, "==> Activation {act}"),
            Self::ActivationRemoved(act) => write!(f, "<== Activation {act}"),
            Self::Agenda { agenda, .. } => {
                for (idx, act) in agenda.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{idx}: {act}")?;
                }
                Ok(())
            }
            Self::Fired { count, activation } => write!(f, "FIRE {count} {activation}"),
            Self::Reset => write!(f, "RESET"),
            Self::Halted => write!(f, "HALT"),
        }
    }
}

/// Receives engine events.
pub trait Watcher {
    /// Called synchronously for every event.
    fn on_event(&mut self, event: &WatchEvent<'_>);
}

impl<W: Watcher + ?Sized> Watcher for Box<W> {
    fn on_event(&mut self, event: &WatchEvent<'_>) {
        (**self).on_event(event);
    }
}

/// Lets the caller keep a handle to a watcher owned by an engine.
impl<W: Watcher + ?Sized> Watcher for Rc<RefCell<W>> {
    fn on_event(&mut self, event: &WatchEvent<'_>) {
        self.borrow_mut().on_event(event);
    }
}

/// Collects the display form of every event in the chosen categories.
#[derive(Clone, Debug, Default)]
pub struct WatchLog {
    categories: Vec<WatchCategory>,
    lines: Vec<String>,
}

impl WatchLog {
    /// Creates a log for the given categories.
    pub fn new(categories: impl IntoIterator<Item = WatchCategory>) -> Self {
        Self {
            categories: categories.into_iter().collect(),
            lines: Vec::new(),
        }
    }

    /// Creates a log for every category.
    #[must_use]
    pub fn all() -> Self {
        Self::new(WatchCategory::ALL)
    }

    /// Logged lines in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Watcher for WatchLog {
    fn on_event(&mut self, event: &WatchEvent<'_>) {
        if self.categories.contains(&event.category()) {
            self.lines.push(event.to_string());
        }
    }
}
