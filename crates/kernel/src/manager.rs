//! Execution manager.
//!
//! Drives a [`Director`] through one complete run of a [`Model`]:
//! preinitialize, initialize, iterations until the director or a caller
//! asks to finish, and a wrapup that always runs.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dirigent_core::{Error, GenericResultExt, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::actor::ActorCell;
use crate::director::{Director, StopControl};
use crate::model::Model;
use crate::sink::ReportedError;

/// How long a stop request waits for a busy actor before skipping it.
const ACTOR_LOCK_TIMEOUT: Duration = Duration::from_millis(50);

/// Execution limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Upper bound on iterations; `None` runs until the director quiesces.
    #[serde(default)]
    pub max_iterations: Option<u64>,
}

impl ManagerConfig {
    pub fn with_max_iterations(max_iterations: u64) -> Self {
        Self {
            max_iterations: Some(max_iterations),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = dirigent_core::config::parse_toml(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = dirigent_core::config::load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == Some(0) {
            return Err(Error::invalid_config("max_iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Not started
    Idle,
    Preinitializing,
    Initializing,
    Iterating,
    WrappingUp,
    /// Wrapup has completed
    Finished,
}

#[derive(Debug)]
struct Shared {
    phase: Mutex<Phase>,
    finish_requested: AtomicBool,
    iterations: AtomicU64,
}

/// Runs one model under one director.
pub struct Manager {
    model: Model,
    director: Box<dyn Director>,
    config: ManagerConfig,
    shared: Arc<Shared>,
}

impl Manager {
    pub fn new(model: Model, director: impl Director + 'static, config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            director: Box::new(director),
            config,
            shared: Arc::new(Shared {
                phase: Mutex::new(Phase::Idle),
                finish_requested: AtomicBool::new(false),
                iterations: AtomicU64::new(0),
            }),
        })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn phase(&self) -> Phase {
        *self.shared.phase.lock()
    }

    /// Iterations started by the last run.
    pub fn iterations(&self) -> u64 {
        self.shared.iterations.load(Ordering::Acquire)
    }

    /// Errors reported to the model during the last run.
    pub fn errors(&self) -> Vec<ReportedError> {
        self.model.error_sink().errors()
    }

    /// Handle for stopping the run from another thread.
    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle {
            shared: Arc::clone(&self.shared),
            control: self.director.stop_control(),
            actors: self.model.cells(),
        }
    }

    /// Run the model to completion and return the number of iterations.
    ///
    /// Wrapup runs even when an earlier phase failed; the earlier error is
    /// returned and a wrapup error is then reported to the error sink.
    pub fn execute(&mut self) -> Result<u64> {
        info!(model = %self.model.name(), "Execution started");
        self.shared.finish_requested.store(false, Ordering::Release);
        self.shared.iterations.store(0, Ordering::Release);

        let outcome = self.run();

        self.set_phase(Phase::WrappingUp);
        let wrapup = self.director.wrapup(&self.model);
        self.set_phase(Phase::Finished);

        match (outcome, wrapup) {
            (Ok(iterations), Ok(())) => {
                info!(model = %self.model.name(), iterations, "Execution finished");
                Ok(iterations)
            }
            (Ok(_), Err(e)) => Err(e).tap_err(|e| error!(error = %e, "Wrapup failed")),
            (Err(e), Ok(())) => Err(e).tap_err(|e| error!(error = %e, "Execution failed")),
            (Err(e), Err(wrapup_error)) => {
                self.model.error_sink().report(self.model.name(), wrapup_error);
                Err(e).tap_err(|e| error!(error = %e, "Execution failed"))
            }
        }
    }

    fn run(&mut self) -> Result<u64> {
        self.set_phase(Phase::Preinitializing);
        self.director.preinitialize(&mut self.model)?;

        self.set_phase(Phase::Initializing);
        self.director.initialize(&mut self.model)?;

        self.set_phase(Phase::Iterating);
        let mut iterations: u64 = 0;
        loop {
            if self.shared.finish_requested.load(Ordering::Acquire) {
                debug!("Finish requested");
                break;
            }
            if self.config.max_iterations.is_some_and(|max| iterations >= max) {
                debug!(iterations, "Iteration limit reached");
                break;
            }
            iterations = iterations.saturating_add(1);
            self.shared.iterations.store(iterations, Ordering::Release);

            if !self.director.prefire(&self.model)? {
                std::thread::yield_now();
                continue;
            }
            self.director.fire(&self.model)?;
            if !self.director.postfire(&self.model)? {
                debug!(iterations, "Director requested no further iterations");
                break;
            }
        }
        Ok(iterations)
    }

    fn set_phase(&self, phase: Phase) {
        *self.shared.phase.lock() = phase;
    }
}

/// Cross-thread handle onto a running [`Manager`].
#[derive(Clone)]
pub struct ManagerHandle {
    shared: Arc<Shared>,
    control: Arc<dyn StopControl>,
    actors: Vec<(String, ActorCell)>,
}

impl ManagerHandle {
    pub fn phase(&self) -> Phase {
        *self.shared.phase.lock()
    }

    /// Stop after the current iteration.
    pub fn finish(&self) {
        info!("Finish requested");
        self.shared.finish_requested.store(true, Ordering::Release);
        self.control.stop();
        self.for_each_actor(|actor| actor.stop());
    }

    /// End the current firing as soon as the director can.
    pub fn stop_fire(&self) {
        self.control.stop_fire();
        self.for_each_actor(|actor| actor.stop_fire());
    }

    /// Abandon the run. The model should be rebuilt afterwards.
    pub fn terminate(&self) {
        info!("Terminate requested");
        self.shared.finish_requested.store(true, Ordering::Release);
        self.control.terminate();
        self.for_each_actor(|actor| actor.terminate());
    }

    fn for_each_actor(&self, mut f: impl FnMut(&mut dyn crate::Actor)) {
        for (name, cell) in &self.actors {
            match cell.try_lock_for(ACTOR_LOCK_TIMEOUT) {
                Some(mut actor) => f(&mut **actor),
                None => debug!(actor = %name, "Actor busy, request not delivered"),
            }
        }
    }
}

impl std::fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("phase", &self.phase())
            .field("actors", &self.actors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn should_reject_zero_iteration_limit() {
        assert!(ManagerConfig::with_max_iterations(0).validate().is_err());
        assert!(ManagerConfig::default().validate().is_ok());
    }

    #[test]
    fn should_parse_config_from_toml() {
        let config = ManagerConfig::from_toml("max_iterations = 12\n");
        assert_eq!(config, Ok(ManagerConfig::with_max_iterations(12)));
        assert_eq!(ManagerConfig::from_toml(""), Ok(ManagerConfig::default()));
    }

    #[test]
    fn should_load_config_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "max_iterations = 3")?;
        let config = ManagerConfig::load(file.path())?;
        assert_eq!(config.max_iterations, Some(3));
        Ok(())
    }
}
