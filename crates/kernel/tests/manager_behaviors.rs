//! BDD-style behaviour tests for the execution manager.
//!
//! A minimal in-order director drives counting actors so the manager's
//! phase handling, limits and shutdown paths can be observed directly.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dirigent_kernel::{
    Actor, Director, Error, Mailbox, Manager, ManagerConfig, ManagerHandle, Model, Phase, PortIo, PortSpec,
    Result, StopControl, StopFlags, Token,
};

/// Fires every actor once per iteration, in declaration order.
struct InOrder {
    flags: Arc<StopFlags>,
}

impl InOrder {
    fn new() -> Self {
        Self {
            flags: Arc::new(StopFlags::new()),
        }
    }
}

impl Director for InOrder {
    fn preinitialize(&mut self, model: &mut Model) -> Result<()> {
        self.flags.reset();
        model.preinitialize_actors()
    }

    fn initialize(&mut self, model: &mut Model) -> Result<()> {
        model.install_receivers(|_| Ok(Arc::new(Mailbox::new())))?;
        model.initialize_actors()
    }

    fn prefire(&mut self, _model: &Model) -> Result<bool> {
        Ok(true)
    }

    fn fire(&mut self, model: &Model) -> Result<()> {
        for id in model.actor_ids().collect::<Vec<_>>() {
            if model.prefire(id)? {
                model.fire(id)?;
            }
        }
        Ok(())
    }

    fn postfire(&mut self, model: &Model) -> Result<bool> {
        let mut keep = !self.flags.is_stop_requested();
        for id in model.actor_ids().collect::<Vec<_>>() {
            keep &= model.postfire(id)?;
        }
        Ok(keep)
    }

    fn wrapup(&mut self, model: &Model) -> Result<()> {
        model.wrapup_actors()
    }

    fn stop_control(&self) -> Arc<dyn StopControl> {
        self.flags.clone()
    }
}

#[derive(Default)]
struct Tally {
    fired: AtomicUsize,
    wrapped: AtomicBool,
    stopped: AtomicBool,
}

/// Emits an increasing count and asks to stop after `limit` firings.
struct Counter {
    tally: Arc<Tally>,
    limit: usize,
    fail_at: Option<usize>,
}

impl Actor for Counter {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("out")]
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        let n = self.tally.fired.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(n) {
            return Err(Error::illegal_action(io.actor_name(), "counter overflow"));
        }
        io.send("out", Token::from(n))
    }

    fn postfire(&mut self, _io: &PortIo<'_>) -> Result<bool> {
        Ok(self.tally.fired.load(Ordering::SeqCst) < self.limit)
    }

    fn wrapup(&mut self) -> Result<()> {
        self.tally.wrapped.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.tally.stopped.store(true, Ordering::SeqCst);
    }
}

/// Collects whatever arrives.
struct Collector {
    seen: Arc<parking_lot::Mutex<Vec<Token>>>,
}

impl Actor for Collector {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in")]
    }

    fn prefire(&mut self, io: &PortIo<'_>) -> Result<bool> {
        Ok(io.has_token("in"))
    }

    fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
        self.seen.lock().push(io.get("in")?);
        Ok(())
    }
}

fn counter_model(limit: usize, fail_at: Option<usize>) -> (Model, Arc<Tally>, Arc<parking_lot::Mutex<Vec<Token>>>) {
    let tally = Arc::new(Tally::default());
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let mut model = Model::new("counting");
    let counter = model
        .add_actor("counter", Counter { tally: tally.clone(), limit, fail_at })
        .unwrap();
    let collector = model
        .add_actor("collector", Collector { seen: seen.clone() })
        .unwrap();
    model.connect(counter, "out", collector, "in").unwrap();
    (model, tally, seen)
}

#[test]
fn given_actor_that_finishes_when_executed_then_runs_until_postfire_false() {
    let (model, tally, seen) = counter_model(3, None);
    let mut manager = Manager::new(model, InOrder::new(), ManagerConfig::default()).unwrap();

    let iterations = manager.execute().unwrap();

    assert_eq!(iterations, 3);
    assert_eq!(tally.fired.load(Ordering::SeqCst), 3);
    assert_eq!(*seen.lock(), vec![Token::from(1), Token::from(2), Token::from(3)]);
    assert!(tally.wrapped.load(Ordering::SeqCst));
    assert_eq!(manager.phase(), Phase::Finished);
}

#[test]
fn given_iteration_limit_when_executed_then_stops_at_limit() {
    let (model, tally, _) = counter_model(100, None);
    let config = ManagerConfig::with_max_iterations(4);
    let mut manager = Manager::new(model, InOrder::new(), config).unwrap();

    assert_eq!(manager.execute().unwrap(), 4);
    assert_eq!(tally.fired.load(Ordering::SeqCst), 4);
}

#[test]
fn given_failing_fire_when_executed_then_wrapup_still_runs() {
    let (model, tally, _) = counter_model(10, Some(2));
    let mut manager = Manager::new(model, InOrder::new(), ManagerConfig::default()).unwrap();

    let result = manager.execute();

    assert!(matches!(result, Err(Error::IllegalAction { .. })));
    assert!(tally.wrapped.load(Ordering::SeqCst));
    assert_eq!(manager.phase(), Phase::Finished);
}

/// Asks the manager to finish from inside its own firing.
struct Finisher {
    handle: Arc<parking_lot::Mutex<Option<ManagerHandle>>>,
    at: usize,
    fired: usize,
}

impl Actor for Finisher {
    fn ports(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    fn fire(&mut self, _io: &PortIo<'_>) -> Result<()> {
        self.fired += 1;
        if self.fired == self.at {
            if let Some(handle) = self.handle.lock().as_ref() {
                handle.finish();
            }
        }
        Ok(())
    }
}

#[test]
fn given_finish_requested_during_run_when_iterating_then_stops_after_current_iteration() {
    let (mut model, tally, _) = counter_model(100, None);
    let slot = Arc::new(parking_lot::Mutex::new(None));
    model
        .add_actor("finisher", Finisher { handle: slot.clone(), at: 2, fired: 0 })
        .unwrap();
    let config = ManagerConfig::with_max_iterations(50);
    let mut manager = Manager::new(model, InOrder::new(), config).unwrap();
    *slot.lock() = Some(manager.handle());

    let iterations = manager.execute().unwrap();

    assert_eq!(iterations, 2);
    assert!(tally.stopped.load(Ordering::SeqCst));
}

#[test]
fn given_new_manager_when_inspected_then_phase_is_idle() {
    let (model, _, _) = counter_model(1, None);
    let manager = Manager::new(model, InOrder::new(), ManagerConfig::default()).unwrap();
    assert_eq!(manager.phase(), Phase::Idle);
    assert!(manager.errors().is_empty());
}
