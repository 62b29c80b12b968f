//! Push/pull director.
//!
//! Active actors (push sources, pull sinks and pull-in/push-out agents) run
//! on their own threads. Every other actor is fired from the director's
//! task queue when pushed data reaches it or when an active actor pulls
//! through it.
//!
//! Receivers and actor threads never touch the director's queues. They send
//! [`Signal`]s, which the director folds in at each scheduling point.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use dirigent_core::{Error, ResultExt};
use dirigent_kernel::{
    ActorId, Director, Model, Receiver, Result, StopControl, Token,
};
use itertools::Itertools;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use crate::active::{ActiveActorManager, ActorThread};
use crate::config::CiConfig;
use crate::gate::{GateSet, PullGate, RunControl};
use crate::receiver::{CiReceiver, ReceiverMode};
use crate::role::{PortProfile, Role};
use crate::signal::{DirectorLink, Signal};

/// Actor attribute overriding the default iteration period, in milliseconds.
pub const PERIOD_ATTRIBUTE: &str = "period";

/// Director running active actors on threads and the rest on demand.
pub struct CiDirector {
    config: CiConfig,
    link: DirectorLink,
    signals: UnboundedReceiver<Signal>,
    run: Arc<RunControl>,
    gates: Arc<GateSet>,
    profiles: Vec<PortProfile>,
    actors_to_fire: VecDeque<ActorId>,
    queued: HashSet<ActorId>,
    async_pushed: VecDeque<ActorId>,
    async_pulled: VecDeque<ActorId>,
    pulled: HashSet<ActorId>,
    live: HashSet<ActorId>,
    managers: Vec<ActiveActorManager>,
}

impl CiDirector {
    pub fn new(config: CiConfig) -> Result<Self> {
        config.validate()?;
        let (link, signals) = DirectorLink::channel();
        Ok(Self {
            config,
            link,
            signals,
            run: Arc::new(RunControl::new()),
            gates: Arc::new(GateSet::new()),
            profiles: Vec::new(),
            actors_to_fire: VecDeque::new(),
            queued: HashSet::new(),
            async_pushed: VecDeque::new(),
            async_pulled: VecDeque::new(),
            pulled: HashSet::new(),
            live: HashSet::new(),
            managers: Vec::new(),
        })
    }

    pub fn config(&self) -> &CiConfig {
        &self.config
    }

    /// Shared pause and stop flags of the actor threads.
    pub fn run_control(&self) -> Arc<RunControl> {
        Arc::clone(&self.run)
    }

    /// Role of an actor in the current run.
    pub fn role(&self, id: ActorId) -> Option<Role> {
        self.profile(id).map(PortProfile::role)
    }

    /// Actors whose threads are still running.
    pub fn live_managers(&self) -> usize {
        self.live.len()
    }

    /// Whether the actor has an outstanding pull request.
    pub fn is_pulled(&self, id: ActorId) -> bool {
        self.pulled.contains(&id)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.run.is_stop_requested()
    }

    fn profile(&self, id: ActorId) -> Option<PortProfile> {
        self.profiles.get(id.index()).copied()
    }

    fn is_pull_through(&self, id: ActorId) -> bool {
        self.profile(id).is_some_and(|p| p.is_pull_through())
    }

    fn is_active(&self, id: ActorId) -> bool {
        self.profile(id).is_some_and(|p| p.is_active())
    }

    /// Put an actor on the task queue unless it is already waiting there.
    fn schedule(&mut self, id: ActorId) {
        if self.queued.insert(id) {
            self.actors_to_fire.push_back(id);
        }
    }

    fn next_to_fire(&mut self) -> Option<ActorId> {
        let id = self.actors_to_fire.pop_front()?;
        self.queued.remove(&id);
        Some(id)
    }

    /// A pulled actor became ready.
    fn actor_enabled(&mut self, model: &Model, id: ActorId) {
        debug!(actor = %name(model, id), "Schedule pulled actor to fire");
        self.pulled.remove(&id);
        self.schedule(id);
    }

    /// Fold every pending signal into the queues.
    fn absorb(&mut self, model: &Model) -> Result<()> {
        while let Ok(signal) = self.signals.try_recv() {
            self.handle(model, signal)?;
        }
        Ok(())
    }

    fn handle(&mut self, model: &Model, signal: Signal) -> Result<()> {
        match signal {
            Signal::AsyncPushed(id) => {
                debug!(actor = %name(model, id), "Async pushed actor");
                self.async_pushed.push_back(id);
            }
            Signal::AsyncPullRequested(id) => self.request_async_pull(model, id),
            Signal::SyncPushed(id) => {
                debug!(actor = %name(model, id), "Sync pushed actor");
                self.schedule(id);
            }
            Signal::PullInput(id) => {
                if self.pulled.contains(&id) {
                    if model.prefire(id)? {
                        self.actor_enabled(model, id);
                    } else {
                        self.request_sync_pull(model, id)?;
                    }
                }
            }
            Signal::ManagerExited(id) => {
                debug!(actor = %name(model, id), "Actor thread exited");
                self.live.remove(&id);
            }
            Signal::Wake => trace!("Woken"),
        }
        Ok(())
    }

    /// Actors feeding the input ports of `id` that hold no token on channel 0.
    fn providers(&self, model: &Model, id: ActorId) -> Vec<ActorId> {
        model
            .ports(id)
            .into_iter()
            .flatten()
            .filter(|port| port.is_input())
            .filter(|port| model.width(id, port.name()) > 0)
            .filter(|port| !model.has_token(id, port.name(), 0))
            .flat_map(|port| model.sources(id, port.name()))
            .map(|source| source.actor)
            .unique()
            .collect()
    }

    fn request_async_pull(&mut self, model: &Model, id: ActorId) {
        debug!(actor = %name(model, id), "Async pull requested");
        for provider in self.providers(model, id) {
            if !self.async_pulled.contains(&provider) {
                debug!(actor = %name(model, provider), "Add async pulled actor");
                self.async_pulled.push_back(provider);
            }
        }
    }

    /// Mark `id` as pulled and pass the pull up through pull-through
    /// providers, scheduling any that are ready.
    fn request_sync_pull(&mut self, model: &Model, id: ActorId) -> Result<()> {
        let mut visited = HashSet::new();
        self.pull_through(model, id, &mut visited)
    }

    fn pull_through(&mut self, model: &Model, id: ActorId, visited: &mut HashSet<ActorId>) -> Result<()> {
        if !visited.insert(id) {
            return Ok(());
        }
        self.pulled.insert(id);
        if !self.is_pull_through(id) {
            return Ok(());
        }
        for provider in self.providers(model, id) {
            if !self.is_pull_through(provider) {
                continue;
            }
            if model.prefire(provider)? {
                self.schedule(provider);
            } else {
                self.pull_through(model, provider, visited)?;
            }
        }
        Ok(())
    }

    /// Block until some other thread hands over work.
    ///
    /// Returns at once when nothing could ever arrive: no actor thread is
    /// alive or a stop was requested.
    fn wait_for_request(&mut self, model: &Model) -> Result<()> {
        if !self.async_pushed.is_empty() || !self.async_pulled.is_empty() {
            return Ok(());
        }
        if self.live.is_empty() || self.run.is_stop_requested() {
            return Ok(());
        }
        debug!("Wait for async request");
        if let Some(signal) = self.signals.blocking_recv() {
            self.handle(model, signal)?;
        }
        debug!("Wake up from wait");
        self.absorb(model)
    }

    fn period_of(&self, model: &Model, id: ActorId) -> Duration {
        model
            .attribute(id, PERIOD_ATTRIBUTE)
            .map_or(Ok(self.config.interval()), parse_period)
            .or_default_logged(self.config.interval())
    }

    fn start_actor_threads(&mut self, model: &Model, gates: &[(ActorId, Arc<PullGate>)]) -> Result<()> {
        for (id, gate) in gates {
            let id = *id;
            let role = self.role(id).unwrap_or(Role::Inactive);
            let worker = ActorThread {
                id,
                name: model.actor_name(id)?.to_string(),
                cell: model.cell(id)?,
                wiring: model.wiring(id)?,
                role,
                period: self.period_of(model, id),
                run: Arc::clone(&self.run),
                gate: Arc::clone(gate),
                link: self.link.clone(),
                sink: model.error_sink().clone(),
            };
            debug!(actor = %worker.name, ?role, "Initialize -- create actor manager");
            self.live.insert(id);
            match ActiveActorManager::spawn(worker) {
                Ok(manager) => self.managers.push(manager),
                Err(e) => {
                    self.live.remove(&id);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn stop_actor_threads(&mut self) {
        self.run.request_stop();
        self.gates.interrupt_all();
        while !self.live.is_empty() {
            match self.signals.blocking_recv() {
                Some(Signal::ManagerExited(id)) => {
                    self.live.remove(&id);
                }
                Some(_) => {}
                None => break,
            }
        }
        let abnormal = self
            .managers
            .drain(..)
            .map(ActiveActorManager::join)
            .filter(|clean| !clean)
            .count();
        if abnormal > 0 {
            warn!(abnormal, "Actor threads ended abnormally");
        }
        self.gates.clear();
    }
}

fn name(model: &Model, id: ActorId) -> &str {
    model.actor_name(id).unwrap_or("<unknown>")
}

fn parse_period(token: &Token) -> Result<Duration> {
    token.as_u64().map(Duration::from_millis).ok_or_else(|| {
        Error::invalid_config(format!(
            "{PERIOD_ATTRIBUTE} must be a non-negative number of milliseconds, got {token}"
        ))
    })
}

impl Director for CiDirector {
    fn preinitialize(&mut self, model: &mut Model) -> Result<()> {
        while self.signals.try_recv().is_ok() {}
        self.run.reset();
        self.gates.clear();
        self.profiles.clear();
        self.actors_to_fire.clear();
        self.queued.clear();
        self.async_pushed.clear();
        self.async_pulled.clear();
        self.pulled.clear();
        self.live.clear();
        self.managers.clear();
        model.preinitialize_actors()
    }

    fn initialize(&mut self, model: &mut Model) -> Result<()> {
        self.profiles = model
            .actor_ids()
            .map(|id| PortProfile::of(model, id))
            .collect::<Result<Vec<_>>>()?;

        let gates: Vec<(ActorId, Arc<PullGate>)> = model
            .actor_ids()
            .filter(|id| self.is_active(*id))
            .map(|id| (id, self.gates.open()))
            .collect();

        let link = self.link.clone();
        let profiles = self.profiles.clone();
        model.install_receivers(|site| {
            let role_of = |id: ActorId| {
                profiles
                    .get(id.index())
                    .map_or(Role::Inactive, |p| p.role())
            };
            let mode = ReceiverMode::classify(site, role_of(site.reader), role_of(site.source));
            let gate = gates
                .iter()
                .find(|(id, _)| *id == site.reader)
                .map(|(_, gate)| Arc::clone(gate));
            trace!(site = %site.label(), ?mode, "New receiver");
            let receiver: Arc<dyn Receiver> = Arc::new(CiReceiver::new(site, mode, link.clone(), gate));
            Ok(receiver)
        })?;

        model.initialize_actors()?;
        self.start_actor_threads(model, &gates)?;
        info!(
            model = %model.name(),
            active = self.managers.len(),
            "Push/pull director initialized"
        );
        Ok(())
    }

    /// A nested director only runs when signals are waiting.
    fn prefire(&mut self, model: &Model) -> Result<bool> {
        self.run.mark_iterating();
        if self.config.top_level {
            return Ok(true);
        }
        self.absorb(model)?;
        Ok(!self.async_pushed.is_empty() || !self.async_pulled.is_empty())
    }

    fn fire(&mut self, model: &Model) -> Result<()> {
        self.absorb(model)?;

        if let Some(id) = self.async_pushed.pop_front() {
            self.schedule(id);
        } else if let Some(id) = self.async_pulled.pop_front() {
            debug!(actor = %name(model, id), "Process async pulled actor");
            if model.prefire(id)? {
                debug!(actor = %name(model, id), "Async pulled actor ready to fire");
                self.schedule(id);
            } else {
                debug!(actor = %name(model, id), "Request sync pull for async pulled actor");
                self.request_sync_pull(model, id)?;
            }
        }

        if self.actors_to_fire.is_empty() {
            if self.config.top_level {
                self.wait_for_request(model)?;
            }
            return Ok(());
        }

        while let Some(id) = self.next_to_fire() {
            if model.prefire(id)? {
                debug!(actor = %name(model, id), "Fire actor");
                model.fire(id)?;
                model.postfire(id)?;
            }
            self.absorb(model)?;
        }
        Ok(())
    }

    /// False once every actor thread has exited and no work is queued.
    fn postfire(&mut self, model: &Model) -> Result<bool> {
        self.absorb(model)?;
        Ok(!(self.live.is_empty()
            && self.async_pushed.is_empty()
            && self.async_pulled.is_empty()
            && self.actors_to_fire.is_empty()))
    }

    /// Stop and join the actor threads, then wrap up the actors.
    fn wrapup(&mut self, model: &Model) -> Result<()> {
        debug!("Wrap up");
        self.stop_actor_threads();
        model.wrapup_actors()
    }

    fn stop_control(&self) -> Arc<dyn StopControl> {
        Arc::new(CiStopControl {
            run: Arc::clone(&self.run),
            gates: Arc::clone(&self.gates),
            link: self.link.clone(),
        })
    }
}

impl std::fmt::Debug for CiDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CiDirector")
            .field("config", &self.config)
            .field("live", &self.live.len())
            .field("actors_to_fire", &self.actors_to_fire)
            .finish_non_exhaustive()
    }
}

/// Stop requests for a [`CiDirector`] from other threads.
struct CiStopControl {
    run: Arc<RunControl>,
    gates: Arc<GateSet>,
    link: DirectorLink,
}

impl StopControl for CiStopControl {
    fn stop(&self) {
        self.stop_fire();
    }

    fn stop_fire(&self) {
        debug!("Stop fire called");
        self.run.request_stop_if_iterating();
        self.link.wake();
    }

    fn terminate(&self) {
        debug!("Terminate called");
        self.run.request_stop_if_iterating();
        self.gates.interrupt_all();
        self.link.wake();
    }
}
