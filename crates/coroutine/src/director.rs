//! Continuation control-flow director.
//!
//! One firing walks the control-flow graph from the current location:
//! enter a continuation, follow the exit it answers with, and repeat until a
//! continuation suspends or terminates, an exit has no route, or control
//! comes back to where it started. Ordinary actors are fired once after
//! the walk. Postfire adopts the location the walk ended at and resets every
//! receiver to unknown.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::sync::Arc;

use dirigent_core::Error;
use dirigent_kernel::{
    ActorId, ControlEntryToken, ControlExitToken, Director, EntryLocation, ExitLocation, Model, Receiver,
    Result, StopControl, StopFlags,
};
use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::config::{CoroutineConfig, OffTheMap};
use crate::graph::{ContinuationId, ContinuationNode, ControlGraph, InternalEntryLocation, InternalExitLocation};
use crate::mapping::{self, EntryMap, ExitMap};
use crate::receiver::FixedPointReceiver;

/// How a walk through the control-flow graph ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// A continuation suspended; it is resumed next time.
    Suspended,
    /// A continuation terminated; the initial continuation starts over.
    Terminated,
    /// Left through an exit routed to a model exit location.
    Exited(ExitLocation),
    /// Left through an exit with no route.
    OffTheMap(InternalExitLocation),
    /// Control returned to the location the walk started at.
    Cycle,
    /// A stop-fire request ended the walk at a transfer boundary.
    Stopped,
}

#[derive(Debug)]
struct Walk {
    path: Vec<ContinuationId>,
    outcome: WalkOutcome,
    next: Option<InternalEntryLocation>,
}

/// Director that drives continuations through control tokens.
pub struct CoroutineDirector {
    config: CoroutineConfig,
    flags: Arc<StopFlags>,
    graph: ControlGraph,
    entry_map: EntryMap,
    exit_map: ExitMap,
    init: Option<ContinuationId>,
    current: Option<InternalEntryLocation>,
    next: Option<InternalEntryLocation>,
    path: Vec<ContinuationId>,
    outcome: Option<WalkOutcome>,
    ordinary: Vec<ActorId>,
}

impl CoroutineDirector {
    pub fn new(config: CoroutineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            flags: Arc::new(StopFlags::new()),
            graph: ControlGraph::new(),
            entry_map: EntryMap::new(),
            exit_map: ExitMap::new(),
            init: None,
            current: None,
            next: None,
            path: Vec::new(),
            outcome: None,
            ordinary: Vec::new(),
        })
    }

    pub fn config(&self) -> &CoroutineConfig {
        &self.config
    }

    pub fn graph(&self) -> &ControlGraph {
        &self.graph
    }

    pub fn init_continuation(&self) -> Option<ContinuationId> {
        self.init
    }

    /// Where the next firing starts.
    pub fn current_location(&self) -> Option<&InternalEntryLocation> {
        self.current.as_ref()
    }

    /// Where the last firing ended, until postfire adopts it.
    pub fn next_location(&self) -> Option<&InternalEntryLocation> {
        self.next.as_ref()
    }

    /// Continuations entered by the last firing, in order.
    pub fn control_path(&self) -> &[ContinuationId] {
        &self.path
    }

    pub fn control_path_names(&self) -> Vec<&str> {
        self.path.iter().map(|id| self.graph.name(*id)).collect()
    }

    pub fn last_outcome(&self) -> Option<&WalkOutcome> {
        self.outcome.as_ref()
    }

    pub fn entry_map(&self) -> &EntryMap {
        &self.entry_map
    }

    pub fn exit_map(&self) -> &ExitMap {
        &self.exit_map
    }

    pub fn entry_locations(&self) -> &[EntryLocation] {
        &self.config.entry_locations
    }

    pub fn exit_locations(&self) -> &[ExitLocation] {
        &self.config.exit_locations
    }

    /// Run the inner graph as one continuation step.
    ///
    /// `Init` starts the initial continuation over, `Resume` continues from
    /// the current location and `Enter` starts at the entry-mapped location.
    /// Exits routed through the exit map come back as model exits.
    pub fn control_enter(&mut self, model: &Model, entry: &ControlEntryToken) -> Result<ControlExitToken> {
        let init = self.init.ok_or(Error::NoInitialContinuation)?;
        let start = match entry {
            ControlEntryToken::Init => InternalEntryLocation::new(init, ControlEntryToken::Init),
            ControlEntryToken::Resume => self
                .current
                .clone()
                .unwrap_or_else(|| InternalEntryLocation::new(init, ControlEntryToken::Resume)),
            ControlEntryToken::Enter(location) => self
                .entry_map
                .get(location)
                .cloned()
                .ok_or_else(|| Error::unknown_entry_location(location.name()))?,
        };

        let walk = self.walk(model, &start)?;
        let token = match &walk.outcome {
            WalkOutcome::Suspended | WalkOutcome::Cycle | WalkOutcome::Stopped => ControlExitToken::Suspend,
            WalkOutcome::Terminated | WalkOutcome::OffTheMap(_) => ControlExitToken::Terminate,
            WalkOutcome::Exited(location) => ControlExitToken::exit(location.clone()),
        };
        if let Some(next) = walk.next {
            self.current = Some(next);
        }
        self.path = walk.path;
        self.outcome = Some(walk.outcome);
        debug!(%entry, exit = %token, "Director entered as continuation");
        Ok(token)
    }

    pub fn control_init(&mut self, model: &Model) -> Result<ControlExitToken> {
        self.control_enter(model, &ControlEntryToken::Init)
    }

    pub fn control_resume(&mut self, model: &Model) -> Result<ControlExitToken> {
        self.control_enter(model, &ControlEntryToken::Resume)
    }

    pub fn control_enter_at(&mut self, model: &Model, location: &EntryLocation) -> Result<ControlExitToken> {
        self.control_enter(model, &ControlEntryToken::enter(location.clone()))
    }

    /// Enter one continuation.
    fn enter(&self, model: &Model, here: &InternalEntryLocation) -> Result<ControlExitToken> {
        let node = self
            .graph
            .node(here.continuation())
            .ok_or_else(|| Error::not_a_continuation(format!("#{}", here.continuation().index())))?;
        let name = node.name.as_str();
        debug!(continuation = %name, entry = %here.entry(), "Entering");
        model.with_actor(node.actor, |actor, io| match actor.continuation_mut() {
            Some(continuation) => continuation.control_enter(here.entry(), io),
            None => Err(Error::not_a_continuation(name)),
        })?
    }

    fn walk(&self, model: &Model, start: &InternalEntryLocation) -> Result<Walk> {
        let limit = self.config.max_transfers;
        let mut here = start.clone();
        let mut path = Vec::new();
        let mut entered: usize = 0;

        loop {
            if entered >= limit {
                warn!(limit, "Control transfer limit reached");
                return Err(Error::TransferLimitExceeded { limit });
            }
            entered = entered.saturating_add(1);

            let exit = self.enter(model, &here)?;
            path.push(here.continuation());

            let location = match exit {
                ControlExitToken::Suspend => {
                    debug!(continuation = %self.graph.name(here.continuation()), "Suspending");
                    let next = InternalEntryLocation::new(here.continuation(), ControlEntryToken::Resume);
                    return Ok(Walk {
                        path,
                        outcome: WalkOutcome::Suspended,
                        next: Some(next),
                    });
                }
                ControlExitToken::Terminate => {
                    debug!(continuation = %self.graph.name(here.continuation()), "Terminating");
                    let init = self.init.ok_or(Error::NoInitialContinuation)?;
                    return Ok(Walk {
                        path,
                        outcome: WalkOutcome::Terminated,
                        next: Some(InternalEntryLocation::new(init, ControlEntryToken::Init)),
                    });
                }
                ControlExitToken::Exit(location) => location,
            };

            let exit = InternalExitLocation::new(here.continuation(), location);
            debug!(exit = %self.graph.describe_exit(&exit), "Exiting with location");

            let Some(to) = self.graph.next(&exit) else {
                return self.leave(exit, path);
            };
            if to == *start {
                debug!(location = %self.graph.describe_entry(&to), "Control cycle");
                return Ok(Walk {
                    path,
                    outcome: WalkOutcome::Cycle,
                    next: None,
                });
            }
            debug!(to = %self.graph.describe_entry(&to), "Moving to continuation");
            if self.flags.is_stop_fire_requested() {
                self.flags.clear_stop_fire();
                debug!(at = %self.graph.describe_entry(&to), "Stop fire requested, parking");
                return Ok(Walk {
                    path,
                    outcome: WalkOutcome::Stopped,
                    next: Some(to),
                });
            }
            here = to;
        }
    }

    /// An exit with no route to another continuation.
    fn leave(&self, exit: InternalExitLocation, path: Vec<ContinuationId>) -> Result<Walk> {
        if let Some(model_exit) = self.exit_map.get(&exit) {
            debug!(exit = %model_exit, "Leaving through model exit");
            return Ok(Walk {
                path,
                outcome: WalkOutcome::Exited(model_exit.clone()),
                next: None,
            });
        }
        match self.config.off_the_map {
            OffTheMap::EndIteration => {
                debug!(exit = %self.graph.describe_exit(&exit), "Off the map");
                Ok(Walk {
                    path,
                    outcome: WalkOutcome::OffTheMap(exit),
                    next: None,
                })
            }
            OffTheMap::Fault => Err(Error::off_the_map(
                self.graph.name(exit.continuation()),
                exit.location().name(),
            )),
        }
    }

    fn collect_continuations(&mut self, model: &Model) -> Result<()> {
        self.graph = ControlGraph::new();
        self.ordinary.clear();
        for id in model.actor_ids().collect::<Vec<_>>() {
            let declared = model.with_actor(id, |actor, _| {
                actor
                    .continuation()
                    .map(|c| (c.entry_locations(), c.exit_locations()))
            })?;
            match declared {
                Some((entries, exits)) => {
                    self.graph.add(ContinuationNode {
                        actor: id,
                        name: model.actor_name(id)?.to_string(),
                        entries,
                        exits,
                    })?;
                }
                None => self.ordinary.push(id),
            }
        }
        Ok(())
    }

    /// The named initial continuation, or the first one.
    fn initial_continuation(&self) -> Result<ContinuationId> {
        let named = self.config.init_continuation_name.as_deref().and_then(|name| {
            let found = self.graph.find(name);
            if found.is_none() {
                warn!(continuation = %name, "Initial continuation not found, using the first");
            }
            found
        });
        named
            .or_else(|| self.graph.first())
            .ok_or(Error::NoInitialContinuation)
    }

    fn show_map(&self) {
        debug!("Next map:");
        for (exit, entry) in self.graph.transfers() {
            debug!(
                "    {} => {}",
                self.graph.describe_exit(&exit),
                self.graph.describe_entry(&entry)
            );
        }
    }
}

impl Director for CoroutineDirector {
    fn preinitialize(&mut self, model: &mut Model) -> Result<()> {
        self.flags.reset();
        model.preinitialize_actors()
    }

    fn initialize(&mut self, model: &mut Model) -> Result<()> {
        self.collect_continuations(model)?;

        let init = self.initial_continuation()?;
        self.init = Some(init);
        self.current = Some(InternalEntryLocation::new(init, ControlEntryToken::Resume));
        self.next = None;
        self.path.clear();
        self.outcome = None;

        self.entry_map =
            mapping::entry_map_from_table(&self.graph, &self.config.entry_mapping, &self.config.entry_locations);
        let routes = if self.config.uses_next_table() {
            mapping::next_map_from_table(&mut self.graph, &self.config.next_mapping)
        } else {
            mapping::next_map_from_connections(&mut self.graph, model)?
        };
        self.exit_map =
            mapping::exit_map_from_table(&self.graph, &self.config.exit_mapping, &self.config.exit_locations);
        self.show_map();

        model.install_receivers(|site| {
            let receiver: Arc<dyn Receiver> = Arc::new(FixedPointReceiver::new(site));
            Ok(receiver)
        })?;
        model.initialize_actors()?;
        model.reset_receivers();

        info!(
            model = %model.name(),
            continuations = self.graph.len(),
            routes,
            init = %self.graph.name(init),
            "Continuation director initialized"
        );
        Ok(())
    }

    fn prefire(&mut self, _model: &Model) -> Result<bool> {
        Ok(true)
    }

    fn fire(&mut self, model: &Model) -> Result<()> {
        let start = self.current.clone().ok_or(Error::NoInitialContinuation)?;
        self.next = None;
        self.path.clear();

        let walk = self.walk(model, &start)?;
        self.path = walk.path;
        self.next = walk.next;
        self.outcome = Some(walk.outcome);

        for id in &self.ordinary {
            let name = model.actor_name(*id)?;
            debug!(actor = %name, "Firing");
            model.fire(*id)?;
        }
        Ok(())
    }

    /// False when the last firing found no next location.
    fn postfire(&mut self, model: &Model) -> Result<bool> {
        self.flags.clear_stop_fire();
        let Some(next) = self.next.take() else {
            debug!("No next location");
            return Ok(false);
        };
        self.current = Some(next);

        let mut keep = true;
        for id in self.path.iter().unique() {
            let Some(node) = self.graph.node(*id) else {
                continue;
            };
            debug!(continuation = %node.name, "Postfiring");
            keep &= model.postfire(node.actor)?;
        }
        for id in &self.ordinary {
            keep &= model.postfire(*id)?;
        }

        debug!("Resetting all receivers");
        model.reset_receivers();
        Ok(keep && !self.flags.is_stop_requested())
    }

    fn wrapup(&mut self, model: &Model) -> Result<()> {
        debug!("Wrap up");
        model.wrapup_actors()
    }

    fn stop_control(&self) -> Arc<dyn StopControl> {
        Arc::clone(&self.flags) as Arc<dyn StopControl>
    }
}

impl std::fmt::Debug for CoroutineDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoroutineDirector")
            .field("config", &self.config)
            .field("continuations", &self.graph.len())
            .field("current", &self.current)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
