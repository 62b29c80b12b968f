//! # Control-flow graph
//!
//! Continuations live in an arena (a petgraph `DiGraph`) and are addressed by
//! [`ContinuationId`]. Each edge is one control transfer: leaving the source
//! continuation through an exit location enters the target continuation
//! with an entry token.

use std::collections::HashMap;
use std::fmt;

use dirigent_core::Error;
use dirigent_kernel::{ActorId, ControlEntryToken, EntryLocation, ExitLocation, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

/// Handle on a continuation in a [`ControlGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContinuationId(NodeIndex);

impl ContinuationId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// A continuation actor as seen by the control-flow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationNode {
    pub actor: ActorId,
    pub name: String,
    pub entries: Vec<EntryLocation>,
    pub exits: Vec<ExitLocation>,
}

impl ContinuationNode {
    pub fn has_entry(&self, location: &EntryLocation) -> bool {
        self.entries.contains(location)
    }

    pub fn has_exit(&self, location: &ExitLocation) -> bool {
        self.exits.contains(location)
    }

    /// `init` and `resume` are always accepted; named entries must be declared.
    pub fn accepts(&self, entry: &ControlEntryToken) -> bool {
        entry.location().is_none_or(|location| self.has_entry(location))
    }
}

/// A point of execution: a continuation together with how it is entered.
///
/// Two internal locations are equal only when both the continuation and the
/// entry token are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalEntryLocation {
    continuation: ContinuationId,
    entry: ControlEntryToken,
}

impl InternalEntryLocation {
    pub fn new(continuation: ContinuationId, entry: ControlEntryToken) -> Self {
        Self { continuation, entry }
    }

    pub fn continuation(&self) -> ContinuationId {
        self.continuation
    }

    pub fn entry(&self) -> &ControlEntryToken {
        &self.entry
    }
}

/// A continuation together with one of its exit locations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalExitLocation {
    continuation: ContinuationId,
    location: ExitLocation,
}

impl InternalExitLocation {
    pub fn new(continuation: ContinuationId, location: ExitLocation) -> Self {
        Self { continuation, location }
    }

    pub fn continuation(&self) -> ContinuationId {
        self.continuation
    }

    pub fn location(&self) -> &ExitLocation {
        &self.location
    }
}

/// Edge weight: the exit taken and the entry it leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub exit: ExitLocation,
    pub entry: ControlEntryToken,
}

/// Continuations and the control transfers between them.
#[derive(Debug, Clone, Default)]
pub struct ControlGraph {
    graph: DiGraph<ContinuationNode, Transfer>,
    by_name: HashMap<String, ContinuationId>,
}

impl ControlGraph {
    /// Create an empty graph.
    ///
    /// # Examples
    ///
    /// ```
    /// use dirigent_coroutine::graph::ControlGraph;
    ///
    /// let graph = ControlGraph::new();
    /// assert!(graph.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuation.
    ///
    /// # Returns
    ///
    /// * `Ok(ContinuationId)` for the new node
    /// * `Err(Error::DuplicateName)` if a continuation with that name exists
    pub fn add(&mut self, node: ContinuationNode) -> Result<ContinuationId> {
        if self.by_name.contains_key(&node.name) {
            return Err(Error::duplicate_name(&node.name));
        }
        let name = node.name.clone();
        let id = ContinuationId(self.graph.add_node(node));
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<ContinuationId> {
        self.by_name.get(name).copied()
    }

    pub fn by_actor(&self, actor: ActorId) -> Option<ContinuationId> {
        self.graph
            .node_indices()
            .find(|index| self.graph.node_weight(*index).is_some_and(|node| node.actor == actor))
            .map(ContinuationId)
    }

    pub fn node(&self, id: ContinuationId) -> Option<&ContinuationNode> {
        self.graph.node_weight(id.0)
    }

    pub fn name(&self, id: ContinuationId) -> &str {
        self.node(id).map_or("<unknown>", |node| node.name.as_str())
    }

    /// Continuations in the order they were added.
    pub fn ids(&self) -> impl Iterator<Item = ContinuationId> + '_ {
        self.graph.node_indices().map(ContinuationId)
    }

    pub fn first(&self) -> Option<ContinuationId> {
        self.ids().next()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Route `exit` to `entry`, replacing any earlier route for that exit.
    ///
    /// # Returns
    ///
    /// The entry the exit previously led to, if any.
    pub fn connect(
        &mut self,
        exit: &InternalExitLocation,
        entry: InternalEntryLocation,
    ) -> Option<InternalEntryLocation> {
        let replaced = self.edge_for(exit).and_then(|edge| {
            let target = self.graph.edge_endpoints(edge).map(|(_, target)| target)?;
            let transfer = self.graph.remove_edge(edge)?;
            Some(InternalEntryLocation::new(ContinuationId(target), transfer.entry))
        });
        self.graph.add_edge(
            exit.continuation.0,
            entry.continuation.0,
            Transfer {
                exit: exit.location.clone(),
                entry: entry.entry,
            },
        );
        replaced
    }

    /// Where leaving through `exit` leads.
    pub fn next(&self, exit: &InternalExitLocation) -> Option<InternalEntryLocation> {
        self.graph
            .edges_directed(exit.continuation.0, Direction::Outgoing)
            .find(|edge| edge.weight().exit == exit.location)
            .map(|edge| InternalEntryLocation::new(ContinuationId(edge.target()), edge.weight().entry.clone()))
    }

    pub fn clear_transfers(&mut self) {
        self.graph.clear_edges();
    }

    pub fn transfer_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every transfer, ordered by source continuation and exit name.
    pub fn transfers(&self) -> Vec<(InternalExitLocation, InternalEntryLocation)> {
        let mut transfers: Vec<_> = self
            .graph
            .edge_references()
            .map(|edge| {
                (
                    InternalExitLocation::new(ContinuationId(edge.source()), edge.weight().exit.clone()),
                    InternalEntryLocation::new(ContinuationId(edge.target()), edge.weight().entry.clone()),
                )
            })
            .collect();
        transfers.sort_by(|(a, _), (b, _)| {
            a.continuation
                .cmp(&b.continuation)
                .then_with(|| a.location.cmp(&b.location))
        });
        transfers
    }

    /// Human-readable form of an entry, e.g. `worker.resume`.
    pub fn describe_entry(&self, location: &InternalEntryLocation) -> Described<'_> {
        Described {
            continuation: self.name(location.continuation),
            point: location.entry.to_string(),
        }
    }

    /// Human-readable form of an exit, e.g. `worker.exit(done)`.
    pub fn describe_exit(&self, location: &InternalExitLocation) -> Described<'_> {
        Described {
            continuation: self.name(location.continuation),
            point: format!("exit({})", location.location),
        }
    }

    fn edge_for(&self, exit: &InternalExitLocation) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(exit.continuation.0, Direction::Outgoing)
            .find(|edge| edge.weight().exit == exit.location)
            .map(|edge| edge.id())
    }
}

/// Display adapter returned by [`ControlGraph::describe_entry`] and
/// [`ControlGraph::describe_exit`].
pub struct Described<'a> {
    continuation: &'a str,
    point: String,
}

impl fmt::Display for Described<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.continuation, self.point)
    }
}
