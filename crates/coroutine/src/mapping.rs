//! Building the control-flow maps.
//!
//! Mapping tables are arrays of string tuples. Parsing is tolerant: a tuple
//! that is malformed or names something that does not exist is skipped with
//! a debug trace, never rejected.
//!
//! | Table | Tuple |
//! |-------|-------|
//! | next  | `[continuation, exit, continuation, entry]` |
//! | entry | `[model entry, continuation, entry]` |
//! | exit  | `[continuation, exit, model exit]` |
//!
//! The `entry` element is `init`, `resume` or the name of an entry location.

use std::collections::HashMap;

use dirigent_kernel::{ControlEntryToken, EntryLocation, ExitLocation, Model, Result};
use serde_json::Value;
use tracing::debug;

use crate::graph::{ContinuationId, ControlGraph, InternalEntryLocation, InternalExitLocation};

/// Entry map: model entry location to internal entry.
pub type EntryMap = HashMap<EntryLocation, InternalEntryLocation>;

/// Exit map: internal exit to model exit location.
pub type ExitMap = HashMap<InternalExitLocation, ExitLocation>;

/// The first `n` elements of `value` as strings.
///
/// `None` unless `value` is an array of at least `n` elements whose first
/// `n` are all strings.
pub fn extract_spec(value: &Value, n: usize) -> Option<Vec<&str>> {
    let elements = value.as_array()?;
    if elements.len() < n {
        return None;
    }
    elements.iter().take(n).map(Value::as_str).collect()
}

fn continuation(graph: &ControlGraph, name: &str) -> Option<ContinuationId> {
    let found = graph.find(name);
    if found.is_none() {
        debug!(continuation = %name, "Mapping names an unknown continuation, skipped");
    }
    found
}

fn exit_of(graph: &ControlGraph, id: ContinuationId, name: &str) -> Option<InternalExitLocation> {
    let location = ExitLocation::new(name);
    graph
        .node(id)
        .filter(|node| node.has_exit(&location))
        .map(|_| InternalExitLocation::new(id, location))
}

fn entry_of(graph: &ControlGraph, id: ContinuationId, token: &str) -> Option<InternalEntryLocation> {
    let entry = ControlEntryToken::parse(token);
    graph
        .node(id)
        .filter(|node| node.accepts(&entry))
        .map(|_| InternalEntryLocation::new(id, entry))
}

/// Add the transfers listed in a next table to `graph`. Returns how many
/// tuples were accepted.
pub fn next_map_from_table(graph: &mut ControlGraph, table: &[Value]) -> usize {
    let routes: Vec<(InternalExitLocation, InternalEntryLocation)> = table
        .iter()
        .filter_map(|tuple| {
            let spec = extract_spec(tuple, 4)?;
            let (from, exit, to, entry) = (spec.first()?, spec.get(1)?, spec.get(2)?, spec.get(3)?);
            let exit = exit_of(graph, continuation(graph, from)?, exit)?;
            let entry = entry_of(graph, continuation(graph, to)?, entry)?;
            Some((exit, entry))
        })
        .collect();

    let accepted = routes.len();
    if accepted < table.len() {
        debug!(skipped = table.len().saturating_sub(accepted), "Next mapping tuples skipped");
    }
    for (exit, entry) in routes {
        graph.connect(&exit, entry);
    }
    accepted
}

/// Parse an entry table. Model entries must be among `declared`.
pub fn entry_map_from_table(graph: &ControlGraph, table: &[Value], declared: &[EntryLocation]) -> EntryMap {
    table
        .iter()
        .filter_map(|tuple| {
            let spec = extract_spec(tuple, 3)?;
            let (model_entry, to, entry) = (spec.first()?, spec.get(1)?, spec.get(2)?);
            let model_entry = EntryLocation::new(*model_entry);
            if !declared.contains(&model_entry) {
                debug!(entry = %model_entry, "Entry mapping names an undeclared entry, skipped");
                return None;
            }
            let entry = entry_of(graph, continuation(graph, to)?, entry)?;
            Some((model_entry, entry))
        })
        .collect()
}

/// Parse an exit table. Model exits must be among `declared`.
pub fn exit_map_from_table(graph: &ControlGraph, table: &[Value], declared: &[ExitLocation]) -> ExitMap {
    table
        .iter()
        .filter_map(|tuple| {
            let spec = extract_spec(tuple, 3)?;
            let (from, exit, model_exit) = (spec.first()?, spec.get(1)?, spec.get(2)?);
            let exit = exit_of(graph, continuation(graph, from)?, exit)?;
            let model_exit = ExitLocation::new(*model_exit);
            if !declared.contains(&model_exit) {
                debug!(exit = %model_exit, "Exit mapping names an undeclared exit, skipped");
                return None;
            }
            Some((exit, model_exit))
        })
        .collect()
}

/// Infer transfers from connections between continuations' exit ports and
/// entry ports. Only the first connection of each exit port counts.
pub fn next_map_from_connections(graph: &mut ControlGraph, model: &Model) -> Result<usize> {
    let mut routes = Vec::new();
    for id in graph.ids().collect::<Vec<_>>() {
        let Some(actor) = graph.node(id).map(|node| node.actor) else {
            continue;
        };
        let ports: Vec<String> = model
            .ports(actor)?
            .iter()
            .filter(|port| port.is_output())
            .map(|port| port.name().to_string())
            .collect();

        for port in ports {
            let exit = model.with_actor(actor, |a, _| {
                a.continuation().and_then(|c| c.exit_location_for_port(&port))
            })?;
            let Some(exit) = exit else {
                continue;
            };
            let Some(sink) = model.sinks(actor, &port).into_iter().next() else {
                continue;
            };
            let Some(target) = graph.by_actor(sink.actor) else {
                continue;
            };
            let entry = model.with_actor(sink.actor, |a, _| {
                a.continuation().and_then(|c| c.entry_token_for_port(&sink.port))
            })?;
            let Some(entry) = entry else {
                continue;
            };
            routes.push((
                InternalExitLocation::new(id, exit),
                InternalEntryLocation::new(target, entry),
            ));
        }
    }

    let accepted = routes.len();
    for (exit, entry) in routes {
        graph.connect(&exit, entry);
    }
    Ok(accepted)
}
