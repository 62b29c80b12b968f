//! The composite that a director executes.
//!
//! A [`Model`] owns its actors in declaration order, the connections between
//! their ports, per-actor attributes and the model-wide [`ErrorSink`].
//! Receivers are created by the director through
//! [`Model::install_receivers`] and bound into one [`ActorWiring`] per actor.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dirigent_core::Error;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::Result;
use crate::actor::{self, Actor, ActorCell, ActorId};
use crate::port::{PortSpec, Token};
use crate::receiver::Receiver;
use crate::sink::ErrorSink;
use crate::wiring::{ActorWiring, PortIo};

/// A port of a specific actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub actor: ActorId,
    pub port: String,
}

impl PortRef {
    pub fn new(actor: ActorId, port: impl Into<String>) -> Self {
        Self {
            actor,
            port: port.into(),
        }
    }

    fn is(&self, actor: ActorId, port: &str) -> bool {
        self.actor == actor && self.port == port
    }
}

/// A directed link from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: PortRef,
    pub sink: PortRef,
}

/// Everything a director needs to choose the receiver for one input channel.
#[derive(Debug, Clone, Copy)]
pub struct ReceiverSite<'a> {
    pub reader: ActorId,
    pub reader_name: &'a str,
    pub reader_port: &'a PortSpec,
    pub channel: usize,
    pub source: ActorId,
    pub source_name: &'a str,
    pub source_port: &'a PortSpec,
}

impl ReceiverSite<'_> {
    /// `actor.port[channel]`, used in logs and receiver errors.
    pub fn label(&self) -> String {
        format!(
            "{}.{}[{}]",
            self.reader_name,
            self.reader_port.name(),
            self.channel
        )
    }
}

struct Slot {
    name: String,
    cell: ActorCell,
    ports: Vec<PortSpec>,
    attributes: BTreeMap<String, Token>,
    wiring: Arc<ActorWiring>,
}

impl Slot {
    fn port(&self, name: &str) -> Result<&PortSpec> {
        self.ports
            .iter()
            .find(|port| port.name() == name)
            .ok_or_else(|| Error::unknown_port(&self.name, name))
    }
}

/// A composite actor: named actors and the connections between them.
pub struct Model {
    name: String,
    slots: Vec<Slot>,
    index: HashMap<String, ActorId>,
    connections: Vec<Connection>,
    sink: ErrorSink,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            index: HashMap::new(),
            connections: Vec::new(),
            sink: ErrorSink::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_actor(&mut self, name: impl Into<String>, actor: impl Actor + 'static) -> Result<ActorId> {
        self.add_boxed(name, Box::new(actor))
    }

    pub fn add_boxed(&mut self, name: impl Into<String>, actor: Box<dyn Actor>) -> Result<ActorId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::duplicate_name(name));
        }
        let id = ActorId::new(self.slots.len());
        let ports = actor.ports();
        let wiring = Arc::new(ActorWiring::unwired(&name, &ports));
        self.index.insert(name.clone(), id);
        self.slots.push(Slot {
            name,
            cell: actor::cell(actor),
            ports,
            attributes: BTreeMap::new(),
            wiring,
        });
        Ok(id)
    }

    /// Connect an output port to an input port. Each connection into an
    /// input port adds one channel; only multiports take more than one.
    pub fn connect(
        &mut self,
        source: ActorId,
        source_port: &str,
        sink: ActorId,
        sink_port: &str,
    ) -> Result<()> {
        let from = self.slot(source)?;
        let to = self.slot(sink)?;
        if !from.port(source_port)?.is_output() {
            return Err(Error::invalid_connection(format!(
                "{}.{source_port} is not an output port",
                from.name
            )));
        }
        let input = to.port(sink_port)?;
        if !input.is_input() {
            return Err(Error::invalid_connection(format!(
                "{}.{sink_port} is not an input port",
                to.name
            )));
        }
        if !input.is_multiport() && self.width(sink, sink_port) > 0 {
            return Err(Error::invalid_connection(format!(
                "{}.{sink_port} is already connected and is not a multiport",
                to.name
            )));
        }
        self.connections.push(Connection {
            source: PortRef::new(source, source_port),
            sink: PortRef::new(sink, sink_port),
        });
        Ok(())
    }

    /// Connect by actor and port names.
    pub fn connect_named(&mut self, source: &str, source_port: &str, sink: &str, sink_port: &str) -> Result<()> {
        let from = self.actor_id(source).ok_or_else(|| Error::unknown_actor(source))?;
        let to = self.actor_id(sink).ok_or_else(|| Error::unknown_actor(sink))?;
        self.connect(from, source_port, to, sink_port)
    }

    pub fn set_attribute(&mut self, id: ActorId, key: impl Into<String>, value: Token) -> Result<()> {
        self.slot_mut(id)?.attributes.insert(key.into(), value);
        Ok(())
    }

    pub fn attribute(&self, id: ActorId, key: &str) -> Option<&Token> {
        self.slots.get(id.index())?.attributes.get(key)
    }

    pub fn actor_id(&self, name: &str) -> Option<ActorId> {
        self.index.get(name).copied()
    }

    pub fn actor_name(&self, id: ActorId) -> Result<&str> {
        Ok(&self.slot(id)?.name)
    }

    /// Actor ids in declaration order.
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        (0..self.slots.len()).map(ActorId::new)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ports(&self, id: ActorId) -> Result<&[PortSpec]> {
        Ok(&self.slot(id)?.ports)
    }

    pub fn port(&self, id: ActorId, name: &str) -> Option<&PortSpec> {
        self.slot(id).ok()?.port(name).ok()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of connections attached to a port.
    pub fn width(&self, id: ActorId, port: &str) -> usize {
        self.connections
            .iter()
            .filter(|c| c.sink.is(id, port) || c.source.is(id, port))
            .count()
    }

    /// Upstream ports feeding an input port, in channel order.
    pub fn sources(&self, id: ActorId, port: &str) -> Vec<PortRef> {
        self.connections
            .iter()
            .filter(|c| c.sink.is(id, port))
            .map(|c| c.source.clone())
            .collect()
    }

    /// Downstream ports fed by an output port, in connection order.
    pub fn sinks(&self, id: ActorId, port: &str) -> Vec<PortRef> {
        self.connections
            .iter()
            .filter(|c| c.source.is(id, port))
            .map(|c| c.sink.clone())
            .collect()
    }

    /// Whether `channel` of an input port currently holds a token.
    pub fn has_token(&self, id: ActorId, port: &str, channel: usize) -> bool {
        self.slot(id)
            .is_ok_and(|slot| PortIo::new(&slot.wiring).has_token_on(port, channel))
    }

    pub fn cell(&self, id: ActorId) -> Result<ActorCell> {
        Ok(Arc::clone(&self.slot(id)?.cell))
    }

    pub fn wiring(&self, id: ActorId) -> Result<Arc<ActorWiring>> {
        Ok(Arc::clone(&self.slot(id)?.wiring))
    }

    /// Name and handle of every actor, for out-of-band stop requests.
    pub fn cells(&self) -> Vec<(String, ActorCell)> {
        self.slots
            .iter()
            .map(|slot| (slot.name.clone(), Arc::clone(&slot.cell)))
            .collect()
    }

    pub fn error_sink(&self) -> &ErrorSink {
        &self.sink
    }

    /// Create one receiver per input channel through `factory` and rebind
    /// every actor's ports. Previously installed receivers are dropped.
    pub fn install_receivers<F>(&mut self, mut factory: F) -> Result<()>
    where
        F: FnMut(&ReceiverSite<'_>) -> Result<Arc<dyn Receiver>>,
    {
        let mut wirings: Vec<ActorWiring> = self
            .slots
            .iter()
            .map(|slot| ActorWiring::unwired(&slot.name, &slot.ports))
            .collect();
        let mut channels: HashMap<&PortRef, usize> = HashMap::new();

        for connection in &self.connections {
            let reader = self.slot(connection.sink.actor)?;
            let source = self.slot(connection.source.actor)?;
            let counter = channels.entry(&connection.sink).or_insert(0);
            let site = ReceiverSite {
                reader: connection.sink.actor,
                reader_name: &reader.name,
                reader_port: reader.port(&connection.sink.port)?,
                channel: *counter,
                source: connection.source.actor,
                source_name: &source.name,
                source_port: source.port(&connection.source.port)?,
            };
            *counter = counter.saturating_add(1);

            let receiver = factory(&site)?;
            trace!(site = %site.label(), "Install receiver");
            wirings
                .get_mut(connection.sink.actor.index())
                .ok_or_else(|| Error::unknown_actor(&reader.name))?
                .bind_input(&connection.sink.port, Arc::clone(&receiver));
            wirings
                .get_mut(connection.source.actor.index())
                .ok_or_else(|| Error::unknown_actor(&source.name))?
                .bind_output(&connection.source.port, receiver);
        }

        for (slot, wiring) in self.slots.iter_mut().zip(wirings) {
            slot.wiring = Arc::new(wiring);
        }
        Ok(())
    }

    /// Run `f` with exclusive access to one actor and its port view.
    pub fn with_actor<R>(
        &self,
        id: ActorId,
        f: impl FnOnce(&mut dyn Actor, &PortIo<'_>) -> R,
    ) -> Result<R> {
        let slot = self.slot(id)?;
        let mut actor = slot.cell.lock();
        let io = PortIo::new(&slot.wiring);
        Ok(f(&mut **actor, &io))
    }

    pub fn prefire(&self, id: ActorId) -> Result<bool> {
        self.with_actor(id, |actor, io| actor.prefire(io))?
    }

    pub fn fire(&self, id: ActorId) -> Result<()> {
        self.with_actor(id, |actor, io| actor.fire(io))?
    }

    pub fn postfire(&self, id: ActorId) -> Result<bool> {
        self.with_actor(id, |actor, io| actor.postfire(io))?
    }

    pub fn preinitialize_actors(&self) -> Result<()> {
        self.slots
            .iter()
            .try_for_each(|slot| slot.cell.lock().preinitialize())
    }

    pub fn initialize_actors(&self) -> Result<()> {
        self.actor_ids()
            .try_for_each(|id| self.with_actor(id, |actor, io| actor.initialize(io))?)
    }

    /// Wrap up every actor, even after a failure. The first failure is
    /// returned and the rest go to the error sink.
    pub fn wrapup_actors(&self) -> Result<()> {
        let mut first = None;
        for slot in &self.slots {
            if let Err(e) = slot.cell.lock().wrapup() {
                if first.is_none() {
                    first = Some(e);
                } else {
                    self.sink.report(&slot.name, e);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Reset every installed receiver.
    pub fn reset_receivers(&self) {
        self.slots
            .iter()
            .flat_map(|slot| slot.wiring.input_receivers())
            .for_each(|receiver| receiver.reset());
    }

    fn slot(&self, id: ActorId) -> Result<&Slot> {
        self.slots
            .get(id.index())
            .ok_or_else(|| Error::unknown_actor(id.to_string()))
    }

    fn slot_mut(&mut self, id: ActorId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .ok_or_else(|| Error::unknown_actor(id.to_string()))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field(
                "actors",
                &self.slots.iter().map(|slot| slot.name.as_str()).collect::<Vec<_>>(),
            )
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::Mailbox;

    struct Relay;

    impl Actor for Relay {
        fn ports(&self) -> Vec<PortSpec> {
            vec![PortSpec::input("in"), PortSpec::output("out")]
        }

        fn fire(&mut self, io: &PortIo<'_>) -> Result<()> {
            let token = io.get("in")?;
            io.send("out", token)
        }
    }

    fn chain() -> Result<(Model, ActorId, ActorId)> {
        let mut model = Model::new("chain");
        let a = model.add_actor("a", Relay)?;
        let b = model.add_actor("b", Relay)?;
        model.connect(a, "out", b, "in")?;
        Ok((model, a, b))
    }

    #[test]
    fn should_reject_duplicate_names() {
        let mut model = Model::new("m");
        assert!(model.add_actor("a", Relay).is_ok());
        assert!(matches!(model.add_actor("a", Relay), Err(Error::DuplicateName { .. })));
    }

    #[test]
    fn should_reject_second_connection_into_single_port() -> Result<()> {
        let (mut model, a, b) = chain()?;
        assert!(matches!(
            model.connect(a, "out", b, "in"),
            Err(Error::InvalidConnection { .. })
        ));
        Ok(())
    }

    #[test]
    fn should_reject_connection_against_direction() -> Result<()> {
        let (mut model, a, b) = chain()?;
        assert!(matches!(
            model.connect(b, "in", a, "in"),
            Err(Error::InvalidConnection { .. })
        ));
        assert!(matches!(
            model.connect(a, "nope", b, "in"),
            Err(Error::UnknownPort { .. })
        ));
        Ok(())
    }

    #[test]
    fn should_report_width_and_neighbours() -> Result<()> {
        let (model, a, b) = chain()?;
        assert_eq!(model.width(a, "out"), 1);
        assert_eq!(model.width(a, "in"), 0);
        assert_eq!(model.sources(b, "in"), vec![PortRef::new(a, "out")]);
        assert_eq!(model.sinks(a, "out"), vec![PortRef::new(b, "in")]);
        Ok(())
    }

    #[test]
    fn should_route_tokens_through_installed_receivers() -> Result<()> {
        let (mut model, a, b) = chain()?;
        let mut sites = Vec::new();
        model.install_receivers(|site| {
            sites.push(site.label());
            Ok(Arc::new(Mailbox::new()))
        })?;
        assert_eq!(sites, vec!["b.in[0]".to_string()]);

        model.with_actor(a, |_, io| io.send("out", Token::from("hello")))??;
        assert!(model.has_token(b, "in", 0));
        let received = model.with_actor(b, |_, io| io.get("in"))??;
        assert_eq!(received, Token::from("hello"));
        Ok(())
    }

    #[test]
    fn should_store_attributes_per_actor() -> Result<()> {
        let (mut model, a, b) = chain()?;
        model.set_attribute(a, "period", Token::from(5))?;
        assert_eq!(model.attribute(a, "period"), Some(&Token::from(5)));
        assert_eq!(model.attribute(b, "period"), None);
        Ok(())
    }
}
