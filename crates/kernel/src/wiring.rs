//! The receivers an actor reads from and writes to.

use std::collections::BTreeMap;
use std::sync::Arc;

use dirigent_core::Error;

use crate::Result;
use crate::port::{PortSpec, Token};
use crate::receiver::Receiver;

type Channels = Vec<Arc<dyn Receiver>>;

/// Receivers bound to one actor's ports.
///
/// Input ports map to one receiver per channel, in connection order. Output
/// ports map to the receivers of every downstream connection.
#[derive(Debug, Default)]
pub struct ActorWiring {
    actor: String,
    inputs: BTreeMap<String, Channels>,
    outputs: BTreeMap<String, Channels>,
}

impl ActorWiring {
    /// Wiring with every declared port present and nothing connected.
    pub fn unwired(actor: impl Into<String>, ports: &[PortSpec]) -> Self {
        let mut wiring = Self {
            actor: actor.into(),
            ..Self::default()
        };
        for port in ports {
            let side = if port.is_input() {
                &mut wiring.inputs
            } else {
                &mut wiring.outputs
            };
            side.insert(port.name().to_string(), Vec::new());
        }
        wiring
    }

    pub(crate) fn bind_input(&mut self, port: &str, receiver: Arc<dyn Receiver>) {
        self.inputs.entry(port.to_string()).or_default().push(receiver);
    }

    pub(crate) fn bind_output(&mut self, port: &str, receiver: Arc<dyn Receiver>) {
        self.outputs.entry(port.to_string()).or_default().push(receiver);
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Input receivers of one port, one per channel.
    pub fn input(&self, port: &str) -> Option<&[Arc<dyn Receiver>]> {
        self.inputs.get(port).map(Vec::as_slice)
    }

    pub fn output(&self, port: &str) -> Option<&[Arc<dyn Receiver>]> {
        self.outputs.get(port).map(Vec::as_slice)
    }

    pub(crate) fn input_receivers(&self) -> impl Iterator<Item = &Arc<dyn Receiver>> {
        self.inputs.values().flatten()
    }

    fn channel(&self, port: &str, channel: usize) -> Result<&Arc<dyn Receiver>> {
        self.inputs
            .get(port)
            .ok_or_else(|| Error::unknown_port(&self.actor, port))?
            .get(channel)
            .ok_or_else(|| Error::no_token(&self.actor, port, channel))
    }

    fn remotes(&self, port: &str) -> Result<&Channels> {
        self.outputs
            .get(port)
            .ok_or_else(|| Error::unknown_port(&self.actor, port))
    }
}

/// The view of its ports an actor gets during a lifecycle call.
#[derive(Debug, Clone, Copy)]
pub struct PortIo<'a> {
    wiring: &'a ActorWiring,
}

impl<'a> PortIo<'a> {
    pub fn new(wiring: &'a ActorWiring) -> Self {
        Self { wiring }
    }

    pub fn actor_name(&self) -> &str {
        self.wiring.actor()
    }

    /// Number of connected channels of a port, zero if the port is unknown.
    pub fn width(&self, port: &str) -> usize {
        self.wiring
            .input(port)
            .or_else(|| self.wiring.output(port))
            .map_or(0, <[Arc<dyn Receiver>]>::len)
    }

    pub fn has_token(&self, port: &str) -> bool {
        self.has_token_on(port, 0)
    }

    pub fn has_token_on(&self, port: &str, channel: usize) -> bool {
        self.wiring
            .channel(port, channel)
            .is_ok_and(|receiver| receiver.has_token())
    }

    /// True when channel 0 of `port` holds at least `count` tokens.
    pub fn has_tokens(&self, port: &str, count: usize) -> bool {
        self.wiring
            .channel(port, 0)
            .is_ok_and(|receiver| receiver.has_tokens(count))
    }

    /// True when every channel of `port` is settled.
    pub fn is_known(&self, port: &str) -> bool {
        self.wiring
            .input(port)
            .is_some_and(|channels| channels.iter().all(|r| r.is_known()))
    }

    pub fn get(&self, port: &str) -> Result<Token> {
        self.get_on(port, 0)
    }

    pub fn get_on(&self, port: &str, channel: usize) -> Result<Token> {
        self.wiring
            .channel(port, channel)?
            .get()
            .ok_or_else(|| Error::no_token(self.actor_name(), port, channel))
    }

    /// Send a token to every receiver connected to an output port.
    pub fn send(&self, port: &str, token: Token) -> Result<()> {
        self.wiring
            .remotes(port)?
            .iter()
            .try_for_each(|receiver| receiver.put(Some(token.clone())))
    }

    /// Send several tokens, in order, to every connected receiver.
    pub fn send_all(&self, port: &str, tokens: &[Token]) -> Result<()> {
        self.wiring
            .remotes(port)?
            .iter()
            .try_for_each(|receiver| receiver.put_array(tokens.to_vec()))
    }

    /// State that an output port produces no token this round.
    pub fn send_absent(&self, port: &str) -> Result<()> {
        self.wiring
            .remotes(port)?
            .iter()
            .try_for_each(|receiver| receiver.put(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::Mailbox;

    fn wiring() -> (ActorWiring, Arc<Mailbox>, Arc<Mailbox>) {
        let ports = [PortSpec::input("in"), PortSpec::output("out")];
        let mut wiring = ActorWiring::unwired("stub", &ports);
        let inbound = Arc::new(Mailbox::new());
        let outbound = Arc::new(Mailbox::new());
        wiring.bind_input("in", inbound.clone());
        wiring.bind_output("out", outbound.clone());
        (wiring, inbound, outbound)
    }

    #[test]
    fn should_read_inputs_and_write_outputs() {
        let (wiring, inbound, outbound) = wiring();
        let io = PortIo::new(&wiring);
        assert!(inbound.put(Some(Token::from(7))).is_ok());

        assert!(io.has_token("in"));
        assert_eq!(io.get("in"), Ok(Token::from(7)));
        assert!(io.send("out", Token::from(8)).is_ok());
        assert_eq!(outbound.get(), Some(Token::from(8)));
    }

    #[test]
    fn should_fail_reading_empty_channel() {
        let (wiring, _, _) = wiring();
        let io = PortIo::new(&wiring);
        assert!(matches!(io.get("in"), Err(Error::NoToken { .. })));
        assert!(matches!(io.get_on("in", 3), Err(Error::NoToken { .. })));
    }

    #[test]
    fn should_fail_on_undeclared_port() {
        let (wiring, _, _) = wiring();
        let io = PortIo::new(&wiring);
        assert!(matches!(
            io.send("missing", Token::Null),
            Err(Error::UnknownPort { .. })
        ));
        assert_eq!(io.width("missing"), 0);
    }

    #[test]
    fn should_accept_sends_on_unconnected_outputs() {
        let wiring = ActorWiring::unwired("stub", &[PortSpec::output("out")]);
        let io = PortIo::new(&wiring);
        assert!(io.send("out", Token::from(1)).is_ok());
        assert_eq!(io.width("out"), 0);
    }
}
