//! Property tests for actor classification.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use dirigent_ci::PortProfile;
use dirigent_kernel::{Actor, Error, Model, PortIo, PortSpec, Result};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct PortShape {
    push: bool,
    connected: bool,
}

fn port_shape() -> impl Strategy<Value = PortShape> {
    (any::<bool>(), any::<bool>()).prop_map(|(push, connected)| PortShape { push, connected })
}

struct Subject {
    ports: Vec<PortSpec>,
}

impl Actor for Subject {
    fn ports(&self) -> Vec<PortSpec> {
        self.ports.clone()
    }

    fn fire(&mut self, _io: &PortIo<'_>) -> Result<()> {
        Ok(())
    }
}

/// Connects to any number of subject ports.
struct Peer;

impl Actor for Peer {
    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("in").multiport(), PortSpec::output("out")]
    }

    fn fire(&mut self, _io: &PortIo<'_>) -> Result<()> {
        Ok(())
    }
}

fn spec(name: String, shape: PortShape, input: bool) -> PortSpec {
    let port = if input { PortSpec::input(name) } else { PortSpec::output(name) };
    if shape.push { port.push() } else { port }
}

fn build(inputs: &[PortShape], outputs: &[PortShape]) -> (Model, dirigent_kernel::ActorId) {
    let mut ports = Vec::new();
    ports.extend(inputs.iter().enumerate().map(|(i, s)| spec(format!("in{i}"), *s, true)));
    ports.extend(outputs.iter().enumerate().map(|(i, s)| spec(format!("out{i}"), *s, false)));

    let mut model = Model::new("subject");
    let subject = model.add_actor("subject", Subject { ports }).unwrap();
    let peer = model.add_actor("peer", Peer).unwrap();
    for (i, shape) in inputs.iter().enumerate() {
        if shape.connected {
            model.connect(peer, "out", subject, &format!("in{i}")).unwrap();
        }
    }
    for (i, shape) in outputs.iter().enumerate() {
        if shape.connected {
            model.connect(subject, &format!("out{i}"), peer, "in").unwrap();
        }
    }
    (model, subject)
}

fn mixed(shapes: &[PortShape]) -> bool {
    let connected: Vec<bool> = shapes.iter().filter(|s| s.connected).map(|s| s.push).collect();
    connected.iter().any(|p| *p) && !connected.iter().all(|p| *p)
}

proptest! {
    #[test]
    fn classification_is_idempotent(
        inputs in prop::collection::vec(port_shape(), 0..4),
        outputs in prop::collection::vec(port_shape(), 0..4),
    ) {
        let (model, subject) = build(&inputs, &outputs);
        let first = PortProfile::of(&model, subject);
        let second = PortProfile::of(&model, subject);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.as_ref().map(|p| p.role()).ok(), second.as_ref().map(|p| p.role()).ok());
    }

    #[test]
    fn unconnected_ports_do_not_count(
        inputs in prop::collection::vec(port_shape(), 0..4),
        outputs in prop::collection::vec(port_shape(), 0..4),
    ) {
        let (model, subject) = build(&inputs, &outputs);
        let profile = PortProfile::of(&model, subject);
        if mixed(&inputs) || mixed(&outputs) {
            let rejected = matches!(profile, Err(Error::UnsupportedConfiguration { .. }));
            prop_assert!(rejected, "mixed ports accepted: {:?}", profile);
        } else {
            let profile = profile.unwrap();
            prop_assert_eq!(profile.has_input, inputs.iter().any(|s| s.connected));
            prop_assert_eq!(profile.has_output, outputs.iter().any(|s| s.connected));
            prop_assert_eq!(profile.input_is_push, inputs.iter().any(|s| s.connected && s.push));
            prop_assert_eq!(profile.output_is_push, outputs.iter().any(|s| s.connected && s.push));
        }
    }
}
