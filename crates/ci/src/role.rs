//! Push/pull roles of actors.
//!
//! Roles are a pure function of which ports are connected and which of them
//! carry the `push` attribute. They are computed once per run.

use dirigent_core::Error;
use dirigent_kernel::{ActorId, Model, Result};
use serde::{Deserialize, Serialize};

/// Connectivity and push attributes of one actor's ports.
///
/// Only ports with at least one connection count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortProfile {
    pub has_input: bool,
    pub input_is_push: bool,
    pub has_output: bool,
    pub output_is_push: bool,
}

/// How an actor is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// No connected input and a push output. Runs freely on its own thread.
    PushSource,
    /// No connected output and pull inputs. Runs on its own thread and pulls.
    PullSink,
    /// Pull inputs and push outputs. Runs on its own thread.
    PullPushAgent,
    /// Fired by the director's task queue.
    Inactive,
}

impl Role {
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

impl PortProfile {
    /// Profile an actor in `model`.
    ///
    /// An actor whose connected inputs (or outputs) mix push and pull ports
    /// is rejected.
    pub fn of(model: &Model, id: ActorId) -> Result<Self> {
        let name = model.actor_name(id)?;
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for port in model.ports(id)? {
            if model.width(id, port.name()) == 0 {
                continue;
            }
            if port.is_input() {
                inputs.push(port.is_push());
            } else {
                outputs.push(port.is_push());
            }
        }
        Ok(Self {
            has_input: !inputs.is_empty(),
            input_is_push: uniform(name, "input", &inputs)?,
            has_output: !outputs.is_empty(),
            output_is_push: uniform(name, "output", &outputs)?,
        })
    }

    pub fn is_active(self) -> bool {
        (!self.has_input && self.output_is_push)
            || (!self.has_output && !self.input_is_push)
            || (!self.input_is_push && self.output_is_push)
    }

    /// Pull (or no) inputs and pull outputs: a pull request may be passed
    /// upstream through this actor.
    pub fn is_pull_through(self) -> bool {
        !self.output_is_push && (!self.has_input || !self.input_is_push)
    }

    pub fn role(self) -> Role {
        if !self.has_input && self.output_is_push {
            Role::PushSource
        } else if !self.has_output && !self.input_is_push {
            Role::PullSink
        } else if !self.input_is_push && self.output_is_push {
            Role::PullPushAgent
        } else {
            Role::Inactive
        }
    }
}

fn uniform(actor: &str, side: &str, push: &[bool]) -> Result<bool> {
    let any = push.iter().any(|p| *p);
    if any && !push.iter().all(|p| *p) {
        return Err(Error::unsupported_configuration(format!(
            "actor '{actor}' mixes push and pull {side} ports"
        )));
    }
    Ok(any)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn profile(has_input: bool, input_is_push: bool, has_output: bool, output_is_push: bool) -> PortProfile {
        PortProfile {
            has_input,
            input_is_push: has_input && input_is_push,
            has_output,
            output_is_push: has_output && output_is_push,
        }
    }

    #[test]
    fn should_classify_push_source() {
        let p = profile(false, false, true, true);
        assert!(p.is_active());
        assert_eq!(p.role(), Role::PushSource);
    }

    #[test]
    fn should_classify_pull_sink() {
        let p = profile(true, false, false, false);
        assert_eq!(p.role(), Role::PullSink);
        assert!(p.is_pull_through());
    }

    #[test]
    fn should_classify_pull_push_agent() {
        assert_eq!(profile(true, false, true, true).role(), Role::PullPushAgent);
    }

    #[test]
    fn should_leave_push_driven_and_pull_through_actors_inactive() {
        assert_eq!(profile(true, true, true, true).role(), Role::Inactive);
        assert_eq!(profile(true, true, true, false).role(), Role::Inactive);
        let relay = profile(true, false, true, false);
        assert_eq!(relay.role(), Role::Inactive);
        assert!(relay.is_pull_through());
    }

    #[test]
    fn should_reject_mixed_ports() {
        assert!(matches!(
            uniform("a", "input", &[true, false]),
            Err(Error::UnsupportedConfiguration { .. })
        ));
        assert_eq!(uniform("a", "input", &[true, true]), Ok(true));
        assert_eq!(uniform("a", "input", &[]), Ok(false));
    }

    proptest! {
        #[test]
        fn role_agrees_with_activity(a in any::<bool>(), b in any::<bool>(), c in any::<bool>(), d in any::<bool>()) {
            let p = profile(a, b, c, d);
            prop_assert_eq!(p.role().is_active(), p.is_active());
            prop_assert_eq!(p.role(), p.role());
        }
    }
}
