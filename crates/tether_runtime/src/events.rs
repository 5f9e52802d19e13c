//! Event delivery from shadow nodes to the scripting queue

use tether_bridge::{ScriptMessage, ScriptSender};
use tether_shadow::{EventPipe, Tag};
use tether_value::{to_dynamic, NativeValue};

/// Posts emitted events to the scripting task queue as
/// [`ScriptMessage::Event`]
#[derive(Clone)]
pub struct ScriptEventPipe {
    sender: ScriptSender,
}

impl ScriptEventPipe {
    pub fn new(sender: ScriptSender) -> Self {
        Self { sender }
    }
}

impl EventPipe for ScriptEventPipe {
    fn emit(&self, target: Tag, name: &str, payload: NativeValue) {
        let message = ScriptMessage::Event {
            target: target.raw(),
            name: name.to_string(),
            payload: to_dynamic(&payload),
        };
        if !self.sender.post(message) {
            log::debug!("Dropped event {} for {}: script queue closed", name, target);
        }
    }
}
