//! Replaying adapter for the `Assistant` port.

use std::sync::Mutex;

use super::replay_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::assistant::{AdapterError, Assistant, AssistantFuture, AssistantOutput, InvocationRequest};

/// Serves recorded assistant sessions from a cassette, in order.
pub struct ReplayingAssistant {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingAssistant {
    /// Creates a replaying assistant backed by the given replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl Assistant for ReplayingAssistant {
    fn invoke(&self, _request: &InvocationRequest) -> AssistantFuture<'_> {
        let output = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            replayer.next_interaction("assistant", "invoke").output.clone()
        };
        Box::pin(async move {
            replay_result::<AssistantOutput, AdapterError>(&output, "assistant::invoke")
        })
    }
}
